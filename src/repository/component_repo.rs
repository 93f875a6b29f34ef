// ==========================================
// 车间生产跟踪 - 部件数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================

use crate::domain::{Component, ComponentPatch, EntityKind};
use crate::repository::entity_store::EntityStore;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::sql_builder::{execute_update, UpdateBuilder};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult, Row};
use std::sync::{Arc, Mutex, MutexGuard};

const COMPONENT_COLUMNS: &str =
    "component_id, item_id, name, material, quantity, unit, progress, position, created_at, updated_at";

// ==========================================
// ComponentRepository - 部件仓储
// ==========================================
pub struct ComponentRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ComponentRepository {
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }
}

fn map_component(row: &Row<'_>) -> SqliteResult<Component> {
    Ok(Component {
        component_id: row.get(0)?,
        item_id: row.get(1)?,
        name: row.get(2)?,
        material: row.get(3)?,
        quantity: row.get(4)?,
        unit: row.get(5)?,
        progress: row.get(6)?,
        position: row.get(7)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
    })
}

impl EntityStore<Component> for ComponentRepository {
    fn kind(&self) -> EntityKind {
        EntityKind::Component
    }

    fn get(&self, id: &str) -> RepositoryResult<Component> {
        let conn = self.get_conn()?;
        conn.query_row(
            &format!(
                "SELECT {} FROM components WHERE component_id = ?1",
                COMPONENT_COLUMNS
            ),
            params![id],
            map_component,
        )
        .optional()?
        .ok_or_else(|| RepositoryError::not_found("Component", id))
    }

    fn list(&self, item_id: &str) -> RepositoryResult<Vec<Component>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM components WHERE item_id = ?1 ORDER BY position ASC, created_at ASC",
            COMPONENT_COLUMNS
        ))?;
        let components = stmt
            .query_map(params![item_id], map_component)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(components)
    }

    fn create(&self, component: &Component) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            &format!(
                "INSERT INTO components ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                COMPONENT_COLUMNS
            ),
            params![
                component.component_id,
                component.item_id,
                component.name,
                component.material,
                component.quantity,
                component.unit,
                component.progress,
                component.position,
                component.created_at,
                component.updated_at,
            ],
        )?;
        Ok(())
    }

    fn update(&self, id: &str, patch: &ComponentPatch) -> RepositoryResult<Component> {
        {
            let conn = self.get_conn()?;
            let mut builder = UpdateBuilder::new("components", "component_id");
            builder
                .set_opt("name", patch.name.clone())
                .set_opt("material", patch.material.clone())
                .set_opt("quantity", patch.quantity)
                .set_opt("unit", patch.unit.clone())
                .set_opt("progress", patch.progress)
                .set_opt("position", patch.position);

            if !builder.is_empty() {
                builder.set("updated_at", Utc::now().naive_utc());
                if execute_update(&conn, builder, id)? == 0 {
                    return Err(RepositoryError::not_found("Component", id));
                }
            }
        }
        self.get(id)
    }

    fn delete(&self, id: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let affected = conn.execute(
            "DELETE FROM components WHERE component_id = ?1",
            params![id],
        )?;
        if affected == 0 {
            return Err(RepositoryError::not_found("Component", id));
        }
        Ok(())
    }
}
