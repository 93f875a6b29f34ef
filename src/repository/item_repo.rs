// ==========================================
// 车间生产跟踪 - 制品数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================

use crate::domain::{EntityKind, Item, ItemPatch};
use crate::repository::entity_store::EntityStore;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::sql_builder::{execute_update, UpdateBuilder};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult, Row};
use std::sync::{Arc, Mutex, MutexGuard};

const ITEM_COLUMNS: &str = "item_id, zone_id, code, name, quantity, unit, current_stage, progress, \
     position, materials, technical_notes, manager_comment, due_date, created_at, updated_at";

// ==========================================
// ItemRepository - 制品仓储
// ==========================================
pub struct ItemRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ItemRepository {
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }
}

fn map_item(row: &Row<'_>) -> SqliteResult<Item> {
    Ok(Item {
        item_id: row.get(0)?,
        zone_id: row.get(1)?,
        code: row.get(2)?,
        name: row.get(3)?,
        quantity: row.get(4)?,
        unit: row.get(5)?,
        current_stage: row.get(6)?,
        progress: row.get(7)?,
        position: row.get(8)?,
        materials: row.get(9)?,
        technical_notes: row.get(10)?,
        manager_comment: row.get(11)?,
        due_date: row.get(12)?,
        created_at: row.get(13)?,
        updated_at: row.get(14)?,
    })
}

impl EntityStore<Item> for ItemRepository {
    fn kind(&self) -> EntityKind {
        EntityKind::Item
    }

    fn get(&self, id: &str) -> RepositoryResult<Item> {
        let conn = self.get_conn()?;
        conn.query_row(
            &format!("SELECT {} FROM items WHERE item_id = ?1", ITEM_COLUMNS),
            params![id],
            map_item,
        )
        .optional()?
        .ok_or_else(|| RepositoryError::not_found("Item", id))
    }

    fn list(&self, zone_id: &str) -> RepositoryResult<Vec<Item>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM items WHERE zone_id = ?1 ORDER BY position ASC, created_at ASC",
            ITEM_COLUMNS
        ))?;
        let items = stmt
            .query_map(params![zone_id], map_item)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(items)
    }

    fn create(&self, item: &Item) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            &format!(
                "INSERT INTO items ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
                ITEM_COLUMNS
            ),
            params![
                item.item_id,
                item.zone_id,
                item.code,
                item.name,
                item.quantity,
                item.unit,
                item.current_stage,
                item.progress,
                item.position,
                item.materials,
                item.technical_notes,
                item.manager_comment,
                item.due_date,
                item.created_at,
                item.updated_at,
            ],
        )?;
        Ok(())
    }

    fn update(&self, id: &str, patch: &ItemPatch) -> RepositoryResult<Item> {
        {
            let conn = self.get_conn()?;
            let mut builder = UpdateBuilder::new("items", "item_id");
            builder
                .set_opt("code", patch.code.clone())
                .set_opt("name", patch.name.clone())
                .set_opt("quantity", patch.quantity)
                .set_opt("unit", patch.unit.clone())
                .set_opt("current_stage", patch.current_stage.clone())
                .set_opt("progress", patch.progress)
                .set_opt("position", patch.position)
                .set_opt("materials", patch.materials.clone())
                .set_opt("technical_notes", patch.technical_notes.clone())
                .set_opt("manager_comment", patch.manager_comment.clone())
                .set_opt("due_date", patch.due_date);

            if !builder.is_empty() {
                builder.set("updated_at", Utc::now().naive_utc());
                if execute_update(&conn, builder, id)? == 0 {
                    return Err(RepositoryError::not_found("Item", id));
                }
            }
        }
        self.get(id)
    }

    fn delete(&self, id: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let affected = conn.execute("DELETE FROM items WHERE item_id = ?1", params![id])?;
        if affected == 0 {
            return Err(RepositoryError::not_found("Item", id));
        }
        Ok(())
    }
}
