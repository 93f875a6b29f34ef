// ==========================================
// 车间生产跟踪 - 部件材料 / 下料清单仓储
// ==========================================
// 纯描述数据，不参与进度聚合
// 红线: Repository 不含业务逻辑
// ==========================================

use crate::domain::{
    ComponentMaterial, ComponentPart, EntityKind, MaterialPatch, PartPatch,
};
use crate::repository::entity_store::EntityStore;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::sql_builder::{execute_update, UpdateBuilder};
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult, Row};
use std::sync::{Arc, Mutex, MutexGuard};

const MATERIAL_COLUMNS: &str = "material_id, component_id, name, material_type, thickness_mm, \
     brand, color, quantity, unit, notes, created_at";

const PART_COLUMNS: &str =
    "part_id, component_id, name, length_mm, width_mm, quantity, edging, notes, created_at";

fn lock(conn: &Arc<Mutex<Connection>>) -> RepositoryResult<MutexGuard<'_, Connection>> {
    conn.lock()
        .map_err(|e| RepositoryError::LockError(e.to_string()))
}

// ==========================================
// ComponentMaterialRepository - 部件材料仓储
// ==========================================
pub struct ComponentMaterialRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ComponentMaterialRepository {
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }
}

fn map_material(row: &Row<'_>) -> SqliteResult<ComponentMaterial> {
    Ok(ComponentMaterial {
        material_id: row.get(0)?,
        component_id: row.get(1)?,
        name: row.get(2)?,
        material_type: row.get(3)?,
        thickness_mm: row.get(4)?,
        brand: row.get(5)?,
        color: row.get(6)?,
        quantity: row.get(7)?,
        unit: row.get(8)?,
        notes: row.get(9)?,
        created_at: row.get(10)?,
    })
}

impl EntityStore<ComponentMaterial> for ComponentMaterialRepository {
    fn kind(&self) -> EntityKind {
        EntityKind::Material
    }

    fn get(&self, id: &str) -> RepositoryResult<ComponentMaterial> {
        let conn = lock(&self.conn)?;
        conn.query_row(
            &format!(
                "SELECT {} FROM component_materials WHERE material_id = ?1",
                MATERIAL_COLUMNS
            ),
            params![id],
            map_material,
        )
        .optional()?
        .ok_or_else(|| RepositoryError::not_found("Material", id))
    }

    fn list(&self, component_id: &str) -> RepositoryResult<Vec<ComponentMaterial>> {
        let conn = lock(&self.conn)?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM component_materials WHERE component_id = ?1 ORDER BY created_at ASC",
            MATERIAL_COLUMNS
        ))?;
        let materials = stmt
            .query_map(params![component_id], map_material)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(materials)
    }

    fn create(&self, material: &ComponentMaterial) -> RepositoryResult<()> {
        let conn = lock(&self.conn)?;
        conn.execute(
            &format!(
                "INSERT INTO component_materials ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                MATERIAL_COLUMNS
            ),
            params![
                material.material_id,
                material.component_id,
                material.name,
                material.material_type,
                material.thickness_mm,
                material.brand,
                material.color,
                material.quantity,
                material.unit,
                material.notes,
                material.created_at,
            ],
        )?;
        Ok(())
    }

    fn update(&self, id: &str, patch: &MaterialPatch) -> RepositoryResult<ComponentMaterial> {
        {
            let conn = lock(&self.conn)?;
            let mut builder = UpdateBuilder::new("component_materials", "material_id");
            builder
                .set_opt("name", patch.name.clone())
                .set_opt("material_type", patch.material_type.clone())
                .set_opt("thickness_mm", patch.thickness_mm)
                .set_opt("brand", patch.brand.clone())
                .set_opt("color", patch.color.clone())
                .set_opt("quantity", patch.quantity)
                .set_opt("unit", patch.unit.clone())
                .set_opt("notes", patch.notes.clone());

            if !builder.is_empty() && execute_update(&conn, builder, id)? == 0 {
                return Err(RepositoryError::not_found("Material", id));
            }
        }
        self.get(id)
    }

    fn delete(&self, id: &str) -> RepositoryResult<()> {
        let conn = lock(&self.conn)?;
        let affected = conn.execute(
            "DELETE FROM component_materials WHERE material_id = ?1",
            params![id],
        )?;
        if affected == 0 {
            return Err(RepositoryError::not_found("Material", id));
        }
        Ok(())
    }
}

// ==========================================
// ComponentPartRepository - 下料清单仓储
// ==========================================
pub struct ComponentPartRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ComponentPartRepository {
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }
}

fn map_part(row: &Row<'_>) -> SqliteResult<ComponentPart> {
    Ok(ComponentPart {
        part_id: row.get(0)?,
        component_id: row.get(1)?,
        name: row.get(2)?,
        length_mm: row.get(3)?,
        width_mm: row.get(4)?,
        quantity: row.get(5)?,
        edging: row.get(6)?,
        notes: row.get(7)?,
        created_at: row.get(8)?,
    })
}

impl EntityStore<ComponentPart> for ComponentPartRepository {
    fn kind(&self) -> EntityKind {
        EntityKind::Part
    }

    fn get(&self, id: &str) -> RepositoryResult<ComponentPart> {
        let conn = lock(&self.conn)?;
        conn.query_row(
            &format!(
                "SELECT {} FROM component_parts WHERE part_id = ?1",
                PART_COLUMNS
            ),
            params![id],
            map_part,
        )
        .optional()?
        .ok_or_else(|| RepositoryError::not_found("Part", id))
    }

    fn list(&self, component_id: &str) -> RepositoryResult<Vec<ComponentPart>> {
        let conn = lock(&self.conn)?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM component_parts WHERE component_id = ?1 ORDER BY created_at ASC",
            PART_COLUMNS
        ))?;
        let parts = stmt
            .query_map(params![component_id], map_part)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(parts)
    }

    fn create(&self, part: &ComponentPart) -> RepositoryResult<()> {
        let conn = lock(&self.conn)?;
        conn.execute(
            &format!(
                "INSERT INTO component_parts ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                PART_COLUMNS
            ),
            params![
                part.part_id,
                part.component_id,
                part.name,
                part.length_mm,
                part.width_mm,
                part.quantity,
                part.edging,
                part.notes,
                part.created_at,
            ],
        )?;
        Ok(())
    }

    fn update(&self, id: &str, patch: &PartPatch) -> RepositoryResult<ComponentPart> {
        {
            let conn = lock(&self.conn)?;
            let mut builder = UpdateBuilder::new("component_parts", "part_id");
            builder
                .set_opt("name", patch.name.clone())
                .set_opt("length_mm", patch.length_mm)
                .set_opt("width_mm", patch.width_mm)
                .set_opt("quantity", patch.quantity)
                .set_opt("edging", patch.edging.clone())
                .set_opt("notes", patch.notes.clone());

            if !builder.is_empty() && execute_update(&conn, builder, id)? == 0 {
                return Err(RepositoryError::not_found("Part", id));
            }
        }
        self.get(id)
    }

    fn delete(&self, id: &str) -> RepositoryResult<()> {
        let conn = lock(&self.conn)?;
        let affected = conn.execute("DELETE FROM component_parts WHERE part_id = ?1", params![id])?;
        if affected == 0 {
            return Err(RepositoryError::not_found("Part", id));
        }
        Ok(())
    }
}
