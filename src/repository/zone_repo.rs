// ==========================================
// 车间生产跟踪 - 分区数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================

use crate::domain::{EntityKind, Zone, ZonePatch};
use crate::repository::entity_store::EntityStore;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::sql_builder::{execute_update, UpdateBuilder};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult, Row};
use std::sync::{Arc, Mutex, MutexGuard};

const ZONE_COLUMNS: &str =
    "zone_id, project_id, name, position, progress, items_count, created_at, updated_at";

// ==========================================
// ZoneRepository - 分区仓储
// ==========================================
/// 分区仓储
/// 职责: 管理 zones 表的 CRUD 操作
pub struct ZoneRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ZoneRepository {
    /// 从已有连接创建仓储实例
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 查询全部项目ID（去重，按字典序）
    pub fn list_project_ids(&self) -> RepositoryResult<Vec<String>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare("SELECT DISTINCT project_id FROM zones ORDER BY project_id")?;
        let ids = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(ids)
    }
}

fn map_zone(row: &Row<'_>) -> SqliteResult<Zone> {
    Ok(Zone {
        zone_id: row.get(0)?,
        project_id: row.get(1)?,
        name: row.get(2)?,
        position: row.get(3)?,
        progress: row.get(4)?,
        items_count: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

impl EntityStore<Zone> for ZoneRepository {
    fn kind(&self) -> EntityKind {
        EntityKind::Zone
    }

    fn get(&self, id: &str) -> RepositoryResult<Zone> {
        let conn = self.get_conn()?;
        conn.query_row(
            &format!("SELECT {} FROM zones WHERE zone_id = ?1", ZONE_COLUMNS),
            params![id],
            map_zone,
        )
        .optional()?
        .ok_or_else(|| RepositoryError::not_found("Zone", id))
    }

    fn list(&self, project_id: &str) -> RepositoryResult<Vec<Zone>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM zones WHERE project_id = ?1 ORDER BY position ASC, created_at ASC",
            ZONE_COLUMNS
        ))?;
        let zones = stmt
            .query_map(params![project_id], map_zone)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(zones)
    }

    fn create(&self, zone: &Zone) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            &format!(
                "INSERT INTO zones ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                ZONE_COLUMNS
            ),
            params![
                zone.zone_id,
                zone.project_id,
                zone.name,
                zone.position,
                zone.progress,
                zone.items_count,
                zone.created_at,
                zone.updated_at,
            ],
        )?;
        Ok(())
    }

    fn update(&self, id: &str, patch: &ZonePatch) -> RepositoryResult<Zone> {
        {
            let conn = self.get_conn()?;
            let mut builder = UpdateBuilder::new("zones", "zone_id");
            builder
                .set_opt("name", patch.name.clone())
                .set_opt("position", patch.position)
                .set_opt("progress", patch.progress)
                .set_opt("items_count", patch.items_count);

            if !builder.is_empty() {
                builder.set("updated_at", Utc::now().naive_utc());
                if execute_update(&conn, builder, id)? == 0 {
                    return Err(RepositoryError::not_found("Zone", id));
                }
            }
        }
        self.get(id)
    }

    fn delete(&self, id: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let affected = conn.execute("DELETE FROM zones WHERE zone_id = ?1", params![id])?;
        if affected == 0 {
            return Err(RepositoryError::not_found("Zone", id));
        }
        Ok(())
    }
}
