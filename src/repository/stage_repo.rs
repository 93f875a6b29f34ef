// ==========================================
// 车间生产跟踪 - 工序数据仓储
// ==========================================
// 两张表共用一套映射:
// - component_stages: 部件工序（四态）
// - item_stages: 制品工序（三态，表级 CHECK 约束）
// 红线: Repository 不含业务逻辑
// ==========================================

use crate::domain::{EntityKind, Stage, StageOwner, StagePatch, StageStatus};
use crate::repository::entity_store::EntityStore;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::sql_builder::{execute_update, UpdateBuilder};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult, Row};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StageTable {
    Component,
    Item,
}

impl StageTable {
    fn table(&self) -> &'static str {
        match self {
            StageTable::Component => "component_stages",
            StageTable::Item => "item_stages",
        }
    }

    fn owner_column(&self) -> &'static str {
        match self {
            StageTable::Component => "component_id",
            StageTable::Item => "item_id",
        }
    }

    fn owner(&self, id: String) -> StageOwner {
        match self {
            StageTable::Component => StageOwner::Component(id),
            StageTable::Item => StageOwner::Item(id),
        }
    }

    fn matches(&self, owner: &StageOwner) -> bool {
        matches!(
            (self, owner),
            (StageTable::Component, StageOwner::Component(_)) | (StageTable::Item, StageOwner::Item(_))
        )
    }
}

// ==========================================
// StageRepository - 工序仓储
// ==========================================
pub struct StageRepository {
    conn: Arc<Mutex<Connection>>,
    table: StageTable,
}

impl StageRepository {
    /// 部件工序仓储
    pub fn component_stages(conn: Arc<Mutex<Connection>>) -> Self {
        Self {
            conn,
            table: StageTable::Component,
        }
    }

    /// 制品工序仓储
    pub fn item_stages(conn: Arc<Mutex<Connection>>) -> Self {
        Self {
            conn,
            table: StageTable::Item,
        }
    }

    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    fn columns(&self) -> String {
        format!(
            "stage_id, {}, stage_key, name, custom_label, status, position, assignee_id, \
             estimated_hours, actual_hours, notes, created_at, updated_at",
            self.table.owner_column()
        )
    }

    fn map_stage(&self, row: &Row<'_>) -> SqliteResult<Stage> {
        Ok(Stage {
            stage_id: row.get(0)?,
            owner: self.table.owner(row.get(1)?),
            stage_key: row.get(2)?,
            name: row.get(3)?,
            custom_label: row.get(4)?,
            status: StageStatus::from_db_str(&row.get::<_, String>(5)?),
            position: row.get(6)?,
            assignee_id: row.get(7)?,
            estimated_hours: row.get(8)?,
            actual_hours: row.get(9)?,
            notes: row.get(10)?,
            created_at: row.get(11)?,
            updated_at: row.get(12)?,
        })
    }
}

impl EntityStore<Stage> for StageRepository {
    fn kind(&self) -> EntityKind {
        match self.table {
            StageTable::Component => EntityKind::Stage,
            StageTable::Item => EntityKind::ItemStage,
        }
    }

    fn get(&self, id: &str) -> RepositoryResult<Stage> {
        let conn = self.get_conn()?;
        conn.query_row(
            &format!(
                "SELECT {} FROM {} WHERE stage_id = ?1",
                self.columns(),
                self.table.table()
            ),
            params![id],
            |row| self.map_stage(row),
        )
        .optional()?
        .ok_or_else(|| RepositoryError::not_found(self.kind().as_str(), id))
    }

    fn list(&self, owner_id: &str) -> RepositoryResult<Vec<Stage>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM {} WHERE {} = ?1 ORDER BY position ASC, created_at ASC",
            self.columns(),
            self.table.table(),
            self.table.owner_column()
        ))?;
        let stages = stmt
            .query_map(params![owner_id], |row| self.map_stage(row))?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(stages)
    }

    fn create(&self, stage: &Stage) -> RepositoryResult<()> {
        if !self.table.matches(&stage.owner) {
            return Err(RepositoryError::InternalError(format!(
                "工序归属与存储表不匹配: owner={}, table={}",
                stage.owner,
                self.table.table()
            )));
        }

        let conn = self.get_conn()?;
        conn.execute(
            &format!(
                "INSERT INTO {} ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
                self.table.table(),
                self.columns()
            ),
            params![
                stage.stage_id,
                stage.owner.id(),
                stage.stage_key,
                stage.name,
                stage.custom_label,
                stage.status.as_str(),
                stage.position,
                stage.assignee_id,
                stage.estimated_hours,
                stage.actual_hours,
                stage.notes,
                stage.created_at,
                stage.updated_at,
            ],
        )?;
        Ok(())
    }

    fn update(&self, id: &str, patch: &StagePatch) -> RepositoryResult<Stage> {
        {
            let conn = self.get_conn()?;
            let mut builder = UpdateBuilder::new(self.table.table(), "stage_id");
            builder
                .set_opt("name", patch.name.clone())
                .set_opt("custom_label", patch.custom_label.clone())
                .set_opt("status", patch.status.map(|s| s.as_str().to_string()))
                .set_opt("position", patch.position)
                .set_opt("assignee_id", patch.assignee_id.clone())
                .set_opt("estimated_hours", patch.estimated_hours)
                .set_opt("actual_hours", patch.actual_hours)
                .set_opt("notes", patch.notes.clone());

            if !builder.is_empty() {
                builder.set("updated_at", Utc::now().naive_utc());
                if execute_update(&conn, builder, id)? == 0 {
                    return Err(RepositoryError::not_found(self.kind().as_str(), id));
                }
            }
        }
        self.get(id)
    }

    fn delete(&self, id: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let affected = conn.execute(
            &format!("DELETE FROM {} WHERE stage_id = ?1", self.table.table()),
            params![id],
        )?;
        if affected == 0 {
            return Err(RepositoryError::not_found(self.kind().as_str(), id));
        }
        Ok(())
    }
}
