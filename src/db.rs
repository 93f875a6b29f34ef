// ==========================================
// 车间生产跟踪 - SQLite 连接初始化
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为（外键级联依赖 foreign_keys）
// - 统一 busy_timeout，减少多查看者并发写入时的偶发 busy 错误
// - 建表幂等，记录 schema_version
// ==========================================

use rusqlite::Connection;
use rusqlite::OptionalExtension;
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 当前代码所期望的 schema_version
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：
/// - foreign_keys 需要“每个连接”单独开启
/// - busy_timeout 需要“每个连接”单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 打开内存数据库（单元测试用）
pub fn open_in_memory() -> rusqlite::Result<Connection> {
    let conn = Connection::open_in_memory()?;
    configure_sqlite_connection(&conn)?;
    ensure_schema(&conn)?;
    Ok(conn)
}

/// 读取 schema_version（若表不存在则返回 None）
pub fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<i64>> {
    let has_table: bool = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version' LIMIT 1",
            [],
            |_row| Ok(true),
        )
        .optional()?
        .unwrap_or(false);

    if !has_table {
        return Ok(None);
    }

    let v: Option<i64> =
        conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(v)
}

/// 建表（幂等）
///
/// 层级所有权通过 ON DELETE CASCADE 表达：
/// zones → items → components → component_stages / component_materials / component_parts
/// items → item_stages
pub fn ensure_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS config_kv (
            scope_id TEXT NOT NULL DEFAULT 'global',
            key TEXT NOT NULL,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL DEFAULT (datetime('now')),
            PRIMARY KEY (scope_id, key)
        );

        CREATE TABLE IF NOT EXISTS zones (
            zone_id TEXT PRIMARY KEY,
            project_id TEXT NOT NULL,
            name TEXT NOT NULL,
            position INTEGER NOT NULL DEFAULT 0,
            progress INTEGER NOT NULL DEFAULT 0,
            items_count INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_zones_project ON zones(project_id, position);

        CREATE TABLE IF NOT EXISTS items (
            item_id TEXT PRIMARY KEY,
            zone_id TEXT NOT NULL REFERENCES zones(zone_id) ON DELETE CASCADE,
            code TEXT NOT NULL,
            name TEXT NOT NULL,
            quantity REAL NOT NULL DEFAULT 1,
            unit TEXT NOT NULL,
            current_stage TEXT,
            progress INTEGER NOT NULL DEFAULT 0,
            position INTEGER NOT NULL DEFAULT 0,
            materials TEXT,
            technical_notes TEXT,
            manager_comment TEXT,
            due_date TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_items_zone ON items(zone_id, position);

        CREATE TABLE IF NOT EXISTS components (
            component_id TEXT PRIMARY KEY,
            item_id TEXT NOT NULL REFERENCES items(item_id) ON DELETE CASCADE,
            name TEXT NOT NULL,
            material TEXT,
            quantity REAL NOT NULL DEFAULT 1,
            unit TEXT NOT NULL,
            progress INTEGER NOT NULL DEFAULT 0,
            position INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_components_item ON components(item_id, position);

        CREATE TABLE IF NOT EXISTS component_stages (
            stage_id TEXT PRIMARY KEY,
            component_id TEXT NOT NULL REFERENCES components(component_id) ON DELETE CASCADE,
            stage_key TEXT NOT NULL,
            name TEXT NOT NULL,
            custom_label TEXT,
            status TEXT NOT NULL DEFAULT 'pending',
            position INTEGER NOT NULL,
            assignee_id TEXT,
            estimated_hours REAL,
            actual_hours REAL,
            notes TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_component_stages_owner ON component_stages(component_id, position);

        CREATE TABLE IF NOT EXISTS item_stages (
            stage_id TEXT PRIMARY KEY,
            item_id TEXT NOT NULL REFERENCES items(item_id) ON DELETE CASCADE,
            stage_key TEXT NOT NULL,
            name TEXT NOT NULL,
            custom_label TEXT,
            status TEXT NOT NULL DEFAULT 'pending',
            position INTEGER NOT NULL,
            assignee_id TEXT,
            estimated_hours REAL,
            actual_hours REAL,
            notes TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            CHECK (status IN ('pending', 'in_progress', 'completed'))
        );
        CREATE INDEX IF NOT EXISTS idx_item_stages_owner ON item_stages(item_id, position);

        CREATE TABLE IF NOT EXISTS component_materials (
            material_id TEXT PRIMARY KEY,
            component_id TEXT NOT NULL REFERENCES components(component_id) ON DELETE CASCADE,
            name TEXT NOT NULL,
            material_type TEXT,
            thickness_mm REAL,
            brand TEXT,
            color TEXT,
            quantity REAL,
            unit TEXT,
            notes TEXT,
            created_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS component_parts (
            part_id TEXT PRIMARY KEY,
            component_id TEXT NOT NULL REFERENCES components(component_id) ON DELETE CASCADE,
            name TEXT NOT NULL,
            length_mm REAL,
            width_mm REAL,
            quantity INTEGER NOT NULL DEFAULT 1,
            edging TEXT,
            notes TEXT,
            created_at TEXT NOT NULL
        );
        "#,
    )?;

    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        [CURRENT_SCHEMA_VERSION],
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_schema_is_idempotent() {
        let conn = open_in_memory().unwrap();
        ensure_schema(&conn).unwrap();
        assert_eq!(
            read_schema_version(&conn).unwrap(),
            Some(CURRENT_SCHEMA_VERSION)
        );
    }

    #[test]
    fn test_foreign_keys_enabled() {
        let conn = open_in_memory().unwrap();
        let on: i64 = conn
            .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
            .unwrap();
        assert_eq!(on, 1);
    }
}
