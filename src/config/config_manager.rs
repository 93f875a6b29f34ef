// ==========================================
// 车间生产跟踪 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value + scope)
// ==========================================

use crate::config::production_config::ProductionConfig;
use crate::db::open_sqlite_connection;
use crate::domain::StageTemplate;
use rusqlite::{params, Connection};
use serde_json::json;
use std::collections::HashMap;
use std::error::Error;
use std::sync::{Arc, Mutex};

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> Result<Self, Box<dyn Error>> {
        let conn = open_sqlite_connection(db_path)?;
        crate::db::ensure_schema(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：为保证连接行为一致，会对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Result<Self, Box<dyn Error>> {
        {
            let conn_guard = conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
            crate::db::configure_sqlite_connection(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    fn get_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let result = conn.query_row(
            "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(Box::new(e)),
        }
    }

    /// 读取 global scope 的配置值
    pub fn get_global_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        self.get_config_value(key)
    }

    /// 写入 global scope 的配置值（存在则覆盖）
    pub fn set_global_config_value(&self, key: &str, value: &str) -> Result<(), Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value, updated_at)
             VALUES ('global', ?1, ?2, datetime('now'))
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
            params![key, value],
        )?;
        Ok(())
    }

    fn get_config_or_default(&self, key: &str, default: &str) -> Result<String, Box<dyn Error>> {
        Ok(self.get_config_value(key)?.unwrap_or_else(|| default.to_string()))
    }

    /// 获取所有 global 配置的快照（JSON格式）
    pub fn get_config_snapshot(&self) -> Result<String, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let mut stmt =
            conn.prepare("SELECT key, value FROM config_kv WHERE scope_id = 'global' ORDER BY key")?;

        let mut config_map: HashMap<String, String> = HashMap::new();
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        for row in rows {
            let (key, value) = row?;
            config_map.insert(key, value);
        }

        Ok(serde_json::to_string(&json!(config_map))?)
    }

    // ===== 变更订阅配置 =====

    /// 防抖窗口（毫秒，默认 100）
    pub fn get_debounce_ms(&self) -> Result<u64, Box<dyn Error>> {
        let default = ProductionConfig::DEFAULT_DEBOUNCE_MS.to_string();
        let value = self.get_config_or_default(config_keys::DEBOUNCE_MS, &default)?;
        Ok(value
            .trim()
            .parse::<u64>()
            .unwrap_or(ProductionConfig::DEFAULT_DEBOUNCE_MS))
    }

    /// 变更广播通道容量（默认 256，最小 1）
    pub fn get_channel_capacity(&self) -> Result<usize, Box<dyn Error>> {
        let default = ProductionConfig::DEFAULT_CHANNEL_CAPACITY.to_string();
        let value = self.get_config_or_default(config_keys::CHANNEL_CAPACITY, &default)?;
        Ok(value
            .trim()
            .parse::<usize>()
            .ok()
            .filter(|c| *c > 0)
            .unwrap_or(ProductionConfig::DEFAULT_CHANNEL_CAPACITY))
    }

    // ===== 模板配置 =====

    /// 自定义工序模板（JSON 数组）
    ///
    /// 格式错误时记录告警并返回空列表（只使用内置模板）
    pub fn get_custom_templates(&self) -> Result<Vec<StageTemplate>, Box<dyn Error>> {
        let value = self.get_config_or_default(config_keys::CUSTOM_TEMPLATES, "[]")?;
        let templates: Vec<StageTemplate> = serde_json::from_str(&value).unwrap_or_else(|_| {
            tracing::warn!(
                config_key = config_keys::CUSTOM_TEMPLATES,
                raw_value = %value,
                "自定义模板配置格式错误，使用内置模板"
            );
            Vec::new()
        });
        Ok(templates)
    }

    /// 读取完整配置快照
    pub fn load_production_config(&self) -> Result<ProductionConfig, Box<dyn Error>> {
        Ok(ProductionConfig {
            debounce_ms: self.get_debounce_ms()?,
            channel_capacity: self.get_channel_capacity()?,
            custom_templates: self.get_custom_templates()?,
        })
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 变更订阅
    pub const DEBOUNCE_MS: &str = "change_feed.debounce_ms";
    pub const CHANNEL_CAPACITY: &str = "change_feed.channel_capacity";

    // 工序模板
    pub const CUSTOM_TEMPLATES: &str = "templates.custom_json";
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> ConfigManager {
        let conn = crate::db::open_in_memory().unwrap();
        ConfigManager::from_connection(Arc::new(Mutex::new(conn))).unwrap()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = manager().load_production_config().unwrap();
        assert_eq!(config.debounce_ms, 100);
        assert_eq!(config.channel_capacity, 256);
        assert!(config.custom_templates.is_empty());
    }

    #[test]
    fn test_values_persist_across_managers() {
        let temp = tempfile::NamedTempFile::new().unwrap();
        let db_path = temp.path().to_str().unwrap().to_string();

        ConfigManager::new(&db_path)
            .unwrap()
            .set_global_config_value(config_keys::DEBOUNCE_MS, "40")
            .unwrap();
        let reopened = ConfigManager::new(&db_path).unwrap();
        assert_eq!(reopened.get_debounce_ms().unwrap(), 40);
    }

    #[test]
    fn test_overrides_and_invalid_values() {
        let manager = manager();
        manager.set_global_config_value(config_keys::DEBOUNCE_MS, "250").unwrap();
        manager.set_global_config_value(config_keys::CHANNEL_CAPACITY, "0").unwrap();
        manager.set_global_config_value(config_keys::CUSTOM_TEMPLATES, "not json").unwrap();

        let config = manager.load_production_config().unwrap();
        assert_eq!(config.debounce_ms, 250);
        assert_eq!(config.channel_capacity, 256);
        assert!(config.custom_templates.is_empty());

        let snapshot = manager.get_config_snapshot().unwrap();
        assert!(snapshot.contains("change_feed.debounce_ms"));
    }

    #[test]
    fn test_custom_templates_parsed() {
        let manager = manager();
        let raw = r#"[{"key":"stone","label":"Камень","stages":[
            {"key":"cutting","label":"Резка","default_estimated_hours":2.0},
            {"key":"polishing","label":"Полировка","default_estimated_hours":null}
        ]}]"#;
        manager.set_global_config_value(config_keys::CUSTOM_TEMPLATES, raw).unwrap();

        let templates = manager.get_custom_templates().unwrap();
        assert_eq!(templates.len(), 1);
        assert_eq!(templates[0].stages.len(), 2);
        assert_eq!(templates[0].stages[1].default_estimated_hours, None);
    }
}
