// ==========================================
// 车间生产跟踪 - 运行配置快照
// ==========================================
// 来源: config_kv（见 ConfigManager::load_production_config）
// ==========================================

use crate::domain::StageTemplate;
use crate::engine::templates::TemplateCatalog;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// 运行配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductionConfig {
    /// 变更事件防抖窗口（毫秒）
    pub debounce_ms: u64,
    /// 变更广播通道容量
    pub channel_capacity: usize,
    /// 追加到内置目录的自定义模板
    #[serde(default)]
    pub custom_templates: Vec<StageTemplate>,
}

impl ProductionConfig {
    pub const DEFAULT_DEBOUNCE_MS: u64 = 100;
    pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// 内置模板 + 自定义模板
    pub fn template_catalog(&self) -> TemplateCatalog {
        if self.custom_templates.is_empty() {
            TemplateCatalog::builtin()
        } else {
            TemplateCatalog::with_custom(self.custom_templates.clone())
        }
    }
}

impl Default for ProductionConfig {
    fn default() -> Self {
        Self {
            debounce_ms: Self::DEFAULT_DEBOUNCE_MS,
            channel_capacity: Self::DEFAULT_CHANNEL_CAPACITY,
            custom_templates: Vec::new(),
        }
    }
}
