// ==========================================
// 车间生产跟踪 - 配置层
// ==========================================
// 职责: 运行配置读取与覆写
// 存储: config_kv 表
// ==========================================

pub mod config_manager;
pub mod production_config;

// 重导出核心配置管理器
pub use config_manager::{config_keys, ConfigManager};
pub use production_config::ProductionConfig;
