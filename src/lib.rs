// ==========================================
// 车间生产跟踪 - 核心库
// ==========================================
// 层级: 分区 → 制品 → 部件 → 工序
// 技术栈: Rust + SQLite + tokio
// 系统定位: 车间进度跟踪（工序状态驱动进度聚合）
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 进度聚合与工序生命周期
pub mod engine;

// 配置层 - 运行配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA/表结构）
pub mod db;

// 日志系统
pub mod logging;

// API 层 - 查询/变更门面
pub mod api;

// 应用层 - 实例组装
pub mod app;

// 同步层 - 变更广播与防抖刷新
pub mod sync;

// 客户端 - 本地镜像与乐观变更
pub mod client;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{EntityKind, StageColor, StageOwner, StageStatus};

// 领域实体
pub use domain::{
    Component, ComponentMaterial, ComponentPart, Item, Stage, StageDefinition, StageTemplate,
    TemplateStrategy, Zone,
};

// 引擎
pub use engine::{AggregationEngine, CascadeOutcome, StageLifecycleManager, TemplateCatalog};

// API
pub use api::{ApiError, ApiResult, ProductionApi};

// 同步与客户端
pub use client::OptimisticMutationLayer;
pub use sync::{ChangeHub, ChangeNotificationController};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "车间生产跟踪";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
