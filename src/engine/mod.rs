// ==========================================
// 车间生产跟踪 - 引擎层
// ==========================================
// 职责: 进度聚合、工序生命周期、模板目录、变更事件
// 红线: Engine 不拼 SQL，数据访问只经由 EntityStore
// ==========================================

pub mod aggregation;
pub mod error;
pub mod events;
pub mod progress;
pub mod repositories;
pub mod stage_lifecycle;
pub mod templates;

// 重导出核心引擎
pub use aggregation::{AggregationEngine, CascadeOutcome, ProgressDrift, ProgressUpdate};
pub use error::{
    CascadeError, CascadeLevel, CascadeResult, LifecycleError, LifecycleResult,
};
pub use events::{
    ChangeEvent, ChangeEventType, ChangePublisher, NoOpChangePublisher, OptionalChangePublisher,
};
pub use repositories::ProductionRepositories;
pub use stage_lifecycle::{StageLifecycleManager, StageMutation, TemplateApplication};
pub use templates::TemplateCatalog;
