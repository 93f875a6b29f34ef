// ==========================================
// 车间生产跟踪 - API 层
// ==========================================
// 职责: 面向展示层的查询/变更门面
// ==========================================

pub mod error;
pub mod production_api;

// 重导出核心类型
pub use error::{ApiError, ApiResult};
pub use production_api::{
    ComponentDetail, ItemDetail, MoveDirection, Mutation, ProductionApi, ProjectSnapshot,
};
