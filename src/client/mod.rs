// ==========================================
// 车间生产跟踪 - 查看者侧客户端
// ==========================================
// mirror: 本地层级镜像（确认值 + 乐观值）
// optimistic: 乐观变更层（先改镜像，再调 API，失败回滚）
// ==========================================

pub mod mirror;
pub mod optimistic;

pub use mirror::{HierarchyMirror, MirrorRecord, Table};
pub use optimistic::OptimisticMutationLayer;
