// ==========================================
// 车间生产跟踪 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================
// 职责: 提供数据访问接口,屏蔽数据库细节
// 约束: 所有查询使用参数化,防止 SQL 注入
// ==========================================

pub mod component_repo;
pub mod entity_store;
pub mod error;
pub mod item_repo;
pub mod material_repo;
pub mod sql_builder;
pub mod stage_repo;
pub mod zone_repo;

// 重导出核心仓储
pub use component_repo::ComponentRepository;
pub use entity_store::{EntityStore, Record};
pub use error::{RepositoryError, RepositoryResult};
pub use item_repo::ItemRepository;
pub use material_repo::{ComponentMaterialRepository, ComponentPartRepository};
pub use stage_repo::StageRepository;
pub use zone_repo::ZoneRepository;
