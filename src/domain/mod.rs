// ==========================================
// 车间生产跟踪 - 领域模型层
// ==========================================
// 层级: 分区 → 制品 → 部件 → 工序
// 每一级独占其子级，子级生命周期受父级约束
// ==========================================
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod component;
pub mod item;
pub mod stage;
pub mod template;
pub mod types;
pub mod zone;

// 重导出核心类型
pub use component::{
    Component, ComponentMaterial, ComponentPart, ComponentPatch, MaterialPatch, NewComponent,
    NewComponentMaterial, NewComponentPart, PartPatch,
};
pub use item::{Item, ItemPatch, NewItem};
pub use stage::{Stage, StagePatch};
pub use template::{StageDefinition, StageTemplate, TemplateStrategy};
pub use types::{EntityKind, StageColor, StageOwner, StageStatus};
pub use zone::{Zone, ZonePatch};
