// ==========================================
// 车间生产跟踪 - 实体存储契约
// ==========================================
// 职责: 按实体种类提供 get/list/create/update/delete
// 红线: 不含业务规则，不做重试，错误原样上抛
// ==========================================

use crate::domain::{
    Component, ComponentMaterial, ComponentPart, ComponentPatch, EntityKind, Item, ItemPatch,
    MaterialPatch, PartPatch, Stage, StagePatch, Zone, ZonePatch,
};
use crate::repository::error::RepositoryResult;

/// 可持久化记录
pub trait Record: Clone + Send + Sync + 'static {
    /// 局部更新类型
    type Patch: Send + Sync;

    fn record_id(&self) -> &str;

    /// 父级ID（zone→project, item→zone, component→item, stage→owner）
    fn parent_id(&self) -> &str;
}

/// 实体存储
///
/// - `get`: 记录不存在时返回 `RepositoryError::NotFound`
/// - `list`: 按父级ID过滤，有序实体按 position 排序
/// - `update`: 返回更新后的记录
/// - `delete`: 子级由外键级联删除
pub trait EntityStore<R: Record>: Send + Sync {
    fn kind(&self) -> EntityKind;

    fn get(&self, id: &str) -> RepositoryResult<R>;

    fn list(&self, parent_id: &str) -> RepositoryResult<Vec<R>>;

    fn create(&self, record: &R) -> RepositoryResult<()>;

    fn update(&self, id: &str, patch: &R::Patch) -> RepositoryResult<R>;

    fn delete(&self, id: &str) -> RepositoryResult<()>;
}

impl Record for Zone {
    type Patch = ZonePatch;

    fn record_id(&self) -> &str {
        &self.zone_id
    }

    fn parent_id(&self) -> &str {
        &self.project_id
    }
}

impl Record for Item {
    type Patch = ItemPatch;

    fn record_id(&self) -> &str {
        &self.item_id
    }

    fn parent_id(&self) -> &str {
        &self.zone_id
    }
}

impl Record for Component {
    type Patch = ComponentPatch;

    fn record_id(&self) -> &str {
        &self.component_id
    }

    fn parent_id(&self) -> &str {
        &self.item_id
    }
}

impl Record for Stage {
    type Patch = StagePatch;

    fn record_id(&self) -> &str {
        &self.stage_id
    }

    fn parent_id(&self) -> &str {
        self.owner.id()
    }
}

impl Record for ComponentMaterial {
    type Patch = MaterialPatch;

    fn record_id(&self) -> &str {
        &self.material_id
    }

    fn parent_id(&self) -> &str {
        &self.component_id
    }
}

impl Record for ComponentPart {
    type Patch = PartPatch;

    fn record_id(&self) -> &str {
        &self.part_id
    }

    fn parent_id(&self) -> &str {
        &self.component_id
    }
}
