// ==========================================
// 车间生产跟踪 - 生产 API
// ==========================================
// 职责: 层级查询、增删改、工序操作、变更事件发布
// 约束:
// - 校验在任何写操作之前完成
// - 每次结构变更或状态变更后重算聚合进度
// - 写操作成功（含级联失败但写入已生效）后发布项目级变更事件
// ==========================================

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::api::error::{ApiError, ApiResult};
use crate::domain::{
    Component, ComponentMaterial, ComponentPart, EntityKind, Item, Stage, StageOwner,
    StageTemplate, Zone,
};
use crate::engine::aggregation::{AggregationEngine, CascadeOutcome, ProgressDrift};
use crate::engine::error::{LifecycleError, LifecycleResult};
use crate::engine::events::{ChangeEvent, ChangePublisher, OptionalChangePublisher};
use crate::engine::repositories::ProductionRepositories;
use crate::engine::stage_lifecycle::StageLifecycleManager;

mod attachments;
mod hierarchy;
mod stages;

pub use stages::MoveDirection;

// ==========================================
// 返回结构
// ==========================================

/// 部件详情（工序、材料、下料清单）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentDetail {
    pub component: Component,
    pub stages: Vec<Stage>,
    pub materials: Vec<ComponentMaterial>,
    pub parts: Vec<ComponentPart>,
}

/// 制品详情（全部部件详情 + 制品工序）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemDetail {
    pub item: Item,
    pub components: Vec<ComponentDetail>,
    pub item_stages: Vec<Stage>,
}

/// 项目快照（分区 + 全部制品）
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectSnapshot {
    pub project_id: String,
    pub zones: Vec<Zone>,
    pub items: Vec<Item>,
}

/// 写操作结果
///
/// - `cascade`: 部件/工序变更触发的权威聚合值
/// - `zone`: 制品增删后重新读取的分区（进度与制品数量）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Mutation<T> {
    pub record: T,
    pub cascade: Option<CascadeOutcome>,
    pub zone: Option<Zone>,
}

impl<T> Mutation<T> {
    fn plain(record: T) -> Self {
        Self {
            record,
            cascade: None,
            zone: None,
        }
    }

    fn cascaded(record: T, cascade: Option<CascadeOutcome>) -> Self {
        Self {
            record,
            cascade,
            zone: None,
        }
    }
}

// ==========================================
// ProductionApi - 生产 API
// ==========================================

/// 生产跟踪 API
///
/// 职责：
/// 1. 项目/分区/制品/部件查询
/// 2. 层级节点与材料、下料清单的增删改
/// 3. 工序增删改、排序、按模板重置
/// 4. 聚合进度重算与审计
pub struct ProductionApi {
    repos: ProductionRepositories,
    lifecycle: Arc<StageLifecycleManager>,
    aggregation: Arc<AggregationEngine>,
    // 事件发布器（依赖倒置：不直接依赖同步层）
    publisher: OptionalChangePublisher,
}

impl ProductionApi {
    pub fn new(
        repos: ProductionRepositories,
        lifecycle: Arc<StageLifecycleManager>,
        aggregation: Arc<AggregationEngine>,
        publisher: Option<Arc<dyn ChangePublisher>>,
    ) -> Self {
        let publisher = match publisher {
            Some(p) => OptionalChangePublisher::with_publisher(p),
            None => OptionalChangePublisher::none(),
        };
        Self {
            repos,
            lifecycle,
            aggregation,
            publisher,
        }
    }

    // ==========================================
    // 查询接口
    // ==========================================

    pub fn list_zones(&self, project_id: &str) -> ApiResult<Vec<Zone>> {
        require_id("项目ID", project_id)?;
        Ok(self.repos.zones.list(project_id)?)
    }

    /// 项目内全部制品（按分区顺序、分区内按 position）
    pub fn list_items(&self, project_id: &str) -> ApiResult<Vec<Item>> {
        Ok(self.get_project_snapshot(project_id)?.items)
    }

    pub fn list_zone_items(&self, zone_id: &str) -> ApiResult<Vec<Item>> {
        require_id("分区ID", zone_id)?;
        Ok(self.repos.items.list(zone_id)?)
    }

    pub fn get_project_snapshot(&self, project_id: &str) -> ApiResult<ProjectSnapshot> {
        let zones = self.list_zones(project_id)?;
        let mut items = Vec::new();
        for zone in &zones {
            items.extend(self.repos.items.list(&zone.zone_id)?);
        }
        Ok(ProjectSnapshot {
            project_id: project_id.to_string(),
            zones,
            items,
        })
    }

    pub fn get_item_detail(&self, item_id: &str) -> ApiResult<ItemDetail> {
        require_id("制品ID", item_id)?;
        let item = self.repos.items.get(item_id)?;
        let components = self
            .repos
            .components
            .list(item_id)?
            .into_iter()
            .map(|c| self.component_detail(c))
            .collect::<ApiResult<Vec<_>>>()?;
        let item_stages = self.repos.item_stages.list(item_id)?;
        Ok(ItemDetail {
            item,
            components,
            item_stages,
        })
    }

    pub fn get_component_detail(&self, component_id: &str) -> ApiResult<ComponentDetail> {
        require_id("部件ID", component_id)?;
        let component = self.repos.components.get(component_id)?;
        self.component_detail(component)
    }

    pub fn list_templates(&self) -> Vec<StageTemplate> {
        self.lifecycle.catalog().templates().to_vec()
    }

    /// 比对缓存进度与由工序状态派生的进度
    pub fn audit_project(&self, project_id: &str) -> ApiResult<Vec<ProgressDrift>> {
        require_id("项目ID", project_id)?;
        Ok(self.aggregation.audit_project(project_id)?)
    }

    fn component_detail(&self, component: Component) -> ApiResult<ComponentDetail> {
        let id = component.component_id.clone();
        Ok(ComponentDetail {
            component,
            stages: self.repos.stages.list(&id)?,
            materials: self.repos.materials.list(&id)?,
            parts: self.repos.parts.list(&id)?,
        })
    }

    // ==========================================
    // 项目归属解析（用于事件路由）
    // ==========================================

    fn project_of_zone(&self, zone_id: &str) -> ApiResult<String> {
        Ok(self.repos.zones.get(zone_id)?.project_id)
    }

    fn project_of_item(&self, item_id: &str) -> ApiResult<String> {
        let item = self.repos.items.get(item_id)?;
        self.project_of_zone(&item.zone_id)
    }

    fn project_of_component(&self, component_id: &str) -> ApiResult<String> {
        let component = self.repos.components.get(component_id)?;
        self.project_of_item(&component.item_id)
    }

    fn project_of_owner(&self, owner: &StageOwner) -> ApiResult<String> {
        match owner {
            StageOwner::Component(id) => self.project_of_component(id),
            StageOwner::Item(id) => self.project_of_item(id),
        }
    }

    fn publish(&self, event: ChangeEvent) {
        self.publisher.publish(event);
    }

    /// 写入已生效时发布事件（成功，或写入后级联失败）
    fn publish_lifecycle<T>(
        &self,
        result: &LifecycleResult<T>,
        project_id: &str,
        kind: EntityKind,
        record_id: &str,
        event: fn(&str, EntityKind, &str) -> ChangeEvent,
    ) {
        match result {
            Ok(_) => self.publish(event(project_id, kind, record_id)),
            Err(LifecycleError::Cascade(e)) => {
                warn!("写入已生效但聚合重算失败: record_id={}, error={}", record_id, e);
                self.publish(event(project_id, kind, record_id));
            }
            Err(_) => {}
        }
    }
}

// ==========================================
// 校验辅助
// ==========================================

fn require_id(field: &str, value: &str) -> ApiResult<()> {
    if value.trim().is_empty() {
        return Err(ApiError::InvalidInput(format!("{}不能为空", field)));
    }
    Ok(())
}

fn require_name(field: &str, value: &str) -> ApiResult<()> {
    if value.trim().is_empty() {
        return Err(ApiError::InvalidInput(format!("{}名称不能为空", field)));
    }
    Ok(())
}

fn require_non_negative(field: &str, value: Option<f64>) -> ApiResult<()> {
    match value {
        Some(v) if !v.is_finite() || v < 0.0 => Err(ApiError::InvalidInput(format!(
            "{} 必须为非负数: {}",
            field, v
        ))),
        _ => Ok(()),
    }
}

/// 聚合字段只能由重算写入
fn reject_derived(field: &str, present: bool) -> ApiResult<()> {
    if present {
        return Err(ApiError::InvalidInput(format!("{} 为派生字段，不可直接修改", field)));
    }
    Ok(())
}
