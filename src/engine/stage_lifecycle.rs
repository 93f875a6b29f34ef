// ==========================================
// 车间生产跟踪 - 工序生命周期管理
// ==========================================
// 职责: 工序增删改、上下移动、重排、模板实例化（替换/合并）
// 红线:
// - 校验错误在任何写操作之前本地拒绝
// - 部件工序的结构变更与状态变更必须触发级联重算
// - 状态为自由赋值，不拒绝任何状态转换（制品工序仅禁止质检状态）
// - 删除工序不自动重排 position（显式调用 normalize_positions 修正）
// ==========================================

use crate::domain::{
    Stage, StageDefinition, StageOwner, StagePatch, StageTemplate, TemplateStrategy,
};
use crate::engine::aggregation::{AggregationEngine, CascadeOutcome};
use crate::engine::error::{LifecycleError, LifecycleResult};
use crate::engine::repositories::ProductionRepositories;
use crate::engine::templates::TemplateCatalog;
use crate::repository::{EntityStore, RepositoryError};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, instrument};

// ==========================================
// 操作结果
// ==========================================

/// 单个工序变更结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageMutation {
    /// 变更后的工序（删除时为删除前快照）
    pub stage: Stage,
    /// 部件工序触发的级联结果；制品工序或无需重算时为 None
    pub cascade: Option<CascadeOutcome>,
}

/// 模板实例化结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateApplication {
    pub template_key: String,
    pub strategy: TemplateStrategy,
    /// 实例化后的完整工序列表（按 position 排序）
    pub stages: Vec<Stage>,
    pub created: usize,
    pub removed: usize,
    pub cascade: Option<CascadeOutcome>,
}

// ==========================================
// StageLifecycleManager - 工序生命周期管理器
// ==========================================
pub struct StageLifecycleManager {
    repos: ProductionRepositories,
    catalog: Arc<TemplateCatalog>,
    aggregation: Arc<AggregationEngine>,
}

impl StageLifecycleManager {
    pub fn new(
        repos: ProductionRepositories,
        catalog: Arc<TemplateCatalog>,
        aggregation: Arc<AggregationEngine>,
    ) -> Self {
        Self {
            repos,
            catalog,
            aggregation,
        }
    }

    pub fn catalog(&self) -> &TemplateCatalog {
        &self.catalog
    }

    // ==========================================
    // 部件工序
    // ==========================================

    /// 追加工序到末尾（下一个 position），并级联重算
    pub fn add_stage(
        &self,
        component_id: &str,
        definition: &StageDefinition,
    ) -> LifecycleResult<StageMutation> {
        self.add(StageOwner::Component(component_id.to_string()), definition)
    }

    /// 修改工序；状态字段存在时级联重算
    pub fn update_stage(&self, stage_id: &str, patch: &StagePatch) -> LifecycleResult<StageMutation> {
        let store = self.repos.stages.clone();
        self.update(&store, stage_id, patch)
    }

    /// 删除工序并级联重算
    pub fn delete_stage(&self, stage_id: &str) -> LifecycleResult<StageMutation> {
        let store = self.repos.stages.clone();
        self.delete(&store, stage_id)
    }

    /// 与前一个工序交换 position；已在首位时返回 false
    pub fn move_stage_up(&self, component_id: &str, stage_id: &str) -> LifecycleResult<bool> {
        self.shift(&StageOwner::Component(component_id.to_string()), stage_id, -1)
    }

    /// 与后一个工序交换 position；已在末位时返回 false
    pub fn move_stage_down(&self, component_id: &str, stage_id: &str) -> LifecycleResult<bool> {
        self.shift(&StageOwner::Component(component_id.to_string()), stage_id, 1)
    }

    /// 按给定顺序重排全部工序，position 重新编号为 0..N-1
    pub fn reorder_stages(
        &self,
        component_id: &str,
        ordered_ids: &[String],
    ) -> LifecycleResult<Vec<Stage>> {
        self.reorder(&StageOwner::Component(component_id.to_string()), ordered_ids)
    }

    /// 按模板初始化/重置工序（“更换材料类型”操作）
    pub fn instantiate_from_template(
        &self,
        component_id: &str,
        template_key: &str,
        strategy: TemplateStrategy,
    ) -> LifecycleResult<TemplateApplication> {
        self.instantiate(
            StageOwner::Component(component_id.to_string()),
            template_key,
            strategy,
        )
    }

    // ==========================================
    // 制品工序（三态，不参与聚合）
    // ==========================================

    pub fn add_item_stage(
        &self,
        item_id: &str,
        definition: &StageDefinition,
    ) -> LifecycleResult<StageMutation> {
        self.add(StageOwner::Item(item_id.to_string()), definition)
    }

    pub fn update_item_stage(
        &self,
        stage_id: &str,
        patch: &StagePatch,
    ) -> LifecycleResult<StageMutation> {
        let store = self.repos.item_stages.clone();
        self.update(&store, stage_id, patch)
    }

    pub fn delete_item_stage(&self, stage_id: &str) -> LifecycleResult<StageMutation> {
        let store = self.repos.item_stages.clone();
        self.delete(&store, stage_id)
    }

    pub fn move_item_stage_up(&self, item_id: &str, stage_id: &str) -> LifecycleResult<bool> {
        self.shift(&StageOwner::Item(item_id.to_string()), stage_id, -1)
    }

    pub fn move_item_stage_down(&self, item_id: &str, stage_id: &str) -> LifecycleResult<bool> {
        self.shift(&StageOwner::Item(item_id.to_string()), stage_id, 1)
    }

    pub fn instantiate_item_stages_from_template(
        &self,
        item_id: &str,
        template_key: &str,
        strategy: TemplateStrategy,
    ) -> LifecycleResult<TemplateApplication> {
        self.instantiate(StageOwner::Item(item_id.to_string()), template_key, strategy)
    }

    /// 将同级工序 position 重新编号为连续的 0..N-1（保持现有顺序）
    pub fn normalize_positions(&self, owner: &StageOwner) -> LifecycleResult<Vec<Stage>> {
        self.ensure_owner(owner)?;
        let store = self.repos.stage_store(owner);
        let stages = store.list(owner.id())?;
        let mut normalized = Vec::with_capacity(stages.len());
        for (index, stage) in stages.into_iter().enumerate() {
            let position = index as i32;
            if stage.position == position {
                normalized.push(stage);
            } else {
                normalized.push(store.update(&stage.stage_id, &StagePatch::position(position))?);
            }
        }
        Ok(normalized)
    }

    // ==========================================
    // 通用实现
    // ==========================================

    #[instrument(skip(self, definition), fields(stage_key = %definition.key))]
    fn add(&self, owner: StageOwner, definition: &StageDefinition) -> LifecycleResult<StageMutation> {
        validate_definition(definition)?;
        self.ensure_owner(&owner)?;

        let store = self.repos.stage_store(&owner);
        let siblings = store.list(owner.id())?;
        let stage = Stage::from_definition(owner.clone(), definition, next_position(&siblings));
        store.create(&stage)?;

        info!(
            "工序已添加: owner={}, stage_id={}, position={}",
            owner, stage.stage_id, stage.position
        );

        let cascade = self.cascade_for(&owner)?;
        Ok(StageMutation { stage, cascade })
    }

    #[instrument(skip(self, store, patch))]
    fn update(
        &self,
        store: &Arc<dyn EntityStore<Stage>>,
        stage_id: &str,
        patch: &StagePatch,
    ) -> LifecycleResult<StageMutation> {
        let current = load_stage(store, stage_id)?;
        validate_patch(&current.owner, patch)?;

        let stage = store.update(stage_id, patch)?;
        if let Some(status) = patch.status {
            info!(
                "工序状态已更新: stage_id={}, {} -> {}",
                stage_id, current.status, status
            );
        }

        let cascade = if patch.status.is_some() {
            self.cascade_for(&stage.owner)?
        } else {
            None
        };
        Ok(StageMutation { stage, cascade })
    }

    #[instrument(skip(self, store))]
    fn delete(
        &self,
        store: &Arc<dyn EntityStore<Stage>>,
        stage_id: &str,
    ) -> LifecycleResult<StageMutation> {
        let stage = load_stage(store, stage_id)?;
        store.delete(stage_id)?;
        info!("工序已删除: owner={}, stage_id={}", stage.owner, stage_id);

        let cascade = self.cascade_for(&stage.owner)?;
        Ok(StageMutation { stage, cascade })
    }

    /// 与相邻工序交换 position（status 不变，无需重算）
    fn shift(&self, owner: &StageOwner, stage_id: &str, direction: i32) -> LifecycleResult<bool> {
        let store = self.repos.stage_store(owner);
        let siblings = store.list(owner.id())?;
        let index = siblings
            .iter()
            .position(|s| s.stage_id == stage_id)
            .ok_or_else(|| LifecycleError::StageNotFound(stage_id.to_string()))?;

        let neighbor_index = index as i64 + direction as i64;
        if neighbor_index < 0 || neighbor_index >= siblings.len() as i64 {
            debug!("工序已在边界，忽略移动: stage_id={}", stage_id);
            return Ok(false);
        }

        let stage = &siblings[index];
        let neighbor = &siblings[neighbor_index as usize];
        let (mut stage_pos, mut neighbor_pos) = (neighbor.position, stage.position);
        if stage_pos == neighbor_pos {
            // 位置重复时按列表顺序分配
            stage_pos = neighbor_index as i32;
            neighbor_pos = index as i32;
        }

        store.update(&stage.stage_id, &StagePatch::position(stage_pos))?;
        store.update(&neighbor.stage_id, &StagePatch::position(neighbor_pos))?;
        Ok(true)
    }

    fn reorder(&self, owner: &StageOwner, ordered_ids: &[String]) -> LifecycleResult<Vec<Stage>> {
        let store = self.repos.stage_store(owner);
        let siblings = store.list(owner.id())?;

        let current: HashSet<&str> = siblings.iter().map(|s| s.stage_id.as_str()).collect();
        let requested: HashSet<&str> = ordered_ids.iter().map(String::as_str).collect();
        if requested.len() != ordered_ids.len() {
            return Err(LifecycleError::InvalidReorder("存在重复的工序ID".to_string()));
        }
        if current != requested {
            return Err(LifecycleError::InvalidReorder(format!(
                "工序ID集合与 {} 的现有工序不一致",
                owner
            )));
        }

        for (index, stage_id) in ordered_ids.iter().enumerate() {
            let position = index as i32;
            let unchanged = siblings
                .iter()
                .any(|s| &s.stage_id == stage_id && s.position == position);
            if !unchanged {
                store.update(stage_id, &StagePatch::position(position))?;
            }
        }

        info!("工序已重排: owner={}, count={}", owner, ordered_ids.len());
        Ok(store.list(owner.id())?)
    }

    #[instrument(skip(self))]
    fn instantiate(
        &self,
        owner: StageOwner,
        template_key: &str,
        strategy: TemplateStrategy,
    ) -> LifecycleResult<TemplateApplication> {
        let template = self
            .catalog
            .get_template_by_key(template_key)
            .ok_or_else(|| LifecycleError::TemplateNotFound(template_key.to_string()))?
            .clone();
        self.ensure_owner(&owner)?;

        let store = self.repos.stage_store(&owner);
        let existing = store.list(owner.id())?;

        let (created, removed) = match strategy {
            TemplateStrategy::Replace => replace_stages(store, &owner, &template, &existing)?,
            TemplateStrategy::Merge => (merge_stages(store, &owner, &template, &existing)?, 0),
        };

        info!(
            "模板已实例化: owner={}, template={}, strategy={:?}, created={}, removed={}",
            owner, template.key, strategy, created, removed
        );

        let cascade = self.cascade_for(&owner)?;
        Ok(TemplateApplication {
            template_key: template.key,
            strategy,
            stages: store.list(owner.id())?,
            created,
            removed,
            cascade,
        })
    }

    fn ensure_owner(&self, owner: &StageOwner) -> LifecycleResult<()> {
        let result = match owner {
            StageOwner::Component(id) => self.repos.components.get(id).map(|_| ()),
            StageOwner::Item(id) => self.repos.items.get(id).map(|_| ()),
        };
        result.map_err(|e| match e {
            RepositoryError::NotFound { .. } => LifecycleError::OwnerNotFound(owner.clone()),
            other => LifecycleError::Store(other),
        })
    }

    fn cascade_for(&self, owner: &StageOwner) -> LifecycleResult<Option<CascadeOutcome>> {
        if !owner.drives_progress() {
            return Ok(None);
        }
        Ok(Some(self.aggregation.recalculate_cascade(owner.id())?))
    }
}

// ==========================================
// 模板策略
// ==========================================

/// 替换: 删除全部现有工序，按模板顺序重建（全部待开始）
fn replace_stages(
    store: &Arc<dyn EntityStore<Stage>>,
    owner: &StageOwner,
    template: &StageTemplate,
    existing: &[Stage],
) -> LifecycleResult<(usize, usize)> {
    for stage in existing {
        store.delete(&stage.stage_id)?;
    }
    for (index, definition) in template.stages.iter().enumerate() {
        store.create(&Stage::from_definition(owner.clone(), definition, index as i32))?;
    }
    Ok((template.stages.len(), existing.len()))
}

/// 合并: 键匹配的工序保留（含状态/备注），缺失的模板工序追加到末尾，
/// 模板中不存在的现有工序一律保留
fn merge_stages(
    store: &Arc<dyn EntityStore<Stage>>,
    owner: &StageOwner,
    template: &StageTemplate,
    existing: &[Stage],
) -> LifecycleResult<usize> {
    let mut known: HashSet<&str> = existing.iter().map(|s| s.stage_key.as_str()).collect();
    let mut position = next_position(existing);
    let mut created = 0;

    for definition in &template.stages {
        if !known.insert(definition.key.as_str()) {
            continue;
        }
        store.create(&Stage::from_definition(owner.clone(), definition, position))?;
        position += 1;
        created += 1;
    }
    Ok(created)
}

// ==========================================
// 校验与辅助
// ==========================================

fn next_position(siblings: &[Stage]) -> i32 {
    siblings.iter().map(|s| s.position).max().map_or(0, |p| p + 1)
}

fn load_stage(store: &Arc<dyn EntityStore<Stage>>, stage_id: &str) -> LifecycleResult<Stage> {
    store.get(stage_id).map_err(|e| match e {
        RepositoryError::NotFound { .. } => LifecycleError::StageNotFound(stage_id.to_string()),
        other => LifecycleError::Store(other),
    })
}

fn validate_hours(field: &str, value: Option<f64>) -> LifecycleResult<()> {
    match value {
        Some(h) if !h.is_finite() || h < 0.0 => Err(LifecycleError::InvalidInput(format!(
            "{} 必须为非负数: {}",
            field, h
        ))),
        _ => Ok(()),
    }
}

fn validate_definition(definition: &StageDefinition) -> LifecycleResult<()> {
    if definition.key.trim().is_empty() {
        return Err(LifecycleError::InvalidInput("工序键不能为空".to_string()));
    }
    if definition.label.trim().is_empty() {
        return Err(LifecycleError::InvalidInput("工序名称不能为空".to_string()));
    }
    validate_hours("default_estimated_hours", definition.default_estimated_hours)
}

fn validate_patch(owner: &StageOwner, patch: &StagePatch) -> LifecycleResult<()> {
    // 顺序只能通过 move/reorder/normalize 修改
    if patch.position.is_some() {
        return Err(LifecycleError::InvalidInput(
            "不能直接修改工序顺序，请使用移动或重排".to_string(),
        ));
    }
    if let Some(status) = patch.status {
        if !owner.allows(status) {
            return Err(LifecycleError::UnsupportedStatus {
                owner: owner.clone(),
                status,
            });
        }
    }
    if let Some(name) = &patch.name {
        if name.trim().is_empty() {
            return Err(LifecycleError::InvalidInput("工序名称不能为空".to_string()));
        }
    }
    validate_hours("estimated_hours", patch.estimated_hours.flatten())?;
    validate_hours("actual_hours", patch.actual_hours.flatten())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::StageStatus;

    #[test]
    fn test_next_position_tolerates_gaps() {
        let owner = StageOwner::Component("C".to_string());
        let def = StageDefinition::new("a", "A", None);
        let stages = vec![
            Stage::from_definition(owner.clone(), &def, 0),
            Stage::from_definition(owner, &def, 4),
        ];
        assert_eq!(next_position(&stages), 5);
        assert_eq!(next_position(&[]), 0);
    }

    #[test]
    fn test_validate_patch_rejects_qa_for_item_stage() {
        let item = StageOwner::Item("I".to_string());
        let err = validate_patch(&item, &StagePatch::status(StageStatus::Qa)).unwrap_err();
        assert!(err.is_validation());

        let component = StageOwner::Component("C".to_string());
        for status in StageStatus::ALL {
            assert!(validate_patch(&component, &StagePatch::status(status)).is_ok());
        }
    }

    #[test]
    fn test_validate_patch_rejects_position() {
        let owner = StageOwner::Component("C".to_string());
        let err = validate_patch(&owner, &StagePatch::position(2)).unwrap_err();
        assert!(matches!(err, LifecycleError::InvalidInput(_)));
    }

    #[test]
    fn test_validate_rejects_negative_hours_and_blank_label() {
        let owner = StageOwner::Component("C".to_string());
        let patch = StagePatch {
            actual_hours: Some(Some(-1.0)),
            ..Default::default()
        };
        assert!(validate_patch(&owner, &patch).is_err());
        assert!(validate_definition(&StageDefinition::new("k", "  ", None)).is_err());
        assert!(validate_definition(&StageDefinition::new("k", "K", Some(f64::NAN))).is_err());
    }
}
