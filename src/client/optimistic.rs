// ==========================================
// 车间生产跟踪 - 乐观变更层
// ==========================================
// 流程:
// 1. 在本地镜像上应用乐观变更（工序状态变更附带粗略进度估算）
// 2. 调用权威 API
// 3. 成功: 确认返回记录，以级联结果覆盖本地聚合值
// 4. 失败: 丢弃受影响子树的乐观状态，从存储重新加载，返回原错误
// ==========================================

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::api::{ApiError, ApiResult, MoveDirection, Mutation, ProductionApi};
use crate::client::mirror::HierarchyMirror;
use crate::domain::{
    Component, ComponentMaterial, ComponentPart, ComponentPatch, Item, ItemPatch, MaterialPatch,
    NewComponent, NewComponentMaterial, NewComponentPart, NewItem, PartPatch, Stage,
    StageDefinition, StageOwner, StagePatch, StageStatus, TemplateStrategy, Zone, ZonePatch,
};
use crate::engine::stage_lifecycle::{StageMutation, TemplateApplication};
use crate::sync::RefetchTarget;

/// 失败后需要重新加载的范围
#[derive(Debug, Clone, PartialEq, Eq)]
enum Scope {
    /// 单个制品详情（部件、工序、材料、下料清单）
    Item(String),
    /// 项目分区与制品
    Project,
}

// ==========================================
// OptimisticMutationLayer - 查看者侧乐观变更层
// ==========================================
#[derive(Clone)]
pub struct OptimisticMutationLayer {
    api: Arc<ProductionApi>,
    mirror: Arc<Mutex<HierarchyMirror>>,
    project_id: String,
}

impl OptimisticMutationLayer {
    pub fn new(api: Arc<ProductionApi>, project_id: &str) -> Self {
        Self {
            api,
            mirror: Arc::new(Mutex::new(HierarchyMirror::new())),
            project_id: project_id.to_string(),
        }
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    /// 只读访问本地镜像
    pub fn with_mirror<R>(&self, f: impl FnOnce(&HierarchyMirror) -> R) -> ApiResult<R> {
        Ok(f(&*lock_mirror(&self.mirror)?))
    }

    // ==========================================
    // 加载与重新拉取
    // ==========================================

    /// 重新拉取项目分区/制品及当前打开的制品
    pub fn refetch(&self) -> ApiResult<()> {
        refresh(&self.api, &self.mirror, &self.project_id)
    }

    /// 打开制品详情
    pub fn open_item(&self, item_id: &str) -> ApiResult<()> {
        lock_mirror(&self.mirror)?.set_open_item(Some(item_id.to_string()));
        reload_item(&self.api, &self.mirror, item_id)
    }

    pub fn close_item(&self) -> ApiResult<()> {
        lock_mirror(&self.mirror)?.set_open_item(None);
        Ok(())
    }

    /// 重新拉取当前打开的制品（未打开时不做任何事）
    pub fn refetch_open_item(&self) -> ApiResult<()> {
        let open = lock_mirror(&self.mirror)?.open_item().map(str::to_string);
        match open {
            Some(item_id) => reload_item(&self.api, &self.mirror, &item_id),
            None => Ok(()),
        }
    }

    // ==========================================
    // 分区 / 制品（项目范围）
    // ==========================================

    pub fn create_zone(&self, name: &str) -> ApiResult<Mutation<Zone>> {
        let project_id = self.project_id.clone();
        let placeholder = {
            let mirror = lock_mirror(&self.mirror)?;
            let position = next_position(mirror.zones_of(&project_id).iter().map(|z| z.position));
            Zone::new(&project_id, name, position)
        };
        let placeholder_id = placeholder.zone_id.clone();

        self.mutate(
            Scope::Project,
            |m| m.zones.stage_upsert(placeholder),
            |api| api.create_zone(&project_id, name),
            |m, result| {
                m.zones.rollback(&placeholder_id);
                m.zones.confirm(result.record.clone());
            },
        )
    }

    pub fn update_zone(&self, zone_id: &str, patch: &ZonePatch) -> ApiResult<Mutation<Zone>> {
        self.mutate(
            Scope::Project,
            |m| {
                m.zones.stage_update(zone_id, |z| patch.apply_to(z));
            },
            |api| api.update_zone(zone_id, patch),
            |m, result| m.zones.confirm(result.record.clone()),
        )
    }

    pub fn delete_zone(&self, zone_id: &str) -> ApiResult<Mutation<Zone>> {
        self.mutate(
            Scope::Project,
            |m| m.zones.stage_delete(zone_id),
            |api| api.delete_zone(zone_id),
            |m, _| {
                let item_ids: Vec<String> =
                    m.items_of(zone_id).iter().map(|i| i.item_id.clone()).collect();
                for item_id in item_ids {
                    m.forget_item(&item_id);
                }
                m.zones.confirm_delete(zone_id);
            },
        )
    }

    pub fn create_item(&self, zone_id: &str, input: NewItem) -> ApiResult<Mutation<Item>> {
        let placeholder = {
            let mirror = lock_mirror(&self.mirror)?;
            let position = next_position(mirror.items_of(zone_id).iter().map(|i| i.position));
            input.clone().into_item(zone_id, position)
        };
        let placeholder_id = placeholder.item_id.clone();

        self.mutate(
            Scope::Project,
            |m| {
                m.items.stage_upsert(placeholder);
                m.zones.stage_update(zone_id, |z| z.items_count += 1);
                m.guess_progress_from_item(&placeholder_id, zone_id);
            },
            |api| api.create_item(zone_id, input),
            |m, result| {
                m.items.rollback(&placeholder_id);
                m.items.confirm(result.record.clone());
                confirm_zone(m, result);
            },
        )
    }

    pub fn update_item(&self, item_id: &str, patch: &ItemPatch) -> ApiResult<Mutation<Item>> {
        self.mutate(
            Scope::Project,
            |m| {
                m.items.stage_update(item_id, |i| patch.apply_to(i));
            },
            |api| api.update_item(item_id, patch),
            |m, result| m.items.confirm(result.record.clone()),
        )
    }

    pub fn delete_item(&self, item_id: &str) -> ApiResult<Mutation<Item>> {
        self.mutate(
            Scope::Project,
            |m| {
                if let Some(zone_id) = m.items.parent_of(item_id) {
                    m.items.stage_delete(item_id);
                    m.zones.stage_update(&zone_id, |z| z.items_count -= 1);
                }
            },
            |api| api.delete_item(item_id),
            |m, result| {
                m.forget_item(item_id);
                confirm_zone(m, result);
            },
        )
    }

    // ==========================================
    // 部件（制品范围）
    // ==========================================

    pub fn create_component(
        &self,
        item_id: &str,
        input: NewComponent,
    ) -> ApiResult<Mutation<Component>> {
        let seeded = input.template_key.is_some();
        let placeholder = {
            let mirror = lock_mirror(&self.mirror)?;
            let position =
                next_position(mirror.components_of(item_id).iter().map(|c| c.position));
            input.clone().into_component(item_id, position)
        };
        let placeholder_id = placeholder.component_id.clone();

        let result = self.mutate(
            Scope::Item(item_id.to_string()),
            |m| {
                m.components.stage_upsert(placeholder);
                if let Some(zone_id) = m.items.parent_of(item_id) {
                    m.guess_progress_from_item(item_id, &zone_id);
                }
            },
            |api| api.create_component(item_id, input),
            |m, result| {
                m.components.rollback(&placeholder_id);
                m.components.confirm(result.record.clone());
                if let Some(outcome) = &result.cascade {
                    m.apply_cascade(outcome);
                }
            },
        )?;

        // 模板生成的工序只能从存储取得
        if seeded {
            if let Err(e) = reload_item(&self.api, &self.mirror, item_id) {
                warn!("模板工序加载失败: item_id={}, error={}", item_id, e);
            }
        }
        Ok(result)
    }

    pub fn update_component(
        &self,
        component_id: &str,
        patch: &ComponentPatch,
    ) -> ApiResult<Mutation<Component>> {
        let scope = self.scope_of_component(component_id)?;
        self.mutate(
            scope,
            |m| {
                m.components.stage_update(component_id, |c| patch.apply_to(c));
            },
            |api| api.update_component(component_id, patch),
            |m, result| m.components.confirm(result.record.clone()),
        )
    }

    pub fn delete_component(&self, component_id: &str) -> ApiResult<Mutation<Component>> {
        let scope = self.scope_of_component(component_id)?;
        self.mutate(
            scope,
            |m| {
                let lineage = m.lineage_of_component(component_id);
                m.components.stage_delete(component_id);
                if let Some((item_id, zone_id)) = lineage {
                    m.guess_progress_from_item(&item_id, &zone_id);
                }
            },
            |api| api.delete_component(component_id),
            |m, result| {
                m.components.confirm_delete(component_id);
                if let Some(outcome) = &result.cascade {
                    m.apply_cascade(outcome);
                }
            },
        )
    }

    // ==========================================
    // 部件工序
    // ==========================================

    pub fn add_stage(
        &self,
        component_id: &str,
        definition: &StageDefinition,
    ) -> ApiResult<StageMutation> {
        let scope = self.scope_of_component(component_id)?;
        let placeholder = {
            let mirror = lock_mirror(&self.mirror)?;
            let position =
                next_position(mirror.stages_of(component_id).iter().map(|s| s.position));
            Stage::from_definition(
                StageOwner::Component(component_id.to_string()),
                definition,
                position,
            )
        };
        let placeholder_id = placeholder.stage_id.clone();

        self.mutate(
            scope,
            |m| {
                m.stages.stage_upsert(placeholder);
                m.guess_progress_from_component(component_id);
            },
            |api| api.add_stage(component_id, definition),
            |m, result| {
                m.stages.rollback(&placeholder_id);
                confirm_stage(m, result);
            },
        )
    }

    pub fn update_stage(&self, stage_id: &str, patch: &StagePatch) -> ApiResult<StageMutation> {
        let component_id = self.owner_of_stage(stage_id)?;
        let scope = self.scope_of_component(&component_id)?;
        self.mutate(
            scope,
            |m| {
                m.stages.stage_update(stage_id, |s| patch.apply_to(s));
                if patch.status.is_some() {
                    m.guess_progress_from_component(&component_id);
                }
            },
            |api| api.update_stage(stage_id, patch),
            confirm_stage,
        )
    }

    /// 切换工序状态（最常见的操作）
    pub fn set_stage_status(&self, stage_id: &str, status: StageStatus) -> ApiResult<StageMutation> {
        self.update_stage(stage_id, &StagePatch::status(status))
    }

    pub fn delete_stage(&self, stage_id: &str) -> ApiResult<StageMutation> {
        let component_id = self.owner_of_stage(stage_id)?;
        let scope = self.scope_of_component(&component_id)?;
        self.mutate(
            scope,
            |m| {
                m.stages.stage_delete(stage_id);
                m.guess_progress_from_component(&component_id);
            },
            |api| api.delete_stage(stage_id),
            |m, result| {
                m.stages.confirm_delete(stage_id);
                if let Some(outcome) = &result.cascade {
                    m.apply_cascade(outcome);
                }
            },
        )
    }

    pub fn move_stage(
        &self,
        component_id: &str,
        stage_id: &str,
        direction: MoveDirection,
    ) -> ApiResult<bool> {
        let scope = self.scope_of_component(component_id)?;
        let swapped = swap_with_neighbor(
            &mut *lock_mirror(&self.mirror)?,
            component_id,
            stage_id,
            direction,
        );
        self.mutate(
            scope,
            |_| {},
            |api| api.move_stage(component_id, stage_id, direction),
            |m, moved| {
                for id in &swapped {
                    match m.stages.get(id).cloned() {
                        Some(stage) if *moved => m.stages.confirm(stage),
                        _ => m.stages.rollback(id),
                    }
                }
            },
        )
    }

    pub fn reorder_stages(
        &self,
        component_id: &str,
        ordered_ids: &[String],
    ) -> ApiResult<Vec<Stage>> {
        let scope = self.scope_of_component(component_id)?;
        self.mutate(
            scope,
            |m| {
                for (index, id) in ordered_ids.iter().enumerate() {
                    m.stages.stage_update(id, |s| s.position = index as i32);
                }
            },
            |api| api.reorder_stages(component_id, ordered_ids),
            |m, stages| {
                for stage in stages {
                    m.stages.confirm(stage.clone());
                }
            },
        )
    }

    /// 更换材料类型（无乐观预测，结果到达后整体替换工序）
    pub fn reseed_component_stages(
        &self,
        component_id: &str,
        template_key: &str,
        strategy: TemplateStrategy,
    ) -> ApiResult<TemplateApplication> {
        let scope = self.scope_of_component(component_id)?;
        let applied = self.mutate(
            scope.clone(),
            |_| {},
            |api| api.reseed_component_stages(component_id, template_key, strategy),
            |m, applied| {
                let owner: HashSet<String> = [component_id.to_string()].into();
                m.stages.replace_children(&owner, applied.stages.clone());
                if let Some(outcome) = &applied.cascade {
                    m.apply_cascade(outcome);
                }
            },
        )?;

        // 材料描述随模板更新
        if let Scope::Item(item_id) = scope {
            if let Err(e) = reload_item(&self.api, &self.mirror, &item_id) {
                warn!("部件重新加载失败: item_id={}, error={}", item_id, e);
            }
        }
        Ok(applied)
    }

    // ==========================================
    // 制品工序（不影响进度）
    // ==========================================

    pub fn add_item_stage(
        &self,
        item_id: &str,
        definition: &StageDefinition,
    ) -> ApiResult<StageMutation> {
        let placeholder = {
            let mirror = lock_mirror(&self.mirror)?;
            let position =
                next_position(mirror.item_stages_of(item_id).iter().map(|s| s.position));
            Stage::from_definition(StageOwner::Item(item_id.to_string()), definition, position)
        };
        let placeholder_id = placeholder.stage_id.clone();

        self.mutate(
            Scope::Item(item_id.to_string()),
            |m| m.item_stages.stage_upsert(placeholder),
            |api| api.add_item_stage(item_id, definition),
            |m, result| {
                m.item_stages.rollback(&placeholder_id);
                m.item_stages.confirm(result.stage.clone());
            },
        )
    }

    pub fn update_item_stage(
        &self,
        stage_id: &str,
        patch: &StagePatch,
    ) -> ApiResult<StageMutation> {
        let item_id = self.owner_of_item_stage(stage_id)?;
        self.mutate(
            Scope::Item(item_id),
            |m| {
                m.item_stages.stage_update(stage_id, |s| patch.apply_to(s));
            },
            |api| api.update_item_stage(stage_id, patch),
            |m, result| m.item_stages.confirm(result.stage.clone()),
        )
    }

    pub fn delete_item_stage(&self, stage_id: &str) -> ApiResult<StageMutation> {
        let item_id = self.owner_of_item_stage(stage_id)?;
        self.mutate(
            Scope::Item(item_id),
            |m| m.item_stages.stage_delete(stage_id),
            |api| api.delete_item_stage(stage_id),
            |m, _| m.item_stages.confirm_delete(stage_id),
        )
    }

    // ==========================================
    // 材料 / 下料清单
    // ==========================================

    pub fn create_material(
        &self,
        component_id: &str,
        input: NewComponentMaterial,
    ) -> ApiResult<Mutation<ComponentMaterial>> {
        let scope = self.scope_of_component(component_id)?;
        let placeholder = input.clone().into_material(component_id);
        let placeholder_id = placeholder.material_id.clone();
        self.mutate(
            scope,
            |m| m.materials.stage_upsert(placeholder),
            |api| api.create_material(component_id, input),
            |m, result| {
                m.materials.rollback(&placeholder_id);
                m.materials.confirm(result.record.clone());
            },
        )
    }

    pub fn update_material(
        &self,
        material_id: &str,
        patch: &MaterialPatch,
    ) -> ApiResult<Mutation<ComponentMaterial>> {
        let scope = self.scope_of_child(self.with_mirror(|m| m.materials.parent_of(material_id))?)?;
        self.mutate(
            scope,
            |m| {
                m.materials.stage_update(material_id, |x| patch.apply_to(x));
            },
            |api| api.update_material(material_id, patch),
            |m, result| m.materials.confirm(result.record.clone()),
        )
    }

    pub fn delete_material(&self, material_id: &str) -> ApiResult<Mutation<ComponentMaterial>> {
        let scope = self.scope_of_child(self.with_mirror(|m| m.materials.parent_of(material_id))?)?;
        self.mutate(
            scope,
            |m| m.materials.stage_delete(material_id),
            |api| api.delete_material(material_id),
            |m, _| m.materials.confirm_delete(material_id),
        )
    }

    pub fn create_part(
        &self,
        component_id: &str,
        input: NewComponentPart,
    ) -> ApiResult<Mutation<ComponentPart>> {
        let scope = self.scope_of_component(component_id)?;
        let placeholder = input.clone().into_part(component_id);
        let placeholder_id = placeholder.part_id.clone();
        self.mutate(
            scope,
            |m| m.parts.stage_upsert(placeholder),
            |api| api.create_part(component_id, input),
            |m, result| {
                m.parts.rollback(&placeholder_id);
                m.parts.confirm(result.record.clone());
            },
        )
    }

    pub fn update_part(&self, part_id: &str, patch: &PartPatch) -> ApiResult<Mutation<ComponentPart>> {
        let scope = self.scope_of_child(self.with_mirror(|m| m.parts.parent_of(part_id))?)?;
        self.mutate(
            scope,
            |m| {
                m.parts.stage_update(part_id, |x| patch.apply_to(x));
            },
            |api| api.update_part(part_id, patch),
            |m, result| m.parts.confirm(result.record.clone()),
        )
    }

    pub fn delete_part(&self, part_id: &str) -> ApiResult<Mutation<ComponentPart>> {
        let scope = self.scope_of_child(self.with_mirror(|m| m.parts.parent_of(part_id))?)?;
        self.mutate(
            scope,
            |m| m.parts.stage_delete(part_id),
            |api| api.delete_part(part_id),
            |m, _| m.parts.confirm_delete(part_id),
        )
    }

    // ==========================================
    // 通用流程
    // ==========================================

    fn mutate<R>(
        &self,
        scope: Scope,
        optimistic: impl FnOnce(&mut HierarchyMirror),
        call: impl FnOnce(&ProductionApi) -> ApiResult<R>,
        confirm: impl FnOnce(&mut HierarchyMirror, &R),
    ) -> ApiResult<R> {
        optimistic(&mut *lock_mirror(&self.mirror)?);

        match call(&self.api) {
            Ok(result) => {
                confirm(&mut *lock_mirror(&self.mirror)?, &result);
                Ok(result)
            }
            Err(err) => {
                self.recover(&scope, &err);
                Err(err)
            }
        }
    }

    /// 丢弃乐观状态并从存储重新加载；重新加载失败只记录告警
    fn recover(&self, scope: &Scope, err: &ApiError) {
        warn!("变更失败，回滚本地乐观状态: scope={:?}, error={}", scope, err);

        let reloaded = match scope {
            Scope::Item(item_id) => {
                if let Ok(mut mirror) = lock_mirror(&self.mirror) {
                    mirror.rollback_item_subtree(item_id);
                }
                let item = reload_item(&self.api, &self.mirror, item_id);
                // 级联中途失败时上层聚合可能已变化
                if matches!(err, ApiError::Cascade(_)) {
                    item.and_then(|_| reload_project(&self.api, &self.mirror, &self.project_id))
                } else {
                    item
                }
            }
            Scope::Project => {
                if let Ok(mut mirror) = lock_mirror(&self.mirror) {
                    mirror.rollback_project(&self.project_id);
                }
                reload_project(&self.api, &self.mirror, &self.project_id)
            }
        };

        if let Err(e) = reloaded {
            warn!("回滚后重新加载失败: scope={:?}, error={}", scope, e);
        }
    }

    fn scope_of_component(&self, component_id: &str) -> ApiResult<Scope> {
        self.scope_of_child(Some(component_id.to_string()))
    }

    /// 部件子记录的重新加载范围（镜像中找不到时退回项目范围）
    fn scope_of_child(&self, component_id: Option<String>) -> ApiResult<Scope> {
        let item_id = component_id.and_then(|id| {
            lock_mirror(&self.mirror)
                .ok()
                .and_then(|m| m.components.parent_of(&id))
        });
        Ok(item_id.map_or(Scope::Project, Scope::Item))
    }

    fn owner_of_stage(&self, stage_id: &str) -> ApiResult<String> {
        self.with_mirror(|m| m.stages.parent_of(stage_id))?
            .ok_or_else(|| ApiError::NotFound(format!("stage(id={})未加载", stage_id)))
    }

    fn owner_of_item_stage(&self, stage_id: &str) -> ApiResult<String> {
        self.with_mirror(|m| m.item_stages.parent_of(stage_id))?
            .ok_or_else(|| ApiError::NotFound(format!("item_stage(id={})未加载", stage_id)))
    }
}

// ==========================================
// 变更订阅目标
// ==========================================
#[async_trait]
impl RefetchTarget for OptimisticMutationLayer {
    /// 在阻塞线程池中重新拉取（存储调用为同步）
    async fn refetch_project(&self, project_id: &str) -> ApiResult<()> {
        let api = self.api.clone();
        let mirror = self.mirror.clone();
        let project_id = project_id.to_string();
        tokio::task::spawn_blocking(move || refresh(&api, &mirror, &project_id))
            .await
            .map_err(|e| ApiError::InternalError(format!("重新拉取任务失败: {}", e)))?
    }
}

// ==========================================
// 辅助函数
// ==========================================

fn lock_mirror(mirror: &Mutex<HierarchyMirror>) -> ApiResult<MutexGuard<'_, HierarchyMirror>> {
    mirror
        .lock()
        .map_err(|e| ApiError::InternalError(format!("镜像锁获取失败: {}", e)))
}

fn next_position(positions: impl Iterator<Item = i32>) -> i32 {
    positions.max().map_or(0, |p| p + 1)
}

fn refresh(api: &ProductionApi, mirror: &Mutex<HierarchyMirror>, project_id: &str) -> ApiResult<()> {
    reload_project(api, mirror, project_id)?;
    let open = lock_mirror(mirror)?.open_item().map(str::to_string);
    if let Some(item_id) = open {
        reload_item(api, mirror, &item_id)?;
    }
    Ok(())
}

fn reload_project(
    api: &ProductionApi,
    mirror: &Mutex<HierarchyMirror>,
    project_id: &str,
) -> ApiResult<()> {
    let snapshot = api.get_project_snapshot(project_id)?;
    debug!(
        "项目已重新拉取: project_id={}, zones={}, items={}",
        project_id,
        snapshot.zones.len(),
        snapshot.items.len()
    );
    lock_mirror(mirror)?.replace_project(snapshot);
    Ok(())
}

fn reload_item(api: &ProductionApi, mirror: &Mutex<HierarchyMirror>, item_id: &str) -> ApiResult<()> {
    match api.get_item_detail(item_id) {
        Ok(detail) => {
            lock_mirror(mirror)?.replace_item_detail(detail);
            Ok(())
        }
        Err(ApiError::NotFound(_)) => {
            debug!("制品已不存在，移出镜像: item_id={}", item_id);
            lock_mirror(mirror)?.forget_item(item_id);
            Ok(())
        }
        Err(e) => Err(e),
    }
}

fn confirm_zone<T>(mirror: &mut HierarchyMirror, result: &Mutation<T>) {
    if let Some(zone) = &result.zone {
        mirror.zones.confirm(zone.clone());
    }
}

fn confirm_stage(mirror: &mut HierarchyMirror, result: &StageMutation) {
    mirror.stages.confirm(result.stage.clone());
    if let Some(outcome) = &result.cascade {
        mirror.apply_cascade(outcome);
    }
}

/// 本地交换相邻工序位置，返回被修改的工序ID
fn swap_with_neighbor(
    mirror: &mut HierarchyMirror,
    component_id: &str,
    stage_id: &str,
    direction: MoveDirection,
) -> Vec<String> {
    let siblings: Vec<(String, i32)> = mirror
        .stages_of(component_id)
        .iter()
        .map(|s| (s.stage_id.clone(), s.position))
        .collect();
    let Some(index) = siblings.iter().position(|(id, _)| id == stage_id) else {
        return Vec::new();
    };
    let neighbor = match direction {
        MoveDirection::Up if index > 0 => index - 1,
        MoveDirection::Down if index + 1 < siblings.len() => index + 1,
        _ => return Vec::new(),
    };

    let (stage_id, stage_pos) = siblings[index].clone();
    let (neighbor_id, neighbor_pos) = siblings[neighbor].clone();
    mirror.stages.stage_update(&stage_id, |s| s.position = neighbor_pos);
    mirror.stages.stage_update(&neighbor_id, |s| s.position = stage_pos);
    vec![stage_id, neighbor_id]
}
