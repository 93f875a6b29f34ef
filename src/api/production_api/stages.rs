use super::*;

use crate::domain::{ComponentPatch, StageDefinition, StagePatch, TemplateStrategy};
use crate::engine::stage_lifecycle::{StageMutation, TemplateApplication};

/// 工序移动方向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoveDirection {
    Up,
    Down,
}

impl ProductionApi {
    // ==========================================
    // 部件工序
    // ==========================================

    pub fn add_stage(
        &self,
        component_id: &str,
        definition: &StageDefinition,
    ) -> ApiResult<StageMutation> {
        let project_id = self.project_of_component(component_id)?;
        let result = self.lifecycle.add_stage(component_id, definition);
        self.publish_stage(
            &result,
            &project_id,
            EntityKind::Stage,
            component_id,
            ChangeEvent::inserted,
        );
        Ok(result?)
    }

    /// 修改工序（名称、负责人、工时、备注、状态）
    pub fn update_stage(&self, stage_id: &str, patch: &StagePatch) -> ApiResult<StageMutation> {
        let stage = self.repos.stages.get(stage_id)?;
        let project_id = self.project_of_owner(&stage.owner)?;
        let result = self.lifecycle.update_stage(stage_id, patch);
        self.publish_stage(
            &result,
            &project_id,
            EntityKind::Stage,
            stage_id,
            ChangeEvent::updated,
        );
        Ok(result?)
    }

    pub fn delete_stage(&self, stage_id: &str) -> ApiResult<StageMutation> {
        let stage = self.repos.stages.get(stage_id)?;
        let project_id = self.project_of_owner(&stage.owner)?;
        let result = self.lifecycle.delete_stage(stage_id);
        self.publish_lifecycle(
            &result,
            &project_id,
            EntityKind::Stage,
            stage_id,
            ChangeEvent::deleted,
        );
        Ok(result?)
    }

    /// 与相邻工序交换位置；已在边界时返回 false
    pub fn move_stage(
        &self,
        component_id: &str,
        stage_id: &str,
        direction: MoveDirection,
    ) -> ApiResult<bool> {
        let project_id = self.project_of_component(component_id)?;
        let moved = match direction {
            MoveDirection::Up => self.lifecycle.move_stage_up(component_id, stage_id)?,
            MoveDirection::Down => self.lifecycle.move_stage_down(component_id, stage_id)?,
        };
        if moved {
            self.publish(ChangeEvent::updated(&project_id, EntityKind::Stage, stage_id));
        }
        Ok(moved)
    }

    /// 按给定顺序重排部件工序
    pub fn reorder_stages(
        &self,
        component_id: &str,
        ordered_ids: &[String],
    ) -> ApiResult<Vec<Stage>> {
        let project_id = self.project_of_component(component_id)?;
        let stages = self.lifecycle.reorder_stages(component_id, ordered_ids)?;
        self.publish(ChangeEvent::updated(&project_id, EntityKind::Component, component_id));
        Ok(stages)
    }

    /// 将工序 position 重新编号为连续序列
    pub fn normalize_stage_positions(&self, owner: &StageOwner) -> ApiResult<Vec<Stage>> {
        let project_id = self.project_of_owner(owner)?;
        let stages = self.lifecycle.normalize_positions(owner)?;
        self.publish(ChangeEvent::updated(&project_id, owner.kind(), owner.id()));
        Ok(stages)
    }

    /// 更换材料类型：按模板重置（替换）或补齐（合并）部件工序
    ///
    /// 同时把部件的材料描述更新为模板显示名
    pub fn reseed_component_stages(
        &self,
        component_id: &str,
        template_key: &str,
        strategy: TemplateStrategy,
    ) -> ApiResult<TemplateApplication> {
        let project_id = self.project_of_component(component_id)?;
        let result =
            self.lifecycle
                .instantiate_from_template(component_id, template_key, strategy);

        // 工序已写入（包括聚合部分失败）时先同步材料描述，再发布事件
        let relabel = match &result {
            Ok(_) | Err(LifecycleError::Cascade(_)) => {
                self.relabel_component_material(component_id, template_key)
            }
            Err(_) => Ok(()),
        };
        self.publish_lifecycle(
            &result,
            &project_id,
            EntityKind::Component,
            component_id,
            ChangeEvent::updated,
        );
        let applied = result?;
        relabel?;
        Ok(applied)
    }

    fn relabel_component_material(&self, component_id: &str, template_key: &str) -> ApiResult<()> {
        if let Some(template) = self.lifecycle.catalog().get_template_by_key(template_key) {
            let patch = ComponentPatch {
                material: Some(Some(template.label.clone())),
                ..Default::default()
            };
            self.repos.components.update(component_id, &patch)?;
        }
        Ok(())
    }

    // ==========================================
    // 制品工序
    // ==========================================

    pub fn add_item_stage(
        &self,
        item_id: &str,
        definition: &StageDefinition,
    ) -> ApiResult<StageMutation> {
        let project_id = self.project_of_item(item_id)?;
        let result = self.lifecycle.add_item_stage(item_id, definition);
        self.publish_stage(
            &result,
            &project_id,
            EntityKind::ItemStage,
            item_id,
            ChangeEvent::inserted,
        );
        Ok(result?)
    }

    pub fn update_item_stage(
        &self,
        stage_id: &str,
        patch: &StagePatch,
    ) -> ApiResult<StageMutation> {
        let stage = self.repos.item_stages.get(stage_id)?;
        let project_id = self.project_of_owner(&stage.owner)?;
        let result = self.lifecycle.update_item_stage(stage_id, patch);
        self.publish_stage(
            &result,
            &project_id,
            EntityKind::ItemStage,
            stage_id,
            ChangeEvent::updated,
        );
        Ok(result?)
    }

    pub fn delete_item_stage(&self, stage_id: &str) -> ApiResult<StageMutation> {
        let stage = self.repos.item_stages.get(stage_id)?;
        let project_id = self.project_of_owner(&stage.owner)?;
        let result = self.lifecycle.delete_item_stage(stage_id);
        self.publish_lifecycle(
            &result,
            &project_id,
            EntityKind::ItemStage,
            stage_id,
            ChangeEvent::deleted,
        );
        Ok(result?)
    }

    pub fn move_item_stage(
        &self,
        item_id: &str,
        stage_id: &str,
        direction: MoveDirection,
    ) -> ApiResult<bool> {
        let project_id = self.project_of_item(item_id)?;
        let moved = match direction {
            MoveDirection::Up => self.lifecycle.move_item_stage_up(item_id, stage_id)?,
            MoveDirection::Down => self.lifecycle.move_item_stage_down(item_id, stage_id)?,
        };
        if moved {
            self.publish(ChangeEvent::updated(&project_id, EntityKind::ItemStage, stage_id));
        }
        Ok(moved)
    }

    pub fn reseed_item_stages(
        &self,
        item_id: &str,
        template_key: &str,
        strategy: TemplateStrategy,
    ) -> ApiResult<TemplateApplication> {
        let project_id = self.project_of_item(item_id)?;
        let result = self
            .lifecycle
            .instantiate_item_stages_from_template(item_id, template_key, strategy);
        self.publish_lifecycle(
            &result,
            &project_id,
            EntityKind::Item,
            item_id,
            ChangeEvent::updated,
        );
        Ok(result?)
    }

    /// 新增时记录ID来自结果；写入后级联失败则以归属ID通知
    fn publish_stage(
        &self,
        result: &LifecycleResult<StageMutation>,
        project_id: &str,
        kind: EntityKind,
        fallback_id: &str,
        event: fn(&str, EntityKind, &str) -> ChangeEvent,
    ) {
        let record_id = match result {
            Ok(m) => m.stage.stage_id.as_str(),
            Err(_) => fallback_id,
        };
        self.publish_lifecycle(result, project_id, kind, record_id, event);
    }
}
