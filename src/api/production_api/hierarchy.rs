use super::*;

use crate::domain::{ComponentPatch, ItemPatch, NewComponent, NewItem, TemplateStrategy, ZonePatch};
use tracing::info;

impl ProductionApi {
    // ==========================================
    // 分区
    // ==========================================

    /// 创建分区（追加到项目末尾）
    pub fn create_zone(&self, project_id: &str, name: &str) -> ApiResult<Mutation<Zone>> {
        require_id("项目ID", project_id)?;
        require_name("分区", name)?;

        let siblings = self.repos.zones.list(project_id)?;
        let position = siblings.iter().map(|z| z.position).max().map_or(0, |p| p + 1);
        let zone = Zone::new(project_id, name, position);
        self.repos.zones.create(&zone)?;

        info!("分区已创建: project_id={}, zone_id={}", project_id, zone.zone_id);
        self.publish(ChangeEvent::inserted(project_id, EntityKind::Zone, &zone.zone_id));
        Ok(Mutation::plain(zone))
    }

    pub fn update_zone(&self, zone_id: &str, patch: &ZonePatch) -> ApiResult<Mutation<Zone>> {
        reject_derived("progress", patch.progress.is_some())?;
        reject_derived("items_count", patch.items_count.is_some())?;
        if let Some(name) = &patch.name {
            require_name("分区", name)?;
        }

        let zone = self.repos.zones.update(zone_id, patch)?;
        self.publish(ChangeEvent::updated(&zone.project_id, EntityKind::Zone, zone_id));
        Ok(Mutation::plain(zone))
    }

    /// 删除分区（制品、部件、工序由外键级联删除）
    pub fn delete_zone(&self, zone_id: &str) -> ApiResult<Mutation<Zone>> {
        let zone = self.repos.zones.get(zone_id)?;
        self.repos.zones.delete(zone_id)?;

        info!("分区已删除: project_id={}, zone_id={}", zone.project_id, zone_id);
        self.publish(ChangeEvent::deleted(&zone.project_id, EntityKind::Zone, zone_id));
        Ok(Mutation::plain(zone))
    }

    // ==========================================
    // 制品
    // ==========================================

    /// 创建制品，随后重算分区进度与制品数量
    pub fn create_item(&self, zone_id: &str, input: NewItem) -> ApiResult<Mutation<Item>> {
        require_id("分区ID", zone_id)?;
        require_name("制品", &input.name)?;
        require_non_negative("quantity", Some(input.quantity))?;

        let project_id = self.project_of_zone(zone_id)?;
        let siblings = self.repos.items.list(zone_id)?;
        let position = siblings.iter().map(|i| i.position).max().map_or(0, |p| p + 1);
        let item = input.into_item(zone_id, position);
        self.repos.items.create(&item)?;
        info!("制品已创建: zone_id={}, item_id={}", zone_id, item.item_id);

        let zone = self.refresh_zone(zone_id);
        self.publish(ChangeEvent::inserted(&project_id, EntityKind::Item, &item.item_id));
        Ok(Mutation {
            record: item,
            cascade: None,
            zone: Some(zone?),
        })
    }

    pub fn update_item(&self, item_id: &str, patch: &ItemPatch) -> ApiResult<Mutation<Item>> {
        reject_derived("progress", patch.progress.is_some())?;
        if let Some(name) = &patch.name {
            require_name("制品", name)?;
        }
        if let Some(code) = &patch.code {
            require_id("制品编号", code)?;
        }
        require_non_negative("quantity", patch.quantity)?;

        let project_id = self.project_of_item(item_id)?;
        let item = self.repos.items.update(item_id, patch)?;
        self.publish(ChangeEvent::updated(&project_id, EntityKind::Item, item_id));
        Ok(Mutation::plain(item))
    }

    /// 删除制品，随后重算分区进度与制品数量
    pub fn delete_item(&self, item_id: &str) -> ApiResult<Mutation<Item>> {
        let item = self.repos.items.get(item_id)?;
        let project_id = self.project_of_zone(&item.zone_id)?;
        self.repos.items.delete(item_id)?;
        info!("制品已删除: zone_id={}, item_id={}", item.zone_id, item_id);

        let zone = self.refresh_zone(&item.zone_id);
        self.publish(ChangeEvent::deleted(&project_id, EntityKind::Item, item_id));
        Ok(Mutation {
            zone: Some(zone?),
            cascade: None,
            record: item,
        })
    }

    fn refresh_zone(&self, zone_id: &str) -> ApiResult<Zone> {
        self.aggregation.recalculate_zone_progress(zone_id)?;
        Ok(self.repos.zones.get(zone_id)?)
    }

    // ==========================================
    // 部件
    // ==========================================

    /// 创建部件；指定模板时按模板初始化工序
    ///
    /// 材料描述为空时使用模板显示名
    pub fn create_component(
        &self,
        item_id: &str,
        mut input: NewComponent,
    ) -> ApiResult<Mutation<Component>> {
        require_id("制品ID", item_id)?;
        require_name("部件", &input.name)?;
        require_non_negative("quantity", Some(input.quantity))?;

        let template_key = input.template_key.take();
        if let Some(key) = &template_key {
            let template = self
                .lifecycle
                .catalog()
                .get_template_by_key(key)
                .ok_or_else(|| ApiError::TemplateNotFound(key.clone()))?;
            if input.material.is_none() {
                input.material = Some(template.label.clone());
            }
        }

        let project_id = self.project_of_item(item_id)?;
        let siblings = self.repos.components.list(item_id)?;
        let position = siblings.iter().map(|c| c.position).max().map_or(0, |p| p + 1);
        let component = input.into_component(item_id, position);
        self.repos.components.create(&component)?;
        info!(
            "部件已创建: item_id={}, component_id={}, template={:?}",
            item_id, component.component_id, template_key
        );

        let cascade = match &template_key {
            Some(key) => self
                .lifecycle
                .instantiate_from_template(&component.component_id, key, TemplateStrategy::Replace)
                .map(|applied| applied.cascade)
                .map_err(ApiError::from),
            None => self
                .aggregation
                .recalculate_item_progress(item_id)
                .map(Some)
                .map_err(ApiError::from),
        };

        self.publish(ChangeEvent::inserted(
            &project_id,
            EntityKind::Component,
            &component.component_id,
        ));
        Ok(Mutation::cascaded(component, cascade?))
    }

    pub fn update_component(
        &self,
        component_id: &str,
        patch: &ComponentPatch,
    ) -> ApiResult<Mutation<Component>> {
        reject_derived("progress", patch.progress.is_some())?;
        if let Some(name) = &patch.name {
            require_name("部件", name)?;
        }
        require_non_negative("quantity", patch.quantity)?;

        let project_id = self.project_of_component(component_id)?;
        let component = self.repos.components.update(component_id, patch)?;
        self.publish(ChangeEvent::updated(&project_id, EntityKind::Component, component_id));
        Ok(Mutation::plain(component))
    }

    /// 删除部件（工序、材料、下料清单级联删除），随后从制品层重算
    pub fn delete_component(&self, component_id: &str) -> ApiResult<Mutation<Component>> {
        let component = self.repos.components.get(component_id)?;
        let project_id = self.project_of_item(&component.item_id)?;
        self.repos.components.delete(component_id)?;
        info!(
            "部件已删除: item_id={}, component_id={}",
            component.item_id, component_id
        );

        let cascade = self.aggregation.recalculate_item_progress(&component.item_id);
        self.publish(ChangeEvent::deleted(&project_id, EntityKind::Component, component_id));
        Ok(Mutation::cascaded(component, Some(cascade?)))
    }
}
