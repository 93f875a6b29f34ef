use super::*;

use crate::domain::{MaterialPatch, NewComponentMaterial, NewComponentPart, PartPatch};

impl ProductionApi {
    // ==========================================
    // 部件材料（描述性数据，不参与进度）
    // ==========================================

    pub fn create_material(
        &self,
        component_id: &str,
        input: NewComponentMaterial,
    ) -> ApiResult<Mutation<ComponentMaterial>> {
        require_name("材料", &input.name)?;
        require_non_negative("thickness_mm", input.thickness_mm)?;
        require_non_negative("quantity", input.quantity)?;

        let project_id = self.project_of_component(component_id)?;
        let material = input.into_material(component_id);
        self.repos.materials.create(&material)?;
        self.publish(ChangeEvent::inserted(
            &project_id,
            EntityKind::Material,
            &material.material_id,
        ));
        Ok(Mutation::plain(material))
    }

    pub fn update_material(
        &self,
        material_id: &str,
        patch: &MaterialPatch,
    ) -> ApiResult<Mutation<ComponentMaterial>> {
        if let Some(name) = &patch.name {
            require_name("材料", name)?;
        }
        require_non_negative("thickness_mm", patch.thickness_mm.flatten())?;
        require_non_negative("quantity", patch.quantity.flatten())?;

        let current = self.repos.materials.get(material_id)?;
        let project_id = self.project_of_component(&current.component_id)?;
        let material = self.repos.materials.update(material_id, patch)?;
        self.publish(ChangeEvent::updated(&project_id, EntityKind::Material, material_id));
        Ok(Mutation::plain(material))
    }

    pub fn delete_material(&self, material_id: &str) -> ApiResult<Mutation<ComponentMaterial>> {
        let material = self.repos.materials.get(material_id)?;
        let project_id = self.project_of_component(&material.component_id)?;
        self.repos.materials.delete(material_id)?;
        self.publish(ChangeEvent::deleted(&project_id, EntityKind::Material, material_id));
        Ok(Mutation::plain(material))
    }

    // ==========================================
    // 下料清单
    // ==========================================

    pub fn create_part(
        &self,
        component_id: &str,
        input: NewComponentPart,
    ) -> ApiResult<Mutation<ComponentPart>> {
        require_name("零件", &input.name)?;
        validate_part_dimensions(input.length_mm, input.width_mm, Some(input.quantity))?;

        let project_id = self.project_of_component(component_id)?;
        let part = input.into_part(component_id);
        self.repos.parts.create(&part)?;
        self.publish(ChangeEvent::inserted(&project_id, EntityKind::Part, &part.part_id));
        Ok(Mutation::plain(part))
    }

    pub fn update_part(&self, part_id: &str, patch: &PartPatch) -> ApiResult<Mutation<ComponentPart>> {
        if let Some(name) = &patch.name {
            require_name("零件", name)?;
        }
        validate_part_dimensions(patch.length_mm.flatten(), patch.width_mm.flatten(), patch.quantity)?;

        let current = self.repos.parts.get(part_id)?;
        let project_id = self.project_of_component(&current.component_id)?;
        let part = self.repos.parts.update(part_id, patch)?;
        self.publish(ChangeEvent::updated(&project_id, EntityKind::Part, part_id));
        Ok(Mutation::plain(part))
    }

    pub fn delete_part(&self, part_id: &str) -> ApiResult<Mutation<ComponentPart>> {
        let part = self.repos.parts.get(part_id)?;
        let project_id = self.project_of_component(&part.component_id)?;
        self.repos.parts.delete(part_id)?;
        self.publish(ChangeEvent::deleted(&project_id, EntityKind::Part, part_id));
        Ok(Mutation::plain(part))
    }
}

fn validate_part_dimensions(
    length_mm: Option<f64>,
    width_mm: Option<f64>,
    quantity: Option<i32>,
) -> ApiResult<()> {
    require_non_negative("length_mm", length_mm)?;
    require_non_negative("width_mm", width_mm)?;
    match quantity {
        Some(q) if q < 1 => Err(ApiError::InvalidInput(format!("零件数量必须大于0: {}", q))),
        _ => Ok(()),
    }
}
