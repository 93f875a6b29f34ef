// ==========================================
// 车间生产跟踪 - 部件领域模型
// ==========================================
// 部件 (Component): 制品的子装配件
// 拥有: 有序工序列表 / 无序材料列表 / 无序下料清单
// 材料与下料清单仅为描述信息，不参与进度聚合
// ==========================================

use chrono::{NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ==========================================
// Component - 部件
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Component {
    pub component_id: String,      // 部件ID
    pub item_id: String,           // 所属制品
    pub name: String,              // 名称
    pub material: Option<String>,  // 材料描述（自由文本）
    pub quantity: f64,             // 数量
    pub unit: String,              // 单位
    pub progress: i32,             // 缓存进度 (0-100)
    pub position: i32,             // 同级排序
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// 新建部件输入
///
/// `template_key` 非空时按模板初始化工序
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewComponent {
    pub name: String,
    pub material: Option<String>,
    pub quantity: f64,
    pub unit: String,
    pub template_key: Option<String>,
}

impl NewComponent {
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            material: None,
            quantity: 1.0,
            unit: "шт".to_string(),
            template_key: None,
        }
    }

    pub fn with_template(mut self, template_key: &str) -> Self {
        self.template_key = Some(template_key.to_string());
        self
    }

    pub fn into_component(self, item_id: &str, position: i32) -> Component {
        let now = Utc::now().naive_utc();
        Component {
            component_id: Uuid::new_v4().to_string(),
            item_id: item_id.to_string(),
            name: self.name.trim().to_string(),
            material: self.material,
            quantity: self.quantity,
            unit: self.unit,
            progress: 0,
            position,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComponentPatch {
    pub name: Option<String>,
    pub material: Option<Option<String>>,
    pub quantity: Option<f64>,
    pub unit: Option<String>,
    pub progress: Option<i32>,
    pub position: Option<i32>,
}

impl ComponentPatch {
    pub fn progress(value: i32) -> Self {
        Self {
            progress: Some(value),
            ..Default::default()
        }
    }

    pub fn apply_to(&self, component: &mut Component) {
        if let Some(v) = &self.name {
            component.name = v.clone();
        }
        if let Some(v) = &self.material {
            component.material = v.clone();
        }
        if let Some(v) = self.quantity {
            component.quantity = v;
        }
        if let Some(v) = &self.unit {
            component.unit = v.clone();
        }
        if let Some(v) = self.progress {
            component.progress = v;
        }
        if let Some(v) = self.position {
            component.position = v;
        }
    }
}

// ==========================================
// ComponentMaterial - 部件材料（描述信息）
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentMaterial {
    pub material_id: String,
    pub component_id: String,
    pub name: String,
    pub material_type: Option<String>, // 类型（ЛДСП/МДФ/...）
    pub thickness_mm: Option<f64>,     // 厚度
    pub brand: Option<String>,         // 品牌
    pub color: Option<String>,         // 颜色/花色
    pub quantity: Option<f64>,
    pub unit: Option<String>,
    pub notes: Option<String>,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewComponentMaterial {
    pub name: String,
    pub material_type: Option<String>,
    pub thickness_mm: Option<f64>,
    pub brand: Option<String>,
    pub color: Option<String>,
    pub quantity: Option<f64>,
    pub unit: Option<String>,
    pub notes: Option<String>,
}

impl NewComponentMaterial {
    pub fn into_material(self, component_id: &str) -> ComponentMaterial {
        ComponentMaterial {
            material_id: Uuid::new_v4().to_string(),
            component_id: component_id.to_string(),
            name: self.name.trim().to_string(),
            material_type: self.material_type,
            thickness_mm: self.thickness_mm,
            brand: self.brand,
            color: self.color,
            quantity: self.quantity,
            unit: self.unit,
            notes: self.notes,
            created_at: Utc::now().naive_utc(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MaterialPatch {
    pub name: Option<String>,
    pub material_type: Option<Option<String>>,
    pub thickness_mm: Option<Option<f64>>,
    pub brand: Option<Option<String>>,
    pub color: Option<Option<String>>,
    pub quantity: Option<Option<f64>>,
    pub unit: Option<Option<String>>,
    pub notes: Option<Option<String>>,
}

impl MaterialPatch {
    pub fn apply_to(&self, material: &mut ComponentMaterial) {
        if let Some(v) = &self.name {
            material.name = v.clone();
        }
        if let Some(v) = &self.material_type {
            material.material_type = v.clone();
        }
        if let Some(v) = self.thickness_mm {
            material.thickness_mm = v;
        }
        if let Some(v) = &self.brand {
            material.brand = v.clone();
        }
        if let Some(v) = &self.color {
            material.color = v.clone();
        }
        if let Some(v) = self.quantity {
            material.quantity = v;
        }
        if let Some(v) = &self.unit {
            material.unit = v.clone();
        }
        if let Some(v) = &self.notes {
            material.notes = v.clone();
        }
    }
}

// ==========================================
// ComponentPart - 下料清单条目（描述信息）
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentPart {
    pub part_id: String,
    pub component_id: String,
    pub name: String,
    pub length_mm: Option<f64>,
    pub width_mm: Option<f64>,
    pub quantity: i32,
    pub edging: Option<String>, // 封边说明
    pub notes: Option<String>,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewComponentPart {
    pub name: String,
    pub length_mm: Option<f64>,
    pub width_mm: Option<f64>,
    pub quantity: i32,
    pub edging: Option<String>,
    pub notes: Option<String>,
}

impl NewComponentPart {
    pub fn into_part(self, component_id: &str) -> ComponentPart {
        ComponentPart {
            part_id: Uuid::new_v4().to_string(),
            component_id: component_id.to_string(),
            name: self.name.trim().to_string(),
            length_mm: self.length_mm,
            width_mm: self.width_mm,
            quantity: self.quantity,
            edging: self.edging,
            notes: self.notes,
            created_at: Utc::now().naive_utc(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PartPatch {
    pub name: Option<String>,
    pub length_mm: Option<Option<f64>>,
    pub width_mm: Option<Option<f64>>,
    pub quantity: Option<i32>,
    pub edging: Option<Option<String>>,
    pub notes: Option<Option<String>>,
}

impl PartPatch {
    pub fn apply_to(&self, part: &mut ComponentPart) {
        if let Some(v) = &self.name {
            part.name = v.clone();
        }
        if let Some(v) = self.length_mm {
            part.length_mm = v;
        }
        if let Some(v) = self.width_mm {
            part.width_mm = v;
        }
        if let Some(v) = self.quantity {
            part.quantity = v;
        }
        if let Some(v) = &self.edging {
            part.edging = v.clone();
        }
        if let Some(v) = &self.notes {
            part.notes = v.clone();
        }
    }
}
