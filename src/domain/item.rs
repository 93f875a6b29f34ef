// ==========================================
// 车间生产跟踪 - 制品领域模型
// ==========================================
// 制品 (Item): 分区内的可制造单元，由部件组成
// current_stage 仅为展示标签，与工序聚合无关
// ==========================================

use chrono::{NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ==========================================
// Item - 制品
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub item_id: String,                 // 制品ID
    pub zone_id: String,                 // 所属分区
    pub code: String,                    // 编号
    pub name: String,                    // 名称
    pub quantity: f64,                   // 数量
    pub unit: String,                    // 单位
    pub current_stage: Option<String>,   // 当前阶段标签（展示用）
    pub progress: i32,                   // 缓存进度 (0-100)
    pub position: i32,                   // 同级排序

    // ===== 可选元数据 =====
    pub materials: Option<String>,       // 材料说明
    pub technical_notes: Option<String>, // 技术备注
    pub manager_comment: Option<String>, // 主管意见
    pub due_date: Option<NaiveDate>,     // 交付日期

    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// 新建制品输入
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewItem {
    pub code: String,
    pub name: String,
    pub quantity: f64,
    pub unit: String,
    pub current_stage: Option<String>,
    pub materials: Option<String>,
    pub technical_notes: Option<String>,
    pub manager_comment: Option<String>,
    pub due_date: Option<NaiveDate>,
}

impl NewItem {
    pub fn named(code: &str, name: &str) -> Self {
        Self {
            code: code.to_string(),
            name: name.to_string(),
            quantity: 1.0,
            unit: "шт".to_string(),
            current_stage: None,
            materials: None,
            technical_notes: None,
            manager_comment: None,
            due_date: None,
        }
    }

    pub fn into_item(self, zone_id: &str, position: i32) -> Item {
        let now = Utc::now().naive_utc();
        Item {
            item_id: Uuid::new_v4().to_string(),
            zone_id: zone_id.to_string(),
            code: self.code.trim().to_string(),
            name: self.name.trim().to_string(),
            quantity: self.quantity,
            unit: self.unit,
            current_stage: self.current_stage,
            progress: 0,
            position,
            materials: self.materials,
            technical_notes: self.technical_notes,
            manager_comment: self.manager_comment,
            due_date: self.due_date,
            created_at: now,
            updated_at: now,
        }
    }
}

/// 制品局部更新
///
/// 可空字段使用 `Option<Option<T>>`：外层 None 表示不修改，Some(None) 表示清空
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemPatch {
    pub code: Option<String>,
    pub name: Option<String>,
    pub quantity: Option<f64>,
    pub unit: Option<String>,
    pub current_stage: Option<Option<String>>,
    pub progress: Option<i32>,
    pub position: Option<i32>,
    pub materials: Option<Option<String>>,
    pub technical_notes: Option<Option<String>>,
    pub manager_comment: Option<Option<String>>,
    pub due_date: Option<Option<NaiveDate>>,
}

impl ItemPatch {
    pub fn progress(value: i32) -> Self {
        Self {
            progress: Some(value),
            ..Default::default()
        }
    }

    pub fn apply_to(&self, item: &mut Item) {
        if let Some(v) = &self.code {
            item.code = v.clone();
        }
        if let Some(v) = &self.name {
            item.name = v.clone();
        }
        if let Some(v) = self.quantity {
            item.quantity = v;
        }
        if let Some(v) = &self.unit {
            item.unit = v.clone();
        }
        if let Some(v) = &self.current_stage {
            item.current_stage = v.clone();
        }
        if let Some(v) = self.progress {
            item.progress = v;
        }
        if let Some(v) = self.position {
            item.position = v;
        }
        if let Some(v) = &self.materials {
            item.materials = v.clone();
        }
        if let Some(v) = &self.technical_notes {
            item.technical_notes = v.clone();
        }
        if let Some(v) = &self.manager_comment {
            item.manager_comment = v.clone();
        }
        if let Some(v) = self.due_date {
            item.due_date = v;
        }
    }
}
