// ==========================================
// 车间生产跟踪 - 工序领域模型
// ==========================================
// 工序 (Stage): 部件（或制品）生产序列中的一步
// position 决定执行顺序，同级内唯一
// ==========================================

use crate::domain::template::StageDefinition;
use crate::domain::types::{StageColor, StageOwner, StageStatus};
use chrono::{NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ==========================================
// Stage - 工序
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stage {
    pub stage_id: String,               // 工序ID
    pub owner: StageOwner,              // 归属（部件/制品）
    pub stage_key: String,              // 模板工序键
    pub name: String,                   // 名称（来自模板）
    pub custom_label: Option<String>,   // 自定义显示名
    pub status: StageStatus,            // 状态
    pub position: i32,                  // 执行顺序
    pub assignee_id: Option<String>,    // 负责人
    pub estimated_hours: Option<f64>,   // 预估工时
    pub actual_hours: Option<f64>,      // 实际工时
    pub notes: Option<String>,          // 备注
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Stage {
    /// 按工序定义创建一条待开始的工序
    pub fn from_definition(owner: StageOwner, definition: &StageDefinition, position: i32) -> Self {
        let now = Utc::now().naive_utc();
        Self {
            stage_id: Uuid::new_v4().to_string(),
            owner,
            stage_key: definition.key.clone(),
            name: definition.label.clone(),
            custom_label: None,
            status: StageStatus::Pending,
            position,
            assignee_id: None,
            estimated_hours: definition.default_estimated_hours,
            actual_hours: None,
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn display_label(&self) -> &str {
        self.custom_label.as_deref().unwrap_or(&self.name)
    }

    pub fn color(&self) -> StageColor {
        self.status.color()
    }

    pub fn is_completed(&self) -> bool {
        self.status.is_completed()
    }
}

/// 工序局部更新
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StagePatch {
    pub name: Option<String>,
    pub custom_label: Option<Option<String>>,
    pub status: Option<StageStatus>,
    pub position: Option<i32>,
    pub assignee_id: Option<Option<String>>,
    pub estimated_hours: Option<Option<f64>>,
    pub actual_hours: Option<Option<f64>>,
    pub notes: Option<Option<String>>,
}

impl StagePatch {
    pub fn status(status: StageStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    pub fn position(position: i32) -> Self {
        Self {
            position: Some(position),
            ..Default::default()
        }
    }

    pub fn apply_to(&self, stage: &mut Stage) {
        if let Some(v) = &self.name {
            stage.name = v.clone();
        }
        if let Some(v) = &self.custom_label {
            stage.custom_label = v.clone();
        }
        if let Some(v) = self.status {
            stage.status = v;
        }
        if let Some(v) = self.position {
            stage.position = v;
        }
        if let Some(v) = &self.assignee_id {
            stage.assignee_id = v.clone();
        }
        if let Some(v) = self.estimated_hours {
            stage.estimated_hours = v;
        }
        if let Some(v) = self.actual_hours {
            stage.actual_hours = v;
        }
        if let Some(v) = &self.notes {
            stage.notes = v.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_definition_is_pending() {
        let def = StageDefinition::new("cutting", "Раскрой", Some(2.0));
        let stage = Stage::from_definition(StageOwner::Component("C1".to_string()), &def, 3);

        assert_eq!(stage.status, StageStatus::Pending);
        assert_eq!(stage.position, 3);
        assert_eq!(stage.stage_key, "cutting");
        assert_eq!(stage.estimated_hours, Some(2.0));
        assert_eq!(stage.color(), StageColor::Neutral);
    }

    #[test]
    fn test_custom_label_overrides_name() {
        let def = StageDefinition::new("edging", "Кромление", None);
        let mut stage = Stage::from_definition(StageOwner::Item("I1".to_string()), &def, 0);
        assert_eq!(stage.display_label(), "Кромление");

        StagePatch {
            custom_label: Some(Some("Кромка ПВХ 2мм".to_string())),
            ..Default::default()
        }
        .apply_to(&mut stage);
        assert_eq!(stage.display_label(), "Кромка ПВХ 2мм");
    }
}
