// ==========================================
// 车间生产跟踪 - 领域类型定义
// ==========================================
// 职责: 工序状态、显示色标、实体种类、工序归属
// 序列化格式: snake_case (与数据库一致)
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 实体种类 (Entity Kind)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Zone,
    Item,
    Component,
    Stage,
    ItemStage,
    Material,
    Part,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Zone => "zone",
            EntityKind::Item => "item",
            EntityKind::Component => "component",
            EntityKind::Stage => "stage",
            EntityKind::ItemStage => "item_stage",
            EntityKind::Material => "material",
            EntityKind::Part => "part",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 工序状态 (Stage Status)
// ==========================================
// 状态为自由赋值，不做转换表校验（允许人工纠正）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    Pending,    // 待开始
    InProgress, // 进行中
    Qa,         // 质检
    Completed,  // 已完成
}

impl StageStatus {
    pub const ALL: [StageStatus; 4] = [
        StageStatus::Pending,
        StageStatus::InProgress,
        StageStatus::Qa,
        StageStatus::Completed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StageStatus::Pending => "pending",
            StageStatus::InProgress => "in_progress",
            StageStatus::Qa => "qa",
            StageStatus::Completed => "completed",
        }
    }

    /// 从数据库字符串解析，未知值回落为 Pending
    pub fn from_db_str(s: &str) -> Self {
        match s {
            "in_progress" => StageStatus::InProgress,
            "qa" => StageStatus::Qa,
            "completed" => StageStatus::Completed,
            _ => StageStatus::Pending,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, StageStatus::Completed)
    }

    /// 显示色标（纯粹由状态派生）
    pub fn color(&self) -> StageColor {
        match self {
            StageStatus::Pending => StageColor::Neutral,
            StageStatus::InProgress => StageColor::Accent,
            StageStatus::Qa => StageColor::Warning,
            StageStatus::Completed => StageColor::Success,
        }
    }
}

impl fmt::Display for StageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 显示色标 (Stage Color)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageColor {
    Neutral,
    Accent,
    Warning,
    Success,
}

// ==========================================
// 工序归属 (Stage Owner)
// ==========================================
// 部件工序: 四态（含质检），参与进度聚合
// 制品工序: 三态（无质检），仅作轻量跟踪，不参与聚合
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum StageOwner {
    Component(String),
    Item(String),
}

impl StageOwner {
    pub fn id(&self) -> &str {
        match self {
            StageOwner::Component(id) | StageOwner::Item(id) => id,
        }
    }

    pub fn kind(&self) -> EntityKind {
        match self {
            StageOwner::Component(_) => EntityKind::Stage,
            StageOwner::Item(_) => EntityKind::ItemStage,
        }
    }

    /// 是否允许质检状态
    pub fn supports_qa(&self) -> bool {
        matches!(self, StageOwner::Component(_))
    }

    pub fn allows(&self, status: StageStatus) -> bool {
        status != StageStatus::Qa || self.supports_qa()
    }

    /// 状态变化是否需要触发级联重算
    pub fn drives_progress(&self) -> bool {
        matches!(self, StageOwner::Component(_))
    }
}

impl fmt::Display for StageOwner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageOwner::Component(id) => write!(f, "component:{}", id),
            StageOwner::Item(id) => write!(f, "item:{}", id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_color_mapping() {
        assert_eq!(StageStatus::Pending.color(), StageColor::Neutral);
        assert_eq!(StageStatus::InProgress.color(), StageColor::Accent);
        assert_eq!(StageStatus::Qa.color(), StageColor::Warning);
        assert_eq!(StageStatus::Completed.color(), StageColor::Success);
    }

    #[test]
    fn test_status_db_roundtrip_and_fallback() {
        for status in StageStatus::ALL {
            assert_eq!(StageStatus::from_db_str(status.as_str()), status);
        }
        assert_eq!(StageStatus::from_db_str("garbage"), StageStatus::Pending);
    }

    #[test]
    fn test_item_owner_rejects_qa_only() {
        let item = StageOwner::Item("I1".to_string());
        let component = StageOwner::Component("C1".to_string());

        assert!(!item.allows(StageStatus::Qa));
        assert!(item.allows(StageStatus::Completed));
        for status in StageStatus::ALL {
            assert!(component.allows(status));
        }
        assert!(component.drives_progress());
        assert!(!item.drives_progress());
    }

    #[test]
    fn test_status_serde_snake_case() {
        let json = serde_json::to_string(&StageStatus::InProgress).unwrap();
        assert_eq!(json, "\"in_progress\"");
    }
}
