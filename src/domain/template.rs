// ==========================================
// 车间生产跟踪 - 工序模板领域模型
// ==========================================
// 模板: 按材料分类命名的有序工序定义列表
// 不可变目录数据，不归用户所有
// ==========================================

use serde::{Deserialize, Serialize};

/// 工序定义
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageDefinition {
    pub key: String,
    pub label: String,
    #[serde(default)]
    pub default_estimated_hours: Option<f64>,
}

impl StageDefinition {
    pub fn new(key: &str, label: &str, default_estimated_hours: Option<f64>) -> Self {
        Self {
            key: key.to_string(),
            label: label.to_string(),
            default_estimated_hours,
        }
    }
}

/// 工序模板
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageTemplate {
    pub key: String,
    pub label: String,
    pub stages: Vec<StageDefinition>,
}

impl StageTemplate {
    pub fn stage_keys(&self) -> impl Iterator<Item = &str> {
        self.stages.iter().map(|s| s.key.as_str())
    }
}

/// 模板实例化策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateStrategy {
    /// 删除全部现有工序后按模板重建
    Replace,
    /// 保留键匹配的工序，追加模板中缺失的工序，不删除任何现有工序
    Merge,
}
