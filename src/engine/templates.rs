// ==========================================
// 车间生产跟踪 - 工序模板目录
// ==========================================
// 职责: 按材料分类提供有序工序定义
// 红线: 目录数据不可变；已初始化的工序不随目录变化自动同步
// ==========================================

use crate::domain::{StageDefinition, StageTemplate};
use std::collections::HashSet;

// (key, label, default_estimated_hours)
type StageRow = (&'static str, &'static str, f64);

const LDSP_STAGES: &[StageRow] = &[
    ("cutting", "Раскрой", 1.5),
    ("edging", "Кромление", 1.0),
    ("drilling", "Присадка", 1.0),
    ("assembly", "Сборка", 2.0),
    ("qa", "Контроль качества", 0.5),
    ("packing", "Упаковка", 0.5),
    ("installation", "Монтаж", 3.0),
];

const MDF_STAGES: &[StageRow] = &[
    ("cutting", "Раскрой", 1.0),
    ("milling", "Фрезеровка", 2.0),
    ("priming", "Грунтование", 1.5),
    ("sanding", "Шлифовка", 1.5),
    ("painting", "Покраска", 3.0),
    ("qa", "Контроль качества", 0.5),
    ("packing", "Упаковка", 0.5),
];

const SOLID_WOOD_STAGES: &[StageRow] = &[
    ("cutting", "Раскрой", 1.5),
    ("planing", "Строгание", 1.5),
    ("joinery", "Столярная обработка", 4.0),
    ("sanding", "Шлифовка", 2.0),
    ("finishing", "Покрытие", 2.5),
    ("assembly", "Сборка", 2.0),
    ("qa", "Контроль качества", 0.5),
];

const METAL_STAGES: &[StageRow] = &[
    ("cutting", "Резка", 1.0),
    ("bending", "Гибка", 1.0),
    ("welding", "Сварка", 2.5),
    ("grinding", "Зачистка", 1.0),
    ("painting", "Порошковая покраска", 2.0),
    ("qa", "Контроль качества", 0.5),
];

const GLASS_STAGES: &[StageRow] = &[
    ("cutting", "Резка", 0.5),
    ("edge_processing", "Обработка кромки", 1.0),
    ("tempering", "Закалка", 2.0),
    ("qa", "Контроль качества", 0.5),
];

// (key, label, stages)
const BUILTIN_TEMPLATES: &[(&str, &str, &[StageRow])] = &[
    ("ldsp", "ЛДСП", LDSP_STAGES),
    ("mdf", "МДФ", MDF_STAGES),
    ("solid_wood", "Массив", SOLID_WOOD_STAGES),
    ("metal", "Металл", METAL_STAGES),
    ("glass", "Стекло", GLASS_STAGES),
];

// ==========================================
// TemplateCatalog - 模板目录
// ==========================================
#[derive(Debug, Clone)]
pub struct TemplateCatalog {
    templates: Vec<StageTemplate>,
}

impl TemplateCatalog {
    /// 内置模板目录
    pub fn builtin() -> Self {
        let templates = BUILTIN_TEMPLATES
            .iter()
            .map(|(key, label, rows)| StageTemplate {
                key: key.to_string(),
                label: label.to_string(),
                stages: rows
                    .iter()
                    .map(|(k, l, h)| StageDefinition::new(k, l, Some(*h)))
                    .collect(),
            })
            .collect();
        Self { templates }
    }

    /// 内置模板 + 自定义模板（键冲突时内置模板优先）
    pub fn with_custom(custom: Vec<StageTemplate>) -> Self {
        let mut catalog = Self::builtin();
        let mut known: HashSet<String> = catalog
            .templates
            .iter()
            .map(|t| t.key.to_lowercase())
            .collect();

        for template in custom {
            if template.stages.is_empty() {
                tracing::warn!("忽略空的自定义模板: key={}", template.key);
                continue;
            }
            if !known.insert(template.key.to_lowercase()) {
                tracing::warn!("自定义模板与已有模板键冲突，已忽略: key={}", template.key);
                continue;
            }
            catalog.templates.push(template);
        }
        catalog
    }

    /// 按键查找模板
    ///
    /// 键匹配不区分大小写；同时接受模板的显示名（如 "ЛДСП"）
    pub fn get_template_by_key(&self, key: &str) -> Option<&StageTemplate> {
        let wanted = key.trim();
        let lowered = wanted.to_lowercase();
        self.templates
            .iter()
            .find(|t| t.key.to_lowercase() == lowered)
            .or_else(|| self.templates.iter().find(|t| t.label == wanted))
    }

    pub fn templates(&self) -> &[StageTemplate] {
        &self.templates
    }
}

impl Default for TemplateCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ldsp_has_seven_ordered_stages() {
        let catalog = TemplateCatalog::builtin();
        let ldsp = catalog.get_template_by_key("ldsp").unwrap();
        let keys: Vec<&str> = ldsp.stage_keys().collect();
        assert_eq!(
            keys,
            vec!["cutting", "edging", "drilling", "assembly", "qa", "packing", "installation"]
        );
    }

    #[test]
    fn test_lookup_by_label_and_case() {
        let catalog = TemplateCatalog::builtin();
        assert_eq!(catalog.get_template_by_key("ЛДСП").unwrap().key, "ldsp");
        assert_eq!(catalog.get_template_by_key("MDF").unwrap().key, "mdf");
        assert!(catalog.get_template_by_key("plywood").is_none());
    }

    #[test]
    fn test_builtin_stage_keys_unique_within_template() {
        for template in TemplateCatalog::builtin().templates() {
            let keys: HashSet<&str> = template.stage_keys().collect();
            assert_eq!(keys.len(), template.stages.len(), "模板 {} 存在重复键", template.key);
        }
    }

    #[test]
    fn test_custom_templates_cannot_shadow_builtin() {
        let custom = vec![
            StageTemplate {
                key: "LDSP".to_string(),
                label: "Подмена".to_string(),
                stages: vec![StageDefinition::new("x", "X", None)],
            },
            StageTemplate {
                key: "plywood".to_string(),
                label: "Фанера".to_string(),
                stages: vec![StageDefinition::new("cutting", "Раскрой", None)],
            },
        ];
        let catalog = TemplateCatalog::with_custom(custom);

        assert_eq!(catalog.get_template_by_key("ldsp").unwrap().stages.len(), 7);
        assert!(catalog.get_template_by_key("plywood").is_some());
    }
}
