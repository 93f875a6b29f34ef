// ==========================================
// 车间生产跟踪 - 局部更新 SQL 构建
// ==========================================
// 职责: 将补丁中的可选字段拼成 UPDATE ... SET 语句
// 约束: 全部使用参数化，列名只来自仓储内部常量
// ==========================================

use rusqlite::types::ToSql;

/// UPDATE 语句构建器（流式 API）
///
/// # 示例
/// ```
/// use workshop_production::repository::sql_builder::UpdateBuilder;
///
/// let mut builder = UpdateBuilder::new("zones", "zone_id");
/// builder.set_opt("name", Some("Кухня".to_string()));
/// builder.set_opt::<i32>("position", None);
/// assert_eq!(builder.len(), 1);
/// assert_eq!(builder.sql(), "UPDATE zones SET name = ?1 WHERE zone_id = ?2");
/// ```
pub struct UpdateBuilder {
    table: &'static str,
    id_column: &'static str,
    assignments: Vec<String>,
    values: Vec<Box<dyn ToSql>>,
}

impl UpdateBuilder {
    pub fn new(table: &'static str, id_column: &'static str) -> Self {
        Self {
            table,
            id_column,
            assignments: Vec::new(),
            values: Vec::new(),
        }
    }

    /// 无条件设置列值
    pub fn set<T: ToSql + 'static>(&mut self, column: &str, value: T) -> &mut Self {
        self.values.push(Box::new(value));
        self.assignments
            .push(format!("{} = ?{}", column, self.values.len()));
        self
    }

    /// 仅当补丁字段存在时设置
    pub fn set_opt<T: ToSql + 'static>(&mut self, column: &str, value: Option<T>) -> &mut Self {
        if let Some(v) = value {
            self.set(column, v);
        }
        self
    }

    /// 补丁中的赋值个数（不含 updated_at 之类的附加列）
    pub fn len(&self) -> usize {
        self.assignments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    pub fn sql(&self) -> String {
        format!(
            "UPDATE {} SET {} WHERE {} = ?{}",
            self.table,
            self.assignments.join(", "),
            self.id_column,
            self.values.len() + 1
        )
    }

    /// 生成 SQL 与参数（id 作为最后一个参数）
    pub fn build(mut self, id: &str) -> (String, Vec<Box<dyn ToSql>>) {
        let sql = self.sql();
        self.values.push(Box::new(id.to_string()));
        (sql, self.values)
    }
}

/// 执行构建好的更新，返回受影响行数
pub fn execute_update(
    conn: &rusqlite::Connection,
    builder: UpdateBuilder,
    id: &str,
) -> rusqlite::Result<usize> {
    let (sql, values) = builder.build(id);
    let refs: Vec<&dyn ToSql> = values.iter().map(|v| v.as_ref()).collect();
    conn.execute(&sql, refs.as_slice())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_numbers_placeholders_in_order() {
        let mut builder = UpdateBuilder::new("component_stages", "stage_id");
        builder
            .set_opt("status", Some("completed".to_string()))
            .set_opt::<String>("notes", None)
            .set("updated_at", "2026-01-01".to_string());

        assert_eq!(builder.len(), 2);
        assert_eq!(
            builder.sql(),
            "UPDATE component_stages SET status = ?1, updated_at = ?2 WHERE stage_id = ?3"
        );
        let (_, values) = builder.build("S1");
        assert_eq!(values.len(), 3);
    }

    #[test]
    fn test_empty_builder() {
        let builder = UpdateBuilder::new("zones", "zone_id");
        assert!(builder.is_empty());
    }
}
