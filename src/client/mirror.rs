// ==========================================
// 车间生产跟踪 - 查看者本地镜像
// ==========================================
// 职责: 缓存 分区 → 制品 → 部件 → 工序（及制品工序、材料、下料清单）
// 模型: 每个实体为双态值（confirmed / optimistic），由 reducer 合并
// 规则:
// - 视图优先显示 optimistic；confirmed 到达即覆盖并清除 optimistic
// - 回滚只清除 optimistic，从未确认过的实体随之消失
// - 无撤销日志
// ==========================================

use std::collections::{HashMap, HashSet};

use chrono::NaiveDateTime;

use crate::api::{ItemDetail, ProjectSnapshot};
use crate::domain::{Component, ComponentMaterial, ComponentPart, Item, Stage, Zone};
use crate::engine::aggregation::CascadeOutcome;
use crate::engine::progress::{component_progress, mean_progress};
use crate::repository::Record;

// ==========================================
// 双态实体
// ==========================================

/// 本地尚未确认的变更
#[derive(Debug, Clone, PartialEq)]
pub enum Pending<T> {
    Upsert(T),
    Delete,
}

/// reducer 动作
#[derive(Debug, Clone, PartialEq)]
pub enum MirrorAction<T> {
    Optimistic(Pending<T>),
    Confirm(T),
    ConfirmDelete,
    Rollback,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Tracked<T> {
    confirmed: Option<T>,
    optimistic: Option<Pending<T>>,
}

impl<T> Default for Tracked<T> {
    fn default() -> Self {
        Self {
            confirmed: None,
            optimistic: None,
        }
    }
}

impl<T> Tracked<T> {
    pub fn confirmed(value: T) -> Self {
        Self {
            confirmed: Some(value),
            optimistic: None,
        }
    }

    /// 当前可见值
    pub fn view(&self) -> Option<&T> {
        match &self.optimistic {
            Some(Pending::Upsert(v)) => Some(v),
            Some(Pending::Delete) => None,
            None => self.confirmed.as_ref(),
        }
    }

    pub fn confirmed_value(&self) -> Option<&T> {
        self.confirmed.as_ref()
    }

    pub fn is_pending(&self) -> bool {
        self.optimistic.is_some()
    }

    /// 合并动作；返回 false 表示该实体应从镜像中移除
    pub fn reduce(&mut self, action: MirrorAction<T>) -> bool {
        match action {
            MirrorAction::Optimistic(pending) => self.optimistic = Some(pending),
            MirrorAction::Confirm(value) => {
                self.confirmed = Some(value);
                self.optimistic = None;
            }
            MirrorAction::ConfirmDelete => {
                self.confirmed = None;
                self.optimistic = None;
            }
            MirrorAction::Rollback => self.optimistic = None,
        }
        self.confirmed.is_some() || self.optimistic.is_some()
    }
}

// ==========================================
// 镜像记录
// ==========================================

/// 可缓存在镜像中的记录（同级排序键）
pub trait MirrorRecord: Record {
    fn sort_key(&self) -> (i32, NaiveDateTime);
}

macro_rules! positioned {
    ($($ty:ty),*) => {
        $(impl MirrorRecord for $ty {
            fn sort_key(&self) -> (i32, NaiveDateTime) {
                (self.position, self.created_at)
            }
        })*
    };
}

positioned!(Zone, Item, Component, Stage);

impl MirrorRecord for ComponentMaterial {
    fn sort_key(&self) -> (i32, NaiveDateTime) {
        (0, self.created_at)
    }
}

impl MirrorRecord for ComponentPart {
    fn sort_key(&self) -> (i32, NaiveDateTime) {
        (0, self.created_at)
    }
}

// ==========================================
// Table - 单种实体的双态表
// ==========================================
#[derive(Debug, Clone)]
pub struct Table<T> {
    rows: HashMap<String, Tracked<T>>,
}

impl<T> Default for Table<T> {
    fn default() -> Self {
        Self {
            rows: HashMap::new(),
        }
    }
}

impl<T: MirrorRecord> Table<T> {
    fn dispatch(&mut self, id: &str, action: MirrorAction<T>) {
        let keep = self.rows.entry(id.to_string()).or_default().reduce(action);
        if !keep {
            self.rows.remove(id);
        }
    }

    pub fn get(&self, id: &str) -> Option<&T> {
        self.rows.get(id).and_then(Tracked::view)
    }

    pub fn is_pending(&self, id: &str) -> bool {
        self.rows.get(id).is_some_and(Tracked::is_pending)
    }

    /// 按父级ID列出可见记录（已排序）
    pub fn children(&self, parent_id: &str) -> Vec<&T> {
        let mut rows: Vec<&T> = self
            .rows
            .values()
            .filter_map(Tracked::view)
            .filter(|r| r.parent_id() == parent_id)
            .collect();
        rows.sort_by_key(|r| r.sort_key());
        rows
    }

    pub fn len(&self) -> usize {
        self.rows.values().filter(|t| t.view().is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn pending_count(&self) -> usize {
        self.rows.values().filter(|t| t.is_pending()).count()
    }

    // ===== 乐观变更 =====

    pub fn stage_upsert(&mut self, record: T) {
        let id = record.record_id().to_string();
        self.dispatch(&id, MirrorAction::Optimistic(Pending::Upsert(record)));
    }

    pub fn stage_delete(&mut self, id: &str) {
        if self.rows.contains_key(id) {
            self.dispatch(id, MirrorAction::Optimistic(Pending::Delete));
        }
    }

    /// 基于当前可见值做乐观修改；记录不存在时返回 false
    pub fn stage_update(&mut self, id: &str, f: impl FnOnce(&mut T)) -> bool {
        let Some(mut record) = self.get(id).cloned() else {
            return false;
        };
        f(&mut record);
        self.stage_upsert(record);
        true
    }

    // ===== 确认 =====

    pub fn confirm(&mut self, record: T) {
        let id = record.record_id().to_string();
        self.dispatch(&id, MirrorAction::Confirm(record));
    }

    pub fn confirm_delete(&mut self, id: &str) {
        if self.rows.contains_key(id) {
            self.dispatch(id, MirrorAction::ConfirmDelete);
        }
    }

    /// 以权威值修改已确认记录（并清除乐观值）
    pub fn confirm_update(&mut self, id: &str, f: impl FnOnce(&mut T)) {
        let base = self
            .rows
            .get(id)
            .and_then(|t| t.confirmed_value().or_else(|| t.view()))
            .cloned();
        if let Some(mut record) = base {
            f(&mut record);
            self.confirm(record);
        }
    }

    // ===== 回滚与整体替换 =====

    pub fn rollback(&mut self, id: &str) {
        if self.rows.contains_key(id) {
            self.dispatch(id, MirrorAction::Rollback);
        }
    }

    /// 回滚父级属于集合内的全部乐观状态
    pub fn rollback_children(&mut self, parent_ids: &HashSet<String>) {
        let ids: Vec<String> = self
            .rows
            .iter()
            .filter(|(_, t)| t.is_pending() && touches(*t, parent_ids))
            .map(|(id, _)| id.clone())
            .collect();
        for id in ids {
            self.rollback(&id);
        }
    }

    /// 以拉取结果替换父级属于集合内的全部记录（含乐观状态）
    pub fn replace_children(&mut self, parent_ids: &HashSet<String>, records: Vec<T>) {
        self.rows.retain(|_, t| !touches(&*t, parent_ids));
        for record in records {
            self.confirm(record);
        }
    }

    pub fn parent_of(&self, id: &str) -> Option<String> {
        self.rows.get(id).and_then(|t| {
            t.view()
                .or_else(|| t.confirmed_value())
                .map(|r| r.parent_id().to_string())
        })
    }
}

fn touches<T: Record>(tracked: &Tracked<T>, parent_ids: &HashSet<String>) -> bool {
    let in_set = |r: &T| parent_ids.contains(r.parent_id());
    tracked.confirmed_value().is_some_and(in_set)
        || matches!(&tracked.optimistic, Some(Pending::Upsert(r)) if in_set(r))
}

// ==========================================
// HierarchyMirror - 层级镜像
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct HierarchyMirror {
    pub zones: Table<Zone>,
    pub items: Table<Item>,
    pub components: Table<Component>,
    pub stages: Table<Stage>,
    pub item_stages: Table<Stage>,
    pub materials: Table<ComponentMaterial>,
    pub parts: Table<ComponentPart>,
    open_item: Option<String>,
}

impl HierarchyMirror {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open_item(&self) -> Option<&str> {
        self.open_item.as_deref()
    }

    pub fn set_open_item(&mut self, item_id: Option<String>) {
        self.open_item = item_id;
    }

    /// 是否存在未确认的乐观状态
    pub fn has_pending(&self) -> bool {
        self.pending_count() > 0
    }

    pub fn pending_count(&self) -> usize {
        self.zones.pending_count()
            + self.items.pending_count()
            + self.components.pending_count()
            + self.stages.pending_count()
            + self.item_stages.pending_count()
            + self.materials.pending_count()
            + self.parts.pending_count()
    }

    // ==========================================
    // 视图
    // ==========================================

    pub fn zones_of(&self, project_id: &str) -> Vec<&Zone> {
        self.zones.children(project_id)
    }

    pub fn items_of(&self, zone_id: &str) -> Vec<&Item> {
        self.items.children(zone_id)
    }

    pub fn components_of(&self, item_id: &str) -> Vec<&Component> {
        self.components.children(item_id)
    }

    pub fn stages_of(&self, component_id: &str) -> Vec<&Stage> {
        self.stages.children(component_id)
    }

    pub fn item_stages_of(&self, item_id: &str) -> Vec<&Stage> {
        self.item_stages.children(item_id)
    }

    /// 组件所属的制品ID与分区ID
    pub fn lineage_of_component(&self, component_id: &str) -> Option<(String, String)> {
        let item_id = self.components.parent_of(component_id)?;
        let zone_id = self.items.parent_of(&item_id)?;
        Some((item_id, zone_id))
    }

    // ==========================================
    // 整体替换（拉取结果）
    // ==========================================

    /// 替换项目的分区与制品（丢弃其乐观状态）
    pub fn replace_project(&mut self, snapshot: ProjectSnapshot) {
        let project: HashSet<String> = [snapshot.project_id.clone()].into();
        let mut zone_ids: HashSet<String> = self
            .zones
            .rows
            .values()
            .filter(|t| touches(*t, &project))
            .filter_map(|t| t.view().or_else(|| t.confirmed_value()))
            .map(|z| z.zone_id.clone())
            .collect();
        zone_ids.extend(snapshot.zones.iter().map(|z| z.zone_id.clone()));

        self.zones.replace_children(&project, snapshot.zones);
        self.items.replace_children(&zone_ids, snapshot.items);
    }

    /// 替换制品详情（制品本身、部件、工序、材料、下料清单、制品工序）
    pub fn replace_item_detail(&mut self, detail: ItemDetail) {
        let item_id = detail.item.item_id.clone();
        let item_set: HashSet<String> = [item_id.clone()].into();

        let mut component_ids: HashSet<String> = self
            .components
            .rows
            .values()
            .filter(|t| touches(*t, &item_set))
            .filter_map(|t| t.view().or_else(|| t.confirmed_value()))
            .map(|c| c.component_id.clone())
            .collect();
        component_ids.extend(detail.components.iter().map(|c| c.component.component_id.clone()));

        let mut components = Vec::new();
        let mut stages = Vec::new();
        let mut materials = Vec::new();
        let mut parts = Vec::new();
        for c in detail.components {
            components.push(c.component);
            stages.extend(c.stages);
            materials.extend(c.materials);
            parts.extend(c.parts);
        }

        self.items.confirm(detail.item);
        self.components.replace_children(&item_set, components);
        self.stages.replace_children(&component_ids, stages);
        self.materials.replace_children(&component_ids, materials);
        self.parts.replace_children(&component_ids, parts);
        self.item_stages.replace_children(&item_set, detail.item_stages);
    }

    /// 移除制品及其子树（制品已不存在时）
    pub fn forget_item(&mut self, item_id: &str) {
        let item_set: HashSet<String> = [item_id.to_string()].into();
        let component_ids: HashSet<String> = self
            .components
            .children(item_id)
            .into_iter()
            .map(|c| c.component_id.clone())
            .collect();
        self.items.confirm_delete(item_id);
        self.components.replace_children(&item_set, Vec::new());
        self.stages.replace_children(&component_ids, Vec::new());
        self.materials.replace_children(&component_ids, Vec::new());
        self.parts.replace_children(&component_ids, Vec::new());
        self.item_stages.replace_children(&item_set, Vec::new());
        if self.open_item.as_deref() == Some(item_id) {
            self.open_item = None;
        }
    }

    // ==========================================
    // 回滚
    // ==========================================

    /// 丢弃制品子树的乐观状态（含所属分区与制品的进度猜测）
    pub fn rollback_item_subtree(&mut self, item_id: &str) {
        let item_set: HashSet<String> = [item_id.to_string()].into();
        let component_ids: HashSet<String> = self
            .components
            .rows
            .values()
            .filter(|t| touches(*t, &item_set))
            .filter_map(|t| t.view().or_else(|| t.confirmed_value()))
            .map(|c| c.component_id.clone())
            .collect();

        if let Some(zone_id) = self.items.parent_of(item_id) {
            self.zones.rollback(&zone_id);
        }
        self.items.rollback(item_id);
        self.components.rollback_children(&item_set);
        self.stages.rollback_children(&component_ids);
        self.materials.rollback_children(&component_ids);
        self.parts.rollback_children(&component_ids);
        self.item_stages.rollback_children(&item_set);
    }

    /// 丢弃项目分区与制品层的乐观状态
    pub fn rollback_project(&mut self, project_id: &str) {
        let project: HashSet<String> = [project_id.to_string()].into();
        let zone_ids: HashSet<String> = self
            .zones
            .rows
            .values()
            .filter(|t| touches(*t, &project))
            .filter_map(|t| t.view().or_else(|| t.confirmed_value()))
            .map(|z| z.zone_id.clone())
            .collect();
        self.zones.rollback_children(&project);
        self.items.rollback_children(&zone_ids);
    }

    // ==========================================
    // 进度
    // ==========================================

    /// 本地粗略估算: 部件 → 制品 → 分区（仅写入乐观值）
    pub fn guess_progress_from_component(&mut self, component_id: &str) {
        let Some((item_id, zone_id)) = self.lineage_of_component(component_id) else {
            return;
        };

        let stages: Vec<Stage> = self.stages_of(component_id).into_iter().cloned().collect();
        let component_guess = component_progress(&stages);
        self.components
            .stage_update(component_id, |c| c.progress = component_guess);

        self.guess_progress_from_item(&item_id, &zone_id);
    }

    /// 本地粗略估算: 制品 → 分区
    pub fn guess_progress_from_item(&mut self, item_id: &str, zone_id: &str) {
        let item_guess = mean_progress(self.components_of(item_id).iter().map(|c| c.progress));
        self.items.stage_update(item_id, |i| i.progress = item_guess);

        let zone_guess = mean_progress(self.items_of(zone_id).iter().map(|i| i.progress));
        self.zones.stage_update(zone_id, |z| z.progress = zone_guess);
    }

    /// 以权威级联结果覆盖本地进度
    pub fn apply_cascade(&mut self, outcome: &CascadeOutcome) {
        if let Some(component) = &outcome.component {
            self.components
                .confirm_update(&component.id, |c| c.progress = component.progress);
        }
        self.items
            .confirm_update(&outcome.item.id, |i| i.progress = outcome.item.progress);
        self.zones
            .confirm_update(&outcome.zone.id, |z| z.progress = outcome.zone.progress);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zone(project: &str, name: &str, position: i32) -> Zone {
        Zone::new(project, name, position)
    }

    #[test]
    fn test_reducer_prefers_confirmed_once_it_arrives() {
        let original = zone("P1", "Кухня", 0);
        let mut tracked = Tracked::confirmed(original.clone());

        let mut renamed = original.clone();
        renamed.name = "Гостиная".to_string();
        assert!(tracked.reduce(MirrorAction::Optimistic(Pending::Upsert(renamed))));
        assert_eq!(tracked.view().unwrap().name, "Гостиная");
        assert!(tracked.is_pending());

        let mut authoritative = original.clone();
        authoritative.name = "Гостиная (server)".to_string();
        assert!(tracked.reduce(MirrorAction::Confirm(authoritative)));
        assert_eq!(tracked.view().unwrap().name, "Гостиная (server)");
        assert!(!tracked.is_pending());
    }

    #[test]
    fn test_rollback_of_unconfirmed_insert_removes_entry() {
        let mut table: Table<Zone> = Table::default();
        let z = zone("P1", "Кухня", 0);
        let id = z.zone_id.clone();
        table.stage_upsert(z);
        assert_eq!(table.children("P1").len(), 1);

        table.rollback(&id);
        assert!(table.get(&id).is_none());
        assert_eq!(table.pending_count(), 0);
    }

    #[test]
    fn test_optimistic_delete_hides_then_rollback_restores() {
        let mut table: Table<Zone> = Table::default();
        let z = zone("P1", "Кухня", 0);
        let id = z.zone_id.clone();
        table.confirm(z);

        table.stage_delete(&id);
        assert!(table.get(&id).is_none());
        table.rollback(&id);
        assert!(table.get(&id).is_some());
    }

    #[test]
    fn test_children_sorted_by_position() {
        let mut table: Table<Zone> = Table::default();
        table.confirm(zone("P1", "B", 2));
        table.confirm(zone("P1", "A", 1));
        table.confirm(zone("P2", "C", 0));
        let names: Vec<&str> = table.children("P1").iter().map(|z| z.name.as_str()).collect();
        assert_eq!(names, vec!["A", "B"]);
    }

    #[test]
    fn test_replace_project_drops_stale_and_pending_entries() {
        let mut mirror = HierarchyMirror::new();
        let kept = zone("P1", "Кухня", 0);
        let stale = zone("P1", "Старая", 1);
        mirror.zones.confirm(kept.clone());
        mirror.zones.confirm(stale.clone());
        mirror.zones.stage_update(&kept.zone_id, |z| z.name = "local".to_string());

        mirror.replace_project(ProjectSnapshot {
            project_id: "P1".to_string(),
            zones: vec![kept.clone()],
            items: Vec::new(),
        });

        assert!(!mirror.has_pending());
        assert_eq!(mirror.zones_of("P1").len(), 1);
        assert_eq!(mirror.zones.get(&kept.zone_id).unwrap().name, "Кухня");
        assert!(mirror.zones.get(&stale.zone_id).is_none());
    }
}
