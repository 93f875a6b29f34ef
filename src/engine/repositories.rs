// ==========================================
// 车间生产跟踪 - 引擎层仓储聚合
// ==========================================
// 职责: 聚合引擎与 API 所需的全部实体存储
// 说明: 以 trait 对象持有，便于测试时替换单个存储
// ==========================================

use std::sync::{Arc, Mutex};

use rusqlite::Connection;

use crate::domain::{Component, ComponentMaterial, ComponentPart, Item, Stage, StageOwner, Zone};
use crate::repository::{
    ComponentMaterialRepository, ComponentPartRepository, ComponentRepository, EntityStore,
    ItemRepository, StageRepository, ZoneRepository,
};

/// 生产层级仓储集合
///
/// # 包含的存储
/// - `zones` / `items` / `components`: 层级节点
/// - `stages`: 部件工序（参与聚合）
/// - `item_stages`: 制品工序（轻量跟踪）
/// - `materials` / `parts`: 部件描述数据
#[derive(Clone)]
pub struct ProductionRepositories {
    pub zones: Arc<dyn EntityStore<Zone>>,
    pub items: Arc<dyn EntityStore<Item>>,
    pub components: Arc<dyn EntityStore<Component>>,
    pub stages: Arc<dyn EntityStore<Stage>>,
    pub item_stages: Arc<dyn EntityStore<Stage>>,
    pub materials: Arc<dyn EntityStore<ComponentMaterial>>,
    pub parts: Arc<dyn EntityStore<ComponentPart>>,
}

impl ProductionRepositories {
    /// 基于共享 SQLite 连接创建全部仓储
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self {
            zones: Arc::new(ZoneRepository::from_connection(conn.clone())),
            items: Arc::new(ItemRepository::from_connection(conn.clone())),
            components: Arc::new(ComponentRepository::from_connection(conn.clone())),
            stages: Arc::new(StageRepository::component_stages(conn.clone())),
            item_stages: Arc::new(StageRepository::item_stages(conn.clone())),
            materials: Arc::new(ComponentMaterialRepository::from_connection(conn.clone())),
            parts: Arc::new(ComponentPartRepository::from_connection(conn)),
        }
    }

    /// 按工序归属选择存储
    pub fn stage_store(&self, owner: &StageOwner) -> &Arc<dyn EntityStore<Stage>> {
        match owner {
            StageOwner::Component(_) => &self.stages,
            StageOwner::Item(_) => &self.item_stages,
        }
    }
}
