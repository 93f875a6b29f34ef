// ==========================================
// 车间生产跟踪 - 分区领域模型
// ==========================================
// 分区 (Zone): 项目内的顶层分组（如一个房间）
// 删除分区级联删除其下全部制品
// ==========================================

use chrono::{NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ==========================================
// Zone - 分区
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    pub zone_id: String,           // 分区ID
    pub project_id: String,        // 所属项目
    pub name: String,              // 名称
    pub position: i32,             // 同级排序
    pub progress: i32,             // 缓存进度 (0-100)
    pub items_count: i32,          // 制品数量
    pub created_at: NaiveDateTime, // 创建时间
    pub updated_at: NaiveDateTime, // 更新时间
}

impl Zone {
    pub fn new(project_id: &str, name: &str, position: i32) -> Self {
        let now = Utc::now().naive_utc();
        Self {
            zone_id: Uuid::new_v4().to_string(),
            project_id: project_id.to_string(),
            name: name.trim().to_string(),
            position,
            progress: 0,
            items_count: 0,
            created_at: now,
            updated_at: now,
        }
    }
}

/// 分区局部更新
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ZonePatch {
    pub name: Option<String>,
    pub position: Option<i32>,
    pub progress: Option<i32>,
    pub items_count: Option<i32>,
}

impl ZonePatch {
    pub fn progress(value: i32) -> Self {
        Self {
            progress: Some(value),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.position.is_none()
            && self.progress.is_none()
            && self.items_count.is_none()
    }

    /// 将补丁应用到内存中的记录（供乐观镜像使用）
    pub fn apply_to(&self, zone: &mut Zone) {
        if let Some(name) = &self.name {
            zone.name = name.clone();
        }
        if let Some(position) = self.position {
            zone.position = position;
        }
        if let Some(progress) = self.progress {
            zone.progress = progress;
        }
        if let Some(count) = self.items_count {
            zone.items_count = count;
        }
    }
}
