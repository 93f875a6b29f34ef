// ==========================================
// 车间生产跟踪 - 变更事件发布
// ==========================================
// 职责: 定义项目级变更事件与发布 trait，实现依赖倒置
// 说明: API 层只依赖 trait，同步层（ChangeHub）提供实现
// ==========================================

use crate::domain::EntityKind;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt;
use std::sync::Arc;

// ==========================================
// 变更事件类型
// ==========================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeEventType {
    Insert,
    Update,
    Delete,
}

impl ChangeEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeEventType::Insert => "INSERT",
            ChangeEventType::Update => "UPDATE",
            ChangeEventType::Delete => "DELETE",
        }
    }
}

impl fmt::Display for ChangeEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 项目级变更事件
///
/// 只携带定位信息，不携带记录内容；订阅方据此整体重新拉取
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub project_id: String,
    pub entity_kind: EntityKind,
    pub record_id: String,
    pub event_type: ChangeEventType,
}

impl ChangeEvent {
    pub fn new(
        project_id: impl Into<String>,
        entity_kind: EntityKind,
        record_id: impl Into<String>,
        event_type: ChangeEventType,
    ) -> Self {
        Self {
            project_id: project_id.into(),
            entity_kind,
            record_id: record_id.into(),
            event_type,
        }
    }

    pub fn inserted(project_id: &str, kind: EntityKind, record_id: &str) -> Self {
        Self::new(project_id, kind, record_id, ChangeEventType::Insert)
    }

    pub fn updated(project_id: &str, kind: EntityKind, record_id: &str) -> Self {
        Self::new(project_id, kind, record_id, ChangeEventType::Update)
    }

    pub fn deleted(project_id: &str, kind: EntityKind, record_id: &str) -> Self {
        Self::new(project_id, kind, record_id, ChangeEventType::Delete)
    }
}

// ==========================================
// 事件发布 Trait
// ==========================================

/// 变更事件发布者
///
/// # 返回
/// - `Ok(n)`: 收到事件的订阅者数量（无订阅者时为 0）
/// - `Err`: 发布失败
pub trait ChangePublisher: Send + Sync {
    fn publish(&self, event: ChangeEvent) -> Result<usize, Box<dyn Error + Send + Sync>>;
}

/// 空操作发布者（单元测试 / 单查看者场景）
#[derive(Debug, Clone, Default)]
pub struct NoOpChangePublisher;

impl ChangePublisher for NoOpChangePublisher {
    fn publish(&self, event: ChangeEvent) -> Result<usize, Box<dyn Error + Send + Sync>> {
        tracing::debug!(
            "NoOpChangePublisher: 跳过事件发布 - project_id={}, kind={}, event={}",
            event.project_id,
            event.entity_kind,
            event.event_type
        );
        Ok(0)
    }
}

/// 可选的事件发布者包装
///
/// 发布失败只记录告警，不影响已经成功的写操作
#[derive(Clone, Default)]
pub struct OptionalChangePublisher {
    inner: Option<Arc<dyn ChangePublisher>>,
}

impl OptionalChangePublisher {
    pub fn with_publisher(publisher: Arc<dyn ChangePublisher>) -> Self {
        Self {
            inner: Some(publisher),
        }
    }

    pub fn none() -> Self {
        Self { inner: None }
    }

    pub fn publish(&self, event: ChangeEvent) {
        let Some(publisher) = &self.inner else {
            tracing::debug!(
                "OptionalChangePublisher: 未配置发布者，跳过事件 - record_id={}",
                event.record_id
            );
            return;
        };
        let record_id = event.record_id.clone();
        if let Err(e) = publisher.publish(event) {
            tracing::warn!("变更事件发布失败: record_id={}, error={}", record_id, e);
        }
    }

    pub fn is_configured(&self) -> bool {
        self.inner.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct Recording(Mutex<Vec<ChangeEvent>>);

    impl ChangePublisher for Recording {
        fn publish(&self, event: ChangeEvent) -> Result<usize, Box<dyn Error + Send + Sync>> {
            self.0.lock().unwrap().push(event);
            Ok(1)
        }
    }

    #[test]
    fn test_event_constructors() {
        let event = ChangeEvent::updated("P1", EntityKind::Stage, "S1");
        assert_eq!(event.event_type, ChangeEventType::Update);
        assert_eq!(event.entity_kind, EntityKind::Stage);
        assert_eq!(event.project_id, "P1");
        assert_eq!(ChangeEventType::Delete.to_string(), "DELETE");
    }

    #[test]
    fn test_noop_publisher() {
        let publisher = NoOpChangePublisher;
        let result = publisher.publish(ChangeEvent::inserted("P1", EntityKind::Zone, "Z1"));
        assert_eq!(result.unwrap(), 0);
    }

    #[test]
    fn test_optional_publisher_forwards_when_configured() {
        let recording = Arc::new(Recording(Mutex::new(Vec::new())));
        let publisher = OptionalChangePublisher::with_publisher(recording.clone());
        assert!(publisher.is_configured());

        publisher.publish(ChangeEvent::deleted("P1", EntityKind::Item, "I1"));
        assert_eq!(recording.0.lock().unwrap().len(), 1);

        let none = OptionalChangePublisher::none();
        assert!(!none.is_configured());
        none.publish(ChangeEvent::deleted("P1", EntityKind::Item, "I1"));
    }
}
