// ==========================================
// 车间生产跟踪 - 进程内变更广播
// ==========================================
// 职责: 将 API 层发布的变更事件广播给全部订阅者
// 实现: tokio broadcast 通道；订阅按项目过滤
// 说明: 慢订阅者落后时收到 Lagged 信号，由订阅方按“有变更”处理
// ==========================================

use std::collections::HashSet;
use std::error::Error;

use tokio::sync::broadcast::{self, error::RecvError};

use crate::engine::events::{ChangeEvent, ChangePublisher};

/// 变更广播中心
#[derive(Debug, Clone)]
pub struct ChangeHub {
    sender: broadcast::Sender<ChangeEvent>,
}

impl ChangeHub {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// 订阅单个项目
    pub fn subscribe(&self, project_id: &str) -> ChangeSubscription {
        self.subscribe_projects([project_id.to_string()])
    }

    /// 订阅多个项目
    pub fn subscribe_projects<I>(&self, project_ids: I) -> ChangeSubscription
    where
        I: IntoIterator<Item = String>,
    {
        ChangeSubscription {
            projects: project_ids.into_iter().collect(),
            receiver: self.sender.subscribe(),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl ChangePublisher for ChangeHub {
    fn publish(&self, event: ChangeEvent) -> Result<usize, Box<dyn Error + Send + Sync>> {
        tracing::debug!(
            "广播变更事件: project_id={}, kind={}, record_id={}, event={}",
            event.project_id,
            event.entity_kind,
            event.record_id,
            event.event_type
        );
        // 无订阅者时 send 返回错误，视为无人接收
        Ok(self.sender.send(event).unwrap_or(0))
    }
}

/// 订阅收到的信号
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedSignal {
    /// 订阅项目内的变更
    Changed(ChangeEvent),
    /// 落后丢失了 n 条事件（无法判断涉及哪些项目）
    Lagged(u64),
}

/// 项目级变更订阅
///
/// 丢弃即释放订阅
#[derive(Debug)]
pub struct ChangeSubscription {
    projects: HashSet<String>,
    receiver: broadcast::Receiver<ChangeEvent>,
}

impl ChangeSubscription {
    pub fn projects(&self) -> impl Iterator<Item = &str> {
        self.projects.iter().map(String::as_str)
    }

    /// 等待下一条相关信号；广播中心关闭时返回 None
    pub async fn recv(&mut self) -> Option<FeedSignal> {
        loop {
            match self.receiver.recv().await {
                Ok(event) if self.projects.contains(&event.project_id) => {
                    return Some(FeedSignal::Changed(event));
                }
                Ok(_) => continue,
                Err(RecvError::Lagged(skipped)) => return Some(FeedSignal::Lagged(skipped)),
                Err(RecvError::Closed) => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::EntityKind;

    #[tokio::test]
    async fn test_subscription_filters_by_project() {
        let hub = ChangeHub::new(16);
        let mut sub = hub.subscribe("P1");

        hub.publish(ChangeEvent::updated("P2", EntityKind::Zone, "Z2")).unwrap();
        hub.publish(ChangeEvent::updated("P1", EntityKind::Zone, "Z1")).unwrap();

        match sub.recv().await {
            Some(FeedSignal::Changed(event)) => assert_eq!(event.record_id, "Z1"),
            other => panic!("unexpected signal: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_lagged_receiver_reports_lag() {
        let hub = ChangeHub::new(2);
        let mut sub = hub.subscribe("P1");
        for i in 0..5 {
            hub.publish(ChangeEvent::updated("P1", EntityKind::Stage, &format!("S{}", i)))
                .unwrap();
        }
        assert!(matches!(sub.recv().await, Some(FeedSignal::Lagged(3))));
    }

    #[test]
    fn test_publish_without_subscribers_is_not_an_error() {
        let hub = ChangeHub::new(4);
        let delivered = hub.publish(ChangeEvent::inserted("P1", EntityKind::Item, "I1")).unwrap();
        assert_eq!(delivered, 0);
        assert_eq!(hub.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_closed_hub_ends_subscription() {
        let hub = ChangeHub::new(4);
        let mut sub = hub.subscribe("P1");
        drop(hub);
        assert!(sub.recv().await.is_none());
    }
}
