// ==========================================
// 变更通知控制器测试
// ==========================================
// 场景: 突发事件合并为一次拉取、关闭后不再拉取、落后时全量刷新、
//       与乐观变更层联动
// ==========================================

mod helpers;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use helpers::*;
use workshop_production::api::ApiResult;
use workshop_production::client::OptimisticMutationLayer;
use workshop_production::domain::{EntityKind, StagePatch, StageStatus};
use workshop_production::engine::{ChangeEvent, ChangePublisher};
use workshop_production::sync::{ChangeHub, ChangeNotificationController, RefetchTarget};

const DEBOUNCE: Duration = Duration::from_millis(50);
const SETTLE: Duration = Duration::from_millis(250);

/// 记录每次拉取的项目ID
#[derive(Default)]
struct RecordingTarget {
    calls: AtomicUsize,
    projects: Mutex<Vec<String>>,
}

impl RecordingTarget {
    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn projects(&self) -> Vec<String> {
        let mut projects = self.projects.lock().unwrap().clone();
        projects.sort();
        projects
    }
}

#[async_trait]
impl RefetchTarget for RecordingTarget {
    async fn refetch_project(&self, project_id: &str) -> ApiResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.projects.lock().unwrap().push(project_id.to_string());
        Ok(())
    }
}

fn event(project_id: &str, n: usize) -> ChangeEvent {
    ChangeEvent::updated(project_id, EntityKind::Stage, &format!("stage-{}", n))
}

#[tokio::test]
async fn test_burst_of_events_yields_single_refetch() {
    let hub = ChangeHub::new(64);
    let target = Arc::new(RecordingTarget::default());
    let controller =
        ChangeNotificationController::spawn(hub.subscribe("p1"), target.clone(), DEBOUNCE);
    assert!(controller.is_running());

    for n in 0..10 {
        hub.publish(event("p1", n)).unwrap();
    }
    tokio::time::sleep(SETTLE).await;
    assert_eq!(target.calls(), 1);

    // 新的一批事件触发新的一次拉取
    hub.publish(event("p1", 99)).unwrap();
    tokio::time::sleep(SETTLE).await;
    assert_eq!(target.calls(), 2);

    controller.teardown().await;
}

#[tokio::test]
async fn test_unwatched_projects_are_ignored_and_dirty_set_is_per_project() {
    let hub = ChangeHub::new(64);
    let target = Arc::new(RecordingTarget::default());
    let subscription = hub.subscribe_projects(["p1".to_string(), "p2".to_string()]);
    let controller = ChangeNotificationController::spawn(subscription, target.clone(), DEBOUNCE);

    hub.publish(event("p1", 1)).unwrap();
    hub.publish(event("p3", 2)).unwrap();
    hub.publish(event("p2", 3)).unwrap();
    hub.publish(event("p1", 4)).unwrap();
    tokio::time::sleep(SETTLE).await;

    assert_eq!(target.projects(), vec!["p1", "p2"]);
    controller.teardown().await;
}

#[tokio::test]
async fn test_no_refetch_after_teardown() {
    let hub = ChangeHub::new(64);
    let target = Arc::new(RecordingTarget::default());
    let controller =
        ChangeNotificationController::spawn(hub.subscribe("p1"), target.clone(), DEBOUNCE);

    // 计时器挂起时关闭
    hub.publish(event("p1", 1)).unwrap();
    tokio::task::yield_now().await;
    controller.teardown().await;

    hub.publish(event("p1", 2)).unwrap();
    tokio::time::sleep(SETTLE).await;
    assert_eq!(target.calls(), 0);
    assert_eq!(hub.subscriber_count(), 0);
}

#[tokio::test]
async fn test_lagged_subscription_refetches_all_watched_projects() {
    let hub = ChangeHub::new(2);
    let target = Arc::new(RecordingTarget::default());
    let subscription = hub.subscribe_projects(["p1".to_string(), "p2".to_string()]);

    // 控制器启动前塞满通道，订阅必然落后
    for n in 0..5 {
        hub.publish(event("p1", n)).unwrap();
    }
    let controller = ChangeNotificationController::spawn(subscription, target.clone(), DEBOUNCE);
    tokio::time::sleep(SETTLE).await;

    assert_eq!(target.projects(), vec!["p1", "p2"]);
    controller.teardown().await;
}

#[tokio::test]
async fn test_viewer_mirror_follows_other_viewers_mutations() {
    let env = build_env();
    let (zone, item, component) = seed_kitchen(&env.api, "p1");

    let viewer = Arc::new(OptimisticMutationLayer::new(env.api.clone(), "p1"));
    viewer.refetch().unwrap();
    viewer.open_item(&item.item_id).unwrap();
    let controller =
        ChangeNotificationController::spawn(env.hub.subscribe("p1"), viewer.clone(), DEBOUNCE);

    for stage in component_stages(&env.api, &component.component_id).iter().take(3) {
        env.api
            .update_stage(&stage.stage_id, &StagePatch::status(StageStatus::Completed))
            .unwrap();
    }
    tokio::time::sleep(SETTLE).await;

    viewer
        .with_mirror(|m| {
            assert_eq!(m.components.get(&component.component_id).unwrap().progress, 43);
            assert_eq!(m.zones.get(&zone.zone_id).unwrap().progress, 43);
            let completed = m
                .stages_of(&component.component_id)
                .iter()
                .filter(|s| s.status == StageStatus::Completed)
                .count();
            assert_eq!(completed, 3);
        })
        .unwrap();

    controller.teardown().await;
}
