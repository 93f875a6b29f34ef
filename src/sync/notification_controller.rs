// ==========================================
// 车间生产跟踪 - 变更通知控制器
// ==========================================
// 职责: 订阅项目变更、防抖、按项目批量重新拉取
// 规则:
// - 每条事件（重新）开始固定防抖窗口
// - 窗口到期后每个脏项目重新拉取一次，然后清空脏集合
// - 不做增量补丁，整体重新拉取
// - 关闭后释放订阅、取消计时器，不再发起任何拉取
// ==========================================

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};

use crate::api::ApiResult;
use crate::sync::change_hub::{ChangeSubscription, FeedSignal};

/// 重新拉取目标（查看者的本地镜像）
#[async_trait]
pub trait RefetchTarget: Send + Sync {
    async fn refetch_project(&self, project_id: &str) -> ApiResult<()>;
}

/// 变更通知控制器
///
/// 每个订阅一个 tokio 任务
pub struct ChangeNotificationController {
    shutdown: watch::Sender<bool>,
    handle: Option<JoinHandle<()>>,
}

impl ChangeNotificationController {
    /// 启动控制器任务
    pub fn spawn(
        subscription: ChangeSubscription,
        target: Arc<dyn RefetchTarget>,
        debounce: Duration,
    ) -> Self {
        let (shutdown, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(run(subscription, target, debounce, shutdown_rx));
        Self {
            shutdown,
            handle: Some(handle),
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// 关闭：取消挂起的计时器并释放订阅
    ///
    /// 正在进行的拉取会完成（存储调用不可中途取消），之后不再发起新的拉取
    pub async fn teardown(mut self) {
        let _ = self.shutdown.send(true);
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                warn!("变更通知任务异常退出: {}", e);
            }
        }
    }
}

impl Drop for ChangeNotificationController {
    fn drop(&mut self) {
        let _ = self.shutdown.send(true);
    }
}

async fn run(
    mut subscription: ChangeSubscription,
    target: Arc<dyn RefetchTarget>,
    debounce: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let watched: Vec<String> = subscription.projects().map(str::to_string).collect();
    let mut dirty: HashSet<String> = HashSet::new();
    let mut deadline: Option<Instant> = None;

    debug!("变更通知控制器已启动: projects={:?}, debounce={:?}", watched, debounce);

    loop {
        tokio::select! {
            biased;

            _ = shutdown.changed() => break,

            signal = subscription.recv() => match signal {
                Some(FeedSignal::Changed(event)) => {
                    debug!(
                        "收到变更: project_id={}, kind={}, record_id={}",
                        event.project_id, event.entity_kind, event.record_id
                    );
                    dirty.insert(event.project_id);
                    deadline = Some(Instant::now() + debounce);
                }
                Some(FeedSignal::Lagged(skipped)) => {
                    warn!("变更订阅落后，丢失 {} 条事件，标记全部项目待刷新", skipped);
                    dirty.extend(watched.iter().cloned());
                    deadline = Some(Instant::now() + debounce);
                }
                None => {
                    debug!("变更广播已关闭");
                    break;
                }
            },

            _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                deadline = None;
                if *shutdown.borrow() {
                    break;
                }
                let projects: Vec<String> = dirty.drain().collect();
                flush(&target, &projects).await;
            }
        }
    }

    debug!("变更通知控制器已停止: pending_dirty={}", dirty.len());
}

/// 每个脏项目拉取一次（并发执行）
async fn flush(target: &Arc<dyn RefetchTarget>, projects: &[String]) {
    if projects.is_empty() {
        return;
    }
    info!("防抖窗口到期，重新拉取 {} 个项目", projects.len());

    let results = join_all(projects.iter().map(|p| target.refetch_project(p))).await;
    for (project_id, result) in projects.iter().zip(results) {
        if let Err(e) = result {
            warn!("项目重新拉取失败: project_id={}, error={}", project_id, e);
        }
    }
}
