// ==========================================
// 车间生产跟踪 - 变更同步层
// ==========================================
// 职责: 进程内变更广播与查看者侧的防抖刷新
// ==========================================

pub mod change_hub;
pub mod notification_controller;

pub use change_hub::{ChangeHub, ChangeSubscription, FeedSignal};
pub use notification_controller::{ChangeNotificationController, RefetchTarget};
