// ==========================================
// 车间生产跟踪 - 引擎层错误类型
// ==========================================
// 分类:
// - 校验错误: 在任何写操作之前本地拒绝
// - 存储错误: 仓储层错误原样透传
// - 级联部分失败: 低层已写入、高层失败，属于可恢复的不一致
// ==========================================

use crate::domain::{StageOwner, StageStatus};
use crate::repository::RepositoryError;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// 级联重算层级
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CascadeLevel {
    Component,
    Item,
    Zone,
}

impl fmt::Display for CascadeLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CascadeLevel::Component => write!(f, "component"),
            CascadeLevel::Item => write!(f, "item"),
            CascadeLevel::Zone => write!(f, "zone"),
        }
    }
}

/// 级联重算错误
#[derive(Error, Debug)]
pub enum CascadeError {
    /// 首个层级即失败，没有任何聚合值被写入
    #[error("进度重算失败 (level={level}): {source}")]
    Store {
        level: CascadeLevel,
        #[source]
        source: RepositoryError,
    },

    /// 低层已写入、高层失败；不回滚，等待下一次级联或手动刷新修正
    #[error("进度级联部分失败: 已写入至 {last_written}, 失败于 {failed}: {source}")]
    PartialFailure {
        last_written: CascadeLevel,
        failed: CascadeLevel,
        #[source]
        source: RepositoryError,
    },
}

impl CascadeError {
    pub fn is_partial(&self) -> bool {
        matches!(self, CascadeError::PartialFailure { .. })
    }

    pub fn failed_level(&self) -> CascadeLevel {
        match self {
            CascadeError::Store { level, .. } => *level,
            CascadeError::PartialFailure { failed, .. } => *failed,
        }
    }
}

pub type CascadeResult<T> = Result<T, CascadeError>;

/// 工序生命周期错误
#[derive(Error, Debug)]
pub enum LifecycleError {
    // ===== 校验错误 =====
    #[error("未知的工序模板: {0}")]
    TemplateNotFound(String),

    #[error("工序不存在: {0}")]
    StageNotFound(String),

    #[error("工序归属不存在: {0}")]
    OwnerNotFound(StageOwner),

    #[error("状态 {status} 不适用于 {owner} 的工序")]
    UnsupportedStatus { owner: StageOwner, status: StageStatus },

    #[error("无效输入: {0}")]
    InvalidInput(String),

    #[error("无效的排序请求: {0}")]
    InvalidReorder(String),

    // ===== 执行错误 =====
    #[error(transparent)]
    Store(#[from] RepositoryError),

    #[error(transparent)]
    Cascade(#[from] CascadeError),
}

impl LifecycleError {
    /// 是否为本地校验错误（未发生任何写操作）
    pub fn is_validation(&self) -> bool {
        !matches!(self, LifecycleError::Store(_) | LifecycleError::Cascade(_))
    }
}

pub type LifecycleResult<T> = Result<T, LifecycleError>;
