// ==========================================
// 车间生产跟踪 - API层错误类型
// ==========================================
// 职责: 汇总仓储/引擎错误，转换为面向调用方的错误
// 分类: 本地校验错误（未写库）/ 存储错误 / 级联错误
// ==========================================

use crate::engine::error::{CascadeError, LifecycleError};
use crate::repository::error::RepositoryError;
use thiserror::Error;

/// API层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 校验错误（任何写操作之前拒绝）
    // ==========================================
    #[error("无效输入: {0}")]
    InvalidInput(String),

    #[error("未知的工序模板: {0}")]
    TemplateNotFound(String),

    #[error("状态不适用: {0}")]
    UnsupportedStatus(String),

    // ==========================================
    // 存储错误
    // ==========================================
    #[error("资源未找到: {0}")]
    NotFound(String),

    #[error("业务规则违反: {0}")]
    BusinessRuleViolation(String),

    #[error("写入冲突: {0}")]
    WriteConflict(String),

    #[error("数据库错误: {0}")]
    DatabaseError(String),

    #[error("数据库连接失败: {0}")]
    DatabaseConnectionError(String),

    // ==========================================
    // 级联错误（写操作已生效，聚合值可能过期）
    // ==========================================
    #[error(transparent)]
    Cascade(#[from] CascadeError),

    // ==========================================
    // 通用错误
    // ==========================================
    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ApiError {
    /// 是否为本地校验错误（存储未被修改）
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            ApiError::InvalidInput(_) | ApiError::TemplateNotFound(_) | ApiError::UnsupportedStatus(_)
        )
    }

    /// 是否为级联部分失败（低层聚合已写入）
    pub fn is_partial_cascade(&self) -> bool {
        matches!(self, ApiError::Cascade(e) if e.is_partial())
    }
}

// ==========================================
// 从 RepositoryError 转换
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{}(id={})不存在", entity, id))
            }
            RepositoryError::WriteConflict(msg) => ApiError::WriteConflict(msg),
            RepositoryError::DatabaseConnectionError(msg) => ApiError::DatabaseConnectionError(msg),
            RepositoryError::LockError(msg) => {
                ApiError::DatabaseConnectionError(format!("数据库锁获取失败: {}", msg))
            }
            RepositoryError::DatabaseQueryError(msg) => ApiError::DatabaseError(msg),
            RepositoryError::UniqueConstraintViolation(msg) => {
                ApiError::BusinessRuleViolation(format!("唯一约束违反: {}", msg))
            }
            RepositoryError::ForeignKeyViolation(msg) => {
                ApiError::BusinessRuleViolation(format!("外键约束违反: {}", msg))
            }
            RepositoryError::InternalError(msg) => ApiError::InternalError(msg),
            RepositoryError::Other(err) => ApiError::Other(err),
        }
    }
}

// ==========================================
// 从 LifecycleError 转换
// ==========================================
impl From<LifecycleError> for ApiError {
    fn from(err: LifecycleError) -> Self {
        match err {
            LifecycleError::TemplateNotFound(key) => ApiError::TemplateNotFound(key),
            LifecycleError::StageNotFound(id) => ApiError::NotFound(format!("stage(id={})不存在", id)),
            LifecycleError::OwnerNotFound(owner) => ApiError::NotFound(format!("{} 不存在", owner)),
            err @ LifecycleError::UnsupportedStatus { .. } => {
                ApiError::UnsupportedStatus(err.to_string())
            }
            LifecycleError::InvalidInput(msg) | LifecycleError::InvalidReorder(msg) => {
                ApiError::InvalidInput(msg)
            }
            LifecycleError::Store(e) => e.into(),
            LifecycleError::Cascade(e) => ApiError::Cascade(e),
        }
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{StageOwner, StageStatus};
    use crate::engine::error::CascadeLevel;

    #[test]
    fn test_repository_error_conversion() {
        let api_err: ApiError = RepositoryError::not_found("zone", "Z001").into();
        match api_err {
            ApiError::NotFound(msg) => {
                assert!(msg.contains("zone"));
                assert!(msg.contains("Z001"));
            }
            _ => panic!("Expected NotFound"),
        }
        assert!(!ApiError::from(RepositoryError::WriteConflict("busy".into())).is_validation());
    }

    #[test]
    fn test_lifecycle_validation_errors_stay_validation() {
        let err: ApiError = LifecycleError::UnsupportedStatus {
            owner: StageOwner::Item("I1".to_string()),
            status: StageStatus::Qa,
        }
        .into();
        assert!(err.is_validation());

        let err: ApiError = LifecycleError::TemplateNotFound("stone".to_string()).into();
        assert!(err.is_validation());
        assert!(matches!(err, ApiError::TemplateNotFound(_)));
    }

    #[test]
    fn test_partial_cascade_is_flagged() {
        let err: ApiError = LifecycleError::Cascade(CascadeError::PartialFailure {
            last_written: CascadeLevel::Item,
            failed: CascadeLevel::Zone,
            source: RepositoryError::DatabaseQueryError("no such table: zones".into()),
        })
        .into();
        assert!(err.is_partial_cascade());
        assert!(!err.is_validation());
    }
}
