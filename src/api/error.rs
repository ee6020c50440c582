// ==========================================
// 工作量感知派单引擎 - API层错误类型
// ==========================================
// 职责: 汇总配置/导入/导出/仓储错误，转换为调用方可读的错误消息
// ==========================================

use crate::config::ConfigError;
use crate::domain::types::FailureKind;
use crate::exporter::ExportError;
use crate::importer::ImportError;
use crate::repository::error::RepositoryError;
use thiserror::Error;

/// API层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 输入错误
    // ==========================================
    #[error("无效输入: {0}")]
    InvalidInput(String),

    #[error("资源未找到: {0}")]
    NotFound(String),

    #[error("配置错误: {0}")]
    ConfigError(String),

    // ==========================================
    // 快照导入 / 结果导出
    // ==========================================
    #[error("快照导入失败: {0}")]
    ImportError(#[from] ImportError),

    #[error("结果导出失败: {0}")]
    ExportError(#[from] ExportError),

    // ==========================================
    // 数据访问错误
    // ==========================================
    #[error("数据库错误: {0}")]
    DatabaseError(String),

    #[error("数据库连接失败: {0}")]
    DatabaseConnectionError(String),

    #[error("数据库事务失败: {0}")]
    DatabaseTransactionError(String),
}

impl ApiError {
    /// 失败类别（仅导入错误可归类为上游数据问题）
    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            ApiError::ImportError(err) => Some(err.failure_kind()),
            _ => None,
        }
    }
}

impl From<ConfigError> for ApiError {
    fn from(err: ConfigError) -> Self {
        ApiError::ConfigError(err.to_string())
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
            RepositoryError::DatabaseTransactionError(msg) => ApiError::DatabaseTransactionError(msg),
            RepositoryError::LockError(msg) => {
                ApiError::DatabaseConnectionError(format!("数据库锁获取失败: {}", msg))
            }
            RepositoryError::DatabaseQueryError(msg) => ApiError::DatabaseError(msg),
            RepositoryError::UniqueConstraintViolation(msg) => {
                ApiError::DatabaseError(format!("唯一约束违反: {}", msg))
            }
            RepositoryError::ForeignKeyViolation(msg) => {
                ApiError::DatabaseError(format!("外键约束违反: {}", msg))
            }
            RepositoryError::FieldValueError { field, message } => {
                ApiError::DatabaseError(format!("字段{}错误: {}", field, message))
            }
        }
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_import_errors_are_upstream_data() {
        let err: ApiError = ImportError::MissingRequiredColumn {
            table: "roster".to_string(),
            column: "Shift".to_string(),
        }
        .into();
        assert_eq!(err.failure_kind(), Some(FailureKind::UpstreamData));
        assert!(err.to_string().contains("Shift"));
    }

    #[test]
    fn test_repository_not_found_maps_to_not_found() {
        let err: ApiError = RepositoryError::NotFound {
            entity: "dispatch_run".to_string(),
            id: "r1".to_string(),
        }
        .into();
        assert!(matches!(err, ApiError::NotFound(_)));
        assert_eq!(err.failure_kind(), None);
    }
}
