//! 应用层错误定义
//!
//! 统一的命令错误类型

use thiserror::Error;

use crate::application::ports::{AnnotationStorageError, OverlayError, SessionError};
use crate::domain::batch::BatchError;

/// 应用层错误
#[derive(Debug, Error)]
pub enum ApplicationError {
    /// 资源未找到
    #[error("{0} not found")]
    NotFound(&'static str),

    /// 验证错误
    #[error("{0}")]
    ValidationError(String),

    /// 状态无效
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// 存储错误
    #[error("Storage error: {0}")]
    StorageError(String),

    /// 渲染错误
    #[error("Render error: {0}")]
    RenderError(String),
}

impl From<SessionError> for ApplicationError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::EmptyQueue => Self::ValidationError(err.to_string()),
            SessionError::NotFound => Self::NotFound("Batch run"),
            SessionError::AlreadyRunning => Self::InvalidState(err.to_string()),
        }
    }
}

impl From<BatchError> for ApplicationError {
    fn from(err: BatchError) -> Self {
        Self::InvalidState(err.to_string())
    }
}

impl From<AnnotationStorageError> for ApplicationError {
    fn from(err: AnnotationStorageError) -> Self {
        Self::StorageError(err.to_string())
    }
}

impl From<OverlayError> for ApplicationError {
    fn from(err: OverlayError) -> Self {
        Self::RenderError(err.to_string())
    }
}
