//! Batch Context - Errors

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BatchError {
    #[error("工作项不存在: {0}")]
    ItemNotFound(usize),

    #[error("工作项已处于终态: {0}")]
    AlreadyResolved(usize),

    #[error("无效的状态转换: {0}")]
    InvalidTransition(usize),

    #[error("批次已在运行")]
    AlreadyRunning,

    #[error("批次未在运行")]
    NotRunning,
}
