//! Batch Session Port - 当前批次状态管理
//!
//! 持有待处理队列、运行标志和最近一次完成的批次，具体实现在 infrastructure/memory 层

use thiserror::Error;

use crate::domain::batch::{BatchRun, ImagePayload, ItemQueue, QueueWarning};

/// Batch Session 错误
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("A batch is already running")]
    AlreadyRunning,

    #[error("Please select or drop at least one image.")]
    EmptyQueue,

    #[error("No batch run found")]
    NotFound,
}

/// Batch Session Port
///
/// 同一时刻只允许一个 BatchRun 处于运行状态
pub trait BatchSessionPort: Send + Sync {
    /// 用新文件替换队列（运行中拒绝）
    fn submit(&self, files: Vec<ImagePayload>) -> Result<Option<QueueWarning>, SessionError>;

    /// 清空队列和上一次结果（运行中拒绝）
    fn clear(&self) -> Result<(), SessionError>;

    /// 以当前队列创建新的 BatchRun 并置为运行中，队列保留
    fn begin_run(&self) -> Result<BatchRun, SessionError>;

    /// 归还完成的 BatchRun 并清除运行标志
    fn finish_run(&self, run: BatchRun);

    /// 最近一次完成的批次
    fn last_run(&self) -> Result<BatchRun, SessionError>;

    /// 当前队列快照
    fn queue(&self) -> ItemQueue;

    fn is_running(&self) -> bool;
}
