//! Worker Layer - Batch Upload Processing
//!
//! 实现 BatchScheduler 和 RetryingUploader，按窗口并发上传并汇总结果

mod batch_scheduler;
mod retrying_uploader;

pub use batch_scheduler::{BatchScheduler, BatchSchedulerConfig};
pub use retrying_uploader::{
    fallback_message, Backoff, ItemUpdate, RetryPolicy, RetryingUploader, UploadResult,
};
