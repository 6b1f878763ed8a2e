//! Batch Context - 批量上传限界上下文
//!
//! 职责:
//! - 工作项队列（保持输入顺序，数量上限）
//! - BatchRun 聚合（独占工作项状态）
//! - 结果汇总

mod aggregate;
mod entities;
mod errors;
mod queue;
mod report;
mod value_objects;

pub use aggregate::BatchRun;
pub use entities::{ItemOutcome, WorkItem};
pub use errors::BatchError;
pub use queue::{ItemQueue, QueueWarning, DEFAULT_MAX_ITEMS};
pub use report::{BatchReport, BatchSummary};
pub use value_objects::{
    BatchRunId, BoundingBox, Classification, Confidence, ImageFormat, ImagePayload, Prediction,
    Progress,
};
