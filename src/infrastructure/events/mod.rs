//! Events Layer - 批次事件推送

mod publisher;

pub use publisher::{BatchEvent, BatchSummaryDto, EventPublisher};
