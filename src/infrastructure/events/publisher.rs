//! Event Publisher Implementation
//!
//! 批次进度事件推送，供展示层订阅

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::domain::batch::{BatchRunId, BatchSummary, ItemOutcome, QueueWarning};

/// 批次事件类型
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum BatchEvent {
    /// 队列被替换
    QueueSubmitted {
        count: usize,
        #[serde(skip_serializing_if = "Option::is_none")]
        warning: Option<QueueWarning>,
    },
    /// 队列被清空
    QueueCleared,
    /// 单项进度变化
    ItemProgress {
        run_id: BatchRunId,
        index: usize,
        progress: u8,
    },
    /// 单项进入终态
    ItemCompleted {
        run_id: BatchRunId,
        index: usize,
        attempts: u32,
        outcome: ItemOutcome,
    },
    /// 批次完成（每个批次只发送一次）
    BatchCompleted {
        run_id: BatchRunId,
        summary: BatchSummaryDto,
    },
}

/// 汇总计数（事件载荷）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummaryDto {
    pub total: usize,
    pub positive: usize,
    pub negative: usize,
    pub failed: usize,
}

impl From<BatchSummary> for BatchSummaryDto {
    fn from(summary: BatchSummary) -> Self {
        Self {
            total: summary.total,
            positive: summary.positive,
            negative: summary.negative,
            failed: summary.failed,
        }
    }
}

/// 事件发布器
pub struct EventPublisher {
    channel: broadcast::Sender<BatchEvent>,
}

impl EventPublisher {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(256);
        Self { channel: tx }
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// 订阅批次事件
    pub fn subscribe(&self) -> broadcast::Receiver<BatchEvent> {
        self.channel.subscribe()
    }

    pub fn publish_queue_submitted(&self, count: usize, warning: Option<QueueWarning>) {
        self.publish(BatchEvent::QueueSubmitted { count, warning });
    }

    pub fn publish_queue_cleared(&self) {
        self.publish(BatchEvent::QueueCleared);
    }

    pub fn publish_item_progress(&self, run_id: BatchRunId, index: usize, progress: u8) {
        self.publish(BatchEvent::ItemProgress {
            run_id,
            index,
            progress,
        });
    }

    pub fn publish_item_completed(
        &self,
        run_id: BatchRunId,
        index: usize,
        attempts: u32,
        outcome: ItemOutcome,
    ) {
        self.publish(BatchEvent::ItemCompleted {
            run_id,
            index,
            attempts,
            outcome,
        });
    }

    pub fn publish_batch_completed(&self, run_id: BatchRunId, summary: BatchSummary) {
        self.publish(BatchEvent::BatchCompleted {
            run_id,
            summary: summary.into(),
        });
    }

    fn publish(&self, event: BatchEvent) {
        if let Err(e) = self.channel.send(event) {
            tracing::trace!(error = %e, "Failed to publish event (no receivers)");
        }
    }
}

impl Default for EventPublisher {
    fn default() -> Self {
        Self::new()
    }
}
