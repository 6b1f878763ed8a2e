//! Batch Context - Entities

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{BatchError, ImagePayload, Prediction, Progress};

/// 单项的处理结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ItemOutcome {
    /// 等待上传或上传中
    Pending,
    /// 预测成功
    Success { prediction: Prediction },
    /// 重试耗尽后失败
    Failure { message: String },
}

impl ItemOutcome {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ItemOutcome::Pending)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ItemOutcome::Pending => "pending",
            ItemOutcome::Success { .. } => "success",
            ItemOutcome::Failure { .. } => "failure",
        }
    }

    pub fn prediction(&self) -> Option<&Prediction> {
        match self {
            ItemOutcome::Success { prediction } => Some(prediction),
            _ => None,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            ItemOutcome::Failure { message } => Some(message),
            _ => None,
        }
    }
}

/// 工作项 - 批次中的一张图像
///
/// 不变量:
/// - index 在批次内唯一，等于输入顺序中的位置
/// - outcome 只能从 Pending 转换到终态一次
/// - progress 单调不减
#[derive(Debug, Clone)]
pub struct WorkItem {
    index: usize,
    payload: ImagePayload,
    progress: Progress,
    outcome: ItemOutcome,
    attempts: u32,
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
}

impl WorkItem {
    pub fn new(index: usize, payload: ImagePayload) -> Self {
        Self {
            index,
            payload,
            progress: Progress::NONE,
            outcome: ItemOutcome::Pending,
            attempts: 0,
            started_at: None,
            completed_at: None,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn payload(&self) -> &ImagePayload {
        &self.payload
    }

    pub fn progress(&self) -> Progress {
        self.progress
    }

    pub fn outcome(&self) -> &ItemOutcome {
        &self.outcome
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    pub fn is_terminal(&self) -> bool {
        self.outcome.is_terminal()
    }

    /// 推进进度，低于当前值的更新被忽略。返回进度是否变化
    pub(crate) fn advance_progress(&mut self, progress: Progress) -> bool {
        if progress <= self.progress {
            return false;
        }
        if self.started_at.is_none() {
            self.started_at = Some(Utc::now());
        }
        self.progress = progress;
        true
    }

    pub(crate) fn record_attempt(&mut self) {
        self.attempts += 1;
    }

    /// 写入终态，进度强制为 100
    pub(crate) fn resolve(&mut self, outcome: ItemOutcome) -> Result<(), BatchError> {
        if self.outcome.is_terminal() {
            return Err(BatchError::AlreadyResolved(self.index));
        }
        if !outcome.is_terminal() {
            return Err(BatchError::InvalidTransition(self.index));
        }
        self.outcome = outcome;
        self.progress = Progress::DONE;
        self.completed_at = Some(Utc::now());
        Ok(())
    }
}
