//! Retrying Uploader - 单项上传与有限重试

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use crate::application::ports::{PredictRequest, PredictionServicePort};
use crate::config::{BackoffKind, EndpointConfig};
use crate::domain::batch::{ImagePayload, ItemOutcome, Progress};

/// 重试间隔策略
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// 立即重试
    None,
    Fixed(Duration),
    /// 每次重试间隔翻倍
    Exponential(Duration),
}

impl Backoff {
    /// 第 `retry` 次重试前的等待时间（从 1 开始）
    pub fn delay(&self, retry: u32) -> Duration {
        match self {
            Backoff::None => Duration::ZERO,
            Backoff::Fixed(base) => *base,
            Backoff::Exponential(base) => {
                let factor = 2u32.saturating_pow(retry.saturating_sub(1));
                base.saturating_mul(factor)
            }
        }
    }
}

/// 重试策略
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// 首次失败后的最大重试次数（总尝试次数 = max_retries + 1）
    pub max_retries: u32,
    pub backoff: Backoff,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            backoff: Backoff::None,
        }
    }
}

impl RetryPolicy {
    pub fn from_config(config: &EndpointConfig) -> Self {
        let base = Duration::from_millis(config.backoff_ms);
        let backoff = match config.backoff {
            BackoffKind::None => Backoff::None,
            BackoffKind::Fixed => Backoff::Fixed(base),
            BackoffKind::Exponential => Backoff::Exponential(base),
        };
        Self {
            max_retries: config.max_retries,
            backoff,
        }
    }
}

/// 上传过程中发往调度器的状态更新
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemUpdate {
    /// 开始一次新的尝试
    Attempt { index: usize },
    Progress { index: usize, progress: Progress },
}

/// 单项上传的最终结果
#[derive(Debug, Clone)]
pub struct UploadResult {
    pub index: usize,
    pub attempts: u32,
    pub outcome: ItemOutcome,
}

/// 重试耗尽且服务端没有返回 message 时的提示
pub fn fallback_message(index: usize) -> String {
    format!("Failed to upload image {}.", index + 1)
}

/// 重试上传器
///
/// 只负责一个工作项；状态变化通过 `ItemUpdate` 交给拥有 BatchRun 的调度器写入
pub struct RetryingUploader {
    service: Arc<dyn PredictionServicePort>,
    policy: RetryPolicy,
}

impl RetryingUploader {
    pub fn new(service: Arc<dyn PredictionServicePort>, policy: RetryPolicy) -> Self {
        Self { service, policy }
    }

    /// 上传单项直到成功或重试耗尽，总是返回终态
    pub async fn upload(
        &self,
        index: usize,
        payload: &ImagePayload,
        updates: mpsc::UnboundedSender<ItemUpdate>,
    ) -> UploadResult {
        let mut retries_left = self.policy.max_retries;
        let mut attempts = 0u32;

        loop {
            attempts += 1;
            let _ = updates.send(ItemUpdate::Attempt { index });
            let _ = updates.send(ItemUpdate::Progress {
                index,
                progress: Progress::SENT,
            });

            tracing::debug!(
                index = index,
                attempt = attempts,
                file_name = %payload.file_name(),
                "Uploading image"
            );

            let request = PredictRequest::from_payload(index, payload);
            let error = match self.service.predict(request).await {
                Ok(prediction) => {
                    tracing::info!(
                        index = index,
                        attempts = attempts,
                        result = prediction.classification().label(),
                        confidence = prediction.confidence().value(),
                        "Prediction succeeded"
                    );
                    return UploadResult {
                        index,
                        attempts,
                        outcome: ItemOutcome::Success { prediction },
                    };
                }
                Err(e) => e,
            };

            tracing::warn!(
                index = index,
                attempt = attempts,
                retries_left = retries_left,
                error = %error,
                "Upload attempt failed"
            );

            if retries_left == 0 {
                let message = error
                    .server_message()
                    .map(str::to_string)
                    .unwrap_or_else(|| fallback_message(index));
                tracing::error!(
                    index = index,
                    attempts = attempts,
                    message = %message,
                    "Upload failed after retries"
                );
                return UploadResult {
                    index,
                    attempts,
                    outcome: ItemOutcome::Failure { message },
                };
            }
            retries_left -= 1;

            let delay = self.policy.backoff.delay(attempts);
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::batch::ImageFormat;
    use crate::infrastructure::adapters::{FakePredictionClient, FakeReply};

    fn payload(name: &str) -> ImagePayload {
        ImagePayload::new(name, ImageFormat::Png, vec![0x89, b'P']).unwrap()
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<ItemUpdate>) -> Vec<ItemUpdate> {
        let mut updates = Vec::new();
        while let Ok(update) = rx.try_recv() {
            updates.push(update);
        }
        updates
    }

    #[test]
    fn test_backoff_delays() {
        let base = Duration::from_millis(100);
        assert_eq!(Backoff::None.delay(3), Duration::ZERO);
        assert_eq!(Backoff::Fixed(base).delay(2), base);
        assert_eq!(Backoff::Exponential(base).delay(1), base);
        assert_eq!(Backoff::Exponential(base).delay(3), Duration::from_millis(400));
    }

    #[tokio::test]
    async fn test_three_transport_failures_end_in_fallback_failure() {
        let client = Arc::new(FakePredictionClient::new());
        client.script(
            "a.png",
            vec![
                FakeReply::network_error(),
                FakeReply::network_error(),
                FakeReply::network_error(),
                FakeReply::negative(),
            ],
        );
        let uploader = RetryingUploader::new(client.clone(), RetryPolicy::default());
        let (tx, mut rx) = mpsc::unbounded_channel();

        let result = uploader.upload(4, &payload("a.png"), tx).await;

        assert_eq!(result.attempts, 3);
        assert_eq!(client.calls("a.png"), 3);
        assert_eq!(
            result.outcome,
            ItemOutcome::Failure {
                message: "Failed to upload image 5.".to_string()
            }
        );

        let updates = drain(&mut rx);
        let attempts = updates
            .iter()
            .filter(|u| matches!(u, ItemUpdate::Attempt { .. }))
            .count();
        assert_eq!(attempts, 3);
        assert!(updates.contains(&ItemUpdate::Progress {
            index: 4,
            progress: Progress::SENT
        }));
    }

    #[tokio::test]
    async fn test_success_on_third_attempt() {
        let client = Arc::new(FakePredictionClient::new());
        client.script(
            "b.png",
            vec![
                FakeReply::network_error(),
                FakeReply::rejected(Some("busy")),
                FakeReply::positive(Some([1.0, 2.0, 3.0, 4.0])),
            ],
        );
        let uploader = RetryingUploader::new(client.clone(), RetryPolicy::default());
        let (tx, _rx) = mpsc::unbounded_channel();

        let result = uploader.upload(0, &payload("b.png"), tx).await;

        assert_eq!(result.attempts, 3);
        let prediction = result.outcome.prediction().expect("success");
        assert!(prediction.is_positive());
    }

    #[tokio::test]
    async fn test_server_message_preferred_over_fallback() {
        let client = Arc::new(FakePredictionClient::new());
        client.script(
            "c.png",
            vec![
                FakeReply::network_error(),
                FakeReply::network_error(),
                FakeReply::service_error(500, Some("Failed to connect to prediction server.")),
            ],
        );
        let uploader = RetryingUploader::new(client, RetryPolicy::default());
        let (tx, _rx) = mpsc::unbounded_channel();

        let result = uploader.upload(0, &payload("c.png"), tx).await;

        assert_eq!(
            result.outcome.error_message(),
            Some("Failed to connect to prediction server.")
        );
    }

    #[tokio::test]
    async fn test_no_retry_budget() {
        let client = Arc::new(FakePredictionClient::new());
        client.script("d.png", vec![FakeReply::network_error()]);
        let policy = RetryPolicy {
            max_retries: 0,
            backoff: Backoff::None,
        };
        let uploader = RetryingUploader::new(client.clone(), policy);
        let (tx, _rx) = mpsc::unbounded_channel();

        let result = uploader.upload(0, &payload("d.png"), tx).await;
        assert_eq!(result.attempts, 1);
        assert_eq!(client.calls("d.png"), 1);
    }
}
