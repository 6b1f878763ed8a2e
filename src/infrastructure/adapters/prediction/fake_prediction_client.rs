//! Fake Prediction Client - 用于测试和演练的预测客户端
//!
//! 按文件名预设响应序列，不实际调用预测服务

use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::application::ports::{PredictError, PredictRequest, PredictionServicePort};
use crate::domain::batch::{BoundingBox, Classification, Confidence, Prediction};

/// 预设的单次响应
#[derive(Debug, Clone)]
pub enum FakeReply {
    Success(Prediction),
    NetworkError,
    Rejected(Option<String>),
    ServiceError { status: u16, message: Option<String> },
}

impl FakeReply {
    pub fn negative() -> Self {
        Self::prediction(Classification::Negative, 0.95, None)
    }

    pub fn positive(bbox: Option<[f64; 4]>) -> Self {
        Self::prediction(Classification::Positive, 0.88, bbox)
    }

    pub fn network_error() -> Self {
        Self::NetworkError
    }

    pub fn rejected(message: Option<&str>) -> Self {
        Self::Rejected(message.map(str::to_string))
    }

    pub fn service_error(status: u16, message: Option<&str>) -> Self {
        Self::ServiceError {
            status,
            message: message.map(str::to_string),
        }
    }

    fn prediction(class: Classification, confidence: f64, bbox: Option<[f64; 4]>) -> Self {
        let confidence = Confidence::saturating(confidence);
        let bbox = bbox.and_then(|coords| BoundingBox::from_array(coords).ok());
        Self::Success(Prediction::new(class, confidence, bbox))
    }

    fn into_result(self) -> Result<Prediction, PredictError> {
        match self {
            FakeReply::Success(prediction) => Ok(prediction),
            FakeReply::NetworkError => Err(PredictError::NetworkError(
                "connection refused".to_string(),
            )),
            FakeReply::Rejected(message) => Err(PredictError::Rejected { message }),
            FakeReply::ServiceError { status, message } => {
                Err(PredictError::ServiceError { status, message })
            }
        }
    }
}

/// Fake Prediction Client
///
/// 未预设或预设用尽的文件返回默认响应（默认为阴性）
pub struct FakePredictionClient {
    scripts: DashMap<String, VecDeque<FakeReply>>,
    calls: DashMap<String, usize>,
    call_order: Mutex<Vec<String>>,
    default_reply: FakeReply,
    delay: Duration,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl FakePredictionClient {
    pub fn new() -> Self {
        Self {
            scripts: DashMap::new(),
            calls: DashMap::new(),
            call_order: Mutex::new(Vec::new()),
            default_reply: FakeReply::negative(),
            delay: Duration::ZERO,
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn with_default(mut self, reply: FakeReply) -> Self {
        self.default_reply = reply;
        self
    }

    /// 模拟推理延迟
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// 为文件名预设响应序列
    pub fn script(&self, file_name: &str, replies: Vec<FakeReply>) {
        self.scripts
            .insert(file_name.to_string(), replies.into_iter().collect());
    }

    pub fn calls(&self, file_name: &str) -> usize {
        self.calls.get(file_name).map(|c| *c).unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.calls.iter().map(|entry| *entry.value()).sum()
    }

    /// 按调用顺序记录的文件名
    pub fn call_order(&self) -> Vec<String> {
        self.call_order
            .lock()
            .map(|order| order.clone())
            .unwrap_or_default()
    }

    /// 观察到的最大同时在途请求数
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn next_reply(&self, file_name: &str) -> FakeReply {
        self.scripts
            .get_mut(file_name)
            .and_then(|mut replies| replies.pop_front())
            .unwrap_or_else(|| self.default_reply.clone())
    }
}

impl Default for FakePredictionClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PredictionServicePort for FakePredictionClient {
    async fn predict(&self, request: PredictRequest) -> Result<Prediction, PredictError> {
        *self.calls.entry(request.file_name.clone()).or_insert(0) += 1;
        if let Ok(mut order) = self.call_order.lock() {
            order.push(request.file_name.clone());
        }

        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        tracing::debug!(
            index = request.index,
            file_name = %request.file_name,
            in_flight = current,
            "FakePredictionClient: returning scripted reply"
        );

        if self.delay.is_zero() {
            tokio::task::yield_now().await;
        } else {
            tokio::time::sleep(self.delay).await;
        }

        let reply = self.next_reply(&request.file_name);
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        reply.into_result()
    }
}
