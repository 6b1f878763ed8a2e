//! Prediction Service Port - 外部预测服务抽象
//!
//! 定义单张图像预测调用的抽象接口，具体实现在 infrastructure/adapters 层

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::batch::{ImageFormat, ImagePayload, Prediction};

/// 预测调用错误
///
/// 传输错误与服务端返回的业务错误区分开，但都走同一条重试路径
#[derive(Debug, Error)]
pub enum PredictError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Request timeout")]
    Timeout,

    /// 非 2xx 响应
    #[error("Service error: HTTP {status}")]
    ServiceError {
        status: u16,
        message: Option<String>,
    },

    /// 响应 `status: "error"`
    #[error("Prediction rejected: {}", .message.as_deref().unwrap_or("no message"))]
    Rejected { message: Option<String> },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl PredictError {
    /// 服务端返回的 `message` 字段（如果有）
    pub fn server_message(&self) -> Option<&str> {
        match self {
            PredictError::ServiceError { message, .. } | PredictError::Rejected { message } => {
                message.as_deref().filter(|m| !m.trim().is_empty())
            }
            _ => None,
        }
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, PredictError::NetworkError(_) | PredictError::Timeout)
    }
}

/// 预测请求
#[derive(Debug, Clone)]
pub struct PredictRequest {
    /// 批次内索引（用于日志和追踪）
    pub index: usize,
    pub file_name: String,
    pub format: ImageFormat,
    pub data: Vec<u8>,
}

impl PredictRequest {
    pub fn from_payload(index: usize, payload: &ImagePayload) -> Self {
        Self {
            index,
            file_name: payload.file_name().to_string(),
            format: payload.format(),
            data: payload.data().to_vec(),
        }
    }
}

/// Prediction Service Port
///
/// 外部预测服务的抽象接口
#[async_trait]
pub trait PredictionServicePort: Send + Sync {
    /// 上传单张图像并返回预测结果
    async fn predict(&self, request: PredictRequest) -> Result<Prediction, PredictError>;

    /// 检查预测服务是否可用
    async fn health_check(&self) -> bool {
        true // 默认实现
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_message() {
        let rejected = PredictError::Rejected {
            message: Some("No image file provided".to_string()),
        };
        assert_eq!(rejected.server_message(), Some("No image file provided"));

        let blank = PredictError::ServiceError {
            status: 500,
            message: Some("  ".to_string()),
        };
        assert_eq!(blank.server_message(), None);

        let network = PredictError::NetworkError("connection refused".to_string());
        assert_eq!(network.server_message(), None);
        assert!(network.is_transport());
    }
}
