//! HTTP Prediction Client - 调用外部预测服务
//!
//! 实现 PredictionServicePort trait，通过 multipart 上传图像
//!
//! 外部预测 API:
//! POST {url}
//! Request: multipart/form-data, 字段 `image`（文件名 + MIME 类型）
//! Response:
//!   {"status": "success", "prediction": {"result": "has tuberculosis", "confidence": 0.93, "bbox": [x1, y1, x2, y2]}}
//!   {"status": "error", "message": "..."}

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use crate::application::ports::{PredictError, PredictRequest, PredictionServicePort};
use crate::domain::batch::{BoundingBox, Classification, Confidence, Prediction};

/// 上传接口响应体
#[derive(Debug, Deserialize)]
struct UploadResponse {
    status: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    prediction: Option<PredictionBody>,
}

/// 推理服务转发的预测结果
///
/// 推理服务失败时也可能被包装在 success 响应里，此时 `status` 为 "error"
#[derive(Debug, Deserialize)]
struct PredictionBody {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    result: Option<String>,
    #[serde(default)]
    confidence: Option<f64>,
    #[serde(default)]
    bbox: Option<Vec<f64>>,
}

/// HTTP 预测客户端配置
#[derive(Debug, Clone)]
pub struct HttpPredictionClientConfig {
    /// 上传接口完整 URL
    pub url: String,
    /// 请求超时时间（秒）
    pub timeout_secs: u64,
    /// multipart 文件字段名
    pub field_name: String,
}

impl Default for HttpPredictionClientConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:5000/api/images/upload".to_string(),
            timeout_secs: 60,
            field_name: "image".to_string(),
        }
    }
}

impl HttpPredictionClientConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

/// HTTP 预测客户端
pub struct HttpPredictionClient {
    client: Client,
    config: HttpPredictionClientConfig,
}

impl HttpPredictionClient {
    pub fn new(config: HttpPredictionClientConfig) -> Result<Self, PredictError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| PredictError::NetworkError(e.to_string()))?;

        Ok(Self { client, config })
    }

    pub fn url(&self) -> &str {
        &self.config.url
    }
}

#[async_trait]
impl PredictionServicePort for HttpPredictionClient {
    async fn predict(&self, request: PredictRequest) -> Result<Prediction, PredictError> {
        tracing::debug!(
            url = %self.config.url,
            index = request.index,
            file_name = %request.file_name,
            size = request.data.len(),
            "Sending prediction request"
        );

        let part = Part::bytes(request.data)
            .file_name(request.file_name.clone())
            .mime_str(request.format.mime_type())
            .map_err(|e| PredictError::InvalidResponse(format!("Invalid MIME type: {}", e)))?;
        let form = Form::new().part(self.config.field_name.clone(), part);

        let response = self
            .client
            .post(&self.config.url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    PredictError::Timeout
                } else if e.is_connect() {
                    PredictError::NetworkError(format!(
                        "Cannot connect to prediction service: {}",
                        e
                    ))
                } else {
                    PredictError::NetworkError(e.to_string())
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| PredictError::InvalidResponse(format!("Failed to read body: {}", e)))?;

        if !status.is_success() {
            let message = serde_json::from_str::<UploadResponse>(&body)
                .ok()
                .and_then(|r| r.message);
            return Err(PredictError::ServiceError {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: UploadResponse = serde_json::from_str(&body)
            .map_err(|e| PredictError::InvalidResponse(format!("Malformed body: {}", e)))?;

        let prediction = into_prediction(parsed)?;
        tracing::debug!(
            index = request.index,
            result = prediction.classification().label(),
            has_bbox = prediction.bounding_box().is_some(),
            "Prediction response parsed"
        );
        Ok(prediction)
    }

    async fn health_check(&self) -> bool {
        match self
            .client
            .head(&self.config.url)
            .timeout(Duration::from_secs(5))
            .send()
            .await
        {
            Ok(response) => !response.status().is_server_error(),
            Err(_) => false,
        }
    }
}

fn into_prediction(response: UploadResponse) -> Result<Prediction, PredictError> {
    match response.status.to_lowercase().as_str() {
        "success" => {}
        "error" => {
            return Err(PredictError::Rejected {
                message: response.message,
            })
        }
        other => {
            return Err(PredictError::InvalidResponse(format!(
                "Unknown status: {}",
                other
            )))
        }
    }

    let body = response
        .prediction
        .ok_or_else(|| PredictError::InvalidResponse("Missing prediction".to_string()))?;

    if body
        .status
        .as_deref()
        .map(|s| s.eq_ignore_ascii_case("error"))
        .unwrap_or(false)
    {
        return Err(PredictError::Rejected {
            message: body.message,
        });
    }

    let label = body
        .result
        .ok_or_else(|| PredictError::InvalidResponse("Missing result".to_string()))?;
    let classification = Classification::from_label(&label)
        .ok_or_else(|| PredictError::InvalidResponse(format!("Unknown result: {}", label)))?;

    let confidence = body
        .confidence
        .ok_or_else(|| PredictError::InvalidResponse("Missing confidence".to_string()))?;
    let confidence =
        Confidence::new(confidence).map_err(|e| PredictError::InvalidResponse(e.to_string()))?;

    let bounding_box = match body.bbox {
        None => None,
        Some(coords) => {
            let coords: [f64; 4] = coords.try_into().map_err(|v: Vec<f64>| {
                PredictError::InvalidResponse(format!("bbox must have 4 values, got {}", v.len()))
            })?;
            Some(
                BoundingBox::from_array(coords)
                    .map_err(|e| PredictError::InvalidResponse(e.to_string()))?,
            )
        }
    };

    Ok(Prediction::new(classification, confidence, bounding_box))
}
