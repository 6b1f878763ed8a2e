//! Batch Context - Value Objects

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 批次唯一标识
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BatchRunId(Uuid);

impl BatchRunId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for BatchRunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for BatchRunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 图像格式（只接受 JPEG / PNG）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    Jpeg,
    Png,
}

impl ImageFormat {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "png" => Some(Self::Png),
            _ => None,
        }
    }

    /// 根据文件头魔数识别格式
    pub fn from_magic(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
            Some(Self::Jpeg)
        } else if bytes.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]) {
            Some(Self::Png)
        } else {
            None
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
        }
    }
}

/// 待上传的图像文件
///
/// 不变量:
/// - file_name 不可为空
/// - data 已通过上游校验（格式与大小）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePayload {
    file_name: String,
    format: ImageFormat,
    data: Vec<u8>,
}

impl ImagePayload {
    pub fn new(
        file_name: impl Into<String>,
        format: ImageFormat,
        data: Vec<u8>,
    ) -> Result<Self, &'static str> {
        let file_name = file_name.into();
        if file_name.is_empty() {
            return Err("文件名不能为空");
        }
        Ok(Self {
            file_name,
            format,
            data,
        })
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn format(&self) -> ImageFormat {
        self.format
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }
}

/// 上传进度（百分比）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Progress(u8);

impl Progress {
    pub const NONE: Progress = Progress(0);
    /// 请求已发出
    pub const SENT: Progress = Progress(50);
    pub const DONE: Progress = Progress(100);

    /// 超过 100 的值截断为 100
    pub fn new(percent: u8) -> Self {
        Self(percent.min(100))
    }

    pub fn percent(&self) -> u8 {
        self.0
    }

    pub fn is_done(&self) -> bool {
        self.0 >= 100
    }
}

impl std::fmt::Display for Progress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}%", self.0)
    }
}

/// 分类结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    /// 检出结核
    Positive,
    /// 未检出
    Negative,
}

impl Classification {
    pub const POSITIVE_LABEL: &'static str = "has tuberculosis";
    pub const NEGATIVE_LABEL: &'static str = "no tuberculosis";

    /// 解析预测服务返回的 `result` 字段
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            Self::POSITIVE_LABEL => Some(Self::Positive),
            Self::NEGATIVE_LABEL => Some(Self::Negative),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Positive => Self::POSITIVE_LABEL,
            Self::Negative => Self::NEGATIVE_LABEL,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Positive => "Has Tuberculosis",
            Self::Negative => "No Tuberculosis",
        }
    }
}

/// 置信度，取值 [0, 1]
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Confidence(f64);

impl Confidence {
    pub fn new(value: f64) -> Result<Self, &'static str> {
        if !value.is_finite() || !(0.0..=1.0).contains(&value) {
            return Err("置信度必须在 [0, 1] 之间");
        }
        Ok(Self(value))
    }

    /// 截断到 [0, 1]，NaN 视为 0
    pub fn saturating(value: f64) -> Self {
        if value.is_nan() {
            return Self(0.0);
        }
        Self(value.clamp(0.0, 1.0))
    }

    pub fn value(&self) -> f64 {
        self.0
    }

    pub fn as_percent(&self) -> f64 {
        self.0 * 100.0
    }
}

/// 边界框，原图像素坐标 (x1, y1) 左上，(x2, y2) 右下
///
/// 角点顺序颠倒时按 min/max 归一化
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl BoundingBox {
    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Result<Self, &'static str> {
        if ![x1, y1, x2, y2].iter().all(|v| v.is_finite()) {
            return Err("边界框坐标必须为有限数值");
        }
        Ok(Self {
            x1: x1.min(x2),
            y1: y1.min(y2),
            x2: x1.max(x2),
            y2: y1.max(y2),
        })
    }

    pub fn from_array(coords: [f64; 4]) -> Result<Self, &'static str> {
        Self::new(coords[0], coords[1], coords[2], coords[3])
    }

    pub fn width(&self) -> f64 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> f64 {
        self.y2 - self.y1
    }
}

impl std::fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{:.2}, {:.2}, {:.2}, {:.2}]",
            self.x1, self.y1, self.x2, self.y2
        )
    }
}

/// 单张图像的预测结果，创建后不可变
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    classification: Classification,
    confidence: Confidence,
    bounding_box: Option<BoundingBox>,
}

impl Prediction {
    pub fn new(
        classification: Classification,
        confidence: Confidence,
        bounding_box: Option<BoundingBox>,
    ) -> Self {
        Self {
            classification,
            confidence,
            bounding_box,
        }
    }

    pub fn classification(&self) -> Classification {
        self.classification
    }

    pub fn confidence(&self) -> Confidence {
        self.confidence
    }

    pub fn bounding_box(&self) -> Option<&BoundingBox> {
        self.bounding_box.as_ref()
    }

    pub fn is_positive(&self) -> bool {
        self.classification == Classification::Positive
    }
}
