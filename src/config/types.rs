//! Configuration Types
//!
//! 定义所有配置结构体

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// 应用主配置
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    /// 预测服务配置
    #[serde(default)]
    pub endpoint: EndpointConfig,

    /// 批次配置
    #[serde(default)]
    pub batch: BatchConfig,

    /// 标注渲染配置
    #[serde(default)]
    pub render: RenderConfig,

    /// 日志配置
    #[serde(default)]
    pub log: LogConfig,
}

/// 重试间隔类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BackoffKind {
    #[default]
    None,
    Fixed,
    Exponential,
}

/// 预测服务配置
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EndpointConfig {
    /// 上传接口 URL
    #[serde(default = "default_endpoint_url")]
    pub url: String,

    /// 单次请求超时时间（秒）
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// 首次失败后的最大重试次数
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default)]
    pub backoff: BackoffKind,

    /// 重试基础间隔（毫秒），backoff 为 none 时忽略
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,

    /// multipart 表单字段名
    #[serde(default = "default_field_name")]
    pub field_name: String,
}

fn default_endpoint_url() -> String {
    "http://localhost:5000/api/images/upload".to_string()
}

fn default_timeout() -> u64 {
    60
}

fn default_max_retries() -> u32 {
    2
}

fn default_backoff_ms() -> u64 {
    500
}

fn default_field_name() -> String {
    "image".to_string()
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            url: default_endpoint_url(),
            timeout_secs: default_timeout(),
            max_retries: default_max_retries(),
            backoff: BackoffKind::None,
            backoff_ms: default_backoff_ms(),
            field_name: default_field_name(),
        }
    }
}

/// 批次配置
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BatchConfig {
    /// 单批次最大图像数
    #[serde(default = "default_max_items")]
    pub max_items: usize,

    /// 同时在途的最大上传数
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// 单个文件最大大小（字节），默认 5MB
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
}

fn default_max_items() -> usize {
    10
}

fn default_concurrency() -> usize {
    3
}

fn default_max_file_size() -> u64 {
    5 * 1024 * 1024 // 5 MB
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_items: default_max_items(),
            concurrency: default_concurrency(),
            max_file_size: default_max_file_size(),
        }
    }
}

/// 标注渲染配置
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RenderConfig {
    /// 是否在批次完成后生成预览图
    #[serde(default = "default_render_enabled")]
    pub enabled: bool,

    /// 预览图输出目录
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// 最大显示宽度（像素），更宽的图像等比缩小
    #[serde(default = "default_display_width")]
    pub display_width: u32,

    #[serde(default = "default_line_width")]
    pub line_width: u32,

    /// 阳性边框颜色
    #[serde(default = "default_positive_color")]
    pub positive_color: String,

    /// 阴性边框颜色
    #[serde(default = "default_negative_color")]
    pub negative_color: String,
}

fn default_render_enabled() -> bool {
    true
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("data/annotated")
}

fn default_display_width() -> u32 {
    512
}

fn default_line_width() -> u32 {
    2
}

fn default_positive_color() -> String {
    "#d32f2f".to_string()
}

fn default_negative_color() -> String {
    "#28a745".to_string()
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            enabled: default_render_enabled(),
            output_dir: default_output_dir(),
            display_width: default_display_width(),
            line_width: default_line_width(),
            positive_color: default_positive_color(),
            negative_color: default_negative_color(),
        }
    }
}

/// 日志配置
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LogConfig {
    /// 日志级别
    #[serde(default = "default_log_level")]
    pub level: String,

    /// 是否启用 JSON 格式
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.endpoint.url, "http://localhost:5000/api/images/upload");
        assert_eq!(config.endpoint.max_retries, 2);
        assert_eq!(config.endpoint.backoff, BackoffKind::None);
        assert_eq!(config.batch.max_items, 10);
        assert_eq!(config.batch.concurrency, 3);
        assert_eq!(config.batch.max_file_size, 5 * 1024 * 1024);
        assert_eq!(config.render.line_width, 2);
    }

    #[test]
    fn test_backoff_kind_is_lowercase() {
        let config: EndpointConfig = toml::from_str("backoff = \"exponential\"").unwrap();
        assert_eq!(config.backoff, BackoffKind::Exponential);
        assert_eq!(config.timeout_secs, 60);
    }
}
