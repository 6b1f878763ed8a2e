//! Configuration Loader
//!
//! 实现多源配置加载与合并逻辑
//!
//! 优先级（从高到低）：
//! 1. 环境变量
//! 2. 配置文件（tbdetect.toml）
//! 3. 默认值

use config::{Config, ConfigError as ConfigCrateError, Environment, File};
use std::path::Path;
use thiserror::Error;

use super::types::AppConfig;

/// 配置加载错误
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

impl From<ConfigCrateError> for ConfigError {
    fn from(err: ConfigCrateError) -> Self {
        ConfigError::LoadError(err.to_string())
    }
}

/// 配置文件搜索路径
const CONFIG_FILE_NAMES: &[&str] = &["tbdetect", "tbdetect.local"];

/// 加载应用配置
///
/// 按优先级从高到低合并配置：
/// 1. 环境变量（前缀 `TBDETECT_`，层级分隔符 `__`）
/// 2. 配置文件（tbdetect.toml 或 tbdetect.local.toml）
/// 3. 默认值
///
/// # 环境变量示例
/// - `TBDETECT_ENDPOINT__URL=http://inference:5000/api/images/upload`
/// - `TBDETECT_ENDPOINT__MAX_RETRIES=4`
/// - `TBDETECT_BATCH__CONCURRENCY=5`
/// - `TBDETECT_RENDER__ENABLED=false`
pub fn load_config() -> Result<AppConfig, ConfigError> {
    load_config_from_path(None)
}

/// 从指定路径加载配置
///
/// # 参数
/// - `config_path` - 可选的配置文件路径，如果为 None 则使用默认搜索路径
pub fn load_config_from_path(config_path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let mut builder = Config::builder();

    // 1. 默认值（最低优先级）
    builder = builder
        .set_default("endpoint.url", "http://localhost:5000/api/images/upload")?
        .set_default("endpoint.timeout_secs", 60)?
        .set_default("endpoint.max_retries", 2)?
        .set_default("endpoint.backoff", "none")?
        .set_default("endpoint.backoff_ms", 500)?
        .set_default("endpoint.field_name", "image")?
        .set_default("batch.max_items", 10)?
        .set_default("batch.concurrency", 3)?
        .set_default("batch.max_file_size", 5 * 1024 * 1024)?
        .set_default("render.enabled", true)?
        .set_default("render.output_dir", "data/annotated")?
        .set_default("render.display_width", 512)?
        .set_default("render.line_width", 2)?
        .set_default("render.positive_color", "#d32f2f")?
        .set_default("render.negative_color", "#28a745")?
        .set_default("log.level", "info")?
        .set_default("log.json", false)?;

    // 2. 配置文件
    if let Some(path) = config_path {
        builder = builder.add_source(File::from(path).required(true));
    } else {
        for name in CONFIG_FILE_NAMES {
            builder = builder.add_source(File::with_name(name).required(false));
        }
    }

    // 3. 环境变量（最高优先级）
    // 例如: TBDETECT_ENDPOINT__URL=http://inference:5000/api/images/upload
    builder = builder.add_source(
        Environment::with_prefix("TBDETECT")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder.build()?;

    let app_config: AppConfig = config.try_deserialize().map_err(|e| {
        ConfigError::ParseError(format!("Failed to deserialize config: {}", e))
    })?;

    validate_config(&app_config)?;

    Ok(app_config)
}

/// 验证配置有效性
fn validate_config(config: &AppConfig) -> Result<(), ConfigError> {
    if config.endpoint.url.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "Endpoint URL cannot be empty".to_string(),
        ));
    }

    if config.endpoint.field_name.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "Upload field name cannot be empty".to_string(),
        ));
    }

    if config.endpoint.timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "Endpoint timeout cannot be 0".to_string(),
        ));
    }

    if config.batch.concurrency == 0 {
        return Err(ConfigError::ValidationError(
            "Batch concurrency must be at least 1".to_string(),
        ));
    }

    if config.batch.max_items == 0 {
        return Err(ConfigError::ValidationError(
            "Batch max_items must be at least 1".to_string(),
        ));
    }

    if config.batch.max_file_size == 0 {
        return Err(ConfigError::ValidationError(
            "Max file size cannot be 0".to_string(),
        ));
    }

    if config.render.enabled {
        if config.render.display_width == 0 || config.render.line_width == 0 {
            return Err(ConfigError::ValidationError(
                "Render display_width and line_width must be positive".to_string(),
            ));
        }
        for color in [&config.render.positive_color, &config.render.negative_color] {
            if !is_hex_color(color) {
                return Err(ConfigError::ValidationError(format!(
                    "Invalid color: {}",
                    color
                )));
            }
        }
    }

    Ok(())
}

/// `#rrggbb` 或 `rrggbb`
fn is_hex_color(value: &str) -> bool {
    let digits = value.trim().trim_start_matches('#');
    digits.len() == 6 && digits.chars().all(|c| c.is_ascii_hexdigit())
}

/// 序列化为 TOML（`tbdetect config` 输出）
pub fn to_toml(config: &AppConfig) -> Result<String, ConfigError> {
    toml::to_string_pretty(config).map_err(|e| ConfigError::ParseError(e.to_string()))
}

/// 打印配置信息（用于启动时日志）
pub fn print_config(config: &AppConfig) {
    tracing::info!("=== Application Configuration ===");
    tracing::info!("Endpoint: {}", config.endpoint.url);
    tracing::info!("Endpoint Timeout: {}s", config.endpoint.timeout_secs);
    tracing::info!(
        "Retries: {} (backoff: {:?}, {}ms)",
        config.endpoint.max_retries,
        config.endpoint.backoff,
        config.endpoint.backoff_ms
    );
    tracing::info!("Max Items: {}", config.batch.max_items);
    tracing::info!("Concurrency: {}", config.batch.concurrency);
    tracing::info!("Max File Size: {} bytes", config.batch.max_file_size);
    tracing::info!("Render Enabled: {}", config.render.enabled);
    if config.render.enabled {
        tracing::info!("Render Output: {:?}", config.render.output_dir);
    }
    tracing::info!("Log Level: {}", config.log.level);
    tracing::info!("=================================");
}
