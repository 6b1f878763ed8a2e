//! tbdetect - 胸部 X 光结核检测批量上传客户端
//!
//! 架构设计: DDD + Hexagonal Architecture
//!
//! 领域层 (domain/):
//! - Batch Context: 工作项队列、BatchRun 聚合、结果汇总
//! - Geometry: 边界框到显示坐标的缩放
//!
//! 应用层 (application/):
//! - Ports: 端口定义（PredictionService, OverlaySurface, AnnotationStorage, BatchSession）
//! - Commands: 命令处理器
//! - Annotation: 边界框渲染
//!
//! 基础设施层 (infrastructure/):
//! - Adapters: HTTP 预测客户端、文件加载、RGBA 叠加层、预览存储
//! - Memory: BatchSession 内存实现
//! - Worker: 有限重试上传与窗口调度
//! - Events: 批次进度事件发布

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::{load_config, AppConfig};
