//! 应用层 - 用例编排
//!
//! 包含：
//! - ports: 六边形架构端口定义（PredictionService、OverlaySurface、AnnotationStorage、BatchSession）
//! - commands: 命令及处理器
//! - annotation: 边界框渲染
//! - error: 应用层错误定义

pub mod annotation;
pub mod commands;
pub mod error;
pub mod ports;

// Re-exports
pub use annotation::{AnnotationRenderer, AnnotationStyle};

pub use commands::{
    ClearBatch,
    RenderAnnotations,
    RenderAnnotationsResponse,
    RenderedPreview,
    StartBatch,
    StartBatchResponse,
    SubmitFiles,
    SubmitFilesResponse,
    // Handlers
    handlers::{
        ClearBatchHandler, RenderAnnotationsHandler, StartBatchHandler, SubmitFilesHandler,
    },
};

pub use error::ApplicationError;

pub use ports::{
    // Annotation storage
    AnnotationStorageError,
    AnnotationStoragePort,
    // Batch session
    BatchSessionPort,
    SessionError,
    // Overlay surface
    OverlayError,
    OverlaySurfacePort,
    StrokeColor,
    // Prediction service
    PredictError,
    PredictRequest,
    PredictionServicePort,
};
