//! Application Ports - 出站端口定义
//!
//! 定义应用层与基础设施层的抽象接口

mod annotation_storage;
mod batch_session;
mod overlay_surface;
mod prediction_service;

pub use annotation_storage::{AnnotationStorageError, AnnotationStoragePort};
pub use batch_session::{BatchSessionPort, SessionError};
pub use overlay_surface::{OverlayError, OverlaySurfacePort, StrokeColor};
pub use prediction_service::{PredictError, PredictRequest, PredictionServicePort};
