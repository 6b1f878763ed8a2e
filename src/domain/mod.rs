//! Domain Layer - 领域层
//!
//! - Batch Context: 批量上传与结果
//! - Geometry: 标注坐标缩放

pub mod batch;
pub mod geometry;

pub use geometry::{scale_bounding_box, OverlayRect, RenderTarget, Size};
