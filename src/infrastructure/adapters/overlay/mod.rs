//! Overlay Adapter - RGBA 叠加层绘制

mod image_overlay;

pub use image_overlay::{encode_png, DisplayImage, ImageOverlay};
