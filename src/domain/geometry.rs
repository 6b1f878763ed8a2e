//! 标注几何计算
//!
//! 把原图像素坐标的边界框映射到显示尺寸，纯函数，不依赖绘制表面

use serde::{Deserialize, Serialize};

use super::batch::BoundingBox;

/// 像素尺寸，0 表示尚未知晓（图像还未布局）
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn is_known(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }
}

impl From<(u32, u32)> for Size {
    fn from((width, height): (u32, u32)) -> Self {
        Self::new(width as f64, height as f64)
    }
}

/// 单项的显示目标：显示尺寸 + 原始尺寸
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RenderTarget {
    pub displayed: Size,
    pub natural: Size,
}

impl RenderTarget {
    pub fn new(displayed: Size, natural: Size) -> Self {
        Self { displayed, natural }
    }

    /// 按最大显示宽度等比缩放（不放大）
    pub fn fit_width(natural: Size, max_width: u32) -> Self {
        if !natural.is_known() || max_width == 0 || natural.width <= max_width as f64 {
            return Self::new(natural, natural);
        }
        let ratio = max_width as f64 / natural.width;
        let displayed = Size::new(max_width as f64, (natural.height * ratio).round().max(1.0));
        Self::new(displayed, natural)
    }

    /// (scale_x, scale_y)，任一尺寸未知时返回 None
    pub fn scale(&self) -> Option<(f64, f64)> {
        if !self.displayed.is_known() || !self.natural.is_known() {
            return None;
        }
        Some((
            self.displayed.width / self.natural.width,
            self.displayed.height / self.natural.height,
        ))
    }
}

/// 显示坐标下的矩形
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OverlayRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// 把边界框缩放到显示坐标
pub fn scale_bounding_box(bbox: &BoundingBox, target: &RenderTarget) -> Option<OverlayRect> {
    let (scale_x, scale_y) = target.scale()?;
    Some(OverlayRect {
        x: bbox.x1 * scale_x,
        y: bbox.y1 * scale_y,
        width: bbox.width() * scale_x,
        height: bbox.height() * scale_y,
    })
}
