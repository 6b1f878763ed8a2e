//! Image Overlay - 基于 RGBA 图像的标注叠加层
//!
//! 实现 OverlaySurfacePort，并负责把原图缩放到显示尺寸后与叠加层合成

use image::imageops::{self, FilterType};
use image::{DynamicImage, GenericImageView, Rgba, RgbaImage};
use std::io::Cursor;

use crate::application::ports::{OverlayError, OverlaySurfacePort, StrokeColor};
use crate::domain::batch::ImagePayload;
use crate::domain::{OverlayRect, RenderTarget, Size};

/// 透明 RGBA 叠加层，与显示图像 1:1 对齐
#[derive(Debug, Clone)]
pub struct ImageOverlay {
    canvas: RgbaImage,
}

impl ImageOverlay {
    pub fn new(size: Size) -> Self {
        let mut overlay = Self {
            canvas: RgbaImage::new(0, 0),
        };
        overlay.reset(size);
        overlay
    }

    pub fn canvas(&self) -> &RgbaImage {
        &self.canvas
    }

    /// 把叠加层合成到已缩放的底图上
    pub fn composite_onto(&self, base: &RgbaImage) -> RgbaImage {
        let mut output = base.clone();
        imageops::overlay(&mut output, &self.canvas, 0, 0);
        output
    }

    fn put(&mut self, x: i64, y: i64, color: Rgba<u8>) {
        if x < 0 || y < 0 {
            return;
        }
        let (x, y) = (x as u32, y as u32);
        if x < self.canvas.width() && y < self.canvas.height() {
            self.canvas.put_pixel(x, y, color);
        }
    }
}

impl OverlaySurfacePort for ImageOverlay {
    fn reset(&mut self, size: Size) {
        let width = size.width.max(0.0).round() as u32;
        let height = size.height.max(0.0).round() as u32;
        self.canvas = RgbaImage::new(width, height);
    }

    fn size(&self) -> Size {
        Size::from(self.canvas.dimensions())
    }

    fn stroke_rect(&mut self, rect: OverlayRect, color: StrokeColor, line_width: u32) {
        let color = Rgba([color.r, color.g, color.b, 255]);
        let line = line_width.max(1) as i64;
        let width = self.canvas.width() as i64;
        let height = self.canvas.height() as i64;

        // f64 -> i64 转换是饱和的，巨大的坐标不会溢出
        let left = rect.x.round() as i64;
        let top = rect.y.round() as i64;
        let right = (rect.x + rect.width).round() as i64;
        let bottom = (rect.y + rect.height).round() as i64;

        // 描边以矩形边为中心
        let inner = line / 2;
        let outer = line - inner;

        // 循环范围限制在画布内，开销与画布大小相关而不是与矩形大小相关
        let x_range = left.saturating_sub(inner).max(0)..right.saturating_add(outer).min(width);
        let y_range = top.saturating_sub(inner).max(0)..bottom.saturating_add(outer).min(height);
        let on_canvas = |edge: i64, limit: i64| {
            edge.saturating_add(outer) > 0 && edge.saturating_sub(inner) < limit
        };

        for edge in [top, bottom] {
            if !on_canvas(edge, height) {
                continue;
            }
            for x in x_range.clone() {
                for offset in -inner..outer {
                    self.put(x, edge + offset, color);
                }
            }
        }
        for edge in [left, right] {
            if !on_canvas(edge, width) {
                continue;
            }
            for y in y_range.clone() {
                for offset in -inner..outer {
                    self.put(edge + offset, y, color);
                }
            }
        }
    }
}

/// 解码后的显示图像
pub struct DisplayImage {
    pub target: RenderTarget,
    pub image: RgbaImage,
}

impl DisplayImage {
    /// 解码并按最大显示宽度缩放
    pub fn from_payload(payload: &ImagePayload, max_width: u32) -> Result<Self, OverlayError> {
        let decoded = image::load_from_memory(payload.data())
            .map_err(|e| OverlayError::ImageError(format!("{}: {}", payload.file_name(), e)))?;
        Ok(Self::from_image(decoded, max_width))
    }

    pub fn from_image(decoded: DynamicImage, max_width: u32) -> Self {
        let natural = Size::from(decoded.dimensions());
        let target = RenderTarget::fit_width(natural, max_width);

        let image = if target.displayed == target.natural {
            decoded.to_rgba8()
        } else {
            imageops::resize(
                &decoded.to_rgba8(),
                target.displayed.width as u32,
                target.displayed.height as u32,
                FilterType::Triangle,
            )
        };

        Self { target, image }
    }
}

/// 编码为 PNG
pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>, OverlayError> {
    let mut buffer = Vec::new();
    DynamicImage::ImageRgba8(image.clone())
        .write_to(&mut Cursor::new(&mut buffer), image::ImageFormat::Png)
        .map_err(|e| OverlayError::ImageError(e.to_string()))?;
    Ok(buffer)
}
