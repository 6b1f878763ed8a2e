//! Overlay Surface Port - 标注绘制表面
//!
//! 与显示图像 1:1 对齐的叠加层，坐标为显示像素

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{OverlayRect, Size};

/// 绘制错误
#[derive(Debug, Error)]
pub enum OverlayError {
    #[error("Invalid color: {0}")]
    InvalidColor(String),

    #[error("Image error: {0}")]
    ImageError(String),
}

/// 描边颜色
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrokeColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl StrokeColor {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// 解析 `#rrggbb`
    pub fn from_hex(hex: &str) -> Result<Self, OverlayError> {
        let digits = hex.trim().trim_start_matches('#');
        if digits.len() != 6 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(OverlayError::InvalidColor(hex.to_string()));
        }
        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&digits[range], 16)
                .map_err(|_| OverlayError::InvalidColor(hex.to_string()))
        };
        Ok(Self::rgb(channel(0..2)?, channel(2..4)?, channel(4..6)?))
    }

    pub fn to_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// Overlay Surface Port
pub trait OverlaySurfacePort {
    /// 调整到显示尺寸并清空
    fn reset(&mut self, size: Size);

    /// 当前尺寸
    fn size(&self) -> Size;

    /// 绘制空心矩形
    fn stroke_rect(&mut self, rect: OverlayRect, color: StrokeColor, line_width: u32);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_from_hex() {
        assert_eq!(
            StrokeColor::from_hex("#d32f2f").unwrap(),
            StrokeColor::rgb(0xd3, 0x2f, 0x2f)
        );
        assert_eq!(StrokeColor::from_hex("28A745").unwrap().to_hex(), "#28a745");
        assert!(StrokeColor::from_hex("#12345").is_err());
        assert!(StrokeColor::from_hex("#zzzzzz").is_err());
    }
}
