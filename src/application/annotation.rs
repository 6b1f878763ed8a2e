//! Annotation Renderer - 在叠加层上绘制预测边界框
//!
//! 只负责决定画什么、画在哪，具体像素操作由 OverlaySurfacePort 完成

use crate::application::ports::{OverlayError, OverlaySurfacePort, StrokeColor};
use crate::domain::batch::{Classification, ItemOutcome};
use crate::domain::{scale_bounding_box, OverlayRect, RenderTarget};

/// 标注样式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnnotationStyle {
    pub positive: StrokeColor,
    pub negative: StrokeColor,
    pub line_width: u32,
}

impl AnnotationStyle {
    pub const POSITIVE_COLOR: StrokeColor = StrokeColor::rgb(0xd3, 0x2f, 0x2f);
    pub const NEGATIVE_COLOR: StrokeColor = StrokeColor::rgb(0x28, 0xa7, 0x45);

    pub fn from_hex(positive: &str, negative: &str, line_width: u32) -> Result<Self, OverlayError> {
        Ok(Self {
            positive: StrokeColor::from_hex(positive)?,
            negative: StrokeColor::from_hex(negative)?,
            line_width: line_width.max(1),
        })
    }
}

impl Default for AnnotationStyle {
    fn default() -> Self {
        Self {
            positive: Self::POSITIVE_COLOR,
            negative: Self::NEGATIVE_COLOR,
            line_width: 2,
        }
    }
}

/// 标注渲染器
#[derive(Debug, Clone, Default)]
pub struct AnnotationRenderer {
    style: AnnotationStyle,
}

impl AnnotationRenderer {
    pub fn new(style: AnnotationStyle) -> Self {
        Self { style }
    }

    pub fn style(&self) -> &AnnotationStyle {
        &self.style
    }

    pub fn color_for(&self, classification: Classification) -> StrokeColor {
        match classification {
            Classification::Positive => self.style.positive,
            Classification::Negative => self.style.negative,
        }
    }

    /// 重置叠加层并绘制边界框
    ///
    /// 失败项、无边界框或尺寸未知时只清空叠加层，返回 None
    pub fn render<S: OverlaySurfacePort + ?Sized>(
        &self,
        outcome: &ItemOutcome,
        target: &RenderTarget,
        surface: &mut S,
    ) -> Option<OverlayRect> {
        surface.reset(target.displayed);

        let prediction = outcome.prediction()?;
        let bbox = prediction.bounding_box()?;
        let rect = scale_bounding_box(bbox, target)?;

        surface.stroke_rect(
            rect,
            self.color_for(prediction.classification()),
            self.style.line_width,
        );
        Some(rect)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::batch::{BoundingBox, Confidence, Prediction};
    use crate::domain::Size;

    #[derive(Default)]
    struct RecordingSurface {
        size: Size,
        resets: usize,
        strokes: Vec<(OverlayRect, StrokeColor, u32)>,
    }

    impl OverlaySurfacePort for RecordingSurface {
        fn reset(&mut self, size: Size) {
            self.size = size;
            self.resets += 1;
            self.strokes.clear();
        }

        fn size(&self) -> Size {
            self.size
        }

        fn stroke_rect(&mut self, rect: OverlayRect, color: StrokeColor, line_width: u32) {
            self.strokes.push((rect, color, line_width));
        }
    }

    fn success(class: Classification, bbox: Option<[f64; 4]>) -> ItemOutcome {
        ItemOutcome::Success {
            prediction: Prediction::new(
                class,
                Confidence::new(0.9).unwrap(),
                bbox.map(|b| BoundingBox::from_array(b).unwrap()),
            ),
        }
    }

    fn half_size() -> RenderTarget {
        RenderTarget::new(Size::new(100.0, 200.0), Size::new(200.0, 400.0))
    }

    #[test]
    fn test_positive_box_is_scaled_and_red() {
        let renderer = AnnotationRenderer::default();
        let mut surface = RecordingSurface::default();

        let rect = renderer.render(
            &success(Classification::Positive, Some([10.0, 20.0, 110.0, 220.0])),
            &half_size(),
            &mut surface,
        );

        let expected = OverlayRect {
            x: 5.0,
            y: 10.0,
            width: 50.0,
            height: 100.0,
        };
        assert_eq!(rect, Some(expected));
        assert_eq!(surface.size, Size::new(100.0, 200.0));
        assert_eq!(
            surface.strokes,
            vec![(expected, AnnotationStyle::POSITIVE_COLOR, 2)]
        );
    }

    #[test]
    fn test_negative_box_is_green() {
        let renderer = AnnotationRenderer::default();
        let mut surface = RecordingSurface::default();
        renderer.render(
            &success(Classification::Negative, Some([0.0, 0.0, 20.0, 20.0])),
            &half_size(),
            &mut surface,
        );
        assert_eq!(surface.strokes[0].1, StrokeColor::from_hex("#28a745").unwrap());
    }

    #[test]
    fn test_nothing_drawn_without_box_or_on_failure() {
        let renderer = AnnotationRenderer::default();
        let mut surface = RecordingSurface::default();

        assert!(renderer
            .render(&success(Classification::Positive, None), &half_size(), &mut surface)
            .is_none());
        assert!(renderer
            .render(
                &ItemOutcome::Failure {
                    message: "Failed to upload image 1.".to_string()
                },
                &half_size(),
                &mut surface,
            )
            .is_none());
        assert!(surface.strokes.is_empty());
        assert_eq!(surface.resets, 2);
    }

    #[test]
    fn test_unknown_size_draws_nothing() {
        let renderer = AnnotationRenderer::default();
        let mut surface = RecordingSurface::default();
        let target = RenderTarget::new(Size::new(0.0, 0.0), Size::new(0.0, 0.0));

        let rect = renderer.render(
            &success(Classification::Positive, Some([10.0, 20.0, 110.0, 220.0])),
            &target,
            &mut surface,
        );
        assert!(rect.is_none());
        assert!(surface.strokes.is_empty());
    }
}
