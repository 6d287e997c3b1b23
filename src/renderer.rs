use crate::catalog::StyleDescriptor;
use crate::error::AnimResult;
use crate::frame::Frame;
use crate::raster::rasterize;
use crate::styles::{plan_frame, FrameContext, FramePlan};
use crate::text_metrics::TextMetrics;

/// Renders single frames for any style. Holds no per-frame state: frame `i`
/// depends only on its arguments.
#[derive(Debug, Clone, Default)]
pub struct StyleRenderer {
    metrics: TextMetrics,
}

impl StyleRenderer {
    pub fn new(metrics: TextMetrics) -> Self {
        Self { metrics }
    }

    pub fn metrics(&self) -> &TextMetrics {
        &self.metrics
    }

    pub fn plan(
        &self,
        text: &str,
        style: &StyleDescriptor,
        ctx: &FrameContext,
    ) -> AnimResult<FramePlan> {
        plan_frame(&self.metrics, text, style, ctx)
    }

    pub fn render(
        &self,
        text: &str,
        style: &StyleDescriptor,
        ctx: &FrameContext,
    ) -> AnimResult<Frame> {
        let plan = self.plan(text, style, ctx)?;
        rasterize(&self.metrics, &plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::StyleCatalog;
    use crate::color::Color;
    use crate::request::CanvasSize;

    fn ctx(frame_index: u32) -> FrameContext {
        FrameContext {
            frame_index,
            total_frames: 20,
            fps: 20,
            canvas: CanvasSize::new(320, 160),
            seed: 9,
        }
    }

    #[test]
    fn every_style_renders_canvas_sized_frames() {
        let renderer = StyleRenderer::default();
        for style in StyleCatalog::builtin().iter() {
            let frame = renderer
                .render("Hey", style, &ctx(10))
                .expect("render should succeed");
            assert_eq!(frame.canvas(), CanvasSize::new(320, 160), "{}", style.key);
        }
    }

    #[test]
    fn typewriter_first_frame_is_blank_and_last_is_not() {
        let renderer = StyleRenderer::default();
        let style = StyleCatalog::builtin().get("typewriter").expect("style");
        let first = renderer.render("Hey", style, &ctx(0)).expect("render");
        let last = renderer.render("Hey", style, &ctx(19)).expect("render");
        assert!(first.is_uniform(Color::BLACK));
        assert!(!last.is_uniform(Color::BLACK));
    }

    #[test]
    fn rendering_is_repeatable() {
        let renderer = StyleRenderer::default();
        let style = StyleCatalog::builtin().get("matrix").expect("style");
        let a = renderer.render("Neo", style, &ctx(7)).expect("render");
        let b = renderer.render("Neo", style, &ctx(7)).expect("render");
        assert_eq!(a, b);
    }
}
