use std::iter::FusedIterator;

use tracing::debug;

use crate::error::AnimResult;
use crate::frame::Frame;
use crate::renderer::StyleRenderer;
use crate::request::RenderRequest;
use crate::styles::FrameContext;

/// Drives a [`StyleRenderer`] across every frame index of one request.
#[derive(Debug, Clone, Copy)]
pub struct FrameSequenceGenerator<'a> {
    renderer: &'a StyleRenderer,
    request: &'a RenderRequest,
    total_frames: u32,
}

impl<'a> FrameSequenceGenerator<'a> {
    /// Validates `request`; nothing is rendered until frames are pulled.
    pub fn new(renderer: &'a StyleRenderer, request: &'a RenderRequest) -> AnimResult<Self> {
        request.validate()?;
        Ok(Self {
            renderer,
            request,
            total_frames: request.total_frames(),
        })
    }

    pub fn total_frames(&self) -> u32 {
        self.total_frames
    }

    /// Lazy sequence starting at frame 0. Each call starts over.
    pub fn frames(&self) -> FrameSequence<'a> {
        FrameSequence {
            renderer: self.renderer,
            request: self.request,
            next_index: 0,
            total_frames: self.total_frames,
        }
    }

    pub fn render_frame(&self, frame_index: u32) -> AnimResult<Frame> {
        let ctx = FrameContext::for_request(self.request, frame_index);
        self.renderer
            .render(&self.request.text, &self.request.style, &ctx)
    }

    /// Renders the full sequence eagerly.
    #[tracing::instrument(skip(self), fields(style = %self.request.style.key, frames = self.total_frames))]
    pub fn generate(&self) -> AnimResult<Vec<Frame>> {
        self.frames().collect()
    }
}

/// Ordered, finite frame iterator. Yields exactly `total_frames` items
/// unless a frame fails, after which it is exhausted.
#[derive(Debug, Clone)]
pub struct FrameSequence<'a> {
    renderer: &'a StyleRenderer,
    request: &'a RenderRequest,
    next_index: u32,
    total_frames: u32,
}

impl Iterator for FrameSequence<'_> {
    type Item = AnimResult<Frame>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next_index >= self.total_frames {
            return None;
        }
        let frame_index = self.next_index;
        let ctx = FrameContext::for_request(self.request, frame_index);
        let result = self
            .renderer
            .render(&self.request.text, &self.request.style, &ctx);

        if result.is_err() {
            self.next_index = self.total_frames;
        } else {
            self.next_index += 1;
            if frame_index % self.request.fps.max(1) == 0 {
                debug!(
                    "rendered frame {}/{}",
                    frame_index + 1,
                    self.total_frames
                );
            }
        }
        Some(result)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.total_frames.saturating_sub(self.next_index) as usize;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for FrameSequence<'_> {}

impl FusedIterator for FrameSequence<'_> {}

/// Validates `request` and renders all of its frames in index order.
pub fn generate(renderer: &StyleRenderer, request: &RenderRequest) -> AnimResult<Vec<Frame>> {
    FrameSequenceGenerator::new(renderer, request)?.generate()
}
