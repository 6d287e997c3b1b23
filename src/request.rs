use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

use crate::catalog::StyleDescriptor;
use crate::error::{AnimError, AnimResult};

pub const FPS_RANGE: RangeInclusive<u32> = 15..=60;
pub const DURATION_RANGE: RangeInclusive<f32> = 1.0..=10.0;
pub const CANVAS_DIMENSION_RANGE: RangeInclusive<u32> = 2..=3840;
pub const MAX_TEXT_CHARS: usize = 100;

pub const DEFAULT_FPS: u32 = 20;
pub const DEFAULT_DURATION_SECONDS: f32 = 3.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CanvasSize {
    pub width: u32,
    pub height: u32,
}

impl CanvasSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn pixel_count(self) -> usize {
        self.width as usize * self.height as usize
    }

    pub fn validate(self) -> AnimResult<()> {
        for (label, value) in [("width", self.width), ("height", self.height)] {
            if !CANVAS_DIMENSION_RANGE.contains(&value) {
                return Err(AnimError::invalid(format!(
                    "canvas {label} must be in {}..={}, got {value}",
                    CANVAS_DIMENSION_RANGE.start(),
                    CANVAS_DIMENSION_RANGE.end()
                )));
            }
            if value % 2 != 0 {
                return Err(AnimError::invalid(format!(
                    "canvas {label} must be even for yuv420p output, got {value}"
                )));
            }
        }
        Ok(())
    }
}

impl Default for CanvasSize {
    fn default() -> Self {
        Self::new(800, 400)
    }
}

/// Parameters of one generation call.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderRequest {
    pub text: String,
    pub style: StyleDescriptor,
    pub fps: u32,
    pub duration_seconds: f32,
    pub canvas: CanvasSize,
    /// Seeds the matrix noise field. Frame `i` is a pure function of the
    /// request and `i`.
    pub seed: u64,
}

impl RenderRequest {
    pub fn new(text: impl Into<String>, style: StyleDescriptor) -> Self {
        Self {
            text: text.into(),
            style,
            fps: DEFAULT_FPS,
            duration_seconds: DEFAULT_DURATION_SECONDS,
            canvas: CanvasSize::default(),
            seed: 0,
        }
    }

    pub fn with_fps(mut self, fps: u32) -> Self {
        self.fps = fps;
        self
    }

    pub fn with_duration(mut self, duration_seconds: f32) -> Self {
        self.duration_seconds = duration_seconds;
        self
    }

    pub fn with_canvas(mut self, canvas: CanvasSize) -> Self {
        self.canvas = canvas;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// `round(fps * duration)`; zero means the request is unusable.
    pub fn total_frames(&self) -> u32 {
        let frames = (self.fps as f64 * self.duration_seconds as f64).round();
        if frames.is_finite() && frames > 0.0 {
            frames.min(u32::MAX as f64) as u32
        } else {
            0
        }
    }

    pub fn validate(&self) -> AnimResult<()> {
        self.style.validate()?;

        let text_chars = self.text.chars().count();
        if text_chars > MAX_TEXT_CHARS {
            return Err(AnimError::invalid(format!(
                "text must be at most {MAX_TEXT_CHARS} characters, got {text_chars}"
            )));
        }

        if !FPS_RANGE.contains(&self.fps) {
            return Err(AnimError::invalid(format!(
                "fps must be in {}..={}, got {}",
                FPS_RANGE.start(),
                FPS_RANGE.end(),
                self.fps
            )));
        }

        if !self.duration_seconds.is_finite() || !DURATION_RANGE.contains(&self.duration_seconds) {
            return Err(AnimError::invalid(format!(
                "duration must be in {}..={} seconds, got {}",
                DURATION_RANGE.start(),
                DURATION_RANGE.end(),
                self.duration_seconds
            )));
        }

        self.canvas.validate()?;

        if self.total_frames() == 0 {
            return Err(AnimError::invalid(format!(
                "request yields zero frames ({} fps x {} s)",
                self.fps, self.duration_seconds
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::StyleCatalog;

    fn typewriter() -> StyleDescriptor {
        StyleCatalog::builtin()
            .get("typewriter")
            .expect("built-in style")
            .clone()
    }

    #[test]
    fn minimum_bounds_produce_fifteen_frames() {
        let request = RenderRequest::new("Hi", typewriter())
            .with_fps(15)
            .with_duration(1.0);
        request.validate().expect("minimum bounds are valid");
        assert_eq!(request.total_frames(), 15);
    }

    #[test]
    fn total_frames_rounds_fractional_products() {
        let request = RenderRequest::new("Hi", typewriter())
            .with_fps(24)
            .with_duration(1.27);
        assert_eq!(request.total_frames(), 30);
    }

    #[test]
    fn zero_fps_or_duration_is_invalid() {
        let zero_fps = RenderRequest::new("Hi", typewriter()).with_fps(0);
        assert!(matches!(
            zero_fps.validate(),
            Err(AnimError::InvalidRequest(_))
        ));
        assert_eq!(zero_fps.total_frames(), 0);

        let zero_duration = RenderRequest::new("Hi", typewriter()).with_duration(0.0);
        assert!(matches!(
            zero_duration.validate(),
            Err(AnimError::InvalidRequest(_))
        ));
    }

    #[test]
    fn out_of_range_values_are_invalid() {
        let cases = [
            RenderRequest::new("Hi", typewriter()).with_fps(61),
            RenderRequest::new("Hi", typewriter()).with_duration(10.5),
            RenderRequest::new("Hi", typewriter()).with_duration(f32::NAN),
            RenderRequest::new("Hi", typewriter()).with_canvas(CanvasSize::new(801, 400)),
            RenderRequest::new("Hi", typewriter()).with_canvas(CanvasSize::new(0, 400)),
            RenderRequest::new("x".repeat(MAX_TEXT_CHARS + 1), typewriter()),
        ];
        for request in cases {
            assert!(
                matches!(request.validate(), Err(AnimError::InvalidRequest(_))),
                "expected invalid: {request:?}"
            );
        }
    }

    #[test]
    fn empty_text_is_a_valid_request() {
        RenderRequest::new("", typewriter())
            .validate()
            .expect("empty text renders background only");
    }
}
