//! Per-style frame plans.
//!
//! Every style is a pure function of (text, style, frame context) that
//! produces an ordered list of text draws. Later draws land on top.

use std::f64::consts::TAU;

use crate::catalog::{AnimationKind, StyleDescriptor};
use crate::color::Color;
use crate::error::{AnimError, AnimResult};
use crate::request::{CanvasSize, RenderRequest};
use crate::rng::XorShift64;
use crate::text_metrics::{TextMetrics, TextOrigin};

pub const BOUNCE_AMPLITUDE_PX: f64 = 20.0;

pub const MATRIX_STEP_X: u32 = 20;
pub const MATRIX_STEP_Y: u32 = 30;
pub const MATRIX_LIT_PROBABILITY: f64 = 0.10;
pub const MATRIX_GLYPH_SIZE: u32 = 16;
pub const MATRIX_ALPHABET: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ@#$%&*+=<>";

/// Glow offsets in drawing order; the tightest ring is drawn last.
pub const NEON_OFFSETS: [i32; 3] = [3, 2, 1];
pub const NEON_CORE_COLOR: Color = Color::WHITE;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameContext {
    pub frame_index: u32,
    pub total_frames: u32,
    pub fps: u32,
    pub canvas: CanvasSize,
    pub seed: u64,
}

impl FrameContext {
    pub fn for_request(request: &RenderRequest, frame_index: u32) -> Self {
        Self {
            frame_index,
            total_frames: request.total_frames(),
            fps: request.fps,
            canvas: request.canvas,
            seed: request.seed,
        }
    }

    fn validate(&self) -> AnimResult<()> {
        if self.total_frames == 0 {
            return Err(AnimError::invalid("total frame count must be at least 1"));
        }
        if self.frame_index >= self.total_frames {
            return Err(AnimError::invalid(format!(
                "frame index {} is out of range for {} frames",
                self.frame_index, self.total_frames
            )));
        }
        if self.fps == 0 {
            return Err(AnimError::invalid("fps must be > 0"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextDraw {
    pub text: String,
    pub origin: TextOrigin,
    pub color: Color,
    pub font_size: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FramePlan {
    pub canvas: CanvasSize,
    pub background: Color,
    pub draws: Vec<TextDraw>,
}

impl FramePlan {
    fn empty(canvas: CanvasSize, background: Color) -> Self {
        Self {
            canvas,
            background,
            draws: Vec::new(),
        }
    }

    fn push(&mut self, text: impl Into<String>, origin: TextOrigin, color: Color, font_size: u32) {
        self.draws.push(TextDraw {
            text: text.into(),
            origin,
            color,
            font_size,
        });
    }
}

/// Plans one frame. Exhaustive over [`AnimationKind`].
pub fn plan_frame(
    metrics: &TextMetrics,
    text: &str,
    style: &StyleDescriptor,
    ctx: &FrameContext,
) -> AnimResult<FramePlan> {
    ctx.validate()?;
    let mut plan = FramePlan::empty(ctx.canvas, style.background.opaque());
    if text.is_empty() {
        return Ok(plan);
    }

    let size = metrics.measure(text, style.font_size)?;
    let origin = TextMetrics::center_origin(ctx.canvas, size);

    match style.animation {
        AnimationKind::Typewriter => plan_typewriter(&mut plan, text, style, ctx, origin),
        AnimationKind::Bounce => plan_bounce(&mut plan, text, style, ctx, origin),
        AnimationKind::Matrix => plan_matrix(&mut plan, text, style, ctx, origin),
        AnimationKind::Rainbow => plan_rainbow(&mut plan, metrics, text, style, ctx, origin)?,
        AnimationKind::Neon => plan_neon(&mut plan, text, style, ctx, origin),
        AnimationKind::Fade => plan_fade(&mut plan, text, style, ctx, origin),
    }

    Ok(plan)
}

/// `floor(frame_index * len / (total - 1))`, clamped to `[0, len]`. The
/// last frame always shows the whole text.
pub fn typewriter_chars_shown(frame_index: u32, total_frames: u32, text_len: usize) -> usize {
    if frame_index.saturating_add(1) >= total_frames {
        return text_len;
    }
    let denominator = u64::from(total_frames.saturating_sub(1).max(1));
    let shown = u64::from(frame_index) * text_len as u64 / denominator;
    (shown as usize).min(text_len)
}

/// `round(20 * sin(2π * frame_index / fps))`; periodic with period `fps`.
pub fn bounce_offset(frame_index: u32, fps: u32) -> i32 {
    if fps == 0 {
        return 0;
    }
    let phase = f64::from(frame_index % fps) / f64::from(fps);
    (BOUNCE_AMPLITUDE_PX * (TAU * phase).sin()).round() as i32
}

/// `min(255, floor(255 * frame_index / (total / 2)))`.
pub fn fade_level(frame_index: u32, total_frames: u32) -> u8 {
    let half = f64::from(total_frames) / 2.0;
    if half <= 0.0 {
        return 255;
    }
    (255.0 * f64::from(frame_index) / half).floor().min(255.0) as u8
}

fn plan_typewriter(
    plan: &mut FramePlan,
    text: &str,
    style: &StyleDescriptor,
    ctx: &FrameContext,
    origin: TextOrigin,
) {
    let len = text.chars().count();
    let shown = typewriter_chars_shown(ctx.frame_index, ctx.total_frames, len);
    if shown == 0 {
        return;
    }
    let visible: String = text.chars().take(shown).collect();
    plan.push(visible, origin, style.primary_color(), style.font_size);
}

fn plan_bounce(
    plan: &mut FramePlan,
    text: &str,
    style: &StyleDescriptor,
    ctx: &FrameContext,
    origin: TextOrigin,
) {
    let offset = bounce_offset(ctx.frame_index, ctx.fps);
    plan.push(
        text,
        origin.offset(0, offset),
        style.primary_color(),
        style.font_size,
    );
}

/// Noise cells are drawn independently every frame: nothing persists or
/// falls between frames.
fn plan_matrix(
    plan: &mut FramePlan,
    text: &str,
    style: &StyleDescriptor,
    ctx: &FrameContext,
    origin: TextOrigin,
) {
    let mut rng = XorShift64::for_frame(ctx.seed, ctx.frame_index);
    let height = f64::from(ctx.canvas.height);

    for row in (0..ctx.canvas.height).step_by(MATRIX_STEP_Y as usize) {
        let green = (255.0 * (1.0 - f64::from(row) / height)).clamp(0.0, 255.0) as u8;
        for column in (0..ctx.canvas.width).step_by(MATRIX_STEP_X as usize) {
            if rng.next_unit() >= MATRIX_LIT_PROBABILITY {
                continue;
            }
            let glyph = MATRIX_ALPHABET[rng.next_bounded(MATRIX_ALPHABET.len() - 1)] as char;
            plan.push(
                glyph.to_string(),
                TextOrigin::new(column as i32, row as i32),
                Color::rgb(0, green, 0),
                MATRIX_GLYPH_SIZE,
            );
        }
    }

    plan.push(text, origin, style.primary_color(), style.font_size);
}

fn plan_rainbow(
    plan: &mut FramePlan,
    metrics: &TextMetrics,
    text: &str,
    style: &StyleDescriptor,
    ctx: &FrameContext,
    origin: TextOrigin,
) -> AnimResult<()> {
    let frame = ctx.frame_index as usize;
    for (index, (byte_offset, character)) in text.char_indices().enumerate() {
        let prefix = metrics.measure(&text[..byte_offset], style.font_size)?;
        plan.push(
            character.to_string(),
            origin.offset(prefix.width as i32, 0),
            style.color_at(frame + index),
            style.font_size,
        );
    }
    Ok(())
}

fn plan_neon(
    plan: &mut FramePlan,
    text: &str,
    style: &StyleDescriptor,
    ctx: &FrameContext,
    origin: TextOrigin,
) {
    let glow = style.color_at(ctx.frame_index as usize);
    for offset in NEON_OFFSETS {
        for (dx, dy) in [(-offset, -offset), (offset, -offset), (-offset, offset), (offset, offset)] {
            plan.push(text, origin.offset(dx, dy), glow, style.font_size);
        }
    }
    plan.push(text, origin, NEON_CORE_COLOR, style.font_size);
}

fn plan_fade(
    plan: &mut FramePlan,
    text: &str,
    style: &StyleDescriptor,
    ctx: &FrameContext,
    origin: TextOrigin,
) {
    let level = fade_level(ctx.frame_index, ctx.total_frames);
    let color = style
        .background
        .opaque()
        .lerp(style.primary_color(), f32::from(level) / 255.0);
    plan.push(text, origin, color, style.font_size);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::StyleCatalog;

    fn style(key: &str) -> StyleDescriptor {
        StyleCatalog::builtin().get(key).expect("built-in").clone()
    }

    fn ctx(frame_index: u32, total_frames: u32, fps: u32) -> FrameContext {
        FrameContext {
            frame_index,
            total_frames,
            fps,
            canvas: CanvasSize::default(),
            seed: 0,
        }
    }

    #[test]
    fn typewriter_scenario_hello() {
        let shown: Vec<usize> = (0..20).map(|i| typewriter_chars_shown(i, 20, 5)).collect();
        assert_eq!(shown[0], 0);
        assert_eq!(shown[19], 5);
        assert!(shown.windows(2).all(|pair| pair[0] <= pair[1]));
    }

    #[test]
    fn typewriter_single_frame_shows_everything() {
        assert_eq!(typewriter_chars_shown(0, 1, 7), 7);
    }

    #[test]
    fn bounce_starts_at_rest_and_peaks_at_quarter_period() {
        assert_eq!(bounce_offset(0, 20), 0);
        assert_eq!(bounce_offset(5, 20), 20);
        assert_eq!(bounce_offset(15, 20), -20);
        assert_eq!(bounce_offset(20, 20), 0);
    }

    #[test]
    fn fade_matches_ramp_to_full_at_half_duration() {
        assert_eq!(fade_level(0, 60), 0);
        assert_eq!(fade_level(15, 60), 127);
        assert_eq!(fade_level(30, 60), 255);
        assert_eq!(fade_level(59, 60), 255);
    }

    #[test]
    fn empty_text_plans_background_only() {
        let metrics = TextMetrics::builtin();
        for kind_key in ["typewriter", "bounce", "matrix", "rainbow", "neon", "fade"] {
            let plan = plan_frame(&metrics, "", &style(kind_key), &ctx(3, 20, 20))
                .expect("plan should succeed");
            assert!(plan.draws.is_empty(), "{kind_key} drew on empty text");
        }
    }

    #[test]
    fn out_of_range_frame_is_rejected() {
        let metrics = TextMetrics::builtin();
        let error = plan_frame(&metrics, "Hi", &style("bounce"), &ctx(20, 20, 20))
            .expect_err("frame 20 of 20 is out of range");
        assert!(matches!(error, AnimError::InvalidRequest(_)));
        let error = plan_frame(&metrics, "Hi", &style("bounce"), &ctx(0, 0, 20))
            .expect_err("zero frames is invalid");
        assert!(matches!(error, AnimError::InvalidRequest(_)));
    }

    #[test]
    fn neon_draws_twelve_glow_passes_then_white_core() {
        let metrics = TextMetrics::builtin();
        let plan = plan_frame(&metrics, "Glow", &style("neon"), &ctx(4, 20, 20))
            .expect("plan should succeed");
        assert_eq!(plan.draws.len(), 13);
        let core = plan.draws.last().expect("core draw");
        assert_eq!(core.color, NEON_CORE_COLOR);
        let glow = style("neon").color_at(4);
        assert!(plan.draws[..12].iter().all(|draw| draw.color == glow));
        let first = &plan.draws[0];
        assert_eq!(first.origin, core.origin.offset(-3, -3));
    }

    #[test]
    fn matrix_rain_fades_with_row_and_ends_with_text() {
        let metrics = TextMetrics::builtin();
        let plan = plan_frame(&metrics, "Neo", &style("matrix"), &ctx(2, 20, 20))
            .expect("plan should succeed");
        let (rain, text) = plan.draws.split_at(plan.draws.len() - 1);
        assert_eq!(text[0].text, "Neo");
        assert!(!rain.is_empty());
        for cell in rain {
            assert_eq!(cell.font_size, MATRIX_GLYPH_SIZE);
            assert_eq!(cell.origin.x % MATRIX_STEP_X as i32, 0);
            assert_eq!(cell.origin.y % MATRIX_STEP_Y as i32, 0);
            let expected = (255.0 * (1.0 - cell.origin.y as f64 / 400.0)) as u8;
            assert_eq!(cell.color, Color::rgb(0, expected, 0));
        }
    }
}
