use tiny_skia::{Pixmap, PremultipliedColorU8};

use crate::color::Color;
use crate::error::{AnimError, AnimResult};
use crate::frame::Frame;
use crate::styles::{FramePlan, TextDraw};
use crate::text_metrics::{GlyphMask, TextMetrics};

/// Executes a [`FramePlan`] into an owned RGB [`Frame`].
pub fn rasterize(metrics: &TextMetrics, plan: &FramePlan) -> AnimResult<Frame> {
    let mut pixmap = Pixmap::new(plan.canvas.width, plan.canvas.height).ok_or_else(|| {
        AnimError::render(format!(
            "failed to allocate pixmap {}x{}",
            plan.canvas.width, plan.canvas.height
        ))
    })?;
    let background = plan.background.opaque();
    pixmap.fill(tiny_skia::Color::from_rgba8(
        background.r,
        background.g,
        background.b,
        255,
    ));

    for draw in &plan.draws {
        paint_text(&mut pixmap, metrics, draw)?;
    }

    pixmap_to_frame(&pixmap)
}

fn paint_text(pixmap: &mut Pixmap, metrics: &TextMetrics, draw: &TextDraw) -> AnimResult<()> {
    if draw.text.is_empty() || draw.color.a == 0 {
        return Ok(());
    }
    for glyph in metrics.layout(&draw.text, draw.font_size)? {
        blend_glyph(
            pixmap,
            draw.origin.x + glyph.x,
            draw.origin.y + glyph.y,
            &glyph,
            draw.color,
        );
    }
    Ok(())
}

fn blend_glyph(pixmap: &mut Pixmap, x: i32, y: i32, glyph: &GlyphMask, color: Color) {
    let frame_width = pixmap.width() as i32;
    let frame_height = pixmap.height() as i32;

    for row in 0..glyph.height as i32 {
        let py = y + row;
        if py < 0 || py >= frame_height {
            continue;
        }

        for col in 0..glyph.width as i32 {
            let px = x + col;
            if px < 0 || px >= frame_width {
                continue;
            }

            let mask = glyph.coverage[(row * glyph.width as i32 + col) as usize];
            if mask == 0 {
                continue;
            }

            let alpha = ((u16::from(mask) * u16::from(color.a)) / 255) as u8;
            blend_pixel(pixmap, px as u32, py as u32, color, alpha);
        }
    }
}

fn blend_pixel(pixmap: &mut Pixmap, x: u32, y: u32, color: Color, alpha: u8) {
    if alpha == 0 {
        return;
    }
    let index = (y * pixmap.width() + x) as usize;
    let Some(pixel) = pixmap.pixels_mut().get_mut(index) else {
        return;
    };

    let alpha = u16::from(alpha);
    let inv_alpha = 255_u16 - alpha;
    let mix = |src: u8, dst: u8| -> u8 {
        ((u16::from(src) * alpha + u16::from(dst) * inv_alpha + 127) / 255) as u8
    };

    // The canvas is always opaque, so premultiplied and straight channels agree.
    let out_r = mix(color.r, pixel.red());
    let out_g = mix(color.g, pixel.green());
    let out_b = mix(color.b, pixel.blue());
    if let Some(out) = PremultipliedColorU8::from_rgba(out_r, out_g, out_b, 255) {
        *pixel = out;
    }
}

fn pixmap_to_frame(pixmap: &Pixmap) -> AnimResult<Frame> {
    let mut data = Vec::with_capacity(pixmap.width() as usize * pixmap.height() as usize * 3);
    for pixel in pixmap.pixels() {
        let straight = pixel.demultiply();
        data.extend_from_slice(&[straight.red(), straight.green(), straight.blue()]);
    }
    Frame::from_rgb(pixmap.width(), pixmap.height(), data)
}
