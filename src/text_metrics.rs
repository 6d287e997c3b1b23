use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use fontdue::{Font, FontSettings};
use tracing::warn;

use crate::bitmap_font::{self, ADVANCE_COLUMNS, GLYPH_COLUMNS, GLYPH_ROWS};
use crate::catalog::FONT_SIZE_RANGE;
use crate::error::{AnimError, AnimResult};
use crate::request::CanvasSize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TextSize {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TextOrigin {
    pub x: i32,
    pub y: i32,
}

impl TextOrigin {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub const fn offset(self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }
}

/// Coverage mask of one glyph, positioned relative to the text's top-left.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlyphMask {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
    pub coverage: Vec<u8>,
}

#[derive(Clone)]
enum FontFace {
    Builtin,
    Truetype { font: Arc<Font>, label: String },
}

impl fmt::Debug for FontFace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Builtin => f.write_str("Builtin"),
            Self::Truetype { label, .. } => f.debug_tuple("Truetype").field(label).finish(),
        }
    }
}

/// Glyph measurement and layout. One instance serves every frame of a
/// request, so widths never change between frames.
#[derive(Debug, Clone)]
pub struct TextMetrics {
    face: FontFace,
}

impl Default for TextMetrics {
    fn default() -> Self {
        Self::builtin()
    }
}

impl TextMetrics {
    pub fn builtin() -> Self {
        Self {
            face: FontFace::Builtin,
        }
    }

    pub fn from_font_bytes(bytes: Vec<u8>, label: &str) -> AnimResult<Self> {
        let font = Font::from_bytes(bytes, FontSettings::default())
            .map_err(|error| AnimError::render(format!("failed to parse font {label}: {error}")))?;
        Ok(Self {
            face: FontFace::Truetype {
                font: Arc::new(font),
                label: label.to_owned(),
            },
        })
    }

    pub fn from_path(path: &Path) -> AnimResult<Self> {
        let bytes = fs::read(path).map_err(|error| {
            AnimError::render(format!("failed to read font file {}: {error}", path.display()))
        })?;
        Self::from_font_bytes(bytes, &path.display().to_string())
    }

    /// Loads `path` when given, falling back to the built-in glyph table if
    /// the font is missing or unreadable.
    pub fn load_or_builtin(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::builtin();
        };
        match Self::from_path(path) {
            Ok(metrics) => metrics,
            Err(error) => {
                warn!(font = %path.display(), %error, "font unavailable, using built-in glyphs");
                Self::builtin()
            }
        }
    }

    pub fn is_builtin(&self) -> bool {
        matches!(self.face, FontFace::Builtin)
    }

    pub fn font_label(&self) -> &str {
        match &self.face {
            FontFace::Builtin => "builtin-5x8",
            FontFace::Truetype { label, .. } => label,
        }
    }

    pub fn measure(&self, text: &str, font_size: u32) -> AnimResult<TextSize> {
        check_font_size(font_size)?;
        if text.is_empty() {
            return Ok(TextSize::default());
        }
        match &self.face {
            FontFace::Builtin => {
                let scale = bitmap_font::scale_for(font_size);
                let width = u32::try_from(text.chars().count())
                    .ok()
                    .and_then(|count| count.checked_mul(ADVANCE_COLUMNS * scale))
                    .ok_or_else(|| {
                        AnimError::render(format!("text is too wide to measure at {font_size}px"))
                    })?;
                Ok(TextSize {
                    width,
                    height: GLYPH_ROWS * scale,
                })
            }
            FontFace::Truetype { font, label } => {
                let px = font_size as f32;
                let (ascent, descent) = line_extent(font, px, label)?;
                let advance: f32 = text
                    .chars()
                    .map(|character| font.metrics(character, px).advance_width)
                    .sum();
                Ok(TextSize {
                    width: advance.ceil().max(0.0) as u32,
                    height: (ascent - descent).ceil().max(1.0) as u32,
                })
            }
        }
    }

    /// Integer top-left that centers `text` on `canvas`; negative when the
    /// text is larger than the canvas.
    pub fn center_origin(canvas: CanvasSize, text: TextSize) -> TextOrigin {
        let centered = |outer: u32, inner: u32| -> i32 {
            (i64::from(outer) - i64::from(inner)).div_euclid(2) as i32
        };
        TextOrigin {
            x: centered(canvas.width, text.width),
            y: centered(canvas.height, text.height),
        }
    }

    /// Rasterized glyphs of `text`, laid out left to right.
    pub fn layout(&self, text: &str, font_size: u32) -> AnimResult<Vec<GlyphMask>> {
        check_font_size(font_size)?;
        match &self.face {
            FontFace::Builtin => Ok(builtin_layout(text, font_size)),
            FontFace::Truetype { font, label } => truetype_layout(font, label, text, font_size),
        }
    }
}

fn check_font_size(font_size: u32) -> AnimResult<()> {
    if FONT_SIZE_RANGE.contains(&font_size) {
        return Ok(());
    }
    Err(AnimError::render(format!(
        "font size {font_size}px is outside {}..={}",
        FONT_SIZE_RANGE.start(),
        FONT_SIZE_RANGE.end()
    )))
}

fn line_extent(font: &Font, px: f32, label: &str) -> AnimResult<(f32, f32)> {
    let metrics = font.horizontal_line_metrics(px).ok_or_else(|| {
        AnimError::render(format!("font {label} has no horizontal line metrics"))
    })?;
    Ok((metrics.ascent, metrics.descent))
}

fn builtin_layout(text: &str, font_size: u32) -> Vec<GlyphMask> {
    let scale = bitmap_font::scale_for(font_size);
    let width = GLYPH_COLUMNS * scale;
    let height = GLYPH_ROWS * scale;

    text.chars()
        .enumerate()
        .filter(|(_, character)| *character != ' ')
        .map(|(index, character)| {
            let mut coverage = vec![0_u8; (width * height) as usize];
            for y in 0..height {
                for x in 0..width {
                    if bitmap_font::sample(character, x / scale, y / scale) {
                        coverage[(y * width + x) as usize] = 255;
                    }
                }
            }
            GlyphMask {
                x: (index as u32 * ADVANCE_COLUMNS * scale) as i32,
                y: 0,
                width,
                height,
                coverage,
            }
        })
        .collect()
}

fn truetype_layout(
    font: &Font,
    label: &str,
    text: &str,
    font_size: u32,
) -> AnimResult<Vec<GlyphMask>> {
    let px = font_size as f32;
    let (ascent, _) = line_extent(font, px, label)?;
    let mut pen_x = 0.0_f32;
    let mut glyphs = Vec::with_capacity(text.len());

    for character in text.chars() {
        let (metrics, bitmap) = font.rasterize(character, px);
        if metrics.width > 0 && metrics.height > 0 {
            let top = ascent - metrics.ymin as f32 - metrics.height as f32;
            glyphs.push(GlyphMask {
                x: (pen_x + metrics.xmin as f32).round() as i32,
                y: top.round() as i32,
                width: metrics.width as u32,
                height: metrics.height as u32,
                coverage: bitmap,
            });
        }
        pen_x += metrics.advance_width;
    }

    Ok(glyphs)
}
