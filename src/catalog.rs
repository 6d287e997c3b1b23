use std::fmt;
use std::fs;
use std::ops::RangeInclusive;
use std::path::Path;
use std::str::FromStr;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use crate::color::Color;
use crate::error::{AnimError, AnimResult};

pub const FONT_SIZE_RANGE: RangeInclusive<u32> = 1..=512;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnimationKind {
    Typewriter,
    Bounce,
    Matrix,
    Rainbow,
    Neon,
    Fade,
}

impl AnimationKind {
    pub const ALL: [Self; 6] = [
        Self::Typewriter,
        Self::Bounce,
        Self::Matrix,
        Self::Rainbow,
        Self::Neon,
        Self::Fade,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Typewriter => "typewriter",
            Self::Bounce => "bounce",
            Self::Matrix => "matrix",
            Self::Rainbow => "rainbow",
            Self::Neon => "neon",
            Self::Fade => "fade",
        }
    }
}

impl fmt::Display for AnimationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnimationKind {
    type Err = AnimError;

    fn from_str(raw: &str) -> AnimResult<Self> {
        let normalized = raw.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == normalized)
            .ok_or_else(|| {
                AnimError::invalid(format!(
                    "unknown animation kind '{raw}' (expected one of: {})",
                    Self::ALL.map(Self::as_str).join(", ")
                ))
            })
    }
}

/// Immutable description of one named animation style.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StyleDescriptor {
    pub key: String,
    pub name: String,
    pub font_size: u32,
    pub colors: Vec<Color>,
    pub background: Color,
    pub animation: AnimationKind,
    /// Seconds per animation step. Kept for audio sync; rendering ignores it.
    pub per_frame_time_unit: f32,
}

impl StyleDescriptor {
    pub fn primary_color(&self) -> Color {
        self.colors.first().copied().unwrap_or(Color::WHITE)
    }

    /// Cycles through `colors`; `colors` is non-empty for every validated style.
    pub fn color_at(&self, index: usize) -> Color {
        if self.colors.is_empty() {
            return Color::WHITE;
        }
        self.colors[index % self.colors.len()]
    }

    pub fn validate(&self) -> AnimResult<()> {
        if self.key.trim().is_empty() {
            return Err(AnimError::invalid("style key cannot be empty"));
        }
        if self.name.trim().is_empty() {
            return Err(AnimError::invalid(format!(
                "style '{}': name cannot be empty",
                self.key
            )));
        }
        if !FONT_SIZE_RANGE.contains(&self.font_size) {
            return Err(AnimError::invalid(format!(
                "style '{}': font_size must be in {}..={}, got {}",
                self.key,
                FONT_SIZE_RANGE.start(),
                FONT_SIZE_RANGE.end(),
                self.font_size
            )));
        }
        if self.colors.is_empty() {
            return Err(AnimError::invalid(format!(
                "style '{}': colors must contain at least one color",
                self.key
            )));
        }
        if !self.per_frame_time_unit.is_finite() || self.per_frame_time_unit <= 0.0 {
            return Err(AnimError::invalid(format!(
                "style '{}': per_frame_time_unit must be a positive number",
                self.key
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct StyleEntry {
    key: String,
    name: String,
    font_size: u32,
    colors: Vec<Color>,
    background: Color,
    animation: String,
    #[serde(default = "default_time_unit")]
    per_frame_time_unit: f32,
}

fn default_time_unit() -> f32 {
    0.1
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct StyleFile {
    styles: Vec<StyleEntry>,
}

impl TryFrom<StyleEntry> for StyleDescriptor {
    type Error = AnimError;

    fn try_from(entry: StyleEntry) -> AnimResult<Self> {
        let animation = entry.animation.parse::<AnimationKind>().map_err(|error| {
            AnimError::invalid(format!("style '{}': {}", entry.key, error.detail()))
        })?;
        let descriptor = StyleDescriptor {
            key: entry.key.trim().to_ascii_lowercase(),
            name: entry.name,
            font_size: entry.font_size,
            colors: entry.colors,
            background: entry.background.opaque(),
            animation,
            per_frame_time_unit: entry.per_frame_time_unit,
        };
        descriptor.validate()?;
        Ok(descriptor)
    }
}

/// Read-only table of styles keyed by lowercase key.
#[derive(Debug, Clone, Default)]
pub struct StyleCatalog {
    styles: Vec<StyleDescriptor>,
}

impl StyleCatalog {
    /// The process-wide built-in table, built on first use.
    pub fn builtin() -> &'static StyleCatalog {
        static BUILTIN: OnceLock<StyleCatalog> = OnceLock::new();
        BUILTIN.get_or_init(|| StyleCatalog {
            styles: builtin_styles(),
        })
    }

    pub fn get(&self, name: &str) -> AnimResult<&StyleDescriptor> {
        let needle = name.trim();
        if needle.is_empty() {
            return Err(AnimError::invalid("style name cannot be empty"));
        }
        self.styles
            .iter()
            .find(|style| style.key.eq_ignore_ascii_case(needle))
            .or_else(|| {
                self.styles
                    .iter()
                    .find(|style| style.name.eq_ignore_ascii_case(needle))
            })
            .ok_or_else(|| {
                AnimError::invalid(format!(
                    "unknown style '{name}' (available: {})",
                    self.keys().join(", ")
                ))
            })
    }

    pub fn keys(&self) -> Vec<&str> {
        self.styles.iter().map(|style| style.key.as_str()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &StyleDescriptor> {
        self.styles.iter()
    }

    pub fn len(&self) -> usize {
        self.styles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.styles.is_empty()
    }

    /// Returns a new catalog with `overrides` replacing same-key entries and
    /// appending the rest. `self` is left untouched.
    pub fn extended_with(&self, overrides: Vec<StyleDescriptor>) -> StyleCatalog {
        let mut styles = self.styles.clone();
        for style in overrides {
            match styles.iter_mut().find(|existing| existing.key == style.key) {
                Some(existing) => *existing = style,
                None => styles.push(style),
            }
        }
        StyleCatalog { styles }
    }

    pub fn parse_style_file(contents: &str) -> AnimResult<Vec<StyleDescriptor>> {
        let file: StyleFile = serde_yaml::from_str(contents).map_err(|error| {
            let location = error
                .location()
                .map(|location| format!("line {}, column {}", location.line(), location.column()))
                .unwrap_or_else(|| "unknown location".to_owned());
            AnimError::invalid(format!("failed to parse style file at {location}: {error}"))
        })?;

        let mut seen = Vec::with_capacity(file.styles.len());
        let mut styles = Vec::with_capacity(file.styles.len());
        for entry in file.styles {
            let style = StyleDescriptor::try_from(entry)?;
            if seen.contains(&style.key) {
                return Err(AnimError::invalid(format!(
                    "duplicate style key '{}'",
                    style.key
                )));
            }
            seen.push(style.key.clone());
            styles.push(style);
        }
        Ok(styles)
    }

    pub fn load_style_file(path: &Path) -> AnimResult<Vec<StyleDescriptor>> {
        let contents = fs::read_to_string(path).map_err(|error| {
            AnimError::invalid(format!(
                "failed to read style file {}: {error}",
                path.display()
            ))
        })?;
        Self::parse_style_file(&contents).map_err(|error| {
            AnimError::invalid(format!("{}: {}", path.display(), error.detail()))
        })
    }
}

fn builtin_styles() -> Vec<StyleDescriptor> {
    let style = |key: &str,
                 name: &str,
                 font_size: u32,
                 colors: &[Color],
                 background: Color,
                 animation: AnimationKind,
                 per_frame_time_unit: f32| StyleDescriptor {
        key: key.to_owned(),
        name: name.to_owned(),
        font_size,
        colors: colors.to_vec(),
        background,
        animation,
        per_frame_time_unit,
    };

    vec![
        style(
            "typewriter",
            "Typewriter",
            48,
            &[Color::WHITE],
            Color::BLACK,
            AnimationKind::Typewriter,
            0.1,
        ),
        style(
            "bounce",
            "Bouncing Text",
            64,
            &[Color::rgb(255, 215, 0)],
            Color::rgb(25, 25, 112),
            AnimationKind::Bounce,
            0.05,
        ),
        style(
            "matrix",
            "Matrix Rain",
            48,
            &[Color::rgb(0, 255, 65)],
            Color::BLACK,
            AnimationKind::Matrix,
            0.05,
        ),
        style(
            "rainbow",
            "Rainbow Wave",
            64,
            &[
                Color::rgb(255, 0, 0),
                Color::rgb(255, 127, 0),
                Color::rgb(255, 255, 0),
                Color::rgb(0, 255, 0),
                Color::rgb(0, 0, 255),
                Color::rgb(75, 0, 130),
                Color::rgb(148, 0, 211),
            ],
            Color::rgb(20, 20, 20),
            AnimationKind::Rainbow,
            0.1,
        ),
        style(
            "neon",
            "Neon Glow",
            64,
            &[
                Color::rgb(255, 0, 255),
                Color::rgb(0, 255, 255),
                Color::rgb(255, 20, 147),
            ],
            Color::rgb(10, 10, 10),
            AnimationKind::Neon,
            0.05,
        ),
        style(
            "fade",
            "Simple Fade",
            64,
            &[Color::WHITE],
            Color::BLACK,
            AnimationKind::Fade,
            0.1,
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_catalog_covers_every_kind() {
        let catalog = StyleCatalog::builtin();
        for kind in AnimationKind::ALL {
            assert!(
                catalog.iter().any(|style| style.animation == kind),
                "no built-in style for {kind}"
            );
        }
        for style in catalog.iter() {
            style.validate().expect("built-in styles should validate");
        }
    }

    #[test]
    fn lookup_matches_key_or_display_name() {
        let catalog = StyleCatalog::builtin();
        assert_eq!(
            catalog.get("NEON").expect("key lookup").animation,
            AnimationKind::Neon
        );
        assert_eq!(
            catalog.get("Matrix Rain").expect("name lookup").key,
            "matrix"
        );
    }

    #[test]
    fn empty_and_unknown_names_are_invalid_requests() {
        let catalog = StyleCatalog::builtin();
        let empty = catalog.get("  ").expect_err("empty name should fail");
        assert!(matches!(empty, AnimError::InvalidRequest(_)));
        let unknown = catalog.get("sparkle").expect_err("unknown name should fail");
        assert!(unknown.detail().contains("sparkle"));
    }

    #[test]
    fn style_file_with_unknown_animation_is_rejected() {
        let error = StyleCatalog::parse_style_file(
            r#"
styles:
  - key: wobble
    name: Wobble
    font_size: 40
    colors: [[255, 0, 0]]
    background: [0, 0, 0]
    animation: wobble
"#,
        )
        .expect_err("unknown kind should fail");
        assert!(matches!(error, AnimError::InvalidRequest(_)));
        assert!(error.detail().contains("unknown animation kind 'wobble'"));
    }

    #[test]
    fn style_file_rejects_empty_colors() {
        let error = StyleCatalog::parse_style_file(
            r#"
styles:
  - key: plain
    name: Plain
    font_size: 40
    colors: []
    background: [0, 0, 0]
    animation: bounce
"#,
        )
        .expect_err("empty colors should fail");
        assert!(error.detail().contains("at least one color"));
    }

    #[test]
    fn style_file_rejects_oversized_font() {
        for font_size in ["0", "513", "4294967295"] {
            let contents = format!(
                "styles:\n  - key: huge\n    name: Huge\n    font_size: {font_size}\n    colors: [[255, 255, 255]]\n    background: [0, 0, 0]\n    animation: bounce\n"
            );
            let error = StyleCatalog::parse_style_file(&contents)
                .expect_err("font size outside the supported range");
            assert!(matches!(error, AnimError::InvalidRequest(_)));
            assert!(error.detail().contains("font_size"), "{}", error.detail());
        }
    }

    #[test]
    fn extended_catalog_overrides_by_key_and_keeps_builtin_intact() {
        let custom = StyleCatalog::parse_style_file(
            r##"
styles:
  - key: neon
    name: Neon Blue
    font_size: 32
    colors: ["#0000FF"]
    background: "#000000"
    animation: neon
  - key: sunset
    name: Sunset
    font_size: 56
    colors: ["#FF4500", "#FFD700"]
    background: [40, 0, 40]
    animation: rainbow
"##,
        )
        .expect("style file should parse");

        let catalog = StyleCatalog::builtin().extended_with(custom);
        assert_eq!(catalog.len(), StyleCatalog::builtin().len() + 1);
        assert_eq!(catalog.get("neon").expect("neon").name, "Neon Blue");
        assert_eq!(catalog.get("sunset").expect("sunset").colors.len(), 2);
        assert_eq!(
            StyleCatalog::builtin().get("neon").expect("neon").name,
            "Neon Glow"
        );
    }
}
