use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;

use crate::catalog::StyleCatalog;
use crate::encoding::{CodecProfile, FfmpegMode, QualityProfile, VideoCodec, VideoEncoder};
use crate::request::{CanvasSize, DEFAULT_DURATION_SECONDS, DEFAULT_FPS};
use crate::text_metrics::TextMetrics;

/// Optional YAML configuration for the command line tool. Relative paths
/// resolve against the directory holding the config file.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AnimatorConfig {
    #[serde(default)]
    pub font: Option<PathBuf>,
    #[serde(default)]
    pub styles: Option<PathBuf>,
    #[serde(default)]
    pub ffmpeg: FfmpegMode,
    #[serde(default)]
    pub staging_dir: Option<PathBuf>,
    #[serde(default)]
    pub defaults: RenderDefaults,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RenderDefaults {
    #[serde(default = "default_fps")]
    pub fps: u32,
    #[serde(default = "default_duration")]
    pub duration: f32,
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    #[serde(default)]
    pub quality: Option<QualityProfile>,
    #[serde(default)]
    pub codec: VideoCodec,
}

impl Default for RenderDefaults {
    fn default() -> Self {
        Self {
            fps: default_fps(),
            duration: default_duration(),
            width: default_width(),
            height: default_height(),
            quality: None,
            codec: VideoCodec::default(),
        }
    }
}

fn default_fps() -> u32 {
    DEFAULT_FPS
}

fn default_duration() -> f32 {
    DEFAULT_DURATION_SECONDS
}

fn default_width() -> u32 {
    CanvasSize::default().width
}

fn default_height() -> u32 {
    CanvasSize::default().height
}

impl RenderDefaults {
    pub fn canvas(&self) -> CanvasSize {
        CanvasSize::new(self.width, self.height)
    }

    pub fn codec_profile(&self) -> CodecProfile {
        CodecProfile::new(self.codec, self.quality)
    }
}

impl AnimatorConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let mut config = Self::parse(&contents)
            .with_context(|| format!("invalid config {}", path.display()))?;

        let base_dir = path
            .parent()
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
        config.font = config.font.map(|font| base_dir.join(font));
        config.styles = config.styles.map(|styles| base_dir.join(styles));
        config.staging_dir = config.staging_dir.map(|dir| base_dir.join(dir));
        Ok(config)
    }

    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn parse(contents: &str) -> Result<Self> {
        serde_yaml::from_str(contents).map_err(|error| {
            let location = error
                .location()
                .map(|location| format!("line {}, column {}", location.line(), location.column()))
                .unwrap_or_else(|| "unknown location".to_owned());
            anyhow!("failed to parse yaml at {}: {}", location, error)
        })
    }

    /// Built-in catalog, extended by the configured style file if any.
    pub fn catalog(&self) -> Result<StyleCatalog> {
        let builtin = StyleCatalog::builtin();
        match &self.styles {
            Some(path) => {
                let custom = StyleCatalog::load_style_file(path)?;
                Ok(builtin.extended_with(custom))
            }
            None => Ok(builtin.clone()),
        }
    }

    pub fn text_metrics(&self) -> TextMetrics {
        TextMetrics::load_or_builtin(self.font.as_deref())
    }

    pub fn encoder(&self) -> Result<VideoEncoder> {
        let encoder = VideoEncoder::new(self.ffmpeg)?;
        Ok(match &self.staging_dir {
            Some(dir) => encoder.with_staging_dir(dir),
            None => encoder,
        })
    }
}
