use chrono::{DateTime, Local, SecondsFormat};
use serde::Serialize;
use tracing::{info, warn};

use crate::audio::AudioMixer;
use crate::catalog::StyleCatalog;
use crate::encoding::{CodecProfile, EncodedVideo, VideoEncoder};
use crate::error::AnimResult;
use crate::frame::Frame;
use crate::renderer::StyleRenderer;
use crate::request::RenderRequest;
use crate::sequence::FrameSequenceGenerator;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GenerateOptions {
    pub codec: CodecProfile,
    /// Runs the configured [`AudioMixer`] after encoding, if there is one.
    pub mix_audio: bool,
}

/// Request facts handed to whatever keeps generation history.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequestMetadata {
    pub text: String,
    pub style: String,
    pub style_name: String,
    pub animation: String,
    pub fps: u32,
    pub duration_seconds: f32,
    pub total_frames: u32,
    pub width: u32,
    pub height: u32,
    pub seed: u64,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedVideo {
    pub video: EncodedVideo,
    pub file_name: String,
    pub mime_type: &'static str,
    pub metadata: RequestMetadata,
}

/// `animation-<style>-<YYYYmmdd-HHMMSS>.mp4`
pub fn suggested_file_name(style_key: &str, created_at: &DateTime<Local>) -> String {
    format!(
        "animation-{}-{}.mp4",
        style_key,
        created_at.format("%Y%m%d-%H%M%S")
    )
}

/// End-to-end generation: request in, encoded video plus metadata out.
pub struct TextAnimator {
    catalog: StyleCatalog,
    renderer: StyleRenderer,
    encoder: VideoEncoder,
    mixer: Option<Box<dyn AudioMixer>>,
}

impl TextAnimator {
    pub fn new(catalog: StyleCatalog, renderer: StyleRenderer, encoder: VideoEncoder) -> Self {
        Self {
            catalog,
            renderer,
            encoder,
            mixer: None,
        }
    }

    pub fn with_mixer(mut self, mixer: Box<dyn AudioMixer>) -> Self {
        self.mixer = Some(mixer);
        self
    }

    /// Builds a request with default timing for a style looked up by key or name.
    pub fn request(&self, text: &str, style: &str) -> AnimResult<RenderRequest> {
        let style = self.catalog.get(style)?.clone();
        Ok(RenderRequest::new(text, style))
    }

    pub fn render_frames(&self, request: &RenderRequest) -> AnimResult<Vec<Frame>> {
        FrameSequenceGenerator::new(&self.renderer, request)?.generate()
    }

    #[tracing::instrument(skip(self, request, options), fields(style = %request.style.key))]
    pub fn generate(
        &self,
        request: &RenderRequest,
        options: &GenerateOptions,
    ) -> AnimResult<GeneratedVideo> {
        let generator = FrameSequenceGenerator::new(&self.renderer, request)?;
        let total_frames = generator.total_frames();
        info!(
            total_frames,
            fps = request.fps,
            width = request.canvas.width,
            height = request.canvas.height,
            backend = self.encoder.backend_label(),
            "generating animation"
        );

        let mut video = self
            .encoder
            .encode(generator.frames(), request.fps, &options.codec)?;

        if options.mix_audio {
            match &self.mixer {
                Some(mixer) => {
                    info!(mixer = mixer.label(), "mixing audio");
                    video = mixer.mix(video, &request.style.key)?;
                }
                None => warn!("audio mixing requested but no mixer is configured; skipping"),
            }
        }

        let created_at = Local::now();
        let metadata = RequestMetadata {
            text: request.text.clone(),
            style: request.style.key.clone(),
            style_name: request.style.name.clone(),
            animation: request.style.animation.to_string(),
            fps: request.fps,
            duration_seconds: request.duration_seconds,
            total_frames,
            width: video.width,
            height: video.height,
            seed: request.seed,
            created_at: created_at.to_rfc3339_opts(SecondsFormat::Secs, false),
        };
        let file_name = suggested_file_name(&request.style.key, &created_at);
        info!(file_name = %file_name, bytes = video.len(), "animation ready");

        Ok(GeneratedVideo {
            mime_type: video.mime_type(),
            video,
            file_name,
            metadata,
        })
    }
}
