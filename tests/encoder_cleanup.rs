use std::fs;
use std::path::{Path, PathBuf};

use tempfile::tempdir;
use textanim::catalog::StyleCatalog;
use textanim::color::Color;
use textanim::encoding::{
    is_ffmpeg_on_path, CodecProfile, EncodeSettings, EncoderBackend, FfmpegMode, FrameSink,
    QualityProfile, VideoCodec, VideoEncoder,
};
use textanim::error::{AnimError, AnimResult};
use textanim::frame::Frame;
use textanim::probe::{self, VideoProber};
use textanim::renderer::StyleRenderer;
use textanim::request::{CanvasSize, RenderRequest};
use textanim::sequence::FrameSequenceGenerator;

/// Writes partial output, then fails on the frame numbered `fail_at`.
struct FlakyBackend {
    fail_at: usize,
}

struct FlakySink {
    output: PathBuf,
    written: usize,
    fail_at: usize,
}

impl EncoderBackend for FlakyBackend {
    fn label(&self) -> &'static str {
        "flaky"
    }

    fn open(&self, _settings: &EncodeSettings, output: &Path) -> AnimResult<Box<dyn FrameSink>> {
        Ok(Box::new(FlakySink {
            output: output.to_path_buf(),
            written: 0,
            fail_at: self.fail_at,
        }))
    }
}

impl FrameSink for FlakySink {
    fn write_frame(&mut self, rgb: &[u8]) -> AnimResult<()> {
        if self.written == self.fail_at {
            return Err(AnimError::encode("simulated broken pipe"));
        }
        fs::write(&self.output, rgb).map_err(|error| AnimError::encode(error.to_string()))?;
        self.written += 1;
        Ok(())
    }

    fn finish(self: Box<Self>) -> AnimResult<()> {
        Ok(())
    }
}

fn entries(dir: &Path) -> usize {
    fs::read_dir(dir).expect("read staging dir").count()
}

fn frames(count: usize) -> Vec<Frame> {
    (0..count)
        .map(|index| Frame::filled(CanvasSize::new(16, 8), Color::rgb(index as u8, 0, 0)))
        .collect()
}

fn flaky_encoder(dir: &Path, fail_at: usize) -> VideoEncoder {
    VideoEncoder::with_backend(Box::new(FlakyBackend { fail_at })).with_staging_dir(dir)
}

#[test]
fn write_failure_mid_encode_leaves_no_staging_file() {
    let dir = tempdir().expect("tempdir should create");
    let encoder = flaky_encoder(dir.path(), 3);
    assert_eq!(encoder.backend_label(), "flaky");

    let error = encoder
        .encode_frames(&frames(10), 15, &CodecProfile::default())
        .expect_err("fourth write fails");
    assert!(matches!(error, AnimError::EncodeFailure(_)));
    assert_eq!(entries(dir.path()), 0);
}

#[test]
fn render_failure_in_stream_leaves_no_staging_file() {
    let dir = tempdir().expect("tempdir should create");
    let encoder = flaky_encoder(dir.path(), usize::MAX);
    let stream = frames(4)
        .into_iter()
        .map(Ok)
        .chain(std::iter::once(Err(AnimError::render("glyph exploded"))));

    let error = encoder
        .encode(stream, 15, &CodecProfile::default())
        .expect_err("stream error propagates");
    assert!(matches!(error, AnimError::RenderFailure(_)));
    assert_eq!(entries(dir.path()), 0);
}

#[test]
fn empty_stream_fails_without_creating_staging_file() {
    let dir = tempdir().expect("tempdir should create");
    let encoder = flaky_encoder(dir.path(), usize::MAX);
    let error = encoder
        .encode_frames(&[], 15, &CodecProfile::default())
        .expect_err("nothing to encode");
    assert!(matches!(error, AnimError::EncodeFailure(_)));
    assert_eq!(entries(dir.path()), 0);
}

#[test]
fn zero_fps_is_an_invalid_request() {
    let dir = tempdir().expect("tempdir should create");
    let encoder = flaky_encoder(dir.path(), usize::MAX);
    let error = encoder
        .encode_frames(&frames(2), 0, &CodecProfile::default())
        .expect_err("fps 0");
    assert!(matches!(error, AnimError::InvalidRequest(_)));
    assert_eq!(entries(dir.path()), 0);
}

#[test]
fn mismatched_frame_dimensions_are_rejected_and_cleaned_up() {
    let dir = tempdir().expect("tempdir should create");
    let encoder = flaky_encoder(dir.path(), usize::MAX);
    let mut mixed = frames(3);
    mixed.push(Frame::filled(CanvasSize::new(32, 8), Color::BLACK));

    let error = encoder
        .encode_frames(&mixed, 15, &CodecProfile::default())
        .expect_err("size mismatch");
    assert!(matches!(error, AnimError::EncodeFailure(_)));
    assert!(error.detail().contains("mismatch"));
    assert_eq!(entries(dir.path()), 0);
}

#[test]
fn successful_encode_returns_bytes_and_removes_staging_file() {
    let dir = tempdir().expect("tempdir should create");
    let encoder = flaky_encoder(dir.path(), usize::MAX);
    let profile = CodecProfile::new(VideoCodec::H264, Some(QualityProfile::Low));
    let video = encoder
        .encode_frames(&frames(5), 15, &profile)
        .expect("encode should succeed");

    assert_eq!(video.frame_count, 5);
    assert_eq!((video.width, video.height), (640, 320));
    assert_eq!(video.bytes.len(), 640 * 320 * 3);
    assert_eq!(video.mime_type(), "video/mp4");
    assert_eq!(entries(dir.path()), 0);
}

#[test]
fn ffmpeg_encodes_are_decodable_to_same_shape() {
    let prober = VideoProber::default();
    if !is_ffmpeg_on_path() || !prober.is_available() {
        eprintln!("skipping ffmpeg_encodes_are_decodable_to_same_shape: ffmpeg/ffprobe missing");
        return;
    }

    let dir = tempdir().expect("tempdir should create");
    let renderer = StyleRenderer::default();
    let request = RenderRequest::new(
        "Twice",
        StyleCatalog::builtin().get("neon").expect("style").clone(),
    )
    .with_fps(15)
    .with_duration(1.0)
    .with_canvas(CanvasSize::new(160, 80));
    let generator = FrameSequenceGenerator::new(&renderer, &request).expect("valid");
    let encoder = VideoEncoder::new(FfmpegMode::System)
        .expect("system ffmpeg")
        .with_staging_dir(dir.path());

    let mut shapes = Vec::new();
    for _ in 0..2 {
        let video = encoder
            .encode(generator.frames(), request.fps, &CodecProfile::default())
            .expect("encode should succeed");
        let staged = prober
            .probe_video(&video, Some(dir.path()))
            .expect("probe should succeed");
        let from_bytes = probe::probe_video(&video.bytes).expect("probe bytes should succeed");
        assert_eq!(staged, from_bytes);
        shapes.push((staged.width, staged.height, staged.frame_count));
    }

    assert_eq!(shapes[0], shapes[1]);
    assert_eq!(shapes[0], (160, 80, Some(15)));
    assert_eq!(entries(dir.path()), 0);
}
