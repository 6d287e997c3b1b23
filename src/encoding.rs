use std::borrow::Borrow;
use std::fmt;
use std::fs;
use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::str::FromStr;
use std::thread::{self, JoinHandle};

use serde::{Deserialize, Serialize};
use tempfile::TempPath;
use tracing::{debug, info, warn};

use crate::error::{AnimError, AnimResult};
use crate::frame::Frame;
use crate::request::CanvasSize;

pub const MP4_MIME: &str = "video/mp4";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VideoCodec {
    #[default]
    H264,
    H265,
    Mpeg4,
}

impl VideoCodec {
    pub const ALL: [Self; 3] = [Self::H264, Self::H265, Self::Mpeg4];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::H264 => "h264",
            Self::H265 => "h265",
            Self::Mpeg4 => "mpeg4",
        }
    }

    pub fn to_ffmpeg_codec(self) -> &'static str {
        match self {
            Self::H264 => "libx264",
            Self::H265 => "libx265",
            Self::Mpeg4 => "mpeg4",
        }
    }
}

impl fmt::Display for VideoCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VideoCodec {
    type Err = AnimError;

    fn from_str(raw: &str) -> AnimResult<Self> {
        let normalized = raw.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|codec| codec.as_str() == normalized)
            .ok_or_else(|| {
                AnimError::invalid(format!(
                    "unknown codec '{raw}' (expected one of: {})",
                    Self::ALL.map(Self::as_str).join(", ")
                ))
            })
    }
}

/// Named (bitrate, resolution) pairs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityProfile {
    Low,
    Medium,
    High,
}

impl QualityProfile {
    pub const ALL: [Self; 3] = [Self::Low, Self::Medium, Self::High];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    pub fn bitrate_kbps(self) -> u32 {
        match self {
            Self::Low => 1_000,
            Self::Medium => 2_500,
            Self::High => 5_000,
        }
    }

    pub fn resolution(self) -> CanvasSize {
        match self {
            Self::Low => CanvasSize::new(640, 320),
            Self::Medium => CanvasSize::new(800, 400),
            Self::High => CanvasSize::new(1280, 640),
        }
    }
}

impl fmt::Display for QualityProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QualityProfile {
    type Err = AnimError;

    fn from_str(raw: &str) -> AnimResult<Self> {
        let normalized = raw.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|quality| quality.as_str() == normalized)
            .ok_or_else(|| {
                AnimError::invalid(format!(
                    "unknown quality profile '{raw}' (expected one of: {})",
                    Self::ALL.map(Self::as_str).join(", ")
                ))
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CodecProfile {
    pub codec: VideoCodec,
    /// Frames keep their native size when no profile is set.
    pub quality: Option<QualityProfile>,
}

impl CodecProfile {
    pub fn new(codec: VideoCodec, quality: Option<QualityProfile>) -> Self {
        Self { codec, quality }
    }

    pub fn output_size(&self, native: CanvasSize) -> CanvasSize {
        self.quality
            .map(QualityProfile::resolution)
            .unwrap_or(native)
    }

    pub fn bitrate_kbps(&self) -> Option<u32> {
        self.quality.map(QualityProfile::bitrate_kbps)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ContainerFormat {
    Mp4,
}

impl ContainerFormat {
    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Mp4 => MP4_MIME,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Mp4 => "mp4",
        }
    }
}

/// Encoded byte stream owned by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedVideo {
    pub bytes: Vec<u8>,
    pub container: ContainerFormat,
    pub codec: VideoCodec,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub frame_count: u32,
}

impl EncodedVideo {
    pub fn mime_type(&self) -> &'static str {
        self.container.mime_type()
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodeSettings {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub profile: CodecProfile,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FfmpegMode {
    #[default]
    Auto,
    System,
    Sidecar,
}

impl FromStr for FfmpegMode {
    type Err = AnimError;

    fn from_str(raw: &str) -> AnimResult<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "system" => Ok(Self::System),
            "sidecar" => Ok(Self::Sidecar),
            _ => Err(AnimError::invalid(format!(
                "unknown ffmpeg mode '{raw}' (expected auto, system or sidecar)"
            ))),
        }
    }
}

/// Receives raw RGB24 frames for one output file.
pub trait FrameSink {
    fn write_frame(&mut self, rgb: &[u8]) -> AnimResult<()>;
    fn finish(self: Box<Self>) -> AnimResult<()>;
}

/// Opens a [`FrameSink`] that writes a finished container to `output`.
pub trait EncoderBackend {
    fn label(&self) -> &'static str;
    fn open(&self, settings: &EncodeSettings, output: &Path) -> AnimResult<Box<dyn FrameSink>>;
}

pub fn select_backend(mode: FfmpegMode) -> AnimResult<Box<dyn EncoderBackend>> {
    match mode {
        FfmpegMode::Auto | FfmpegMode::System => Ok(Box::new(FfmpegBackend::system())),
        FfmpegMode::Sidecar => {
            #[cfg(feature = "sidecar_ffmpeg")]
            {
                Ok(Box::new(FfmpegBackend::sidecar()))
            }
            #[cfg(not(feature = "sidecar_ffmpeg"))]
            {
                Err(AnimError::encode(
                    "ffmpeg sidecar mode requested but textanim was built without `sidecar_ffmpeg`. Rebuild with `--features sidecar_ffmpeg`.",
                ))
            }
        }
    }
}

pub fn command_available(program: &Path, version_arg: &str) -> bool {
    Command::new(program)
        .arg(version_arg)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

pub fn is_ffmpeg_on_path() -> bool {
    command_available(Path::new("ffmpeg"), "-version")
}

#[derive(Debug, Clone)]
pub struct FfmpegBackend {
    mode_label: &'static str,
    program: Option<PathBuf>,
}

impl FfmpegBackend {
    pub fn system() -> Self {
        Self {
            mode_label: "system",
            program: Some(PathBuf::from("ffmpeg")),
        }
    }

    #[cfg(feature = "sidecar_ffmpeg")]
    pub fn sidecar() -> Self {
        Self {
            mode_label: "sidecar",
            program: None,
        }
    }

    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            mode_label: "system",
            program: Some(program.into()),
        }
    }

    fn resolve_program(&self) -> AnimResult<PathBuf> {
        if let Some(program) = &self.program {
            return Ok(program.clone());
        }
        sidecar_program()
    }
}

#[cfg(feature = "sidecar_ffmpeg")]
fn sidecar_program() -> AnimResult<PathBuf> {
    let path = ffmpeg_sidecar::paths::ffmpeg_path();
    if !path.exists() {
        ffmpeg_sidecar::download::auto_download().map_err(|error| {
            AnimError::encode(format!(
                "failed to auto-download ffmpeg sidecar binary: {error}"
            ))
        })?;
    }
    Ok(path)
}

#[cfg(not(feature = "sidecar_ffmpeg"))]
fn sidecar_program() -> AnimResult<PathBuf> {
    Err(AnimError::encode(
        "ffmpeg sidecar binary unavailable without the `sidecar_ffmpeg` feature",
    ))
}

impl EncoderBackend for FfmpegBackend {
    fn label(&self) -> &'static str {
        self.mode_label
    }

    fn open(&self, settings: &EncodeSettings, output: &Path) -> AnimResult<Box<dyn FrameSink>> {
        let program = self.resolve_program()?;
        let args = ffmpeg_args(settings, output);
        let mut child = Command::new(&program)
            .args(args.iter().map(String::as_str))
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|error| {
                if error.kind() == ErrorKind::NotFound {
                    AnimError::encode(format!(
                        "ffmpeg executable not found (mode={}, resolved_path={}). Install ffmpeg (system mode) or use sidecar mode with `--features sidecar_ffmpeg`.",
                        self.mode_label,
                        program.display()
                    ))
                } else {
                    AnimError::encode(format!(
                        "failed to spawn ffmpeg process (mode={}, resolved_path={}, args='{}'): {error}",
                        self.mode_label,
                        program.display(),
                        args.join(" ")
                    ))
                }
            })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| AnimError::encode("failed to capture ffmpeg stdin"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| AnimError::encode("failed to capture ffmpeg stderr"))?;
        let stderr_worker = match spawn_stderr_drain(stderr) {
            Ok(worker) => worker,
            Err(error) => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(error);
            }
        };

        Ok(Box::new(FfmpegSink {
            child,
            stdin: Some(stdin),
            stderr_worker: Some(stderr_worker),
            frame_len: settings.width as usize * settings.height as usize * 3,
            finished: false,
        }))
    }
}

struct FfmpegSink {
    child: Child,
    stdin: Option<ChildStdin>,
    stderr_worker: Option<JoinHandle<String>>,
    frame_len: usize,
    finished: bool,
}

impl FfmpegSink {
    fn failure(&mut self, context: &str) -> AnimError {
        drop(self.stdin.take());
        let _ = self.child.kill();
        let _ = self.child.wait();
        self.finished = true;
        let stderr_tail = self.stderr_tail();
        AnimError::encode(format!("{context} (stderr_tail='{stderr_tail}')"))
    }

    /// Joins the stderr drain; blocks until ffmpeg closes stderr.
    fn stderr_tail(&mut self) -> String {
        match self.stderr_worker.take().map(JoinHandle::join) {
            Some(Ok(tail)) => tail,
            Some(Err(_)) => "ffmpeg stderr reader thread panicked".to_owned(),
            None => String::new(),
        }
    }
}

impl FrameSink for FfmpegSink {
    fn write_frame(&mut self, rgb: &[u8]) -> AnimResult<()> {
        if rgb.len() != self.frame_len {
            return Err(AnimError::encode(format!(
                "frame buffer mismatch: expected {} bytes, got {}",
                self.frame_len,
                rgb.len()
            )));
        }
        let Some(stdin) = self.stdin.as_mut() else {
            return Err(AnimError::encode("ffmpeg encoder is already finalized"));
        };
        if let Err(error) = stdin.write_all(rgb) {
            return Err(self.failure(&format!("failed to write frame to ffmpeg stdin: {error}")));
        }
        Ok(())
    }

    fn finish(mut self: Box<Self>) -> AnimResult<()> {
        if let Some(mut stdin) = self.stdin.take() {
            if let Err(error) = stdin.flush() {
                return Err(self.failure(&format!("failed to flush ffmpeg stdin: {error}")));
            }
        }

        let status = self
            .child
            .wait()
            .map_err(|error| AnimError::encode(format!("failed waiting for ffmpeg process: {error}")))?;
        self.finished = true;
        let stderr_tail = self.stderr_tail();
        if !status.success() {
            return Err(AnimError::encode(format!(
                "ffmpeg failed with status {status} (stderr_tail='{stderr_tail}')"
            )));
        }
        Ok(())
    }
}

impl Drop for FfmpegSink {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        drop(self.stdin.take());
        let _ = self.child.kill();
        let _ = self.child.wait();
        let _ = self.stderr_tail();
    }
}

pub fn ffmpeg_rawvideo_input_args(width: u32, height: u32, fps: u32) -> Vec<String> {
    vec![
        "-hide_banner".to_owned(),
        "-loglevel".to_owned(),
        "error".to_owned(),
        "-y".to_owned(),
        "-f".to_owned(),
        "rawvideo".to_owned(),
        "-pix_fmt".to_owned(),
        "rgb24".to_owned(),
        "-s:v".to_owned(),
        format!("{width}x{height}"),
        "-r".to_owned(),
        fps.to_string(),
        "-i".to_owned(),
        "-".to_owned(),
        "-an".to_owned(),
    ]
}

pub fn ffmpeg_output_args(profile: &CodecProfile) -> Vec<String> {
    let mut args = vec![
        "-c:v".to_owned(),
        profile.codec.to_ffmpeg_codec().to_owned(),
        "-pix_fmt".to_owned(),
        "yuv420p".to_owned(),
    ];
    if let Some(bitrate) = profile.bitrate_kbps() {
        args.push("-b:v".to_owned());
        args.push(format!("{bitrate}k"));
    }
    args.push("-movflags".to_owned());
    args.push("+faststart".to_owned());
    args.push("-f".to_owned());
    args.push("mp4".to_owned());
    args
}

fn ffmpeg_args(settings: &EncodeSettings, output: &Path) -> Vec<String> {
    let mut args = ffmpeg_rawvideo_input_args(settings.width, settings.height, settings.fps);
    args.extend(ffmpeg_output_args(&settings.profile));
    args.push(output.to_string_lossy().into_owned());
    args
}

/// Reads ffmpeg stderr to EOF on its own thread; a full stderr pipe must
/// never block the child while we write frames or wait on it.
fn spawn_stderr_drain<R>(pipe: R) -> AnimResult<JoinHandle<String>>
where
    R: Read + Send + 'static,
{
    thread::Builder::new()
        .name("textanim-ffmpeg-stderr".to_owned())
        .spawn(move || drain_tail(pipe, 500))
        .map_err(|error| AnimError::encode(format!("failed to spawn ffmpeg stderr reader: {error}")))
}

fn drain_tail<R: Read>(mut pipe: R, max_chars: usize) -> String {
    let mut buf = Vec::new();
    let _ = pipe.read_to_end(&mut buf);
    last_n_chars(&String::from_utf8_lossy(&buf), max_chars)
}

fn last_n_chars(s: &str, max_chars: usize) -> String {
    let mut chars = s.chars().collect::<Vec<_>>();
    if chars.len() > max_chars {
        chars = chars[chars.len().saturating_sub(max_chars)..].to_vec();
    }
    chars.into_iter().collect::<String>().trim().to_owned()
}

/// Scoped staging file. Deleted when dropped, on every exit path.
#[derive(Debug)]
pub struct StagingFile {
    path: Option<TempPath>,
    location: PathBuf,
}

impl StagingFile {
    pub fn create(dir: Option<&Path>, suffix: &str) -> AnimResult<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("textanim-").suffix(suffix);
        let file = match dir {
            Some(dir) => builder.tempfile_in(dir),
            None => builder.tempfile(),
        }
        .map_err(|error| AnimError::encode(format!("failed to create staging file: {error}")))?;

        let path = file.into_temp_path();
        let location = path.to_path_buf();
        debug!(staging = %location.display(), "created staging file");
        Ok(Self {
            path: Some(path),
            location,
        })
    }

    pub fn path(&self) -> &Path {
        &self.location
    }

    pub fn read_bytes(&self) -> AnimResult<Vec<u8>> {
        fs::read(&self.location).map_err(|error| {
            AnimError::encode(format!(
                "failed to read staging file {}: {error}",
                self.location.display()
            ))
        })
    }

    pub fn write_bytes(&self, bytes: &[u8]) -> AnimResult<()> {
        fs::write(&self.location, bytes).map_err(|error| {
            AnimError::encode(format!(
                "failed to write staging file {}: {error}",
                self.location.display()
            ))
        })
    }
}

impl Drop for StagingFile {
    fn drop(&mut self) {
        let Some(path) = self.path.take() else {
            return;
        };
        match path.close() {
            Ok(()) => debug!(staging = %self.location.display(), "removed staging file"),
            Err(error) if error.kind() == ErrorKind::NotFound => {}
            Err(error) => warn!(
                staging = %self.location.display(),
                %error,
                "failed to remove staging file"
            ),
        }
    }
}

/// Turns an ordered frame sequence into an [`EncodedVideo`].
pub struct VideoEncoder {
    backend: Box<dyn EncoderBackend>,
    staging_dir: Option<PathBuf>,
}

impl fmt::Debug for VideoEncoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VideoEncoder")
            .field("backend", &self.backend.label())
            .field("staging_dir", &self.staging_dir)
            .finish()
    }
}

impl VideoEncoder {
    pub fn new(mode: FfmpegMode) -> AnimResult<Self> {
        Ok(Self::with_backend(select_backend(mode)?))
    }

    pub fn with_backend(backend: Box<dyn EncoderBackend>) -> Self {
        Self {
            backend,
            staging_dir: None,
        }
    }

    pub fn with_staging_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.staging_dir = Some(dir.into());
        self
    }

    pub fn backend_label(&self) -> &'static str {
        self.backend.label()
    }

    pub fn encode_frames(
        &self,
        frames: &[Frame],
        fps: u32,
        profile: &CodecProfile,
    ) -> AnimResult<EncodedVideo> {
        self.encode(frames.iter().map(Ok), fps, profile)
    }

    /// Streams `frames` through the backend into a staging file and returns
    /// its bytes. The staging file is removed before this returns, whether
    /// encoding succeeded or not.
    #[tracing::instrument(skip(self, frames), fields(backend = self.backend.label()))]
    pub fn encode<I, F>(
        &self,
        frames: I,
        fps: u32,
        profile: &CodecProfile,
    ) -> AnimResult<EncodedVideo>
    where
        I: IntoIterator<Item = AnimResult<F>>,
        F: Borrow<Frame>,
    {
        if fps == 0 {
            return Err(AnimError::invalid("encode fps must be > 0"));
        }

        let mut frames = frames.into_iter();
        let first = match frames.next() {
            Some(frame) => frame?,
            None => return Err(AnimError::encode("no frames to encode")),
        };
        let native = first.borrow().canvas();
        let output = profile.output_size(native);
        validate_output_size(output)?;

        let staging = StagingFile::create(self.staging_dir.as_deref(), ".mp4")?;
        let settings = EncodeSettings {
            width: output.width,
            height: output.height,
            fps,
            profile: *profile,
        };
        info!(
            width = output.width,
            height = output.height,
            fps,
            codec = %profile.codec,
            "encoding video"
        );

        let mut sink = self.backend.open(&settings, staging.path())?;
        write_frame(sink.as_mut(), first.borrow(), native, output)?;
        let mut frame_count: u32 = 1;
        for frame in frames {
            let frame = frame?;
            write_frame(sink.as_mut(), frame.borrow(), native, output)?;
            frame_count += 1;
        }
        sink.finish()?;

        let bytes = staging.read_bytes()?;
        if bytes.is_empty() {
            return Err(AnimError::encode("encoder produced an empty file"));
        }
        info!(frame_count, bytes = bytes.len(), "encoded video");

        Ok(EncodedVideo {
            bytes,
            container: ContainerFormat::Mp4,
            codec: profile.codec,
            width: output.width,
            height: output.height,
            fps,
            frame_count,
        })
    }
}

fn validate_output_size(size: CanvasSize) -> AnimResult<()> {
    if size.width == 0 || size.height == 0 {
        return Err(AnimError::encode(format!(
            "frame dimensions must be non-zero, got {}x{}",
            size.width, size.height
        )));
    }
    if size.width % 2 != 0 || size.height % 2 != 0 {
        return Err(AnimError::encode(format!(
            "frame dimensions must be even for yuv420p output, got {}x{}",
            size.width, size.height
        )));
    }
    Ok(())
}

fn write_frame(
    sink: &mut dyn FrameSink,
    frame: &Frame,
    native: CanvasSize,
    output: CanvasSize,
) -> AnimResult<()> {
    if frame.canvas() != native {
        return Err(AnimError::encode(format!(
            "frame size mismatch: got {}x{}, expected {}x{}",
            frame.width(),
            frame.height(),
            native.width,
            native.height
        )));
    }
    if output == native {
        sink.write_frame(frame.data())
    } else {
        let resized = frame
            .resized(output)
            .map_err(|error| AnimError::encode(format!("failed to resize frame: {}", error.detail())))?;
        sink.write_frame(resized.data())
    }
}
