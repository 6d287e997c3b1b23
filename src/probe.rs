use std::path::{Path, PathBuf};
use std::process::Command;

use serde::{Deserialize, Serialize};

use crate::encoding::{command_available, EncodedVideo, StagingFile};
use crate::error::{AnimError, AnimResult};

/// Stream facts read back from an encoded file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VideoProbe {
    pub codec_name: Option<String>,
    pub width: u32,
    pub height: u32,
    pub fps: Option<f64>,
    pub frame_count: Option<u32>,
    pub duration_seconds: Option<f64>,
    pub pixel_format: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    streams: Vec<FfprobeStream>,
    #[serde(default)]
    format: Option<FfprobeFormat>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    #[serde(default)]
    codec_type: Option<String>,
    #[serde(default)]
    codec_name: Option<String>,
    #[serde(default)]
    width: Option<u32>,
    #[serde(default)]
    height: Option<u32>,
    #[serde(default)]
    pix_fmt: Option<String>,
    #[serde(default)]
    r_frame_rate: Option<String>,
    #[serde(default)]
    avg_frame_rate: Option<String>,
    #[serde(default)]
    nb_read_frames: Option<String>,
    #[serde(default)]
    nb_frames: Option<String>,
    #[serde(default)]
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    #[serde(default)]
    duration: Option<String>,
}

#[derive(Debug, Clone)]
pub struct VideoProber {
    program: PathBuf,
}

impl Default for VideoProber {
    fn default() -> Self {
        Self {
            program: PathBuf::from("ffprobe"),
        }
    }
}

impl VideoProber {
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn is_available(&self) -> bool {
        command_available(&self.program, "-version")
    }

    pub fn probe_file(&self, path: &Path) -> AnimResult<VideoProbe> {
        let output = Command::new(&self.program)
            .arg("-v")
            .arg("error")
            .arg("-count_frames")
            .arg("-show_streams")
            .arg("-show_format")
            .arg("-print_format")
            .arg("json")
            .arg(path)
            .output()
            .map_err(|error| {
                AnimError::encode(format!(
                    "failed to spawn ffprobe for {}: {error}",
                    path.display()
                ))
            })?;

        if !output.status.success() {
            return Err(AnimError::encode(format!(
                "ffprobe failed for {} (exit status: {}, stderr='{}')",
                path.display(),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        parse_ffprobe_json(&output.stdout).map_err(|error| {
            AnimError::encode(format!("{} ({})", error.detail(), path.display()))
        })
    }

    /// Stages `video` on disk just long enough to probe it.
    pub fn probe_video(
        &self,
        video: &EncodedVideo,
        staging_dir: Option<&Path>,
    ) -> AnimResult<VideoProbe> {
        let staging = StagingFile::create(
            staging_dir,
            &format!(".{}", video.container.extension()),
        )?;
        staging.write_bytes(&video.bytes)?;
        self.probe_file(staging.path())
    }
}

/// Probes in-memory MP4 bytes with the `ffprobe` found on PATH.
pub fn probe_video(bytes: &[u8]) -> AnimResult<VideoProbe> {
    let staging = StagingFile::create(None, ".mp4")?;
    staging.write_bytes(bytes)?;
    VideoProber::default().probe_file(staging.path())
}

pub fn parse_ffprobe_json(raw: &[u8]) -> AnimResult<VideoProbe> {
    let parsed: FfprobeOutput = serde_json::from_slice(raw)
        .map_err(|error| AnimError::encode(format!("failed to parse ffprobe JSON: {error}")))?;

    let stream = parsed
        .streams
        .iter()
        .find(|stream| stream.codec_type.as_deref() == Some("video"))
        .ok_or_else(|| AnimError::encode("ffprobe did not report a video stream"))?;

    let (Some(width), Some(height)) = (stream.width, stream.height) else {
        return Err(AnimError::encode("ffprobe did not report video dimensions"));
    };

    let fps = stream
        .r_frame_rate
        .as_deref()
        .and_then(parse_rate)
        .or_else(|| stream.avg_frame_rate.as_deref().and_then(parse_rate));

    let duration_seconds = stream
        .duration
        .as_deref()
        .and_then(parse_float)
        .or_else(|| {
            parsed
                .format
                .as_ref()
                .and_then(|format| format.duration.as_deref())
                .and_then(parse_float)
        });

    let frame_count = stream
        .nb_read_frames
        .as_deref()
        .or(stream.nb_frames.as_deref())
        .and_then(|raw| raw.trim().parse::<u32>().ok());

    Ok(VideoProbe {
        codec_name: stream.codec_name.clone(),
        width,
        height,
        fps,
        frame_count,
        duration_seconds,
        pixel_format: stream.pix_fmt.clone(),
    })
}

fn parse_rate(raw: &str) -> Option<f64> {
    let (num, den) = raw.trim().split_once('/')?;
    let num = num.parse::<f64>().ok()?;
    let den = den.parse::<f64>().ok()?;
    if den == 0.0 || num <= 0.0 {
        return None;
    }
    Some(num / den)
}

fn parse_float(raw: &str) -> Option<f64> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
}
