use tracing::debug;

use crate::encoding::EncodedVideo;
use crate::error::AnimResult;

/// Post-encode hook that may attach a soundtrack to an encoded video.
pub trait AudioMixer {
    fn label(&self) -> &str;
    fn mix(&self, video: EncodedVideo, style_key: &str) -> AnimResult<EncodedVideo>;
}

/// Leaves the video silent.
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentMixer;

impl AudioMixer for SilentMixer {
    fn label(&self) -> &str {
        "silent"
    }

    fn mix(&self, video: EncodedVideo, style_key: &str) -> AnimResult<EncodedVideo> {
        debug!(style = style_key, "no soundtrack attached");
        Ok(video)
    }
}
