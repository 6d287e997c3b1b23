//! Animated text rendering: named styles turn a line of text into a
//! deterministic sequence of RGB frames, which are encoded into MP4.

pub mod audio;
pub mod bitmap_font;
pub mod catalog;
pub mod color;
pub mod config;
pub mod encoding;
pub mod error;
pub mod frame;
pub mod pipeline;
pub mod probe;
pub mod raster;
pub mod renderer;
pub mod request;
pub mod rng;
pub mod sequence;
pub mod styles;
pub mod text_metrics;

pub use catalog::{AnimationKind, StyleCatalog, StyleDescriptor};
pub use encoding::{CodecProfile, EncodedVideo, QualityProfile, VideoCodec, VideoEncoder};
pub use error::{AnimError, AnimResult};
pub use frame::Frame;
pub use pipeline::{GenerateOptions, GeneratedVideo, TextAnimator};
pub use renderer::StyleRenderer;
pub use request::{CanvasSize, RenderRequest};
pub use sequence::FrameSequenceGenerator;
