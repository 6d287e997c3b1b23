use serde::Serialize;

pub type AnimResult<T> = Result<T, AnimError>;

pub const INVALID_REQUEST: &str = "INVALID_REQUEST";
pub const RENDER_FAILURE: &str = "RENDER_FAILURE";
pub const ENCODE_FAILURE: &str = "ENCODE_FAILURE";

/// The single failure value surfaced by every core operation.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum AnimError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("render failure: {0}")]
    RenderFailure(String),

    #[error("encode failure: {0}")]
    EncodeFailure(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidRequest,
    RenderFailure,
    EncodeFailure,
}

impl AnimError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidRequest(msg.into())
    }

    pub fn render(msg: impl Into<String>) -> Self {
        Self::RenderFailure(msg.into())
    }

    pub fn encode(msg: impl Into<String>) -> Self {
        Self::EncodeFailure(msg.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidRequest(_) => ErrorKind::InvalidRequest,
            Self::RenderFailure(_) => ErrorKind::RenderFailure,
            Self::EncodeFailure(_) => ErrorKind::EncodeFailure,
        }
    }

    pub fn code(&self) -> &'static str {
        match self.kind() {
            ErrorKind::InvalidRequest => INVALID_REQUEST,
            ErrorKind::RenderFailure => RENDER_FAILURE,
            ErrorKind::EncodeFailure => ENCODE_FAILURE,
        }
    }

    pub fn detail(&self) -> &str {
        match self {
            Self::InvalidRequest(detail)
            | Self::RenderFailure(detail)
            | Self::EncodeFailure(detail) => detail,
        }
    }

    pub fn envelope(&self) -> ErrorEnvelope {
        ErrorEnvelope {
            ok: false,
            error: ErrorEnvelopeBody {
                code: self.code().to_owned(),
                kind: self.kind(),
                message: self.detail().to_owned(),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorEnvelope {
    pub ok: bool,
    pub error: ErrorEnvelopeBody,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorEnvelopeBody {
    pub code: String,
    pub kind: ErrorKind,
    pub message: String,
}

/// Finds the first [`AnimError`] in an `anyhow` chain.
pub fn find_anim_error(error: &anyhow::Error) -> Option<&AnimError> {
    error
        .chain()
        .find_map(|cause| cause.downcast_ref::<AnimError>())
}
