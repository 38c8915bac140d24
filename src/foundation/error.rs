/// Convenience result type used across autopost.
pub type AutopostResult<T> = Result<T, AutopostError>;

/// Top-level error taxonomy used by pipeline APIs.
#[derive(thiserror::Error, Debug)]
pub enum AutopostError {
    /// Invalid user-provided request data, tagged with a machine-readable code.
    #[error("validation error ({code}): {message}")]
    Validation {
        /// Stable error code (`bad_ratio`, `bad_mode`, ...).
        code: &'static str,
        /// Human-readable explanation.
        message: String,
    },

    /// Carousel/video request without enough usable image sources.
    #[error("insufficient media: need at least {required} images, got {got}")]
    InsufficientMedia {
        /// Minimum number of sources for the mode.
        required: usize,
        /// Number of usable sources.
        got: usize,
    },

    /// A local path or preview id does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Every decode strategy failed for an image reference.
    #[error("failed to load image '{reference}': {reason}")]
    ImageLoad {
        /// Original reference as supplied by the caller.
        reference: String,
        /// Last failure reason.
        reason: String,
    },

    /// Video encoding failed.
    #[error("encode error: {0}")]
    Encode(String),

    /// An explicitly requested capability is not configured.
    #[error("capability unavailable: {0}")]
    CapabilityUnavailable(String),

    /// The account balance does not cover the commit cost.
    #[error("insufficient credits: need {required}, have {available}")]
    InsufficientCredits {
        /// Cost recorded for the preview.
        required: u64,
        /// Current balance.
        available: u64,
    },

    /// Errors when serializing or deserializing data structures.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl AutopostError {
    /// Build a [`AutopostError::Validation`] value.
    pub fn validation(code: &'static str, msg: impl Into<String>) -> Self {
        Self::Validation {
            code,
            message: msg.into(),
        }
    }

    /// Build a [`AutopostError::NotFound`] value.
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Build a [`AutopostError::ImageLoad`] value.
    pub fn image_load(reference: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ImageLoad {
            reference: reference.into(),
            reason: reason.into(),
        }
    }

    /// Build a [`AutopostError::Encode`] value.
    pub fn encode(msg: impl Into<String>) -> Self {
        Self::Encode(msg.into())
    }

    /// Build a [`AutopostError::CapabilityUnavailable`] value.
    pub fn capability(msg: impl Into<String>) -> Self {
        Self::CapabilityUnavailable(msg.into())
    }

    /// Build a [`AutopostError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }

    /// Translate into the fixed, user-facing error shape.
    ///
    /// Internal failures collapse into `internal` with a fixed message so dependency text never
    /// reaches clients.
    pub fn to_api_error(&self) -> ApiError {
        match self {
            Self::Validation { code, message } => ApiError::new(422, code, message.clone()),
            Self::InsufficientMedia { required, got } => ApiError::new(
                422,
                "insufficient_media",
                format!("at least {required} distinct images are required, got {got}"),
            ),
            Self::NotFound(_) => ApiError::new(404, "not_found", "resource not found"),
            Self::ImageLoad { reference, .. } => ApiError::new(
                422,
                "image_load_failed",
                format!("could not load image '{reference}'"),
            ),
            Self::Encode(_) => ApiError::new(500, "encode_failed", "video encoding failed"),
            Self::CapabilityUnavailable(what) => ApiError::new(
                422,
                "capability_unavailable",
                format!("requested capability is not available: {what}"),
            ),
            Self::InsufficientCredits {
                required,
                available,
            } => ApiError::new(
                402,
                "insufficient_credits",
                format!("commit costs {required} credits, balance is {available}"),
            ),
            Self::Serde(_) | Self::Other(_) => {
                ApiError::new(500, "internal", "internal error while processing the request")
            }
        }
    }
}

/// Boundary error: HTTP-like status plus a stable code and message.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct ApiError {
    /// HTTP-equivalent status code.
    pub status: u16,
    /// Machine-readable error code.
    pub code: String,
    /// Human-readable message safe to show to clients.
    pub message: String,
}

impl ApiError {
    fn new(status: u16, code: &str, message: impl Into<String>) -> Self {
        Self {
            status,
            code: code.to_string(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({}): {}", self.code, self.status, self.message)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
