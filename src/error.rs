//! Error types for the capture pipeline

use thiserror::Error;

use crate::capture::validate::InvalidReason;
use crate::CaptureResult;

/// Result type alias for capture operations
pub type Result<T> = std::result::Result<T, Error>;

/// Message used when an underlying failure carries no text of its own.
pub const FALLBACK_MESSAGE: &str = "Screenshot generation failed";

/// Errors that can occur while capturing a rendered subtree
#[derive(Error, Debug)]
pub enum Error {
    /// The target node cannot be captured
    #[error("{0}")]
    Validation(InvalidReason),

    /// Applying the temporary style overrides failed
    #[error("Failed to prepare element: {0}")]
    Preparation(String),

    /// The rasterizer failed to paint the subtree
    #[error("Screenshot generation failed: {0}")]
    Rasterize(String),

    /// Resource loading exceeded the rasterizer timeout
    #[error("Screenshot generation timed out after {0}ms")]
    RasterizeTimeout(u64),

    /// Bitmap to buffer conversion produced nothing
    #[error("{0}")]
    Encode(String),

    /// The image was produced but could not be saved.
    ///
    /// The encoded result is kept so callers can still use the in-memory
    /// buffer or data URL.
    #[error("Download failed: {message}")]
    Download {
        message: String,
        result: Box<CaptureResult>,
    },

    /// A capture attempt is already in flight
    #[error("A capture is already in progress")]
    Busy,

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// A referenced resource could not be loaded
    #[error("Failed to load resource: {0}")]
    Resource(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Fill in a readable message when the underlying failure had none.
    pub fn with_fallback_message(self) -> Self {
        fn fill(message: String, default: &str) -> String {
            if message.trim().is_empty() {
                default.to_string()
            } else {
                message
            }
        }

        // Variants whose display already carries a prefix only need the detail.
        match self {
            Error::Preparation(m) => Error::Preparation(fill(m, "Unknown error")),
            Error::Rasterize(m) => Error::Rasterize(fill(m, "Unknown error")),
            Error::Encode(m) => Error::Encode(fill(m, FALLBACK_MESSAGE)),
            Error::Download { message, result } => Error::Download {
                message: fill(message, "Unknown error"),
                result,
            },
            Error::Resource(m) => Error::Resource(fill(m, "Unknown error")),
            Error::Other(m) => Error::Other(fill(m, FALLBACK_MESSAGE)),
            other => other,
        }
    }

    /// The encoded image if it survived the failure (download errors only).
    pub fn recovered_result(&self) -> Option<&CaptureResult> {
        match self {
            Error::Download { result, .. } => Some(result.as_ref()),
            _ => None,
        }
    }
}

impl From<InvalidReason> for Error {
    fn from(reason: InvalidReason) -> Self {
        Error::Validation(reason)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_messages_get_fallback() {
        let err = Error::Other(String::new()).with_fallback_message();
        assert_eq!(err.to_string(), FALLBACK_MESSAGE);

        let err = Error::Rasterize("  ".into()).with_fallback_message();
        assert_eq!(err.to_string(), "Screenshot generation failed: Unknown error");
    }

    #[test]
    fn existing_messages_are_kept() {
        let err = Error::Encode("Failed to generate screenshot blob".into()).with_fallback_message();
        assert_eq!(err.to_string(), "Failed to generate screenshot blob");
    }

    #[test]
    fn validation_reason_displays_plainly() {
        let err: Error = InvalidReason::Detached.into();
        assert_eq!(err.to_string(), "Element is not in the DOM");
    }
}
