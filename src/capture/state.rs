//! Observable state of a capture orchestrator.

use std::fmt;

use serde::Serialize;

/// Pipeline phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    #[default]
    Idle,
    Validating,
    Capturing,
    Encoding,
    Downloading,
    Success,
    Error,
}

impl Status {
    /// Whether a capture attempt currently owns the orchestrator.
    pub fn is_busy(self) -> bool {
        self != Status::Idle
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Status::Idle => "idle",
            Status::Validating => "validating",
            Status::Capturing => "capturing",
            Status::Encoding => "encoding",
            Status::Downloading => "downloading",
            Status::Success => "success",
            Status::Error => "error",
        };
        f.write_str(s)
    }
}

/// Snapshot published to subscribers.
///
/// Only constructible through the functions below, which keep
/// `Error` paired with a message and `Success` paired with full progress.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct GenerationState {
    status: Status,
    progress: u8,
    last_error: Option<String>,
}

impl GenerationState {
    pub fn idle() -> Self {
        Self::default()
    }

    /// An in-flight phase. `Success` and `Error` have their own
    /// constructors; passing them here yields `Idle`.
    pub fn working(status: Status, progress: u8) -> Self {
        match status {
            Status::Success | Status::Error => Self::idle(),
            status => Self {
                status,
                progress: progress.min(100),
                last_error: None,
            },
        }
    }

    pub fn success() -> Self {
        Self {
            status: Status::Success,
            progress: 100,
            last_error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: Status::Error,
            progress: 0,
            last_error: Some(message.into()),
        }
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn progress(&self) -> u8 {
        self.progress
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Same phase with progress raised by `step`, never above `cap` and
    /// never lowered.
    pub(crate) fn advanced(&self, step: u8, cap: u8) -> Self {
        let next = self.progress.saturating_add(step).min(cap).max(self.progress);
        Self {
            progress: next,
            ..self.clone()
        }
    }
}
