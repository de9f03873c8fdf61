//! The capture pipeline: validate, prepare, rasterize, encode, download.
//!
//! [`CaptureOrchestrator`] runs the steps in order and owns the observable
//! state. The individual steps are public so hosts can compose their own
//! flow, e.g. encoding a surface they rasterized themselves.

pub mod download;
pub mod encode;
pub mod orchestrator;
pub mod prepare;
pub mod state;
pub mod validate;

pub use download::{screenshot_filename, DirectoryDownloader, Downloader, MemoryDownloader};
pub use encode::encode;
pub use orchestrator::CaptureOrchestrator;
pub use prepare::{prepare, StyleGuard};
pub use state::{GenerationState, Status};
pub use validate::{validate, InvalidReason};
