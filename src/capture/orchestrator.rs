//! Capture lifecycle: validation through download, with progress, callbacks
//! and automatic return to idle.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::capture::download::{screenshot_filename, Downloader};
use crate::capture::encode::encode;
use crate::capture::prepare::prepare;
use crate::capture::state::{GenerationState, Status};
use crate::capture::validate::validate;
use crate::rendering::{RasterOptions, Rasterizer, SoftwareRasterizer};
use crate::{Blob, CaptureConfig, CaptureOptions, CaptureResult, CaptureTarget, Error, Result};

type OnGeneratingHandler = Arc<dyn Fn(bool) + Send + Sync>;
type OnSuccessHandler = Arc<dyn Fn(&Blob) + Send + Sync>;
type OnErrorHandler = Arc<dyn Fn(&Error) + Send + Sync>;

type StateSender = Arc<watch::Sender<GenerationState>>;

/// Drives one capture at a time and publishes its [`GenerationState`].
///
/// A trigger while the state is anything but idle fails with
/// [`Error::Busy`] and has no other effect. After success or failure the
/// state returns to idle on its own after the configured delay.
pub struct CaptureOrchestrator {
    config: CaptureConfig,
    raster_options: RasterOptions,
    rasterizer: Arc<dyn Rasterizer>,
    downloader: Arc<dyn Downloader>,
    state: StateSender,
    reset_task: Mutex<Option<JoinHandle<()>>>,
    on_generating: Option<OnGeneratingHandler>,
    on_success: Option<OnSuccessHandler>,
    on_error: Option<OnErrorHandler>,
}

impl CaptureOrchestrator {
    /// Orchestrator backed by the [`SoftwareRasterizer`].
    pub fn new(config: CaptureConfig, downloader: Arc<dyn Downloader>) -> Result<Self> {
        let rasterizer = Arc::new(SoftwareRasterizer::new()?);
        Self::with_rasterizer(config, rasterizer, downloader)
    }

    pub fn with_rasterizer(
        config: CaptureConfig,
        rasterizer: Arc<dyn Rasterizer>,
        downloader: Arc<dyn Downloader>,
    ) -> Result<Self> {
        config.validate()?;
        let raster_options = config.raster_options()?;
        let (tx, _rx) = watch::channel(GenerationState::idle());
        Ok(Self {
            config,
            raster_options,
            rasterizer,
            downloader,
            state: Arc::new(tx),
            reset_task: Mutex::new(None),
            on_generating: None,
            on_success: None,
            on_error: None,
        })
    }

    pub fn config(&self) -> &CaptureConfig {
        &self.config
    }

    /// Current state snapshot.
    pub fn state(&self) -> GenerationState {
        self.state.borrow().clone()
    }

    /// Receiver that sees every published state change.
    pub fn subscribe(&self) -> watch::Receiver<GenerationState> {
        self.state.subscribe()
    }

    pub fn on_generating<F>(&mut self, cb: F)
    where
        F: Fn(bool) + Send + Sync + 'static,
    {
        self.on_generating = Some(Arc::new(cb));
    }

    pub fn clear_on_generating(&mut self) {
        self.on_generating = None;
    }

    pub fn on_success<F>(&mut self, cb: F)
    where
        F: Fn(&Blob) + Send + Sync + 'static,
    {
        self.on_success = Some(Arc::new(cb));
    }

    pub fn clear_on_success(&mut self) {
        self.on_success = None;
    }

    pub fn on_error<F>(&mut self, cb: F)
    where
        F: Fn(&Error) + Send + Sync + 'static,
    {
        self.on_error = Some(Arc::new(cb));
    }

    pub fn clear_on_error(&mut self) {
        self.on_error = None;
    }

    /// Capture `target` and save it under a generated filename.
    pub async fn capture(&self, target: &CaptureTarget) -> Result<CaptureResult> {
        self.capture_inner(target, None, &self.config.options).await
    }

    /// Capture `target` and save it as `filename`.
    pub async fn capture_named(&self, target: &CaptureTarget, filename: &str) -> Result<CaptureResult> {
        self.capture_inner(target, Some(filename), &self.config.options).await
    }

    /// Capture `target` with `options` in place of the configured ones for
    /// this attempt only. Invalid options fail the attempt like any other
    /// error.
    pub async fn capture_with(&self, target: &CaptureTarget, options: &CaptureOptions) -> Result<CaptureResult> {
        self.capture_inner(target, None, options).await
    }

    async fn capture_inner(
        &self,
        target: &CaptureTarget,
        filename: Option<&str>,
        options: &CaptureOptions,
    ) -> Result<CaptureResult> {
        let claimed = self.state.send_if_modified(|s| {
            if s.status() == Status::Idle {
                *s = GenerationState::working(Status::Validating, 0);
                true
            } else {
                false
            }
        });
        if !claimed {
            log::debug!("capture ignored: attempt already in flight");
            return Err(Error::Busy);
        }
        self.cancel_reset();

        let mut attempt = Attempt {
            state: &self.state,
            settled: false,
        };
        let mut generating = false;
        let outcome = self.run(target, filename, options, &mut generating).await;
        attempt.settled = true;

        match outcome {
            Ok(result) => {
                log::info!(
                    "capture finished: {}x{} {} ({} bytes)",
                    result.width,
                    result.height,
                    result.blob.mime_type,
                    result.blob.len()
                );
                self.state.send_replace(GenerationState::success());
                if let Some(cb) = &self.on_success {
                    cb(&result.blob);
                }
                self.emit_generating(false);
                self.schedule_reset(self.config.success_reset_ms);
                Ok(result)
            }
            Err(err) => {
                let err = err.with_fallback_message();
                log::warn!("capture failed: {}", err);
                self.state.send_replace(GenerationState::error(err.to_string()));
                if let Some(cb) = &self.on_error {
                    cb(&err);
                }
                if generating {
                    self.emit_generating(false);
                }
                self.schedule_reset(self.config.error_reset_ms);
                Err(err)
            }
        }
    }

    async fn run(
        &self,
        target: &CaptureTarget,
        filename: Option<&str>,
        options: &CaptureOptions,
        generating: &mut bool,
    ) -> Result<CaptureResult> {
        options.validate()?;
        let raster_options = RasterOptions {
            scale: options.scale,
            width: options.width,
            height: options.height,
            ..self.raster_options.clone()
        };
        let node = {
            let doc = target
                .document
                .lock()
                .map_err(|_| Error::Other("document lock poisoned".into()))?;
            validate(&doc, target.node)?
        };

        self.state
            .send_replace(GenerationState::working(Status::Capturing, 0));
        *generating = true;
        self.emit_generating(true);

        let guard = prepare(&target.document, node)?;
        let ticker = ProgressTicker::start(
            Arc::clone(&self.state),
            self.config.progress_step,
            self.config.progress_cap,
            Duration::from_millis(self.config.progress_interval_ms),
        );

        if self.config.settle_delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.config.settle_delay_ms)).await;
        }

        let surface = self
            .rasterizer
            .rasterize(&target.document, node, &raster_options)
            .await?;

        self.advance_to(Status::Encoding);
        let result = encode(&surface, options.format, options.clamped_quality())?;
        drop(ticker);

        self.state
            .send_replace(GenerationState::working(Status::Downloading, 100));
        let name = match filename {
            Some(name) => name.to_string(),
            None => screenshot_filename(self.config.subject.as_deref(), options.format),
        };
        if let Err(e) = self.downloader.download(&result.blob, &name).await {
            return Err(Error::Download {
                message: e.to_string(),
                result: Box::new(result),
            });
        }

        // restore before the attempt settles
        drop(guard);
        Ok(result)
    }

    /// Move to `status` keeping the current progress.
    fn advance_to(&self, status: Status) {
        self.state.send_modify(|s| {
            *s = GenerationState::working(status, s.progress());
        });
    }

    fn emit_generating(&self, generating: bool) {
        if let Some(cb) = &self.on_generating {
            cb(generating);
        }
    }

    fn schedule_reset(&self, delay_ms: u64) {
        if delay_ms == 0 {
            reset_if_settled(&self.state);
            return;
        }
        let state = Arc::clone(&self.state);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            reset_if_settled(&state);
        });
        if let Ok(mut slot) = self.reset_task.lock() {
            if let Some(previous) = slot.replace(handle) {
                previous.abort();
            }
        }
    }

    fn cancel_reset(&self) {
        if let Ok(mut slot) = self.reset_task.lock() {
            if let Some(handle) = slot.take() {
                handle.abort();
            }
        }
    }
}

impl Drop for CaptureOrchestrator {
    fn drop(&mut self) {
        self.cancel_reset();
    }
}

fn reset_if_settled(state: &watch::Sender<GenerationState>) {
    state.send_if_modified(|s| {
        if matches!(s.status(), Status::Success | Status::Error) {
            *s = GenerationState::idle();
            true
        } else {
            false
        }
    });
}

/// Returns the state to idle if the capture future is dropped mid-flight.
struct Attempt<'a> {
    state: &'a watch::Sender<GenerationState>,
    settled: bool,
}

impl Drop for Attempt<'_> {
    fn drop(&mut self) {
        if !self.settled {
            log::debug!("capture cancelled before settling");
            self.state.send_replace(GenerationState::idle());
        }
    }
}

/// Cosmetic progress while the rasterizer runs; stops when dropped.
struct ProgressTicker {
    handle: JoinHandle<()>,
}

impl ProgressTicker {
    fn start(state: StateSender, step: u8, cap: u8, period: Duration) -> Self {
        let handle = tokio::spawn(async move {
            let mut ticks = interval_at(Instant::now() + period, period);
            ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticks.tick().await;
                state.send_if_modified(|s| {
                    if !matches!(s.status(), Status::Capturing | Status::Encoding) {
                        return false;
                    }
                    let next = s.advanced(step, cap);
                    let changed = next != *s;
                    *s = next;
                    changed
                });
            }
        });
        Self { handle }
    }
}

impl Drop for ProgressTicker {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
