//! Photo capture and video recording against the live frame stream

use super::config::{CaptureSettings, RecordingStats};
use super::session::RecordingSession;
use super::writer::{PhotoWriter, VideoWriter};
use crate::errors::CameraError;
use crate::frames::FrameSource;
use crate::state::CameraStateStore;
use crate::types::FlashMode;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

/// A photo capture in flight.
///
/// Dropping it does not cancel the capture; it always runs to completion.
pub struct PhotoCapture {
    flash_duration: Duration,
    runtime: Handle,
    task: JoinHandle<Result<PathBuf, CameraError>>,
}

impl PhotoCapture {
    /// Pre-flash delay before the frame is taken, zero without flash.
    /// Intended for a countdown in the UI.
    pub fn flash_duration(&self) -> Duration {
        self.flash_duration
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the written photo
    pub async fn wait(self) -> Result<PathBuf, CameraError> {
        self.task
            .await
            .map_err(|e| CameraError::CaptureError(format!("photo task failed: {}", e)))?
    }

    /// Blocking variant of [`wait`](Self::wait). Must not be called from
    /// inside an async context.
    pub fn wait_blocking(self) -> Result<PathBuf, CameraError> {
        let runtime = self.runtime.clone();
        runtime.block_on(self.wait())
    }
}

/// Torch hold shared by overlapping auto-flash captures.
///
/// The torch goes on with the first pre-roll and off when the last one ends.
#[derive(Default)]
struct FlashPreroll {
    active: Mutex<usize>,
}

impl FlashPreroll {
    fn begin(&self, store: &CameraStateStore) {
        let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        *active += 1;
        store.set_flash_enabled(true);
    }

    fn end(&self, store: &CameraStateStore) {
        let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        *active = active.saturating_sub(1);
        if *active == 0 {
            store.set_flash_enabled(false);
        }
    }
}

/// Coordinates photo capture and video recording.
///
/// Photo captures run on the tokio runtime given at construction; the
/// blocking frame read and encoding go to its blocking pool. Video frames
/// are written on a per-session thread.
pub struct RecordingCoordinator {
    store: Arc<CameraStateStore>,
    frames: Arc<dyn FrameSource>,
    photo_writer: Arc<dyn PhotoWriter>,
    video_writer: Arc<dyn VideoWriter>,
    settings: CaptureSettings,
    runtime: Handle,
    preroll: Arc<FlashPreroll>,
    session: Mutex<Option<RecordingSession>>,
    last_stats: Mutex<Option<RecordingStats>>,
}

impl RecordingCoordinator {
    pub fn new(
        store: Arc<CameraStateStore>,
        frames: Arc<dyn FrameSource>,
        photo_writer: Arc<dyn PhotoWriter>,
        video_writer: Arc<dyn VideoWriter>,
        settings: CaptureSettings,
        runtime: Handle,
    ) -> Self {
        Self {
            store,
            frames,
            photo_writer,
            video_writer,
            settings,
            runtime,
            preroll: Arc::new(FlashPreroll::default()),
            session: Mutex::new(None),
            last_stats: Mutex::new(None),
        }
    }

    fn session(&self) -> MutexGuard<'_, Option<RecordingSession>> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn settings(&self) -> &CaptureSettings {
        &self.settings
    }

    /// Schedule a photo capture and return immediately.
    ///
    /// Under `FlashMode::Auto` the torch is turned on, the warm-up delay
    /// elapses, one frame is taken and the torch is turned off again. Other
    /// modes take the frame right away. Failures are logged and reported
    /// through [`PhotoCapture::wait`].
    pub fn take_photo(&self) -> PhotoCapture {
        let pre_flash = self.store.flash_mode() == FlashMode::Auto;
        let flash_duration = if pre_flash {
            self.settings.flash_warmup
        } else {
            Duration::ZERO
        };

        let store = self.store.clone();
        let frames = self.frames.clone();
        let writer = self.photo_writer.clone();
        let settings = self.settings.clone();
        let preroll = pre_flash.then(|| self.preroll.clone());
        let task = self.runtime.spawn(async move {
            let result = capture_photo(store, frames, writer, settings, preroll).await;
            if let Err(e) = &result {
                log::error!("Photo capture failed: {}", e);
            }
            result
        });

        PhotoCapture {
            flash_duration,
            runtime: self.runtime.clone(),
            task,
        }
    }

    /// Start or stop video recording.
    ///
    /// Setting the current value is a no-op and returns `Ok(false)`.
    /// Stopping releases the frame subscription and finalizes the output
    /// before returning. The session is discarded even when finalizing
    /// fails, so `is_recording` is false after any stop.
    ///
    /// A session whose frame writes failed no longer counts as recording.
    /// The next call of either kind finalizes it and returns the write error.
    pub fn set_recording(&self, recording: bool) -> Result<bool, CameraError> {
        let mut session = self.session();
        match (recording, session.take()) {
            (true, Some(active)) if active.has_failed() => {
                active.stop()?;
                *session = Some(self.start_session()?);
                Ok(true)
            }
            (true, Some(active)) => {
                *session = Some(active);
                Ok(false)
            }
            (false, None) => Ok(false),
            (true, None) => {
                *session = Some(self.start_session()?);
                Ok(true)
            }
            (false, Some(active)) => {
                let stats = active.stop()?;
                *self
                    .last_stats
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner) = Some(stats);
                Ok(true)
            }
        }
    }

    fn start_session(&self) -> Result<RecordingSession, CameraError> {
        RecordingSession::start(
            self.frames.as_ref(),
            self.video_writer.as_ref(),
            self.store.orientation(),
            &self.settings.video_base_name,
            self.settings.video_mime,
        )
    }

    pub fn start_recording(&self) -> Result<bool, CameraError> {
        self.set_recording(true)
    }

    pub fn stop_recording(&self) -> Result<bool, CameraError> {
        self.set_recording(false)
    }

    /// Whether frames are currently being recorded
    pub fn is_recording(&self) -> bool {
        self.session().as_ref().is_some_and(|s| !s.has_failed())
    }

    /// Statistics of the most recently stopped recording
    pub fn last_stats(&self) -> Option<RecordingStats> {
        self.last_stats
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Drop for RecordingCoordinator {
    fn drop(&mut self) {
        if let Err(e) = self.set_recording(false) {
            log::warn!("Error stopping recording in drop: {}", e);
        }
    }
}

async fn capture_photo(
    store: Arc<CameraStateStore>,
    frames: Arc<dyn FrameSource>,
    writer: Arc<dyn PhotoWriter>,
    settings: CaptureSettings,
    preroll: Option<Arc<FlashPreroll>>,
) -> Result<PathBuf, CameraError> {
    if let Some(preroll) = &preroll {
        preroll.begin(&store);
        tokio::time::sleep(settings.flash_warmup).await;
    }

    let timeout = settings.latest_frame_timeout;
    let frame = tokio::task::spawn_blocking(move || frames.latest(timeout)).await;

    // Restore before looking at the result so a failed read never leaves the torch on.
    if let Some(preroll) = &preroll {
        preroll.end(&store);
    }

    let frame = frame.map_err(|e| CameraError::CaptureError(format!("frame read task failed: {}", e)))??;
    let orientation = store.orientation();
    log::debug!(
        "Captured frame {} for photo (orientation {}°)",
        frame.sequence,
        orientation.degrees()
    );

    tokio::task::spawn_blocking(move || {
        writer.write_photo(&frame, orientation, &settings.photo_base_name, settings.photo_mime)
    })
    .await
    .map_err(|e| CameraError::CaptureError(format!("photo write task failed: {}", e)))?
}
