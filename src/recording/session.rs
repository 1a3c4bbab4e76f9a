//! A running video recording: frame subscription + output + pump thread

use super::config::RecordingStats;
use super::writer::{VideoSession, VideoWriter};
use crate::errors::CameraError;
use crate::frames::{FrameSource, FrameSubscription};
use crate::types::{MimeType, Orientation};
use crossbeam_channel::{bounded, select, Receiver, Sender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use uuid::Uuid;

struct PumpOutcome {
    output: Box<dyn VideoSession>,
    frames_written: u64,
    write_error: Option<CameraError>,
}

/// Owns the frame subscription and the open output of one recording.
///
/// Frames are written on a dedicated thread. `stop` joins that thread
/// (which drops the subscription) before closing the output, so nothing is
/// written once `stop` has returned. A failed frame write ends the thread
/// and is returned by `stop`.
pub struct RecordingSession {
    id: Uuid,
    stopping: Arc<AtomicBool>,
    failed: Arc<AtomicBool>,
    stop_tx: Sender<()>,
    pump: Option<JoinHandle<PumpOutcome>>,
}

impl RecordingSession {
    /// Subscribe to `frames` and open an output through `writer`.
    ///
    /// On failure everything acquired so far is released before returning.
    pub fn start(
        frames: &dyn FrameSource,
        writer: &dyn VideoWriter,
        orientation: Orientation,
        base_name: &str,
        mime: MimeType,
    ) -> Result<Self, CameraError> {
        let subscription = frames.subscribe();
        // If this fails the subscription drops here and unsubscribes.
        let output = writer.start_record(orientation, base_name, mime)?;

        let id = Uuid::new_v4();
        let stopping = Arc::new(AtomicBool::new(false));
        let failed = Arc::new(AtomicBool::new(false));
        let (stop_tx, stop_rx) = bounded(1);
        let pump = {
            let stopping = stopping.clone();
            let failed = failed.clone();
            std::thread::Builder::new()
                .name(format!("fxcam-record-{}", &id.to_string()[..8]))
                .spawn(move || pump_frames(id, subscription, output, stopping, failed, stop_rx))?
        };

        log::info!("Recording {} started (orientation {}°)", id, orientation.degrees());
        Ok(Self {
            id,
            stopping,
            failed,
            stop_tx,
            pump: Some(pump),
        })
    }

    /// Whether a frame write failed. The session writes nothing more and
    /// `stop` reports the failure.
    pub fn has_failed(&self) -> bool {
        self.failed.load(Ordering::Acquire)
    }

    /// Stop pumping, release the subscription and finalize the output.
    pub fn stop(mut self) -> Result<RecordingStats, CameraError> {
        self.finish()
    }

    fn finish(&mut self) -> Result<RecordingStats, CameraError> {
        let Some(pump) = self.pump.take() else {
            return Err(CameraError::StreamError("recording already stopped".to_string()));
        };

        self.stopping.store(true, Ordering::Release);
        let _ = self.stop_tx.try_send(());

        let outcome = pump
            .join()
            .map_err(|_| CameraError::StreamError("recording thread panicked".to_string()))?;

        // The output is finalized even after a write failure.
        let closed = outcome.output.close();
        if let Some(e) = outcome.write_error {
            if let Err(close_err) = closed {
                log::warn!("Recording {} also failed to close: {}", self.id, close_err);
            }
            return Err(e);
        }
        let stats = closed?;
        log::info!(
            "Recording {} stopped: {} frames written, {} in output, {:.2}s",
            self.id,
            outcome.frames_written,
            stats.video_frames,
            stats.duration_secs
        );
        Ok(stats)
    }
}

impl Drop for RecordingSession {
    fn drop(&mut self) {
        if self.pump.is_some() {
            if let Err(e) = self.finish() {
                log::warn!("Error closing recording {} in drop: {}", self.id, e);
            }
        }
    }
}

fn pump_frames(
    id: Uuid,
    subscription: FrameSubscription,
    mut output: Box<dyn VideoSession>,
    stopping: Arc<AtomicBool>,
    failed: Arc<AtomicBool>,
    stop_rx: Receiver<()>,
) -> PumpOutcome {
    let mut frames_written = 0u64;
    let mut write_error = None;

    loop {
        select! {
            recv(stop_rx) -> _ => break,
            recv(subscription.receiver()) -> msg => {
                let Ok(frame) = msg else {
                    log::info!("Recording {}: frame source closed", id);
                    break;
                };
                // A stop may have been requested while this frame was queued.
                if stopping.load(Ordering::Acquire) {
                    break;
                }
                if let Err(e) = output.write_frame(&frame) {
                    log::error!("Recording {}: frame write failed: {}", id, e);
                    write_error = Some(e);
                    failed.store(true, Ordering::Release);
                    break;
                }
                frames_written += 1;
            }
        }
    }

    drop(subscription);
    PumpOutcome {
        output,
        frames_written,
        write_error,
    }
}
