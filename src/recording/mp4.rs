//! MP4 video output: openh264 encoding muxed with muxide

use super::config::{RecordingConfig, RecordingStats};
use super::encoder::H264Encoder;
use super::writer::{VideoSession, VideoWriter};
use crate::errors::CameraError;
use crate::storage::{FileStore, MediaHandle, MediaWrite};
use crate::types::{Frame, MimeType, Orientation};
use muxide::api::{Metadata, Muxer, MuxerBuilder, VideoCodec};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

/// Records H.264 MP4 files into a directory of a `FileStore`
pub struct Mp4VideoWriter<S: FileStore> {
    store: Arc<S>,
    directory: PathBuf,
    config: RecordingConfig,
}

impl<S: FileStore + 'static> Mp4VideoWriter<S> {
    pub fn new(store: Arc<S>, directory: impl Into<PathBuf>, config: RecordingConfig) -> Self {
        Self {
            store,
            directory: directory.into(),
            config,
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }
}

impl<S: FileStore + 'static> VideoWriter for Mp4VideoWriter<S> {
    fn start_record(
        &self,
        orientation: Orientation,
        base_name: &str,
        mime: MimeType,
    ) -> Result<Box<dyn VideoSession>, CameraError> {
        if mime != MimeType::Mp4 {
            return Err(CameraError::invalid(format!("{} recording is not supported", mime)));
        }
        if !(self.config.fps > 0.0) {
            return Err(CameraError::invalid(format!("invalid frame rate {}", self.config.fps)));
        }

        let handle = self.store.create_unique(&self.directory, base_name, mime)?;
        log::info!("Opened recording output {}", handle.path.display());
        Ok(Box::new(Mp4Session {
            store: self.store.clone(),
            path: handle.path.clone(),
            config: self.config.clone(),
            orientation,
            pending: Some(handle),
            active: None,
            dropped_frames: 0,
            started_at: None,
        }))
    }
}

struct ActiveOutput {
    encoder: H264Encoder,
    muxer: Muxer<Box<dyn MediaWrite>>,
    frame_count: u64,
}

/// Encoder and muxer are created from the first frame, whose dimensions
/// fix the output size.
struct Mp4Session<S: FileStore> {
    store: Arc<S>,
    path: PathBuf,
    config: RecordingConfig,
    orientation: Orientation,
    pending: Option<MediaHandle>,
    active: Option<ActiveOutput>,
    dropped_frames: u64,
    started_at: Option<Instant>,
}

impl<S: FileStore> Mp4Session<S> {
    fn open(&mut self, frame: &Frame) -> Result<ActiveOutput, CameraError> {
        let handle = self
            .pending
            .take()
            .ok_or_else(|| CameraError::EncodingError("recording output already consumed".to_string()))?;
        let encoder = H264Encoder::new(frame.width, frame.height, self.orientation)?;
        let (width, height) = encoder.dimensions();

        let metadata = match &self.config.title {
            Some(title) => Metadata::new().with_title(title).with_current_time(),
            None => Metadata::new().with_current_time(),
        };
        let muxer = MuxerBuilder::new(handle.writer)
            .video(VideoCodec::H264, width, height, self.config.fps)
            .with_fast_start(self.config.fast_start)
            .with_metadata(metadata)
            .build()
            .map_err(|e| CameraError::EncodingError(format!("Failed to create muxer: {}", e)))?;

        log::debug!("Recording {} at {}x{}", self.path.display(), width, height);
        Ok(ActiveOutput {
            encoder,
            muxer,
            frame_count: 0,
        })
    }
}

impl<S: FileStore> VideoSession for Mp4Session<S> {
    fn write_frame(&mut self, frame: &Frame) -> Result<(), CameraError> {
        if self.active.is_none() {
            let output = self.open(frame)?;
            self.active = Some(output);
            self.started_at = Some(Instant::now());
        }
        let Some(output) = self.active.as_mut() else {
            return Ok(());
        };

        let encoded = output.encoder.encode(frame)?;
        // openh264 may emit nothing while its rate control skips a frame.
        if encoded.data.is_empty() {
            self.dropped_frames += 1;
            return Ok(());
        }

        let pts = output.frame_count as f64 / self.config.fps;
        output
            .muxer
            .write_video(pts, &encoded.data, encoded.is_keyframe)
            .map_err(|e| CameraError::EncodingError(format!("Failed to write frame: {}", e)))?;
        output.frame_count += 1;
        Ok(())
    }

    fn close(self: Box<Self>) -> Result<RecordingStats, CameraError> {
        let session = *self;
        let output_path = session.path.to_string_lossy().to_string();

        let Some(output) = session.active else {
            drop(session.pending);
            session.store.delete(&session.path)?;
            log::info!("Recording {} captured no frames, removed", session.path.display());
            return Ok(RecordingStats {
                video_frames: 0,
                duration_secs: 0.0,
                bytes_written: 0,
                dropped_frames: session.dropped_frames,
                output_path,
            });
        };

        let stats = output
            .muxer
            .finish_with_stats()
            .map_err(|e| CameraError::EncodingError(format!("Failed to finalize recording: {}", e)))?;
        let wall_secs = session
            .started_at
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0);
        log::debug!(
            "Finalized {} ({} frames, {:.2}s wall clock)",
            output_path,
            stats.video_frames,
            wall_secs
        );

        Ok(RecordingStats {
            video_frames: stats.video_frames,
            duration_secs: stats.duration_secs,
            bytes_written: stats.bytes_written,
            dropped_frames: session.dropped_frames,
            output_path,
        })
    }
}
