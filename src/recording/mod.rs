//! Photo capture and video recording
//!
//! [`RecordingCoordinator`] is the entry point. It reads frames from a
//! [`FrameSource`](crate::frames::FrameSource), consults the
//! [`CameraStateStore`](crate::state::CameraStateStore) for flash mode and
//! orientation, and hands frames to a [`PhotoWriter`] or [`VideoWriter`].
//!
//! With the `recording` feature, [`Mp4VideoWriter`] encodes H.264 with
//! openh264 and muxes MP4 with muxide.
//!
//! # Example
//! ```rust,ignore
//! let coordinator = RecordingCoordinator::new(store, frames, photos, videos,
//!     CaptureSettings::default(), tokio::runtime::Handle::current());
//!
//! let capture = coordinator.take_photo();
//! show_countdown(capture.flash_duration());
//! let path = capture.wait().await?;
//!
//! coordinator.set_recording(true)?;
//! // ...
//! coordinator.set_recording(false)?;
//! ```

mod config;
mod coordinator;
mod session;
mod writer;

#[cfg(feature = "recording")]
mod encoder;
#[cfg(feature = "recording")]
mod mp4;

pub use config::{
    CaptureSettings, RecordingConfig, RecordingQuality, RecordingStats, DEFAULT_FLASH_WARMUP,
    DEFAULT_LATEST_FRAME_TIMEOUT, PHOTO_BASE_NAME, VIDEO_BASE_NAME,
};
pub use coordinator::{PhotoCapture, RecordingCoordinator};
pub use session::RecordingSession;
pub use writer::{JpegPhotoWriter, PhotoWriter, VideoSession, VideoWriter};

#[cfg(feature = "recording")]
pub use encoder::{EncodedFrame, H264Encoder};
#[cfg(feature = "recording")]
pub use mp4::Mp4VideoWriter;
