//! fxcam: camera state, effects configuration and capture coordination
//!
//! This crate is the coordination core of an effects camera. It does not
//! process pixels; an external effects engine does. fxcam keeps that engine
//! configured, and schedules photo capture and video recording against the
//! engine's output stream.
//!
//! # Components
//! - [`state::CameraStateStore`]: orientation, direction, flash mode, torch
//!   and effects configuration as observable, deduplicated cells
//! - [`effects::EffectsConfig`]: validated, immutable effects configuration
//! - [`pipeline::PipelineController`]: keeps the live engine in sync with
//!   the store across direction switches
//! - [`frames::FrameBroadcaster`]: hot broadcast of processed frames with a
//!   latest-frame slot
//! - [`recording::RecordingCoordinator`]: non-blocking photo capture with
//!   flash pre-roll, and idempotent start/stop recording
//! - [`storage`]: collision-free media file naming and a filesystem store
//!
//! # Usage
//! ```toml
//! [dependencies]
//! fxcam = { version = "0.3", features = ["recording"] }
//! ```
//!
//! ```rust,ignore
//! let store = Arc::new(CameraStateStore::default());
//! let frames = FrameBroadcaster::default();
//! let pipeline = PipelineController::new(store.clone(), Arc::new(MyEngineFactory));
//! pipeline.enable()?;
//!
//! store.update_configuration(|c| c.with_blur(0.6))?;
//! store.set_flash_mode(FlashMode::Auto);
//!
//! let coordinator = RecordingCoordinator::new(store, Arc::new(frames), photos, videos,
//!     CaptureSettings::default(), tokio::runtime::Handle::current());
//! let capture = coordinator.take_photo();
//! ```
pub mod config;
pub mod effects;
pub mod errors;
pub mod frames;
pub mod pipeline;
pub mod recording;
pub mod state;
pub mod storage;
pub mod types;

// Testing utilities - synthetic frames and mock collaborators
pub mod testing;

// Re-exports for convenience
pub use config::FxCamConfig;
pub use effects::{BackgroundMode, ColorCorrection, EffectsConfig};
pub use errors::CameraError;
pub use frames::{FrameBroadcaster, FrameSource, FrameSubscription};
pub use pipeline::{EffectsEngine, EngineFactory, PipelineController};
pub use recording::{CaptureSettings, PhotoCapture, RecordingCoordinator};
pub use state::CameraStateStore;
pub use storage::{allocate_file_name, FileStore, LocalFileStore};
pub use types::{CameraDirection, FlashMode, Frame, MimeType, Orientation, PixelFormat};

/// Initialize logging for fxcam
pub fn init_logging() {
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "fxcam=info");
    }
    let _ = env_logger::try_init();
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// Get crate information
pub fn get_info() -> CrateInfo {
    CrateInfo {
        name: NAME.to_string(),
        version: VERSION.to_string(),
        description: DESCRIPTION.to_string(),
        mp4_recording: cfg!(feature = "recording"),
    }
}

/// Crate information structure
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CrateInfo {
    pub name: String,
    pub version: String,
    pub description: String,
    /// Built with the `recording` feature
    pub mp4_recording: bool,
}

#[cfg(test)]
mod lib_tests {
    use super::*;

    #[test]
    fn test_crate_info() {
        let info = get_info();
        assert_eq!(info.name, "fxcam");
        assert!(!info.version.is_empty());
        assert!(!info.description.is_empty());
        assert_eq!(info.mp4_recording, cfg!(feature = "recording"));
    }

    #[test]
    fn test_init_logging_twice() {
        init_logging();
        init_logging();
    }
}
