//! Recording and capture settings

use crate::types::MimeType;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Torch pre-roll before an auto-flash capture
pub const DEFAULT_FLASH_WARMUP: Duration = Duration::from_millis(1000);

/// How long a capture waits for the pipeline's first frame
pub const DEFAULT_LATEST_FRAME_TIMEOUT: Duration = Duration::from_millis(5000);

pub const PHOTO_BASE_NAME: &str = "photo";
pub const VIDEO_BASE_NAME: &str = "video";

/// Bitrate presets for video recording
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordingQuality {
    /// Previews and sharing
    Low,
    #[default]
    Medium,
    High,
}

impl RecordingQuality {
    /// Target bitrate in bits per second
    pub fn bitrate(&self) -> u32 {
        match self {
            RecordingQuality::Low => 2_500_000,
            RecordingQuality::Medium => 5_000_000,
            RecordingQuality::High => 10_000_000,
        }
    }
}

/// Encoder settings for video sessions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordingConfig {
    /// Frames per second
    pub fps: f64,
    /// Target bitrate in bits per second
    pub bitrate: u32,
    /// Write moov before mdat
    pub fast_start: bool,
    /// Optional title metadata
    pub title: Option<String>,
}

impl RecordingConfig {
    pub fn new(fps: f64) -> Self {
        Self {
            fps,
            bitrate: RecordingQuality::default().bitrate(),
            fast_start: true,
            title: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_bitrate(mut self, bitrate: u32) -> Self {
        self.bitrate = bitrate;
        self
    }
}

impl Default for RecordingConfig {
    fn default() -> Self {
        Self::new(30.0)
    }
}

/// Statistics returned when a video session is closed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordingStats {
    /// Frames written to the output
    pub video_frames: u64,
    pub duration_secs: f64,
    pub bytes_written: u64,
    /// Frames the writer skipped (encoder produced nothing, rate limiting)
    pub dropped_frames: u64,
    pub output_path: String,
}

impl RecordingStats {
    pub fn actual_fps(&self) -> f64 {
        if self.duration_secs > 0.0 {
            self.video_frames as f64 / self.duration_secs
        } else {
            0.0
        }
    }

    pub fn avg_bitrate(&self) -> f64 {
        if self.duration_secs > 0.0 {
            (self.bytes_written as f64 * 8.0) / self.duration_secs
        } else {
            0.0
        }
    }
}

/// What the coordinator needs to run captures
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureSettings {
    pub flash_warmup: Duration,
    pub latest_frame_timeout: Duration,
    pub photo_base_name: String,
    pub photo_mime: MimeType,
    pub video_base_name: String,
    pub video_mime: MimeType,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            flash_warmup: DEFAULT_FLASH_WARMUP,
            latest_frame_timeout: DEFAULT_LATEST_FRAME_TIMEOUT,
            photo_base_name: PHOTO_BASE_NAME.to_string(),
            photo_mime: MimeType::Jpeg,
            video_base_name: VIDEO_BASE_NAME.to_string(),
            video_mime: MimeType::Mp4,
        }
    }
}

impl CaptureSettings {
    pub fn with_flash_warmup(mut self, warmup: Duration) -> Self {
        self.flash_warmup = warmup;
        self
    }

    pub fn with_latest_frame_timeout(mut self, timeout: Duration) -> Self {
        self.latest_frame_timeout = timeout;
        self
    }
}
