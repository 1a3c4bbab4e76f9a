//! Configuration management for fxcam
//!
//! Capture timing, output locations and encoder settings, loaded from and
//! saved to TOML. Camera state itself is never persisted.

use crate::errors::CameraError;
use crate::frames::DEFAULT_SUBSCRIBER_CAPACITY;
use crate::recording::{
    CaptureSettings, RecordingConfig, RecordingQuality, DEFAULT_FLASH_WARMUP,
    DEFAULT_LATEST_FRAME_TIMEOUT, PHOTO_BASE_NAME, VIDEO_BASE_NAME,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FxCamConfig {
    pub capture: CaptureConfig,
    pub storage: StorageConfig,
    pub recording: RecordingSection,
}

/// Photo capture timing and naming
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Torch pre-roll before an auto-flash photo
    pub flash_warmup_ms: u64,
    /// Upper bound on waiting for the first frame
    pub latest_frame_timeout_ms: u64,
    pub photo_base_name: String,
    pub video_base_name: String,
    /// JPEG quality (1-100)
    pub jpeg_quality: u8,
}

/// Where captures are written
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub photo_directory: PathBuf,
    pub video_directory: PathBuf,
}

/// Video encoder settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordingSection {
    pub fps: f64,
    /// Target bitrate in bits per second
    pub bitrate: u32,
    /// Frames queued per subscriber before new ones are dropped
    pub frame_buffer: usize,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            flash_warmup_ms: DEFAULT_FLASH_WARMUP.as_millis() as u64,
            latest_frame_timeout_ms: DEFAULT_LATEST_FRAME_TIMEOUT.as_millis() as u64,
            photo_base_name: PHOTO_BASE_NAME.to_string(),
            video_base_name: VIDEO_BASE_NAME.to_string(),
            jpeg_quality: 95,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            photo_directory: PathBuf::from("./captures/photos"),
            video_directory: PathBuf::from("./captures/videos"),
        }
    }
}

impl Default for RecordingSection {
    fn default() -> Self {
        Self {
            fps: 30.0,
            bitrate: RecordingQuality::default().bitrate(),
            frame_buffer: DEFAULT_SUBSCRIBER_CAPACITY,
        }
    }
}

impl FxCamConfig {
    /// Load configuration from a TOML file. A missing file yields defaults.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, CameraError> {
        let path = path.as_ref();

        if !path.exists() {
            log::info!("Config file not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .map_err(|e| CameraError::ConfigError(format!("Failed to read config file: {}", e)))?;

        let config: FxCamConfig = toml::from_str(&contents)
            .map_err(|e| CameraError::ConfigError(format!("Failed to parse config file: {}", e)))?;
        config.validate()?;

        log::info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Save configuration to a TOML file, creating parent directories
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), CameraError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                CameraError::ConfigError(format!("Failed to create config directory: {}", e))
            })?;
        }

        let toml_string = self.to_toml()?;
        fs::write(path, toml_string)
            .map_err(|e| CameraError::ConfigError(format!("Failed to write config file: {}", e)))?;

        log::info!("Saved configuration to {:?}", path);
        Ok(())
    }

    pub fn to_toml(&self) -> Result<String, CameraError> {
        toml::to_string_pretty(self)
            .map_err(|e| CameraError::ConfigError(format!("Failed to serialize config: {}", e)))
    }

    pub fn default_path() -> PathBuf {
        PathBuf::from("fxcam.toml")
    }

    /// Load from the default location, falling back to defaults on any error
    pub fn load_or_default() -> Self {
        Self::load_from_file(Self::default_path()).unwrap_or_else(|e| {
            log::warn!("Failed to load config, using defaults: {}", e);
            Self::default()
        })
    }

    pub fn validate(&self) -> Result<(), CameraError> {
        let invalid = |msg: &str| Err(CameraError::ConfigError(msg.to_string()));

        if self.capture.latest_frame_timeout_ms == 0 {
            return invalid("latest_frame_timeout_ms must be greater than 0");
        }
        if self.capture.jpeg_quality == 0 || self.capture.jpeg_quality > 100 {
            return invalid("JPEG quality must be between 1 and 100");
        }
        if self.capture.photo_base_name.trim().is_empty() || self.capture.video_base_name.trim().is_empty() {
            return invalid("base names must not be empty");
        }
        if !self.recording.fps.is_finite() || self.recording.fps <= 0.0 || self.recording.fps > 240.0 {
            return invalid("Invalid FPS (must be in (0, 240])");
        }
        if self.recording.bitrate == 0 {
            return invalid("bitrate must be greater than 0");
        }
        if self.recording.frame_buffer == 0 {
            return invalid("frame_buffer must be at least 1");
        }

        Ok(())
    }

    /// Runtime settings for `RecordingCoordinator`
    pub fn capture_settings(&self) -> CaptureSettings {
        CaptureSettings {
            photo_base_name: self.capture.photo_base_name.clone(),
            video_base_name: self.capture.video_base_name.clone(),
            ..CaptureSettings::default()
        }
        .with_flash_warmup(Duration::from_millis(self.capture.flash_warmup_ms))
        .with_latest_frame_timeout(Duration::from_millis(self.capture.latest_frame_timeout_ms))
    }

    pub fn recording_config(&self) -> RecordingConfig {
        RecordingConfig::new(self.recording.fps).with_bitrate(self.recording.bitrate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = FxCamConfig::default();
        assert_eq!(config.capture.flash_warmup_ms, 1000);
        assert_eq!(config.capture.latest_frame_timeout_ms, 5000);
        assert_eq!(config.capture.jpeg_quality, 95);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut bad = FxCamConfig::default();
        bad.capture.jpeg_quality = 0;
        assert!(bad.validate().is_err());

        let mut bad = FxCamConfig::default();
        bad.recording.frame_buffer = 0;
        assert!(bad.validate().is_err());

        let mut bad = FxCamConfig::default();
        bad.recording.fps = f64::NAN;
        assert!(bad.validate().is_err());

        // A zero warm-up is allowed: photos are then taken immediately.
        let mut ok = FxCamConfig::default();
        ok.capture.flash_warmup_ms = 0;
        assert!(ok.validate().is_ok());
    }

    #[test]
    fn test_config_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("fxcam.toml");

        let mut config = FxCamConfig::default();
        config.capture.flash_warmup_ms = 250;
        config.storage.video_directory = PathBuf::from("/tmp/videos");
        config.save_to_file(&path).unwrap();

        let loaded = FxCamConfig::load_from_file(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("fxcam.toml");
        fs::write(&path, "[capture]\nflash_warmup_ms = 10\n").unwrap();

        let loaded = FxCamConfig::load_from_file(&path).unwrap();
        assert_eq!(loaded.capture.flash_warmup_ms, 10);
        assert_eq!(loaded.capture.jpeg_quality, 95);
        assert_eq!(loaded.recording, RecordingSection::default());
    }

    #[test]
    fn test_invalid_file_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("fxcam.toml");
        fs::write(&path, "[recording]\nframe_buffer = 0\n").unwrap();
        assert!(matches!(
            FxCamConfig::load_from_file(&path),
            Err(CameraError::ConfigError(_))
        ));
    }

    #[test]
    fn test_toml_sections() {
        let toml_string = FxCamConfig::default().to_toml().unwrap();
        assert!(toml_string.contains("[capture]"));
        assert!(toml_string.contains("[storage]"));
        assert!(toml_string.contains("[recording]"));
        assert!(toml_string.contains("flash_warmup_ms"));
    }

    #[test]
    fn test_load_nonexistent_file() {
        let loaded = FxCamConfig::load_from_file("nonexistent_fxcam.toml").unwrap();
        assert_eq!(loaded, FxCamConfig::default());
    }

    #[test]
    fn test_capture_settings_conversion() {
        let mut config = FxCamConfig::default();
        config.capture.flash_warmup_ms = 300;
        config.capture.photo_base_name = "shot".to_string();
        let settings = config.capture_settings();
        assert_eq!(settings.flash_warmup, Duration::from_millis(300));
        assert_eq!(settings.latest_frame_timeout, Duration::from_secs(5));
        assert_eq!(settings.photo_base_name, "shot");
    }
}
