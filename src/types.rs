//! Core value types shared across the camera subsystem

use crate::errors::CameraError;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Pixel layout of a frame's data buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PixelFormat {
    Rgb8,
    Rgba8,
}

impl PixelFormat {
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            PixelFormat::Rgb8 => 3,
            PixelFormat::Rgba8 => 4,
        }
    }
}

/// One processed frame emitted by the effects pipeline.
///
/// The coordination core never inspects pixels; writers do.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub sequence: u64,
    pub timestamp_us: u64,
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub data: Bytes,
}

impl Frame {
    pub fn new(data: impl Into<Bytes>, width: u32, height: u32, format: PixelFormat) -> Self {
        Self {
            sequence: 0,
            timestamp_us: 0,
            width,
            height,
            format,
            data: data.into(),
        }
    }

    pub fn size_bytes(&self) -> usize {
        self.data.len()
    }

    /// Whether the buffer length matches the declared geometry
    pub fn is_valid(&self) -> bool {
        self.width > 0
            && self.height > 0
            && self.data.len() == self.width as usize * self.height as usize * self.format.bytes_per_pixel()
    }
}

/// Physical camera facing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CameraDirection {
    #[default]
    Front,
    Back,
}

impl CameraDirection {
    pub fn toggled(self) -> Self {
        match self {
            CameraDirection::Front => CameraDirection::Back,
            CameraDirection::Back => CameraDirection::Front,
        }
    }
}

impl fmt::Display for CameraDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CameraDirection::Front => write!(f, "front"),
            CameraDirection::Back => write!(f, "back"),
        }
    }
}

/// User-selected flash behaviour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashMode {
    Auto,
    On,
    #[default]
    Off,
}

impl FlashMode {
    /// Cycle Off -> Auto -> On -> Off, the order of the flash toggle button
    pub fn next(self) -> Self {
        match self {
            FlashMode::Off => FlashMode::Auto,
            FlashMode::Auto => FlashMode::On,
            FlashMode::On => FlashMode::Off,
        }
    }
}

/// Clockwise rotation of the device, in quarter turns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub enum Orientation {
    #[default]
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Orientation {
    /// Parse clockwise degrees; only exact quarter turns are accepted.
    pub fn from_degrees(degrees: i32) -> Result<Self, CameraError> {
        match degrees.rem_euclid(360) {
            0 => Ok(Orientation::Deg0),
            90 => Ok(Orientation::Deg90),
            180 => Ok(Orientation::Deg180),
            270 => Ok(Orientation::Deg270),
            _ => Err(CameraError::invalid(format!(
                "orientation must be a multiple of 90 degrees, got {}",
                degrees
            ))),
        }
    }

    /// Convert a counter-clockwise platform rotation into the clockwise
    /// convention used by recording consumers.
    pub fn from_counter_clockwise(ccw_degrees: i32) -> Result<Self, CameraError> {
        let ccw = Self::from_degrees(ccw_degrees)?;
        Self::from_degrees(360 - ccw.degrees())
    }

    pub fn degrees(&self) -> i32 {
        match self {
            Orientation::Deg0 => 0,
            Orientation::Deg90 => 90,
            Orientation::Deg180 => 180,
            Orientation::Deg270 => 270,
        }
    }

    /// Whether output width and height swap under this rotation
    pub fn is_transposed(&self) -> bool {
        matches!(self, Orientation::Deg90 | Orientation::Deg270)
    }
}

impl TryFrom<i32> for Orientation {
    type Error = CameraError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        Self::from_degrees(value)
    }
}

impl From<Orientation> for i32 {
    fn from(value: Orientation) -> Self {
        value.degrees()
    }
}

/// Media types produced by capture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MimeType {
    #[serde(rename = "image/jpeg")]
    Jpeg,
    #[serde(rename = "image/png")]
    Png,
    #[serde(rename = "video/mp4")]
    Mp4,
}

impl MimeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MimeType::Jpeg => "image/jpeg",
            MimeType::Png => "image/png",
            MimeType::Mp4 => "video/mp4",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            MimeType::Jpeg => "jpg",
            MimeType::Png => "png",
            MimeType::Mp4 => "mp4",
        }
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Some(MimeType::Jpeg),
            "png" => Some(MimeType::Png),
            "mp4" => Some(MimeType::Mp4),
            _ => None,
        }
    }

    pub fn is_video(&self) -> bool {
        matches!(self, MimeType::Mp4)
    }
}

impl fmt::Display for MimeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_orientation_from_degrees() {
        assert_eq!(Orientation::from_degrees(0).unwrap(), Orientation::Deg0);
        assert_eq!(Orientation::from_degrees(450).unwrap(), Orientation::Deg90);
        assert_eq!(Orientation::from_degrees(-90).unwrap(), Orientation::Deg270);
        assert!(Orientation::from_degrees(45).is_err());
    }

    #[test]
    fn test_counter_clockwise_conversion() {
        assert_eq!(Orientation::from_counter_clockwise(0).unwrap(), Orientation::Deg0);
        assert_eq!(Orientation::from_counter_clockwise(90).unwrap(), Orientation::Deg270);
        assert_eq!(Orientation::from_counter_clockwise(180).unwrap(), Orientation::Deg180);
        assert_eq!(Orientation::from_counter_clockwise(270).unwrap(), Orientation::Deg90);
        assert!(Orientation::from_counter_clockwise(30).is_err());
    }

    #[test]
    fn test_frame_validity() {
        let frame = Frame::new(vec![0u8; 4 * 2 * 3], 4, 2, PixelFormat::Rgb8);
        assert!(frame.is_valid());
        let short = Frame::new(vec![0u8; 5], 4, 2, PixelFormat::Rgb8);
        assert!(!short.is_valid());
    }

    #[test]
    fn test_mime_extensions() {
        assert_eq!(MimeType::Jpeg.extension(), "jpg");
        assert_eq!(MimeType::from_extension("JPEG"), Some(MimeType::Jpeg));
        assert_eq!(MimeType::from_extension("gif"), None);
        assert!(MimeType::Mp4.is_video());
    }

    #[test]
    fn test_flash_mode_cycle() {
        assert_eq!(FlashMode::Off.next(), FlashMode::Auto);
        assert_eq!(FlashMode::Auto.next(), FlashMode::On);
        assert_eq!(FlashMode::On.next(), FlashMode::Off);
    }
}
