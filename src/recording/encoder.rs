//! H.264 encoding of oriented frames using openh264

use crate::errors::CameraError;
use crate::types::{Frame, Orientation};
use openh264::encoder::{Encoder, FrameType};
use openh264::formats::YUVBuffer;

use super::writer::oriented_image;

/// Result of encoding one frame
#[derive(Debug, Clone)]
pub struct EncodedFrame {
    /// Annex B NAL units (with start codes)
    pub data: Vec<u8>,
    pub is_keyframe: bool,
}

/// Rotates frames into the session orientation and encodes them.
///
/// Output dimensions are fixed by the first frame; later frames must match.
pub struct H264Encoder {
    encoder: Encoder,
    orientation: Orientation,
    width: u32,
    height: u32,
    frame_count: u64,
}

impl H264Encoder {
    /// `width` and `height` are the dimensions of the incoming frames,
    /// before rotation.
    pub fn new(width: u32, height: u32, orientation: Orientation) -> Result<Self, CameraError> {
        let (width, height) = if orientation.is_transposed() {
            (height, width)
        } else {
            (width, height)
        };
        if width % 2 != 0 || height % 2 != 0 {
            return Err(CameraError::EncodingError(format!(
                "H.264 needs even dimensions, got {}x{}",
                width, height
            )));
        }

        let encoder = Encoder::new()
            .map_err(|e| CameraError::EncodingError(format!("Failed to create encoder: {}", e)))?;

        Ok(Self {
            encoder,
            orientation,
            width,
            height,
            frame_count: 0,
        })
    }

    /// Encoded output dimensions
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub fn encode(&mut self, frame: &Frame) -> Result<EncodedFrame, CameraError> {
        let rgb = oriented_image(frame, self.orientation)?.to_rgb8();
        if rgb.width() != self.width || rgb.height() != self.height {
            return Err(CameraError::EncodingError(format!(
                "Frame {} is {}x{} after rotation, session is {}x{}",
                frame.sequence,
                rgb.width(),
                rgb.height(),
                self.width,
                self.height
            )));
        }

        let yuv = rgb_to_yuv420(rgb.as_raw(), self.width, self.height);
        let buffer = YUVBuffer::from_vec(yuv, self.width as usize, self.height as usize);
        let bitstream = self
            .encoder
            .encode(&buffer)
            .map_err(|e| CameraError::EncodingError(format!("Encoding failed: {}", e)))?;

        self.frame_count += 1;
        Ok(EncodedFrame {
            is_keyframe: matches!(bitstream.frame_type(), FrameType::IDR | FrameType::I),
            data: bitstream.to_vec(),
        })
    }
}

/// RGB24 to planar YUV420 (BT.601)
fn rgb_to_yuv420(rgb: &[u8], width: u32, height: u32) -> Vec<u8> {
    let w = width as usize;
    let h = height as usize;
    let y_size = w * h;
    let uv_size = (w / 2) * (h / 2);
    let mut yuv = vec![0u8; y_size + uv_size * 2];

    let (y_plane, uv_planes) = yuv.split_at_mut(y_size);
    let (u_plane, v_plane) = uv_planes.split_at_mut(uv_size);

    for y in 0..h {
        for x in 0..w {
            let idx = (y * w + x) * 3;
            let r = rgb[idx] as i32;
            let g = rgb[idx + 1] as i32;
            let b = rgb[idx + 2] as i32;

            y_plane[y * w + x] = (((66 * r + 129 * g + 25 * b + 128) >> 8) + 16).clamp(0, 255) as u8;

            if y % 2 == 0 && x % 2 == 0 {
                let uv_idx = (y / 2) * (w / 2) + (x / 2);
                u_plane[uv_idx] = (((-38 * r - 74 * g + 112 * b + 128) >> 8) + 128).clamp(0, 255) as u8;
                v_plane[uv_idx] = (((112 * r - 94 * g - 18 * b + 128) >> 8) + 128).clamp(0, 255) as u8;
            }
        }
    }

    yuv
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::synthetic_frame;

    #[test]
    fn test_yuv420_size() {
        let rgb = vec![128u8; 64 * 48 * 3];
        assert_eq!(rgb_to_yuv420(&rgb, 64, 48).len(), 64 * 48 * 3 / 2);
    }

    #[test]
    fn test_odd_dimensions_rejected() {
        assert!(H264Encoder::new(63, 48, Orientation::Deg0).is_err());
    }

    #[test]
    fn test_rotated_dimensions() {
        let encoder = H264Encoder::new(64, 48, Orientation::Deg90).unwrap();
        assert_eq!(encoder.dimensions(), (48, 64));
    }

    #[test]
    fn test_first_frame_is_keyframe() {
        let mut encoder = H264Encoder::new(64, 48, Orientation::Deg0).unwrap();
        let encoded = encoder.encode(&synthetic_frame(1, 64, 48)).unwrap();
        assert!(encoded.is_keyframe);
        assert!(
            encoded.data.starts_with(&[0, 0, 0, 1]) || encoded.data.starts_with(&[0, 0, 1]),
            "Annex B start code expected"
        );
    }

    #[test]
    fn test_mismatched_frame_rejected() {
        let mut encoder = H264Encoder::new(64, 48, Orientation::Deg0).unwrap();
        assert!(encoder.encode(&synthetic_frame(1, 32, 32)).is_err());
    }
}
