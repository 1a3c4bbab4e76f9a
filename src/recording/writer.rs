//! Output collaborators for photo and video capture

use super::config::RecordingStats;
use crate::errors::CameraError;
use crate::storage::FileStore;
use crate::types::{Frame, MimeType, Orientation, PixelFormat};
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{DynamicImage, RgbImage, RgbaImage};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Persists single frames
pub trait PhotoWriter: Send + Sync {
    /// Write `frame` rotated clockwise by `orientation`; returns the new file.
    fn write_photo(
        &self,
        frame: &Frame,
        orientation: Orientation,
        base_name: &str,
        mime: MimeType,
    ) -> Result<PathBuf, CameraError>;
}

/// Opens video outputs
pub trait VideoWriter: Send + Sync {
    fn start_record(
        &self,
        orientation: Orientation,
        base_name: &str,
        mime: MimeType,
    ) -> Result<Box<dyn VideoSession>, CameraError>;
}

/// One open video output. `close` finalizes it into a playable file.
pub trait VideoSession: Send {
    fn write_frame(&mut self, frame: &Frame) -> Result<(), CameraError>;

    fn close(self: Box<Self>) -> Result<RecordingStats, CameraError>;
}

/// Decode a frame into an image rotated clockwise by `orientation`
pub(crate) fn oriented_image(frame: &Frame, orientation: Orientation) -> Result<DynamicImage, CameraError> {
    if !frame.is_valid() {
        return Err(CameraError::CaptureError(format!(
            "frame {} has {} bytes, expected {}x{} {:?}",
            frame.sequence,
            frame.data.len(),
            frame.width,
            frame.height,
            frame.format
        )));
    }

    let raw = frame.data.to_vec();
    let image = match frame.format {
        PixelFormat::Rgb8 => RgbImage::from_raw(frame.width, frame.height, raw).map(DynamicImage::ImageRgb8),
        PixelFormat::Rgba8 => RgbaImage::from_raw(frame.width, frame.height, raw).map(DynamicImage::ImageRgba8),
    }
    .ok_or_else(|| CameraError::CaptureError("failed to create image from frame data".to_string()))?;

    Ok(match orientation {
        Orientation::Deg0 => image,
        Orientation::Deg90 => image.rotate90(),
        Orientation::Deg180 => image.rotate180(),
        Orientation::Deg270 => image.rotate270(),
    })
}

/// Encodes photos with `image` and stores them through a `FileStore`
pub struct JpegPhotoWriter<S: FileStore> {
    store: Arc<S>,
    directory: PathBuf,
    quality: u8,
}

impl<S: FileStore> JpegPhotoWriter<S> {
    pub fn new(store: Arc<S>, directory: impl Into<PathBuf>, quality: u8) -> Self {
        Self {
            store,
            directory: directory.into(),
            quality: quality.clamp(1, 100),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }
}

impl<S: FileStore> PhotoWriter for JpegPhotoWriter<S> {
    fn write_photo(
        &self,
        frame: &Frame,
        orientation: Orientation,
        base_name: &str,
        mime: MimeType,
    ) -> Result<PathBuf, CameraError> {
        if mime.is_video() {
            return Err(CameraError::invalid(format!("{} is not a photo format", mime)));
        }
        let image = oriented_image(frame, orientation)?;

        let mut handle = self.store.create_unique(&self.directory, base_name, mime)?;
        let encoded = match mime {
            MimeType::Png => image.write_with_encoder(PngEncoder::new(&mut handle.writer)),
            _ => DynamicImage::ImageRgb8(image.to_rgb8())
                .write_with_encoder(JpegEncoder::new_with_quality(&mut handle.writer, self.quality)),
        }
        .map_err(|e| CameraError::EncodingError(format!("Failed to encode photo: {}", e)))
        .and_then(|_| handle.writer.flush().map_err(CameraError::from));

        let path = handle.path.clone();
        drop(handle);
        if let Err(e) = encoded {
            if let Err(cleanup) = self.store.delete(&path) {
                log::warn!("Failed to remove partial photo {}: {}", path.display(), cleanup);
            }
            return Err(e);
        }

        log::info!(
            "Saved photo {} ({}x{}, rotated {}°)",
            path.display(),
            frame.width,
            frame.height,
            orientation.degrees()
        );
        Ok(path)
    }
}
