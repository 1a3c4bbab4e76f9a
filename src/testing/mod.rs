//! Testing utilities for fxcam
//!
//! Synthetic frames and in-memory collaborators so the coordinator, the
//! pipeline controller and storage can be exercised without a camera.

use crate::effects::EffectsConfig;
use crate::errors::CameraError;
use crate::pipeline::{EffectsEngine, EngineFactory};
use crate::recording::{PhotoWriter, RecordingStats, VideoSession, VideoWriter};
use crate::storage::{FileEntry, FileStore, MediaHandle};
use crate::types::{CameraDirection, Frame, MimeType, Orientation, PixelFormat};
use chrono::Utc;
use std::collections::BTreeMap;
use std::io::{self, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// RGB24 gradient that shifts with `sequence`, so consecutive frames differ
pub fn synthetic_frame(sequence: u64, width: u32, height: u32) -> Frame {
    let mut data = vec![0u8; (width * height * 3) as usize];
    let base = (sequence % 256) as u8;
    for y in 0..height {
        for x in 0..width {
            let idx = ((y * width + x) * 3) as usize;
            data[idx] = base.wrapping_add((x % 256) as u8);
            data[idx + 1] = base.wrapping_add((y % 256) as u8);
            data[idx + 2] = base.wrapping_add(((x + y) % 256) as u8);
        }
    }
    let mut frame = Frame::new(data, width, height, PixelFormat::Rgb8);
    frame.sequence = sequence;
    frame
}

/// Everything a mock engine was asked to do, in order
#[derive(Debug, Clone, PartialEq)]
pub enum EngineCall {
    Create(CameraDirection),
    Configure(CameraDirection, EffectsConfig),
    Torch(CameraDirection, bool),
    Shutdown(CameraDirection),
}

#[derive(Default)]
struct EngineLog {
    calls: Vec<EngineCall>,
    fail_next_create: bool,
}

/// Engine factory that records calls instead of touching hardware
#[derive(Clone, Default)]
pub struct MockEngineFactory {
    log: Arc<Mutex<EngineLog>>,
}

impl MockEngineFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `create` fail with a capture error
    pub fn fail_next_create(&self) {
        lock(&self.log).fail_next_create = true;
    }

    pub fn calls(&self) -> Vec<EngineCall> {
        lock(&self.log).calls.clone()
    }

    pub fn created(&self) -> usize {
        self.count(|c| matches!(c, EngineCall::Create(_)))
    }

    pub fn shutdowns(&self) -> usize {
        self.count(|c| matches!(c, EngineCall::Shutdown(_)))
    }

    fn count(&self, pred: impl Fn(&EngineCall) -> bool) -> usize {
        lock(&self.log).calls.iter().filter(|c| pred(c)).count()
    }
}

impl EngineFactory for MockEngineFactory {
    fn create(&self, direction: CameraDirection) -> Result<Box<dyn EffectsEngine>, CameraError> {
        let mut log = lock(&self.log);
        if std::mem::take(&mut log.fail_next_create) {
            return Err(CameraError::CaptureError(format!("no {} camera", direction)));
        }
        log.calls.push(EngineCall::Create(direction));
        Ok(Box::new(MockEngine {
            direction,
            log: self.log.clone(),
        }))
    }
}

struct MockEngine {
    direction: CameraDirection,
    log: Arc<Mutex<EngineLog>>,
}

impl EffectsEngine for MockEngine {
    fn configure(&mut self, config: &EffectsConfig) -> Result<(), CameraError> {
        lock(&self.log)
            .calls
            .push(EngineCall::Configure(self.direction, config.clone()));
        Ok(())
    }

    fn set_torch(&mut self, enabled: bool) -> Result<(), CameraError> {
        lock(&self.log).calls.push(EngineCall::Torch(self.direction, enabled));
        Ok(())
    }

    fn shutdown(&mut self) {
        lock(&self.log).calls.push(EngineCall::Shutdown(self.direction));
    }
}

/// A photo handed to [`CollectingPhotoWriter`]
#[derive(Debug, Clone, PartialEq)]
pub struct CollectedPhoto {
    pub sequence: u64,
    pub orientation: Orientation,
    pub base_name: String,
    pub mime: MimeType,
}

/// Photo writer that keeps what it was given
#[derive(Default)]
pub struct CollectingPhotoWriter {
    photos: Mutex<Vec<CollectedPhoto>>,
    fail_next: AtomicBool,
}

impl CollectingPhotoWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_next(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    pub fn count(&self) -> usize {
        lock(&self.photos).len()
    }

    pub fn photos(&self) -> Vec<CollectedPhoto> {
        lock(&self.photos).clone()
    }
}

impl PhotoWriter for CollectingPhotoWriter {
    fn write_photo(
        &self,
        frame: &Frame,
        orientation: Orientation,
        base_name: &str,
        mime: MimeType,
    ) -> Result<PathBuf, CameraError> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(CameraError::StorageError("disk full".to_string()));
        }
        let mut photos = lock(&self.photos);
        let path = PathBuf::from(format!("{}_{}.{}", base_name, photos.len(), mime.extension()));
        photos.push(CollectedPhoto {
            sequence: frame.sequence,
            orientation,
            base_name: base_name.to_string(),
            mime,
        });
        Ok(path)
    }
}

#[derive(Default)]
struct VideoCounters {
    opened: AtomicUsize,
    closed: AtomicUsize,
    frames: AtomicU64,
    fail_next_start: AtomicBool,
    fail_writes: AtomicBool,
    write_delay_ms: AtomicU64,
}

/// Video writer that counts sessions and frames
#[derive(Clone, Default)]
pub struct CountingVideoWriter {
    counters: Arc<VideoCounters>,
}

impl CountingVideoWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_next_start(&self) {
        self.counters.fail_next_start.store(true, Ordering::SeqCst);
    }

    /// Make every following frame write fail, as on a full disk
    pub fn fail_writes(&self) {
        self.counters.fail_writes.store(true, Ordering::SeqCst);
    }

    /// Simulate a slow encoder
    pub fn set_write_delay(&self, delay: Duration) {
        self.counters
            .write_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    pub fn opened(&self) -> usize {
        self.counters.opened.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.counters.closed.load(Ordering::SeqCst)
    }

    pub fn frames_written(&self) -> u64 {
        self.counters.frames.load(Ordering::SeqCst)
    }
}

impl VideoWriter for CountingVideoWriter {
    fn start_record(
        &self,
        _orientation: Orientation,
        base_name: &str,
        mime: MimeType,
    ) -> Result<Box<dyn VideoSession>, CameraError> {
        if self.counters.fail_next_start.swap(false, Ordering::SeqCst) {
            return Err(CameraError::StorageError("cannot open output".to_string()));
        }
        let index = self.counters.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(CountingSession {
            counters: self.counters.clone(),
            output_path: format!("{}_{}.{}", base_name, index, mime.extension()),
            frames: 0,
        }))
    }
}

struct CountingSession {
    counters: Arc<VideoCounters>,
    output_path: String,
    frames: u64,
}

impl VideoSession for CountingSession {
    fn write_frame(&mut self, _frame: &Frame) -> Result<(), CameraError> {
        let delay = self.counters.write_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            std::thread::sleep(Duration::from_millis(delay));
        }
        if self.counters.fail_writes.load(Ordering::SeqCst) {
            return Err(CameraError::StorageError("disk full".to_string()));
        }
        self.frames += 1;
        self.counters.frames.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn close(self: Box<Self>) -> Result<RecordingStats, CameraError> {
        self.counters.closed.fetch_add(1, Ordering::SeqCst);
        Ok(RecordingStats {
            video_frames: self.frames,
            duration_secs: 0.0,
            bytes_written: 0,
            dropped_frames: 0,
            output_path: self.output_path,
        })
    }
}

/// Cursor over a buffer shared with the store
struct MemoryWriter {
    data: Arc<Mutex<Vec<u8>>>,
    pos: u64,
}

impl Write for MemoryWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut data = lock(&self.data);
        let start = self.pos as usize;
        let end = start + buf.len();
        if data.len() < end {
            data.resize(end, 0);
        }
        data[start..end].copy_from_slice(buf);
        self.pos = end as u64;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Seek for MemoryWriter {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let len = lock(&self.data).len() as i64;
        let next = match pos {
            SeekFrom::Start(n) => n as i64,
            SeekFrom::End(n) => len + n,
            SeekFrom::Current(n) => self.pos as i64 + n,
        };
        if next < 0 {
            return Err(io::Error::new(io::ErrorKind::InvalidInput, "seek before start"));
        }
        self.pos = next as u64;
        Ok(self.pos)
    }
}

/// In-memory `FileStore`
#[derive(Clone, Default)]
pub struct MemoryFileStore {
    files: Arc<Mutex<BTreeMap<PathBuf, Arc<Mutex<Vec<u8>>>>>>,
}

impl MemoryFileStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an empty file, as if written by someone else
    pub fn touch(&self, path: impl Into<PathBuf>) {
        lock(&self.files).insert(path.into(), Arc::default());
    }

    pub fn contents(&self, path: &Path) -> Option<Vec<u8>> {
        lock(&self.files).get(path).map(|data| lock(data).clone())
    }

    pub fn paths(&self) -> Vec<PathBuf> {
        lock(&self.files).keys().cloned().collect()
    }
}

impl FileStore for MemoryFileStore {
    fn list(&self, dir: &Path) -> Result<Vec<FileEntry>, CameraError> {
        Ok(lock(&self.files)
            .iter()
            .filter(|(path, _)| path.parent() == Some(dir))
            .filter_map(|(path, data)| {
                Some(FileEntry {
                    name: path.file_name()?.to_str()?.to_string(),
                    path: path.clone(),
                    size_bytes: lock(data).len() as u64,
                    modified: Some(Utc::now()),
                })
            })
            .collect())
    }

    fn create(&self, dir: &Path, file_name: &str, _mime: MimeType) -> Result<MediaHandle, CameraError> {
        let path = dir.join(file_name);
        let mut files = lock(&self.files);
        if files.contains_key(&path) {
            return Err(CameraError::Io(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("{} exists", path.display()),
            )));
        }
        let data = Arc::new(Mutex::new(Vec::new()));
        files.insert(path.clone(), data.clone());
        Ok(MediaHandle {
            path,
            writer: Box::new(MemoryWriter { data, pos: 0 }),
        })
    }

    fn delete(&self, path: &Path) -> Result<(), CameraError> {
        lock(&self.files)
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| CameraError::StorageError(format!("{} not found", path.display())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_synthetic_frame_is_valid() {
        let frame = synthetic_frame(7, 16, 8);
        assert!(frame.is_valid());
        assert_eq!(frame.sequence, 7);
        assert_ne!(frame.data, synthetic_frame(8, 16, 8).data);
    }

    #[test]
    fn test_memory_store_write_and_seek() {
        let store = MemoryFileStore::new();
        let dir = Path::new("/media");
        let mut handle = store.create(dir, "a.mp4", MimeType::Mp4).unwrap();
        handle.writer.write_all(b"hello world").unwrap();
        handle.writer.seek(SeekFrom::Start(0)).unwrap();
        handle.writer.write_all(b"J").unwrap();
        assert_eq!(store.contents(&dir.join("a.mp4")).unwrap(), b"Jello world");
        assert!(store.create(dir, "a.mp4", MimeType::Mp4).is_err());
    }

    #[test]
    fn test_memory_store_allocates_like_disk() {
        let store = MemoryFileStore::new();
        let dir = Path::new("/media");
        store.touch("/media/video.mp4");
        store.touch("/media/video_1.mp4");
        store.touch("/other/video_0.mp4");
        let handle = store.create_unique(dir, "video", MimeType::Mp4).unwrap();
        assert_eq!(handle.path, dir.join("video_0.mp4"));
    }
}
