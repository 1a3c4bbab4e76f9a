//! Media storage
//!
//! `FileStore` is the boundary to wherever captures are persisted.
//! `LocalFileStore` writes to the filesystem.

mod naming;

pub use naming::allocate_file_name;

use crate::errors::CameraError;
use crate::types::MimeType;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs::{self, OpenOptions};
use std::io::{self, BufWriter, Seek, Write};
use std::path::{Path, PathBuf};

/// Attempts before giving up when another writer claims the same name
const CREATE_ATTEMPTS: usize = 3;

/// Writable, seekable output; muxers patch headers after writing samples.
pub trait MediaWrite: Write + Seek + Send {}

impl<T: Write + Seek + Send> MediaWrite for T {}

/// A newly created media file
pub struct MediaHandle {
    pub path: PathBuf,
    pub writer: Box<dyn MediaWrite>,
}

impl std::fmt::Debug for MediaHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaHandle").field("path", &self.path).finish()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileEntry {
    pub name: String,
    pub path: PathBuf,
    pub size_bytes: u64,
    pub modified: Option<DateTime<Utc>>,
}

impl FileEntry {
    pub fn mime_type(&self) -> Option<MimeType> {
        Path::new(&self.name)
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(MimeType::from_extension)
    }
}

pub trait FileStore: Send + Sync {
    /// Files directly inside `dir`. A missing directory lists as empty.
    fn list(&self, dir: &Path) -> Result<Vec<FileEntry>, CameraError>;

    /// Create `file_name` in `dir`. Fails if the file already exists.
    fn create(&self, dir: &Path, file_name: &str, mime: MimeType) -> Result<MediaHandle, CameraError>;

    fn delete(&self, path: &Path) -> Result<(), CameraError>;

    /// Next free name for `base` with the extension of `mime`
    fn allocate(&self, dir: &Path, base: &str, mime: MimeType) -> Result<String, CameraError> {
        let entries = self.list(dir)?;
        Ok(allocate_file_name(
            entries.iter().map(|e| e.name.as_str()),
            base,
            mime.extension(),
        ))
    }

    /// Allocate a name and create the file, retrying if the name is taken
    /// between the two steps.
    fn create_unique(&self, dir: &Path, base: &str, mime: MimeType) -> Result<MediaHandle, CameraError> {
        let mut last_err = None;
        for _ in 0..CREATE_ATTEMPTS {
            let name = self.allocate(dir, base, mime)?;
            match self.create(dir, &name, mime) {
                Ok(handle) => return Ok(handle),
                Err(CameraError::Io(e)) if e.kind() == io::ErrorKind::AlreadyExists => {
                    log::debug!("{} was taken concurrently, retrying", name);
                    last_err = Some(CameraError::Io(e));
                }
                Err(e) => return Err(e),
            }
        }
        Err(last_err.unwrap_or_else(|| {
            CameraError::StorageError(format!("could not allocate a name for {}", base))
        }))
    }
}

/// Media files in `dir`, newest first
pub fn list_media(store: &dyn FileStore, dir: &Path) -> Result<Vec<FileEntry>, CameraError> {
    let mut entries: Vec<FileEntry> = store
        .list(dir)?
        .into_iter()
        .filter(|e| e.mime_type().is_some())
        .collect();
    entries.sort_by(|a, b| b.modified.cmp(&a.modified).then_with(|| a.name.cmp(&b.name)));
    Ok(entries)
}

/// Filesystem-backed store
#[derive(Debug, Clone, Default)]
pub struct LocalFileStore;

impl LocalFileStore {
    pub fn new() -> Self {
        Self
    }
}

impl FileStore for LocalFileStore {
    fn list(&self, dir: &Path) -> Result<Vec<FileEntry>, CameraError> {
        let read_dir = match fs::read_dir(dir) {
            Ok(rd) => rd,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut entries = Vec::new();
        for entry in read_dir {
            let entry = entry?;
            let metadata = entry.metadata()?;
            if !metadata.is_file() {
                continue;
            }
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            entries.push(FileEntry {
                name,
                path: entry.path(),
                size_bytes: metadata.len(),
                modified: metadata.modified().ok().map(DateTime::<Utc>::from),
            });
        }
        Ok(entries)
    }

    fn create(&self, dir: &Path, file_name: &str, mime: MimeType) -> Result<MediaHandle, CameraError> {
        fs::create_dir_all(dir)?;
        let path = dir.join(file_name);
        let file = OpenOptions::new().write(true).create_new(true).open(&path)?;
        log::debug!("Created {} ({})", path.display(), mime);
        Ok(MediaHandle {
            path,
            writer: Box::new(BufWriter::new(file)),
        })
    }

    fn delete(&self, path: &Path) -> Result<(), CameraError> {
        fs::remove_file(path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_directory_lists_empty() {
        let dir = tempdir().unwrap();
        let store = LocalFileStore::new();
        assert!(store.list(&dir.path().join("nope")).unwrap().is_empty());
    }

    #[test]
    fn test_create_unique_sequence() {
        let dir = tempdir().unwrap();
        let store = LocalFileStore::new();
        let a = store.create_unique(dir.path(), "photo", MimeType::Jpeg).unwrap();
        let b = store.create_unique(dir.path(), "photo", MimeType::Jpeg).unwrap();
        let c = store.create_unique(dir.path(), "photo", MimeType::Jpeg).unwrap();
        assert!(a.path.ends_with("photo.jpg"));
        assert!(b.path.ends_with("photo_0.jpg"));
        assert!(c.path.ends_with("photo_1.jpg"));
    }

    #[test]
    fn test_create_refuses_overwrite() {
        let dir = tempdir().unwrap();
        let store = LocalFileStore::new();
        store.create(dir.path(), "clip.mp4", MimeType::Mp4).unwrap();
        let err = store.create(dir.path(), "clip.mp4", MimeType::Mp4).unwrap_err();
        assert!(matches!(err, CameraError::Io(ref e) if e.kind() == io::ErrorKind::AlreadyExists));
    }

    #[test]
    fn test_list_media_filters_unknown() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("notes.txt"), b"x").unwrap();
        fs::write(dir.path().join("photo.jpg"), b"x").unwrap();
        fs::write(dir.path().join("video.mp4"), b"x").unwrap();
        let store = LocalFileStore::new();
        let media = list_media(&store, dir.path()).unwrap();
        let mut names: Vec<_> = media.iter().map(|e| e.name.as_str()).collect();
        names.sort();
        assert_eq!(names, vec!["photo.jpg", "video.mp4"]);
    }
}
