//! MP4 video writer tests
//!
//! Run with: cargo test --test mp4_writer_test --features recording

use fxcam::recording::{Mp4VideoWriter, RecordingConfig, VideoSession, VideoWriter};
use fxcam::storage::LocalFileStore;
use fxcam::testing::{synthetic_frame, MemoryFileStore};
use fxcam::types::{MimeType, Orientation};
use std::path::Path;
use std::sync::Arc;
use tempfile::tempdir;

#[test]
fn records_playable_file() {
    let dir = tempdir().unwrap();
    let writer = Mp4VideoWriter::new(
        Arc::new(LocalFileStore::new()),
        dir.path(),
        RecordingConfig::new(30.0).with_title("Test Recording"),
    );

    let mut session = writer
        .start_record(Orientation::Deg0, "video", MimeType::Mp4)
        .unwrap();
    for i in 0..30 {
        session.write_frame(&synthetic_frame(i, 64, 48)).unwrap();
    }
    let stats = session.close().unwrap();

    assert_eq!(stats.video_frames, 30);
    assert!(stats.bytes_written > 0);
    assert!(stats.duration_secs > 0.0);
    assert!(stats.output_path.ends_with("video.mp4"));

    let len = std::fs::metadata(dir.path().join("video.mp4")).unwrap().len();
    assert!(len > 0);
}

#[test]
fn rotated_recording_accepts_frames() {
    let store = Arc::new(MemoryFileStore::new());
    let writer = Mp4VideoWriter::new(store.clone(), "/videos", RecordingConfig::default());

    let mut session = writer
        .start_record(Orientation::Deg90, "video", MimeType::Mp4)
        .unwrap();
    for i in 0..5 {
        session.write_frame(&synthetic_frame(i, 64, 48)).unwrap();
    }
    let stats = session.close().unwrap();
    assert_eq!(stats.video_frames, 5);
    assert!(!store.contents(Path::new("/videos/video.mp4")).unwrap().is_empty());
}

#[test]
fn empty_recording_is_removed() {
    let store = Arc::new(MemoryFileStore::new());
    let writer = Mp4VideoWriter::new(store.clone(), "/videos", RecordingConfig::default());

    let session = writer
        .start_record(Orientation::Deg0, "video", MimeType::Mp4)
        .unwrap();
    assert_eq!(store.paths().len(), 1);
    let stats = session.close().unwrap();

    assert_eq!(stats.video_frames, 0);
    assert!(store.paths().is_empty());
}

#[test]
fn second_recording_gets_next_name() {
    let store = Arc::new(MemoryFileStore::new());
    store.touch("/videos/video.mp4");
    let writer = Mp4VideoWriter::new(store.clone(), "/videos", RecordingConfig::default());

    let mut session = writer
        .start_record(Orientation::Deg0, "video", MimeType::Mp4)
        .unwrap();
    session.write_frame(&synthetic_frame(0, 32, 32)).unwrap();
    let stats = session.close().unwrap();
    assert!(stats.output_path.ends_with("video_0.mp4"));
}

#[test]
fn photo_mime_rejected() {
    let writer = Mp4VideoWriter::new(
        Arc::new(MemoryFileStore::new()),
        "/videos",
        RecordingConfig::default(),
    );
    assert!(writer
        .start_record(Orientation::Deg0, "video", MimeType::Jpeg)
        .is_err());
}

#[test]
fn frame_size_change_is_an_error() {
    let writer = Mp4VideoWriter::new(
        Arc::new(MemoryFileStore::new()),
        "/videos",
        RecordingConfig::default(),
    );
    let mut session = writer
        .start_record(Orientation::Deg0, "video", MimeType::Mp4)
        .unwrap();
    session.write_frame(&synthetic_frame(0, 64, 48)).unwrap();
    assert!(session.write_frame(&synthetic_frame(1, 32, 32)).is_err());
}
