use anyhow::{bail, Context};
use fxcam::effects::{BackgroundMode, EffectsConfig};
use fxcam::frames::FrameBroadcaster;
use fxcam::pipeline::{EffectsEngine, EngineFactory, PipelineController};
use fxcam::recording::{JpegPhotoWriter, RecordingCoordinator, VideoWriter};
use fxcam::state::CameraStateStore;
use fxcam::storage::{allocate_file_name, list_media, FileStore, LocalFileStore};
use fxcam::testing::synthetic_frame;
use fxcam::types::{CameraDirection, FlashMode};
use fxcam::{CameraError, FxCamConfig};
use std::env;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

fn main() -> anyhow::Result<()> {
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: fxcam-cli <simulate|next-name|default-config> [args]");
        std::process::exit(1);
    }

    match args[1].as_str() {
        "simulate" => cmd_simulate(&args),
        "next-name" => cmd_next_name(&args),
        "default-config" => cmd_default_config(),
        command => {
            eprintln!("Unknown command: {}", command);
            std::process::exit(1);
        }
    }
}

fn cmd_default_config() -> anyhow::Result<()> {
    print!("{}", FxCamConfig::default().to_toml()?);
    Ok(())
}

fn cmd_next_name(args: &[String]) -> anyhow::Result<()> {
    if args.len() < 5 {
        eprintln!("Usage: fxcam-cli next-name <dir> <base> <ext>");
        std::process::exit(1);
    }
    let dir = Path::new(&args[2]);
    let entries = LocalFileStore::new().list(dir)?;
    println!(
        "{}",
        allocate_file_name(entries.iter().map(|e| e.name.as_str()), &args[3], &args[4])
    );
    Ok(())
}

/// Engine stand-in that only logs what it is asked to do
struct LoggingEngine {
    direction: CameraDirection,
}

impl EffectsEngine for LoggingEngine {
    fn configure(&mut self, config: &EffectsConfig) -> Result<(), CameraError> {
        log::info!(
            "[{} engine] background={:?} passthrough={}",
            self.direction,
            config.background(),
            config.is_passthrough()
        );
        Ok(())
    }

    fn set_torch(&mut self, enabled: bool) -> Result<(), CameraError> {
        log::info!("[{} engine] torch {}", self.direction, if enabled { "on" } else { "off" });
        Ok(())
    }

    fn shutdown(&mut self) {
        log::info!("[{} engine] shutdown", self.direction);
    }
}

struct LoggingEngineFactory;

impl EngineFactory for LoggingEngineFactory {
    fn create(&self, direction: CameraDirection) -> Result<Box<dyn EffectsEngine>, CameraError> {
        Ok(Box::new(LoggingEngine { direction }))
    }
}

#[cfg(feature = "recording")]
fn video_writer(config: &FxCamConfig, store: Arc<LocalFileStore>) -> Arc<dyn VideoWriter> {
    Arc::new(fxcam::recording::Mp4VideoWriter::new(
        store,
        config.storage.video_directory.clone(),
        config.recording_config(),
    ))
}

#[cfg(not(feature = "recording"))]
fn video_writer(_config: &FxCamConfig, _store: Arc<LocalFileStore>) -> Arc<dyn VideoWriter> {
    log::warn!("Built without the `recording` feature; video frames are counted, not stored");
    Arc::new(fxcam::testing::CountingVideoWriter::new())
}

struct SimulateArgs {
    config_path: Option<PathBuf>,
    output: Option<PathBuf>,
    seconds: u64,
    width: u32,
    height: u32,
}

fn parse_simulate(args: &[String]) -> anyhow::Result<SimulateArgs> {
    let mut parsed = SimulateArgs {
        config_path: None,
        output: None,
        seconds: 3,
        width: 320,
        height: 240,
    };

    let mut i = 2;
    while i < args.len() {
        let value = |i: usize| {
            args.get(i + 1)
                .with_context(|| format!("{} needs a value", args[i]))
        };
        match args[i].as_str() {
            "--config" => parsed.config_path = Some(PathBuf::from(value(i)?)),
            "--out" => parsed.output = Some(PathBuf::from(value(i)?)),
            "--seconds" => parsed.seconds = value(i)?.parse().context("--seconds")?,
            "--size" => {
                let (w, h) = value(i)?
                    .split_once('x')
                    .context("--size should be WIDTHxHEIGHT")?;
                parsed.width = w.parse().context("--size width")?;
                parsed.height = h.parse().context("--size height")?;
            }
            other => bail!("Unknown option: {}", other),
        }
        i += 2;
    }
    Ok(parsed)
}

fn cmd_simulate(args: &[String]) -> anyhow::Result<()> {
    fxcam::init_logging();
    let opts = parse_simulate(args)?;

    let mut config = match &opts.config_path {
        Some(path) => FxCamConfig::load_from_file(path)?,
        None => FxCamConfig::default(),
    };
    if let Some(out) = &opts.output {
        config.storage.photo_directory = out.join("photos");
        config.storage.video_directory = out.join("videos");
    }
    config.validate()?;

    let runtime = tokio::runtime::Runtime::new().context("failed to start tokio runtime")?;
    let store = Arc::new(CameraStateStore::default());
    let frames = FrameBroadcaster::new(config.recording.frame_buffer);
    let files = Arc::new(LocalFileStore::new());

    let pipeline = PipelineController::new(store.clone(), Arc::new(LoggingEngineFactory));
    pipeline.enable()?;

    // Synthetic producer standing in for the engine's output callback
    let running = Arc::new(AtomicBool::new(true));
    let producer = {
        let frames = frames.clone();
        let running = running.clone();
        let interval = Duration::from_secs_f64(1.0 / config.recording.fps);
        let (width, height) = (opts.width, opts.height);
        std::thread::Builder::new()
            .name("fxcam-synthetic".to_string())
            .spawn(move || {
                let mut n = 0u64;
                while running.load(Ordering::SeqCst) {
                    let data = synthetic_frame(n, width, height).data;
                    frames.publish(frames.stamp(data, width, height, fxcam::PixelFormat::Rgb8));
                    n += 1;
                    std::thread::sleep(interval);
                }
                frames.close();
            })?
    };

    let coordinator = RecordingCoordinator::new(
        store.clone(),
        Arc::new(frames.clone()),
        Arc::new(JpegPhotoWriter::new(
            files.clone(),
            config.storage.photo_directory.clone(),
            config.capture.jpeg_quality,
        )),
        video_writer(&config, files.clone()),
        config.capture_settings(),
        runtime.handle().clone(),
    );

    store.update_configuration(|c| Ok(c.with_background(BackgroundMode::Remove)))?;
    store.update_configuration(|c| c.with_beautification(Some(40)))?;
    store.set_flash_mode(FlashMode::Auto);

    let capture = coordinator.take_photo();
    println!("Photo scheduled, flash pre-roll {} ms", capture.flash_duration().as_millis());
    let photo = capture.wait_blocking()?;
    println!("Photo saved: {}", photo.display());

    let stop_flag = Arc::new(AtomicBool::new(false));
    let stop_flag_clone = stop_flag.clone();
    ctrlc::set_handler(move || {
        stop_flag_clone.store(true, Ordering::SeqCst);
    })?;

    println!("Recording... (press Ctrl+C to stop early)");
    coordinator.set_recording(true)?;
    let start = Instant::now();
    let target = Duration::from_secs(opts.seconds);
    let mut switched = false;
    while start.elapsed() < target {
        if stop_flag.load(Ordering::SeqCst) {
            println!("Stopping early...");
            break;
        }
        if !switched && start.elapsed() >= target / 2 {
            store.set_direction(store.direction().toggled());
            switched = true;
        }
        std::thread::sleep(Duration::from_millis(50));
    }
    coordinator.set_recording(false)?;

    running.store(false, Ordering::SeqCst);
    if producer.join().is_err() {
        log::warn!("Synthetic producer panicked");
    }
    pipeline.disable()?;

    let photos = list_media(files.as_ref(), &config.storage.photo_directory)?;
    let summary = serde_json::json!({
        "photo": photo,
        "recording": coordinator.last_stats(),
        "dropped_frames": frames.dropped_frames(),
        "state": store.snapshot(),
        "photos_in_gallery": photos.len(),
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
