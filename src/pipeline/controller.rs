use super::{EffectsEngine, EngineFactory};
use crate::effects::EffectsConfig;
use crate::errors::CameraError;
use crate::state::{CameraStateStore, Subscription};
use crate::types::{CameraDirection, Orientation};
use crossbeam_channel::{bounded, select, Receiver, Sender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;

struct Worker {
    stop_tx: Sender<()>,
    handle: JoinHandle<()>,
}

/// Engine plus what has been applied to it
struct LiveEngine {
    factory: Arc<dyn EngineFactory>,
    engine: Option<Box<dyn EffectsEngine>>,
    direction: CameraDirection,
    config: EffectsConfig,
    torch: bool,
}

impl LiveEngine {
    fn open(
        factory: Arc<dyn EngineFactory>,
        direction: CameraDirection,
        config: EffectsConfig,
        torch: bool,
    ) -> Result<Self, CameraError> {
        let engine = build_engine(factory.as_ref(), direction, &config, torch)?;
        Ok(Self {
            factory,
            engine: Some(engine),
            direction,
            config,
            torch,
        })
    }

    fn switch_direction(&mut self, direction: CameraDirection, config: EffectsConfig, torch: bool) {
        if direction == self.direction && self.engine.is_some() {
            return;
        }
        log::info!("Switching camera {} -> {}", self.direction, direction);
        if let Some(mut old) = self.engine.take() {
            old.shutdown();
        }
        self.direction = direction;
        self.config = config;
        self.torch = torch;
        match build_engine(self.factory.as_ref(), direction, &self.config, torch) {
            Ok(engine) => self.engine = Some(engine),
            Err(e) => log::error!("Failed to open {} camera: {}", direction, e),
        }
    }

    fn apply_config(&mut self, config: EffectsConfig) {
        if config == self.config {
            return;
        }
        self.config = config;
        if let Some(engine) = self.engine.as_mut() {
            if let Err(e) = engine.configure(&self.config) {
                log::warn!("Effects engine rejected configuration: {}", e);
            }
        }
    }

    fn apply_torch(&mut self, torch: bool) {
        if torch == self.torch {
            return;
        }
        self.torch = torch;
        if let Some(engine) = self.engine.as_mut() {
            if let Err(e) = engine.set_torch(torch) {
                log::warn!("Failed to set torch {}: {}", torch, e);
            }
        }
    }
}

impl Drop for LiveEngine {
    fn drop(&mut self) {
        if let Some(mut engine) = self.engine.take() {
            engine.shutdown();
        }
    }
}

fn build_engine(
    factory: &dyn EngineFactory,
    direction: CameraDirection,
    config: &EffectsConfig,
    torch: bool,
) -> Result<Box<dyn EffectsEngine>, CameraError> {
    let mut engine = factory.create(direction)?;
    let applied = engine.configure(config).and_then(|_| engine.set_torch(torch));
    if let Err(e) = applied {
        engine.shutdown();
        return Err(e);
    }
    log::info!("Effects pipeline running on {} camera", direction);
    Ok(engine)
}

/// Keeps the external effects engine in sync with a `CameraStateStore`.
///
/// While enabled, a dedicated thread named `fxcam-pipeline` owns the engine;
/// every engine call happens on that thread.
pub struct PipelineController {
    store: Arc<CameraStateStore>,
    factory: Arc<dyn EngineFactory>,
    worker: Mutex<Option<Worker>>,
    active_direction: Arc<Mutex<Option<CameraDirection>>>,
}

impl PipelineController {
    pub fn new(store: Arc<CameraStateStore>, factory: Arc<dyn EngineFactory>) -> Self {
        Self {
            store,
            factory,
            worker: Mutex::new(None),
            active_direction: Arc::new(Mutex::new(None)),
        }
    }

    fn worker(&self) -> MutexGuard<'_, Option<Worker>> {
        self.worker.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start the pipeline. Returns false if it was already running.
    ///
    /// The first engine is created on the calling thread so that a camera
    /// failure reaches the caller; the controller stays disabled in that case.
    pub fn enable(&self) -> Result<bool, CameraError> {
        let mut worker = self.worker();
        if worker.is_some() {
            return Ok(false);
        }

        // Subscribe before reading so no change between the two is lost.
        let directions = self.store.observe_direction();
        let configs = self.store.observe_configuration();
        let torches = self.store.observe_flash_enabled();
        let snapshot = self.store.snapshot();

        let live = LiveEngine::open(
            self.factory.clone(),
            snapshot.direction,
            snapshot.configuration,
            snapshot.flash_enabled,
        )?;
        *lock_direction(&self.active_direction) = Some(snapshot.direction);

        let (stop_tx, stop_rx) = bounded(1);
        let store = self.store.clone();
        let active_direction = self.active_direction.clone();
        let handle = std::thread::Builder::new()
            .name("fxcam-pipeline".to_string())
            .spawn(move || {
                reconcile_loop(live, store, stop_rx, directions, configs, torches, active_direction)
            })?;

        *worker = Some(Worker { stop_tx, handle });
        Ok(true)
    }

    /// Stop the pipeline and release the camera before returning.
    /// Returns false if it was not running.
    pub fn disable(&self) -> Result<bool, CameraError> {
        let Some(worker) = self.worker().take() else {
            return Ok(false);
        };
        let _ = worker.stop_tx.send(());
        let joined = worker.handle.join();
        *lock_direction(&self.active_direction) = None;
        joined
            .map(|_| true)
            .map_err(|_| CameraError::PipelineError("pipeline thread panicked".to_string()))
    }

    pub fn is_enabled(&self) -> bool {
        self.worker().is_some()
    }

    /// Direction of the camera the engine is currently bound to
    pub fn active_direction(&self) -> Option<CameraDirection> {
        *lock_direction(&self.active_direction)
    }

    /// Device rotation callback. The platform reports rotation
    /// counter-clockwise; the store holds clockwise degrees.
    pub fn on_device_rotation(&self, ccw_degrees: i32) -> Result<bool, CameraError> {
        let orientation = Orientation::from_counter_clockwise(ccw_degrees)?;
        Ok(self.store.set_orientation(orientation))
    }
}

impl Drop for PipelineController {
    fn drop(&mut self) {
        if let Err(e) = self.disable() {
            log::warn!("Error stopping pipeline in drop: {}", e);
        }
    }
}

fn lock_direction(m: &Mutex<Option<CameraDirection>>) -> MutexGuard<'_, Option<CameraDirection>> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

fn reconcile_loop(
    mut live: LiveEngine,
    store: Arc<CameraStateStore>,
    stop_rx: Receiver<()>,
    directions: Subscription<CameraDirection>,
    configs: Subscription<EffectsConfig>,
    torches: Subscription<bool>,
    active_direction: Arc<Mutex<Option<CameraDirection>>>,
) {
    loop {
        select! {
            recv(stop_rx) -> _ => break,
            recv(directions.receiver()) -> msg => match msg {
                Ok(direction) => {
                    // Re-apply the freshest settings, not whatever is still queued.
                    live.switch_direction(direction, store.configuration(), store.flash_enabled());
                    *lock_direction(&active_direction) =
                        live.engine.as_ref().map(|_| live.direction);
                }
                Err(_) => break,
            },
            recv(configs.receiver()) -> msg => match msg {
                Ok(config) => live.apply_config(config),
                Err(_) => break,
            },
            recv(torches.receiver()) -> msg => match msg {
                Ok(torch) => live.apply_torch(torch),
                Err(_) => break,
            },
        }
    }
    drop(live);
    log::info!("Effects pipeline stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{EngineCall, MockEngineFactory};
    use std::time::Duration;

    fn wait_until(mut cond: impl FnMut() -> bool) -> bool {
        for _ in 0..200 {
            if cond() {
                return true;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        false
    }

    #[test]
    fn test_enable_is_idempotent() {
        let store = Arc::new(CameraStateStore::default());
        let factory = Arc::new(MockEngineFactory::new());
        let controller = PipelineController::new(store, factory.clone());
        assert!(controller.enable().unwrap());
        assert!(!controller.enable().unwrap());
        assert_eq!(factory.created(), 1);
        assert!(controller.disable().unwrap());
        assert!(!controller.disable().unwrap());
        assert_eq!(factory.shutdowns(), 1);
    }

    #[test]
    fn test_enable_failure_leaves_disabled() {
        let store = Arc::new(CameraStateStore::default());
        let factory = Arc::new(MockEngineFactory::new());
        factory.fail_next_create();
        let controller = PipelineController::new(store, factory.clone());
        assert!(controller.enable().is_err());
        assert!(!controller.is_enabled());
        assert_eq!(controller.active_direction(), None);
    }

    #[test]
    fn test_config_change_forwarded() {
        let store = Arc::new(CameraStateStore::default());
        let factory = Arc::new(MockEngineFactory::new());
        let controller = PipelineController::new(store.clone(), factory.clone());
        controller.enable().unwrap();

        let blurred = EffectsConfig::default().with_blur(0.7).unwrap();
        store.set_configuration(blurred.clone());
        assert!(wait_until(|| factory
            .calls()
            .contains(&EngineCall::Configure(CameraDirection::Front, blurred.clone()))));
        controller.disable().unwrap();
    }

    #[test]
    fn test_rotation_is_converted() {
        let store = Arc::new(CameraStateStore::default());
        let controller = PipelineController::new(store.clone(), Arc::new(MockEngineFactory::new()));
        assert!(controller.on_device_rotation(90).unwrap());
        assert_eq!(store.orientation(), Orientation::Deg270);
        assert!(controller.on_device_rotation(45).is_err());
    }
}
