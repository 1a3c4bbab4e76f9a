//! Pipeline reconciliation tests
//!
//! Direction switches must rebuild the engine without losing configuration
//! or torch state.

use fxcam::effects::{BackgroundMode, ColorCorrection, EffectsConfig};
use fxcam::pipeline::PipelineController;
use fxcam::state::CameraStateStore;
use fxcam::testing::{EngineCall, MockEngineFactory};
use fxcam::types::{CameraDirection, FlashMode, Orientation};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn wait_until(mut cond: impl FnMut() -> bool) -> bool {
    for _ in 0..400 {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    false
}

fn styled_config() -> EffectsConfig {
    EffectsConfig::default()
        .with_background(BackgroundMode::Remove)
        .with_smart_zoom(Some(60))
        .unwrap()
        .with_color_correction(ColorCorrection::ColorCorrection, 0.8)
        .unwrap()
}

#[test]
fn enable_applies_current_state() {
    let config = styled_config();
    let store = Arc::new(CameraStateStore::new(CameraDirection::Back, FlashMode::On, config.clone()));
    let factory = MockEngineFactory::new();
    let controller = PipelineController::new(store, Arc::new(factory.clone()));

    assert!(controller.enable().unwrap());
    assert_eq!(controller.active_direction(), Some(CameraDirection::Back));
    assert_eq!(
        factory.calls(),
        vec![
            EngineCall::Create(CameraDirection::Back),
            EngineCall::Configure(CameraDirection::Back, config),
            EngineCall::Torch(CameraDirection::Back, true),
        ]
    );
    controller.disable().unwrap();
}

#[test]
fn direction_switch_recreates_engine_with_same_config() {
    let store = Arc::new(CameraStateStore::default());
    let factory = MockEngineFactory::new();
    let controller = PipelineController::new(store.clone(), Arc::new(factory.clone()));
    controller.enable().unwrap();

    let config = styled_config();
    store.set_configuration(config.clone());
    assert!(wait_until(|| factory
        .calls()
        .contains(&EngineCall::Configure(CameraDirection::Front, config.clone()))));

    store.set_direction(CameraDirection::Back);
    assert!(wait_until(|| factory
        .calls()
        .contains(&EngineCall::Configure(CameraDirection::Back, config.clone()))));
    assert_eq!(controller.active_direction(), Some(CameraDirection::Back));

    let calls = factory.calls();
    let shutdown_front = calls
        .iter()
        .position(|c| *c == EngineCall::Shutdown(CameraDirection::Front))
        .unwrap();
    let create_back = calls
        .iter()
        .position(|c| *c == EngineCall::Create(CameraDirection::Back))
        .unwrap();
    assert!(shutdown_front < create_back, "old engine released first");
    assert_eq!(store.configuration(), config);

    controller.disable().unwrap();
    assert_eq!(factory.created(), 2);
    assert_eq!(factory.shutdowns(), 2);
}

#[test]
fn torch_state_survives_direction_switch() {
    let store = Arc::new(CameraStateStore::default());
    let factory = MockEngineFactory::new();
    let controller = PipelineController::new(store.clone(), Arc::new(factory.clone()));
    controller.enable().unwrap();

    store.set_flash_mode(FlashMode::On);
    assert!(wait_until(|| factory
        .calls()
        .contains(&EngineCall::Torch(CameraDirection::Front, true))));

    store.set_direction(CameraDirection::Back);
    assert!(wait_until(|| factory
        .calls()
        .contains(&EngineCall::Torch(CameraDirection::Back, true))));
    controller.disable().unwrap();
}

#[test]
fn failed_switch_retries_on_next_change() {
    let store = Arc::new(CameraStateStore::default());
    let factory = MockEngineFactory::new();
    let controller = PipelineController::new(store.clone(), Arc::new(factory.clone()));
    controller.enable().unwrap();

    factory.fail_next_create();
    store.set_direction(CameraDirection::Back);
    assert!(wait_until(|| controller.active_direction().is_none()));
    assert!(controller.is_enabled());

    store.set_direction(CameraDirection::Front);
    assert!(wait_until(|| controller.active_direction() == Some(CameraDirection::Front)));
    assert_eq!(factory.created(), 2);
    controller.disable().unwrap();
}

#[test]
fn disable_releases_engine_and_ignores_later_changes() {
    let store = Arc::new(CameraStateStore::default());
    let factory = MockEngineFactory::new();
    let controller = PipelineController::new(store.clone(), Arc::new(factory.clone()));
    controller.enable().unwrap();
    assert!(controller.disable().unwrap());
    assert_eq!(factory.shutdowns(), 1);
    assert_eq!(controller.active_direction(), None);

    let before = factory.calls().len();
    store.set_direction(CameraDirection::Back);
    store.set_configuration(styled_config());
    thread::sleep(Duration::from_millis(30));
    assert_eq!(factory.calls().len(), before);

    // Re-enabling binds to the current direction
    controller.enable().unwrap();
    assert_eq!(controller.active_direction(), Some(CameraDirection::Back));
    controller.disable().unwrap();
}

#[test]
fn dropping_controller_shuts_engine_down() {
    let store = Arc::new(CameraStateStore::default());
    let factory = MockEngineFactory::new();
    {
        let controller = PipelineController::new(store, Arc::new(factory.clone()));
        controller.enable().unwrap();
    }
    assert_eq!(factory.shutdowns(), 1);
}

#[test]
fn device_rotation_is_converted_to_clockwise() {
    let store = Arc::new(CameraStateStore::default());
    let controller = PipelineController::new(store.clone(), Arc::new(MockEngineFactory::new()));

    let cases = [(0, Orientation::Deg0), (90, Orientation::Deg270), (180, Orientation::Deg180), (270, Orientation::Deg90)];
    for (ccw, expected) in cases {
        controller.on_device_rotation(ccw).unwrap();
        assert_eq!(store.orientation(), expected, "ccw {}", ccw);
    }
    assert!(!controller.on_device_rotation(630).unwrap(), "630 ccw is 90 cw, unchanged");
    assert!(controller.on_device_rotation(30).is_err());
}
