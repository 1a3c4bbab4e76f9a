//! Camera state store
//!
//! Single source of truth for camera-adjacent state. Construct one per
//! camera session and share it behind an `Arc`.

use super::cell::{StateCell, Subscription};
use crate::effects::EffectsConfig;
use crate::errors::CameraError;
use crate::types::{CameraDirection, FlashMode, Orientation};
use serde::Serialize;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Flash inputs. `flash_enabled` is always computed from these.
#[derive(Debug, Clone, Copy)]
struct FlashInputs {
    mode: FlashMode,
    /// Last explicit torch request made while in `Auto`
    auto_override: Option<bool>,
}

impl FlashInputs {
    fn enabled(&self) -> bool {
        match self.mode {
            FlashMode::On => true,
            FlashMode::Off => false,
            FlashMode::Auto => self.auto_override.unwrap_or(false),
        }
    }
}

/// Point-in-time copy of every cell
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CameraStateSnapshot {
    pub orientation: Orientation,
    pub direction: CameraDirection,
    pub flash_mode: FlashMode,
    pub flash_enabled: bool,
    pub configuration: EffectsConfig,
}

pub struct CameraStateStore {
    orientation: StateCell<Orientation>,
    direction: StateCell<CameraDirection>,
    flash_mode: StateCell<FlashMode>,
    flash_enabled: StateCell<bool>,
    configuration: StateCell<EffectsConfig>,
    // Serializes flash writes so mode and enabled are published together.
    flash: Mutex<FlashInputs>,
}

impl Default for CameraStateStore {
    fn default() -> Self {
        Self::new(CameraDirection::default(), FlashMode::default(), EffectsConfig::default())
    }
}

impl CameraStateStore {
    pub fn new(direction: CameraDirection, flash_mode: FlashMode, configuration: EffectsConfig) -> Self {
        let flash = FlashInputs {
            mode: flash_mode,
            auto_override: None,
        };
        Self {
            orientation: StateCell::new("orientation", Orientation::Deg0),
            direction: StateCell::new("direction", direction),
            flash_mode: StateCell::new("flash_mode", flash_mode),
            flash_enabled: StateCell::new("flash_enabled", flash.enabled()),
            configuration: StateCell::new("configuration", configuration),
            flash: Mutex::new(flash),
        }
    }

    fn flash_inputs(&self) -> MutexGuard<'_, FlashInputs> {
        self.flash.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_orientation(&self, orientation: Orientation) -> bool {
        self.orientation.set(orientation)
    }

    pub fn set_direction(&self, direction: CameraDirection) -> bool {
        let changed = self.direction.set(direction);
        if changed {
            log::info!("Camera direction set to {}", direction);
        }
        changed
    }

    /// Change flash mode and recompute `flash_enabled`.
    ///
    /// Switching to `Auto` resets the torch to off; any earlier manual
    /// request is forgotten.
    pub fn set_flash_mode(&self, mode: FlashMode) -> bool {
        let mut flash = self.flash_inputs();
        if flash.mode == mode {
            return false;
        }
        flash.mode = mode;
        flash.auto_override = None;
        self.flash_mode.set(mode);
        self.flash_enabled.set(flash.enabled());
        true
    }

    /// Request the torch on or off. Only honoured in `Auto`; under `On` or
    /// `Off` the mode dictates the value and the call is a no-op.
    pub fn set_flash_enabled(&self, enabled: bool) -> bool {
        let mut flash = self.flash_inputs();
        if flash.mode != FlashMode::Auto {
            log::debug!(
                "Ignoring flash_enabled={} while flash mode is {:?}",
                enabled,
                flash.mode
            );
            return false;
        }
        flash.auto_override = Some(enabled);
        self.flash_enabled.set(flash.enabled())
    }

    /// Replace the whole effects configuration (last write wins)
    pub fn set_configuration(&self, configuration: EffectsConfig) -> bool {
        self.configuration.set(configuration)
    }

    /// Derive a new configuration from the current one atomically.
    ///
    /// Validation errors from `f` leave the stored configuration untouched.
    pub fn update_configuration(
        &self,
        f: impl FnOnce(EffectsConfig) -> Result<EffectsConfig, CameraError>,
    ) -> Result<bool, CameraError> {
        self.configuration.update(|current| f(current.clone()))
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation.get()
    }

    pub fn direction(&self) -> CameraDirection {
        self.direction.get()
    }

    pub fn flash_mode(&self) -> FlashMode {
        self.flash_mode.get()
    }

    pub fn flash_enabled(&self) -> bool {
        self.flash_enabled.get()
    }

    pub fn configuration(&self) -> EffectsConfig {
        self.configuration.get()
    }

    pub fn observe_orientation(&self) -> Subscription<Orientation> {
        self.orientation.subscribe()
    }

    pub fn observe_direction(&self) -> Subscription<CameraDirection> {
        self.direction.subscribe()
    }

    pub fn observe_flash_mode(&self) -> Subscription<FlashMode> {
        self.flash_mode.subscribe()
    }

    pub fn observe_flash_enabled(&self) -> Subscription<bool> {
        self.flash_enabled.subscribe()
    }

    pub fn observe_configuration(&self) -> Subscription<EffectsConfig> {
        self.configuration.subscribe()
    }

    pub fn snapshot(&self) -> CameraStateSnapshot {
        let (flash_mode, flash_enabled) = {
            let flash = self.flash_inputs();
            (flash.mode, flash.enabled())
        };
        CameraStateSnapshot {
            orientation: self.orientation(),
            direction: self.direction(),
            flash_mode,
            flash_enabled,
            configuration: self.configuration(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let store = CameraStateStore::default();
        assert_eq!(store.orientation(), Orientation::Deg0);
        assert_eq!(store.direction(), CameraDirection::Front);
        assert_eq!(store.flash_mode(), FlashMode::Off);
        assert!(!store.flash_enabled());
        assert!(store.configuration().is_passthrough());
    }

    #[test]
    fn test_flash_mode_drives_enabled() {
        let store = CameraStateStore::default();
        store.set_flash_mode(FlashMode::On);
        assert!(store.flash_enabled());
        store.set_flash_enabled(false);
        assert!(store.flash_enabled());
        store.set_flash_mode(FlashMode::Off);
        assert!(!store.flash_enabled());
        store.set_flash_enabled(true);
        assert!(!store.flash_enabled());
    }

    #[test]
    fn test_auto_resets_and_accepts_overrides() {
        let store = CameraStateStore::default();
        store.set_flash_mode(FlashMode::On);
        store.set_flash_mode(FlashMode::Auto);
        assert!(!store.flash_enabled());
        assert!(store.set_flash_enabled(true));
        assert!(store.flash_enabled());
        assert!(store.set_flash_enabled(false));
        assert!(!store.flash_enabled());
    }

    #[test]
    fn test_mode_observers_see_each_change_once() {
        let store = CameraStateStore::default();
        let modes = store.observe_flash_mode();
        let enabled = store.observe_flash_enabled();
        store.set_flash_mode(FlashMode::Auto);
        store.set_flash_mode(FlashMode::Auto);
        store.set_flash_enabled(true);
        store.set_flash_mode(FlashMode::On);
        assert_eq!(
            modes.drain(),
            vec![FlashMode::Off, FlashMode::Auto, FlashMode::On]
        );
        assert_eq!(enabled.drain(), vec![false, true]);
    }

    #[test]
    fn test_update_configuration_rejects_invalid() {
        let store = CameraStateStore::default();
        let err = store
            .update_configuration(|cfg| cfg.with_blur(3.0))
            .unwrap_err();
        assert!(err.is_validation());
        assert!(store.configuration().is_passthrough());

        assert!(store.update_configuration(|cfg| cfg.with_blur(0.3)).unwrap());
        assert!(!store.configuration().is_passthrough());
    }

    #[test]
    fn test_snapshot() {
        let store = CameraStateStore::default();
        store.set_orientation(Orientation::Deg270);
        store.set_direction(CameraDirection::Back);
        let snap = store.snapshot();
        assert_eq!(snap.orientation, Orientation::Deg270);
        assert_eq!(snap.direction, CameraDirection::Back);
        assert!(!snap.flash_enabled);
    }
}
