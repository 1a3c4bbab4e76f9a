//! Live effects pipeline reconciliation
//!
//! The effects engine is bound to one physical sensor. `PipelineController`
//! keeps a running engine in line with the state store: configuration and
//! torch changes are forwarded, and a direction change tears the engine down
//! and builds a new one with the current configuration re-applied.

mod controller;

pub use controller::PipelineController;

use crate::effects::EffectsConfig;
use crate::errors::CameraError;
use crate::types::CameraDirection;

/// External effects engine bound to a camera
pub trait EffectsEngine: Send {
    /// Apply a complete configuration
    fn configure(&mut self, config: &EffectsConfig) -> Result<(), CameraError>;

    /// Drive the flash LED in torch mode
    fn set_torch(&mut self, enabled: bool) -> Result<(), CameraError>;

    /// Release the camera. Called exactly once, before the engine is dropped.
    fn shutdown(&mut self);
}

/// Builds engines for a given camera direction
pub trait EngineFactory: Send + Sync {
    fn create(&self, direction: CameraDirection) -> Result<Box<dyn EffectsEngine>, CameraError>;
}
