//! Effects configuration
//!
//! The value handed to the external effects engine. Numeric parameters are
//! validated when the value is built, and the background and colour
//! correction variants carry their own payloads, so an invalid
//! configuration cannot be represented.

mod config;
mod validation;

pub use config::{BackgroundMode, ColorCorrection, EffectsConfig, ImageSource};
pub use validation::{BlurPower, Percent, Power};
