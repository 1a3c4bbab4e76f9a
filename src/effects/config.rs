//! Effects configuration consumed by the external effects engine

use super::validation::{BlurPower, Percent, Power};
use crate::errors::CameraError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Reference to an image the engine loads itself
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageSource {
    /// Image file on disk
    Path(PathBuf),
    /// Bundled asset identified by name
    Asset(String),
}

/// What happens behind the subject. Exactly one mode is active.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", content = "value", rename_all = "snake_case")]
pub enum BackgroundMode {
    #[default]
    Regular,
    Remove,
    Replace(ImageSource),
    Blur(BlurPower),
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ColorCorrection {
    #[default]
    NoFilter,
    ColorCorrection,
    /// Grade frames to match a reference (LUT) image
    ColorGrading(ImageSource),
    Preset,
}

/// Immutable description of the visual transformation applied to frames.
///
/// Every setter returns a new value; a configuration is never changed in
/// place, so consumers always hold a complete, valid object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectsConfig {
    background: BackgroundMode,
    smart_zoom: Option<Percent>,
    beautification: Option<Percent>,
    color_correction: ColorCorrection,
    color_correction_power: Power,
    sharpness_power: Option<Power>,
}

impl Default for EffectsConfig {
    fn default() -> Self {
        Self {
            background: BackgroundMode::Regular,
            smart_zoom: None,
            beautification: None,
            color_correction: ColorCorrection::NoFilter,
            color_correction_power: Power::ONE,
            sharpness_power: None,
        }
    }
}

impl EffectsConfig {
    pub fn new(
        background: BackgroundMode,
        smart_zoom: Option<Percent>,
        beautification: Option<Percent>,
        color_correction: ColorCorrection,
        color_correction_power: Power,
        sharpness_power: Option<Power>,
    ) -> Self {
        Self {
            background,
            smart_zoom,
            beautification,
            color_correction,
            color_correction_power,
            sharpness_power,
        }
    }

    pub fn background(&self) -> &BackgroundMode {
        &self.background
    }

    pub fn smart_zoom(&self) -> Option<Percent> {
        self.smart_zoom
    }

    pub fn beautification(&self) -> Option<Percent> {
        self.beautification
    }

    pub fn color_correction(&self) -> &ColorCorrection {
        &self.color_correction
    }

    pub fn color_correction_power(&self) -> Power {
        self.color_correction_power
    }

    pub fn sharpness_power(&self) -> Option<Power> {
        self.sharpness_power
    }

    pub fn with_background(self, background: BackgroundMode) -> Self {
        Self { background, ..self }
    }

    /// Shorthand for `Blur` with a checked power
    pub fn with_blur(self, power: f32) -> Result<Self, CameraError> {
        Ok(self.with_background(BackgroundMode::Blur(BlurPower::new(power)?)))
    }

    /// `None` disables smart zoom
    pub fn with_smart_zoom(self, percent: Option<i64>) -> Result<Self, CameraError> {
        let smart_zoom = percent.map(Percent::new).transpose()?;
        Ok(Self { smart_zoom, ..self })
    }

    /// `None` disables beautification
    pub fn with_beautification(self, percent: Option<i64>) -> Result<Self, CameraError> {
        let beautification = percent.map(Percent::new).transpose()?;
        Ok(Self {
            beautification,
            ..self
        })
    }

    pub fn with_color_correction(
        self,
        color_correction: ColorCorrection,
        power: f32,
    ) -> Result<Self, CameraError> {
        let color_correction_power = Power::new(power)?;
        Ok(Self {
            color_correction,
            color_correction_power,
            ..self
        })
    }

    pub fn with_sharpness(self, power: Option<f32>) -> Result<Self, CameraError> {
        let sharpness_power = power.map(Power::new).transpose()?;
        Ok(Self {
            sharpness_power,
            ..self
        })
    }

    /// True when the engine has nothing to do
    pub fn is_passthrough(&self) -> bool {
        self.background == BackgroundMode::Regular
            && self.smart_zoom.is_none()
            && self.beautification.is_none()
            && self.color_correction == ColorCorrection::NoFilter
            && self.sharpness_power.is_none()
    }
}
