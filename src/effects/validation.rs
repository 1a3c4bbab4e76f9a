//! Range-checked numeric newtypes for effect parameters
//!
//! Values are checked once, at construction. Out-of-range input is an
//! error; nothing is clamped.

use crate::errors::CameraError;
use serde::{Deserialize, Serialize};

/// Background blur strength in `[0.0, 1.0]`
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f32", into = "f32")]
pub struct BlurPower(f32);

impl BlurPower {
    pub const MIN: f32 = 0.0;
    pub const MAX: f32 = 1.0;

    pub fn new(value: f32) -> Result<Self, CameraError> {
        if value.is_finite() && (Self::MIN..=Self::MAX).contains(&value) {
            Ok(Self(value))
        } else {
            Err(CameraError::invalid(format!(
                "blur power must be between {} and {}, got {}",
                Self::MIN,
                Self::MAX,
                value
            )))
        }
    }

    pub fn value(&self) -> f32 {
        self.0
    }
}

impl TryFrom<f32> for BlurPower {
    type Error = CameraError;

    fn try_from(value: f32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<BlurPower> for f32 {
    fn from(value: BlurPower) -> Self {
        value.0
    }
}

/// Integer percentage in `[0, 100]`, used by smart zoom and beautification
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct Percent(u8);

impl Percent {
    pub const MAX: u8 = 100;

    pub fn new(value: i64) -> Result<Self, CameraError> {
        if (0..=Self::MAX as i64).contains(&value) {
            Ok(Self(value as u8))
        } else {
            Err(CameraError::invalid(format!(
                "percentage must be between 0 and {}, got {}",
                Self::MAX,
                value
            )))
        }
    }

    pub fn value(&self) -> u8 {
        self.0
    }

    pub fn as_fraction(&self) -> f32 {
        self.0 as f32 / Self::MAX as f32
    }
}

impl TryFrom<i64> for Percent {
    type Error = CameraError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Percent> for u8 {
    fn from(value: Percent) -> Self {
        value.0
    }
}

/// Non-negative, finite intensity multiplier
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f32", into = "f32")]
pub struct Power(f32);

impl Power {
    pub const ONE: Power = Power(1.0);

    pub fn new(value: f32) -> Result<Self, CameraError> {
        if value.is_finite() && value >= 0.0 {
            Ok(Self(value))
        } else {
            Err(CameraError::invalid(format!(
                "power must be a finite non-negative number, got {}",
                value
            )))
        }
    }

    pub fn value(&self) -> f32 {
        self.0
    }
}

impl TryFrom<f32> for Power {
    type Error = CameraError;

    fn try_from(value: f32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Power> for f32 {
    fn from(value: Power) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blur_bounds() {
        assert!(BlurPower::new(0.0).is_ok());
        assert!(BlurPower::new(1.0).is_ok());
        assert!(BlurPower::new(-0.01).is_err());
        assert!(BlurPower::new(1.01).is_err());
        assert!(BlurPower::new(f32::NAN).is_err());
    }

    #[test]
    fn test_percent_bounds() {
        assert_eq!(Percent::new(0).unwrap().value(), 0);
        assert_eq!(Percent::new(100).unwrap().value(), 100);
        assert!(Percent::new(101).is_err());
        assert!(Percent::new(-1).is_err());
    }

    #[test]
    fn test_out_of_range_is_not_clamped() {
        let err = Percent::new(150).unwrap_err();
        assert!(err.is_validation());
        assert!(err.to_string().contains("150"));
    }

    #[test]
    fn test_power_rejects_infinite() {
        assert!(Power::new(f32::INFINITY).is_err());
        assert!(Power::new(-1.0).is_err());
        assert_eq!(Power::new(2.5).unwrap().value(), 2.5);
    }

    #[test]
    fn test_deserialize_validates() {
        let ok: Percent = serde_json::from_str("42").unwrap();
        assert_eq!(ok.value(), 42);
        assert!(serde_json::from_str::<Percent>("420").is_err());
        assert!(serde_json::from_str::<BlurPower>("1.5").is_err());
    }
}
