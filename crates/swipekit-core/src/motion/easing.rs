//! L4 Atomic Layer: Pure easing functions for settle animations
//!
//! Provides mathematical easing functions that map input [0, 1] to output [0, 1]
//! with various deceleration curves.

use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

/// Built-in settle curves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EasingType {
    /// Jump to the end on the last frame
    None,
    Linear,
    Cubic,
    /// f(t) = (t-1)⁵ + 1
    #[default]
    Quintic,
    EaseOut,
}

impl EasingType {
    /// Apply the easing function to a progress value
    ///
    /// # Arguments
    /// * `t` - Progress value in range [0, 1]
    ///
    /// # Returns
    /// Eased value in range [0, 1]
    #[inline]
    pub fn apply(self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            EasingType::None => {
                if t < 1.0 {
                    0.0
                } else {
                    1.0
                }
            }
            EasingType::Linear => t,
            EasingType::Cubic => cubic_ease_out(t),
            EasingType::Quintic => quintic_ease_out(t),
            EasingType::EaseOut => exponential_ease_out(t),
        }
    }
}

/// Cubic ease-out: f(t) = 1 - (1-t)³
#[inline]
fn cubic_ease_out(t: f32) -> f32 {
    let inv = 1.0 - t;
    1.0 - inv * inv * inv
}

/// Quintic ease-out: f(t) = 1 - (1-t)⁵
#[inline]
fn quintic_ease_out(t: f32) -> f32 {
    let inv = 1.0 - t;
    1.0 - inv * inv * inv * inv * inv
}

/// Exponential ease-out: f(t) = 1 - 2^(-10t)
#[inline]
fn exponential_ease_out(t: f32) -> f32 {
    if t >= 1.0 {
        1.0
    } else {
        1.0 - 2.0_f32.powf(-10.0 * t)
    }
}

/// Interpolator used by a settle animation: a built-in curve or a host-provided function
#[derive(Clone)]
pub enum Interpolator {
    Easing(EasingType),
    Custom(Rc<dyn Fn(f32) -> f32>),
}

impl Interpolator {
    pub fn custom(f: impl Fn(f32) -> f32 + 'static) -> Self {
        Interpolator::Custom(Rc::new(f))
    }

    #[inline]
    pub fn interpolate(&self, t: f32) -> f32 {
        match self {
            Interpolator::Easing(easing) => easing.apply(t),
            Interpolator::Custom(f) => f(t.clamp(0.0, 1.0)),
        }
    }
}

impl Default for Interpolator {
    fn default() -> Self {
        Interpolator::Easing(EasingType::default())
    }
}

impl From<EasingType> for Interpolator {
    fn from(easing: EasingType) -> Self {
        Interpolator::Easing(easing)
    }
}

impl fmt::Debug for Interpolator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Interpolator::Easing(easing) => write!(f, "Interpolator::{:?}", easing),
            Interpolator::Custom(_) => f.write_str("Interpolator::Custom"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_easing_boundaries() {
        for easing in [
            EasingType::None,
            EasingType::Linear,
            EasingType::Cubic,
            EasingType::Quintic,
            EasingType::EaseOut,
        ] {
            // t=0 should give 0 (except None which jumps)
            if easing != EasingType::None {
                assert!((easing.apply(0.0) - 0.0).abs() < 0.001, "{:?} at t=0", easing);
            }
            // t=1 should give 1
            assert!((easing.apply(1.0) - 1.0).abs() < 0.001, "{:?} at t=1", easing);
        }
    }

    #[test]
    fn test_easing_monotonic() {
        for easing in [
            EasingType::Linear,
            EasingType::Cubic,
            EasingType::Quintic,
            EasingType::EaseOut,
        ] {
            let mut prev = 0.0;
            for i in 0..=10 {
                let t = i as f32 / 10.0;
                let v = easing.apply(t);
                assert!(v >= prev, "{:?} not monotonic at t={}", easing, t);
                prev = v;
            }
        }
    }

    #[test]
    fn test_quintic_matches_shifted_power() {
        for i in 0..=20 {
            let t = i as f32 / 20.0;
            let expected = (t - 1.0).powi(5) + 1.0;
            assert!((EasingType::Quintic.apply(t) - expected).abs() < 1e-5);
        }
    }

    #[test]
    fn test_custom_interpolator_clamps_input() {
        let interpolator = Interpolator::custom(|t| t * t);
        assert_eq!(interpolator.interpolate(2.0), 1.0);
        assert_eq!(interpolator.interpolate(0.5), 0.25);
        assert!(matches!(
            Interpolator::default(),
            Interpolator::Easing(EasingType::Quintic)
        ));
    }
}
