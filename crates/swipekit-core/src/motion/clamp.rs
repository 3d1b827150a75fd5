//! L4 Atomic Layer: Distance clamping, progress and distance calculators

use crate::error::{Error, Result};
use crate::input::{Axis, Direction, Directions};

/// Maps the clamped swipe distance to what is actually displayed.
///
/// `open_distance` converts the configured open distance into the clamped
/// distance at which progress reaches 1, so that the displayed distance at
/// full open still equals the configured one.
pub trait DistanceCalculator {
    fn display_distance(&self, clamped: f32, progress: f32) -> f32;

    fn open_distance(&self, open_distance: f32) -> f32;
}

/// Linear damping: the surface moves `scale` pixels per pixel of swipe
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaledCalculator {
    scale: f32,
}

impl ScaledCalculator {
    /// Fails for a non-positive or non-finite scale
    pub fn new(scale: f32) -> Result<Self> {
        if !(scale > 0.0) || !scale.is_finite() {
            return Err(Error::invalid("scale", scale));
        }
        Ok(Self { scale })
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }
}

impl DistanceCalculator for ScaledCalculator {
    #[inline]
    fn display_distance(&self, clamped: f32, _progress: f32) -> f32 {
        clamped * self.scale
    }

    #[inline]
    fn open_distance(&self, open_distance: f32) -> f32 {
        open_distance / self.scale
    }
}

/// Clamp a raw distance on `axis` for the committed direction.
///
/// Opening towards positive coordinates (left, top) keeps the distance in
/// `[0, max]`, the opposite directions in `[-max, 0]`. Any axis other than the
/// committed direction's axis is pinned to zero.
pub fn clamp_distance(
    direction: Option<Direction>,
    enabled: Directions,
    axis: Axis,
    distance: f32,
    max: f32,
) -> f32 {
    let max = if max.is_nan() { 0.0 } else { max.max(0.0) };
    match direction {
        Some(dir) if dir.axis() == axis && enabled.contains(dir.flag()) => {
            if dir.sign() > 0.0 {
                distance.clamp(0.0, max)
            } else {
                distance.clamp(-max, 0.0)
            }
        }
        _ => 0.0,
    }
}

/// Normalized completion for a clamped distance
#[inline]
pub fn progress_for(distance: f32, open_distance: f32) -> f32 {
    if open_distance <= 0.0 {
        0.0
    } else {
        (distance / open_distance).abs()
    }
}

/// Leftover distance from an interrupted session, applied once per axis
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CarryOver {
    x: f32,
    y: f32,
}

impl CarryOver {
    /// Remember the current distance unless it is zero
    pub fn capture(&mut self, x: f32, y: f32) {
        if x != 0.0 || y != 0.0 {
            self.x = x;
            self.y = y;
        }
    }

    pub fn take(&mut self, axis: Axis) -> f32 {
        match axis {
            Axis::Horizontal => std::mem::take(&mut self.x),
            Axis::Vertical => std::mem::take(&mut self.y),
        }
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn is_empty(&self) -> bool {
        self.x == 0.0 && self.y == 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scaled_calculator_rejects_bad_scale() {
        assert!(ScaledCalculator::new(0.0).is_err());
        assert!(ScaledCalculator::new(-1.0).is_err());
        assert!(ScaledCalculator::new(f32::NAN).is_err());
        assert!(ScaledCalculator::new(f32::INFINITY).is_err());
        assert!(ScaledCalculator::new(0.5).is_ok());
    }

    #[test]
    fn test_scaled_calculator_full_open_matches_open_distance() {
        let calc = ScaledCalculator::new(0.4).unwrap();
        let swipe_open = calc.open_distance(100.0);
        assert!((swipe_open - 250.0).abs() < 1e-3);
        assert!((calc.display_distance(swipe_open, 1.0) - 100.0).abs() < 1e-3);
    }

    #[test]
    fn test_clamp_per_direction() {
        let all = Directions::ALL;
        assert_eq!(clamp_distance(Some(Direction::Left), all, Axis::Horizontal, 200.0, 150.0), 150.0);
        assert_eq!(clamp_distance(Some(Direction::Left), all, Axis::Horizontal, -20.0, 150.0), 0.0);
        assert_eq!(clamp_distance(Some(Direction::Right), all, Axis::Horizontal, -200.0, 150.0), -150.0);
        assert_eq!(clamp_distance(Some(Direction::Right), all, Axis::Horizontal, 20.0, 150.0), 0.0);
        assert_eq!(clamp_distance(Some(Direction::Top), all, Axis::Vertical, 30.0, 150.0), 30.0);
        assert_eq!(clamp_distance(Some(Direction::Bottom), all, Axis::Vertical, -30.0, 150.0), -30.0);
    }

    #[test]
    fn test_clamp_orthogonal_axis_is_zero() {
        let all = Directions::ALL;
        assert_eq!(clamp_distance(Some(Direction::Left), all, Axis::Vertical, 80.0, 150.0), 0.0);
        assert_eq!(clamp_distance(Some(Direction::Top), all, Axis::Horizontal, 80.0, 150.0), 0.0);
        assert_eq!(clamp_distance(None, all, Axis::Horizontal, 80.0, 150.0), 0.0);
        // disabled direction
        assert_eq!(
            clamp_distance(Some(Direction::Left), Directions::RIGHT, Axis::Horizontal, 80.0, 150.0),
            0.0
        );
    }

    #[test]
    fn test_progress_bounds_for_any_input() {
        let open = 100.0;
        let over = 0.5;
        let max = open * (1.0 + over);
        for dir in Direction::ALL {
            let axis = dir.axis();
            for raw in [-1000.0, -151.0, -100.0, -1.0, 0.0, 1.0, 99.0, 150.0, 1000.0] {
                let clamped = clamp_distance(Some(dir), Directions::ALL, axis, raw, max);
                let p = progress_for(clamped, open);
                assert!((0.0..=1.0 + over).contains(&p), "{:?} raw={} p={}", dir, raw, p);
            }
        }
    }

    #[test]
    fn test_carry_over_applies_once() {
        let mut carry = CarryOver::default();
        carry.capture(0.0, 0.0);
        assert!(carry.is_empty());
        carry.capture(40.0, 0.0);
        assert_eq!(carry.take(Axis::Horizontal), 40.0);
        assert_eq!(carry.take(Axis::Horizontal), 0.0);
        assert!(carry.is_empty());
    }
}
