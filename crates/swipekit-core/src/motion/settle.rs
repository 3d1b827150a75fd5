//! L3 Molecular Layer: Settle animation controller
//!
//! Combines easing and timing to animate a clamped swipe distance towards a
//! target after release, plus the physics used to pick the duration.

use std::f32::consts::PI;

use super::easing::Interpolator;
use super::timing::{is_complete, lerp, progress};

/// Velocity limits and duration cap used when computing a settle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SettleParams {
    pub min_velocity: f32,
    pub max_velocity: f32,
    pub max_duration_ms: u64,
}

impl Default for SettleParams {
    fn default() -> Self {
        Self {
            min_velocity: 50.0,
            max_velocity: 8000.0,
            max_duration_ms: 600,
        }
    }
}

/// Clamp the magnitude of value for abs_min and abs_max.
/// Below the minimum it becomes zero; above the maximum it is capped,
/// keeping the sign of `value`.
#[inline]
pub fn clamp_mag(value: f32, abs_min: f32, abs_max: f32) -> f32 {
    let abs_value = value.abs();
    if abs_value < abs_min {
        0.0
    } else if abs_value > abs_max {
        abs_max.copysign(value)
    } else {
        value
    }
}

/// Duration of a settle covering `(dx, dy)`.
///
/// # Arguments
/// * `dx`, `dy` - Distance left to travel on each axis
/// * `xvel`, `yvel` - Release velocity in px/s
/// * `parent_width` - Width of the swipe surface; scales the distance influence on both axes
/// * `motion_range` - Draggable range on each axis
/// * `params` - Velocity limits and duration cap
///
/// # Returns
/// Duration in milliseconds, never above `params.max_duration_ms`
pub fn compute_settle_duration(
    dx: f32,
    dy: f32,
    xvel: f32,
    yvel: f32,
    parent_width: f32,
    motion_range: (f32, f32),
    params: &SettleParams,
) -> u64 {
    let xvel = clamp_mag(xvel, params.min_velocity, params.max_velocity);
    let yvel = clamp_mag(yvel, params.min_velocity, params.max_velocity);
    let abs_dx = dx.abs();
    let abs_dy = dy.abs();
    let abs_xvel = xvel.abs();
    let abs_yvel = yvel.abs();
    let added_vel = abs_xvel + abs_yvel;
    let added_distance = abs_dx + abs_dy;
    if added_distance == 0.0 {
        return 0;
    }

    let xweight = if xvel != 0.0 {
        abs_xvel / added_vel
    } else {
        abs_dx / added_distance
    };
    let yweight = if yvel != 0.0 {
        abs_yvel / added_vel
    } else {
        abs_dy / added_distance
    };

    let max = params.max_duration_ms as f32;
    let xduration = axis_duration(dx, xvel, parent_width, motion_range.0, max);
    let yduration = axis_duration(dy, yvel, parent_width, motion_range.1, max);

    let duration = (xduration * xweight + yduration * yweight).max(0.0);
    (duration as u64).min(params.max_duration_ms)
}

fn axis_duration(delta: f32, velocity: f32, extent: f32, motion_range: f32, max: f32) -> f32 {
    if delta == 0.0 {
        return 0.0;
    }

    let half = extent / 2.0;
    let ratio = if extent > 0.0 {
        (delta.abs() / extent).min(1.0)
    } else {
        1.0
    };
    let distance = half + half * distance_influence(ratio);

    let velocity = velocity.abs();
    let duration = if velocity > 0.0 {
        4.0 * (1000.0 * (distance / velocity).abs()).round()
    } else if motion_range > 0.0 {
        delta.abs() / motion_range * max
    } else {
        max
    };
    duration.min(max)
}

/// Bends the distance ratio so short settles are not disproportionately quick
#[inline]
fn distance_influence(f: f32) -> f32 {
    ((f - 0.5) * 0.3 * PI / 2.0).sin()
}

#[derive(Debug, Clone)]
struct ActiveSettle {
    start_ms: u64,
    from: (f32, f32),
    to: (f32, f32),
    duration_ms: u64,
}

/// Frame-driven animator for the clamped swipe distance
#[derive(Debug, Clone, Default)]
pub struct SettleAnimator {
    active: Option<ActiveSettle>,
    interpolator: Interpolator,
    current: (f32, f32),
}

impl SettleAnimator {
    pub fn new(interpolator: Interpolator) -> Self {
        Self {
            active: None,
            interpolator,
            current: (0.0, 0.0),
        }
    }

    pub fn set_interpolator(&mut self, interpolator: Interpolator) {
        self.interpolator = interpolator;
    }

    pub fn interpolator(&self) -> &Interpolator {
        &self.interpolator
    }

    #[inline]
    pub fn is_running(&self) -> bool {
        self.active.is_some()
    }

    /// Position computed by the last frame
    #[inline]
    pub fn current(&self) -> (f32, f32) {
        self.current
    }

    pub fn target(&self) -> Option<(f32, f32)> {
        self.active.as_ref().map(|a| a.to)
    }

    pub fn duration_ms(&self) -> Option<u64> {
        self.active.as_ref().map(|a| a.duration_ms)
    }

    pub fn start(&mut self, now_ms: u64, from: (f32, f32), to: (f32, f32), duration_ms: u64) {
        self.current = from;
        self.active = Some(ActiveSettle {
            start_ms: now_ms,
            from,
            to,
            duration_ms,
        });
    }

    /// Advance to `now_ms`.
    ///
    /// Returns true while the animation still has frames left after this one.
    pub fn compute(&mut self, now_ms: u64) -> bool {
        let Some(anim) = self.active.as_ref() else {
            return false;
        };

        if is_complete(anim.start_ms, now_ms, anim.duration_ms) {
            self.current = anim.to;
            self.active = None;
            return false;
        }

        let t = progress(anim.start_ms, now_ms, anim.duration_ms);
        let eased = self.interpolator.interpolate(t);
        self.current = (
            lerp(anim.from.0, anim.to.0, eased),
            lerp(anim.from.1, anim.to.1, eased),
        );

        if self.current == anim.to {
            // the curve reached the end before the clock did
            self.active = None;
            return false;
        }
        true
    }

    /// Stop where the last frame left off
    pub fn abort(&mut self) -> Option<(f32, f32)> {
        self.active.take().map(|_| self.current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::motion::easing::EasingType;

    #[test]
    fn test_clamp_mag() {
        assert_eq!(clamp_mag(10.0, 50.0, 8000.0), 0.0);
        assert_eq!(clamp_mag(-9000.0, 50.0, 8000.0), -8000.0);
        assert_eq!(clamp_mag(300.0, 50.0, 8000.0), 300.0);
    }

    #[test]
    fn test_zero_velocity_scales_with_distance() {
        let params = SettleParams::default();
        let full = compute_settle_duration(100.0, 0.0, 0.0, 0.0, 400.0, (100.0, 0.0), &params);
        let half = compute_settle_duration(50.0, 0.0, 0.0, 0.0, 400.0, (100.0, 0.0), &params);
        assert_eq!(full, 600);
        assert_eq!(half, 300);
    }

    #[test]
    fn test_vertical_settle_uses_parent_width() {
        let params = SettleParams::default();
        // 100 of 400: half width bent by the influence curve is ~176.5px, at 4000px/s
        let vertical = compute_settle_duration(0.0, 100.0, 0.0, 4000.0, 400.0, (0.0, 150.0), &params);
        assert_eq!(vertical, 176);
        let horizontal = compute_settle_duration(100.0, 0.0, 4000.0, 0.0, 400.0, (150.0, 0.0), &params);
        assert_eq!(horizontal, vertical);
    }

    #[test]
    fn test_fast_fling_is_shorter() {
        let params = SettleParams::default();
        let slow = compute_settle_duration(100.0, 0.0, 200.0, 0.0, 400.0, (100.0, 0.0), &params);
        let fast = compute_settle_duration(100.0, 0.0, 6000.0, 0.0, 400.0, (100.0, 0.0), &params);
        assert!(fast < slow, "fast={} slow={}", fast, slow);
        assert!(slow <= params.max_duration_ms);
    }

    #[test]
    fn test_duration_never_exceeds_cap() {
        let params = SettleParams {
            max_duration_ms: 250,
            ..Default::default()
        };
        for dx in [1.0, 50.0, 400.0, 5000.0] {
            for vel in [0.0, 60.0, 900.0, 20000.0] {
                let d = compute_settle_duration(dx, 0.0, vel, 0.0, 400.0, (200.0, 0.0), &params);
                assert!(d <= 250, "dx={} vel={} -> {}", dx, vel, d);
            }
        }
    }

    #[test]
    fn test_degenerate_ranges() {
        let params = SettleParams::default();
        assert_eq!(
            compute_settle_duration(0.0, 0.0, 500.0, 500.0, 400.0, (100.0, 100.0), &params),
            0
        );
        // zero motion range with no velocity falls back to the cap
        assert_eq!(
            compute_settle_duration(30.0, 0.0, 0.0, 0.0, 0.0, (0.0, 0.0), &params),
            600
        );
    }

    #[test]
    fn test_animator_reaches_target() {
        let mut animator = SettleAnimator::new(EasingType::Linear.into());
        animator.start(1000, (0.0, 0.0), (100.0, 0.0), 200);
        assert!(animator.compute(1100));
        assert_eq!(animator.current(), (50.0, 0.0));
        assert!(!animator.compute(1200));
        assert_eq!(animator.current(), (100.0, 0.0));
        assert!(!animator.is_running());
    }

    #[test]
    fn test_zero_duration_finishes_on_first_frame() {
        let mut animator = SettleAnimator::default();
        animator.start(0, (80.0, 0.0), (0.0, 0.0), 0);
        assert!(!animator.compute(0));
        assert_eq!(animator.current(), (0.0, 0.0));
    }

    #[test]
    fn test_abort_keeps_last_frame() {
        let mut animator = SettleAnimator::new(EasingType::Linear.into());
        animator.start(0, (0.0, 0.0), (0.0, -100.0), 100);
        animator.compute(25);
        assert_eq!(animator.abort(), Some((0.0, -25.0)));
        assert_eq!(animator.abort(), None);
        assert!(!animator.compute(200));
        assert_eq!(animator.current(), (0.0, -25.0));
    }
}
