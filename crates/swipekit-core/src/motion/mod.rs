//! Motion math for swipe consumers
//!
//! ## L4 Atomic Layer
//! - `easing` - Pure easing functions (cubic, quintic, exponential)
//! - `timing` - Time calculation utilities (progress, interpolation)
//! - `clamp` - Distance clamping, progress and distance calculators
//!
//! ## L3 Molecular Layer
//! - `settle` - Settle animation controller and duration physics
//!
//! # Usage
//!
//! ```ignore
//! use swipekit_core::motion::{compute_settle_duration, SettleAnimator, SettleParams};
//!
//! let params = SettleParams::default();
//! let duration = compute_settle_duration(dx, 0.0, xvel, 0.0, width, (range, 0.0), &params);
//!
//! let mut animator = SettleAnimator::default();
//! animator.start(now_ms, (from, 0.0), (to, 0.0), duration);
//!
//! // once per frame
//! let running = animator.compute(frame_ms);
//! let (x, _) = animator.current();
//! ```

// L4 Atomic Layer
pub mod clamp;
pub mod easing;
pub mod timing;

// L3 Molecular Layer
pub mod settle;

pub use clamp::{clamp_distance, progress_for, CarryOver, DistanceCalculator, ScaledCalculator};
pub use easing::{EasingType, Interpolator};
pub use settle::{clamp_mag, compute_settle_duration, SettleAnimator, SettleParams};
