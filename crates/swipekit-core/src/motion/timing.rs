//! L4 Atomic Layer: Time calculation utilities for settle animations
//!
//! Animations run on host-supplied millisecond timestamps rather than the wall
//! clock, so a replayed input stream always produces the same frames.

/// Calculate animation progress (0.0 to 1.0) from start time and duration
///
/// # Arguments
/// * `start_ms` - Animation start time
/// * `now_ms` - Current frame time
/// * `duration_ms` - Total animation duration
///
/// # Returns
/// Progress value clamped to [0.0, 1.0]
#[inline]
pub fn progress(start_ms: u64, now_ms: u64, duration_ms: u64) -> f32 {
    if duration_ms == 0 {
        return 1.0;
    }
    let elapsed = now_ms.saturating_sub(start_ms);
    let ratio = elapsed as f32 / duration_ms as f32;
    ratio.clamp(0.0, 1.0)
}

/// Check if animation is complete
#[inline]
pub fn is_complete(start_ms: u64, now_ms: u64, duration_ms: u64) -> bool {
    now_ms.saturating_sub(start_ms) >= duration_ms
}

/// Linear interpolation between two values
#[inline]
pub fn lerp(from: f32, to: f32, t: f32) -> f32 {
    from + (to - from) * t
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress() {
        assert_eq!(progress(100, 100, 200), 0.0);
        assert_eq!(progress(100, 200, 200), 0.5);
        assert_eq!(progress(100, 900, 200), 1.0);
        // clock behind the start
        assert_eq!(progress(100, 50, 200), 0.0);
        assert_eq!(progress(100, 100, 0), 1.0);
    }

    #[test]
    fn test_is_complete() {
        assert!(!is_complete(0, 99, 100));
        assert!(is_complete(0, 100, 100));
        assert!(is_complete(0, 0, 0));
    }

    #[test]
    fn test_lerp() {
        assert_eq!(lerp(0.0, 100.0, 0.0), 0.0);
        assert_eq!(lerp(0.0, 100.0, 0.5), 50.0);
        assert_eq!(lerp(-40.0, 0.0, 1.0), 0.0);
    }
}
