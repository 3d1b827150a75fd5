//! Pointer identities, motion events and per-pointer motion history

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::velocity::VelocityTracker;

/// Identity of whatever is driving a drag session.
///
/// Nested scroll and fling deltas are fed through the same state machine as
/// touches, under synthetic identities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PointerId {
    Touch(u32),
    NestedScroll,
    NestedFling,
}

impl PointerId {
    #[inline]
    pub fn is_nested(self) -> bool {
        !matches!(self, PointerId::Touch(_))
    }

    #[inline]
    pub fn touch_id(self) -> Option<u32> {
        match self {
            PointerId::Touch(id) => Some(id),
            _ => None,
        }
    }
}

impl fmt::Display for PointerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PointerId::Touch(id) => write!(f, "touch#{}", id),
            PointerId::NestedScroll => f.write_str("nested-scroll"),
            PointerId::NestedFling => f.write_str("nested-fling"),
        }
    }
}

/// Position of one pointer within a motion event
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointerSample {
    pub id: u32,
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MotionAction {
    /// First pointer touched down
    Down,
    /// An additional pointer touched down
    PointerDown { pointer: u32 },
    Move,
    /// A non-final pointer lifted
    PointerUp { pointer: u32 },
    /// Last pointer lifted
    Up,
    Cancel,
}

/// A raw input event from the host.
///
/// `pointers` lists every pointer that is down while the event happens,
/// including the one the action refers to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MotionEvent {
    pub action: MotionAction,
    #[serde(default)]
    pub pointers: Vec<PointerSample>,
    #[serde(default)]
    pub time_ms: u64,
}

impl MotionEvent {
    pub fn new(action: MotionAction, pointers: Vec<PointerSample>, time_ms: u64) -> Self {
        Self {
            action,
            pointers,
            time_ms,
        }
    }

    pub fn down(id: u32, x: f32, y: f32, time_ms: u64) -> Self {
        Self::new(MotionAction::Down, vec![PointerSample { id, x, y }], time_ms)
    }

    pub fn moved(id: u32, x: f32, y: f32, time_ms: u64) -> Self {
        Self::new(MotionAction::Move, vec![PointerSample { id, x, y }], time_ms)
    }

    pub fn up(id: u32, x: f32, y: f32, time_ms: u64) -> Self {
        Self::new(MotionAction::Up, vec![PointerSample { id, x, y }], time_ms)
    }

    pub fn cancel(time_ms: u64) -> Self {
        Self::new(MotionAction::Cancel, Vec::new(), time_ms)
    }

    pub fn sample(&self, id: u32) -> Option<&PointerSample> {
        self.pointers.iter().find(|p| p.id == id)
    }

    /// The pointer the action refers to
    pub fn action_sample(&self) -> Option<PointerSample> {
        match self.action {
            MotionAction::PointerDown { pointer } | MotionAction::PointerUp { pointer } => {
                self.sample(pointer).copied()
            }
            _ => self.pointers.first().copied(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct PointerTrack {
    initial: (f32, f32),
    last: (f32, f32),
}

/// Initial and last motion per pointer, plus a velocity tracker per pointer
#[derive(Debug, Default)]
pub struct PointerTracker {
    tracks: HashMap<u32, PointerTrack>,
    velocity: HashMap<u32, VelocityTracker>,
}

impl PointerTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn save_initial(&mut self, id: u32, x: f32, y: f32) {
        self.tracks.insert(
            id,
            PointerTrack {
                initial: (x, y),
                last: (x, y),
            },
        );
    }

    /// Update the last position of every pointer whose down was observed
    pub fn save_last(&mut self, event: &MotionEvent) {
        for sample in &event.pointers {
            if let Some(track) = self.tracks.get_mut(&sample.id) {
                track.last = (sample.x, sample.y);
            }
        }
    }

    /// Feed every pointer of the event into its velocity tracker
    pub fn add_movement(&mut self, event: &MotionEvent) {
        for sample in &event.pointers {
            self.velocity
                .entry(sample.id)
                .or_default()
                .add_point(event.time_ms, sample.x, sample.y);
        }
    }

    #[inline]
    pub fn is_down(&self, id: u32) -> bool {
        self.tracks.contains_key(&id)
    }

    pub fn initial(&self, id: u32) -> Option<(f32, f32)> {
        self.tracks.get(&id).map(|t| t.initial)
    }

    pub fn last(&self, id: u32) -> Option<(f32, f32)> {
        self.tracks.get(&id).map(|t| t.last)
    }

    pub fn velocity(&self, id: u32, max_velocity: f32) -> (f32, f32) {
        self.velocity
            .get(&id)
            .map(|v| v.velocity_with_max(max_velocity))
            .unwrap_or((0.0, 0.0))
    }

    pub fn clear_pointer(&mut self, id: u32) {
        self.tracks.remove(&id);
    }

    /// Forget all motion history and velocity samples
    pub fn clear(&mut self) {
        self.tracks.clear();
        self.velocity.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_sample() {
        let event = MotionEvent::new(
            MotionAction::PointerUp { pointer: 1 },
            vec![
                PointerSample { id: 0, x: 1.0, y: 2.0 },
                PointerSample { id: 1, x: 3.0, y: 4.0 },
            ],
            10,
        );
        assert_eq!(event.action_sample().map(|s| s.id), Some(1));

        let down = MotionEvent::down(0, 5.0, 6.0, 0);
        assert_eq!(down.action_sample().map(|s| (s.x, s.y)), Some((5.0, 6.0)));
    }

    #[test]
    fn test_tracker_ignores_unknown_pointers() {
        let mut tracker = PointerTracker::new();
        tracker.save_initial(0, 10.0, 10.0);
        tracker.save_last(&MotionEvent::new(
            MotionAction::Move,
            vec![
                PointerSample { id: 0, x: 20.0, y: 10.0 },
                PointerSample { id: 7, x: 99.0, y: 99.0 },
            ],
            5,
        ));
        assert_eq!(tracker.initial(0), Some((10.0, 10.0)));
        assert_eq!(tracker.last(0), Some((20.0, 10.0)));
        assert!(!tracker.is_down(7));
    }

    #[test]
    fn test_tracker_velocity() {
        let mut tracker = PointerTracker::new();
        for i in 0..4u64 {
            tracker.add_movement(&MotionEvent::moved(2, i as f32 * 5.0, 0.0, i * 10));
        }
        let (vx, _) = tracker.velocity(2, 8000.0);
        assert!((vx - 500.0).abs() < 0.01);
        tracker.clear();
        assert_eq!(tracker.velocity(2, 8000.0), (0.0, 0.0));
    }

    #[test]
    fn test_motion_event_from_json() {
        let event: MotionEvent = serde_json::from_str(
            r#"{"action":{"type":"pointer_down","pointer":1},
                "pointers":[{"id":0,"x":1,"y":2},{"id":1,"x":3,"y":4}],
                "time_ms":16}"#,
        )
        .unwrap();
        assert_eq!(event.action, MotionAction::PointerDown { pointer: 1 });
        assert_eq!(event.pointers.len(), 2);
    }
}
