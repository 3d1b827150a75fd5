//! Nested scroll handoff.
//!
//! Scrollable descendants report the deltas they could not use (and offer
//! deltas before using them). The coordinator feeds those deltas to the
//! wrapper's consumers as synthetic pointer sessions, so a list scrolled to
//! its end can keep pulling a drawer open, and a fling can finish the job.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::input::{Axis, Direction, Directions};

use super::consumer::ConsumerHandle;

/// Source of a nested session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NestedType {
    /// Scroll driven by a finger on the descendant
    Touch,
    /// Fling running after the finger lifted
    NonTouch,
}

impl NestedType {
    pub fn is_fling(self) -> bool {
        self == NestedType::NonTouch
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ScrollAxes: u8 {
        const HORIZONTAL = 1;
        const VERTICAL = 1 << 1;
    }
}

/// Which way a fling is pushing the committed direction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct FlingTrend {
    to_open: bool,
    to_close: bool,
}

impl FlingTrend {
    /// Scroll-space delta: a negative x scroll pulls a left swipe open.
    /// None while the delta has nothing on the direction's axis.
    fn from_delta(direction: Option<Direction>, dx: f32, dy: f32) -> Option<Self> {
        let (opening, closing, along) = match direction {
            Some(Direction::Left) => (dx < 0.0, dx > 0.0, dx),
            Some(Direction::Right) => (dx > 0.0, dx < 0.0, dx),
            Some(Direction::Top) => (dy < 0.0, dy > 0.0, dy),
            Some(Direction::Bottom) => (dy > 0.0, dy < 0.0, dy),
            None => return Some(Self::default()),
        };
        if along == 0.0 {
            return None;
        }
        Some(Self {
            to_open: opening,
            to_close: closing,
        })
    }
}

#[derive(Debug, Default)]
pub struct NestedScrollCoordinator {
    in_progress: bool,
    current: Option<NestedType>,
    fling_consumed: bool,
    trend: Option<FlingTrend>,
}

impl NestedScrollCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// While true, touch interception is suspended
    pub fn is_in_progress(&self) -> bool {
        self.in_progress
    }

    pub fn current_type(&self) -> Option<NestedType> {
        self.current
    }

    /// Whether any consumer cares about scrolling on `axes`
    pub fn on_start(&self, consumers: &[ConsumerHandle], axes: ScrollAxes) -> bool {
        let horizontal = axes.contains(ScrollAxes::HORIZONTAL);
        let vertical = axes.contains(ScrollAxes::VERTICAL);
        consumers.iter().any(|handle| {
            let Ok(consumer) = handle.try_borrow() else {
                return false;
            };
            match consumer.direction().map(Direction::axis) {
                Some(Axis::Horizontal) => horizontal,
                Some(Axis::Vertical) => vertical,
                None => {
                    let enabled = consumer.enabled_directions();
                    horizontal && enabled.intersects(Directions::HORIZONTAL)
                        || vertical && enabled.intersects(Directions::VERTICAL)
                }
            }
        })
    }

    pub fn on_accepted(&mut self, kind: NestedType) {
        tracing::debug!(kind = ?kind, "nested scroll accepted");
        self.in_progress = true;
        self.fling_consumed = false;
        self.trend = None;
        self.current = Some(kind);
    }

    /// End of a nested session; consumers still driven by it are released
    pub fn on_stop(&mut self, consumers: &[ConsumerHandle], kind: NestedType) {
        self.in_progress = false;
        if self.current != Some(kind) {
            return;
        }
        self.current = None;
        for handle in consumers {
            match handle.try_borrow_mut() {
                Ok(mut consumer) => consumer.nested_release(),
                Err(_) => tracing::warn!("consumer busy, nested release skipped"),
            }
        }
    }

    /// Offer a delta before the descendant scrolls.
    ///
    /// # Returns
    /// The part of `(dx, dy)` the active consumer took, in scroll space
    pub fn on_pre_scroll(
        &mut self,
        active: &mut Option<ConsumerHandle>,
        consumers: &[ConsumerHandle],
        dx: f32,
        dy: f32,
        kind: NestedType,
    ) -> (f32, f32) {
        let committed = active
            .as_ref()
            .and_then(|handle| handle.try_borrow().ok().map(|c| c.direction().is_some()))
            .unwrap_or(false);
        if !committed {
            return (0.0, 0.0);
        }
        self.drive(active, consumers, dx, dy, kind)
    }

    /// Offer what the descendant left over after scrolling
    pub fn on_scroll(
        &mut self,
        active: &mut Option<ConsumerHandle>,
        consumers: &[ConsumerHandle],
        dx_unconsumed: f32,
        dy_unconsumed: f32,
        kind: NestedType,
    ) -> (f32, f32) {
        if dx_unconsumed == 0.0 && dy_unconsumed == 0.0 {
            return (0.0, 0.0);
        }
        self.drive(active, consumers, dx_unconsumed, dy_unconsumed, kind)
    }

    fn drive(
        &mut self,
        active: &mut Option<ConsumerHandle>,
        consumers: &[ConsumerHandle],
        dx: f32,
        dy: f32,
        kind: NestedType,
    ) -> (f32, f32) {
        if self.current.is_none() {
            // Some hosts stop one session type before the paired start of
            // the other arrives; adopt the type of the incoming delta.
            tracing::debug!(kind = ?kind, "nested type resynchronised");
            self.current = Some(kind);
            self.fling_consumed = false;
            self.trend = None;
        }
        let fly = kind.is_fling();

        let Some(handle) = active.clone() else {
            for handle in consumers {
                let Ok(mut consumer) = handle.try_borrow_mut() else {
                    continue;
                };
                let before = consumer.swipe_distance();
                if consumer.nested_drag(-dx, -dy, fly) {
                    let after = consumer.swipe_distance();
                    tracing::debug!(consumer = %consumer.id(), fly, "nested session started");
                    *active = Some(handle.clone());
                    return (before.0 - after.0, before.1 - after.1);
                }
            }
            return (0.0, 0.0);
        };

        let Ok(mut consumer) = handle.try_borrow_mut() else {
            tracing::warn!("active consumer busy, nested delta dropped");
            return (0.0, 0.0);
        };
        let max_progress = 1.0 + consumer.over_swipe_factor();
        let before = consumer.swipe_distance();
        let mut detach = false;

        if fly {
            let trend = match self.trend {
                Some(trend) => trend,
                // nothing on the swipe axis yet: keep dragging without a trend
                None => match FlingTrend::from_delta(consumer.direction(), dx, dy) {
                    Some(trend) => {
                        self.trend = Some(trend);
                        trend
                    }
                    None => FlingTrend::default(),
                },
            };
            if !self.fling_consumed {
                consumer.nested_drag(-dx, -dy, true);
                let progress = consumer.progress();
                if trend.to_open && progress >= max_progress || trend.to_close && progress <= 0.0 {
                    tracing::debug!(consumer = %consumer.id(), progress, "fling reached its end");
                    self.fling_consumed = true;
                    consumer.nested_release();
                }
            }
        } else {
            consumer.nested_drag(-dx, -dy, false);
            let progress = consumer.progress();
            detach = progress >= max_progress || progress <= 0.0;
        }

        let after = consumer.swipe_distance();
        drop(consumer);
        if detach {
            *active = None;
        }
        (before.0 - after.0, before.1 - after.1)
    }
}
