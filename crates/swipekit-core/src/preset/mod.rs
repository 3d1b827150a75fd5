//! Preset consumer kinds.
//!
//! A kind only seeds settings; every kind runs through the same state
//! machine. How a kind looks on screen is up to the host's [`SwipePresenter`].

pub mod back;

use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::config::ConsumerDefaults;
use crate::engine::consumer::{ReleaseMode, SwipeConsumer};
use crate::error::Result;
use crate::input::Direction;
use crate::motion::ScaledCalculator;

/// Receives the displayed distance whenever it changes
pub trait SwipePresenter {
    /// # Arguments
    /// * `direction` - Committed direction, if any
    /// * `x`, `y` - Displayed distance after the distance calculator
    /// * `dx`, `dy` - Change since the last call
    fn on_display_distance_changed(&mut self, direction: Option<Direction>, x: f32, y: f32, dx: f32, dy: f32);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsumerKind {
    #[default]
    Plain,
    Drawer,
    Sliding,
    Shutters,
    Door,
    Space,
    Stay,
    Refresh,
    SlidingBack,
}

impl ConsumerKind {
    pub const ALL: [ConsumerKind; 9] = [
        ConsumerKind::Plain,
        ConsumerKind::Drawer,
        ConsumerKind::Sliding,
        ConsumerKind::Shutters,
        ConsumerKind::Door,
        ConsumerKind::Space,
        ConsumerKind::Stay,
        ConsumerKind::Refresh,
        ConsumerKind::SlidingBack,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ConsumerKind::Plain => "plain",
            ConsumerKind::Drawer => "drawer",
            ConsumerKind::Sliding => "sliding",
            ConsumerKind::Shutters => "shutters",
            ConsumerKind::Door => "door",
            ConsumerKind::Space => "space",
            ConsumerKind::Stay => "stay",
            ConsumerKind::Refresh => "refresh",
            ConsumerKind::SlidingBack => "sliding_back",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            ConsumerKind::Plain => "tracks the finger and springs back on release",
            ConsumerKind::Drawer => "pulls a drawer over the content",
            ConsumerKind::Sliding => "slides the content aside to reveal a panel",
            ConsumerKind::Shutters => "splits the content into shutter leaves",
            ConsumerKind::Door => "opens the content like a two-leaf door",
            ConsumerKind::Space => "moves the content at half the finger speed",
            ConsumerKind::Stay => "content stays put; a fast fling reports opened",
            ConsumerKind::Refresh => "pull to refresh with a damped header",
            ConsumerKind::SlidingBack => "swipe back to the previous screen",
        }
    }

    /// Seed `consumer` with this kind's defaults
    pub fn apply(self, consumer: &mut SwipeConsumer, defaults: &ConsumerDefaults) -> Result<()> {
        match self {
            ConsumerKind::Plain => consumer.set_release_mode(ReleaseMode::AUTO_CLOSE),
            ConsumerKind::Drawer | ConsumerKind::Sliding | ConsumerKind::Shutters => {
                consumer.set_release_mode(ReleaseMode::AUTO_OPEN_CLOSE)
            }
            ConsumerKind::Door => {
                consumer.set_release_mode(ReleaseMode::AUTO_OPEN_CLOSE);
                consumer.set_max_settle_duration(1000);
            }
            ConsumerKind::Space => {
                consumer.set_distance_calculator(Some(Rc::new(ScaledCalculator::new(0.5)?)));
            }
            ConsumerKind::Stay => {
                consumer.set_open_distance(f32::MAX)?;
                consumer.set_max_settle_duration(0);
                consumer.set_stay_min_velocity(Some(defaults.stay_min_velocity))?;
            }
            ConsumerKind::Refresh => {
                consumer.set_distance_calculator(Some(Rc::new(ScaledCalculator::new(0.4)?)));
                consumer.set_release_mode(ReleaseMode::AUTO_CLOSE | ReleaseMode::HOLD_OPEN);
                consumer.set_over_swipe_factor(0.5)?;
            }
            ConsumerKind::SlidingBack => {
                consumer.set_release_mode(ReleaseMode::AUTO_OPEN_CLOSE);
                consumer.set_catch_settling(false);
            }
        }
        consumer.set_kind(self);
        tracing::debug!(consumer = %consumer.id(), kind = self.name(), "preset applied");
        Ok(())
    }
}

impl fmt::Display for ConsumerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
