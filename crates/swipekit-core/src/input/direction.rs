//! Cardinal swipe directions and direction masks

use std::fmt;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

/// A single cardinal direction a consumer can open towards.
///
/// `Left` means the surface is pulled out from the left edge, so the
/// pointer travels towards positive x.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Left,
    Right,
    Top,
    Bottom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Horizontal,
    Vertical,
}

bitflags! {
    /// Set of directions used for enable, lock and nested-enable masks
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Directions: u8 {
        const LEFT = 1;
        const RIGHT = 1 << 1;
        const TOP = 1 << 2;
        const BOTTOM = 1 << 3;
        const HORIZONTAL = Self::LEFT.bits() | Self::RIGHT.bits();
        const VERTICAL = Self::TOP.bits() | Self::BOTTOM.bits();
        const ALL = Self::HORIZONTAL.bits() | Self::VERTICAL.bits();
    }
}

impl Direction {
    /// Fixed order used whenever directions are tested one after another
    pub const ALL: [Direction; 4] = [
        Direction::Left,
        Direction::Right,
        Direction::Top,
        Direction::Bottom,
    ];

    #[inline]
    pub fn flag(self) -> Directions {
        match self {
            Direction::Left => Directions::LEFT,
            Direction::Right => Directions::RIGHT,
            Direction::Top => Directions::TOP,
            Direction::Bottom => Directions::BOTTOM,
        }
    }

    #[inline]
    pub fn axis(self) -> Axis {
        match self {
            Direction::Left | Direction::Right => Axis::Horizontal,
            Direction::Top | Direction::Bottom => Axis::Vertical,
        }
    }

    #[inline]
    pub fn is_horizontal(self) -> bool {
        self.axis() == Axis::Horizontal
    }

    /// Sign of the clamped distance while this direction is open
    #[inline]
    pub fn sign(self) -> f32 {
        match self {
            Direction::Left | Direction::Top => 1.0,
            Direction::Right | Direction::Bottom => -1.0,
        }
    }

    pub fn opposite(self) -> Direction {
        match self {
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
            Direction::Top => Direction::Bottom,
            Direction::Bottom => Direction::Top,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Direction::Left => "left",
            Direction::Right => "right",
            Direction::Top => "top",
            Direction::Bottom => "bottom",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl From<Direction> for Directions {
    fn from(direction: Direction) -> Self {
        direction.flag()
    }
}

impl Directions {
    /// Build a mask from a list of directions
    pub fn from_slice(directions: &[Direction]) -> Self {
        directions
            .iter()
            .fold(Directions::empty(), |acc, d| acc | d.flag())
    }

    /// Iterate the single directions contained in this mask, in fixed order
    pub fn directions(self) -> impl Iterator<Item = Direction> {
        Direction::ALL
            .into_iter()
            .filter(move |d| self.contains(d.flag()))
    }
}
