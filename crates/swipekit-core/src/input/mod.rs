//! Raw input: directions, pointer events and velocity tracking

pub mod direction;
pub mod pointer;
pub mod velocity;

pub use direction::{Axis, Direction, Directions};
pub use pointer::{MotionAction, MotionEvent, PointerId, PointerSample, PointerTracker};
pub use velocity::VelocityTracker;
