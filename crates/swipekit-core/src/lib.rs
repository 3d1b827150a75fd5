pub mod config;
pub mod error;
pub mod input;
pub mod motion;
pub mod engine;
pub mod preset;
pub mod trace;

pub use config::{AppConfig, ConsumerDefaults, GestureConfig};
pub use engine::{ConsumerHandle, DragState, ExclusiveGroup, SwipeConsumer, SwipeListener, SwipeWrapper};
pub use error::{Error, Result};
pub use input::{Direction, Directions, MotionEvent};
pub use preset::ConsumerKind;
pub use trace::{Replay, Trace};
