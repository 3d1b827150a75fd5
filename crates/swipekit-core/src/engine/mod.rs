//! Swipe engine
//!
//! ## L4 Atomic Layer
//! - `listener` - Lifecycle callbacks and the command queue they write to
//! - `arbitration` - Direction gating against the host view tree
//!
//! ## L3 Molecular Layer
//! - `drag` - Pointer and nested deltas to distance, settle after release
//! - `consumer` - One swipeable behavior with its settings and listeners
//!
//! ## L2 Organism Layer
//! - `nested` - Nested scroll and fling handoff to consumers
//! - `group` - Consumers of which at most one is open
//! - `wrapper` - Host-facing surface routing touch, frames and nested scroll

// L4 Atomic Layer
pub mod arbitration;
pub mod listener;

// L3 Molecular Layer
pub mod consumer;
pub mod drag;

// L2 Organism Layer
pub mod group;
pub mod nested;
pub mod wrapper;

pub use arbitration::{can_child_scroll, ChildHit, Motion, NestedArbitrator, ScrollProbe};
pub use consumer::{ConsumerHandle, ConsumerId, ReleaseMode, ReleasePolicy, SwipeConsumer};
pub use drag::DragState;
pub use group::ExclusiveGroup;
pub use listener::{ConsumerCommand, ListenerId, SwipeContext, SwipeListener};
pub use nested::{NestedType, ScrollAxes};
pub use wrapper::{SwipeWrapper, WrapperNode};
