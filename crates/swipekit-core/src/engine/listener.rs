//! Swipe lifecycle listeners.
//!
//! Listeners observe a consumer through a [`SwipeContext`] snapshot. Anything
//! a listener wants done to the consumer is queued on the context: lock and
//! listener changes are applied right after the notification, motion
//! commands (open, close, slide) once the current entry point has finished.

use std::rc::Rc;

use crate::input::{Direction, Directions};

use super::consumer::ConsumerId;
use super::drag::DragState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

impl ListenerId {
    pub fn value(self) -> u64 {
        self.0
    }
}

/// Work a listener asked the consumer to do
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConsumerCommand {
    Lock(Directions),
    Unlock(Directions),
    RemoveListener(ListenerId),
    Open { smooth: bool, direction: Direction },
    Close { smooth: bool },
    SlideTo { smooth: bool, progress: f32 },
}

/// What a listener sees of the consumer while being notified
#[derive(Debug)]
pub struct SwipeContext {
    consumer: ConsumerId,
    direction: Option<Direction>,
    progress: f32,
    state: DragState,
    listener: ListenerId,
    commands: Vec<ConsumerCommand>,
}

impl SwipeContext {
    pub(crate) fn new(
        consumer: ConsumerId,
        direction: Option<Direction>,
        progress: f32,
        state: DragState,
        listener: ListenerId,
    ) -> Self {
        Self {
            consumer,
            direction,
            progress,
            state,
            listener,
            commands: Vec::new(),
        }
    }

    pub fn consumer_id(&self) -> ConsumerId {
        self.consumer
    }

    pub fn direction(&self) -> Option<Direction> {
        self.direction
    }

    pub fn progress(&self) -> f32 {
        self.progress
    }

    pub fn state(&self) -> DragState {
        self.state
    }

    /// Id of the listener currently being notified
    pub fn listener_id(&self) -> ListenerId {
        self.listener
    }

    pub fn lock_direction(&mut self, directions: impl Into<Directions>) {
        self.commands.push(ConsumerCommand::Lock(directions.into()));
    }

    pub fn unlock_direction(&mut self, directions: impl Into<Directions>) {
        self.commands.push(ConsumerCommand::Unlock(directions.into()));
    }

    pub fn remove_self(&mut self) {
        self.commands.push(ConsumerCommand::RemoveListener(self.listener));
    }

    pub fn remove_listener(&mut self, id: ListenerId) {
        self.commands.push(ConsumerCommand::RemoveListener(id));
    }

    pub fn open(&mut self, smooth: bool, direction: Direction) {
        self.commands.push(ConsumerCommand::Open { smooth, direction });
    }

    pub fn close(&mut self, smooth: bool) {
        self.commands.push(ConsumerCommand::Close { smooth });
    }

    pub fn slide_to(&mut self, smooth: bool, progress: f32) {
        self.commands.push(ConsumerCommand::SlideTo { smooth, progress });
    }

    pub(crate) fn into_commands(self) -> Vec<ConsumerCommand> {
        self.commands
    }
}

/// Swipe lifecycle callbacks; every method defaults to doing nothing
pub trait SwipeListener {
    fn on_attached(&self, _ctx: &mut SwipeContext) {}

    fn on_detached(&self, _ctx: &mut SwipeContext) {}

    fn on_state_changed(&self, _ctx: &mut SwipeContext, _state: DragState) {}

    fn on_swipe_start(&self, _ctx: &mut SwipeContext, _direction: Direction) {}

    fn on_swipe_process(&self, _ctx: &mut SwipeContext, _direction: Direction, _settling: bool, _progress: f32) {}

    fn on_swipe_release(&self, _ctx: &mut SwipeContext, _direction: Direction, _progress: f32, _xvel: f32, _yvel: f32) {
    }

    fn on_swipe_opened(&self, _ctx: &mut SwipeContext, _direction: Direction) {}

    fn on_swipe_closed(&self, _ctx: &mut SwipeContext, _direction: Direction) {}
}

/// Ordered listener list with stable ids
#[derive(Default)]
pub struct ListenerRegistry {
    entries: Vec<(ListenerId, Rc<dyn SwipeListener>)>,
    next_id: u64,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(&mut self) -> ListenerId {
        self.next_id += 1;
        ListenerId(self.next_id)
    }

    pub fn add(&mut self, listener: Rc<dyn SwipeListener>) -> ListenerId {
        let id = self.next_id();
        self.entries.push((id, listener));
        id
    }

    /// Register ahead of every existing listener
    pub fn add_first(&mut self, listener: Rc<dyn SwipeListener>) -> ListenerId {
        let id = self.next_id();
        self.entries.insert(0, (id, listener));
        id
    }

    pub fn remove(&mut self, id: ListenerId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(entry, _)| *entry != id);
        self.entries.len() != before
    }

    pub fn contains(&self, id: ListenerId) -> bool {
        self.entries.iter().any(|(entry, _)| *entry == id)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Copy of the current list, safe to iterate while listeners mutate it
    pub fn snapshot(&self) -> Vec<(ListenerId, Rc<dyn SwipeListener>)> {
        self.entries.clone()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum UnlockOn {
    Opened,
    Closed,
}

/// Unlocks a direction the first time the swipe opens (or closes), then removes itself
pub(crate) struct OnceUnlock {
    pub direction: Direction,
    pub on: UnlockOn,
}

impl OnceUnlock {
    fn fire(&self, ctx: &mut SwipeContext) {
        ctx.unlock_direction(self.direction);
        ctx.remove_self();
    }
}

impl SwipeListener for OnceUnlock {
    fn on_swipe_opened(&self, ctx: &mut SwipeContext, _direction: Direction) {
        if self.on == UnlockOn::Opened {
            self.fire(ctx);
        }
    }

    fn on_swipe_closed(&self, ctx: &mut SwipeContext, _direction: Direction) {
        if self.on == UnlockOn::Closed {
            self.fire(ctx);
        }
    }
}
