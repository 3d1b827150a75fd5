//! Exclusive consumer groups.
//!
//! At most one member of a group is open. When a member opens it becomes
//! current and every other member is closed; when the current member closes
//! the group has no current member again.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crate::input::{Direction, Directions};

use super::consumer::{ConsumerHandle, ConsumerId};
use super::listener::{ListenerId, SwipeContext, SwipeListener};

struct Member {
    id: ConsumerId,
    handle: ConsumerHandle,
    listener: ListenerId,
}

struct GroupState {
    members: Vec<Member>,
    current: Option<ConsumerId>,
    smooth: bool,
    lock_other: bool,
}

impl GroupState {
    fn contains(&self, id: ConsumerId) -> bool {
        self.members.iter().any(|m| m.id == id)
    }

    fn handles_except(&self, id: Option<ConsumerId>) -> Vec<ConsumerHandle> {
        self.members
            .iter()
            .filter(|m| Some(m.id) != id)
            .map(|m| m.handle.clone())
            .collect()
    }
}

/// Registered on every member ahead of its other listeners
struct GroupListener {
    state: Weak<RefCell<GroupState>>,
}

impl SwipeListener for GroupListener {
    fn on_swipe_opened(&self, ctx: &mut SwipeContext, _direction: Direction) {
        if let Some(state) = self.state.upgrade() {
            let smooth = state.borrow().smooth;
            mark_as_current(&state, ctx.consumer_id(), smooth);
        }
    }

    fn on_swipe_closed(&self, ctx: &mut SwipeContext, _direction: Direction) {
        if let Some(state) = self.state.upgrade() {
            let is_current = state.borrow().current == Some(ctx.consumer_id());
            if is_current {
                mark_no_current(&state, Some(ctx.consumer_id()));
            }
        }
    }
}

fn mark_as_current(state: &Rc<RefCell<GroupState>>, id: ConsumerId, smooth: bool) {
    let (others, lock_other) = {
        let mut state = state.borrow_mut();
        if state.current == Some(id) || !state.contains(id) {
            return;
        }
        state.current = Some(id);
        (state.handles_except(Some(id)), state.lock_other)
    };
    tracing::debug!(consumer = %id, smooth, lock_other, "group current changed");

    for handle in others {
        let Ok(mut consumer) = handle.try_borrow_mut() else {
            tracing::warn!(consumer = %id, "group member busy, not closed");
            continue;
        };
        if lock_other && !consumer.is_direction_locked(Directions::ALL) {
            consumer.lock_direction(Directions::ALL);
        }
        consumer.close(smooth);
    }
}

/// `closing` is the member whose close notification is being delivered
fn mark_no_current(state: &Rc<RefCell<GroupState>>, closing: Option<ConsumerId>) {
    let (current, members, smooth, lock_other) = {
        let mut state = state.borrow_mut();
        let current = state.current.take();
        (current, state.handles_except(closing), state.smooth, state.lock_other)
    };

    if let Some(id) = current.filter(|&id| Some(id) != closing) {
        if let Some(handle) = members.iter().find(|h| h.try_borrow().is_ok_and(|c| c.id() == id)) {
            match handle.try_borrow_mut() {
                Ok(mut consumer) => consumer.close(smooth),
                Err(_) => tracing::debug!(consumer = %id, "current member busy, not closed"),
            }
        }
    }

    if lock_other {
        for handle in &members {
            if let Ok(mut consumer) = handle.try_borrow_mut() {
                if consumer.is_direction_locked(Directions::ALL) {
                    consumer.unlock_direction(Directions::ALL);
                }
            }
        }
    }
}

/// A set of consumers of which at most one is open
pub struct ExclusiveGroup {
    state: Rc<RefCell<GroupState>>,
}

impl Default for ExclusiveGroup {
    fn default() -> Self {
        Self::new()
    }
}

impl ExclusiveGroup {
    /// Group that closes siblings with an animation
    pub fn new() -> Self {
        Self::with_smooth(true)
    }

    pub fn with_smooth(smooth: bool) -> Self {
        Self {
            state: Rc::new(RefCell::new(GroupState {
                members: Vec::new(),
                current: None,
                smooth,
                lock_other: false,
            })),
        }
    }

    /// Add a member; returns false if it already belongs to the group
    pub fn add(&self, handle: &ConsumerHandle) -> bool {
        let mut consumer = handle.borrow_mut();
        let id = consumer.id();
        if self.state.borrow().contains(id) {
            return false;
        }
        let listener = consumer.add_priority_listener(Rc::new(GroupListener {
            state: Rc::downgrade(&self.state),
        }));
        self.state.borrow_mut().members.push(Member {
            id,
            handle: handle.clone(),
            listener,
        });
        true
    }

    pub fn remove(&self, id: ConsumerId) -> bool {
        let member = {
            let mut state = self.state.borrow_mut();
            let Some(index) = state.members.iter().position(|m| m.id == id) else {
                return false;
            };
            if state.current == Some(id) {
                state.current = None;
            }
            state.members.remove(index)
        };
        match member.handle.try_borrow_mut() {
            Ok(mut consumer) => {
                consumer.remove_listener(member.listener);
            }
            Err(_) => tracing::warn!(consumer = %id, "member busy, group listener left in place"),
        }
        true
    }

    pub fn clear(&self) {
        let ids: Vec<ConsumerId> = self.state.borrow().members.iter().map(|m| m.id).collect();
        for id in ids {
            self.remove(id);
        }
    }

    pub fn len(&self) -> usize {
        self.state.borrow().members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.borrow().members.is_empty()
    }

    pub fn contains(&self, id: ConsumerId) -> bool {
        self.state.borrow().contains(id)
    }

    pub fn current(&self) -> Option<ConsumerHandle> {
        let state = self.state.borrow();
        let id = state.current?;
        state.members.iter().find(|m| m.id == id).map(|m| m.handle.clone())
    }

    pub fn current_id(&self) -> Option<ConsumerId> {
        self.state.borrow().current
    }

    pub fn is_smooth(&self) -> bool {
        self.state.borrow().smooth
    }

    pub fn set_smooth(&self, smooth: bool) {
        self.state.borrow_mut().smooth = smooth;
    }

    pub fn is_lock_other(&self) -> bool {
        self.state.borrow().lock_other
    }

    /// Lock every direction of the other members while one is current
    pub fn set_lock_other(&self, lock_other: bool) {
        self.state.borrow_mut().lock_other = lock_other;
    }

    /// Make `id` current and close the others; no-op if it already is
    pub fn mark_as_current(&self, id: ConsumerId) {
        let smooth = self.is_smooth();
        mark_as_current(&self.state, id, smooth);
    }

    pub fn mark_as_current_with(&self, id: ConsumerId, smooth: bool) {
        mark_as_current(&self.state, id, smooth);
    }

    /// Close the current member and forget it
    pub fn mark_no_current(&self) {
        mark_no_current(&self.state, None);
    }
}

impl Drop for ExclusiveGroup {
    fn drop(&mut self) {
        self.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::consumer::tests::{consumer, settle};
    use crate::engine::drag::DragState;

    /// Appends `name:event` to a log shared between consumers
    struct SharedLog {
        name: &'static str,
        log: Rc<RefCell<Vec<String>>>,
    }

    impl SwipeListener for SharedLog {
        fn on_swipe_opened(&self, _ctx: &mut SwipeContext, _direction: Direction) {
            self.log.borrow_mut().push(format!("{}:opened", self.name));
        }

        fn on_swipe_closed(&self, _ctx: &mut SwipeContext, _direction: Direction) {
            self.log.borrow_mut().push(format!("{}:closed", self.name));
        }
    }

    fn pair(group: &ExclusiveGroup) -> (ConsumerHandle, ConsumerHandle, Rc<RefCell<Vec<String>>>) {
        let log = Rc::new(RefCell::new(Vec::new()));
        let a = consumer(100.0, Directions::LEFT).into_handle();
        let b = consumer(100.0, Directions::RIGHT).into_handle();
        a.borrow_mut().add_listener(Rc::new(SharedLog { name: "a", log: log.clone() }));
        b.borrow_mut().add_listener(Rc::new(SharedLog { name: "b", log: log.clone() }));
        assert!(group.add(&a));
        assert!(group.add(&b));
        (a, b, log)
    }

    #[test]
    fn test_opening_one_closes_the_other_first() {
        let group = ExclusiveGroup::with_smooth(false);
        let (a, b, log) = pair(&group);

        a.borrow_mut().open(false, Direction::Left);
        assert_eq!(group.current_id(), Some(a.borrow().id()));

        log.borrow_mut().clear();
        b.borrow_mut().open(false, Direction::Right);
        assert_eq!(*log.borrow(), vec!["a:closed".to_string(), "b:opened".to_string()]);
        assert!(a.borrow().is_closed());
        assert!(b.borrow().is_opened());
        assert!(Rc::ptr_eq(&group.current().unwrap(), &b));
    }

    #[test]
    fn test_smooth_group_animates_siblings_closed() {
        let group = ExclusiveGroup::new();
        let (a, b, _log) = pair(&group);
        a.borrow_mut().open(false, Direction::Left);
        b.borrow_mut().open(false, Direction::Right);
        assert_eq!(a.borrow().state(), DragState::Settling);
        settle(&mut a.borrow_mut(), 0);
        assert!(a.borrow().is_closed());
        // a closing on its own does not disturb the new current member
        assert_eq!(group.current_id(), Some(b.borrow().id()));
        assert!(b.borrow().is_opened());
    }

    #[test]
    fn test_lock_other_until_current_closes() {
        let group = ExclusiveGroup::with_smooth(false);
        group.set_lock_other(true);
        let (a, b, _log) = pair(&group);

        a.borrow_mut().open(false, Direction::Left);
        assert!(b.borrow().is_direction_locked(Directions::ALL));
        assert!(!a.borrow().is_direction_locked(Direction::Left));

        a.borrow_mut().close(false);
        assert_eq!(group.current_id(), None);
        assert!(!b.borrow().is_direction_locked(Directions::ALL));
    }

    #[test]
    fn test_mark_as_current_is_idempotent() {
        let group = ExclusiveGroup::with_smooth(false);
        let (a, b, log) = pair(&group);
        b.borrow_mut().open(false, Direction::Right);
        group.mark_as_current(b.borrow().id());
        log.borrow_mut().clear();

        group.mark_as_current(b.borrow().id());
        assert!(log.borrow().is_empty());
        assert!(b.borrow().is_opened());
        assert!(a.borrow().is_closed());
    }

    #[test]
    fn test_mark_no_current_closes_current() {
        let group = ExclusiveGroup::with_smooth(false);
        let (a, _b, log) = pair(&group);
        a.borrow_mut().open(false, Direction::Left);
        log.borrow_mut().clear();

        group.mark_no_current();
        assert_eq!(group.current_id(), None);
        assert!(a.borrow().is_closed());
        assert_eq!(*log.borrow(), vec!["a:closed".to_string()]);
    }

    #[test]
    fn test_remove_and_clear_detach_listener() {
        let group = ExclusiveGroup::with_smooth(false);
        let (a, b, _log) = pair(&group);
        assert!(!group.add(&a));
        assert_eq!(a.borrow().listener_count(), 2);

        let a_id = a.borrow().id();
        assert!(group.remove(a_id));
        assert!(!group.remove(a_id));
        assert_eq!(a.borrow().listener_count(), 1);

        a.borrow_mut().open(false, Direction::Left);
        assert_eq!(group.current_id(), None);

        group.clear();
        assert!(group.is_empty());
        assert_eq!(b.borrow().listener_count(), 1);
    }
}
