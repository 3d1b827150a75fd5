//! Host-facing swipe surface.
//!
//! A wrapper holds the consumers attached to one view, routes touch events
//! to them (intercept first, then process), advances settle animations on
//! each frame and forwards nested scroll calls to its coordinator.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crate::input::{MotionAction, MotionEvent};

use super::arbitration::{ChildHit, Motion, NestedArbitrator, ScrollProbe};
use super::consumer::{ConsumerHandle, ConsumerId, SwipeConsumer};
use super::drag::DragState;
use super::nested::{NestedScrollCoordinator, NestedType, ScrollAxes};

pub struct SwipeWrapper {
    consumers: Vec<ConsumerHandle>,
    /// Consumer that owns the current touch or nested session
    active: Option<ConsumerHandle>,
    nested: NestedScrollCoordinator,
    nested_scrolling_enabled: bool,
    content: Option<Rc<dyn ScrollProbe>>,
    touch_target_is_self: bool,
    width: f32,
    height: f32,
}

impl SwipeWrapper {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            consumers: Vec::new(),
            active: None,
            nested: NestedScrollCoordinator::new(),
            nested_scrolling_enabled: true,
            content: None,
            touch_target_is_self: false,
            width,
            height,
        }
    }

    pub fn into_shared(self) -> Rc<RefCell<SwipeWrapper>> {
        Rc::new(RefCell::new(self))
    }

    pub fn width(&self) -> f32 {
        self.width
    }

    pub fn height(&self) -> f32 {
        self.height
    }

    pub fn set_size(&mut self, width: f32, height: f32) {
        self.width = width;
        self.height = height;
        for handle in &self.consumers {
            handle.borrow_mut().set_size(width, height);
        }
    }

    /// Content view probed for scrollable descendants
    pub fn set_content(&mut self, content: Option<Rc<dyn ScrollProbe>>) {
        for handle in &self.consumers {
            handle.borrow_mut().set_content(content.clone());
        }
        self.content = content;
    }

    // ---- consumers ----

    /// Attach `consumer` and return the shared handle
    pub fn add_consumer(&mut self, consumer: SwipeConsumer) -> ConsumerHandle {
        let handle = consumer.into_handle();
        self.add_consumer_handle(handle.clone());
        handle
    }

    pub fn add_consumer_handle(&mut self, handle: ConsumerHandle) {
        {
            let mut consumer = handle.borrow_mut();
            consumer.set_content(self.content.clone());
            consumer.attach(self.width, self.height);
            tracing::debug!(consumer = %consumer.id(), kind = %consumer.kind(), "consumer added");
        }
        self.consumers.push(handle);
    }

    pub fn remove_consumer(&mut self, id: ConsumerId) -> Option<ConsumerHandle> {
        let index = self.consumers.iter().position(|h| h.borrow().id() == id)?;
        let handle = self.consumers.remove(index);
        if self.active.as_ref().is_some_and(|a| Rc::ptr_eq(a, &handle)) {
            self.active = None;
        }
        handle.borrow_mut().detach();
        Some(handle)
    }

    pub fn remove_all_consumers(&mut self) {
        self.active = None;
        for handle in self.consumers.drain(..) {
            handle.borrow_mut().detach();
        }
    }

    pub fn consumers(&self) -> &[ConsumerHandle] {
        &self.consumers
    }

    pub fn consumer(&self, id: ConsumerId) -> Option<ConsumerHandle> {
        self.consumers.iter().find(|h| h.borrow().id() == id).cloned()
    }

    pub fn active_consumer(&self) -> Option<ConsumerHandle> {
        self.active.clone()
    }

    // ---- touch ----

    /// Intercept pass: true once a consumer has claimed the stream
    pub fn intercept_touch(&mut self, event: &MotionEvent) -> bool {
        if self.nested.is_in_progress() {
            return false;
        }
        if let Some(active) = &self.active {
            return active.borrow_mut().should_intercept(event);
        }
        for handle in &self.consumers {
            if handle.borrow_mut().should_intercept(event) {
                self.active = Some(handle.clone());
                return true;
            }
        }
        false
    }

    /// Touch pass for events the wrapper itself receives
    pub fn process_touch(&mut self, event: &MotionEvent) -> bool {
        if self.nested.is_in_progress() {
            return false;
        }
        if let Some(active) = &self.active {
            active.borrow_mut().process_touch(event);
            return true;
        }
        for handle in &self.consumers {
            let mut consumer = handle.borrow_mut();
            consumer.process_touch(event);
            if consumer.state() == DragState::Dragging {
                drop(consumer);
                self.active = Some(handle.clone());
                break;
            }
        }
        true
    }

    /// Full dispatch for hosts without their own intercept pass.
    ///
    /// # Arguments
    /// * `event` - The incoming event
    /// * `content_touchable` - Whether the content would take this down event
    ///
    /// # Returns
    /// true when the wrapper handled the event, false when it belongs to the content
    pub fn dispatch_touch(&mut self, event: &MotionEvent, content_touchable: bool) -> bool {
        if event.action == MotionAction::Down {
            self.active = None;
            self.touch_target_is_self = false;
        }
        let ends_stream = matches!(event.action, MotionAction::Up | MotionAction::Cancel);

        let handled = if self.touch_target_is_self {
            self.process_touch(event);
            true
        } else if self.intercept_touch(event) {
            self.touch_target_is_self = true;
            true
        } else if event.action == MotionAction::Down && !content_touchable {
            self.touch_target_is_self = true;
            self.process_touch(event);
            true
        } else {
            false
        };

        if ends_stream {
            self.touch_target_is_self = false;
        }
        handled
    }

    // ---- frames ----

    /// Advance every settle to `now_ms`; true while another frame is needed
    pub fn compute_scroll(&mut self, now_ms: u64) -> bool {
        let mut more = false;
        for handle in &self.consumers {
            if handle.borrow_mut().continue_settling(now_ms) {
                more = true;
            }
        }
        tracing::trace!(now_ms, more, "frame");
        more
    }

    /// Move every consumer's clock forward without advancing animations
    pub fn sync_clock(&mut self, now_ms: u64) {
        for handle in &self.consumers {
            handle.borrow_mut().sync_clock(now_ms);
        }
    }

    // ---- nested scrolling ----

    pub fn nested_scrolling_enabled(&self) -> bool {
        self.nested_scrolling_enabled
    }

    pub fn set_nested_scrolling_enabled(&mut self, enabled: bool) {
        self.nested_scrolling_enabled = enabled;
    }

    pub fn is_nested_in_progress(&self) -> bool {
        self.nested.is_in_progress()
    }

    pub fn on_start_nested_scroll(&mut self, axes: ScrollAxes, kind: NestedType) -> bool {
        let accepted = self.nested_scrolling_enabled && self.nested.on_start(&self.consumers, axes);
        tracing::debug!(axes = ?axes, kind = ?kind, accepted, "nested scroll offered");
        accepted
    }

    pub fn on_nested_scroll_accepted(&mut self, _axes: ScrollAxes, kind: NestedType) {
        self.nested.on_accepted(kind);
    }

    pub fn on_stop_nested_scroll(&mut self, kind: NestedType) {
        self.nested.on_stop(&self.consumers, kind);
    }

    /// # Returns
    /// The part of `(dx, dy)` taken before the descendant scrolls
    pub fn on_nested_pre_scroll(&mut self, dx: f32, dy: f32, kind: NestedType) -> (f32, f32) {
        self.nested
            .on_pre_scroll(&mut self.active, &self.consumers, dx, dy, kind)
    }

    pub fn on_nested_scroll(
        &mut self,
        _dx_consumed: f32,
        _dy_consumed: f32,
        dx_unconsumed: f32,
        dy_unconsumed: f32,
        kind: NestedType,
    ) -> (f32, f32) {
        self.nested
            .on_scroll(&mut self.active, &self.consumers, dx_unconsumed, dy_unconsumed, kind)
    }

    /// Whether a consumer of this wrapper wants `motion` before an ancestor does
    fn claims_motion(&self, motion: &Motion) -> bool {
        if let Some(active) = &self.active {
            return match active.try_borrow() {
                Ok(consumer) => consumer.claims(motion).is_some() && consumer.progress() < 1.0,
                Err(_) => false,
            };
        }
        self.consumers.iter().any(|handle| {
            handle
                .try_borrow()
                .map(|consumer| consumer.claims(motion).is_some())
                .unwrap_or(false)
        })
    }
}

impl Drop for SwipeWrapper {
    fn drop(&mut self) {
        for handle in &self.consumers {
            if let Ok(mut consumer) = handle.try_borrow_mut() {
                consumer.detach();
            }
        }
    }
}

/// View-tree node for a wrapper nested inside another wrapper's content
pub struct WrapperNode {
    wrapper: Weak<RefCell<SwipeWrapper>>,
}

impl WrapperNode {
    pub fn new(wrapper: &Rc<RefCell<SwipeWrapper>>) -> Rc<Self> {
        Rc::new(Self {
            wrapper: Rc::downgrade(wrapper),
        })
    }
}

impl ScrollProbe for WrapperNode {
    fn child_under(&self, _x: f32, _y: f32) -> Option<ChildHit> {
        let wrapper = self.wrapper.upgrade()?;
        let wrapper = wrapper.try_borrow().ok()?;
        wrapper.content.clone().map(|node| ChildHit {
            node,
            left: 0.0,
            top: 0.0,
        })
    }

    fn as_arbitrator(&self) -> Option<&dyn NestedArbitrator> {
        Some(self)
    }
}

impl NestedArbitrator for WrapperNode {
    fn claims_motion(&self, motion: &Motion) -> bool {
        let Some(wrapper) = self.wrapper.upgrade() else {
            return false;
        };
        wrapper.try_borrow().map(|w| w.claims_motion(motion)).unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::arbitration::tests::FakeView;
    use crate::engine::consumer::tests::{consumer, Recorder};
    use crate::input::{Direction, Directions, PointerId};

    fn drag_events(from: (f32, f32), to: (f32, f32), start_ms: u64) -> Vec<MotionEvent> {
        let steps = 4;
        let mut events = vec![MotionEvent::down(0, from.0, from.1, start_ms)];
        for i in 1..=steps {
            let t = i as f32 / steps as f32;
            events.push(MotionEvent::moved(
                0,
                from.0 + (to.0 - from.0) * t,
                from.1 + (to.1 - from.1) * t,
                start_ms + i as u64 * 100,
            ));
        }
        events
    }

    #[test]
    fn test_first_dragging_consumer_becomes_active() {
        let mut wrapper = SwipeWrapper::new(400.0, 800.0);
        let vertical = wrapper.add_consumer(consumer(100.0, Directions::TOP));
        let horizontal = wrapper.add_consumer(consumer(100.0, Directions::LEFT));

        for event in drag_events((100.0, 100.0), (160.0, 100.0), 0) {
            wrapper.process_touch(&event);
        }
        let active = wrapper.active_consumer().unwrap();
        assert!(Rc::ptr_eq(&active, &horizontal));
        assert_eq!(horizontal.borrow().direction(), Some(Direction::Left));
        assert_eq!(vertical.borrow().direction(), None);
    }

    #[test]
    fn test_dispatch_intercepts_after_slop() {
        let mut wrapper = SwipeWrapper::new(400.0, 800.0);
        let handle = wrapper.add_consumer(consumer(100.0, Directions::LEFT));

        let events = drag_events((100.0, 100.0), (180.0, 100.0), 0);
        // the content takes the down and keeps the stream until a consumer intercepts
        assert!(!wrapper.dispatch_touch(&events[0], true));
        let handled: Vec<bool> = events[1..].iter().map(|e| wrapper.dispatch_touch(e, true)).collect();
        assert_eq!(handled, vec![true, true, true, true]);
        assert_eq!(handle.borrow().state(), DragState::Dragging);
        assert!(handle.borrow().progress() > 0.0);

        wrapper.dispatch_touch(&MotionEvent::up(0, 180.0, 100.0, 500), true);
        assert!(!wrapper.touch_target_is_self);
    }

    #[test]
    fn test_untouchable_content_sends_down_to_consumers() {
        let mut wrapper = SwipeWrapper::new(400.0, 800.0);
        let handle = wrapper.add_consumer(consumer(100.0, Directions::LEFT));
        assert!(wrapper.dispatch_touch(&MotionEvent::down(0, 10.0, 10.0, 0), false));
        assert!(wrapper.dispatch_touch(&MotionEvent::moved(0, 40.0, 10.0, 100), false));
        assert_eq!(handle.borrow().active_pointer(), Some(PointerId::Touch(0)));
    }

    #[test]
    fn test_compute_scroll_runs_until_settled() {
        let mut wrapper = SwipeWrapper::new(400.0, 800.0);
        let handle = wrapper.add_consumer(consumer(100.0, Directions::LEFT));
        let rec = Recorder::new();
        handle.borrow_mut().add_listener(rec.clone());

        wrapper.sync_clock(1000);
        handle.borrow_mut().open(true, Direction::Left);
        let mut now = 1000;
        let mut frames = 0;
        while wrapper.compute_scroll(now) {
            now += 16;
            frames += 1;
            assert!(frames < 100);
        }
        assert!(handle.borrow().is_opened());
        assert!(now - 1000 <= 600 + 16);
        assert!(rec.has("opened:left"));
        assert!(!wrapper.compute_scroll(now + 16));
    }

    #[test]
    fn test_nested_session_suspends_touch() {
        let mut wrapper = SwipeWrapper::new(400.0, 800.0);
        let handle = wrapper.add_consumer(consumer(100.0, Directions::TOP));
        assert!(wrapper.on_start_nested_scroll(ScrollAxes::VERTICAL, NestedType::Touch));
        wrapper.on_nested_scroll_accepted(ScrollAxes::VERTICAL, NestedType::Touch);

        for event in drag_events((100.0, 100.0), (100.0, 200.0), 0) {
            assert!(!wrapper.intercept_touch(&event));
        }
        assert_eq!(handle.borrow().state(), DragState::Idle);

        wrapper.on_nested_scroll(0.0, 0.0, 0.0, -40.0, NestedType::Touch);
        assert!((handle.borrow().progress() - 0.4).abs() < 1e-4);
        wrapper.on_stop_nested_scroll(NestedType::Touch);
        assert!(!wrapper.is_nested_in_progress());
        assert_eq!(handle.borrow().state(), DragState::Settling);
    }

    #[test]
    fn test_nested_disabled_rejects_start() {
        let mut wrapper = SwipeWrapper::new(400.0, 800.0);
        wrapper.add_consumer(consumer(100.0, Directions::TOP));
        wrapper.set_nested_scrolling_enabled(false);
        assert!(!wrapper.on_start_nested_scroll(ScrollAxes::VERTICAL, NestedType::Touch));
    }

    #[test]
    fn test_inner_wrapper_claims_before_outer() {
        let inner = SwipeWrapper::new(200.0, 200.0).into_shared();
        inner.borrow_mut().add_consumer(consumer(100.0, Directions::LEFT));

        let mut root = FakeView::default();
        let node: Rc<dyn ScrollProbe> = WrapperNode::new(&inner);
        root.children.push(((100.0, 100.0, 300.0, 300.0), node));
        let root: Rc<dyn ScrollProbe> = Rc::new(root);

        let mut outer = SwipeWrapper::new(400.0, 800.0);
        outer.set_content(Some(root));
        let outer_consumer = outer.add_consumer(consumer(100.0, Directions::LEFT));

        // inside the inner wrapper the inner consumer wins
        assert_eq!(
            outer_consumer
                .borrow()
                .calc_direction(PointerId::Touch(0), 150.0, 150.0, 30.0, 0.0),
            None
        );
        // outside it the outer consumer takes the swipe
        assert_eq!(
            outer_consumer
                .borrow()
                .calc_direction(PointerId::Touch(0), 50.0, 500.0, 30.0, 0.0),
            Some(Direction::Left)
        );
        // a fully open inner consumer no longer holds on to the motion
        let inner_consumer = inner.borrow().consumers()[0].clone();
        inner_consumer.borrow_mut().open(false, Direction::Left);
        inner.borrow_mut().active = Some(inner_consumer);
        assert_eq!(
            outer_consumer
                .borrow()
                .calc_direction(PointerId::Touch(0), 150.0, 150.0, 30.0, 0.0),
            Some(Direction::Left)
        );
    }

    #[test]
    fn test_remove_consumer_detaches() {
        let mut wrapper = SwipeWrapper::new(400.0, 800.0);
        let handle = wrapper.add_consumer(consumer(100.0, Directions::LEFT));
        let id = handle.borrow().id();
        assert!(handle.borrow().is_attached());
        let removed = wrapper.remove_consumer(id).unwrap();
        assert!(!removed.borrow().is_attached());
        assert!(wrapper.consumer(id).is_none());
        assert!(wrapper.remove_consumer(id).is_none());
    }
}
