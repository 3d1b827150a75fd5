//! Per-consumer drag state machine.
//!
//! Turns raw pointer events and nested scroll deltas into clamped distance
//! updates, and animates the distance after release. All policy decisions
//! (who may swipe, how far, where to settle) are asked of a [`SwipeDelegate`].

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::GestureConfig;
use crate::input::{MotionAction, MotionEvent, PointerId, PointerTracker};
use crate::motion::{clamp_mag, compute_settle_duration, Interpolator, SettleAnimator, SettleParams};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DragState {
    #[default]
    Idle,
    /// Driven by a touch pointer
    Dragging,
    /// Animating towards a target
    Settling,
    /// Driven by nested scroll or fling deltas
    NonTouchSettling,
}

impl DragState {
    pub fn name(self) -> &'static str {
        match self {
            DragState::Idle => "idle",
            DragState::Dragging => "dragging",
            DragState::Settling => "settling",
            DragState::NonTouchSettling => "non_touch_settling",
        }
    }
}

impl fmt::Display for DragState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Policy callbacks the drag state machine consults
pub trait SwipeDelegate {
    /// A new pointer lands while a settle (or another drag) is in flight
    fn try_accept_settling(&mut self, pointer: PointerId, x: f32, y: f32, state: DragState) -> bool;

    /// A pointer moved past the touch slop while idle
    fn try_accept_moving(&mut self, pointer: PointerId, down_x: f32, down_y: f32, dx: f32, dy: f32)
        -> bool;

    fn on_swipe_accepted(&mut self, pointer: PointerId, settling: bool, x: f32, y: f32);

    fn horizontal_range(&self, dx: f32, dy: f32) -> f32;

    fn vertical_range(&self, dx: f32, dy: f32) -> f32;

    fn clamp_horizontal(&mut self, distance: f32, dx: f32) -> f32;

    fn clamp_vertical(&mut self, distance: f32, dy: f32) -> f32;

    fn on_distance_changed(&mut self, x: f32, y: f32, dx: f32, dy: f32, state: DragState);

    /// Returns the clamped distance to settle to, or None to stay put
    fn on_released(&mut self, xvel: f32, yvel: f32) -> Option<(f32, f32)>;

    fn on_state_changed(&mut self, state: DragState);

    /// Surface `(width, height)`
    fn extent(&self) -> (f32, f32);
}

pub struct DragStateMachine {
    state: DragState,
    active_pointer: Option<PointerId>,
    pointers: PointerTracker,
    animator: SettleAnimator,
    clamped_x: f32,
    clamped_y: f32,
    base_touch_slop: f32,
    touch_slop: f32,
    settle: SettleParams,
    now_ms: u64,
}

impl DragStateMachine {
    pub fn new(gesture: &GestureConfig, sensitivity: f32, interpolator: Interpolator) -> Self {
        let mut machine = Self {
            state: DragState::Idle,
            active_pointer: None,
            pointers: PointerTracker::new(),
            animator: SettleAnimator::new(interpolator),
            clamped_x: 0.0,
            clamped_y: 0.0,
            base_touch_slop: gesture.touch_slop_px,
            touch_slop: gesture.touch_slop_px,
            settle: SettleParams {
                min_velocity: gesture.min_fling_velocity,
                max_velocity: gesture.max_fling_velocity,
                max_duration_ms: gesture.max_settle_duration_ms,
            },
            now_ms: 0,
        };
        machine.set_sensitivity(sensitivity);
        machine
    }

    #[inline]
    pub fn state(&self) -> DragState {
        self.state
    }

    #[inline]
    pub fn active_pointer(&self) -> Option<PointerId> {
        self.active_pointer
    }

    pub fn touch_slop(&self) -> f32 {
        self.touch_slop
    }

    /// Callers validate `sensitivity > 0`
    pub fn set_sensitivity(&mut self, sensitivity: f32) {
        if sensitivity > 0.0 {
            self.touch_slop = self.base_touch_slop / sensitivity;
        }
    }

    pub fn settle_params(&self) -> &SettleParams {
        &self.settle
    }

    pub fn set_max_settle_duration(&mut self, ms: u64) {
        self.settle.max_duration_ms = ms;
    }

    pub fn set_min_velocity(&mut self, velocity: f32) {
        self.settle.min_velocity = velocity;
    }

    pub fn set_interpolator(&mut self, interpolator: Interpolator) {
        self.animator.set_interpolator(interpolator);
    }

    #[inline]
    pub fn clamped(&self) -> (f32, f32) {
        (self.clamped_x, self.clamped_y)
    }

    pub fn reset_clamped(&mut self) {
        self.clamped_x = 0.0;
        self.clamped_y = 0.0;
    }

    pub fn set_clamped(&mut self, x: f32, y: f32) {
        self.clamped_x = x;
        self.clamped_y = y;
    }

    #[inline]
    pub fn now_ms(&self) -> u64 {
        self.now_ms
    }

    /// Advance the internal clock; time never moves backwards
    pub fn sync_clock(&mut self, now_ms: u64) {
        self.now_ms = self.now_ms.max(now_ms);
    }

    fn set_state(&mut self, delegate: &mut dyn SwipeDelegate, state: DragState) {
        if self.state != state {
            tracing::trace!(from = %self.state, to = %state, "drag state");
            self.state = state;
            delegate.on_state_changed(state);
        }
    }

    /// Forget the active pointer and all motion history
    pub fn cancel(&mut self) {
        self.active_pointer = None;
        self.pointers.clear();
    }

    /// Stop any settle where it currently is and go idle
    pub fn abort(&mut self, delegate: &mut dyn SwipeDelegate) {
        self.cancel();
        if matches!(self.state, DragState::Settling | DragState::NonTouchSettling) {
            if let Some((x, y)) = self.animator.abort() {
                let dx = x - self.clamped_x;
                let dy = y - self.clamped_y;
                self.clamped_x = x;
                self.clamped_y = y;
                if dx != 0.0 || dy != 0.0 {
                    delegate.on_distance_changed(x, y, dx, dy, self.state);
                }
            }
        }
        self.set_state(delegate, DragState::Idle);
    }

    /// Animate from the current clamped distance to `(final_x, final_y)`.
    ///
    /// Returns true when an animation was started.
    pub fn smooth_slide_to(&mut self, delegate: &mut dyn SwipeDelegate, final_x: f32, final_y: f32) -> bool {
        let (xvel, yvel) = match self.active_pointer.and_then(PointerId::touch_id) {
            Some(id) => self.pointers.velocity(id, self.settle.max_velocity),
            None => (0.0, 0.0),
        };
        let sliding = self.settle_to(delegate, final_x, final_y, xvel, yvel);
        self.active_pointer = None;
        sliding
    }

    /// Restart the clamped distance at `start` and animate to `target`
    pub fn smooth_slide_from(
        &mut self,
        delegate: &mut dyn SwipeDelegate,
        start: (f32, f32),
        target: (f32, f32),
    ) -> bool {
        self.clamped_x = start.0;
        self.clamped_y = start.1;
        self.smooth_slide_to(delegate, target.0, target.1)
    }

    /// Jump to `(final_x, final_y)` without animation
    pub fn slide_immediately(&mut self, delegate: &mut dyn SwipeDelegate, final_x: f32, final_y: f32) {
        self.clamped_x = final_x;
        self.clamped_y = final_y;
        self.settle_to(delegate, final_x, final_y, 0.0, 0.0);
    }

    fn settle_to(
        &mut self,
        delegate: &mut dyn SwipeDelegate,
        final_x: f32,
        final_y: f32,
        xvel: f32,
        yvel: f32,
    ) -> bool {
        let start = (self.clamped_x, self.clamped_y);
        let dx = final_x - start.0;
        let dy = final_y - start.1;
        self.animator.abort();

        if dx == 0.0 && dy == 0.0 {
            self.set_state(delegate, DragState::Settling);
            delegate.on_distance_changed(final_x, final_y, dx, dy, self.state);
            self.set_state(delegate, DragState::Idle);
            return false;
        }

        let range = (delegate.horizontal_range(dx, dy), delegate.vertical_range(dx, dy));
        let duration = compute_settle_duration(dx, dy, xvel, yvel, delegate.extent().0, range, &self.settle);
        tracing::debug!(
            from_x = start.0,
            from_y = start.1,
            to_x = final_x,
            to_y = final_y,
            duration_ms = duration,
            "settle"
        );
        self.animator.start(self.now_ms, start, (final_x, final_y), duration);
        self.set_state(delegate, DragState::Settling);
        true
    }

    /// Advance a running settle to `now_ms`.
    ///
    /// Returns true while still settling.
    pub fn continue_settling(&mut self, delegate: &mut dyn SwipeDelegate, now_ms: u64) -> bool {
        self.sync_clock(now_ms);
        if self.state == DragState::Settling {
            let keep_going = self.animator.compute(self.now_ms);
            let (x, y) = self.animator.current();
            let dx = x - self.clamped_x;
            let dy = y - self.clamped_y;
            if dx != 0.0 {
                self.clamped_x = x;
            }
            if dy != 0.0 {
                self.clamped_y = y;
            }
            if dx != 0.0 || dy != 0.0 {
                delegate.on_distance_changed(x, y, dx, dy, self.state);
            }
            if !keep_going {
                self.set_state(delegate, DragState::Idle);
            }
        }
        self.state == DragState::Settling
    }

    fn dispatch_released(&mut self, delegate: &mut dyn SwipeDelegate, xvel: f32, yvel: f32) {
        if let Some((x, y)) = delegate.on_released(xvel, yvel) {
            self.settle_to(delegate, x, y, xvel, yvel);
        }
        if matches!(self.state, DragState::Dragging | DragState::NonTouchSettling) {
            self.set_state(delegate, DragState::Idle);
        }
        self.active_pointer = None;
    }

    #[allow(clippy::too_many_arguments)]
    fn try_swipe(
        &mut self,
        delegate: &mut dyn SwipeDelegate,
        pointer: PointerId,
        settling: bool,
        down_x: f32,
        down_y: f32,
        dx: f32,
        dy: f32,
        touch_mode: bool,
    ) -> bool {
        if self.active_pointer == Some(pointer) {
            return true;
        }
        let accepted = if settling || self.state == DragState::Settling {
            delegate.try_accept_settling(pointer, down_x, down_y, self.state)
        } else {
            delegate.try_accept_moving(pointer, down_x, down_y, dx, dy)
        };
        if !accepted {
            return false;
        }

        self.active_pointer = Some(pointer);
        let (init_x, init_y) = pointer
            .touch_id()
            .and_then(|id| self.pointers.initial(id))
            .unwrap_or((0.0, 0.0));
        delegate.on_swipe_accepted(pointer, settling, init_x, init_y);
        self.clamped_x = delegate.clamp_horizontal(0.0, 0.0);
        self.clamped_y = delegate.clamp_vertical(0.0, 0.0);
        self.set_state(
            delegate,
            if touch_mode {
                DragState::Dragging
            } else {
                DragState::NonTouchSettling
            },
        );
        true
    }

    fn check_touch_slop(&self, delegate: &dyn SwipeDelegate, dx: f32, dy: f32) -> bool {
        let horizontal = delegate.horizontal_range(dx, dy) > 0.0;
        let vertical = delegate.vertical_range(dx, dy) > 0.0;
        let slop = self.touch_slop;
        match (horizontal, vertical) {
            (true, true) => dx * dx + dy * dy > slop * slop,
            (true, false) => dx.abs() > slop,
            (false, true) => dy.abs() > slop,
            (false, false) => false,
        }
    }

    fn is_valid_pointer(&self, id: u32) -> bool {
        if self.pointers.is_down(id) {
            true
        } else {
            tracing::warn!(pointer = id, "ignoring pointer without a preceding down");
            false
        }
    }

    /// Observe an event on its way to the content.
    ///
    /// Returns true once a drag has started and the rest of the stream
    /// should be taken over.
    pub fn should_intercept(&mut self, delegate: &mut dyn SwipeDelegate, event: &MotionEvent) -> bool {
        self.sync_clock(event.time_ms);
        if event.action == MotionAction::Down {
            self.cancel();
        }
        self.pointers.add_movement(event);

        match event.action {
            MotionAction::Down | MotionAction::PointerDown { .. } => {
                if let Some(sample) = event.action_sample() {
                    self.pointers.save_initial(sample.id, sample.x, sample.y);
                    if matches!(self.state, DragState::Settling | DragState::NonTouchSettling) {
                        self.try_swipe(
                            delegate,
                            PointerId::Touch(sample.id),
                            true,
                            sample.x,
                            sample.y,
                            0.0,
                            0.0,
                            true,
                        );
                    }
                }
            }
            MotionAction::Move => {
                for sample in &event.pointers {
                    if !self.is_valid_pointer(sample.id) {
                        continue;
                    }
                    let Some((down_x, down_y)) = self.pointers.initial(sample.id) else {
                        continue;
                    };
                    let dx = sample.x - down_x;
                    let dy = sample.y - down_y;
                    let past_slop = self.check_touch_slop(delegate, dx, dy);
                    if past_slop
                        && delegate.horizontal_range(dx, dy) == 0.0
                        && delegate.vertical_range(dx, dy) == 0.0
                    {
                        continue;
                    }
                    if past_slop
                        && self.try_swipe(
                            delegate,
                            PointerId::Touch(sample.id),
                            false,
                            down_x,
                            down_y,
                            dx,
                            dy,
                            true,
                        )
                    {
                        break;
                    }
                }
                self.pointers.save_last(event);
            }
            MotionAction::PointerUp { pointer } => self.pointers.clear_pointer(pointer),
            MotionAction::Up | MotionAction::Cancel => self.cancel(),
        }

        self.state == DragState::Dragging
    }

    /// Handle an event delivered directly to the swipe surface
    pub fn process(&mut self, delegate: &mut dyn SwipeDelegate, event: &MotionEvent) {
        self.sync_clock(event.time_ms);
        if event.action == MotionAction::Down && self.state != DragState::Dragging {
            self.cancel();
        }
        self.pointers.add_movement(event);

        match event.action {
            MotionAction::Down => {
                if let Some(sample) = event.action_sample() {
                    self.pointers.save_initial(sample.id, sample.x, sample.y);
                    if self.state != DragState::Dragging {
                        let settling =
                            matches!(self.state, DragState::Settling | DragState::NonTouchSettling);
                        self.try_swipe(
                            delegate,
                            PointerId::Touch(sample.id),
                            settling,
                            sample.x,
                            sample.y,
                            0.0,
                            0.0,
                            true,
                        );
                    }
                }
            }
            MotionAction::PointerDown { .. } => {
                if let Some(sample) = event.action_sample() {
                    self.pointers.save_initial(sample.id, sample.x, sample.y);
                    if self.state == DragState::Dragging {
                        self.try_swipe(
                            delegate,
                            PointerId::Touch(sample.id),
                            true,
                            sample.x,
                            sample.y,
                            0.0,
                            0.0,
                            true,
                        );
                    }
                }
            }
            MotionAction::Move => {
                if self.state == DragState::Dragging {
                    self.drag_active_pointer(delegate, event);
                } else {
                    for sample in &event.pointers {
                        if !self.is_valid_pointer(sample.id) {
                            continue;
                        }
                        let Some((down_x, down_y)) = self.pointers.initial(sample.id) else {
                            continue;
                        };
                        let dx = sample.x - down_x;
                        let dy = sample.y - down_y;
                        if self.check_touch_slop(delegate, dx, dy)
                            && self.try_swipe(
                                delegate,
                                PointerId::Touch(sample.id),
                                false,
                                down_x,
                                down_y,
                                dx,
                                dy,
                                true,
                            )
                        {
                            break;
                        }
                    }
                    self.pointers.save_last(event);
                }
            }
            MotionAction::PointerUp { pointer } => {
                if self.state == DragState::Dragging && self.active_pointer == Some(PointerId::Touch(pointer)) {
                    let handed_off = self.hand_off_pointer(delegate, event, pointer);
                    if !handed_off {
                        self.release_for_pointer_up(delegate);
                    }
                }
                self.pointers.clear_pointer(pointer);
            }
            MotionAction::Up => {
                if self.state == DragState::Dragging {
                    self.release_for_pointer_up(delegate);
                }
                self.cancel();
            }
            MotionAction::Cancel => {
                if self.state == DragState::Dragging {
                    self.dispatch_released(delegate, 0.0, 0.0);
                }
                self.cancel();
            }
        }
    }

    fn drag_active_pointer(&mut self, delegate: &mut dyn SwipeDelegate, event: &MotionEvent) {
        let Some(id) = self.active_pointer.and_then(PointerId::touch_id) else {
            return;
        };
        if !self.is_valid_pointer(id) {
            return;
        }
        let (Some(sample), Some((last_x, last_y))) = (event.sample(id), self.pointers.last(id)) else {
            return;
        };
        let idx = sample.x - last_x;
        let idy = sample.y - last_y;
        self.drag_to(delegate, self.clamped_x + idx, self.clamped_y + idy, idx, idy);
        self.pointers.save_last(event);
    }

    /// Try to continue the drag with another pointer that is still down
    fn hand_off_pointer(&mut self, delegate: &mut dyn SwipeDelegate, event: &MotionEvent, lifted: u32) -> bool {
        for sample in &event.pointers {
            if sample.id == lifted || !self.is_valid_pointer(sample.id) {
                continue;
            }
            let Some((x, y)) = self.pointers.initial(sample.id) else {
                continue;
            };
            if self.try_swipe(delegate, PointerId::Touch(sample.id), true, x, y, 0.0, 0.0, true) {
                tracing::debug!(from = lifted, to = sample.id, "drag handed off");
                return true;
            }
        }
        false
    }

    fn release_for_pointer_up(&mut self, delegate: &mut dyn SwipeDelegate) {
        let (xvel, yvel) = match self.active_pointer.and_then(PointerId::touch_id) {
            Some(id) => self.pointers.velocity(id, self.settle.max_velocity),
            None => (0.0, 0.0),
        };
        let xvel = clamp_mag(xvel, self.settle.min_velocity, self.settle.max_velocity);
        let yvel = clamp_mag(yvel, self.settle.min_velocity, self.settle.max_velocity);
        self.dispatch_released(delegate, xvel, yvel);
    }

    /// Feed a nested scroll delta (in swipe space) into the drag.
    ///
    /// Returns false, and goes idle, when nothing could be consumed.
    pub fn nested_drag(&mut self, delegate: &mut dyn SwipeDelegate, dx: f32, dy: f32, fly: bool) -> bool {
        let pointer = if fly {
            PointerId::NestedFling
        } else {
            PointerId::NestedScroll
        };
        if self.state == DragState::Idle && !self.try_swipe(delegate, pointer, false, 0.0, 0.0, dx, dy, false) {
            return false;
        }

        let (mut clamped_x, mut clamped_y) = (0.0, 0.0);
        let (mut consumed_x, mut consumed_y) = (0.0, 0.0);
        if self.clamped_x != 0.0 || dx != 0.0 {
            clamped_x = delegate.clamp_horizontal(self.clamped_x + dx, dx);
            consumed_x = self.clamped_x - clamped_x;
        }
        if self.clamped_y != 0.0 || dy != 0.0 {
            clamped_y = delegate.clamp_vertical(self.clamped_y + dy, dy);
            consumed_y = self.clamped_y - clamped_y;
        }

        if self.clamped_x == 0.0 && self.clamped_y == 0.0 && consumed_x == 0.0 && consumed_y == 0.0 {
            self.active_pointer = None;
            self.set_state(delegate, DragState::Idle);
            false
        } else {
            self.drag_to(delegate, clamped_x, clamped_y, -consumed_x, -consumed_y);
            true
        }
    }

    /// End of a nested session that is still driving the drag
    pub fn nested_release(&mut self, delegate: &mut dyn SwipeDelegate) {
        if self.state == DragState::NonTouchSettling {
            self.dispatch_released(delegate, 0.0, 0.0);
        }
    }

    fn drag_to(&mut self, delegate: &mut dyn SwipeDelegate, x: f32, y: f32, dx: f32, dy: f32) {
        let (old_x, old_y) = (self.clamped_x, self.clamped_y);
        let mut clamped_x = x;
        let mut clamped_y = y;
        if dx != 0.0 {
            clamped_x = delegate.clamp_horizontal(x, dx);
            self.clamped_x = clamped_x;
        }
        if dy != 0.0 {
            clamped_y = delegate.clamp_vertical(y, dy);
            self.clamped_y = clamped_y;
        }
        if dx != 0.0 || dy != 0.0 {
            delegate.on_distance_changed(clamped_x, clamped_y, clamped_x - old_x, clamped_y - old_y, self.state);
        }
    }
}
