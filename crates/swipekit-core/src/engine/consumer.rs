//! Swipe consumer: one swipeable behavior attached to a wrapper.
//!
//! A consumer owns its settings, the committed direction and progress, its
//! listeners and a [`DragStateMachine`]. The policy half ([`ConsumerCore`])
//! is what the state machine consults through [`SwipeDelegate`].

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::config::{AppConfig, ConsumerDefaults, GestureConfig};
use crate::error::{Error, Result};
use crate::input::{Axis, Direction, Directions, MotionEvent, PointerId};
use crate::motion::{clamp_distance, CarryOver, DistanceCalculator, Interpolator};
use crate::preset::back::BackBinding;
use crate::preset::{ConsumerKind, SwipePresenter};

use super::arbitration::{Motion, ScrollProbe, SwipeGate};
use super::drag::{DragState, DragStateMachine, SwipeDelegate};
use super::listener::{
    ConsumerCommand, ListenerId, ListenerRegistry, OnceUnlock, SwipeContext, SwipeListener, UnlockOn,
};

/// Shared handle used by wrappers and groups
pub type ConsumerHandle = Rc<RefCell<SwipeConsumer>>;

/// Upper bound on listener-requested motion commands run per entry point
const MAX_DEFERRED_COMMANDS: usize = 64;

static NEXT_CONSUMER_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConsumerId(u64);

impl ConsumerId {
    pub(crate) fn next() -> Self {
        ConsumerId(NEXT_CONSUMER_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConsumerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "consumer#{}", self.0)
    }
}

/// What happens when the pointer lets go, as written in config files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReleasePolicy {
    None,
    #[default]
    AutoClose,
    AutoOpen,
    AutoOpenClose,
}

bitflags! {
    /// Release behavior; `AUTO_OPEN_CLOSE` is the union of the two auto modes
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ReleaseMode: u8 {
        const AUTO_CLOSE = 1;
        const AUTO_OPEN = 1 << 1;
        const AUTO_OPEN_CLOSE = Self::AUTO_CLOSE.bits() | Self::AUTO_OPEN.bits();
        /// Stay open after being swiped past fully open
        const HOLD_OPEN = 1 << 2;
    }
}

impl ReleaseMode {
    pub const NONE: ReleaseMode = ReleaseMode::empty();

    pub fn from_policy(policy: ReleasePolicy, hold_open: bool) -> Self {
        let mode = match policy {
            ReleasePolicy::None => ReleaseMode::NONE,
            ReleasePolicy::AutoClose => ReleaseMode::AUTO_CLOSE,
            ReleasePolicy::AutoOpen => ReleaseMode::AUTO_OPEN,
            ReleasePolicy::AutoOpenClose => ReleaseMode::AUTO_OPEN_CLOSE,
        };
        if hold_open {
            mode | ReleaseMode::HOLD_OPEN
        } else {
            mode
        }
    }

    pub fn policy(self) -> ReleasePolicy {
        let auto = self & ReleaseMode::AUTO_OPEN_CLOSE;
        if auto == ReleaseMode::AUTO_OPEN_CLOSE {
            ReleasePolicy::AutoOpenClose
        } else if auto == ReleaseMode::AUTO_OPEN {
            ReleasePolicy::AutoOpen
        } else if auto == ReleaseMode::AUTO_CLOSE {
            ReleasePolicy::AutoClose
        } else {
            ReleasePolicy::None
        }
    }
}

fn reject(name: &'static str, value: impl fmt::Display) -> Error {
    tracing::warn!(setting = name, value = %value, "rejected invalid setting");
    Error::invalid(name, value)
}

/// Settings, swipe progress and listeners of a consumer
pub struct ConsumerCore {
    id: ConsumerId,
    kind: ConsumerKind,
    tag: Option<String>,
    width: f32,
    height: f32,
    attached: bool,

    enabled: Directions,
    locked: Directions,
    nested_scroll: Directions,
    nested_fling: Directions,

    direction: Option<Direction>,
    progress: f32,
    drag_state: DragState,
    swiping: bool,

    open_distance: f32,
    swipe_open_distance: f32,
    swipe_max_distance: f32,
    over_swipe_factor: f32,
    release_mode: ReleaseMode,
    calculator: Option<Rc<dyn DistanceCalculator>>,
    edge_size: f32,
    sensitivity: f32,
    disable_swipe_on_settling: bool,
    catch_settling: bool,
    stay_min_velocity: Option<f32>,

    cur_x: f32,
    cur_y: f32,
    display_x: f32,
    display_y: f32,
    carry: CarryOver,

    presenter: Option<Box<dyn SwipePresenter>>,
    back: Option<BackBinding>,
    content: Option<Rc<dyn ScrollProbe>>,
    listeners: ListenerRegistry,
    deferred: VecDeque<ConsumerCommand>,
}

impl ConsumerCore {
    fn new(defaults: &ConsumerDefaults) -> Self {
        Self {
            id: ConsumerId::next(),
            kind: ConsumerKind::Plain,
            tag: None,
            width: 0.0,
            height: 0.0,
            attached: false,
            enabled: Directions::empty(),
            locked: Directions::empty(),
            nested_scroll: Directions::ALL,
            nested_fling: Directions::ALL,
            direction: None,
            progress: 0.0,
            drag_state: DragState::Idle,
            swiping: false,
            open_distance: defaults.open_distance_px,
            swipe_open_distance: defaults.open_distance_px,
            swipe_max_distance: defaults.open_distance_px,
            over_swipe_factor: defaults.over_swipe_factor,
            release_mode: defaults.release_mode(),
            calculator: None,
            edge_size: defaults.edge_size_px,
            sensitivity: defaults.sensitivity,
            disable_swipe_on_settling: false,
            catch_settling: true,
            stay_min_velocity: None,
            cur_x: 0.0,
            cur_y: 0.0,
            display_x: 0.0,
            display_y: 0.0,
            carry: CarryOver::default(),
            presenter: None,
            back: None,
            content: None,
            listeners: ListenerRegistry::new(),
            deferred: VecDeque::new(),
        }
    }

    fn gate(&self) -> SwipeGate<'_> {
        SwipeGate {
            enabled: self.enabled,
            locked: self.locked,
            nested_scroll: self.nested_scroll,
            nested_fling: self.nested_fling,
            edge_size: self.edge_size,
            width: self.width,
            height: self.height,
            committed: self.direction,
            has_distance: self.cur_x != 0.0 || self.cur_y != 0.0,
            content: self.content.as_deref(),
        }
    }

    /// Open distance after the calculator's mapping
    fn effective_open_distance(&self) -> f32 {
        match &self.calculator {
            Some(calc) => calc.open_distance(self.open_distance),
            None => self.open_distance,
        }
    }

    fn usable(&self, direction: Direction) -> bool {
        self.enabled.contains(direction.flag()) && !self.locked.contains(direction.flag())
    }

    /// Signed clamped distance at `progress` of the committed direction
    fn target(&self, progress: f32) -> (f32, f32) {
        let distance = self.swipe_open_distance * progress;
        match self.direction {
            Some(Direction::Left) => (distance, 0.0),
            Some(Direction::Right) => (-distance, 0.0),
            Some(Direction::Top) => (0.0, distance),
            Some(Direction::Bottom) => (0.0, -distance),
            None => (0.0, 0.0),
        }
    }

    fn dispatch(&mut self, notify: impl Fn(&dyn SwipeListener, &mut SwipeContext)) {
        let snapshot = self.listeners.snapshot();
        if snapshot.is_empty() {
            return;
        }
        let mut commands = Vec::new();
        for (id, listener) in snapshot {
            let mut ctx = SwipeContext::new(self.id, self.direction, self.progress, self.drag_state, id);
            notify(listener.as_ref(), &mut ctx);
            commands.extend(ctx.into_commands());
        }
        self.apply_commands(commands);
    }

    fn apply_commands(&mut self, commands: Vec<ConsumerCommand>) {
        for command in commands {
            match command {
                ConsumerCommand::Lock(directions) => self.locked.insert(directions),
                ConsumerCommand::Unlock(directions) => self.locked.remove(directions),
                ConsumerCommand::RemoveListener(id) => {
                    self.listeners.remove(id);
                }
                motion => self.deferred.push_back(motion),
            }
        }
    }

    /// Start a programmatic swipe in the committed direction
    fn begin_swipe(&mut self) {
        self.on_swipe_accepted(PointerId::Touch(0), true, 0.0, 0.0);
    }

    fn on_opened(&mut self) {
        if let Some(direction) = self.direction {
            tracing::debug!(consumer = %self.id, direction = %direction, "opened");
            self.dispatch(|l, ctx| l.on_swipe_opened(ctx, direction));
        }
        if let Some(back) = &self.back {
            back.on_opened();
        }
    }

    fn on_closed(&mut self) {
        if let Some(direction) = self.direction {
            tracing::debug!(consumer = %self.id, direction = %direction, "closed");
            self.dispatch(|l, ctx| l.on_swipe_closed(ctx, direction));
        }
        self.direction = None;
        if let Some(back) = &self.back {
            back.on_closed();
        }
    }

    fn reset(&mut self) {
        self.direction = None;
        self.progress = 0.0;
        self.carry.clear();
        self.cur_x = 0.0;
        self.cur_y = 0.0;
        self.display_x = 0.0;
        self.display_y = 0.0;
    }

    /// Lock `direction` until the next open (or close), unless already locked
    fn lock_until(&mut self, direction: Direction, on: UnlockOn) {
        if self.locked.contains(direction.flag()) {
            return;
        }
        self.locked.insert(direction.flag());
        self.listeners.add(Rc::new(OnceUnlock { direction, on }));
    }
}

impl SwipeDelegate for ConsumerCore {
    fn try_accept_settling(&mut self, pointer: PointerId, _x: f32, _y: f32, state: DragState) -> bool {
        if !self.catch_settling {
            return false;
        }
        let Some(direction) = self.direction else {
            return false;
        };
        if self.gate().nested_disabled(pointer, direction) {
            return false;
        }
        if self.disable_swipe_on_settling && state == DragState::Settling {
            return false;
        }
        self.usable(direction)
    }

    fn try_accept_moving(&mut self, pointer: PointerId, down_x: f32, down_y: f32, dx: f32, dy: f32) -> bool {
        let motion = Motion::new(pointer, down_x, down_y, dx, dy);
        match self.gate().calc_direction(&motion) {
            Some(direction) => {
                tracing::debug!(consumer = %self.id, pointer = %pointer, direction = %direction, "direction committed");
                self.direction = Some(direction);
                true
            }
            None => false,
        }
    }

    fn on_swipe_accepted(&mut self, pointer: PointerId, settling: bool, _x: f32, _y: f32) {
        self.swiping = true;
        if let (Some(back), Some(direction)) = (&self.back, self.direction) {
            back.on_accepted(direction, (self.width, self.height));
        }
        self.carry.capture(self.cur_x, self.cur_y);
        self.swipe_open_distance = self.effective_open_distance();
        self.swipe_max_distance = if self.over_swipe_factor > 0.0 {
            self.swipe_open_distance * (1.0 + self.over_swipe_factor)
        } else {
            self.swipe_open_distance
        };
        tracing::debug!(
            consumer = %self.id,
            pointer = %pointer,
            settling,
            open = self.swipe_open_distance,
            max = self.swipe_max_distance,
            "swipe accepted"
        );
        if let Some(direction) = self.direction {
            self.dispatch(|l, ctx| l.on_swipe_start(ctx, direction));
        }
    }

    fn horizontal_range(&self, dx: f32, _dy: f32) -> f32 {
        if self.cur_x != 0.0
            || dx > 0.0 && self.usable(Direction::Left)
            || dx < 0.0 && self.usable(Direction::Right)
        {
            self.effective_open_distance()
        } else {
            0.0
        }
    }

    fn vertical_range(&self, _dx: f32, dy: f32) -> f32 {
        if self.cur_y != 0.0
            || dy > 0.0 && self.usable(Direction::Top)
            || dy < 0.0 && self.usable(Direction::Bottom)
        {
            self.effective_open_distance()
        } else {
            0.0
        }
    }

    fn clamp_horizontal(&mut self, distance: f32, _dx: f32) -> f32 {
        if self.back.as_ref().is_some_and(|b| !b.is_translucent()) {
            return 0.0;
        }
        let distance = distance + self.carry.take(Axis::Horizontal);
        clamp_distance(self.direction, self.enabled, Axis::Horizontal, distance, self.swipe_max_distance)
    }

    fn clamp_vertical(&mut self, distance: f32, _dy: f32) -> f32 {
        if self.back.as_ref().is_some_and(|b| !b.is_translucent()) {
            return 0.0;
        }
        let distance = distance + self.carry.take(Axis::Vertical);
        clamp_distance(self.direction, self.enabled, Axis::Vertical, distance, self.swipe_max_distance)
    }

    fn on_distance_changed(&mut self, x: f32, y: f32, dx: f32, dy: f32, state: DragState) {
        if self.open_distance <= 0.0 {
            return;
        }
        let last_progress = self.progress;
        if x != self.cur_x || y != self.cur_y {
            self.cur_x = x;
            self.cur_y = y;
            if self.swipe_open_distance <= 0.0 {
                self.progress = 0.0;
            } else if let Some(direction) = self.direction {
                let along = match direction.axis() {
                    Axis::Horizontal => x,
                    Axis::Vertical => y,
                };
                self.progress = (along / self.swipe_open_distance).abs();
            }

            let (mut ddx, mut ddy) = (dx, dy);
            match self.direction.map(Direction::axis) {
                Some(Axis::Horizontal) => {
                    let shown = match &self.calculator {
                        Some(calc) => calc.display_distance(x, self.progress),
                        None => x,
                    };
                    ddx = shown - self.display_x;
                    ddy = 0.0;
                    self.display_x = shown;
                }
                Some(Axis::Vertical) => {
                    let shown = match &self.calculator {
                        Some(calc) => calc.display_distance(y, self.progress),
                        None => y,
                    };
                    ddx = 0.0;
                    ddy = shown - self.display_y;
                    self.display_y = shown;
                }
                None => {}
            }
            if let Some(presenter) = self.presenter.as_mut() {
                presenter.on_display_distance_changed(self.direction, self.display_x, self.display_y, ddx, ddy);
            }
            if let (Some(back), Some(direction)) = (&self.back, self.direction) {
                back.on_progress(direction, (self.width, self.height), self.progress);
            }
        }

        if self.progress != last_progress {
            if let Some(direction) = self.direction {
                let settling = state == DragState::Settling;
                let progress = self.progress;
                tracing::trace!(consumer = %self.id, progress, settling, "progress");
                self.dispatch(|l, ctx| l.on_swipe_process(ctx, direction, settling, progress));
            }
        }
    }

    fn on_released(&mut self, xvel: f32, yvel: f32) -> Option<(f32, f32)> {
        if let Some(direction) = self.direction {
            let progress = self.progress;
            tracing::debug!(consumer = %self.id, progress, xvel, yvel, "released");
            self.dispatch(|l, ctx| l.on_swipe_release(ctx, direction, progress, xvel, yvel));
        }

        if let (Some(min), Some(direction)) = (self.stay_min_velocity, self.direction) {
            let flung = if xvel.abs() > yvel.abs() {
                direction == Direction::Left && xvel >= min || direction == Direction::Right && xvel <= -min
            } else {
                direction == Direction::Top && yvel >= min || direction == Direction::Bottom && yvel <= -min
            };
            if flung {
                let (x, y) = self.target(1.0);
                self.cur_x = x;
                self.cur_y = y;
                self.progress = 1.0;
            }
        }

        if self.progress >= 1.0 && self.release_mode.contains(ReleaseMode::HOLD_OPEN) {
            return Some(self.target(1.0));
        }

        let auto = self.release_mode & ReleaseMode::AUTO_OPEN_CLOSE;
        if auto == ReleaseMode::AUTO_OPEN_CLOSE {
            let open = match self.direction {
                Some(Direction::Left) => xvel > 0.0 || xvel == 0.0 && self.progress > 0.5,
                Some(Direction::Right) => xvel < 0.0 || xvel == 0.0 && self.progress > 0.5,
                Some(Direction::Top) => yvel > 0.0 || yvel == 0.0 && self.progress > 0.5,
                Some(Direction::Bottom) => yvel < 0.0 || yvel == 0.0 && self.progress > 0.5,
                None => false,
            };
            Some(self.target(if open { 1.0 } else { 0.0 }))
        } else if auto == ReleaseMode::AUTO_OPEN {
            Some(self.target(1.0))
        } else if auto == ReleaseMode::AUTO_CLOSE {
            if self.progress >= 1.0 {
                self.on_opened();
            }
            Some(self.target(0.0))
        } else {
            None
        }
    }

    fn on_state_changed(&mut self, state: DragState) {
        tracing::debug!(consumer = %self.id, state = %state, progress = self.progress, "state changed");
        self.drag_state = state;
        self.dispatch(|l, ctx| l.on_state_changed(ctx, state));
        if state == DragState::Idle {
            self.swiping = false;
            if self.progress >= 1.0 {
                self.on_opened();
            } else if self.progress <= 0.0 {
                self.on_closed();
            }
        }
    }

    fn extent(&self) -> (f32, f32) {
        (self.width, self.height)
    }
}

/// A swipe behavior: settings and progress plus the drag state machine driving it
pub struct SwipeConsumer {
    core: ConsumerCore,
    drag: DragStateMachine,
}

impl Default for SwipeConsumer {
    fn default() -> Self {
        Self::new()
    }
}

impl SwipeConsumer {
    /// Consumer with built-in defaults and no direction enabled
    pub fn new() -> Self {
        Self::build(&GestureConfig::default(), &ConsumerDefaults::default())
    }

    /// Consumer initialised from a validated configuration
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(&config.gesture, &config.consumer))
    }

    /// Consumer configured as one of the preset kinds
    pub fn with_kind(kind: ConsumerKind, config: &AppConfig) -> Result<Self> {
        let mut consumer = Self::from_config(config)?;
        kind.apply(&mut consumer, &config.consumer)?;
        Ok(consumer)
    }

    fn build(gesture: &GestureConfig, defaults: &ConsumerDefaults) -> Self {
        Self {
            core: ConsumerCore::new(defaults),
            drag: DragStateMachine::new(gesture, defaults.sensitivity, defaults.easing.into()),
        }
    }

    pub fn into_handle(self) -> ConsumerHandle {
        Rc::new(RefCell::new(self))
    }

    pub fn id(&self) -> ConsumerId {
        self.core.id
    }

    pub fn kind(&self) -> ConsumerKind {
        self.core.kind
    }

    pub(crate) fn set_kind(&mut self, kind: ConsumerKind) {
        self.core.kind = kind;
    }

    pub fn tag(&self) -> Option<&str> {
        self.core.tag.as_deref()
    }

    pub fn set_tag(&mut self, tag: impl Into<String>) {
        self.core.tag = Some(tag.into());
    }

    pub fn width(&self) -> f32 {
        self.core.width
    }

    pub fn height(&self) -> f32 {
        self.core.height
    }

    pub fn set_size(&mut self, width: f32, height: f32) {
        self.core.width = width;
        self.core.height = height;
    }

    pub fn is_attached(&self) -> bool {
        self.core.attached
    }

    // ---- swipe status ----

    pub fn direction(&self) -> Option<Direction> {
        self.core.direction
    }

    pub fn progress(&self) -> f32 {
        self.core.progress
    }

    pub fn state(&self) -> DragState {
        self.drag.state()
    }

    pub fn is_swiping(&self) -> bool {
        self.core.swiping
    }

    pub fn is_opened(&self) -> bool {
        self.drag.state() == DragState::Idle && self.core.progress >= 1.0
    }

    pub fn is_closed(&self) -> bool {
        self.drag.state() == DragState::Idle && self.core.progress <= 0.0
    }

    /// Current clamped swipe distance
    pub fn swipe_distance(&self) -> (f32, f32) {
        (self.core.cur_x, self.core.cur_y)
    }

    /// Distance last handed to the presenter
    pub fn display_distance(&self) -> (f32, f32) {
        (self.core.display_x, self.core.display_y)
    }

    // ---- directions ----

    pub fn enabled_directions(&self) -> Directions {
        self.core.enabled
    }

    pub fn enable_direction(&mut self, directions: impl Into<Directions>) {
        self.core.enabled.insert(directions.into());
    }

    pub fn disable_direction(&mut self, directions: impl Into<Directions>) {
        self.core.enabled.remove(directions.into());
    }

    /// True when every direction in `directions` is enabled
    pub fn is_direction_enabled(&self, directions: impl Into<Directions>) -> bool {
        let directions = directions.into();
        !directions.is_empty() && self.core.enabled.contains(directions)
    }

    pub fn locked_directions(&self) -> Directions {
        self.core.locked
    }

    pub fn lock_direction(&mut self, directions: impl Into<Directions>) {
        self.core.locked.insert(directions.into());
    }

    pub fn unlock_direction(&mut self, directions: impl Into<Directions>) {
        self.core.locked.remove(directions.into());
    }

    pub fn is_direction_locked(&self, directions: impl Into<Directions>) -> bool {
        let directions = directions.into();
        !directions.is_empty() && self.core.locked.contains(directions)
    }

    pub fn enable_nested_scroll(&mut self, directions: impl Into<Directions>, enable: bool) {
        self.core.nested_scroll.set(directions.into(), enable);
    }

    pub fn enable_nested_fling(&mut self, directions: impl Into<Directions>, enable: bool) {
        self.core.nested_fling.set(directions.into(), enable);
    }

    pub fn nested_scroll_directions(&self) -> Directions {
        self.core.nested_scroll
    }

    pub fn nested_fling_directions(&self) -> Directions {
        self.core.nested_fling
    }

    // ---- settings ----

    pub fn open_distance(&self) -> f32 {
        self.core.open_distance
    }

    pub fn set_open_distance(&mut self, distance: f32) -> Result<()> {
        if !(distance >= 0.0) {
            return Err(reject("open_distance", distance));
        }
        self.core.open_distance = distance;
        Ok(())
    }

    /// Distance at which progress reaches 1, after the calculator's mapping
    pub fn swipe_open_distance(&self) -> f32 {
        self.core.effective_open_distance()
    }

    pub fn over_swipe_factor(&self) -> f32 {
        self.core.over_swipe_factor
    }

    pub fn set_over_swipe_factor(&mut self, factor: f32) -> Result<()> {
        if !(factor >= 0.0) || !factor.is_finite() {
            return Err(reject("over_swipe_factor", factor));
        }
        self.core.over_swipe_factor = factor;
        Ok(())
    }

    pub fn release_mode(&self) -> ReleaseMode {
        self.core.release_mode
    }

    pub fn set_release_mode(&mut self, mode: ReleaseMode) {
        self.core.release_mode = mode;
    }

    pub fn edge_size(&self) -> f32 {
        self.core.edge_size
    }

    pub fn set_edge_size(&mut self, size: f32) -> Result<()> {
        if !(size >= 0.0) {
            return Err(reject("edge_size", size));
        }
        self.core.edge_size = size;
        Ok(())
    }

    pub fn sensitivity(&self) -> f32 {
        self.core.sensitivity
    }

    pub fn set_sensitivity(&mut self, sensitivity: f32) -> Result<()> {
        if !(sensitivity > 0.0) || !sensitivity.is_finite() {
            return Err(reject("sensitivity", sensitivity));
        }
        self.core.sensitivity = sensitivity;
        self.drag.set_sensitivity(sensitivity);
        Ok(())
    }

    pub fn touch_slop(&self) -> f32 {
        self.drag.touch_slop()
    }

    pub fn max_settle_duration_ms(&self) -> u64 {
        self.drag.settle_params().max_duration_ms
    }

    pub fn set_max_settle_duration(&mut self, ms: u64) {
        self.drag.set_max_settle_duration(ms);
    }

    pub fn set_interpolator(&mut self, interpolator: impl Into<Interpolator>) {
        self.drag.set_interpolator(interpolator.into());
    }

    pub fn disable_swipe_on_settling(&self) -> bool {
        self.core.disable_swipe_on_settling
    }

    pub fn set_disable_swipe_on_settling(&mut self, disable: bool) {
        self.core.disable_swipe_on_settling = disable;
    }

    /// Whether a pointer landing mid-settle may grab the swipe
    pub fn catch_settling(&self) -> bool {
        self.core.catch_settling
    }

    pub fn set_catch_settling(&mut self, catch: bool) {
        self.core.catch_settling = catch;
    }

    pub fn set_distance_calculator(&mut self, calculator: Option<Rc<dyn DistanceCalculator>>) {
        self.core.calculator = calculator;
    }

    pub fn has_distance_calculator(&self) -> bool {
        self.core.calculator.is_some()
    }

    /// Release velocity that snaps the swipe fully open, or None to disable
    pub fn stay_min_velocity(&self) -> Option<f32> {
        self.core.stay_min_velocity
    }

    pub fn set_stay_min_velocity(&mut self, velocity: Option<f32>) -> Result<()> {
        if let Some(v) = velocity {
            if !(v > 0.0) {
                return Err(reject("stay_min_velocity", v));
            }
        }
        self.core.stay_min_velocity = velocity;
        Ok(())
    }

    pub fn set_presenter(&mut self, presenter: Option<Box<dyn SwipePresenter>>) {
        self.core.presenter = presenter;
    }

    pub fn back_binding(&self) -> Option<&BackBinding> {
        self.core.back.as_ref()
    }

    pub fn set_back_binding(&mut self, binding: Option<BackBinding>) {
        self.core.back = binding;
    }

    /// Content probed for scrollable descendants during arbitration
    pub fn set_content(&mut self, content: Option<Rc<dyn ScrollProbe>>) {
        self.core.content = content;
    }

    // ---- listeners ----

    pub fn add_listener(&mut self, listener: Rc<dyn SwipeListener>) -> ListenerId {
        self.core.listeners.add(listener)
    }

    /// Register a listener notified before every other one
    pub fn add_priority_listener(&mut self, listener: Rc<dyn SwipeListener>) -> ListenerId {
        self.core.listeners.add_first(listener)
    }

    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        self.core.listeners.remove(id)
    }

    pub fn clear_listeners(&mut self) {
        self.core.listeners.clear();
    }

    pub fn listener_count(&self) -> usize {
        self.core.listeners.len()
    }

    // ---- lifecycle ----

    pub fn attach(&mut self, width: f32, height: f32) {
        self.set_size(width, height);
        self.core.attached = true;
        self.core.dispatch(|l, ctx| l.on_attached(ctx));
        self.run_deferred();
    }

    pub fn detach(&mut self) {
        self.core.dispatch(|l, ctx| l.on_detached(ctx));
        self.drag.abort(&mut self.core);
        self.core.reset();
        self.drag.reset_clamped();
        self.core.attached = false;
        if let Some(back) = &self.core.back {
            back.on_detached();
        }
        self.core.deferred.clear();
    }

    // ---- programmatic motion ----

    /// Open towards `direction`, locking it until fully open
    pub fn open(&mut self, smooth: bool, direction: Direction) {
        self.open_now(smooth, direction);
        self.run_deferred();
    }

    /// Close the committed direction, locking it until fully closed
    pub fn close(&mut self, smooth: bool) {
        self.close_now(smooth);
        self.run_deferred();
    }

    /// Move to `progress` (clamped to `[0, 1]`) in the committed direction
    pub fn slide_to(&mut self, smooth: bool, progress: f32) {
        self.slide_to_now(smooth, progress);
        self.run_deferred();
    }

    pub fn smooth_slide_to(&mut self, progress: f32) {
        self.slide_to(true, progress);
    }

    /// Treat the current position as closed without animating
    pub fn set_current_state_as_closed(&mut self) {
        self.core.on_closed();
        self.core.reset();
        self.drag.reset_clamped();
        self.run_deferred();
    }

    fn open_now(&mut self, smooth: bool, direction: Direction) {
        match self.core.direction {
            None => {
                if !self.core.enabled.contains(direction.flag()) {
                    tracing::debug!(consumer = %self.core.id, direction = %direction, "open ignored, direction disabled");
                    return;
                }
                self.core.direction = Some(direction);
                self.core.begin_swipe();
            }
            Some(current) if current != direction || self.core.progress == 1.0 => return,
            Some(_) => {}
        }
        self.core.lock_until(direction, UnlockOn::Opened);
        self.slide_to_now(smooth, 1.0);
    }

    fn close_now(&mut self, smooth: bool) {
        let Some(direction) = self.core.direction else {
            return;
        };
        if self.core.progress == 0.0 {
            return;
        }
        self.core.begin_swipe();
        self.core.carry.clear();
        self.core.lock_until(direction, UnlockOn::Closed);
        if smooth {
            self.drag.smooth_slide_to(&mut self.core, 0.0, 0.0);
        } else {
            self.drag.slide_immediately(&mut self.core, 0.0, 0.0);
        }
    }

    fn slide_to_now(&mut self, smooth: bool, progress: f32) {
        let progress = progress.clamp(0.0, 1.0);
        let (x, y) = self.core.target(progress);
        if smooth {
            self.drag.smooth_slide_to(&mut self.core, x, y);
        } else {
            self.drag.slide_immediately(&mut self.core, x, y);
        }
    }

    /// Run motion commands listeners queued during the last call
    fn run_deferred(&mut self) {
        let mut budget = MAX_DEFERRED_COMMANDS;
        while let Some(command) = self.core.deferred.pop_front() {
            if budget == 0 {
                tracing::warn!(
                    consumer = %self.core.id,
                    dropped = self.core.deferred.len() + 1,
                    "too many listener commands, dropping the rest"
                );
                self.core.deferred.clear();
                break;
            }
            budget -= 1;
            match command {
                ConsumerCommand::Open { smooth, direction } => self.open_now(smooth, direction),
                ConsumerCommand::Close { smooth } => self.close_now(smooth),
                ConsumerCommand::SlideTo { smooth, progress } => self.slide_to_now(smooth, progress),
                other => self.core.apply_commands(vec![other]),
            }
        }
    }

    // ---- engine entry points ----

    /// Direction the given motion would commit to, without committing it
    pub fn calc_direction(&self, pointer: PointerId, down_x: f32, down_y: f32, dx: f32, dy: f32) -> Option<Direction> {
        self.core
            .gate()
            .calc_direction(&Motion::new(pointer, down_x, down_y, dx, dy))
    }

    pub(crate) fn claims(&self, motion: &Motion) -> Option<Direction> {
        self.core.gate().calc_direction(motion)
    }

    pub fn should_intercept(&mut self, event: &MotionEvent) -> bool {
        let intercept = self.drag.should_intercept(&mut self.core, event);
        self.run_deferred();
        intercept
    }

    pub fn process_touch(&mut self, event: &MotionEvent) {
        self.drag.process(&mut self.core, event);
        self.run_deferred();
    }

    /// Advance a running settle; returns true while another frame is needed
    pub fn continue_settling(&mut self, now_ms: u64) -> bool {
        let settling = self.drag.continue_settling(&mut self.core, now_ms);
        self.run_deferred();
        settling || self.drag.state() == DragState::Settling
    }

    pub fn sync_clock(&mut self, now_ms: u64) {
        self.drag.sync_clock(now_ms);
    }

    pub fn clock_ms(&self) -> u64 {
        self.drag.now_ms()
    }

    /// Stop any settle in place and go idle
    pub fn abort(&mut self) {
        self.drag.abort(&mut self.core);
        self.run_deferred();
    }

    /// Drive the swipe with a nested delta in swipe space, starting one if
    /// this consumer accepts the delta
    pub fn nested_drag(&mut self, dx: f32, dy: f32, fly: bool) -> bool {
        let moved = self.drag.nested_drag(&mut self.core, dx, dy, fly);
        self.run_deferred();
        moved
    }

    pub fn nested_release(&mut self) {
        self.drag.nested_release(&mut self.core);
        self.run_deferred();
    }

    pub fn active_pointer(&self) -> Option<PointerId> {
        self.drag.active_pointer()
    }
}

impl fmt::Debug for SwipeConsumer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SwipeConsumer")
            .field("id", &self.core.id)
            .field("kind", &self.core.kind)
            .field("direction", &self.core.direction)
            .field("progress", &self.core.progress)
            .field("state", &self.drag.state())
            .finish()
    }
}
