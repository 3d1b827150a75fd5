//! Recorded gesture traces.
//!
//! A trace describes a wrapper, the consumers attached to it and a timeline
//! of touch, frame, nested scroll and programmatic steps. [`Replay`] runs
//! the timeline through a real [`SwipeWrapper`] and records every listener
//! notification as a [`ReplayEvent`].

use std::cell::{Cell, RefCell};
use std::fmt;
use std::path::Path;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::config::AppConfig;
use crate::engine::{
    ConsumerHandle, DragState, ExclusiveGroup, NestedType, ReleaseMode, ReleasePolicy, ScrollAxes,
    SwipeConsumer, SwipeContext, SwipeListener, SwipeWrapper,
};
use crate::error::{Error, Result};
use crate::input::{Direction, Directions, MotionEvent};
use crate::motion::EasingType;
use crate::preset::ConsumerKind;

/// Frames a single settle step may run before giving up
const MAX_SETTLE_FRAMES: u32 = 10_000;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trace {
    pub width: f32,
    pub height: f32,
    /// Whether the content under the wrapper takes down events
    #[serde(default)]
    pub content_touchable: bool,
    #[serde(default)]
    pub consumers: Vec<ConsumerSpec>,
    #[serde(default)]
    pub group: Option<GroupSpec>,
    #[serde(default)]
    pub steps: Vec<Step>,
}

/// A consumer to attach; unset fields keep the kind's defaults
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConsumerSpec {
    #[serde(default)]
    pub kind: ConsumerKind,
    pub tag: Option<String>,
    #[serde(default)]
    pub directions: Vec<Direction>,
    pub open_distance: Option<f32>,
    pub over_swipe_factor: Option<f32>,
    pub edge_size: Option<f32>,
    pub sensitivity: Option<f32>,
    pub release: Option<ReleasePolicy>,
    pub hold_open: Option<bool>,
    pub easing: Option<EasingType>,
    pub max_settle_duration_ms: Option<u64>,
    /// Nested scroll and fling handoff are on unless turned off here
    pub nested_scroll: Option<bool>,
    pub nested_fling: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupSpec {
    /// Indexes into `consumers`
    pub members: Vec<usize>,
    #[serde(default = "default_true")]
    pub smooth: bool,
    #[serde(default)]
    pub lock_other: bool,
}

fn default_true() -> bool {
    true
}

/// One timeline entry.
///
/// Non-touch steps carry an optional `time_ms`; time never moves backwards,
/// so an omitted or earlier time runs at the current replay time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Step {
    Touch(MotionEvent),
    /// Advance settle animations by one frame
    Frame { time_ms: u64 },
    /// Run frames until every consumer is at rest
    Settle {
        #[serde(default)]
        time_ms: u64,
    },
    NestedStart {
        #[serde(default)]
        horizontal: bool,
        #[serde(default)]
        vertical: bool,
        kind: NestedType,
        #[serde(default)]
        time_ms: u64,
    },
    NestedPreScroll {
        dx: f32,
        dy: f32,
        kind: NestedType,
        #[serde(default)]
        time_ms: u64,
    },
    NestedScroll {
        dx: f32,
        dy: f32,
        kind: NestedType,
        #[serde(default)]
        time_ms: u64,
    },
    NestedStop {
        kind: NestedType,
        #[serde(default)]
        time_ms: u64,
    },
    Open {
        consumer: usize,
        direction: Direction,
        #[serde(default)]
        smooth: bool,
        #[serde(default)]
        time_ms: u64,
    },
    Close {
        consumer: usize,
        #[serde(default)]
        smooth: bool,
        #[serde(default)]
        time_ms: u64,
    },
    SlideTo {
        consumer: usize,
        progress: f32,
        #[serde(default)]
        smooth: bool,
        #[serde(default)]
        time_ms: u64,
    },
}

impl Step {
    pub fn time_ms(&self) -> u64 {
        match self {
            Step::Touch(event) => event.time_ms,
            Step::Frame { time_ms }
            | Step::Settle { time_ms }
            | Step::NestedStart { time_ms, .. }
            | Step::NestedPreScroll { time_ms, .. }
            | Step::NestedScroll { time_ms, .. }
            | Step::NestedStop { time_ms, .. }
            | Step::Open { time_ms, .. }
            | Step::Close { time_ms, .. }
            | Step::SlideTo { time_ms, .. } => *time_ms,
        }
    }
}

impl Trace {
    pub fn from_json_str(content: &str) -> Result<Self> {
        let trace: Self = serde_json::from_str(content).map_err(|e| Error::Trace(e.to_string()))?;
        trace.validate()?;
        Ok(trace)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let trace: Self = toml::from_str(content).map_err(|e| Error::Trace(e.to_string()))?;
        trace.validate()?;
        Ok(trace)
    }

    /// Load a trace file; `.toml` files are read as TOML, anything else as JSON
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Self::from_toml_str(&content),
            _ => Self::from_json_str(&content),
        }
    }

    /// Check sizes and that every consumer index points at a consumer
    pub fn validate(&self) -> Result<()> {
        if !(self.width > 0.0) || !(self.height > 0.0) {
            return Err(Error::Trace(format!(
                "wrapper size must be positive, got {}x{}",
                self.width, self.height
            )));
        }
        let count = self.consumers.len();
        if let Some(group) = &self.group {
            if let Some(index) = group.members.iter().find(|&&i| i >= count) {
                return Err(Error::Trace(format!("group member {} out of range", index)));
            }
        }
        for (n, step) in self.steps.iter().enumerate() {
            let index = match step {
                Step::Open { consumer, .. } | Step::Close { consumer, .. } | Step::SlideTo { consumer, .. } => {
                    *consumer
                }
                _ => continue,
            };
            if index >= count {
                return Err(Error::Trace(format!("step {} targets consumer {} out of range", n, index)));
            }
        }
        Ok(())
    }
}

/// Listener notification captured during a replay
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReplayEvent {
    pub time_ms: u64,
    /// Index of the consumer in the trace
    pub consumer: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(flatten)]
    pub kind: EventKind,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EventKind {
    StateChanged { state: DragState },
    Start { direction: Direction },
    Progress { direction: Direction, progress: f32, settling: bool },
    Release { direction: Direction, progress: f32, xvel: f32, yvel: f32 },
    Opened { direction: Direction },
    Closed { direction: Direction },
}

impl fmt::Display for ReplayEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:>6}ms #{}", self.time_ms, self.consumer)?;
        if let Some(tag) = &self.tag {
            write!(f, " ({})", tag)?;
        }
        match &self.kind {
            EventKind::StateChanged { state } => write!(f, " state {}", state),
            EventKind::Start { direction } => write!(f, " start {}", direction.name()),
            EventKind::Progress {
                direction,
                progress,
                settling,
            } => write!(
                f,
                " progress {} {:.3}{}",
                direction.name(),
                progress,
                if *settling { " settling" } else { "" }
            ),
            EventKind::Release {
                direction,
                progress,
                xvel,
                yvel,
            } => write!(
                f,
                " release {} {:.3} v=({:.0}, {:.0})",
                direction.name(),
                progress,
                xvel,
                yvel
            ),
            EventKind::Opened { direction } => write!(f, " opened {}", direction.name()),
            EventKind::Closed { direction } => write!(f, " closed {}", direction.name()),
        }
    }
}

/// Final state of one consumer after a replay
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConsumerStatus {
    pub consumer: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    pub kind: ConsumerKind,
    pub state: DragState,
    pub direction: Option<Direction>,
    pub progress: f32,
}

type EventLog = Rc<RefCell<Vec<ReplayEvent>>>;

struct RecordingListener {
    index: usize,
    tag: Option<String>,
    clock: Rc<Cell<u64>>,
    log: EventLog,
}

impl RecordingListener {
    fn push(&self, kind: EventKind) {
        self.log.borrow_mut().push(ReplayEvent {
            time_ms: self.clock.get(),
            consumer: self.index,
            tag: self.tag.clone(),
            kind,
        });
    }
}

impl SwipeListener for RecordingListener {
    fn on_state_changed(&self, _ctx: &mut SwipeContext, state: DragState) {
        self.push(EventKind::StateChanged { state });
    }

    fn on_swipe_start(&self, _ctx: &mut SwipeContext, direction: Direction) {
        self.push(EventKind::Start { direction });
    }

    fn on_swipe_process(&self, _ctx: &mut SwipeContext, direction: Direction, settling: bool, progress: f32) {
        self.push(EventKind::Progress {
            direction,
            progress,
            settling,
        });
    }

    fn on_swipe_release(&self, _ctx: &mut SwipeContext, direction: Direction, progress: f32, xvel: f32, yvel: f32) {
        self.push(EventKind::Release {
            direction,
            progress,
            xvel,
            yvel,
        });
    }

    fn on_swipe_opened(&self, _ctx: &mut SwipeContext, direction: Direction) {
        self.push(EventKind::Opened { direction });
    }

    fn on_swipe_closed(&self, _ctx: &mut SwipeContext, direction: Direction) {
        self.push(EventKind::Closed { direction });
    }
}

/// A trace wired up and ready to run
pub struct Replay {
    // Declared before the wrapper so it detaches from members first
    group: Option<ExclusiveGroup>,
    wrapper: SwipeWrapper,
    handles: Vec<ConsumerHandle>,
    content_touchable: bool,
    frame_interval_ms: u64,
    clock: Rc<Cell<u64>>,
    log: EventLog,
}

impl Replay {
    /// Build the wrapper and consumers described by `trace`
    ///
    /// # Arguments
    /// * `trace` - Validated trace
    /// * `config` - Source of gesture settings and consumer defaults
    pub fn new(trace: &Trace, config: &AppConfig) -> Result<Self> {
        trace.validate()?;
        let clock = Rc::new(Cell::new(0));
        let log: EventLog = Rc::new(RefCell::new(Vec::new()));
        let mut wrapper = SwipeWrapper::new(trace.width, trace.height);
        let mut handles = Vec::with_capacity(trace.consumers.len());

        for (index, spec) in trace.consumers.iter().enumerate() {
            let mut consumer = build_consumer(spec, config)?;
            consumer.add_listener(Rc::new(RecordingListener {
                index,
                tag: spec.tag.clone(),
                clock: clock.clone(),
                log: log.clone(),
            }));
            handles.push(wrapper.add_consumer(consumer));
        }

        let group = trace.group.as_ref().map(|spec| {
            let group = ExclusiveGroup::with_smooth(spec.smooth);
            group.set_lock_other(spec.lock_other);
            for &index in &spec.members {
                group.add(&handles[index]);
            }
            group
        });

        tracing::debug!(
            consumers = handles.len(),
            grouped = group.is_some(),
            "replay ready"
        );

        Ok(Self {
            group,
            wrapper,
            handles,
            content_touchable: trace.content_touchable,
            frame_interval_ms: config.gesture.frame_interval().as_millis() as u64,
            clock,
            log,
        })
    }

    pub fn now_ms(&self) -> u64 {
        self.clock.get()
    }

    pub fn wrapper(&self) -> &SwipeWrapper {
        &self.wrapper
    }

    pub fn consumer(&self, index: usize) -> Option<&ConsumerHandle> {
        self.handles.get(index)
    }

    pub fn group(&self) -> Option<&ExclusiveGroup> {
        self.group.as_ref()
    }

    /// Run one step
    pub fn apply(&mut self, step: &Step) -> Result<()> {
        self.advance_to(step.time_ms());
        match step {
            Step::Touch(event) => {
                self.wrapper.dispatch_touch(event, self.content_touchable);
            }
            Step::Frame { .. } => {
                self.wrapper.compute_scroll(self.now_ms());
            }
            Step::Settle { .. } => self.settle()?,
            Step::NestedStart {
                horizontal,
                vertical,
                kind,
                ..
            } => {
                let mut axes = ScrollAxes::empty();
                axes.set(ScrollAxes::HORIZONTAL, *horizontal);
                axes.set(ScrollAxes::VERTICAL, *vertical);
                if self.wrapper.on_start_nested_scroll(axes, *kind) {
                    self.wrapper.on_nested_scroll_accepted(axes, *kind);
                }
            }
            Step::NestedPreScroll { dx, dy, kind, .. } => {
                let consumed = self.wrapper.on_nested_pre_scroll(*dx, *dy, *kind);
                tracing::trace!(?consumed, "nested pre-scroll");
            }
            Step::NestedScroll { dx, dy, kind, .. } => {
                let consumed = self.wrapper.on_nested_scroll(0.0, 0.0, *dx, *dy, *kind);
                tracing::trace!(?consumed, "nested scroll");
            }
            Step::NestedStop { kind, .. } => self.wrapper.on_stop_nested_scroll(*kind),
            Step::Open {
                consumer,
                direction,
                smooth,
                ..
            } => {
                let handle = self.handle(*consumer)?;
                handle.borrow_mut().open(*smooth, *direction);
            }
            Step::Close { consumer, smooth, .. } => {
                let handle = self.handle(*consumer)?;
                handle.borrow_mut().close(*smooth);
            }
            Step::SlideTo {
                consumer,
                progress,
                smooth,
                ..
            } => {
                let handle = self.handle(*consumer)?;
                handle.borrow_mut().slide_to(*smooth, *progress);
            }
        }
        Ok(())
    }

    /// Run every step and return the recorded events
    pub fn run(&mut self, steps: &[Step]) -> Result<Vec<ReplayEvent>> {
        for step in steps {
            self.apply(step)?;
        }
        Ok(self.take_events())
    }

    pub fn take_events(&self) -> Vec<ReplayEvent> {
        std::mem::take(&mut *self.log.borrow_mut())
    }

    pub fn status(&self) -> Vec<ConsumerStatus> {
        self.handles
            .iter()
            .enumerate()
            .map(|(index, handle)| {
                let consumer = handle.borrow();
                ConsumerStatus {
                    consumer: index,
                    tag: consumer.tag().map(str::to_string),
                    kind: consumer.kind(),
                    state: consumer.state(),
                    direction: consumer.direction(),
                    progress: consumer.progress(),
                }
            })
            .collect()
    }

    fn handle(&self, index: usize) -> Result<ConsumerHandle> {
        self.handles
            .get(index)
            .cloned()
            .ok_or_else(|| Error::Trace(format!("no consumer at index {}", index)))
    }

    /// Move the replay clock forward; earlier times are ignored
    pub fn advance_to(&mut self, time_ms: u64) {
        if time_ms > self.clock.get() {
            self.clock.set(time_ms);
        }
        self.wrapper.sync_clock(self.clock.get());
    }

    pub fn frame_interval_ms(&self) -> u64 {
        self.frame_interval_ms
    }

    /// Run one frame at the current time and step the clock by one interval
    ///
    /// # Returns
    /// true while another frame is needed
    pub fn tick(&mut self) -> bool {
        let more = self.wrapper.compute_scroll(self.now_ms());
        if more {
            self.clock.set(self.now_ms() + self.frame_interval_ms);
        }
        more
    }

    fn settle(&mut self) -> Result<()> {
        let mut frames = 0;
        while self.tick() {
            frames += 1;
            if frames >= MAX_SETTLE_FRAMES {
                return Err(Error::Trace(format!(
                    "still settling after {} frames",
                    MAX_SETTLE_FRAMES
                )));
            }
        }
        tracing::trace!(frames, now_ms = self.now_ms(), "settled");
        Ok(())
    }
}

fn build_consumer(spec: &ConsumerSpec, config: &AppConfig) -> Result<SwipeConsumer> {
    let mut consumer = SwipeConsumer::with_kind(spec.kind, config)?;
    let directions = Directions::from_slice(&spec.directions);
    consumer.enable_direction(directions);
    if let Some(enable) = spec.nested_scroll {
        consumer.enable_nested_scroll(Directions::ALL, enable);
    }
    if let Some(enable) = spec.nested_fling {
        consumer.enable_nested_fling(Directions::ALL, enable);
    }
    if let Some(tag) = &spec.tag {
        consumer.set_tag(tag.clone());
    }
    if let Some(distance) = spec.open_distance {
        consumer.set_open_distance(distance)?;
    }
    if let Some(factor) = spec.over_swipe_factor {
        consumer.set_over_swipe_factor(factor)?;
    }
    if let Some(size) = spec.edge_size {
        consumer.set_edge_size(size)?;
    }
    if let Some(sensitivity) = spec.sensitivity {
        consumer.set_sensitivity(sensitivity)?;
    }
    if spec.release.is_some() || spec.hold_open.is_some() {
        let current = consumer.release_mode();
        let policy = spec.release.unwrap_or_else(|| current.policy());
        let hold_open = spec
            .hold_open
            .unwrap_or_else(|| current.contains(ReleaseMode::HOLD_OPEN));
        consumer.set_release_mode(ReleaseMode::from_policy(policy, hold_open));
    }
    if let Some(easing) = spec.easing {
        consumer.set_interpolator(easing);
    }
    if let Some(ms) = spec.max_settle_duration_ms {
        consumer.set_max_settle_duration(ms);
    }
    Ok(consumer)
}
