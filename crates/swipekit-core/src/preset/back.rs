//! Swipe-back support.
//!
//! The host owns its screen stack; a consumer only talks to it through the
//! two ports below. The previous screen is pulled along at
//! `relative_move_factor` of the swipe.

use std::cell::Cell;
use std::rc::Rc;

use crate::config::ConsumerDefaults;
use crate::error::{Error, Result};
use crate::input::{Axis, Direction};

/// Whether the current screen lets the previous one show through
pub trait TranslucencyPort {
    fn is_translucent(&self) -> bool;

    fn convert_to_translucent(&self);

    fn convert_from_translucent(&self);
}

/// Access to the screen below the current one
pub trait NavigationContext {
    fn has_previous(&self) -> bool;

    fn translate_previous(&self, x: f32, y: f32);

    fn reset_previous(&self);

    /// Leave the current screen
    fn finish(&self);
}

pub struct BackBinding {
    translucency: Rc<dyn TranslucencyPort>,
    navigation: Rc<dyn NavigationContext>,
    relative_move_factor: f32,
    finish_on_open: bool,
    init_translation: Cell<f32>,
    moving_previous: Cell<Option<Axis>>,
}

impl BackBinding {
    pub fn new(translucency: Rc<dyn TranslucencyPort>, navigation: Rc<dyn NavigationContext>) -> Self {
        Self {
            translucency,
            navigation,
            relative_move_factor: 0.5,
            finish_on_open: true,
            init_translation: Cell::new(0.0),
            moving_previous: Cell::new(None),
        }
    }

    /// Binding seeded with the configured move factor
    pub fn from_defaults(
        translucency: Rc<dyn TranslucencyPort>,
        navigation: Rc<dyn NavigationContext>,
        defaults: &ConsumerDefaults,
    ) -> Result<Self> {
        Self::new(translucency, navigation).with_relative_move_factor(defaults.relative_move_factor)
    }

    /// Zero keeps the previous screen still
    pub fn with_relative_move_factor(mut self, factor: f32) -> Result<Self> {
        if !(factor >= 0.0) || !factor.is_finite() {
            return Err(Error::invalid("relative_move_factor", factor));
        }
        self.relative_move_factor = factor;
        Ok(self)
    }

    pub fn with_finish_on_open(mut self, finish: bool) -> Self {
        self.finish_on_open = finish;
        self
    }

    pub fn relative_move_factor(&self) -> f32 {
        self.relative_move_factor
    }

    pub fn finish_on_open(&self) -> bool {
        self.finish_on_open
    }

    pub fn is_translucent(&self) -> bool {
        self.translucency.is_translucent()
    }

    pub(crate) fn on_detached(&self) {
        self.translucency.convert_from_translucent();
        self.reset_previous();
    }

    pub(crate) fn on_accepted(&self, direction: Direction, extent: (f32, f32)) {
        if !self.translucency.is_translucent() {
            self.translucency.convert_to_translucent();
        }
        if self.relative_move_factor > 0.0 && self.navigation.has_previous() {
            let span = axis_extent(direction, extent) * self.relative_move_factor;
            let init = -direction.sign() * span;
            self.init_translation.set(init);
            self.moving_previous.set(Some(direction.axis()));
            self.move_previous(init);
        }
    }

    pub(crate) fn on_progress(&self, direction: Direction, extent: (f32, f32), progress: f32) {
        if self.moving_previous.get().is_none() {
            return;
        }
        let travel = axis_extent(direction, extent) * progress * self.relative_move_factor;
        self.move_previous(self.init_translation.get() + direction.sign() * travel);
    }

    pub(crate) fn on_opened(&self) {
        if self.finish_on_open {
            tracing::debug!("swipe back finished the screen");
            self.navigation.finish();
        }
        self.reset_previous();
    }

    pub(crate) fn on_closed(&self) {
        self.translucency.convert_from_translucent();
        self.reset_previous();
    }

    fn move_previous(&self, translation: f32) {
        if !self.translucency.is_translucent() {
            return;
        }
        match self.moving_previous.get() {
            Some(Axis::Horizontal) => self.navigation.translate_previous(translation, 0.0),
            Some(Axis::Vertical) => self.navigation.translate_previous(0.0, translation),
            None => {}
        }
    }

    fn reset_previous(&self) {
        if self.moving_previous.take().is_some() {
            self.navigation.reset_previous();
        }
    }
}

fn axis_extent(direction: Direction, extent: (f32, f32)) -> f32 {
    match direction.axis() {
        Axis::Horizontal => extent.0,
        Axis::Vertical => extent.1,
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use crate::config::AppConfig;
    use crate::engine::consumer::SwipeConsumer;
    use crate::engine::drag::DragState;
    use crate::input::{Directions, MotionEvent};
    use crate::motion::EasingType;
    use crate::preset::ConsumerKind;

    #[derive(Default)]
    struct FakeWindow {
        translucent: Cell<bool>,
        refuse: bool,
        conversions: Cell<u32>,
    }

    impl TranslucencyPort for FakeWindow {
        fn is_translucent(&self) -> bool {
            self.translucent.get()
        }

        fn convert_to_translucent(&self) {
            self.conversions.set(self.conversions.get() + 1);
            if !self.refuse {
                self.translucent.set(true);
            }
        }

        fn convert_from_translucent(&self) {
            self.translucent.set(false);
        }
    }

    #[derive(Default)]
    struct FakeStack {
        translations: RefCell<Vec<(f32, f32)>>,
        resets: Cell<u32>,
        finished: Cell<bool>,
    }

    impl NavigationContext for FakeStack {
        fn has_previous(&self) -> bool {
            true
        }

        fn translate_previous(&self, x: f32, y: f32) {
            self.translations.borrow_mut().push((x, y));
        }

        fn reset_previous(&self) {
            self.resets.set(self.resets.get() + 1);
        }

        fn finish(&self) {
            self.finished.set(true);
        }
    }

    fn back_consumer(window: Rc<FakeWindow>, stack: Rc<FakeStack>) -> SwipeConsumer {
        let mut c = SwipeConsumer::with_kind(ConsumerKind::SlidingBack, &AppConfig::default()).unwrap();
        c.set_open_distance(400.0).unwrap();
        c.enable_direction(Directions::LEFT);
        c.set_interpolator(EasingType::Linear);
        c.set_back_binding(Some(BackBinding::new(window, stack)));
        c.attach(400.0, 800.0);
        c
    }

    fn settle(c: &mut SwipeConsumer, from: u64) {
        let mut now = from;
        while c.continue_settling(now) {
            now += 16;
        }
    }

    #[test]
    fn test_rejects_negative_factor() {
        let window: Rc<dyn TranslucencyPort> = Rc::new(FakeWindow::default());
        let stack: Rc<dyn NavigationContext> = Rc::new(FakeStack::default());
        assert!(BackBinding::new(window.clone(), stack.clone())
            .with_relative_move_factor(-0.1)
            .is_err());
        assert!(BackBinding::new(window.clone(), stack.clone()).with_relative_move_factor(0.3).is_ok());

        let mut defaults = ConsumerDefaults::default();
        defaults.relative_move_factor = 0.25;
        let binding = BackBinding::from_defaults(window, stack, &defaults).unwrap();
        assert_eq!(binding.relative_move_factor(), 0.25);
    }

    #[test]
    fn test_previous_screen_follows_progress() {
        let window = Rc::new(FakeWindow::default());
        let stack = Rc::new(FakeStack::default());
        let mut c = back_consumer(window.clone(), stack.clone());

        c.process_touch(&MotionEvent::down(0, 0.0, 100.0, 0));
        c.process_touch(&MotionEvent::moved(0, 20.0, 100.0, 500));
        assert!(window.is_translucent());
        assert_eq!(stack.translations.borrow().first(), Some(&(-200.0, 0.0)));

        c.process_touch(&MotionEvent::moved(0, 220.0, 100.0, 1000));
        assert!((c.progress() - 0.5).abs() < 1e-4);
        assert_eq!(stack.translations.borrow().last(), Some(&(-100.0, 0.0)));
    }

    #[test]
    fn test_open_finishes_and_close_restores_opacity() {
        let window = Rc::new(FakeWindow::default());
        let stack = Rc::new(FakeStack::default());
        let mut c = back_consumer(window.clone(), stack.clone());

        c.process_touch(&MotionEvent::down(0, 0.0, 100.0, 0));
        c.process_touch(&MotionEvent::moved(0, 20.0, 100.0, 500));
        c.process_touch(&MotionEvent::moved(0, 100.0, 100.0, 1000));
        c.process_touch(&MotionEvent::moved(0, 100.0, 100.0, 1100));
        c.process_touch(&MotionEvent::up(0, 100.0, 100.0, 1200));
        settle(&mut c, 1200);
        assert!(c.is_closed());
        assert!(!window.is_translucent());
        assert!(!stack.finished.get());
        assert_eq!(stack.resets.get(), 1);

        c.open(false, Direction::Left);
        assert!(stack.finished.get());
    }

    #[test]
    fn test_opaque_window_blocks_swipe() {
        let window = Rc::new(FakeWindow {
            refuse: true,
            ..Default::default()
        });
        let stack = Rc::new(FakeStack::default());
        let mut c = back_consumer(window.clone(), stack.clone());

        c.process_touch(&MotionEvent::down(0, 0.0, 100.0, 0));
        c.process_touch(&MotionEvent::moved(0, 20.0, 100.0, 500));
        c.process_touch(&MotionEvent::moved(0, 200.0, 100.0, 1000));
        assert_eq!(c.state(), DragState::Dragging);
        assert_eq!(c.progress(), 0.0);
        assert_eq!(window.conversions.get(), 1);
        assert!(stack.translations.borrow().is_empty());
    }
}
