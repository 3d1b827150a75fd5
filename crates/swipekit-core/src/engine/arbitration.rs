//! Direction arbitration.
//!
//! Decides which single direction (if any) a pointer session belongs to,
//! honoring enable and lock masks, edge bands and whether a descendant under
//! the down point can still scroll in the requested sense.

use std::rc::Rc;

use crate::input::{Axis, Direction, Directions, PointerId};

/// A descendant found under a point, with its offset inside the parent
pub struct ChildHit {
    pub node: Rc<dyn ScrollProbe>,
    pub left: f32,
    pub top: f32,
}

/// Host view tree node queried during arbitration.
///
/// Scroll direction arguments follow the platform convention: negative asks
/// whether content can scroll towards its start, positive towards its end.
pub trait ScrollProbe {
    /// Topmost child containing `(x, y)`, in this node's coordinates
    fn child_under(&self, _x: f32, _y: f32) -> Option<ChildHit> {
        None
    }

    fn can_scroll_horizontally(&self, _direction: i32) -> bool {
        false
    }

    fn can_scroll_vertically(&self, _direction: i32) -> bool {
        false
    }

    /// Present when this node hosts its own swipe consumers
    fn as_arbitrator(&self) -> Option<&dyn NestedArbitrator> {
        None
    }
}

/// A nested swipe host that may claim motion before its ancestors
pub trait NestedArbitrator {
    fn claims_motion(&self, motion: &Motion) -> bool;
}

/// Pointer motion offered for arbitration
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Motion {
    pub pointer: PointerId,
    pub down_x: f32,
    pub down_y: f32,
    pub dx: f32,
    pub dy: f32,
}

impl Motion {
    pub fn new(pointer: PointerId, down_x: f32, down_y: f32, dx: f32, dy: f32) -> Self {
        Self {
            pointer,
            down_x,
            down_y,
            dx,
            dy,
        }
    }

    fn translated(&self, left: f32, top: f32) -> Self {
        Self {
            down_x: self.down_x - left,
            down_y: self.down_y - top,
            ..*self
        }
    }
}

/// Snapshot of the consumer settings arbitration depends on
#[derive(Clone, Copy)]
pub struct SwipeGate<'a> {
    pub enabled: Directions,
    pub locked: Directions,
    pub nested_scroll: Directions,
    pub nested_fling: Directions,
    pub edge_size: f32,
    pub width: f32,
    pub height: f32,
    pub committed: Option<Direction>,
    pub has_distance: bool,
    pub content: Option<&'a dyn ScrollProbe>,
}

impl SwipeGate<'_> {
    /// True when `pointer` is a nested session and nesting is off for `direction`
    pub fn nested_disabled(&self, pointer: PointerId, direction: Direction) -> bool {
        match pointer {
            PointerId::NestedScroll => !self.nested_scroll.contains(direction.flag()),
            PointerId::NestedFling => !self.nested_fling.contains(direction.flag()),
            PointerId::Touch(_) => false,
        }
    }

    pub fn in_edge_band(&self, direction: Direction, x: f32, y: f32) -> bool {
        match direction {
            Direction::Left => x <= self.edge_size,
            Direction::Right => x >= self.width - self.edge_size,
            Direction::Top => y <= self.edge_size,
            Direction::Bottom => y >= self.height - self.edge_size,
        }
    }

    /// First enabled direction whose edge band contains the point
    pub fn edge_direction(&self, x: f32, y: f32) -> Option<Direction> {
        Direction::ALL
            .into_iter()
            .find(|&d| self.enabled.contains(d.flag()) && self.in_edge_band(d, x, y))
    }

    /// The direction this motion would commit to, or None
    pub fn calc_direction(&self, motion: &Motion) -> Option<Direction> {
        if self.committed.is_none() {
            let all_nested_off = match motion.pointer {
                PointerId::NestedScroll => self.nested_scroll.is_empty(),
                PointerId::NestedFling => self.nested_fling.is_empty(),
                PointerId::Touch(_) => false,
            };
            if all_nested_off {
                return None;
            }
        }

        let abs_x = motion.dx.abs();
        let abs_y = motion.dy.abs();

        if self.has_distance {
            if motion.dx == 0.0 && motion.dy == 0.0 {
                return None;
            }
            let dir = self.committed?;
            let same_axis = match dir.axis() {
                Axis::Horizontal => abs_x > abs_y,
                Axis::Vertical => abs_x < abs_y,
            };
            if same_axis
                && !self.locked.contains(dir.flag())
                && !self.nested_disabled(motion.pointer, dir)
            {
                return if self.child_claims(dir, motion) {
                    None
                } else {
                    Some(dir)
                };
            }
            return None;
        }

        let candidate = if abs_x == 0.0 && abs_y == 0.0 {
            if self.edge_size > 0.0 {
                self.edge_direction(motion.down_x, motion.down_y)
            } else {
                None
            }
        } else {
            self.dominant_direction(motion.dx, motion.dy).filter(|&d| {
                if self.edge_size > 0.0 {
                    self.in_edge_band(d, motion.down_x, motion.down_y)
                } else {
                    !self.child_claims(d, motion)
                }
            })
        };

        let dir = candidate?;
        if motion.pointer == PointerId::NestedFling && self.nested_fling.contains(dir.flag()) {
            return Some(dir);
        }
        if self.locked.contains(dir.flag()) || self.nested_disabled(motion.pointer, dir) {
            return None;
        }
        Some(dir)
    }

    fn dominant_direction(&self, dx: f32, dy: f32) -> Option<Direction> {
        let enabled = |d: Direction| self.enabled.contains(d.flag());
        if dx.abs() > dy.abs() {
            if dx > 0.0 && enabled(Direction::Left) {
                Some(Direction::Left)
            } else if dx < 0.0 && enabled(Direction::Right) {
                Some(Direction::Right)
            } else {
                None
            }
        } else if dy > 0.0 && enabled(Direction::Top) {
            Some(Direction::Top)
        } else if dy < 0.0 && enabled(Direction::Bottom) {
            Some(Direction::Bottom)
        } else {
            None
        }
    }

    fn child_claims(&self, direction: Direction, motion: &Motion) -> bool {
        self.content
            .map(|content| can_child_scroll(content, direction, motion))
            .unwrap_or(false)
    }
}

/// Whether a descendant of `parent` under the down point wants this motion.
///
/// Nested swipe hosts are asked first; plain scrollables are asked whether
/// they can still scroll opposite to the swipe. When the topmost child does
/// not claim it, its own children are searched with translated coordinates.
pub fn can_child_scroll(parent: &dyn ScrollProbe, direction: Direction, motion: &Motion) -> bool {
    let Some(hit) = parent.child_under(motion.down_x, motion.down_y) else {
        return false;
    };
    let local = motion.translated(hit.left, hit.top);

    let claimed = if let Some(arbitrator) = hit.node.as_arbitrator() {
        arbitrator.claims_motion(&local)
    } else {
        match direction.axis() {
            Axis::Horizontal => hit
                .node
                .can_scroll_horizontally(if motion.dx > 0.0 { -1 } else { 1 }),
            Axis::Vertical => hit
                .node
                .can_scroll_vertically(if motion.dy > 0.0 { -1 } else { 1 }),
        }
    };

    if claimed {
        tracing::debug!(direction = %direction, "descendant claims motion");
        return true;
    }
    can_child_scroll(hit.node.as_ref(), direction, &local)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Minimal view node: children with bounds plus fixed scroll capabilities
    #[derive(Default)]
    pub(crate) struct FakeView {
        pub children: Vec<((f32, f32, f32, f32), Rc<dyn ScrollProbe>)>,
        pub scroll_start_h: bool,
        pub scroll_end_h: bool,
        pub scroll_start_v: bool,
        pub scroll_end_v: bool,
    }

    impl ScrollProbe for FakeView {
        fn child_under(&self, x: f32, y: f32) -> Option<ChildHit> {
            self.children
                .iter()
                .rev()
                .find(|((l, t, r, b), _)| x >= *l && x < *r && y >= *t && y < *b)
                .map(|((l, t, _, _), node)| ChildHit {
                    node: node.clone(),
                    left: *l,
                    top: *t,
                })
        }

        fn can_scroll_horizontally(&self, direction: i32) -> bool {
            if direction < 0 {
                self.scroll_start_h
            } else {
                self.scroll_end_h
            }
        }

        fn can_scroll_vertically(&self, direction: i32) -> bool {
            if direction < 0 {
                self.scroll_start_v
            } else {
                self.scroll_end_v
            }
        }
    }

    struct ClaimingNode {
        claims: bool,
    }

    impl ScrollProbe for ClaimingNode {
        fn as_arbitrator(&self) -> Option<&dyn NestedArbitrator> {
            Some(self)
        }
    }

    impl NestedArbitrator for ClaimingNode {
        fn claims_motion(&self, _motion: &Motion) -> bool {
            self.claims
        }
    }

    fn gate(enabled: Directions) -> SwipeGate<'static> {
        SwipeGate {
            enabled,
            locked: Directions::empty(),
            nested_scroll: Directions::ALL,
            nested_fling: Directions::ALL,
            edge_size: 0.0,
            width: 400.0,
            height: 800.0,
            committed: None,
            has_distance: false,
            content: None,
        }
    }

    fn touch(down_x: f32, down_y: f32, dx: f32, dy: f32) -> Motion {
        Motion::new(PointerId::Touch(0), down_x, down_y, dx, dy)
    }

    #[test]
    fn test_edge_touch_down_commits_without_motion() {
        let mut g = gate(Directions::LEFT);
        g.edge_size = 20.0;
        assert_eq!(g.calc_direction(&touch(10.0, 300.0, 0.0, 0.0)), Some(Direction::Left));
        assert_eq!(g.calc_direction(&touch(30.0, 300.0, 0.0, 0.0)), None);
    }

    #[test]
    fn test_edge_order_left_first() {
        let mut g = gate(Directions::ALL);
        g.edge_size = 20.0;
        // top-left corner is in both the left and top bands
        assert_eq!(g.calc_direction(&touch(5.0, 5.0, 0.0, 0.0)), Some(Direction::Left));
        assert_eq!(g.calc_direction(&touch(395.0, 5.0, 0.0, 0.0)), Some(Direction::Right));
        assert_eq!(g.calc_direction(&touch(200.0, 795.0, 0.0, 0.0)), Some(Direction::Bottom));
    }

    #[test]
    fn test_no_edge_and_no_motion_is_none() {
        let g = gate(Directions::ALL);
        assert_eq!(g.calc_direction(&touch(5.0, 5.0, 0.0, 0.0)), None);
    }

    #[test]
    fn test_dominant_axis() {
        let g = gate(Directions::ALL);
        assert_eq!(g.calc_direction(&touch(100.0, 100.0, 20.0, 5.0)), Some(Direction::Left));
        assert_eq!(g.calc_direction(&touch(100.0, 100.0, -20.0, 5.0)), Some(Direction::Right));
        assert_eq!(g.calc_direction(&touch(100.0, 100.0, 3.0, 20.0)), Some(Direction::Top));
        assert_eq!(g.calc_direction(&touch(100.0, 100.0, 3.0, -20.0)), Some(Direction::Bottom));
        // equal magnitudes fall to the vertical axis
        assert_eq!(g.calc_direction(&touch(100.0, 100.0, 10.0, 10.0)), Some(Direction::Top));
    }

    #[test]
    fn test_disabled_direction_is_not_swapped_for_another() {
        let g = gate(Directions::RIGHT | Directions::TOP);
        assert_eq!(g.calc_direction(&touch(100.0, 100.0, 20.0, 5.0)), None);
    }

    #[test]
    fn test_edge_revalidates_motion() {
        let mut g = gate(Directions::LEFT);
        g.edge_size = 20.0;
        assert_eq!(g.calc_direction(&touch(100.0, 100.0, 30.0, 0.0)), None);
        assert_eq!(g.calc_direction(&touch(15.0, 100.0, 30.0, 0.0)), Some(Direction::Left));
    }

    #[test]
    fn test_locked_direction() {
        let mut g = gate(Directions::ALL);
        g.locked = Directions::LEFT;
        assert_eq!(g.calc_direction(&touch(100.0, 100.0, 20.0, 0.0)), None);
        assert_eq!(g.calc_direction(&touch(100.0, 100.0, -20.0, 0.0)), Some(Direction::Right));
    }

    #[test]
    fn test_nested_masks() {
        let mut g = gate(Directions::ALL);
        g.nested_scroll = Directions::empty();
        let scroll = Motion::new(PointerId::NestedScroll, 0.0, 0.0, 0.0, 10.0);
        assert_eq!(g.calc_direction(&scroll), None);

        g.nested_scroll = Directions::TOP;
        assert_eq!(g.calc_direction(&scroll), Some(Direction::Top));
        let up = Motion::new(PointerId::NestedScroll, 0.0, 0.0, 0.0, -10.0);
        assert_eq!(g.calc_direction(&up), None);

        // fling enabled overrides a lock
        g.locked = Directions::TOP;
        let fling = Motion::new(PointerId::NestedFling, 0.0, 0.0, 0.0, 10.0);
        assert_eq!(g.calc_direction(&fling), Some(Direction::Top));
    }

    #[test]
    fn test_continuation_requires_same_axis() {
        let mut g = gate(Directions::ALL);
        g.committed = Some(Direction::Left);
        g.has_distance = true;
        assert_eq!(g.calc_direction(&touch(100.0, 100.0, 0.0, 0.0)), None);
        assert_eq!(g.calc_direction(&touch(100.0, 100.0, -30.0, 2.0)), Some(Direction::Left));
        assert_eq!(g.calc_direction(&touch(100.0, 100.0, 2.0, 30.0)), None);
        g.locked = Directions::LEFT;
        assert_eq!(g.calc_direction(&touch(100.0, 100.0, 30.0, 2.0)), None);
    }

    #[test]
    fn test_scrollable_child_blocks_swipe() {
        let list: Rc<dyn ScrollProbe> = Rc::new(FakeView {
            scroll_start_v: true,
            ..Default::default()
        });
        let root = FakeView {
            children: vec![((0.0, 100.0, 400.0, 800.0), list)],
            ..Default::default()
        };
        let mut g = gate(Directions::ALL);
        g.content = Some(&root);

        // dragging down over a list that can still scroll up
        assert_eq!(g.calc_direction(&touch(50.0, 300.0, 0.0, 40.0)), None);
        // same drag outside the list
        assert_eq!(g.calc_direction(&touch(50.0, 50.0, 0.0, 40.0)), Some(Direction::Top));
        // dragging up: the list cannot scroll further down
        assert_eq!(g.calc_direction(&touch(50.0, 300.0, 0.0, -40.0)), Some(Direction::Bottom));
    }

    #[test]
    fn test_recurses_with_translated_coordinates() {
        let pager: Rc<dyn ScrollProbe> = Rc::new(FakeView {
            scroll_end_h: true,
            ..Default::default()
        });
        let card: Rc<dyn ScrollProbe> = Rc::new(FakeView {
            children: vec![((0.0, 0.0, 100.0, 100.0), pager)],
            ..Default::default()
        });
        let root = FakeView {
            children: vec![((200.0, 200.0, 400.0, 400.0), card)],
            ..Default::default()
        };
        let mut g = gate(Directions::ALL);
        g.content = Some(&root);

        // (250, 250) is (50, 50) inside the card, where the pager sits
        assert_eq!(g.calc_direction(&touch(250.0, 250.0, -30.0, 0.0)), None);
        // (350, 350) is (150, 150) inside the card, outside the pager
        assert_eq!(g.calc_direction(&touch(350.0, 350.0, -30.0, 0.0)), Some(Direction::Right));
    }

    #[test]
    fn test_nested_arbitrator_claims() {
        let inner: Rc<dyn ScrollProbe> = Rc::new(ClaimingNode { claims: true });
        let root = FakeView {
            children: vec![((0.0, 0.0, 400.0, 800.0), inner)],
            ..Default::default()
        };
        let mut g = gate(Directions::ALL);
        g.content = Some(&root);
        assert_eq!(g.calc_direction(&touch(10.0, 10.0, 30.0, 0.0)), None);

        let passive: Rc<dyn ScrollProbe> = Rc::new(ClaimingNode { claims: false });
        let root = FakeView {
            children: vec![((0.0, 0.0, 400.0, 800.0), passive)],
            ..Default::default()
        };
        g.content = Some(&root);
        assert_eq!(g.calc_direction(&touch(10.0, 10.0, 30.0, 0.0)), Some(Direction::Left));
    }
}
