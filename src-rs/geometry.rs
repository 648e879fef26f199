//! Canvas-space geometry: rects, compass handles, handle hit-testing and
//! the constrained move/resize math used by drag sessions.
//!
//! Every value here is in canvas logical pixels. Nothing in this module
//! knows about layers.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_to(self, other: Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn is_degenerate(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    /// Inclusive of all four borders.
    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.x && p.x <= self.right() && p.y >= self.y && p.y <= self.bottom()
    }

    pub fn translated(&self, dx: f64, dy: f64) -> Rect {
        Rect::new(self.x + dx, self.y + dy, self.width, self.height)
    }

    /// Smallest rect covering both points.
    pub fn spanning(a: Point, b: Point) -> Rect {
        let x = a.x.min(b.x);
        let y = a.y.min(b.y);
        Rect::new(x, y, (a.x - b.x).abs(), (a.y - b.y).abs())
    }

    /// Edge-inclusive overlap test; a rect touching the other's border
    /// still counts as overlapping.
    pub fn touches(&self, other: &Rect) -> bool {
        !(self.right() < other.x
            || self.bottom() < other.y
            || self.x > other.right()
            || self.y > other.bottom())
    }

    /// Intersection, or `None` when the rects share no area.
    pub fn intersection(&self, other: &Rect) -> Option<Rect> {
        let x0 = self.x.max(other.x);
        let y0 = self.y.max(other.y);
        let x1 = self.right().min(other.right());
        let y1 = self.bottom().min(other.bottom());
        if x1 <= x0 || y1 <= y0 {
            return None;
        }
        Some(Rect::new(x0, y0, x1 - x0, y1 - y0))
    }

    pub fn handle_center(&self, handle: Handle) -> Point {
        let (dx, dy) = handle.offset();
        Point::new(
            self.x + self.width * f64::from(dx + 1) / 2.0,
            self.y + self.height * f64::from(dy + 1) / 2.0,
        )
    }
}

/// Canvas extent; the valid area is `[0, width] × [0, height]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub width: f64,
    pub height: f64,
}

impl Bounds {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn as_rect(&self) -> Rect {
        Rect::new(0.0, 0.0, self.width, self.height)
    }
}

/// One of the eight resize grab points on a rect's border.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Handle {
    Nw,
    N,
    Ne,
    E,
    Se,
    S,
    Sw,
    W,
}

impl Handle {
    /// Hit-test iteration order. Overlapping hit boxes resolve to the
    /// earliest entry.
    pub const ALL: [Handle; 8] = [
        Handle::Nw,
        Handle::N,
        Handle::Ne,
        Handle::E,
        Handle::Se,
        Handle::S,
        Handle::Sw,
        Handle::W,
    ];

    pub fn offset(self) -> (i8, i8) {
        match self {
            Handle::Nw => (-1, -1),
            Handle::N => (0, -1),
            Handle::Ne => (1, -1),
            Handle::E => (1, 0),
            Handle::Se => (1, 1),
            Handle::S => (0, 1),
            Handle::Sw => (-1, 1),
            Handle::W => (-1, 0),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Handle::Nw => "nw",
            Handle::N => "n",
            Handle::Ne => "ne",
            Handle::E => "e",
            Handle::Se => "se",
            Handle::S => "s",
            Handle::Sw => "sw",
            Handle::W => "w",
        }
    }

    fn moves_left(self) -> bool {
        self.offset().0 < 0
    }

    fn moves_right(self) -> bool {
        self.offset().0 > 0
    }

    fn moves_top(self) -> bool {
        self.offset().1 < 0
    }

    fn moves_bottom(self) -> bool {
        self.offset().1 > 0
    }
}

pub fn hit_test_handles(rect: &Rect, point: Point, handle_size: f64) -> Option<Handle> {
    let half = handle_size / 2.0;
    Handle::ALL.into_iter().find(|handle| {
        let c = rect.handle_center(*handle);
        point.x >= c.x - half
            && point.x <= c.x + half
            && point.y >= c.y - half
            && point.y <= c.y + half
    })
}

/// Resize `original` by dragging `handle` by `(dx, dy)`.
///
/// Left/top drags keep the opposite edge fixed exactly; right/bottom drags
/// keep the origin fixed. Sizes are floored at `min_size` and the moving
/// edge is kept inside `bounds`.
pub fn resize_rect(
    original: &Rect,
    handle: Handle,
    dx: f64,
    dy: f64,
    bounds: Bounds,
    min_size: f64,
) -> Rect {
    let mut out = *original;

    if handle.moves_left() {
        let right = original.right();
        let x = (original.x + dx).min(right - min_size).max(0.0);
        out.x = x;
        out.width = right - x;
    } else if handle.moves_right() {
        out.width = (original.width + dx)
            .min(bounds.width - original.x)
            .max(min_size);
    }

    if handle.moves_top() {
        let bottom = original.bottom();
        let y = (original.y + dy).min(bottom - min_size).max(0.0);
        out.y = y;
        out.height = bottom - y;
    } else if handle.moves_bottom() {
        out.height = (original.height + dy)
            .min(bounds.height - original.y)
            .max(min_size);
    }

    out
}

/// New origin for `original` translated by `(dx, dy)` with the whole rect
/// kept inside `bounds`.
pub fn clamp_translate(original: &Rect, dx: f64, dy: f64, bounds: Bounds) -> Point {
    Point::new(
        (original.x + dx).min(bounds.width - original.width).max(0.0),
        (original.y + dy).min(bounds.height - original.height).max(0.0),
    )
}

/// Rect for an in-progress create drag from `start` to `current`.
pub fn create_rect(start: Point, current: Point, bounds: Bounds, min_size: f64) -> Rect {
    let span = Rect::spanning(start, current);
    let x = span.x.max(0.0);
    let y = span.y.max(0.0);
    Rect::new(
        x,
        y,
        span.width.min(bounds.width - x).max(min_size),
        span.height.min(bounds.height - y).max(min_size),
    )
}

/// Apply the minimum-size floor to a finished rect, shifting the origin back
/// inside `bounds` if the floor pushed the far edge out.
pub fn floor_rect(rect: &Rect, bounds: Bounds, min_size: f64) -> Rect {
    let width = rect.width.max(min_size);
    let height = rect.height.max(min_size);
    let x = rect.x.min(bounds.width - width).max(0.0);
    let y = rect.y.min(bounds.height - height).max(0.0);
    Rect::new(x, y, width, height)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOUNDS: Bounds = Bounds {
        width: 200.0,
        height: 100.0,
    };

    #[test]
    fn handle_centers_follow_compass_offsets() {
        let r = Rect::new(10.0, 20.0, 40.0, 60.0);
        assert_eq!(r.handle_center(Handle::Nw), Point::new(10.0, 20.0));
        assert_eq!(r.handle_center(Handle::N), Point::new(30.0, 20.0));
        assert_eq!(r.handle_center(Handle::E), Point::new(50.0, 50.0));
        assert_eq!(r.handle_center(Handle::Se), Point::new(50.0, 80.0));
        assert_eq!(r.handle_center(Handle::W), Point::new(10.0, 50.0));
    }

    #[test]
    fn handle_hit_uses_square_box() {
        let r = Rect::new(10.0, 10.0, 50.0, 50.0);
        assert_eq!(hit_test_handles(&r, Point::new(60.0, 60.0), 8.0), Some(Handle::Se));
        assert_eq!(hit_test_handles(&r, Point::new(64.0, 64.0), 8.0), Some(Handle::Se));
        assert_eq!(hit_test_handles(&r, Point::new(64.5, 60.0), 8.0), None);
        assert_eq!(hit_test_handles(&r, Point::new(35.0, 35.0), 8.0), None);
    }

    #[test]
    fn handle_ties_resolve_by_iteration_order() {
        // Zero-size rect: every handle sits on the same point.
        let r = Rect::new(20.0, 20.0, 0.0, 0.0);
        assert_eq!(hit_test_handles(&r, Point::new(20.0, 20.0), 8.0), Some(Handle::Nw));
        let thin = Rect::new(20.0, 20.0, 4.0, 0.0);
        assert_eq!(hit_test_handles(&thin, Point::new(24.0, 20.0), 8.0), Some(Handle::Nw));
    }

    #[test]
    fn east_resize_grows_width_only() {
        let r = Rect::new(10.0, 10.0, 50.0, 50.0);
        let out = resize_rect(&r, Handle::E, 20.0, 0.0, BOUNDS, 10.0);
        assert_eq!(out, Rect::new(10.0, 10.0, 70.0, 50.0));
    }

    #[test]
    fn west_resize_keeps_right_edge() {
        let r = Rect::new(10.0, 10.0, 50.0, 50.0);
        let out = resize_rect(&r, Handle::W, 20.0, 0.0, BOUNDS, 10.0);
        assert_eq!(out, Rect::new(30.0, 10.0, 30.0, 50.0));
        assert_eq!(out.right(), r.right());
    }

    #[test]
    fn zero_delta_resize_is_identity_for_every_handle() {
        let r = Rect::new(12.5, 7.25, 33.0, 41.0);
        for handle in Handle::ALL {
            assert_eq!(resize_rect(&r, handle, 0.0, 0.0, BOUNDS, 10.0), r, "{handle:?}");
        }
    }

    #[test]
    fn resize_floors_at_min_size() {
        let r = Rect::new(10.0, 10.0, 50.0, 50.0);
        let se = resize_rect(&r, Handle::Se, -100.0, -100.0, BOUNDS, 10.0);
        assert_eq!((se.width, se.height), (10.0, 10.0));

        let nw = resize_rect(&r, Handle::Nw, 100.0, 100.0, BOUNDS, 10.0);
        assert_eq!(nw, Rect::new(50.0, 50.0, 10.0, 10.0));
    }

    #[test]
    fn resize_stays_inside_bounds() {
        let r = Rect::new(150.0, 50.0, 40.0, 40.0);
        let e = resize_rect(&r, Handle::E, 500.0, 0.0, BOUNDS, 10.0);
        assert_eq!(e.right(), 200.0);

        let n = resize_rect(&r, Handle::N, 0.0, -500.0, BOUNDS, 10.0);
        assert_eq!(n.y, 0.0);
        assert_eq!(n.bottom(), r.bottom());
    }

    #[test]
    fn corner_resize_moves_both_axes() {
        let r = Rect::new(40.0, 40.0, 40.0, 40.0);
        let ne = resize_rect(&r, Handle::Ne, 10.0, -10.0, BOUNDS, 10.0);
        assert_eq!(ne, Rect::new(40.0, 30.0, 50.0, 50.0));
        let sw = resize_rect(&r, Handle::Sw, -10.0, 10.0, BOUNDS, 10.0);
        assert_eq!(sw, Rect::new(30.0, 40.0, 50.0, 50.0));
    }

    #[test]
    fn translate_clamps_whole_rect() {
        let r = Rect::new(10.0, 10.0, 50.0, 50.0);
        assert_eq!(clamp_translate(&r, -100.0, 5.0, BOUNDS), Point::new(0.0, 15.0));
        assert_eq!(clamp_translate(&r, 500.0, 500.0, BOUNDS), Point::new(150.0, 50.0));
    }

    #[test]
    fn create_rect_handles_any_drag_direction() {
        let out = create_rect(Point::new(80.0, 60.0), Point::new(20.0, 10.0), BOUNDS, 10.0);
        assert_eq!(out, Rect::new(20.0, 10.0, 60.0, 50.0));
    }

    #[test]
    fn create_rect_floors_tiny_drags() {
        let out = create_rect(Point::new(30.0, 30.0), Point::new(33.0, 31.0), BOUNDS, 10.0);
        assert_eq!((out.width, out.height), (10.0, 10.0));
    }

    #[test]
    fn create_rect_clamps_origin_and_extent() {
        let out = create_rect(Point::new(-20.0, 50.0), Point::new(250.0, 90.0), BOUNDS, 10.0);
        assert_eq!(out, Rect::new(0.0, 50.0, 200.0, 40.0));
    }

    #[test]
    fn floor_rect_pulls_back_inside() {
        let out = floor_rect(&Rect::new(195.0, 98.0, 0.0, 0.0), BOUNDS, 10.0);
        assert_eq!(out, Rect::new(190.0, 90.0, 10.0, 10.0));
    }

    #[test]
    fn intersection_and_touch() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(10.0, 0.0, 10.0, 10.0);
        assert!(a.touches(&b));
        assert_eq!(a.intersection(&b), None);
        let c = Rect::new(5.0, 5.0, 10.0, 10.0);
        assert_eq!(a.intersection(&c), Some(Rect::new(5.0, 5.0, 5.0, 5.0)));
    }
}
