//! Layer data model.
//!
//! A [`Layer`] is a tagged union: a [`Geometry`] payload (rect or line
//! endpoints) plus a kind-specific [`Params`] record. The kind is the
//! params discriminant. [`LayerStack`] keeps layers in z-order, first is
//! bottom, and holds at most one crop layer.

use serde::{Deserialize, Serialize};

use crate::geometry::{clamp_translate, Bounds, Point, Rect};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LayerId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayerKind {
    Crop,
    Blur,
    Highlight,
    Line,
    Text,
}

impl LayerKind {
    pub fn name(self) -> &'static str {
        match self {
            LayerKind::Crop => "crop",
            LayerKind::Blur => "blur",
            LayerKind::Highlight => "highlight",
            LayerKind::Line => "line",
            LayerKind::Text => "text",
        }
    }
}

/// Line endpoints. The stroke color travels with the points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Points {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
    pub color: String,
}

impl Points {
    pub fn new(start: Point, end: Point, color: impl Into<String>) -> Self {
        Self {
            x1: start.x,
            y1: start.y,
            x2: end.x,
            y2: end.y,
            color: color.into(),
        }
    }

    pub fn start(&self) -> Point {
        Point::new(self.x1, self.y1)
    }

    pub fn end(&self) -> Point {
        Point::new(self.x2, self.y2)
    }

    pub fn bounding_rect(&self) -> Rect {
        Rect::spanning(self.start(), self.end())
    }

    pub fn translated(&self, dx: f64, dy: f64) -> Points {
        Points {
            x1: self.x1 + dx,
            y1: self.y1 + dy,
            x2: self.x2 + dx,
            y2: self.y2 + dy,
            color: self.color.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "lowercase")]
pub enum Geometry {
    Rect(Rect),
    Points(Points),
}

impl Geometry {
    pub fn bounding_rect(&self) -> Rect {
        match self {
            Geometry::Rect(rect) => *rect,
            Geometry::Points(points) => points.bounding_rect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Params {
    Crop,
    Blur { radius: f64 },
    Highlight { color: String },
    Line,
    Text {
        text: String,
        color: String,
        font_size: f64,
    },
}

/// Which layer wins when several contain the hit point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HitOrder {
    /// First match in insertion order: bottom layers shadow later ones.
    #[default]
    Insertion,
    /// Last match in insertion order: the visually topmost layer wins.
    Topmost,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layer {
    pub(crate) id: LayerId,
    pub(crate) geometry: Geometry,
    pub(crate) params: Params,
}

impl Layer {
    pub fn crop(id: LayerId, rect: Rect) -> Self {
        Self {
            id,
            geometry: Geometry::Rect(rect),
            params: Params::Crop,
        }
    }

    pub fn blur(id: LayerId, rect: Rect, radius: f64) -> Self {
        Self {
            id,
            geometry: Geometry::Rect(rect),
            params: Params::Blur { radius },
        }
    }

    pub fn highlight(id: LayerId, rect: Rect, color: impl Into<String>) -> Self {
        Self {
            id,
            geometry: Geometry::Rect(rect),
            params: Params::Highlight {
                color: color.into(),
            },
        }
    }

    pub fn line(id: LayerId, points: Points) -> Self {
        Self {
            id,
            geometry: Geometry::Points(points),
            params: Params::Line,
        }
    }

    pub fn text(
        id: LayerId,
        rect: Rect,
        text: impl Into<String>,
        color: impl Into<String>,
        font_size: f64,
    ) -> Self {
        Self {
            id,
            geometry: Geometry::Rect(rect),
            params: Params::Text {
                text: text.into(),
                color: color.into(),
                font_size,
            },
        }
    }

    pub fn id(&self) -> LayerId {
        self.id
    }

    pub fn kind(&self) -> LayerKind {
        match self.params {
            Params::Crop => LayerKind::Crop,
            Params::Blur { .. } => LayerKind::Blur,
            Params::Highlight { .. } => LayerKind::Highlight,
            Params::Line => LayerKind::Line,
            Params::Text { .. } => LayerKind::Text,
        }
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn rect(&self) -> Option<Rect> {
        match &self.geometry {
            Geometry::Rect(rect) => Some(*rect),
            Geometry::Points(_) => None,
        }
    }

    pub(crate) fn rect_mut(&mut self) -> Option<&mut Rect> {
        match &mut self.geometry {
            Geometry::Rect(rect) => Some(rect),
            Geometry::Points(_) => None,
        }
    }

    pub fn points(&self) -> Option<&Points> {
        match &self.geometry {
            Geometry::Points(points) => Some(points),
            Geometry::Rect(_) => None,
        }
    }

    pub(crate) fn points_mut(&mut self) -> Option<&mut Points> {
        match &mut self.geometry {
            Geometry::Points(points) => Some(points),
            Geometry::Rect(_) => None,
        }
    }

    /// Rect layers hit anywhere inside their border (inclusive); line
    /// layers only hit within `endpoint_radius` of either endpoint.
    pub fn hit_test_body(&self, point: Point, endpoint_radius: f64) -> bool {
        match &self.geometry {
            Geometry::Rect(rect) => rect.contains(point),
            Geometry::Points(points) => {
                point.distance_to(points.start()) < endpoint_radius
                    || point.distance_to(points.end()) < endpoint_radius
            }
        }
    }

    /// Move the layer to `original` shifted by `(dx, dy)`, clamped so the
    /// rect (or both endpoints) stays on the canvas.
    pub(crate) fn translate_from(&mut self, original: &Geometry, dx: f64, dy: f64, bounds: Bounds) {
        match (&mut self.geometry, original) {
            (Geometry::Rect(rect), Geometry::Rect(orig)) => {
                let origin = clamp_translate(orig, dx, dy, bounds);
                rect.x = origin.x;
                rect.y = origin.y;
            }
            (Geometry::Points(points), Geometry::Points(orig)) => {
                let bbox = orig.bounding_rect();
                let origin = clamp_translate(&bbox, dx, dy, bounds);
                let moved = orig.translated(origin.x - bbox.x, origin.y - bbox.y);
                points.x1 = moved.x1;
                points.y1 = moved.y1;
                points.x2 = moved.x2;
                points.y2 = moved.y2;
            }
            _ => {}
        }
    }

    /// Short human-readable description for the layers panel.
    pub fn label(&self) -> String {
        match &self.params {
            Params::Crop => "Crop".to_string(),
            Params::Blur { radius } => format!("Blur ({radius}px)"),
            Params::Highlight { color } => format!("Highlight ({color})"),
            Params::Line => {
                let color = self.points().map(|p| p.color.as_str()).unwrap_or_default();
                format!("Line ({color})")
            }
            Params::Text { text, .. } => {
                let head: String = text.chars().take(10).collect();
                if head.is_empty() {
                    "Text: \"Empty\"".to_string()
                } else {
                    format!("Text: \"{head}...\"")
                }
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LayerStack {
    layers: Vec<Layer>,
}

impl LayerStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push on top. A crop layer first evicts any existing crop.
    pub fn append(&mut self, layer: Layer) {
        if layer.kind() == LayerKind::Crop {
            self.layers.retain(|l| l.kind() != LayerKind::Crop);
        }
        self.layers.push(layer);
    }

    pub fn remove(&mut self, id: LayerId) -> Option<Layer> {
        let index = self.index_of(id)?;
        Some(self.layers.remove(index))
    }

    pub fn find_crop(&self) -> Option<&Layer> {
        self.layers.iter().find(|l| l.kind() == LayerKind::Crop)
    }

    pub fn deep_copy(&self) -> LayerStack {
        self.clone()
    }

    pub fn hit_test(&self, point: Point, endpoint_radius: f64, order: HitOrder) -> Option<LayerId> {
        let hit = |l: &&Layer| l.hit_test_body(point, endpoint_radius);
        let found = match order {
            HitOrder::Insertion => self.layers.iter().find(hit),
            HitOrder::Topmost => self.layers.iter().rev().find(hit),
        };
        found.map(Layer::id)
    }

    /// Move the layer at `from` so it ends up at index `to`.
    pub fn reorder(&mut self, from: usize, to: usize) -> bool {
        if from >= self.layers.len() || to >= self.layers.len() || from == to {
            return false;
        }
        let layer = self.layers.remove(from);
        self.layers.insert(to, layer);
        true
    }

    pub fn get(&self, id: LayerId) -> Option<&Layer> {
        self.layers.iter().find(|l| l.id == id)
    }

    pub(crate) fn get_mut(&mut self, id: LayerId) -> Option<&mut Layer> {
        self.layers.iter_mut().find(|l| l.id == id)
    }

    pub fn index_of(&self, id: LayerId) -> Option<usize> {
        self.layers.iter().position(|l| l.id == id)
    }

    pub fn last(&self) -> Option<&Layer> {
        self.layers.last()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Layer> {
        self.layers.iter()
    }

    pub fn as_slice(&self) -> &[Layer] {
        &self.layers
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn max_id(&self) -> Option<LayerId> {
        self.layers.iter().map(Layer::id).max()
    }
}

impl<'a> IntoIterator for &'a LayerStack {
    type Item = &'a Layer;
    type IntoIter = std::slice::Iter<'a, Layer>;

    fn into_iter(self) -> Self::IntoIter {
        self.layers.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect(x: f64, y: f64, w: f64, h: f64) -> Rect {
        Rect::new(x, y, w, h)
    }

    #[test]
    fn second_crop_replaces_first() {
        let mut stack = LayerStack::new();
        stack.append(Layer::highlight(LayerId(1), rect(0.0, 0.0, 10.0, 10.0), "#ff0000"));
        stack.append(Layer::crop(LayerId(2), rect(5.0, 5.0, 40.0, 40.0)));
        stack.append(Layer::crop(LayerId(3), rect(1.0, 1.0, 20.0, 20.0)));
        stack.append(Layer::crop(LayerId(4), rect(2.0, 2.0, 30.0, 30.0)));

        let crops: Vec<_> = stack.iter().filter(|l| l.kind() == LayerKind::Crop).collect();
        assert_eq!(crops.len(), 1);
        assert_eq!(stack.find_crop().map(Layer::id), Some(LayerId(4)));
        assert_eq!(stack.len(), 2);
    }

    #[test]
    fn insertion_order_hit_lets_bottom_layer_win() {
        let mut stack = LayerStack::new();
        stack.append(Layer::blur(LayerId(1), rect(0.0, 0.0, 50.0, 50.0), 4.0));
        stack.append(Layer::highlight(LayerId(2), rect(20.0, 20.0, 50.0, 50.0), "red"));

        let p = Point::new(30.0, 30.0);
        assert_eq!(stack.hit_test(p, 10.0, HitOrder::Insertion), Some(LayerId(1)));
        assert_eq!(stack.hit_test(p, 10.0, HitOrder::Topmost), Some(LayerId(2)));
        assert_eq!(stack.hit_test(Point::new(90.0, 90.0), 10.0, HitOrder::Topmost), None);
    }

    #[test]
    fn line_hits_only_near_endpoints() {
        let line = Layer::line(
            LayerId(1),
            Points::new(Point::new(0.0, 0.0), Point::new(100.0, 0.0), "#00f"),
        );
        assert!(line.hit_test_body(Point::new(5.0, 5.0), 10.0));
        assert!(line.hit_test_body(Point::new(95.0, 0.0), 10.0));
        assert!(!line.hit_test_body(Point::new(50.0, 0.0), 10.0));
        assert!(!line.hit_test_body(Point::new(10.0, 0.0), 10.0));
    }

    #[test]
    fn deep_copy_is_independent() {
        let mut stack = LayerStack::new();
        stack.append(Layer::highlight(LayerId(1), rect(0.0, 0.0, 10.0, 10.0), "red"));
        let copy = stack.deep_copy();
        if let Some(r) = stack.get_mut(LayerId(1)).and_then(Layer::rect_mut) {
            r.x = 99.0;
        }
        assert_eq!(copy.get(LayerId(1)).and_then(Layer::rect).map(|r| r.x), Some(0.0));
    }

    #[test]
    fn line_translate_keeps_shape_inside_bounds() {
        let orig = Points::new(Point::new(10.0, 10.0), Point::new(40.0, 30.0), "red");
        let mut layer = Layer::line(LayerId(1), orig.clone());
        layer.translate_from(
            &Geometry::Points(orig),
            -50.0,
            100.0,
            Bounds::new(100.0, 100.0),
        );
        let p = layer.points().cloned().unwrap();
        assert_eq!((p.x1, p.y1, p.x2, p.y2), (0.0, 80.0, 30.0, 100.0));
    }

    #[test]
    fn reorder_moves_layer() {
        let mut stack = LayerStack::new();
        for i in 1..=3 {
            stack.append(Layer::blur(LayerId(i), rect(0.0, 0.0, 1.0, 1.0), 1.0));
        }
        assert!(stack.reorder(0, 2));
        let ids: Vec<u64> = stack.iter().map(|l| l.id().0).collect();
        assert_eq!(ids, vec![2, 3, 1]);
        assert!(!stack.reorder(0, 5));
        assert!(!stack.reorder(1, 1));
    }

    #[test]
    fn labels_describe_params() {
        let text = Layer::text(LayerId(1), rect(0.0, 0.0, 1.0, 1.0), "Hello wonderful world", "#000", 12.0);
        assert_eq!(text.label(), "Text: \"Hello wond...\"");
        assert_eq!(Layer::blur(LayerId(2), rect(0.0, 0.0, 1.0, 1.0), 5.0).label(), "Blur (5px)");
        let line = Layer::line(LayerId(3), Points::new(Point::default(), Point::default(), "#ff0000"));
        assert_eq!(line.label(), "Line (#ff0000)");
    }

    #[test]
    fn serializes_with_kind_tags() {
        let layer = Layer::highlight(LayerId(7), rect(1.0, 2.0, 3.0, 4.0), "#ff0000");
        let value = serde_json::to_value(&layer).unwrap();
        assert_eq!(value["id"], 7);
        assert_eq!(value["params"]["type"], "highlight");
        assert_eq!(value["geometry"]["shape"], "rect");
        assert_eq!(value["geometry"]["width"], 3.0);
    }
}
