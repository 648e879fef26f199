//! Pointer-driven state machine.
//!
//! Sessions are `Idle`, `Creating` or `Dragging`. A pointer-down that
//! mutates anything snapshots the pre-gesture state exactly once, so a
//! single undo reverts a whole create, move or resize gesture.

use std::mem;

use serde::Serialize;
use tracing::{debug, trace};

use crate::editor::{Editor, TextPrompt};
use crate::geometry::{create_rect, floor_rect, hit_test_handles, resize_rect, Handle, Point, Rect};
use crate::layers::{Geometry, Layer, LayerId, LayerKind, Params, Points};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragMode {
    Create,
    Move,
    Resize(Handle),
}

/// State captured at pointer-down. Every move is computed against
/// `start` and `original`, never against the previous frame.
#[derive(Debug, Clone, PartialEq)]
pub struct DragSession {
    pub start: Point,
    pub layer: LayerId,
    pub mode: DragMode,
    pub original: Geometry,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum Interaction {
    #[default]
    Idle,
    Creating(DragSession),
    Dragging(DragSession),
}

impl Interaction {
    pub fn session(&self) -> Option<&DragSession> {
        match self {
            Interaction::Idle => None,
            Interaction::Creating(session) | Interaction::Dragging(session) => Some(session),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Interaction::Idle => "idle",
            Interaction::Creating(_) => "creating",
            Interaction::Dragging(DragSession {
                mode: DragMode::Resize(_),
                ..
            }) => "resizing",
            Interaction::Dragging(_) => "moving",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerDown {
    pub point: Point,
    /// Click count reported by the host; 2 is a double-click.
    pub clicks: u32,
}

impl PointerDown {
    pub fn single(x: f64, y: f64) -> Self {
        Self {
            point: Point::new(x, y),
            clicks: 1,
        }
    }

    pub fn double(x: f64, y: f64) -> Self {
        Self {
            point: Point::new(x, y),
            clicks: 2,
        }
    }
}

/// Hover affordance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Cursor {
    #[default]
    Default,
    Crosshair,
    Move,
    Resize(Handle),
}

/// What a pointer-down resolved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DownOutcome {
    Resize(Handle),
    Move(LayerId),
    TextEdited(LayerId),
    TextEditCancelled(LayerId),
    /// A crop is present and the armed tool is not crop.
    Suppressed,
    Created(LayerKind),
    Ignored,
}

impl Editor {
    pub fn pointer_down(&mut self, down: PointerDown, prompt: &mut dyn TextPrompt) -> DownOutcome {
        if !matches!(self.interaction, Interaction::Idle) {
            self.pointer_up();
        }
        let point = down.point;
        let hit = self
            .layers
            .hit_test(point, self.config.endpoint_radius, self.config.hit_order);

        if down.clicks >= 2 {
            if let Some(id) = hit.filter(|id| self.is_text(*id)) {
                return self.edit_text(id, prompt);
            }
        }

        if let Some(outcome) = self.begin_resize(point) {
            return outcome;
        }

        if let Some(id) = hit {
            let Some(original) = self.layers.get(id).map(|l| l.geometry().clone()) else {
                return DownOutcome::Ignored;
            };
            self.snapshot();
            self.active = Some(id);
            self.interaction = Interaction::Dragging(DragSession {
                start: point,
                layer: id,
                mode: DragMode::Move,
                original,
            });
            debug!(layer = id.0, x = point.x, y = point.y, "move started");
            self.render();
            return DownOutcome::Move(id);
        }

        let Some(tool) = self.tool else {
            return DownOutcome::Ignored;
        };
        if tool != LayerKind::Crop && self.layers.find_crop().is_some() {
            trace!(tool = tool.name(), "pointer-down suppressed by crop");
            return DownOutcome::Suppressed;
        }

        self.snapshot();
        let layer = self.new_layer(tool, point);
        let id = layer.id();
        let original = layer.geometry().clone();
        self.layers.append(layer);
        self.active = Some(id);
        self.interaction = Interaction::Creating(DragSession {
            start: point,
            layer: id,
            mode: DragMode::Create,
            original,
        });
        debug!(tool = tool.name(), layer = id.0, x = point.x, y = point.y, "layer created");
        self.render();
        DownOutcome::Created(tool)
    }

    pub fn pointer_move(&mut self, point: Point) {
        let Some(session) = self.interaction.session().cloned() else {
            self.cursor = self.hover_cursor(point);
            return;
        };
        let bounds = self.bounds();
        let min_size = self.config.min_size;
        let dx = point.x - session.start.x;
        let dy = point.y - session.start.y;
        let Some(layer) = self.layers.get_mut(session.layer) else {
            self.interaction = Interaction::Idle;
            return;
        };

        match session.mode {
            DragMode::Create => match &mut layer.geometry {
                Geometry::Rect(rect) => *rect = create_rect(session.start, point, bounds, min_size),
                Geometry::Points(points) => {
                    points.x2 = point.x;
                    points.y2 = point.y;
                }
            },
            DragMode::Move => layer.translate_from(&session.original, dx, dy, bounds),
            DragMode::Resize(handle) => {
                if let (Some(rect), Geometry::Rect(orig)) = (layer.rect_mut(), &session.original) {
                    *rect = resize_rect(orig, handle, dx, dy, bounds, min_size);
                }
            }
        }
        trace!(x = point.x, y = point.y, state = self.interaction.name(), "pointer-move");
        self.render();
    }

    /// End the current session. Returns `false` when there was none.
    pub fn pointer_up(&mut self) -> bool {
        let session = match mem::take(&mut self.interaction) {
            Interaction::Idle => return false,
            Interaction::Creating(session) => {
                let bounds = self.bounds();
                let min_size = self.config.min_size;
                if let Some(rect) = self.layers.get_mut(session.layer).and_then(Layer::rect_mut) {
                    *rect = floor_rect(rect, bounds, min_size);
                }
                session
            }
            Interaction::Dragging(session) => session,
        };
        debug!(layer = session.layer.0, mode = ?session.mode, "session ended");
        self.render();
        true
    }

    fn begin_resize(&mut self, point: Point) -> Option<DownOutcome> {
        let id = self.active?;
        let rect = self.layers.get(id).and_then(Layer::rect)?;
        let handle = hit_test_handles(&rect, point, self.config.handle_size)?;
        self.snapshot();
        self.interaction = Interaction::Dragging(DragSession {
            start: point,
            layer: id,
            mode: DragMode::Resize(handle),
            original: Geometry::Rect(rect),
        });
        debug!(layer = id.0, handle = handle.name(), "resize started");
        Some(DownOutcome::Resize(handle))
    }

    fn is_text(&self, id: LayerId) -> bool {
        self.layers
            .get(id)
            .is_some_and(|l| l.kind() == LayerKind::Text)
    }

    fn edit_text(&mut self, id: LayerId, prompt: &mut dyn TextPrompt) -> DownOutcome {
        let current = match self.layers.get(id).map(Layer::params) {
            Some(Params::Text { text, .. }) => text.clone(),
            _ => return DownOutcome::Ignored,
        };
        let Some(replacement) = prompt.prompt(&current) else {
            debug!(layer = id.0, "text edit cancelled");
            return DownOutcome::TextEditCancelled(id);
        };
        self.snapshot();
        self.set_text(id, replacement);
        self.active = Some(id);
        self.render();
        DownOutcome::TextEdited(id)
    }

    fn new_layer(&mut self, kind: LayerKind, at: Point) -> Layer {
        let id = self.allocate_id();
        let empty = Rect::new(at.x, at.y, 0.0, 0.0);
        match kind {
            LayerKind::Crop => Layer::crop(id, empty),
            LayerKind::Blur => Layer::blur(id, empty, self.tools.blur_radius),
            LayerKind::Highlight => Layer::highlight(id, empty, self.tools.highlight_color.clone()),
            LayerKind::Line => Layer::line(id, Points::new(at, at, self.tools.highlight_color.clone())),
            LayerKind::Text => Layer::text(
                id,
                Rect::new(at.x, at.y, self.config.text_box_width, self.config.text_box_height),
                self.config.default_text.clone(),
                self.tools.text_color.clone(),
                self.tools.font_size,
            ),
        }
    }

    fn hover_cursor(&self, point: Point) -> Cursor {
        if let Some(rect) = self.active_layer().and_then(Layer::rect) {
            if let Some(handle) = hit_test_handles(&rect, point, self.config.handle_size) {
                return Cursor::Resize(handle);
            }
        }
        if self
            .layers
            .hit_test(point, self.config.endpoint_radius, self.config.hit_order)
            .is_some()
        {
            return Cursor::Move;
        }
        if self.tool.is_some() {
            Cursor::Crosshair
        } else {
            Cursor::Default
        }
    }
}
