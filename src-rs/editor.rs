//! The editor context.
//!
//! [`Editor`] owns everything a session touches: the base image, the
//! composited canvas, the layer stack, the active layer, the armed tool and
//! its settings, the in-flight drag session and the undo history. Every
//! mutation re-renders the canvas before returning. Pointer handling lives
//! in [`crate::interaction`].

use image::imageops::{self, FilterType};
use image::RgbaImage;
use serde::Serialize;
use tracing::debug;

use crate::config::{EditorConfig, ToolSettings};
use crate::error::EditorError;
use crate::geometry::Bounds;
use crate::history::{History, Snapshot};
use crate::interaction::{Cursor, Interaction};
use crate::layers::{Layer, LayerId, LayerKind, LayerStack, Params};
use crate::render::{self, ExportRegion, RenderStyle};

/// Synchronous modal text input. `None` means the user cancelled.
pub trait TextPrompt {
    fn prompt(&mut self, current: &str) -> Option<String>;
}

impl<F> TextPrompt for F
where
    F: FnMut(&str) -> Option<String>,
{
    fn prompt(&mut self, current: &str) -> Option<String> {
        self(current)
    }
}

/// One row of the layers panel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayerPanelEntry {
    pub index: usize,
    pub id: LayerId,
    pub kind: LayerKind,
    pub label: String,
    pub active: bool,
}

#[derive(Debug)]
pub struct Editor {
    pub(crate) config: EditorConfig,
    pub(crate) style: RenderStyle,
    pub(crate) tools: ToolSettings,
    pub(crate) source: RgbaImage,
    pub(crate) canvas: RgbaImage,
    pub(crate) layers: LayerStack,
    pub(crate) active: Option<LayerId>,
    pub(crate) tool: Option<LayerKind>,
    pub(crate) interaction: Interaction,
    pub(crate) cursor: Cursor,
    pub(crate) history: History,
    next_id: u64,
}

impl Editor {
    /// Open an editor on a decoded bitmap. `dpr` is the device-pixel-ratio
    /// of the bitmap; the canvas works in `natural / dpr` logical pixels.
    pub fn open(image: RgbaImage, dpr: f64, config: EditorConfig) -> Self {
        let source = to_logical(image, dpr);
        let mut editor = Self {
            style: RenderStyle::from_config(&config),
            tools: config.tools.clone(),
            history: History::new(config.history_depth),
            canvas: source.clone(),
            source,
            config,
            layers: LayerStack::new(),
            active: None,
            tool: None,
            interaction: Interaction::Idle,
            cursor: Cursor::Default,
            next_id: 1,
        };
        editor.render();
        editor
    }

    pub fn open_encoded(bytes: &[u8], dpr: f64, config: EditorConfig) -> Result<Self, EditorError> {
        let image = image::load_from_memory(bytes).map_err(EditorError::Decode)?;
        Ok(Self::open(image.to_rgba8(), dpr, config))
    }

    /// Replace the base image. Layers, selection, drag session and history
    /// all start over.
    pub fn load_image(&mut self, image: RgbaImage, dpr: f64) {
        self.source = to_logical(image, dpr);
        self.layers = LayerStack::new();
        self.active = None;
        self.interaction = Interaction::Idle;
        self.history.clear();
        debug!(
            width = self.source.width(),
            height = self.source.height(),
            "image loaded"
        );
        self.render();
    }

    pub fn bounds(&self) -> Bounds {
        Bounds::new(f64::from(self.source.width()), f64::from(self.source.height()))
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn source(&self) -> &RgbaImage {
        &self.source
    }

    /// The composited preview, including crop mask and handles.
    pub fn canvas(&self) -> &RgbaImage {
        &self.canvas
    }

    pub fn layers(&self) -> &LayerStack {
        &self.layers
    }

    pub fn active_id(&self) -> Option<LayerId> {
        self.active
    }

    pub fn active_layer(&self) -> Option<&Layer> {
        self.active.and_then(|id| self.layers.get(id))
    }

    pub fn tool(&self) -> Option<LayerKind> {
        self.tool
    }

    pub fn tool_settings(&self) -> &ToolSettings {
        &self.tools
    }

    pub fn interaction(&self) -> &Interaction {
        &self.interaction
    }

    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub(crate) fn allocate_id(&mut self) -> LayerId {
        let id = LayerId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Push the current pixels and a deep copy of the layers.
    pub fn snapshot(&mut self) {
        self.history.push(Snapshot {
            pixels: self.canvas.clone(),
            layers: self.layers.deep_copy(),
        });
    }

    /// Restore the most recent snapshot. The active layer becomes the top
    /// restored layer. Returns `false` on an empty history.
    pub fn undo(&mut self) -> bool {
        let Some(entry) = self.history.pop() else {
            return false;
        };
        self.canvas = entry.pixels;
        self.layers = entry.layers;
        self.active = self.layers.last().map(Layer::id);
        self.interaction = Interaction::Idle;
        if let Some(max) = self.layers.max_id() {
            self.next_id = self.next_id.max(max.0 + 1);
        }
        debug!(layers = self.layers.len(), remaining = self.history.len(), "undo");
        self.render();
        true
    }

    /// Arm a creation tool. Arming crop while a crop exists selects that
    /// crop for editing instead of clearing the selection.
    pub fn arm_tool(&mut self, kind: LayerKind) {
        self.tool = Some(kind);
        self.active = match kind {
            LayerKind::Crop => self.layers.find_crop().map(Layer::id),
            _ => None,
        };
        debug!(tool = kind.name(), "tool armed");
        self.render();
    }

    pub fn disarm_tool(&mut self) {
        self.tool = None;
    }

    /// Commit any in-flight gesture, then clear the selection.
    pub fn escape(&mut self) {
        self.pointer_up();
        self.active = None;
        self.render();
    }

    /// Remove the active layer, snapshotting first.
    pub fn delete_active(&mut self) -> bool {
        let Some(id) = self.active else {
            return false;
        };
        if self.layers.get(id).is_none() {
            self.active = None;
            return false;
        }
        self.snapshot();
        self.layers.remove(id);
        self.active = None;
        self.interaction = Interaction::Idle;
        debug!(layer = id.0, "layer deleted");
        self.render();
        true
    }

    pub fn select_layer(&mut self, index: usize) -> bool {
        let Some(id) = self.layers.iter().nth(index).map(Layer::id) else {
            return false;
        };
        self.active = Some(id);
        self.render();
        true
    }

    pub fn reorder_layer(&mut self, from: usize, to: usize) -> bool {
        let len = self.layers.len();
        if from >= len || to >= len || from == to {
            return false;
        }
        self.snapshot();
        self.layers.reorder(from, to);
        self.render();
        true
    }

    /// Top-first listing for the layers panel.
    pub fn layer_panel(&self) -> Vec<LayerPanelEntry> {
        self.layers
            .iter()
            .enumerate()
            .rev()
            .map(|(index, layer)| LayerPanelEntry {
                index,
                id: layer.id(),
                kind: layer.kind(),
                label: layer.label(),
                active: Some(layer.id()) == self.active,
            })
            .collect()
    }

    pub fn set_blur_radius(&mut self, radius: f64) -> bool {
        if radius.is_nan() || radius <= 0.0 {
            return false;
        }
        self.tools.blur_radius = radius;
        self.edit_active(&[LayerKind::Blur], |layer| {
            if let Params::Blur { radius: r } = &mut layer.params {
                *r = radius;
            }
        })
    }

    /// Stroke color for highlights and lines.
    pub fn set_stroke_color(&mut self, color: &str) -> bool {
        self.tools.highlight_color = color.to_string();
        self.edit_active(&[LayerKind::Highlight, LayerKind::Line], |layer| {
            if let Params::Highlight { color: c } = &mut layer.params {
                *c = color.to_string();
            } else if let Some(points) = layer.points_mut() {
                points.color = color.to_string();
            }
        })
    }

    pub fn set_text_color(&mut self, color: &str) -> bool {
        self.tools.text_color = color.to_string();
        self.edit_active(&[LayerKind::Text], |layer| {
            if let Params::Text { color: c, .. } = &mut layer.params {
                *c = color.to_string();
            }
        })
    }

    pub fn set_font_size(&mut self, size: f64) -> bool {
        if size.is_nan() || size <= 0.0 {
            return false;
        }
        self.tools.font_size = size;
        self.edit_active(&[LayerKind::Text], |layer| {
            if let Params::Text { font_size, .. } = &mut layer.params {
                *font_size = size;
            }
        })
    }

    /// Snapshot and apply `edit` to the active layer when its kind is one
    /// of `kinds`.
    fn edit_active(&mut self, kinds: &[LayerKind], edit: impl FnOnce(&mut Layer)) -> bool {
        let Some(id) = self.active else {
            return false;
        };
        if !self
            .layers
            .get(id)
            .is_some_and(|layer| kinds.contains(&layer.kind()))
        {
            return false;
        }
        self.snapshot();
        if let Some(layer) = self.layers.get_mut(id) {
            edit(layer);
        }
        self.render();
        true
    }

    pub(crate) fn set_text(&mut self, id: LayerId, text: String) {
        if let Some(Params::Text { text: t, .. }) = self.layers.get_mut(id).map(|l| &mut l.params) {
            *t = text;
        }
    }

    pub fn render(&mut self) {
        let active = self.active.and_then(|id| self.layers.get(id));
        self.canvas = render::render_preview(&self.source, &self.layers, active, &self.style);
    }

    pub fn export_region(&self) -> ExportRegion {
        render::export_region(&self.layers, self.source.width(), self.source.height())
    }

    pub fn export(&self) -> RgbaImage {
        render::render_export(&self.source, &self.layers)
    }
}

fn to_logical(image: RgbaImage, dpr: f64) -> RgbaImage {
    if !dpr.is_finite() || dpr <= 0.0 || (dpr - 1.0).abs() < f64::EPSILON {
        return image;
    }
    let width = (f64::from(image.width()) / dpr).round().max(1.0) as u32;
    let height = (f64::from(image.height()) / dpr).round().max(1.0) as u32;
    imageops::resize(&image, width, height, FilterType::Triangle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Rect;
    use image::Rgba;

    fn editor() -> Editor {
        Editor::open(
            RgbaImage::from_pixel(100, 80, Rgba([90, 90, 90, 255])),
            1.0,
            EditorConfig::default(),
        )
    }

    fn push_layer(editor: &mut Editor, make: impl FnOnce(LayerId) -> Layer) -> LayerId {
        let id = editor.allocate_id();
        editor.layers.append(make(id));
        id
    }

    #[test]
    fn dpr_scales_canvas_to_logical_pixels() {
        let ed = Editor::open(RgbaImage::new(200, 100), 2.0, EditorConfig::default());
        assert_eq!(ed.canvas().dimensions(), (100, 50));
        assert_eq!(ed.bounds(), Bounds::new(100.0, 50.0));
    }

    #[test]
    fn undo_on_empty_history_is_noop() {
        let mut ed = editor();
        assert!(!ed.undo());
        assert!(ed.layers().is_empty());
    }

    #[test]
    fn delete_snapshots_and_undo_restores() {
        let mut ed = editor();
        let id = push_layer(&mut ed, |id| Layer::highlight(id, Rect::new(1.0, 1.0, 20.0, 20.0), "red"));
        ed.active = Some(id);

        assert!(ed.delete_active());
        assert!(ed.layers().is_empty());
        assert_eq!(ed.active_id(), None);
        assert_eq!(ed.history_len(), 1);

        assert!(ed.undo());
        assert_eq!(ed.layers().len(), 1);
        assert_eq!(ed.active_id(), Some(id));
    }

    #[test]
    fn delete_without_active_is_noop() {
        let mut ed = editor();
        push_layer(&mut ed, |id| Layer::blur(id, Rect::new(1.0, 1.0, 20.0, 20.0), 2.0));
        assert!(!ed.delete_active());
        assert_eq!(ed.history_len(), 0);
        assert_eq!(ed.layers().len(), 1);
    }

    #[test]
    fn param_edit_only_touches_matching_active_layer() {
        let mut ed = editor();
        let blur = push_layer(&mut ed, |id| Layer::blur(id, Rect::new(1.0, 1.0, 20.0, 20.0), 2.0));
        ed.active = Some(blur);

        assert!(!ed.set_stroke_color("#00ff00"));
        assert_eq!(ed.history_len(), 0);
        assert_eq!(ed.tool_settings().highlight_color, "#00ff00");

        assert!(ed.set_blur_radius(9.0));
        assert_eq!(ed.history_len(), 1);
        assert_eq!(ed.active_layer().map(Layer::params), Some(&Params::Blur { radius: 9.0 }));

        assert!(!ed.set_blur_radius(0.0));
        assert!(ed.undo());
        assert_eq!(ed.active_layer().map(Layer::params), Some(&Params::Blur { radius: 2.0 }));
    }

    #[test]
    fn stroke_color_updates_line_points() {
        let mut ed = editor();
        let line = push_layer(&mut ed, |id| {
            Layer::line(
                id,
                crate::layers::Points::new(Default::default(), Default::default(), "#ff0000"),
            )
        });
        ed.active = Some(line);
        assert!(ed.set_stroke_color("#0000ff"));
        assert_eq!(ed.active_layer().and_then(Layer::points).map(|p| p.color.as_str()), Some("#0000ff"));
    }

    #[test]
    fn arming_crop_selects_existing_crop() {
        let mut ed = editor();
        let crop = push_layer(&mut ed, |id| Layer::crop(id, Rect::new(5.0, 5.0, 30.0, 30.0)));
        ed.arm_tool(LayerKind::Blur);
        assert_eq!(ed.active_id(), None);
        ed.arm_tool(LayerKind::Crop);
        assert_eq!(ed.active_id(), Some(crop));
        assert_eq!(ed.tool(), Some(LayerKind::Crop));
    }

    #[test]
    fn panel_lists_top_first_and_reorder_snapshots() {
        let mut ed = editor();
        let a = push_layer(&mut ed, |id| Layer::blur(id, Rect::new(0.0, 0.0, 5.0, 5.0), 3.0));
        let b = push_layer(&mut ed, |id| Layer::highlight(id, Rect::new(0.0, 0.0, 5.0, 5.0), "#ff0000"));
        assert!(ed.select_layer(0));

        let panel = ed.layer_panel();
        assert_eq!(panel[0].id, b);
        assert_eq!(panel[1].id, a);
        assert!(panel[1].active);
        assert_eq!(panel[0].label, "Highlight (#ff0000)");

        assert!(ed.reorder_layer(0, 1));
        assert_eq!(ed.layers().as_slice()[1].id(), a);
        assert_eq!(ed.history_len(), 1);
        assert!(!ed.reorder_layer(0, 9));
    }

    #[test]
    fn load_image_resets_state() {
        let mut ed = editor();
        let id = push_layer(&mut ed, |id| Layer::blur(id, Rect::new(0.0, 0.0, 5.0, 5.0), 3.0));
        ed.active = Some(id);
        ed.snapshot();
        ed.load_image(RgbaImage::new(10, 10), 1.0);
        assert!(ed.layers().is_empty());
        assert_eq!(ed.active_id(), None);
        assert_eq!(ed.history_len(), 0);
        assert_eq!(ed.canvas().dimensions(), (10, 10));
    }

    #[test]
    fn open_encoded_rejects_garbage() {
        let err = Editor::open_encoded(b"not an image", 1.0, EditorConfig::default()).unwrap_err();
        assert!(matches!(err, EditorError::Decode(_)));
    }
}
