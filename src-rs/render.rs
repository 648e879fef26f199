//! Compositing pipeline.
//!
//! Both the live preview and the export run the same per-layer draw pass
//! over the base image, bottom to top. The preview then adds the crop mask
//! and the active layer's handles; the export instead cuts the crop region
//! out and draws every layer in crop-relative space.

use image::imageops;
use image::{Rgba, RgbaImage};
use tracing::warn;

use crate::color::parse_color;
use crate::config::EditorConfig;
use crate::draw::{
    draw_arrow, draw_text_line, fill_rect, fill_square, stroke_rect, STROKE_WIDTH,
};
use crate::geometry::{Bounds, Handle, Point, Rect};
use crate::layers::{Geometry, Layer, LayerKind, LayerStack, Params};
use crate::text::{wrap_text, BitmapFont};

pub const CROP_LABEL_SIZE: f64 = 14.0;
const FALLBACK_STROKE: [u8; 4] = [255, 0, 0, 255];

#[derive(Debug, Clone, PartialEq)]
pub struct RenderStyle {
    pub handle_size: f64,
    pub handle_color: Rgba<u8>,
    pub crop_dim: Rgba<u8>,
    pub crop_border: Rgba<u8>,
}

impl RenderStyle {
    pub fn from_config(config: &EditorConfig) -> Self {
        Self {
            handle_size: config.handle_size,
            handle_color: parse_color(&config.handle_color, [0, 150, 255, 255]),
            crop_dim: parse_color(&config.crop_dim_color, [0, 0, 0, 128]),
            crop_border: parse_color(&config.crop_border_color, [255, 255, 255, 255]),
        }
    }
}

impl Default for RenderStyle {
    fn default() -> Self {
        Self::from_config(&EditorConfig::default())
    }
}

/// Integer pixel region of the canvas that an export covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct ExportRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl ExportRegion {
    pub fn as_rect(&self) -> Rect {
        Rect::new(
            f64::from(self.x),
            f64::from(self.y),
            f64::from(self.width),
            f64::from(self.height),
        )
    }
}

/// Crop rect rounded and clamped to the canvas; the full canvas when there
/// is no crop or the clamped crop has no area.
pub fn export_region(layers: &LayerStack, canvas_width: u32, canvas_height: u32) -> ExportRegion {
    let full = ExportRegion {
        x: 0,
        y: 0,
        width: canvas_width,
        height: canvas_height,
    };
    let Some(crop) = layers.find_crop().and_then(Layer::rect) else {
        return full;
    };

    let x = crop.x.round().max(0.0);
    let y = crop.y.round().max(0.0);
    let width = (crop.right().round() - x).min(f64::from(canvas_width) - x);
    let height = (crop.bottom().round() - y).min(f64::from(canvas_height) - y);
    if width <= 0.0 || height <= 0.0 {
        warn!(?crop, "crop has no area inside the canvas, exporting full image");
        return full;
    }
    ExportRegion {
        x: x as u32,
        y: y as u32,
        width: width as u32,
        height: height as u32,
    }
}

/// Editable preview: base image, every non-crop layer, crop mask, then the
/// active layer's handles.
pub fn render_preview(
    source: &RgbaImage,
    layers: &LayerStack,
    active: Option<&Layer>,
    style: &RenderStyle,
) -> RgbaImage {
    let mut canvas = source.clone();
    let offset = Point::default();
    for layer in layers.iter().filter(|l| l.kind() != LayerKind::Crop) {
        draw_layer(&mut canvas, source, layer, offset);
    }

    if let Some(crop) = layers.find_crop().and_then(Layer::rect) {
        draw_crop_mask(&mut canvas, &crop, style);
    }

    if let Some(rect) = active.and_then(Layer::rect) {
        draw_handles(&mut canvas, &rect, style);
    }
    canvas
}

/// Final bitmap: the export region of the base image with every non-crop
/// layer translated into region-relative space.
pub fn render_export(source: &RgbaImage, layers: &LayerStack) -> RgbaImage {
    let region = export_region(layers, source.width(), source.height());
    let mut out =
        imageops::crop_imm(source, region.x, region.y, region.width, region.height).to_image();
    let bounds = region.as_rect();
    let offset = Point::new(-bounds.x, -bounds.y);

    for layer in layers.iter().filter(|l| l.kind() != LayerKind::Crop) {
        if !layer_reaches(layer, &bounds) {
            continue;
        }
        draw_layer(&mut out, source, layer, offset);
    }
    out
}

fn layer_reaches(layer: &Layer, bounds: &Rect) -> bool {
    layer.geometry().bounding_rect().touches(bounds)
}

/// Draw one layer into `target`, shifted by `offset`. `source` is the
/// untouched base image in canvas space, used for blur sampling.
fn draw_layer(target: &mut RgbaImage, source: &RgbaImage, layer: &Layer, offset: Point) {
    match (layer.geometry(), layer.params()) {
        (Geometry::Rect(rect), Params::Blur { radius }) => {
            draw_blur(target, source, rect, *radius, offset);
        }
        (Geometry::Rect(rect), Params::Highlight { color }) => {
            let moved = rect.translated(offset.x, offset.y);
            let target_rect = Rect::new(0.0, 0.0, f64::from(target.width()), f64::from(target.height()));
            if let Some(clipped) = moved.intersection(&target_rect) {
                stroke_rect(target, &clipped, parse_color(color, FALLBACK_STROKE), STROKE_WIDTH);
            }
        }
        (Geometry::Points(points), Params::Line) => {
            let color = parse_color(&points.color, FALLBACK_STROKE);
            let moved = points.translated(offset.x, offset.y);
            draw_arrow(target, moved.start(), moved.end(), color, STROKE_WIDTH);
        }
        (
            Geometry::Rect(rect),
            Params::Text {
                text,
                color,
                font_size,
            },
        ) => {
            let moved = rect.translated(offset.x, offset.y);
            draw_text_block(target, &moved, text, parse_color(color, FALLBACK_STROKE), *font_size);
        }
        _ => {}
    }
}

/// Blur always samples the original pixels under the rect, never what
/// earlier layers drew there.
fn draw_blur(target: &mut RgbaImage, source: &RgbaImage, rect: &Rect, radius: f64, offset: Point) {
    if rect.is_degenerate() || radius.is_nan() || radius <= 0.0 {
        return;
    }
    let canvas = Bounds::new(f64::from(source.width()), f64::from(source.height())).as_rect();
    let Some(area) = rect.intersection(&canvas) else {
        return;
    };
    let x = area.x.round() as u32;
    let y = area.y.round() as u32;
    let w = (area.right().round() as u32).saturating_sub(x);
    let h = (area.bottom().round() as u32).saturating_sub(y);
    if w == 0 || h == 0 {
        return;
    }
    let patch = imageops::crop_imm(source, x, y, w, h).to_image();
    let blurred = imageops::blur(&patch, radius as f32);
    imageops::replace(
        target,
        &blurred,
        i64::from(x) + offset.x.round() as i64,
        i64::from(y) + offset.y.round() as i64,
    );
}

fn draw_text_block(target: &mut RgbaImage, rect: &Rect, text: &str, color: Rgba<u8>, font_size: f64) {
    if rect.is_degenerate() {
        return;
    }
    let font = BitmapFont::new(font_size);
    let lines = wrap_text(text, rect.width, rect.height, font_size, &font);
    for (i, line) in lines.iter().enumerate() {
        let origin = Point::new(rect.x, rect.y + i as f64 * font.line_height());
        draw_text_line(target, origin, line, font, color);
    }
}

/// Four disjoint strips around the crop, its border, and a size label.
fn draw_crop_mask(canvas: &mut RgbaImage, crop: &Rect, style: &RenderStyle) {
    let w = f64::from(canvas.width());
    let h = f64::from(canvas.height());
    let strips = [
        Rect::new(0.0, 0.0, w, crop.y),
        Rect::new(0.0, crop.bottom(), w, h - crop.bottom()),
        Rect::new(0.0, crop.y, crop.x, crop.height),
        Rect::new(crop.right(), crop.y, w - crop.right(), crop.height),
    ];
    for strip in &strips {
        fill_rect(canvas, strip, style.crop_dim);
    }

    stroke_rect(canvas, crop, style.crop_border, STROKE_WIDTH);
    draw_text_line(
        canvas,
        Point::new(crop.x + 10.0, crop.y + 8.0),
        &crop_label(crop),
        BitmapFont::new(CROP_LABEL_SIZE),
        style.crop_border,
    );
}

pub fn crop_label(crop: &Rect) -> String {
    let round1 = |v: f64| (v * 10.0).round() / 10.0;
    format!("{} × {}", round1(crop.width), round1(crop.height))
}

fn draw_handles(canvas: &mut RgbaImage, rect: &Rect, style: &RenderStyle) {
    for handle in Handle::ALL {
        fill_square(canvas, rect.handle_center(handle), style.handle_size, style.handle_color);
    }
}
