use std::f64::consts::PI;

use image::{Rgba, RgbaImage};

use crate::geometry::{Point, Rect};
use crate::text::BitmapFont;

pub const STROKE_WIDTH: f64 = 2.0;
pub const ARROW_BARB_LEN: f64 = 10.0;

pub fn blend_pixel(dst: Rgba<u8>, src: Rgba<u8>) -> Rgba<u8> {
    let a = f64::from(src[3]) / 255.0;
    if a <= 0.0 {
        return dst;
    }
    let inv = 1.0 - a;
    let mix = |d: u8, s: u8| {
        (f64::from(d) * inv + f64::from(s) * a)
            .round()
            .clamp(0.0, 255.0) as u8
    };
    let out_a = (f64::from(dst[3]) * inv + f64::from(src[3]))
        .round()
        .clamp(0.0, 255.0) as u8;
    Rgba([mix(dst[0], src[0]), mix(dst[1], src[1]), mix(dst[2], src[2]), out_a])
}

fn blend_at(img: &mut RgbaImage, x: i64, y: i64, color: Rgba<u8>) {
    if x < 0 || y < 0 || x >= i64::from(img.width()) || y >= i64::from(img.height()) {
        return;
    }
    let (x, y) = (x as u32, y as u32);
    let dst = *img.get_pixel(x, y);
    img.put_pixel(x, y, blend_pixel(dst, color));
}

/// Blend `color` over the half-open pixel span `[x0, x1) × [y0, y1)`,
/// clipped to the image.
pub fn fill_span(img: &mut RgbaImage, x0: i64, y0: i64, x1: i64, y1: i64, color: Rgba<u8>) {
    let x0 = x0.max(0);
    let y0 = y0.max(0);
    let x1 = x1.min(i64::from(img.width()));
    let y1 = y1.min(i64::from(img.height()));
    for y in y0..y1 {
        for x in x0..x1 {
            blend_at(img, x, y, color);
        }
    }
}

/// Fill a canvas-space rect. Edges round to the nearest pixel boundary, so
/// rects sharing an edge never overlap or leave a gap.
pub fn fill_rect(img: &mut RgbaImage, rect: &Rect, color: Rgba<u8>) {
    if rect.is_degenerate() {
        return;
    }
    fill_span(
        img,
        rect.x.round() as i64,
        rect.y.round() as i64,
        rect.right().round() as i64,
        rect.bottom().round() as i64,
        color,
    );
}

/// Stroke the border of `rect` with a band of `thickness` pixels centered
/// on each edge.
pub fn stroke_rect(img: &mut RgbaImage, rect: &Rect, color: Rgba<u8>, thickness: f64) {
    if rect.is_degenerate() {
        return;
    }
    let half = thickness.max(1.0) / 2.0;
    let band = |edge: f64| ((edge - half).round() as i64, (edge + half).round() as i64);

    let (l0, l1) = band(rect.x);
    let (r0, r1) = band(rect.right());
    let (t0, t1) = band(rect.y);
    let (b0, b1) = band(rect.bottom());

    fill_span(img, l0, t0, r1, t1, color);
    fill_span(img, l0, b0, r1, b1, color);
    fill_span(img, l0, t1, l1, b0, color);
    fill_span(img, r0, t1, r1, b0, color);
}

/// Pixels covered by one stroke. Overlapping discs, shaft and barbs mark
/// the same pixel once, so translucent colors blend exactly once.
struct Coverage {
    width: i64,
    height: i64,
    hits: Vec<bool>,
}

impl Coverage {
    fn new(img: &RgbaImage) -> Self {
        let width = i64::from(img.width());
        let height = i64::from(img.height());
        Self {
            width,
            height,
            hits: vec![false; (width * height) as usize],
        }
    }

    fn mark(&mut self, x: i64, y: i64) {
        if x < 0 || y < 0 || x >= self.width || y >= self.height {
            return;
        }
        self.hits[(y * self.width + x) as usize] = true;
    }

    fn disc(&mut self, cx: f64, cy: f64, radius: f64) {
        if radius <= 0.1 {
            self.mark(cx.round() as i64, cy.round() as i64);
            return;
        }
        let min_x = ((cx - radius).floor() as i64).max(0);
        let max_x = ((cx + radius).ceil() as i64).min(self.width - 1);
        let min_y = ((cy - radius).floor() as i64).max(0);
        let max_y = ((cy + radius).ceil() as i64).min(self.height - 1);
        let r2 = radius * radius;
        for y in min_y..=max_y {
            for x in min_x..=max_x {
                let dx = x as f64 - cx;
                let dy = y as f64 - cy;
                if dx * dx + dy * dy <= r2 {
                    self.mark(x, y);
                }
            }
        }
    }

    /// Sweep a disc along the part of `from..to` that can reach the image.
    fn segment(&mut self, from: Point, to: Point, width: f64) {
        let radius = (width.max(1.0) / 2.0).max(0.6);
        let min = Point::new(-radius, -radius);
        let max = Point::new(self.width as f64 - 1.0 + radius, self.height as f64 - 1.0 + radius);
        let Some((a, b)) = clip_segment(from, to, min, max) else {
            return;
        };
        let dx = b.x - a.x;
        let dy = b.y - a.y;
        let steps = dx.hypot(dy).max(1.0).ceil() as i64;
        for step in 0..=steps {
            let t = step as f64 / steps as f64;
            self.disc(a.x + dx * t, a.y + dy * t, radius);
        }
    }

    fn blend_into(&self, img: &mut RgbaImage, color: Rgba<u8>) {
        for (index, _) in self.hits.iter().enumerate().filter(|(_, hit)| **hit) {
            let index = index as i64;
            blend_at(img, index % self.width, index / self.width, color);
        }
    }
}

/// Liang-Barsky clip of `from..to` to the box `[min, max]`.
fn clip_segment(from: Point, to: Point, min: Point, max: Point) -> Option<(Point, Point)> {
    let dx = to.x - from.x;
    let dy = to.y - from.y;
    let mut t0: f64 = 0.0;
    let mut t1: f64 = 1.0;
    for (p, q) in [
        (-dx, from.x - min.x),
        (dx, max.x - from.x),
        (-dy, from.y - min.y),
        (dy, max.y - from.y),
    ] {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
            continue;
        }
        let r = q / p;
        if p < 0.0 {
            t0 = t0.max(r);
        } else {
            t1 = t1.min(r);
        }
        if t0 > t1 {
            return None;
        }
    }
    if t0.is_nan() || t1.is_nan() {
        return None;
    }
    Some((
        Point::new(from.x + dx * t0, from.y + dy * t0),
        Point::new(from.x + dx * t1, from.y + dy * t1),
    ))
}

pub fn draw_disc(img: &mut RgbaImage, cx: f64, cy: f64, radius: f64, color: Rgba<u8>) {
    let mut coverage = Coverage::new(img);
    coverage.disc(cx, cy, radius);
    coverage.blend_into(img, color);
}

pub fn draw_thick_line(img: &mut RgbaImage, from: Point, to: Point, color: Rgba<u8>, width: f64) {
    let mut coverage = Coverage::new(img);
    coverage.segment(from, to, width);
    coverage.blend_into(img, color);
}

/// Straight segment with two fixed-length barbs at `to`, each 30° off the
/// reverse direction.
pub fn draw_arrow(img: &mut RgbaImage, from: Point, to: Point, color: Rgba<u8>, width: f64) {
    let mut coverage = Coverage::new(img);
    coverage.segment(from, to, width);
    let angle = (to.y - from.y).atan2(to.x - from.x);
    for side in [-1.0, 1.0] {
        let barb_angle = angle + side * PI / 6.0;
        let tip = Point::new(
            to.x - ARROW_BARB_LEN * barb_angle.cos(),
            to.y - ARROW_BARB_LEN * barb_angle.sin(),
        );
        coverage.segment(to, tip, width);
    }
    coverage.blend_into(img, color);
}

/// Draw one line of text with its top-left glyph cell at `origin`.
pub fn draw_text_line(img: &mut RgbaImage, origin: Point, text: &str, font: BitmapFont, color: Rgba<u8>) {
    let cell = font.size;
    if cell <= 0.0 {
        return;
    }
    let scale = cell / 8.0;
    let mut cursor_x = origin.x;
    for ch in text.chars() {
        if let Some(glyph) = BitmapFont::glyph(ch) {
            let x0 = cursor_x.floor() as i64;
            let x1 = (cursor_x + cell).ceil() as i64;
            let y0 = origin.y.floor() as i64;
            let y1 = (origin.y + cell).ceil() as i64;
            for py in y0..y1 {
                let row = ((py as f64 + 0.5 - origin.y) / scale).floor();
                if !(0.0..8.0).contains(&row) {
                    continue;
                }
                let bits = glyph[row as usize];
                for px in x0..x1 {
                    let col = ((px as f64 + 0.5 - cursor_x) / scale).floor();
                    if !(0.0..8.0).contains(&col) {
                        continue;
                    }
                    if (bits >> col as u32) & 1 == 1 {
                        blend_at(img, px, py, color);
                    }
                }
            }
        }
        cursor_x += font.advance();
    }
}

/// Filled square of side `size` centered on `center`.
pub fn fill_square(img: &mut RgbaImage, center: Point, size: f64, color: Rgba<u8>) {
    let half = size / 2.0;
    fill_rect(img, &Rect::new(center.x - half, center.y - half, size, size), color);
}
