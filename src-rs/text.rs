//! Text measurement and word wrapping for text layers.
//!
//! Glyphs come from the 8×8 `font8x8` bitmaps scaled so one glyph cell is
//! `font_size` pixels square. The wrapper itself only needs a
//! [`TextMeasure`], so it is tested independently of rasterisation.

use font8x8::{UnicodeFonts, BASIC_FONTS, LATIN_FONTS};

pub const LINE_HEIGHT_FACTOR: f64 = 1.2;
pub const ELLIPSIS: &str = "...";

pub trait TextMeasure {
    fn measure(&self, text: &str) -> f64;
}

/// Monospace bitmap font at a given pixel size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BitmapFont {
    pub size: f64,
}

impl BitmapFont {
    pub fn new(size: f64) -> Self {
        Self { size }
    }

    pub fn advance(&self) -> f64 {
        self.size
    }

    pub fn line_height(&self) -> f64 {
        self.size * LINE_HEIGHT_FACTOR
    }

    /// 8 rows of bitmap bits, low bit leftmost. Unknown characters fall
    /// back to `?`.
    pub fn glyph(ch: char) -> Option<[u8; 8]> {
        BASIC_FONTS
            .get(ch)
            .or_else(|| LATIN_FONTS.get(ch))
            .or_else(|| BASIC_FONTS.get('?'))
    }
}

impl TextMeasure for BitmapFont {
    fn measure(&self, text: &str) -> f64 {
        text.chars().count() as f64 * self.advance()
    }
}

/// Lay `text` out into lines that fit a `max_width × max_height` box.
///
/// Words are packed greedily; a single word wider than the box keeps its
/// own line. When more lines are needed than fit, the last fitting line is
/// cut back word by word until it fits with a trailing ellipsis.
pub fn wrap_text(
    text: &str,
    max_width: f64,
    max_height: f64,
    font_size: f64,
    measure: &impl TextMeasure,
) -> Vec<String> {
    if text.is_empty() || max_width <= 0.0 || max_height <= 0.0 || font_size <= 0.0 {
        return Vec::new();
    }
    let line_height = font_size * LINE_HEIGHT_FACTOR;
    let max_lines = (max_height / line_height + 1e-9).floor() as usize;
    if max_lines == 0 {
        return Vec::new();
    }

    let mut lines = Vec::new();
    for paragraph in text.split('\n') {
        let mut current = String::new();
        for word in paragraph.split(' ').filter(|w| !w.is_empty()) {
            let candidate = if current.is_empty() {
                word.to_string()
            } else {
                format!("{current} {word}")
            };
            if !current.is_empty() && measure.measure(&candidate) > max_width {
                lines.push(std::mem::replace(&mut current, word.to_string()));
            } else {
                current = candidate;
            }
        }
        lines.push(current);
    }

    if lines.len() > max_lines {
        lines.truncate(max_lines);
        if let Some(last) = lines.last_mut() {
            *last = truncate_with_ellipsis(last, max_width, measure);
        }
    }
    lines
}

/// Trim trailing words (then characters, for a lone long word) until
/// `line + "..."` fits `max_width`.
pub fn truncate_with_ellipsis(line: &str, max_width: f64, measure: &impl TextMeasure) -> String {
    let mut words: Vec<&str> = line.split(' ').filter(|w| !w.is_empty()).collect();
    while words.len() > 1 && measure.measure(&format!("{}{ELLIPSIS}", words.join(" "))) > max_width {
        words.pop();
    }

    let mut head = words.join(" ");
    while !head.is_empty() && measure.measure(&format!("{head}{ELLIPSIS}")) > max_width {
        head.pop();
    }

    let out = format!("{}{ELLIPSIS}", head.trim_end());
    if measure.measure(&out) > max_width {
        return String::new();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fits_on_one_line() {
        let font = BitmapFont::new(8.0);
        let lines = wrap_text("hello world", 200.0, 50.0, 8.0, &font);
        assert_eq!(lines, vec!["hello world"]);
    }

    #[test]
    fn three_lines_into_two_truncates_second() {
        let font = BitmapFont::new(8.0);
        let width = 80.0;
        // Two lines need 19.2px; a third would need 28.8px.
        let lines = wrap_text("aaaa bbbb cccc dddd eeee ffff", width, 20.0, 8.0, &font);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "aaaa bbbb");
        assert!(lines[1].ends_with(ELLIPSIS));
        assert_eq!(lines[1], "cccc...");
        for line in &lines {
            assert!(font.measure(line) <= width, "{line:?} too wide");
        }
    }

    #[test]
    fn lone_long_word_is_cut_by_characters() {
        let font = BitmapFont::new(10.0);
        let out = truncate_with_ellipsis("abcdefghijkl", 60.0, &font);
        assert_eq!(out, "abc...");
    }

    #[test]
    fn too_short_box_renders_nothing() {
        let font = BitmapFont::new(20.0);
        assert!(wrap_text("hi", 100.0, 10.0, 20.0, &font).is_empty());
        assert!(wrap_text("hi", 0.0, 100.0, 20.0, &font).is_empty());
    }

    #[test]
    fn newlines_force_breaks() {
        let font = BitmapFont::new(8.0);
        let lines = wrap_text("one\ntwo", 200.0, 100.0, 8.0, &font);
        assert_eq!(lines, vec!["one", "two"]);
    }

    #[test]
    fn glyph_lookup_covers_latin_and_fallback() {
        assert!(BitmapFont::glyph('A').is_some());
        assert!(BitmapFont::glyph('×').is_some());
        assert_eq!(BitmapFont::glyph('\u{4e00}'), BitmapFont::glyph('?'));
    }
}
