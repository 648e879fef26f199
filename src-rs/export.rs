use std::io::Cursor;

use chrono::{DateTime, Utc};
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat, RgbaImage};

use crate::error::EditorError;

/// Output encoding handed to the export sink.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ExportFormat {
    Png,
    /// Lossy; `quality` is in `0.0..=1.0`.
    Jpeg { quality: f32 },
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Png => "png",
            ExportFormat::Jpeg { .. } => "jpeg",
        }
    }

    fn encoder_quality(quality: f32) -> u8 {
        let q = if quality.is_nan() { 0.92 } else { quality };
        (q.clamp(0.0, 1.0) * 100.0).round().clamp(1.0, 100.0) as u8
    }
}

pub fn encode(image: &RgbaImage, format: ExportFormat) -> Result<Vec<u8>, EditorError> {
    let mut buf = Vec::new();
    match format {
        ExportFormat::Png => {
            image
                .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
                .map_err(|source| EditorError::Encode {
                    format: "png",
                    source,
                })?;
        }
        ExportFormat::Jpeg { quality } => {
            // JPEG has no alpha channel.
            let rgb = DynamicImage::ImageRgba8(image.clone()).to_rgb8();
            let mut encoder =
                JpegEncoder::new_with_quality(&mut buf, ExportFormat::encoder_quality(quality));
            encoder
                .encode_image(&rgb)
                .map_err(|source| EditorError::Encode {
                    format: "jpeg",
                    source,
                })?;
        }
    }
    Ok(buf)
}

/// `edited_YYYY_MM_DD_HH_MM_SS.<ext>`
pub fn default_file_name(now: DateTime<Utc>, format: ExportFormat) -> String {
    format!(
        "edited_{}.{}",
        now.format("%Y_%m_%d_%H_%M_%S"),
        format.extension()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use image::Rgba;

    #[test]
    fn png_round_trips_dimensions() {
        let img = RgbaImage::from_pixel(7, 3, Rgba([1, 2, 3, 255]));
        let bytes = encode(&img, ExportFormat::Png).unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap().to_rgba8();
        assert_eq!(decoded, img);
    }

    #[test]
    fn jpeg_quality_changes_size() {
        let img = RgbaImage::from_fn(64, 64, |x, y| Rgba([(x * 4) as u8, (y * 4) as u8, ((x ^ y) * 4) as u8, 255]));
        let low = encode(&img, ExportFormat::Jpeg { quality: 0.1 }).unwrap();
        let high = encode(&img, ExportFormat::Jpeg { quality: 1.0 }).unwrap();
        assert!(low.len() < high.len());
        assert_eq!(&low[..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn quality_maps_to_encoder_range() {
        assert_eq!(ExportFormat::encoder_quality(0.0), 1);
        assert_eq!(ExportFormat::encoder_quality(0.92), 92);
        assert_eq!(ExportFormat::encoder_quality(7.0), 100);
    }

    #[test]
    fn file_name_uses_timestamp() {
        let now = Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        assert_eq!(
            default_file_name(now, ExportFormat::Png),
            "edited_2024_03_09_14_05_07.png"
        );
    }
}
