//! Date watermarking and logo overlay
//!
//! Renders the capture timestamp onto a copy of a frame. The label alphabet
//! is only digits, a dash, a colon and a space, so a tiny embedded 5x7
//! bitmap font covers it without pulling in a text rasterizer. The source
//! frame is never mutated; re-running the pipeline stamps fresh copies.

use chrono::{DateTime, Utc};
use image::{Rgb, RgbImage, RgbaImage};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const GLYPH_WIDTH: u32 = 5;
const GLYPH_HEIGHT: u32 = 7;
/// Column gap between glyphs, in font pixels.
const GLYPH_GAP: u32 = 1;

/// Fixed placement and styling for the date label.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnotateConfig {
    /// Pixel offset of the label from the left and bottom edges.
    pub margin: u32,
    /// Integer upscale factor for the 5x7 glyphs.
    pub scale: u32,
    /// Label color; white reads best over imagery.
    pub color: [u8; 3],
}

impl Default for AnnotateConfig {
    fn default() -> Self {
        Self {
            margin: 20,
            scale: 2,
            color: [255, 255, 255],
        }
    }
}

/// Non-fatal rendering failures; the caller keeps the unannotated frame.
#[derive(Debug, Error)]
pub enum AnnotateError {
    #[error("no glyph for {0:?}")]
    UnsupportedGlyph(char),

    #[error("label {label_width}x{label_height}px does not fit a {image_width}x{image_height}px frame")]
    DoesNotFit {
        label_width: u32,
        label_height: u32,
        image_width: u32,
        image_height: u32,
    },
}

/// Format a capture timestamp the way the watermark prints it.
pub fn date_label(acquired: DateTime<Utc>) -> String {
    acquired.format("%Y-%m-%d %H:%M").to_string()
}

/// Stamp `label` onto a copy of `image` at the fixed bottom-left position.
pub fn annotate(
    image: &RgbImage,
    label: &str,
    config: &AnnotateConfig,
) -> Result<RgbImage, AnnotateError> {
    let glyphs: Vec<&'static [u8; 7]> = label
        .chars()
        .map(glyph)
        .collect::<Result<_, AnnotateError>>()?;

    let scale = config.scale.max(1);
    let label_width = (glyphs.len() as u32 * (GLYPH_WIDTH + GLYPH_GAP) * scale)
        .saturating_sub(GLYPH_GAP * scale);
    let label_height = GLYPH_HEIGHT * scale;
    let (image_width, image_height) = image.dimensions();
    if config.margin + label_width > image_width || config.margin + label_height > image_height {
        return Err(AnnotateError::DoesNotFit {
            label_width,
            label_height,
            image_width,
            image_height,
        });
    }

    let mut stamped = image.clone();
    let origin_x = config.margin;
    let origin_y = image_height - config.margin - label_height;
    let color = Rgb(config.color);

    for (index, rows) in glyphs.iter().enumerate() {
        let glyph_x = origin_x + index as u32 * (GLYPH_WIDTH + GLYPH_GAP) * scale;
        for (row, bits) in rows.iter().enumerate() {
            for col in 0..GLYPH_WIDTH {
                if bits & (1 << (GLYPH_WIDTH - 1 - col)) == 0 {
                    continue;
                }
                for dy in 0..scale {
                    for dx in 0..scale {
                        stamped.put_pixel(
                            glyph_x + col * scale + dx,
                            origin_y + row as u32 * scale + dy,
                            color,
                        );
                    }
                }
            }
        }
    }

    Ok(stamped)
}

/// Composite an RGBA logo into the top-right corner of a copy of `image`,
/// scaled to a quarter of the frame-fitting size with the aspect ratio
/// preserved.
pub fn overlay_logo(image: &RgbImage, logo: &RgbaImage, margin: u32) -> RgbImage {
    let (image_width, image_height) = image.dimensions();
    let ratio = (f64::from(image_width) / f64::from(logo.width()))
        .min(f64::from(image_height) / f64::from(logo.height()))
        / 4.0;
    let scaled_width = ((f64::from(logo.width()) * ratio) as u32).max(1);
    let scaled_height = ((f64::from(logo.height()) * ratio) as u32).max(1);
    let scaled = image::imageops::resize(
        logo,
        scaled_width,
        scaled_height,
        image::imageops::FilterType::Lanczos3,
    );

    let mut composited = image.clone();
    let origin_x = image_width.saturating_sub(scaled_width + margin);
    let origin_y = margin.min(image_height.saturating_sub(scaled_height));

    for (logo_x, logo_y, pixel) in scaled.enumerate_pixels() {
        let [r, g, b, a] = pixel.0;
        if a == 0 {
            continue;
        }
        let x = origin_x + logo_x;
        let y = origin_y + logo_y;
        if x >= image_width || y >= image_height {
            continue;
        }
        let alpha = f64::from(a) / 255.0;
        let destination = composited.get_pixel_mut(x, y);
        for (channel, source) in destination.0.iter_mut().zip([r, g, b]) {
            *channel =
                (f64::from(*channel) * (1.0 - alpha) + f64::from(source) * alpha).round() as u8;
        }
    }

    composited
}

/// 5x7 bitmap rows; the most significant of the low five bits is the left
/// column.
fn glyph(c: char) -> Result<&'static [u8; 7], AnnotateError> {
    const D0: [u8; 7] = [0b01110, 0b10001, 0b10011, 0b10101, 0b11001, 0b10001, 0b01110];
    const D1: [u8; 7] = [0b00100, 0b01100, 0b00100, 0b00100, 0b00100, 0b00100, 0b01110];
    const D2: [u8; 7] = [0b01110, 0b10001, 0b00001, 0b00010, 0b00100, 0b01000, 0b11111];
    const D3: [u8; 7] = [0b11111, 0b00010, 0b00100, 0b00010, 0b00001, 0b10001, 0b01110];
    const D4: [u8; 7] = [0b00010, 0b00110, 0b01010, 0b10010, 0b11111, 0b00010, 0b00010];
    const D5: [u8; 7] = [0b11111, 0b10000, 0b11110, 0b00001, 0b00001, 0b10001, 0b01110];
    const D6: [u8; 7] = [0b00110, 0b01000, 0b10000, 0b11110, 0b10001, 0b10001, 0b01110];
    const D7: [u8; 7] = [0b11111, 0b00001, 0b00010, 0b00100, 0b01000, 0b01000, 0b01000];
    const D8: [u8; 7] = [0b01110, 0b10001, 0b10001, 0b01110, 0b10001, 0b10001, 0b01110];
    const D9: [u8; 7] = [0b01110, 0b10001, 0b10001, 0b01111, 0b00001, 0b00010, 0b01100];
    const DASH: [u8; 7] = [0b00000, 0b00000, 0b00000, 0b11111, 0b00000, 0b00000, 0b00000];
    const COLON: [u8; 7] = [0b00000, 0b00100, 0b00000, 0b00000, 0b00100, 0b00000, 0b00000];
    const SPACE: [u8; 7] = [0; 7];

    match c {
        '0' => Ok(&D0),
        '1' => Ok(&D1),
        '2' => Ok(&D2),
        '3' => Ok(&D3),
        '4' => Ok(&D4),
        '5' => Ok(&D5),
        '6' => Ok(&D6),
        '7' => Ok(&D7),
        '8' => Ok(&D8),
        '9' => Ok(&D9),
        '-' => Ok(&DASH),
        ':' => Ok(&COLON),
        ' ' => Ok(&SPACE),
        other => Err(AnnotateError::UnsupportedGlyph(other)),
    }
}
