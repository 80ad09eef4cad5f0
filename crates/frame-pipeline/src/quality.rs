//! Pixel-content quality heuristics
//!
//! Chips come back from the provider with no-data borders (pure black),
//! unrendered flat-grey fills, or washed-out near-white frames. This module
//! classifies a single chip as usable or not, purely from its pixels and the
//! configured thresholds, so it can be tested with synthetic images.

use image::RgbImage;
use serde::{Deserialize, Serialize};

/// Tunable thresholds for the usability checks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityConfig {
    /// Fraction of pure-black sentinel pixels above which a chip is no-data.
    pub no_data_fraction: f64,
    /// Luma variance below which a chip counts as flat grey.
    pub grey_variance: f64,
    /// Mean luma above which a chip counts as overexposed.
    pub overexposed_mean: f64,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            no_data_fraction: 0.30,
            grey_variance: 50.0,
            overexposed_mean: 220.0,
        }
    }
}

/// Usability verdict for one chip, with the reason it was thrown out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QualityVerdict {
    Ok,
    NoData,
    FlatGrey,
    Overexposed,
}

impl QualityVerdict {
    pub fn is_usable(&self) -> bool {
        matches!(self, QualityVerdict::Ok)
    }

    pub fn reason(&self) -> &'static str {
        match self {
            QualityVerdict::Ok => "ok",
            QualityVerdict::NoData => "no-data",
            QualityVerdict::FlatGrey => "flat-grey",
            QualityVerdict::Overexposed => "overexposed",
        }
    }
}

/// Classify one chip. Checks run no-data, then flat-grey, then overexposed,
/// and the first failure wins. The pixel statistics are gathered in a single
/// pass and shared across the checks.
pub fn evaluate(image: &RgbImage, config: &QualityConfig) -> QualityVerdict {
    let pixel_count = (u64::from(image.width()) * u64::from(image.height())).max(1);

    let mut black = 0u64;
    let mut luma_sum = 0.0f64;
    let mut luma_sq_sum = 0.0f64;
    for pixel in image.pixels() {
        let [r, g, b] = pixel.0;
        if r == 0 && g == 0 && b == 0 {
            black += 1;
        }
        // ITU-R BT.601 luminance weights
        let luma = 0.299 * f64::from(r) + 0.587 * f64::from(g) + 0.114 * f64::from(b);
        luma_sum += luma;
        luma_sq_sum += luma * luma;
    }

    if black as f64 / pixel_count as f64 > config.no_data_fraction {
        return QualityVerdict::NoData;
    }

    let mean = luma_sum / pixel_count as f64;
    let variance = luma_sq_sum / pixel_count as f64 - mean * mean;
    if variance < config.grey_variance {
        return QualityVerdict::FlatGrey;
    }

    if mean > config.overexposed_mean {
        return QualityVerdict::Overexposed;
    }

    QualityVerdict::Ok
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn uniform(width: u32, height: u32, value: u8) -> RgbImage {
        RgbImage::from_pixel(width, height, Rgb([value, value, value]))
    }

    /// A textured scene: plenty of variance, mid brightness, no black.
    fn textured() -> RgbImage {
        RgbImage::from_fn(16, 16, |x, y| {
            let v = (x * 16 + y) as u8;
            Rgb([v.max(1), v / 2 + 40, 255 - v])
        })
    }

    #[test]
    fn test_black_chip_is_no_data() {
        assert_eq!(
            evaluate(&uniform(8, 8, 0), &QualityConfig::default()),
            QualityVerdict::NoData
        );
    }

    #[test]
    fn test_partial_black_border_crosses_threshold() {
        // 40 of 64 pixels black: 62% > 30%
        let image = RgbImage::from_fn(8, 8, |x, _| {
            if x < 5 {
                Rgb([0, 0, 0])
            } else {
                Rgb([120, 140, 90])
            }
        });
        assert_eq!(
            evaluate(&image, &QualityConfig::default()),
            QualityVerdict::NoData
        );
    }

    #[test]
    fn test_flat_grey_chip_thrown_out() {
        assert_eq!(
            evaluate(&uniform(8, 8, 128), &QualityConfig::default()),
            QualityVerdict::FlatGrey
        );
    }

    #[test]
    fn test_bright_noisy_chip_is_overexposed() {
        // Alternating 230/250 has mean 240 and variance 100, so it clears
        // the flat-grey check and trips the brightness cutoff.
        let image = RgbImage::from_fn(8, 8, |x, y| {
            let v = if (x + y) % 2 == 0 { 230 } else { 250 };
            Rgb([v, v, v])
        });
        assert_eq!(
            evaluate(&image, &QualityConfig::default()),
            QualityVerdict::Overexposed
        );
    }

    #[test]
    fn test_textured_scene_is_usable() {
        let verdict = evaluate(&textured(), &QualityConfig::default());
        assert_eq!(verdict, QualityVerdict::Ok);
        assert!(verdict.is_usable());
    }

    #[test]
    fn test_thresholds_come_from_config() {
        let strict = QualityConfig {
            no_data_fraction: 0.0,
            ..QualityConfig::default()
        };
        let mut image = textured();
        image.put_pixel(0, 0, Rgb([0, 0, 0]));
        assert_eq!(evaluate(&image, &strict), QualityVerdict::NoData);
        assert_eq!(
            evaluate(&image, &QualityConfig::default()),
            QualityVerdict::Ok
        );
    }
}
