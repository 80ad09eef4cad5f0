//! Animated GIF assembly for Landmark Gifr
//!
//! Takes the pipeline's ordered frames, inserts blended fade transitions,
//! appends a reversed pass so the loop sweeps forward then back without a
//! seam, and encodes an infinitely repeating GIF with a slow "beat" frame
//! every few frames.

use std::fs::File;
use std::path::Path;

use image::codecs::gif::{GifEncoder, Repeat};
use image::{Delay, Frame, RgbImage};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("no frames to encode")]
    NoFrames,

    #[error("could not create {path}: {source}")]
    Create {
        path: String,
        source: std::io::Error,
    },

    #[error("gif encoding failed: {0}")]
    Encode(#[from] image::ImageError),
}

/// How the frame list is expanded and timed.
#[derive(Debug, Clone)]
pub struct GifOptions {
    /// How many times to interleave blended transition frames.
    pub fade_passes: u32,
    /// Play the sequence forward then back so the loop has no seam.
    pub boomerang: bool,
    /// Base per-frame delay in milliseconds.
    pub frame_delay_ms: u32,
    /// Delay for the held beat frames.
    pub beat_delay_ms: u32,
    /// Every Nth frame is held at the beat delay. 0 disables beats.
    pub beat_interval: usize,
}

impl Default for GifOptions {
    fn default() -> Self {
        Self {
            fade_passes: 2,
            boomerang: true,
            frame_delay_ms: 100,
            beat_delay_ms: 500,
            beat_interval: 4,
        }
    }
}

/// 50% blend of two equally sized frames.
pub fn blend(a: &RgbImage, b: &RgbImage) -> RgbImage {
    let mut out = a.clone();
    for (pixel, other) in out.pixels_mut().zip(b.pixels()) {
        for (channel, source) in pixel.0.iter_mut().zip(other.0) {
            *channel = ((u16::from(*channel) + u16::from(source)) / 2) as u8;
        }
    }
    out
}

/// Insert a blended transition between each adjacent pair; n frames become
/// 2n - 1.
pub fn with_fades(frames: &[RgbImage]) -> Vec<RgbImage> {
    let mut out = Vec::with_capacity(frames.len() * 2);
    let Some(first) = frames.first() else {
        return out;
    };
    out.push(first.clone());
    for pair in frames.windows(2) {
        out.push(blend(&pair[0], &pair[1]));
        out.push(pair[1].clone());
    }
    out
}

/// Append the reversed interior so the animation sweeps back to the start;
/// m frames become 2m - 2.
pub fn boomerang(mut frames: Vec<RgbImage>) -> Vec<RgbImage> {
    if frames.len() > 2 {
        let back: Vec<RgbImage> = frames[1..frames.len() - 1].iter().rev().cloned().collect();
        frames.extend(back);
    }
    frames
}

/// Expand the sequence per the options and write the looping GIF.
pub fn encode(path: &Path, frames: &[RgbImage], options: &GifOptions) -> Result<(), EncodeError> {
    if frames.is_empty() {
        return Err(EncodeError::NoFrames);
    }

    let mut expanded = frames.to_vec();
    for _ in 0..options.fade_passes {
        expanded = with_fades(&expanded);
    }
    if options.boomerang {
        expanded = boomerang(expanded);
    }

    let file = File::create(path).map_err(|source| EncodeError::Create {
        path: path.display().to_string(),
        source,
    })?;
    let mut encoder = GifEncoder::new(file);
    encoder.set_repeat(Repeat::Infinite)?;

    for (index, frame) in expanded.iter().enumerate() {
        let delay_ms = if options.beat_interval > 0 && index % options.beat_interval == 0 {
            options.beat_delay_ms
        } else {
            options.frame_delay_ms
        };
        let delay = Delay::from_numer_denom_ms(delay_ms, 1);
        let rgba = image::DynamicImage::ImageRgb8(frame.clone()).to_rgba8();
        encoder.encode_frame(Frame::from_parts(rgba, 0, 0, delay))?;
    }

    info!("wrote {} frames to {}", expanded.len(), path.display());
    Ok(())
}
