//! Final sequence assembly
//!
//! Turns the ordering engine's output into the immutable frame list handed
//! to the GIF encoder: dedup by chip id, stamp dates under the `date`
//! strategy, and refuse to produce an empty sequence.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use image::RgbImage;
use tracing::warn;

use crate::annotate::{self, AnnotateConfig};
use crate::error::PipelineError;
use crate::ordering::{OrderResult, Strategy};

/// One display-ready frame.
#[derive(Debug, Clone)]
pub struct Frame {
    pub id: String,
    pub acquired: DateTime<Utc>,
    pub image: RgbImage,
}

/// The pipeline's sole output: filtered, ordered, optionally annotated
/// frames, consumed in list order by the encoder.
#[derive(Debug, Clone)]
pub struct Sequence {
    pub strategy: Strategy,
    pub frames: Vec<Frame>,
}

impl Sequence {
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

/// Assemble the final sequence. Dedup is defensive; the ordering engine
/// should never emit the same chip twice. Annotation applies only under the
/// date strategy and falls back to the plain frame when a label cannot be
/// rendered.
pub fn assemble(
    ordered: OrderResult,
    strategy: Strategy,
    config: &AnnotateConfig,
) -> Result<Sequence, PipelineError> {
    let mut seen = HashSet::new();
    let mut frames = Vec::with_capacity(ordered.frames.len());

    for candidate in ordered.frames {
        if !seen.insert(candidate.id.clone()) {
            warn!("duplicate frame {} dropped from sequence", candidate.id);
            continue;
        }

        let image = if strategy == Strategy::Date {
            let label = annotate::date_label(candidate.acquired);
            match annotate::annotate(&candidate.image, &label, config) {
                Ok(stamped) => stamped,
                Err(e) => {
                    warn!(
                        "could not annotate frame {}: {e}; keeping it unlabelled",
                        candidate.id
                    );
                    candidate.image
                }
            }
        } else {
            candidate.image
        };

        frames.push(Frame {
            id: candidate.id,
            acquired: candidate.acquired,
            image,
        });
    }

    if frames.is_empty() {
        return Err(PipelineError::EmptySequence);
    }

    Ok(Sequence { strategy, frames })
}
