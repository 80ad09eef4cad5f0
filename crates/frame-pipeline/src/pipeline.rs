//! Top-level pipeline entry point
//!
//! Chains normalize, filter, order and assemble over an in-memory batch of
//! candidates. Single-threaded and synchronous; all I/O happens before and
//! after this crate.

use tracing::{debug, info, warn};

use crate::annotate::AnnotateConfig;
use crate::error::PipelineError;
use crate::metadata::{self, RawCandidate};
use crate::ordering::{self, OrderingConfig, Strategy};
use crate::quality::{self, QualityConfig};
use crate::sequence::{self, Sequence};

/// Everything one run needs, passed in explicitly. No global state.
#[derive(Debug, Clone, Default)]
pub struct PipelineConfig {
    pub strategy: Strategy,
    pub quality: QualityConfig,
    pub ordering: OrderingConfig,
    pub annotate: AnnotateConfig,
}

/// Run the full candidate pipeline. Per-candidate problems are logged and
/// absorbed; the only hard failure is ending up with nothing to encode.
pub fn run(raw: Vec<RawCandidate>, config: &PipelineConfig) -> Result<Sequence, PipelineError> {
    let candidates = metadata::normalize_batch(raw);

    let mut usable = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        let verdict = quality::evaluate(&candidate.image, &config.quality);
        if verdict.is_usable() {
            usable.push(candidate);
        } else {
            debug!("chip {} thrown out: {}", candidate.id, verdict.reason());
        }
    }
    info!("{} usable chips after quality filtering", usable.len());

    let ordered = ordering::order(usable, config.strategy, &config.ordering);
    if ordered.insufficient {
        warn!(
            "fewer than two frames left for {} ordering; the GIF will be degenerate",
            config.strategy
        );
    }

    sequence::assemble(ordered, config.strategy, &config.annotate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn textured_image() -> RgbImage {
        RgbImage::from_fn(32, 32, |x, y| {
            let v = ((x * 8 + y) % 255) as u8;
            Rgb([v.max(1), v / 2 + 60, 255 - v])
        })
    }

    fn raw(id: &str, off_nadir: f64, azimuth: f64, image: RgbImage) -> RawCandidate {
        RawCandidate {
            id: id.to_string(),
            off_nadir_angle: Some(off_nadir),
            sat_azimuth: Some(azimuth),
            platform: Some("WV03".to_string()),
            acquired: Some("2016-06-22T16:30:49Z".to_string()),
            image,
        }
    }

    #[test]
    fn test_unusable_chips_never_reach_the_sequence() {
        let black = RgbImage::new(32, 32);
        let batch = vec![
            raw("good1", 5.0, 100.0, textured_image()),
            raw("black", 10.0, 101.0, black),
            raw("good2", 15.0, 102.0, textured_image()),
        ];

        let sequence = run(batch, &PipelineConfig::default()).expect("two good chips survive");
        let ids: Vec<&str> = sequence.frames.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, vec!["good1", "good2"]);
    }

    #[test]
    fn test_single_survivor_still_assembles() {
        let mut batch = Vec::new();
        batch.push(raw("only", 5.0, 100.0, textured_image()));
        for i in 0..4 {
            batch.push(raw(&format!("black{i}"), 10.0, 100.0, RgbImage::new(32, 32)));
        }

        let sequence = run(batch, &PipelineConfig::default()).unwrap();
        assert_eq!(sequence.len(), 1);
    }

    #[test]
    fn test_all_malformed_metadata_is_fatal() {
        let mut bad = raw("bad", 5.0, 100.0, textured_image());
        bad.acquired = None;
        let mut worse = raw("worse", 5.0, 100.0, textured_image());
        worse.sat_azimuth = None;

        let err = run(vec![bad, worse], &PipelineConfig::default()).unwrap_err();
        assert!(matches!(err, PipelineError::EmptySequence));
    }

    #[test]
    fn test_repeat_runs_produce_identical_order() {
        let make = || {
            vec![
                raw("a", 20.0, 100.0, textured_image()),
                raw("b", 5.0, 104.0, textured_image()),
                raw("c", 12.0, 99.0, textured_image()),
            ]
        };
        let first = run(make(), &PipelineConfig::default()).unwrap();
        let second = run(make(), &PipelineConfig::default()).unwrap();
        let order = |s: &Sequence| {
            s.frames
                .iter()
                .map(|f| f.id.clone())
                .collect::<Vec<String>>()
        };
        assert_eq!(order(&first), order(&second));
        assert_eq!(order(&first), vec!["b", "c", "a"]);
    }
}
