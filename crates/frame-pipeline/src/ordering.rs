//! Ordering strategies over normalized candidates
//!
//! Three ways to arrange the surviving chips into an animation:
//! flyover (narrow azimuth band, climbing off-nadir angle), panby
//! (near-constant off-nadir angle, sweeping azimuth) and date
//! (chronological). Flyover and panby bucket the candidates along one
//! angular dimension, keep the most populous bucket, and sort along the
//! other dimension.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::UnknownStrategy;
use crate::metadata::FrameCandidate;

/// Default azimuth bucket width in degrees: six sextants over the compass.
pub const DEFAULT_AZIMUTH_BUCKET_WIDTH: f64 = 60.0;

/// Default off-nadir bucket width in degrees: six bins over [0, 90].
pub const DEFAULT_OFF_NADIR_BUCKET_WIDTH: f64 = 15.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Similar azimuth, ordered by off-nadir angle. Recommended for tall
    /// structures; approximates a continuous virtual flyover.
    #[default]
    Flyover,
    /// Similar off-nadir angle, ordered by azimuth: an apparent pan past
    /// the scene at roughly constant viewing elevation.
    Panby,
    /// Ordered by capture date, for construction or seasonal change.
    Date,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::Flyover => write!(f, "flyover"),
            Strategy::Panby => write!(f, "panby"),
            Strategy::Date => write!(f, "date"),
        }
    }
}

impl FromStr for Strategy {
    type Err = UnknownStrategy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "flyover" => Ok(Strategy::Flyover),
            "panby" => Ok(Strategy::Panby),
            "date" => Ok(Strategy::Date),
            other => Err(UnknownStrategy(other.to_string())),
        }
    }
}

/// Grouping and trimming knobs for the angular strategies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderingConfig {
    /// Azimuth bucket width in degrees. `None` widens adaptively from
    /// [`DEFAULT_AZIMUTH_BUCKET_WIDTH`] until a bucket holds two frames.
    pub azimuth_bucket_width: Option<f64>,
    /// Off-nadir bucket width in degrees. `None` widens adaptively from
    /// [`DEFAULT_OFF_NADIR_BUCKET_WIDTH`].
    pub off_nadir_bucket_width: Option<f64>,
    /// Above this many frames the platform preference trim kicks in.
    pub max_frames: usize,
    /// A platform restriction only applies if at least this many frames
    /// would survive it.
    pub min_trimmed: usize,
    /// Platforms to prefer when trimming, best first.
    pub preferred_platforms: Vec<String>,
}

impl Default for OrderingConfig {
    fn default() -> Self {
        Self {
            azimuth_bucket_width: None,
            off_nadir_bucket_width: None,
            max_frames: 10,
            min_trimmed: 5,
            preferred_platforms: vec!["WV03".to_string(), "WV02".to_string()],
        }
    }
}

/// Ordered frames plus the degenerate-run signal. `insufficient` is set when
/// fewer than two frames remain; the caller decides whether a one-frame GIF
/// is still worth encoding.
#[derive(Debug, Clone)]
pub struct OrderResult {
    pub frames: Vec<FrameCandidate>,
    pub insufficient: bool,
}

/// Arrange candidates under the selected strategy. Ties at every level are
/// broken on the chip id, so repeat runs over the same batch produce the
/// same sequence.
pub fn order(
    candidates: Vec<FrameCandidate>,
    strategy: Strategy,
    config: &OrderingConfig,
) -> OrderResult {
    let frames = match strategy {
        Strategy::Flyover => {
            let group = select_largest_group(
                candidates,
                config.azimuth_bucket_width,
                DEFAULT_AZIMUTH_BUCKET_WIDTH,
                360.0,
                |c| c.sat_azimuth,
                |c| c.off_nadir_angle,
            );
            let mut group = trim_preferred_platforms(group, config);
            sort_by_angle(&mut group, |c| c.off_nadir_angle);
            group
        }
        Strategy::Panby => {
            let group = select_largest_group(
                candidates,
                config.off_nadir_bucket_width,
                DEFAULT_OFF_NADIR_BUCKET_WIDTH,
                90.0,
                |c| c.off_nadir_angle,
                |c| c.sat_azimuth,
            );
            let mut group = trim_preferred_platforms(group, config);
            sort_by_angle(&mut group, |c| c.sat_azimuth);
            group
        }
        Strategy::Date => {
            let mut frames = candidates;
            frames.sort_by(|a, b| a.acquired.cmp(&b.acquired).then_with(|| a.id.cmp(&b.id)));
            frames
        }
    };

    let insufficient = frames.len() < 2;
    debug!(
        "using the {} best chips for {} order method",
        frames.len(),
        strategy
    );
    OrderResult {
        frames,
        insufficient,
    }
}

/// Bucket candidates along `key` and keep the most populous bucket. Ties go
/// to the bucket with the lowest mean `tie_metric`, then the lowest bucket
/// index.
fn select_largest_group(
    candidates: Vec<FrameCandidate>,
    explicit_width: Option<f64>,
    default_width: f64,
    range: f64,
    key: impl Fn(&FrameCandidate) -> f64,
    tie_metric: impl Fn(&FrameCandidate) -> f64,
) -> Vec<FrameCandidate> {
    if candidates.len() < 2 {
        return candidates;
    }

    let width =
        explicit_width.unwrap_or_else(|| adaptive_width(&candidates, &key, default_width, range));

    let mut buckets: HashMap<i64, Vec<FrameCandidate>> = HashMap::new();
    for candidate in candidates {
        let bucket = (key(&candidate) / width).floor() as i64;
        buckets.entry(bucket).or_default().push(candidate);
    }

    let mut entries: Vec<(i64, Vec<FrameCandidate>)> = buckets.into_iter().collect();
    entries.sort_by(|(index_a, group_a), (index_b, group_b)| {
        group_b
            .len()
            .cmp(&group_a.len())
            .then_with(|| {
                mean(group_a, &tie_metric)
                    .partial_cmp(&mean(group_b, &tie_metric))
                    .unwrap_or(Ordering::Equal)
            })
            .then_with(|| index_a.cmp(index_b))
    });

    let (bucket, group) = entries.into_iter().next().expect("candidates not empty");
    debug!(
        "bucket {} (width {width}°) wins with {} of the candidates",
        bucket,
        group.len()
    );
    group
}

/// Widen from the default until some bucket holds at least two members, or
/// one bucket spans the whole range. Keeps the grouping coherent even when
/// the input is spread thin across the angular dimension.
fn adaptive_width(
    candidates: &[FrameCandidate],
    key: &impl Fn(&FrameCandidate) -> f64,
    default_width: f64,
    range: f64,
) -> f64 {
    let mut width = default_width;
    while width < range {
        let mut counts: HashMap<i64, usize> = HashMap::new();
        for candidate in candidates {
            *counts
                .entry((key(candidate) / width).floor() as i64)
                .or_default() += 1;
        }
        if counts.values().any(|&count| count >= 2) {
            return width;
        }
        width *= 2.0;
    }
    range
}

/// When the chosen group is still large, prefer the high-resolution
/// platforms: first any preferred platform, then the best one alone. A
/// restriction only applies if enough frames survive it.
fn trim_preferred_platforms(
    mut frames: Vec<FrameCandidate>,
    config: &OrderingConfig,
) -> Vec<FrameCandidate> {
    if config.preferred_platforms.is_empty() {
        return frames;
    }

    if frames.len() > config.max_frames {
        let kept: Vec<FrameCandidate> = frames
            .iter()
            .filter(|c| {
                c.platform
                    .as_deref()
                    .is_some_and(|p| config.preferred_platforms.iter().any(|wanted| wanted == p))
            })
            .cloned()
            .collect();
        if kept.len() >= config.min_trimmed {
            frames = kept;
        }
    }

    if frames.len() > config.max_frames {
        let best = config.preferred_platforms[0].as_str();
        let kept: Vec<FrameCandidate> = frames
            .iter()
            .filter(|c| c.platform.as_deref() == Some(best))
            .cloned()
            .collect();
        if kept.len() >= config.min_trimmed {
            frames = kept;
        }
    }

    frames
}

fn sort_by_angle(frames: &mut [FrameCandidate], key: impl Fn(&FrameCandidate) -> f64) {
    frames.sort_by(|a, b| {
        key(a)
            .partial_cmp(&key(b))
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.id.cmp(&b.id))
    });
}

fn mean(frames: &[FrameCandidate], metric: &impl Fn(&FrameCandidate) -> f64) -> f64 {
    if frames.is_empty() {
        return 0.0;
    }
    frames.iter().map(metric).sum::<f64>() / frames.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use image::RgbImage;

    fn candidate(id: &str, off_nadir: f64, azimuth: f64, timestamp_secs: i64) -> FrameCandidate {
        FrameCandidate {
            id: id.to_string(),
            off_nadir_angle: off_nadir,
            sat_azimuth: azimuth,
            platform: None,
            acquired: Utc.timestamp_opt(timestamp_secs, 0).unwrap(),
            image: RgbImage::new(1, 1),
        }
    }

    fn ids(result: &OrderResult) -> Vec<&str> {
        result.frames.iter().map(|f| f.id.as_str()).collect()
    }

    #[test]
    fn test_strategy_parsing() {
        assert_eq!("flyover".parse::<Strategy>().unwrap(), Strategy::Flyover);
        assert_eq!("PANBY".parse::<Strategy>().unwrap(), Strategy::Panby);
        assert_eq!("date".parse::<Strategy>().unwrap(), Strategy::Date);
        assert!("seasons".parse::<Strategy>().is_err());
        assert_eq!(Strategy::default(), Strategy::Flyover);
    }

    #[test]
    fn test_flyover_keeps_largest_azimuth_bucket_sorted_by_off_nadir() {
        // Six chips near azimuth 100, four near azimuth 200.
        let angles_a = [5.0, 12.0, 8.0, 20.0, 3.0, 15.0];
        let mut candidates: Vec<FrameCandidate> = angles_a
            .iter()
            .enumerate()
            .map(|(i, &angle)| candidate(&format!("a{i}"), angle, 100.0 + i as f64, 1000))
            .collect();
        for i in 0..4 {
            candidates.push(candidate(&format!("b{i}"), 30.0, 200.0 + i as f64, 1000));
        }

        let result = order(candidates, Strategy::Flyover, &OrderingConfig::default());
        assert_eq!(result.frames.len(), 6);
        assert!(!result.insufficient);
        let off_nadirs: Vec<f64> = result.frames.iter().map(|f| f.off_nadir_angle).collect();
        assert_eq!(off_nadirs, vec![3.0, 5.0, 8.0, 12.0, 15.0, 20.0]);
        assert!(result.frames.iter().all(|f| f.sat_azimuth < 120.0));
    }

    #[test]
    fn test_flyover_bucket_tie_breaks_on_lowest_mean_off_nadir() {
        let candidates = vec![
            // Bucket around azimuth 70: off-nadir mean 40
            candidate("high1", 35.0, 70.0, 0),
            candidate("high2", 45.0, 75.0, 0),
            // Bucket around azimuth 130: off-nadir mean 10
            candidate("low1", 5.0, 130.0, 0),
            candidate("low2", 15.0, 135.0, 0),
        ];
        let result = order(candidates, Strategy::Flyover, &OrderingConfig::default());
        assert_eq!(ids(&result), vec!["low1", "low2"]);
    }

    #[test]
    fn test_panby_sorts_chosen_bucket_by_azimuth() {
        let candidates = vec![
            candidate("c", 10.0, 300.0, 0),
            candidate("a", 12.0, 40.0, 0),
            candidate("b", 11.0, 170.0, 0),
            // Different off-nadir bucket, alone, so it loses.
            candidate("d", 80.0, 10.0, 0),
        ];
        let result = order(candidates, Strategy::Panby, &OrderingConfig::default());
        assert_eq!(ids(&result), vec!["a", "b", "c"]);
        let azimuths: Vec<f64> = result.frames.iter().map(|f| f.sat_azimuth).collect();
        assert!(azimuths.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_date_orders_chronologically_without_grouping() {
        let candidates = vec![
            candidate("late", 50.0, 10.0, 3000),
            candidate("early", 5.0, 350.0, 1000),
            candidate("mid", 85.0, 180.0, 2000),
        ];
        let result = order(candidates, Strategy::Date, &OrderingConfig::default());
        assert_eq!(ids(&result), vec!["early", "mid", "late"]);
    }

    #[test]
    fn test_fewer_than_two_frames_signals_insufficient() {
        let result = order(
            vec![candidate("only", 10.0, 100.0, 0)],
            Strategy::Flyover,
            &OrderingConfig::default(),
        );
        assert_eq!(result.frames.len(), 1);
        assert!(result.insufficient);

        let empty = order(Vec::new(), Strategy::Date, &OrderingConfig::default());
        assert!(empty.frames.is_empty());
        assert!(empty.insufficient);
    }

    #[test]
    fn test_identical_azimuths_collapse_to_one_group() {
        let candidates: Vec<FrameCandidate> = (0..5)
            .map(|i| candidate(&format!("c{i}"), i as f64 * 7.0, 123.4, 0))
            .collect();
        let result = order(candidates, Strategy::Flyover, &OrderingConfig::default());
        assert_eq!(result.frames.len(), 5);
    }

    #[test]
    fn test_adaptive_width_widens_until_a_pair_groups() {
        // 10° and 350° share no bucket until the width covers the full
        // compass, at which point both survive as one group.
        let candidates = vec![
            candidate("west", 5.0, 350.0, 0),
            candidate("east", 10.0, 10.0, 0),
        ];
        let result = order(candidates, Strategy::Flyover, &OrderingConfig::default());
        assert_eq!(result.frames.len(), 2);
    }

    #[test]
    fn test_explicit_bucket_width_is_honored() {
        let config = OrderingConfig {
            azimuth_bucket_width: Some(10.0),
            ..OrderingConfig::default()
        };
        let candidates = vec![
            candidate("a", 1.0, 12.0, 0),
            candidate("b", 2.0, 14.0, 0),
            candidate("c", 3.0, 55.0, 0),
        ];
        let result = order(candidates, Strategy::Flyover, &config);
        assert_eq!(ids(&result), vec!["a", "b"]);
    }

    #[test]
    fn test_platform_trim_prefers_high_resolution_sensors() {
        let mut candidates = Vec::new();
        for i in 0..8 {
            let mut c = candidate(&format!("wv{i}"), i as f64, 100.0, 0);
            c.platform = Some("WV03".to_string());
            candidates.push(c);
        }
        for i in 0..4 {
            let mut c = candidate(&format!("ge{i}"), 50.0 + i as f64, 101.0, 0);
            c.platform = Some("GE01".to_string());
            candidates.push(c);
        }

        let result = order(candidates, Strategy::Flyover, &OrderingConfig::default());
        assert_eq!(result.frames.len(), 8);
        assert!(result
            .frames
            .iter()
            .all(|f| f.platform.as_deref() == Some("WV03")));
    }

    #[test]
    fn test_platform_trim_never_drops_below_minimum() {
        // Only 3 preferred frames: the restriction would leave fewer than
        // min_trimmed, so nothing is trimmed.
        let mut candidates = Vec::new();
        for i in 0..3 {
            let mut c = candidate(&format!("wv{i}"), i as f64, 100.0, 0);
            c.platform = Some("WV02".to_string());
            candidates.push(c);
        }
        for i in 0..9 {
            let mut c = candidate(&format!("qb{i}"), 10.0 + i as f64, 101.0, 0);
            c.platform = Some("QB02".to_string());
            candidates.push(c);
        }

        let result = order(candidates, Strategy::Flyover, &OrderingConfig::default());
        assert_eq!(result.frames.len(), 12);
    }

    #[test]
    fn test_ordering_is_deterministic() {
        let make = || {
            vec![
                candidate("a", 10.0, 100.0, 5),
                candidate("b", 10.0, 100.0, 5),
                candidate("c", 20.0, 105.0, 3),
                candidate("d", 15.0, 230.0, 9),
            ]
        };
        let first = order(make(), Strategy::Flyover, &OrderingConfig::default());
        let second = order(make(), Strategy::Flyover, &OrderingConfig::default());
        assert_eq!(ids(&first), ids(&second));
    }
}
