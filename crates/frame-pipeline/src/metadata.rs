//! Candidate metadata normalization for Landmark Gifr
//!
//! Provider metadata arrives as optional fields straight off the catalog
//! record; this module validates them into uniform records the ordering
//! engine can rely on. Malformed candidates are dropped, never fatal.

use chrono::{DateTime, Utc};
use image::RgbImage;
use tracing::{info, warn};

use crate::error::MetadataError;

/// A downloaded chip plus the provider-native metadata it was cataloged
/// with. Fields are optional because the provider omits them on some
/// sensor records.
#[derive(Debug, Clone)]
pub struct RawCandidate {
    pub id: String,
    pub off_nadir_angle: Option<f64>,
    pub sat_azimuth: Option<f64>,
    pub platform: Option<String>,
    /// Acquisition date as the provider reports it (RFC 3339).
    pub acquired: Option<String>,
    pub image: RgbImage,
}

/// A normalized candidate: required fields present, angles in physical
/// range. Immutable for the rest of the run; annotation copies the pixel
/// buffer rather than mutating it.
#[derive(Debug, Clone)]
pub struct FrameCandidate {
    pub id: String,
    /// Off-nadir angle in degrees, within [0, 90].
    pub off_nadir_angle: f64,
    /// Satellite azimuth in degrees, within [0, 360).
    pub sat_azimuth: f64,
    pub platform: Option<String>,
    pub acquired: DateTime<Utc>,
    pub image: RgbImage,
}

/// Validate one raw candidate into a uniform record.
pub fn normalize(raw: RawCandidate) -> Result<FrameCandidate, MetadataError> {
    let off_nadir_angle = raw
        .off_nadir_angle
        .ok_or(MetadataError::MissingField("offNadirAngle"))?;
    if !(0.0..=90.0).contains(&off_nadir_angle) {
        return Err(MetadataError::OutOfRange {
            field: "offNadirAngle",
            value: off_nadir_angle,
            range: "[0, 90]",
        });
    }

    let sat_azimuth = raw
        .sat_azimuth
        .ok_or(MetadataError::MissingField("satAzimuth"))?;
    if !(0.0..360.0).contains(&sat_azimuth) {
        return Err(MetadataError::OutOfRange {
            field: "satAzimuth",
            value: sat_azimuth,
            range: "[0, 360)",
        });
    }

    let acquired_raw = raw
        .acquired
        .ok_or(MetadataError::MissingField("acquisitionDate"))?;
    let acquired = DateTime::parse_from_rfc3339(&acquired_raw)
        .map_err(|_| MetadataError::BadTimestamp(acquired_raw.clone()))?
        .with_timezone(&Utc);

    Ok(FrameCandidate {
        id: raw.id,
        off_nadir_angle,
        sat_azimuth,
        platform: raw.platform,
        acquired,
        image: raw.image,
    })
}

/// Normalize a whole batch, dropping malformed candidates with a warning.
pub fn normalize_batch(raw: Vec<RawCandidate>) -> Vec<FrameCandidate> {
    let total = raw.len();
    let mut normalized = Vec::with_capacity(total);
    for candidate in raw {
        let id = candidate.id.clone();
        match normalize(candidate) {
            Ok(frame) => normalized.push(frame),
            Err(e) => warn!("dropping candidate {id}: {e}"),
        }
    }
    if normalized.len() < total {
        info!(
            "{} of {} candidates had usable metadata",
            normalized.len(),
            total
        );
    }
    normalized
}
