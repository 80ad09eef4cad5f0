//! Pan-sharpened chip download
//!
//! Fetches centroid chips from the IDAHO TMS chipper and decodes them into
//! the raw candidates the frame pipeline consumes. Downloads run with
//! bounded concurrency; a failed chip is skipped, never fatal.

use anyhow::{Context, Result};
use frame_pipeline::RawCandidate;
use futures::{stream, StreamExt};
use tracing::{info, warn};

use crate::catalog::{GbdxClient, ImagePair};

const IDAHO_BUCKET: &str = "idaho-images";
const CHIP_CONCURRENCY: usize = 4;

/// Where and how big to cut each chip.
#[derive(Debug, Clone, Copy)]
pub struct ChipRequest {
    pub lat: f64,
    pub lon: f64,
    /// Square chip edge in pixels.
    pub width: u32,
    /// Ground resolution in meters per pixel.
    pub resolution: f64,
}

impl GbdxClient {
    /// Download one pan-sharpened chip centered on the request point and
    /// decode it into a raw candidate.
    pub async fn fetch_chip(
        &self,
        pair: &ImagePair,
        request: &ChipRequest,
    ) -> Result<RawCandidate> {
        let url = format!(
            "{base}/v1/chip/centroid/{bucket}/{multi}",
            base = self.chip_url,
            bucket = IDAHO_BUCKET,
            multi = pair.multi_id,
        );

        let response = self
            .http
            .get(&url)
            .query(&[
                ("lat", request.lat.to_string()),
                ("long", request.lon.to_string()),
                ("panId", pair.pan_id.clone()),
                ("bands", "2,1,0".to_string()),
                ("doDRA", "true".to_string()),
                ("brightness", "1".to_string()),
                ("width", request.width.to_string()),
                ("height", request.width.to_string()),
                ("resolution", request.resolution.to_string()),
                ("token", self.token.clone()),
            ])
            .send()
            .await
            .with_context(|| format!("chip request failed for {}", pair.multi_id))?
            .error_for_status()
            .with_context(|| format!("chip request rejected for {}", pair.multi_id))?;

        let bytes = response
            .bytes()
            .await
            .with_context(|| format!("chip download interrupted for {}", pair.multi_id))?;
        let image = image::load_from_memory(&bytes)
            .with_context(|| format!("could not decode chip {}", pair.multi_id))?
            .to_rgb8();

        info!("got chip {}", pair.multi_id);
        Ok(RawCandidate {
            id: pair.multi_id.clone(),
            off_nadir_angle: pair.off_nadir_angle,
            sat_azimuth: pair.sat_azimuth,
            platform: pair.platform.clone(),
            acquired: pair.acquired.clone(),
            image,
        })
    }

    /// Fetch every pair with bounded concurrency, preserving catalog order
    /// in the returned batch. Failed downloads are skipped with a warning.
    pub async fn fetch_all(&self, pairs: &[ImagePair], request: &ChipRequest) -> Vec<RawCandidate> {
        let total = pairs.len();
        let mut fetched: Vec<(usize, Result<RawCandidate>)> =
            stream::iter(pairs.iter().enumerate())
                .map(|(index, pair)| async move {
                    info!("getting chip {} of {}", index + 1, total);
                    (index, self.fetch_chip(pair, request).await)
                })
                .buffer_unordered(CHIP_CONCURRENCY)
                .collect()
                .await;
        fetched.sort_by_key(|(index, _)| *index);

        let mut candidates = Vec::with_capacity(total);
        for (_, result) in fetched {
            match result {
                Ok(candidate) => candidates.push(candidate),
                Err(e) => warn!("skipping chip: {e:#}"),
            }
        }
        info!("{} of {} chips downloaded", candidates.len(), total);
        candidates
    }
}
