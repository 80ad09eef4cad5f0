//! Catalog search and multispectral/panchromatic pairing
//!
//! The catalog is queried with a point-polygon WKT search. When the result
//! set is unwieldy the cloud-cover filter tightens progressively before the
//! records are paired by vendor dataset identifier.

use std::collections::HashMap;

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

const DEFAULT_CATALOG_URL: &str = "https://geobigdata.io";
const DEFAULT_CHIP_URL: &str = "http://idaho.geobigdata.io";

/// Result counts above this trigger a tighter search.
const MAX_RESULTS: usize = 50;

/// One raw catalog record as the provider returns it.
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogRecord {
    pub identifier: String,
    pub properties: CatalogProperties,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogProperties {
    pub vendor_dataset_identifier: String,
    pub sensor_name: Option<String>,
    pub off_nadir_angle: Option<f64>,
    pub sat_azimuth: Option<f64>,
    pub sensor_platform_name: Option<String>,
    pub acquisition_date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    results: Vec<CatalogRecord>,
}

/// A multispectral chip id paired with its panchromatic partner, carrying
/// the ordering metadata the frame pipeline needs.
#[derive(Debug, Clone)]
pub struct ImagePair {
    pub multi_id: String,
    pub pan_id: String,
    pub off_nadir_angle: Option<f64>,
    pub sat_azimuth: Option<f64>,
    pub platform: Option<String>,
    pub acquired: Option<String>,
}

/// Authenticated client for the provider's catalog and chip services. The
/// token is read once at startup and held here; nothing global.
pub struct GbdxClient {
    pub(crate) http: reqwest::Client,
    catalog_url: String,
    pub(crate) chip_url: String,
    pub(crate) token: String,
}

impl GbdxClient {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            catalog_url: DEFAULT_CATALOG_URL.to_string(),
            chip_url: DEFAULT_CHIP_URL.to_string(),
            token: token.into(),
        }
    }

    pub fn with_catalog_url(mut self, url: impl Into<String>) -> Self {
        self.catalog_url = url.into();
        self
    }

    pub fn with_chip_url(mut self, url: impl Into<String>) -> Self {
        self.chip_url = url.into();
        self
    }

    /// Search the catalog for imagery covering a point, tightening the
    /// cloud-cover filter while the result set stays above [`MAX_RESULTS`].
    pub async fn search(&self, lat: f64, lon: f64) -> Result<Vec<CatalogRecord>> {
        let mut results = self
            .search_with_filters(lat, lon, &["cloudCover < 80"])
            .await?;
        if results.is_empty() {
            bail!("no catalog results found for {lat}, {lon}");
        }

        if results.len() > MAX_RESULTS {
            results = self
                .search_with_filters(lat, lon, &["cloudCover < 50"])
                .await?;
        }
        if results.len() > MAX_RESULTS {
            results = self
                .search_with_filters(
                    lat,
                    lon,
                    &["cloudCover < 20", "sensorPlatformName = 'WV03'"],
                )
                .await?;
        }

        debug!("catalog search returned {} records", results.len());
        Ok(results)
    }

    async fn search_with_filters(
        &self,
        lat: f64,
        lon: f64,
        filters: &[&str],
    ) -> Result<Vec<CatalogRecord>> {
        let point = format!("{lon} {lat}");
        let body = json!({
            "searchAreaWkt": format!("POLYGON (({point}, {point}, {point}, {point}, {point}))"),
            "filters": filters,
            "types": ["IDAHOImage"],
        });

        let response = self
            .http
            .post(format!("{}/catalog/v1/search", self.catalog_url))
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await
            .context("catalog search request failed")?
            .error_for_status()
            .context("catalog search rejected")?;

        let parsed: SearchResponse = response
            .json()
            .await
            .context("malformed catalog response")?;
        Ok(parsed.results)
    }
}

/// Pair multispectral and panchromatic records that share a vendor dataset
/// identifier. The multispectral side carries the ordering metadata; any
/// non-pan sensor (4 band or 8 band) fills it. Records without a complete
/// pair are dropped.
pub fn pair_records(records: &[CatalogRecord]) -> Vec<ImagePair> {
    #[derive(Default)]
    struct Partial {
        multi_id: Option<String>,
        pan_id: Option<String>,
        off_nadir_angle: Option<f64>,
        sat_azimuth: Option<f64>,
        platform: Option<String>,
        acquired: Option<String>,
    }

    let mut partials: HashMap<String, Partial> = HashMap::new();
    for record in records {
        let slot = partials
            .entry(record.properties.vendor_dataset_identifier.clone())
            .or_default();
        if record.properties.sensor_name.as_deref() == Some("Panchromatic") {
            slot.pan_id = Some(record.identifier.clone());
        } else {
            slot.multi_id = Some(record.identifier.clone());
            slot.off_nadir_angle = record.properties.off_nadir_angle;
            slot.sat_azimuth = record.properties.sat_azimuth;
            slot.platform = record.properties.sensor_platform_name.clone();
            slot.acquired = record.properties.acquisition_date.clone();
        }
    }

    let mut pairs: Vec<ImagePair> = partials
        .into_values()
        .filter_map(|partial| match (partial.multi_id, partial.pan_id) {
            (Some(multi_id), Some(pan_id)) => Some(ImagePair {
                multi_id,
                pan_id,
                off_nadir_angle: partial.off_nadir_angle,
                sat_azimuth: partial.sat_azimuth,
                platform: partial.platform,
                acquired: partial.acquired,
            }),
            _ => None,
        })
        .collect();
    // HashMap iteration order is arbitrary; keep the pair list stable.
    pairs.sort_by(|a, b| a.multi_id.cmp(&b.multi_id));

    info!("collected {} image pairs", pairs.len());
    pairs
}
