//! GBDX catalog search and IDAHO chip retrieval for Landmark Gifr
//!
//! Everything that talks to the imagery provider lives here: searching the
//! catalog around a point, pairing multispectral records with their
//! panchromatic partners, and downloading the pan-sharpened chips the frame
//! pipeline consumes.

pub mod catalog;
pub mod chip;

pub use catalog::{pair_records, CatalogRecord, GbdxClient, ImagePair};
pub use chip::ChipRequest;
