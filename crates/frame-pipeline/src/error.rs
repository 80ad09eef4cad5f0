//! Error taxonomy for the frame pipeline

use thiserror::Error;

/// Per-candidate metadata failures. The batch normalizer absorbs these:
/// the candidate is dropped with a warning and the run continues.
#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("missing required field `{0}`")]
    MissingField(&'static str),

    #[error("{field} = {value} is outside the physical range {range}")]
    OutOfRange {
        field: &'static str,
        value: f64,
        range: &'static str,
    },

    #[error("unparseable acquisition date `{0}`")]
    BadTimestamp(String),
}

/// Run-level failures. An empty sequence is the one fatal condition the
/// pipeline produces; everything else degrades with a warning.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("no frames survived filtering and assembly; nothing to encode")]
    EmptySequence,
}

/// Returned when an `--order` value does not name a known strategy.
#[derive(Debug, Error)]
#[error("unknown order method `{0}`; valid options: flyover, panby, date")]
pub struct UnknownStrategy(pub String);
