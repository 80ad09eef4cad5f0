//! Frame selection and ordering library for Landmark Gifr
//!
//! This crate turns a batch of downloaded satellite image chips into an
//! ordered, filtered, optionally date-stamped frame sequence ready for
//! GIF encoding.

pub mod annotate;
pub mod error;
pub mod metadata;
pub mod ordering;
pub mod pipeline;
pub mod quality;
pub mod sequence;

pub use annotate::AnnotateConfig;
pub use error::{MetadataError, PipelineError};
pub use metadata::{FrameCandidate, RawCandidate};
pub use ordering::{OrderResult, OrderingConfig, Strategy};
pub use pipeline::{run, PipelineConfig};
pub use quality::{QualityConfig, QualityVerdict};
pub use sequence::{Frame, Sequence};
