//! Artifact image ingestion and media pipeline.
//!
//! Covers the upload path (signature verification, classification,
//! derivative synthesis, layer extraction), the annotation store with
//! optional encryption at rest, the protected export/import subsystem, and
//! the timelapse frame recorder.

pub mod annotations;
pub mod derivative;
pub mod error;
pub mod fsio;
pub mod ingest;
pub mod layers;
pub mod protect;
pub mod rasterize;
pub mod timelapse;

pub use annotations::AnnotationStore;
pub use error::PipelineError;
