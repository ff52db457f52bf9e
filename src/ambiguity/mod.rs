//! Ambiguity detection and resolution projection
//!
//! The detector is a pure scan over the typed project record; resolution
//! records are projected back through `AmbiguityDetector::apply_resolution`.

pub mod detector;
pub mod patterns;
pub mod types;

pub use detector::AmbiguityDetector;
pub use types::{
    AmbiguityItem, AmbiguityKind, AmbiguitySite, AmbiguityStatus, CandidateResolution,
    ResolutionRecord, ResolvedBy, Severity,
};
