//! Madrid building-compliance engine
//!
//! Disambiguation-and-compliance core for Madrid building projects: a floor
//! description resolver, a multi-strategy ambiguity detector, a guided
//! conversational resolution session, and a condition/action rule engine
//! feeding a compliance verifier.
//!
//! Data flow: project record → [`ambiguity::AmbiguityDetector`] → (if
//! ambiguities) [`session::SessionEngine`] loop → resolved project record →
//! [`verify::ComplianceVerifier`] → [`rules::RuleEngine`] per applicable
//! rule → [`verify::VerificationResult`].

pub mod ambiguity;
pub mod config;
pub mod error;
pub mod floors;
pub mod project;
pub mod rules;
pub mod session;
pub mod verify;

pub use ambiguity::{AmbiguityDetector, AmbiguityItem, AmbiguityKind, Severity};
pub use config::EngineConfig;
pub use error::{EngineError, EngineResult};
pub use floors::FloorResolver;
pub use project::{BuildingUse, Project};
pub use rules::{RuleCatalog, RuleEngine};
pub use session::{DisambiguationSession, SessionEngine, SessionRegistry, SessionState};
pub use verify::{ComplianceVerifier, StaticNormativeProvider, VerificationResult};
