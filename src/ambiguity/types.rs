//! Ambiguity data model
//!
//! Typed ambiguity items with a closed kind enumeration and an explicit
//! detection site. Resolution application dispatches on `kind` + `site`
//! instead of parsing the item id, so ids are identity only.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ============================================================================
// Kind / severity / status
// ============================================================================

/// Closed enumeration of detectable ambiguity kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AmbiguityKind {
    /// Invalid or conflicting building-type value.
    BuildingType,
    /// Vague or out-of-range floor description.
    FloorDescription,
    /// Invalid secondary-use classification.
    UseClassification,
    /// Required document absent.
    DocumentMissing,
    /// Two project fields contradict each other.
    ConflictingData,
    /// Required field missing or null.
    IncompleteData,
}

/// How urgently an ambiguity must be clarified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    /// Blocks verification until resolved.
    Critical,
}

/// Lifecycle of an ambiguity item. Transitions are monotonic: an item never
/// returns to an earlier state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AmbiguityStatus {
    #[default]
    Detected,
    Resolving,
    Resolved,
    Failed,
}

impl AmbiguityStatus {
    fn rank(self) -> u8 {
        match self {
            AmbiguityStatus::Detected => 0,
            AmbiguityStatus::Resolving => 1,
            AmbiguityStatus::Resolved => 2,
            AmbiguityStatus::Failed => 2,
        }
    }

    /// Whether moving to `next` respects the monotonic lifecycle.
    pub fn can_transition_to(self, next: AmbiguityStatus) -> bool {
        next.rank() > self.rank()
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, AmbiguityStatus::Resolved | AmbiguityStatus::Failed)
    }
}

// ============================================================================
// Detection site
// ============================================================================

/// Where in the project record an ambiguity was detected. The site is what
/// lets a resolution be applied back without inspecting the item id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "site", rename_all = "snake_case")]
pub enum AmbiguitySite {
    /// The primary-use field.
    PrimaryUse,
    /// A primary + secondary use combination.
    UseCombination { secondary_use: String },
    /// The use_type of one secondary use.
    SecondaryUseType { index: usize },
    /// The floor list of one secondary use.
    SecondaryUseFloors {
        index: usize,
        /// The offending text entry, when one exists.
        #[serde(skip_serializing_if = "Option::is_none")]
        description: Option<String>,
    },
    /// The uploaded-files list.
    Files,
    /// A named top-level field.
    Field { name: String },
}

// ============================================================================
// Items and resolutions
// ============================================================================

/// A machine-usable candidate resolution offered as a quick-reply option.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateResolution {
    pub value: Value,
    pub description: String,
}

impl CandidateResolution {
    pub fn new(value: impl Into<Value>, description: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            description: description.into(),
        }
    }
}

/// A detected gap, contradiction or vagueness in project data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AmbiguityItem {
    /// Stable id derived from kind + detection site; unique per run.
    pub id: String,
    pub kind: AmbiguityKind,
    pub severity: Severity,
    pub title: String,
    pub description: String,
    /// Human-readable field path of the detection site.
    pub detected_in: String,
    #[serde(flatten)]
    pub site: AmbiguitySite,
    /// At least one clarifying question per item.
    pub suggested_questions: Vec<String>,
    /// Non-empty for closed-choice kinds (enum, floor, document).
    pub possible_resolutions: Vec<CandidateResolution>,
    pub detected_at: DateTime<Utc>,
    #[serde(default)]
    pub status: AmbiguityStatus,
}

impl AmbiguityItem {
    /// Whether the item is a yes/no confirmation rather than an open choice.
    pub fn is_confirmation(&self) -> bool {
        matches!(self.kind, AmbiguityKind::DocumentMissing)
            || matches!(self.site, AmbiguitySite::UseCombination { .. })
    }

    /// Move the status forward; ignored when the transition would regress.
    pub fn advance_status(&mut self, next: AmbiguityStatus) {
        if self.status.can_transition_to(next) {
            self.status = next;
        }
    }
}

/// Who produced a resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolvedBy {
    /// The end user answered a clarifying question.
    User,
    /// The inference fallback suggested a value that re-validated.
    Inferred,
    /// A default candidate was applied after retries were exhausted.
    Default,
}

/// The immutable record of a resolved ambiguity. Applying one of these back
/// onto the project is the only sanctioned project mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolutionRecord {
    pub ambiguity_id: String,
    pub resolved_value: Value,
    /// Analyzer confidence in `[0, 1]`.
    pub confidence: f64,
    pub resolved_by: ResolvedBy,
    #[serde(default)]
    pub notes: String,
    pub resolved_at: DateTime<Utc>,
}

impl ResolutionRecord {
    pub fn new(
        ambiguity_id: impl Into<String>,
        resolved_value: impl Into<Value>,
        confidence: f64,
        resolved_by: ResolvedBy,
        notes: impl Into<String>,
    ) -> Self {
        Self {
            ambiguity_id: ambiguity_id.into(),
            resolved_value: resolved_value.into(),
            confidence: confidence.clamp(0.0, 1.0),
            resolved_by,
            notes: notes.into(),
            resolved_at: Utc::now(),
        }
    }
}
