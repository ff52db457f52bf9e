//! Verification data model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ambiguity::Severity;
use crate::verify::normative::NormativeReference;

/// Status of one verification item (or the aggregate verdict).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    Compliant,
    NonCompliant,
    Partial,
    Pending,
    Error,
}

/// Which check routine an item runs. Dispatch is on this closed enum; item
/// ids are identity only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckCategory {
    Height,
    Surface,
    Accessibility,
    FireSafety,
    Ventilation,
    /// No automated routine; requires manual review.
    Generic,
}

/// One verification check tied to its normative references.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationItem {
    pub item_id: String,
    pub title: String,
    pub description: String,
    pub category: CheckCategory,
    pub status: VerificationStatus,
    pub severity: Severity,
    #[serde(default)]
    pub normative_references: Vec<NormativeReference>,
    #[serde(default)]
    pub notes: Vec<String>,
}

/// Aggregate verdict for one verification run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationResult {
    pub project_id: String,
    pub verification_id: String,
    pub overall_status: VerificationStatus,
    pub compliance_percentage: f64,
    pub total_items: usize,
    pub compliant_items: usize,
    pub non_compliant_items: usize,
    pub partial_items: usize,
    pub error_items: usize,
    pub items: Vec<VerificationItem>,
    pub summary: String,
    pub completed_at: DateTime<Utc>,
}

/// Aggregation rule: any error dominates, then non-compliant, then partial;
/// compliant only when every item is compliant; otherwise pending.
pub fn aggregate_status(items: &[VerificationItem]) -> VerificationStatus {
    let any = |status: VerificationStatus| items.iter().any(|i| i.status == status);
    if any(VerificationStatus::Error) {
        VerificationStatus::Error
    } else if any(VerificationStatus::NonCompliant) {
        VerificationStatus::NonCompliant
    } else if any(VerificationStatus::Partial) {
        VerificationStatus::Partial
    } else if !items.is_empty()
        && items
            .iter()
            .all(|i| i.status == VerificationStatus::Compliant)
    {
        VerificationStatus::Compliant
    } else {
        VerificationStatus::Pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(status: VerificationStatus) -> VerificationItem {
        VerificationItem {
            item_id: "t".to_string(),
            title: String::new(),
            description: String::new(),
            category: CheckCategory::Generic,
            status,
            severity: Severity::Medium,
            normative_references: vec![],
            notes: vec![],
        }
    }

    #[test]
    fn test_aggregation_precedence() {
        use VerificationStatus::*;
        assert_eq!(aggregate_status(&[item(Compliant), item(Error)]), Error);
        assert_eq!(
            aggregate_status(&[item(Compliant), item(NonCompliant), item(Partial)]),
            NonCompliant
        );
        assert_eq!(aggregate_status(&[item(Compliant), item(Partial)]), Partial);
        assert_eq!(
            aggregate_status(&[item(Compliant), item(Compliant)]),
            Compliant
        );
        assert_eq!(aggregate_status(&[item(Compliant), item(Pending)]), Pending);
        assert_eq!(aggregate_status(&[]), Pending);
    }
}
