//! Rule data model
//!
//! Rules are immutable value objects loaded once at startup. Conditions are
//! requirements: a rule passes only when every condition holds against the
//! evaluation context. Preconditions gate applicability instead, so "ramps
//! must not exceed 8% slope" only runs against projects that declare a ramp.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ambiguity::Severity;

/// Thematic category of a rule, used for grouping and reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleKind {
    FireSafety,
    Accessibility,
    EnergyEfficiency,
    Material,
    Structural,
    Installation,
}

/// Comparison operators available to rule conditions.
///
/// Ordering and range operators coerce both operands to numbers and raise
/// `RuleError::InvalidComparison` when coercion fails; the engine downgrades
/// that to a failed condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    Equals,
    NotEquals,
    GreaterThan,
    LessThan,
    GreaterEqual,
    LessEqual,
    Contains,
    NotContains,
    In,
    NotIn,
    InRange,
    NotInRange,
}

impl Operator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Equals => "equals",
            Operator::NotEquals => "not_equals",
            Operator::GreaterThan => "greater_than",
            Operator::LessThan => "less_than",
            Operator::GreaterEqual => "greater_equal",
            Operator::LessEqual => "less_equal",
            Operator::Contains => "contains",
            Operator::NotContains => "not_contains",
            Operator::In => "in",
            Operator::NotIn => "not_in",
            Operator::InRange => "in_range",
            Operator::NotInRange => "not_in_range",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single field requirement inside a rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    /// Dot-path into the evaluation context (`building.height`).
    pub field: String,
    pub operator: Operator,
    pub value: Value,
    /// Confidence contributed when the condition holds.
    #[serde(default = "default_confidence")]
    pub confidence: f64,
}

fn default_confidence() -> f64 {
    1.0
}

impl Condition {
    pub fn new(field: impl Into<String>, operator: Operator, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            operator,
            value: value.into(),
            confidence: 1.0,
        }
    }
}

/// An exact normative reference. Every violation action must carry one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    /// Normative document family (`DB-SU`, `Ordenanza de Ruido de Madrid`).
    pub document: String,
    /// Article or section inside the document.
    pub section: String,
}

impl Citation {
    pub fn new(document: impl Into<String>, section: impl Into<String>) -> Self {
        Self {
            document: document.into(),
            section: section.into(),
        }
    }

    pub fn is_complete(&self) -> bool {
        !self.document.trim().is_empty() && !self.section.trim().is_empty()
    }
}

impl fmt::Display for Citation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.document, self.section)
    }
}

/// What to surface when a rule is violated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    pub message: String,
    pub severity: Severity,
    pub citation: Citation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

impl Action {
    pub fn new(message: impl Into<String>, severity: Severity, citation: Citation) -> Self {
        Self {
            message: message.into(),
            severity,
            citation,
            suggestion: None,
        }
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }
}

/// A compliance rule: requirements plus the actions raised when they fail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub rule_id: String,
    pub name: String,
    pub description: String,
    pub kind: RuleKind,
    /// Applicability gate: all preconditions must hold for the rule to be
    /// evaluated at all. A project without a ramp is not in violation of the
    /// ramp-slope rule; it is simply out of scope.
    #[serde(default)]
    pub preconditions: Vec<Condition>,
    /// Requirements; the rule passes only when all of them hold.
    pub conditions: Vec<Condition>,
    pub actions: Vec<Action>,
    /// Building-use tags this rule applies to; `"general"` is a wildcard.
    pub applicable_uses: Vec<String>,
    /// Jurisdiction gate: only evaluated for Madrid projects when set.
    #[serde(default)]
    pub madrid_specific: bool,
    /// Lower evaluates first.
    #[serde(default = "default_priority")]
    pub priority: u32,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_priority() -> u32 {
    1
}

fn default_enabled() -> bool {
    true
}

impl Rule {
    /// Whether the rule covers the given building use.
    pub fn applies_to_use(&self, building_use: &str) -> bool {
        self.applicable_uses
            .iter()
            .any(|u| u == "general" || u == building_use)
    }
}

/// An issue raised by a violated rule, always carrying its citation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleIssue {
    pub message: String,
    pub severity: Severity,
    pub citation: Citation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

/// Outcome of evaluating one rule against one context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleEvaluationResult {
    pub rule_id: String,
    pub passed: bool,
    /// Product of per-condition confidences; a zero-confidence failure
    /// (missing field, invalid comparison) zeroes it.
    pub confidence: f64,
    pub violations: Vec<String>,
    pub suggestions: Vec<String>,
    /// Actions surfaced because the rule failed, each with its citation.
    pub issues: Vec<RuleIssue>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_operator_wire_names() {
        assert_eq!(
            serde_json::to_value(Operator::GreaterEqual).unwrap(),
            json!("greater_equal")
        );
        assert_eq!(
            serde_json::from_value::<Operator>(json!("not_in_range")).unwrap(),
            Operator::NotInRange
        );
    }

    #[test]
    fn test_citation_completeness() {
        assert!(Citation::new("DB-SU", "Artículo 2.1").is_complete());
        assert!(!Citation::new("", "Artículo 2.1").is_complete());
        assert!(!Citation::new("DB-SU", "  ").is_complete());
    }

    #[test]
    fn test_rule_applicability_by_use() {
        let rule = Rule {
            rule_id: "T-1".to_string(),
            name: String::new(),
            description: String::new(),
            kind: RuleKind::Accessibility,
            preconditions: vec![],
            conditions: vec![Condition::new("x", Operator::Equals, 1)],
            actions: vec![],
            applicable_uses: vec!["residencial".to_string()],
            madrid_specific: false,
            priority: 1,
            enabled: true,
        };
        assert!(rule.applies_to_use("residencial"));
        assert!(!rule.applies_to_use("industrial"));

        let general = Rule {
            applicable_uses: vec!["general".to_string()],
            ..rule
        };
        assert!(general.applies_to_use("industrial"));
    }

    #[test]
    fn test_condition_default_confidence() {
        let condition: Condition = serde_json::from_value(json!({
            "field": "slope",
            "operator": "less_equal",
            "value": 8.0
        }))
        .unwrap();
        assert_eq!(condition.confidence, 1.0);
    }
}
