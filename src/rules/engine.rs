//! Condition rule evaluation
//!
//! Stateless evaluator: `evaluate(rules, context)` filters rules by building
//! use and jurisdiction, orders them by ascending priority, and checks every
//! condition via dot-path lookup into the context. Data-quality problems
//! (missing fields, incomparable types) become failed conditions with
//! confidence 0, never errors.

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::{RuleError, RuleResult};
use crate::rules::types::{
    Condition, Operator, Rule, RuleEvaluationResult, RuleIssue,
};

/// Generic condition/action rule evaluator.
#[derive(Debug, Default)]
pub struct RuleEngine;

impl RuleEngine {
    pub fn new() -> Self {
        Self
    }

    /// Evaluate every applicable rule against the context, ascending
    /// priority. The context is the flattened project record
    /// (`Project::to_rule_context`).
    pub fn evaluate(&self, rules: &[Rule], context: &Value) -> Vec<RuleEvaluationResult> {
        let building_use = lookup(context, "building_use")
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_lowercase();
        let in_madrid = lookup(context, "location")
            .and_then(Value::as_str)
            .map(|l| l.to_lowercase().contains("madrid"))
            .unwrap_or(false);

        let mut applicable: Vec<&Rule> = rules
            .iter()
            .filter(|rule| rule.enabled)
            .filter(|rule| rule.applies_to_use(&building_use))
            .filter(|rule| !rule.madrid_specific || in_madrid)
            .filter(|rule| self.preconditions_hold(rule, context))
            .collect();
        applicable.sort_by_key(|rule| rule.priority);

        let results: Vec<RuleEvaluationResult> = applicable
            .into_iter()
            .map(|rule| self.evaluate_rule(rule, context))
            .collect();

        info!(
            evaluated = results.len(),
            violated = results.iter().filter(|r| !r.passed).count(),
            building_use,
            "rule evaluation finished"
        );
        results
    }

    fn preconditions_hold(&self, rule: &Rule, context: &Value) -> bool {
        rule.preconditions.iter().all(|condition| {
            match lookup(context, &condition.field) {
                // A missing precondition field means the rule is out of
                // scope, not violated.
                None => false,
                Some(actual) => {
                    apply_operator(actual, condition.operator, &condition.value).unwrap_or(false)
                }
            }
        })
    }

    fn evaluate_rule(&self, rule: &Rule, context: &Value) -> RuleEvaluationResult {
        let mut violations = Vec::new();
        let mut confidence: f64 = 1.0;

        for condition in &rule.conditions {
            let outcome = self.evaluate_condition(condition, context);
            if !outcome.passed {
                violations.push(outcome.message);
            }
            confidence *= outcome.confidence;
        }

        let passed = violations.is_empty();
        let (suggestions, issues) = if passed {
            (Vec::new(), Vec::new())
        } else {
            let suggestions = rule
                .actions
                .iter()
                .filter_map(|a| a.suggestion.clone())
                .collect();
            let issues = rule
                .actions
                .iter()
                .map(|a| RuleIssue {
                    message: a.message.clone(),
                    severity: a.severity,
                    citation: a.citation.clone(),
                    suggestion: a.suggestion.clone(),
                })
                .collect();
            (suggestions, issues)
        };

        debug!(rule_id = %rule.rule_id, passed, confidence, "rule evaluated");
        RuleEvaluationResult {
            rule_id: rule.rule_id.clone(),
            passed,
            confidence,
            violations,
            suggestions,
            issues,
        }
    }

    fn evaluate_condition(&self, condition: &Condition, context: &Value) -> ConditionOutcome {
        let Some(actual) = lookup(context, &condition.field) else {
            return ConditionOutcome {
                passed: false,
                confidence: 0.0,
                message: format!("Field '{}' not found in project data", condition.field),
            };
        };

        match apply_operator(actual, condition.operator, &condition.value) {
            Ok(true) => ConditionOutcome {
                passed: true,
                confidence: condition.confidence,
                message: String::new(),
            },
            Ok(false) => ConditionOutcome {
                passed: false,
                confidence: condition.confidence,
                message: format!(
                    "Condition {} {} {} failed",
                    condition.field, condition.operator, condition.value
                ),
            },
            Err(err) => {
                // Incomparable types stay inside the engine as a failed
                // condition; they never propagate.
                warn!(field = %condition.field, %err, "condition comparison failed");
                ConditionOutcome {
                    passed: false,
                    confidence: 0.0,
                    message: err.to_string(),
                }
            }
        }
    }
}

struct ConditionOutcome {
    passed: bool,
    confidence: f64,
    message: String,
}

/// Dot-path lookup into a JSON context (`building.height`).
pub fn lookup<'a>(context: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = context;
    for part in path.split('.') {
        current = current.as_object()?.get(part)?;
    }
    Some(current)
}

/// Coerce a JSON value to a number for ordering/range operators.
fn as_number(value: &Value, operator: Operator) -> RuleResult<f64> {
    match value {
        Value::Number(n) => n.as_f64().ok_or_else(|| invalid(value, value, operator)),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| invalid(value, value, operator)),
        _ => Err(invalid(value, value, operator)),
    }
}

fn invalid(left: &Value, right: &Value, operator: Operator) -> RuleError {
    RuleError::InvalidComparison {
        left: left.to_string(),
        right: right.to_string(),
        operator: operator.to_string(),
    }
}

fn numeric_pair(actual: &Value, expected: &Value, operator: Operator) -> RuleResult<(f64, f64)> {
    let left = as_number(actual, operator).map_err(|_| invalid(actual, expected, operator))?;
    let right = as_number(expected, operator).map_err(|_| invalid(actual, expected, operator))?;
    Ok((left, right))
}

fn range_bounds(expected: &Value, operator: Operator) -> RuleResult<(f64, f64)> {
    let Some(bounds) = expected.as_array().filter(|b| b.len() == 2) else {
        return Err(RuleError::MalformedRule {
            rule_id: String::new(),
            reason: format!("{operator} expects a two-element [low, high] array"),
        });
    };
    let low = as_number(&bounds[0], operator)?;
    let high = as_number(&bounds[1], operator)?;
    Ok((low, high))
}

/// Textual form used by the containment operators: strings stay as-is,
/// everything else uses its JSON rendering.
fn as_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.to_lowercase(),
        other => other.to_string().to_lowercase(),
    }
}

/// Apply one operator. Ordering and range operators surface
/// `InvalidComparison` for the engine to downgrade.
pub fn apply_operator(actual: &Value, operator: Operator, expected: &Value) -> RuleResult<bool> {
    match operator {
        Operator::Equals => Ok(actual == expected),
        Operator::NotEquals => Ok(actual != expected),
        Operator::GreaterThan => {
            let (l, r) = numeric_pair(actual, expected, operator)?;
            Ok(l > r)
        }
        Operator::LessThan => {
            let (l, r) = numeric_pair(actual, expected, operator)?;
            Ok(l < r)
        }
        Operator::GreaterEqual => {
            let (l, r) = numeric_pair(actual, expected, operator)?;
            Ok(l >= r)
        }
        Operator::LessEqual => {
            let (l, r) = numeric_pair(actual, expected, operator)?;
            Ok(l <= r)
        }
        Operator::Contains => Ok(as_text(actual).contains(&as_text(expected))),
        Operator::NotContains => Ok(!as_text(actual).contains(&as_text(expected))),
        Operator::In => Ok(expected
            .as_array()
            .is_some_and(|set| set.contains(actual))),
        Operator::NotIn => Ok(!expected
            .as_array()
            .is_some_and(|set| set.contains(actual))),
        Operator::InRange => {
            let value = as_number(actual, operator)?;
            let (low, high) = range_bounds(expected, operator)?;
            Ok(low <= value && value <= high)
        }
        Operator::NotInRange => {
            let value = as_number(actual, operator)?;
            let (low, high) = range_bounds(expected, operator)?;
            Ok(!(low <= value && value <= high))
        }
    }
}
