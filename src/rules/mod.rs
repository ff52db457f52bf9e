//! Data-driven compliance rules
//!
//! Rules are {preconditions, conditions, actions} value objects evaluated
//! against an arbitrary key-path context by a stateless engine. The built-in
//! catalog carries the CTE and Madrid ordinance rule set.

pub mod catalog;
pub mod engine;
pub mod types;

pub use catalog::RuleCatalog;
pub use engine::RuleEngine;
pub use types::{
    Action, Citation, Condition, Operator, Rule, RuleEvaluationResult, RuleIssue, RuleKind,
};
