//! Floor description resolution
//!
//! Converts free-text floor descriptions ("Planta Segunda", "Sótano 1",
//! "Entreplanta") into the canonical numeric floor axis and back into display
//! labels. Negative floors are below grade; the half-steps -0.5 and 0.5 are
//! the two mezzanine levels.
//!
//! Unresolvable text yields `None`, never an error, so batch callers can
//! separate resolved from unresolved items without control flow by exception.

pub mod lexicon;

use regex::Regex;
use tracing::{debug, warn};
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::project::{FloorRef, SecondaryUse};

/// Inclusive bounds of the canonical floor axis.
pub const FLOOR_MIN: f64 = -100.0;
pub const FLOOR_MAX: f64 = 100.0;

/// Resolver from floor description text to canonical floor numbers.
///
/// Resolution order, first match wins:
/// 1. special-floor lexicon (mezzanines, ground floor)
/// 2. Spanish ordinal words, negated when a basement indicator is present
/// 3. explicit basement patterns (`sótano N`, `nivel -N`, ...)
/// 4. explicit above-grade patterns (`planta N`, `piso N`, ...)
/// 5. bare signed number inside `[-100, 100]`
pub struct FloorResolver {
    basement_patterns: Vec<Regex>,
    floor_patterns: Vec<Regex>,
    bare_number: Regex,
}

impl FloorResolver {
    pub fn new() -> Self {
        let compile = |patterns: &[&str]| {
            patterns
                .iter()
                .map(|p| Regex::new(p).expect("floor lexicon pattern must compile"))
                .collect()
        };
        Self {
            basement_patterns: compile(lexicon::BASEMENT_PATTERNS),
            floor_patterns: compile(lexicon::FLOOR_PATTERNS),
            bare_number: Regex::new(lexicon::BARE_NUMBER_PATTERN)
                .expect("floor lexicon pattern must compile"),
        }
    }

    /// Lowercase, strip accents and punctuation (except digits, minus and
    /// dot), collapse whitespace.
    pub fn normalize(text: &str) -> String {
        let stripped: String = text
            .to_lowercase()
            .nfd()
            .filter(|c| !is_combining_mark(*c))
            .map(|c| {
                if c.is_alphanumeric() || c == '-' || c == '.' || c == '_' {
                    c
                } else {
                    ' '
                }
            })
            .collect();
        stripped.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    /// Resolve a floor description to a canonical floor number.
    pub fn resolve(&self, text: &str) -> Option<f64> {
        if text.trim().is_empty() {
            return None;
        }
        let normalized = Self::normalize(text);

        // 1. Special floors beat every generic pattern.
        for (key, value) in lexicon::SPECIAL_FLOORS {
            if normalized.contains(key) {
                debug!(text, floor = value, "special floor matched");
                return Some(*value);
            }
        }

        // 2. Ordinal words; a basement indicator flips the sign.
        for (word, n) in lexicon::ORDINALS {
            if normalized.contains(word) {
                let below_grade = lexicon::BASEMENT_INDICATORS
                    .iter()
                    .any(|ind| normalized.contains(ind));
                let floor = if below_grade {
                    -f64::from(*n)
                } else {
                    f64::from(*n)
                };
                debug!(text, floor, "ordinal floor matched");
                return Some(floor);
            }
        }

        // 3. Explicit basement patterns.
        for re in &self.basement_patterns {
            if let Some(caps) = re.captures(&normalized) {
                if let Ok(n) = caps[1].parse::<i64>() {
                    debug!(text, floor = -n, "basement pattern matched");
                    return Some(-(n as f64));
                }
            }
        }

        // 4. Explicit above-grade patterns.
        for re in &self.floor_patterns {
            if let Some(caps) = re.captures(&normalized) {
                if let Ok(n) = caps[1].parse::<i64>() {
                    debug!(text, floor = n, "floor pattern matched");
                    return Some(n as f64);
                }
            }
        }

        // 5. Bare signed number, range-checked.
        if let Some(caps) = self.bare_number.captures(&normalized) {
            if let Ok(n) = caps[1].parse::<f64>() {
                if validate_range(n) {
                    debug!(text, floor = n, "bare number accepted");
                    return Some(n);
                }
            }
        }

        warn!(text, "floor description not resolved");
        None
    }

    /// Resolve a list of descriptions; unresolved entries are dropped with a
    /// warning, the result is deduplicated and sorted ascending.
    pub fn resolve_list<S: AsRef<str>>(&self, descriptions: &[S]) -> Vec<f64> {
        let mut floors: Vec<f64> = descriptions
            .iter()
            .filter_map(|d| self.resolve(d.as_ref()))
            .collect();
        floors.sort_by(|a, b| a.partial_cmp(b).expect("floor values are finite"));
        floors.dedup();
        floors
    }

    /// Normalize a secondary-use list in place: text floor references are
    /// resolved, numeric ones validated, duplicates collapsed.
    pub fn process_secondary_uses(&self, uses: &mut [SecondaryUse]) {
        for use_ in uses {
            let mut floors: Vec<f64> = use_
                .floors
                .iter()
                .filter_map(|floor| match floor {
                    FloorRef::Text(text) => self.resolve(text),
                    FloorRef::Number(n) => validate_range(*n).then_some(*n),
                })
                .collect();
            floors.sort_by(|a, b| a.partial_cmp(b).expect("floor values are finite"));
            floors.dedup();
            use_.floors = floors.into_iter().map(FloorRef::Number).collect();
        }
    }
}

impl Default for FloorResolver {
    fn default() -> Self {
        Self::new()
    }
}

/// Whether a floor number lies on the canonical axis.
pub fn validate_range(floor: f64) -> bool {
    (FLOOR_MIN..=FLOOR_MAX).contains(&floor)
}

/// Display label for a canonical floor number. Exact inverse of the special
/// lexicon for the three special floors.
pub fn label(floor: f64) -> String {
    if floor == -0.5 {
        "Entresótano".to_string()
    } else if floor == 0.0 {
        "Planta Baja".to_string()
    } else if floor == 0.5 {
        "Entreplanta".to_string()
    } else if floor < 0.0 {
        format!("Sótano {}", floor.abs() as i64)
    } else if floor == 1.0 {
        "Primer Piso".to_string()
    } else {
        format!("Planta {}", floor as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn resolver() -> FloorResolver {
        FloorResolver::new()
    }

    #[test]
    fn test_special_floors() {
        let r = resolver();
        assert_eq!(r.resolve("Entresótano"), Some(-0.5));
        assert_eq!(r.resolve("entre sotano"), Some(-0.5));
        assert_eq!(r.resolve("Planta Baja"), Some(0.0));
        assert_eq!(r.resolve("P.B."), Some(0.0));
        assert_eq!(r.resolve("Entreplanta"), Some(0.5));
        assert_eq!(r.resolve("entresuelo"), Some(0.5));
    }

    #[test]
    fn test_ordinals() {
        let r = resolver();
        assert_eq!(r.resolve("Planta Segunda"), Some(2.0));
        assert_eq!(r.resolve("tercera planta"), Some(3.0));
        assert_eq!(r.resolve("décima"), Some(10.0));
    }

    #[test]
    fn test_ordinal_with_basement_indicator_negates() {
        let r = resolver();
        assert_eq!(r.resolve("sótano segundo"), Some(-2.0));
        assert_eq!(r.resolve("primera planta del subsuelo"), Some(-1.0));
    }

    #[test]
    fn test_basement_patterns() {
        let r = resolver();
        assert_eq!(r.resolve("Sótano 2"), Some(-2.0));
        assert_eq!(r.resolve("sotano 1"), Some(-1.0));
        assert_eq!(r.resolve("nivel -3"), Some(-3.0));
        assert_eq!(r.resolve("planta -1"), Some(-1.0));
    }

    #[test]
    fn test_floor_patterns() {
        let r = resolver();
        assert_eq!(r.resolve("planta 4"), Some(4.0));
        assert_eq!(r.resolve("Piso 12"), Some(12.0));
        assert_eq!(r.resolve("2º piso"), Some(2.0));
    }

    #[test]
    fn test_bare_numbers_range_checked() {
        let r = resolver();
        assert_eq!(r.resolve("7"), Some(7.0));
        assert_eq!(r.resolve("-2"), Some(-2.0));
        assert_eq!(r.resolve("250"), None);
        assert_eq!(r.resolve("-101"), None);
    }

    #[test]
    fn test_unresolvable_text_is_none() {
        let r = resolver();
        assert_eq!(r.resolve("la azotea del vecino"), None);
        assert_eq!(r.resolve(""), None);
    }

    #[test]
    fn test_resolve_list_dedupes_and_sorts() {
        let r = resolver();
        let floors = r.resolve_list(&["Planta 2", "Sótano 1", "segunda", "sin datos"]);
        assert_eq!(floors, vec![-1.0, 2.0]);
    }

    #[test]
    fn test_labels_for_special_floors() {
        assert_eq!(label(-0.5), "Entresótano");
        assert_eq!(label(0.0), "Planta Baja");
        assert_eq!(label(0.5), "Entreplanta");
        assert_eq!(label(-2.0), "Sótano 2");
        assert_eq!(label(1.0), "Primer Piso");
        assert_eq!(label(5.0), "Planta 5");
    }

    #[test]
    fn test_special_lexicon_round_trip() {
        let r = resolver();
        for (key, _) in lexicon::SPECIAL_FLOORS {
            let floor = r.resolve(key).expect("lexicon entry must resolve");
            let lbl = label(floor);
            assert!(
                ["Planta Baja", "Entreplanta", "Entresótano"].contains(&lbl.as_str()),
                "'{key}' -> {floor} -> '{lbl}'"
            );
        }
    }

    proptest! {
        #[test]
        fn prop_resolved_floors_stay_in_range(text in "\\PC*") {
            let r = resolver();
            if let Some(floor) = r.resolve(&text) {
                prop_assert!(validate_range(floor));
                prop_assert!(!label(floor).is_empty());
            }
        }

        #[test]
        fn prop_in_range_integers_resolve_to_themselves(n in -100i64..=100) {
            let r = resolver();
            prop_assert_eq!(r.resolve(&n.to_string()), Some(n as f64));
        }
    }
}
