//! Floor lexicon data tables
//!
//! The resolver's knowledge lives here as plain data so every table can be
//! unit-tested independently of the resolver's control flow. Entries are
//! matched against normalized text (lowercased, accents stripped), so all
//! keys are stored unaccented.
//!
//! Table version: 1 (PGOUM floor vocabulary).

/// Special floors, matched before any generic pattern. Highest specificity
/// first: mezzanine-below-grade, ground, mezzanine.
pub const SPECIAL_FLOORS: &[(&str, f64)] = &[
    ("entresotano", -0.5),
    ("entre-sotano", -0.5),
    ("entre sotano", -0.5),
    ("planta baja", 0.0),
    ("planta 0", 0.0),
    ("p.b.", 0.0),
    ("pb", 0.0),
    ("entreplanta", 0.5),
    ("entre-planta", 0.5),
    ("entre planta", 0.5),
    ("entresuelos", 0.5),
    ("entresuelo", 0.5),
];

/// Spanish ordinal words and abbreviations, 1..=10.
pub const ORDINALS: &[(&str, i32)] = &[
    ("primera", 1),
    ("primero", 1),
    ("1\u{aa}", 1),
    ("1\u{ba}", 1),
    ("1er", 1),
    ("segunda", 2),
    ("segundo", 2),
    ("2\u{aa}", 2),
    ("2\u{ba}", 2),
    ("2do", 2),
    ("tercera", 3),
    ("tercero", 3),
    ("3\u{aa}", 3),
    ("3\u{ba}", 3),
    ("3er", 3),
    ("cuarta", 4),
    ("cuarto", 4),
    ("4\u{aa}", 4),
    ("4\u{ba}", 4),
    ("4to", 4),
    ("quinta", 5),
    ("quinto", 5),
    ("5\u{aa}", 5),
    ("5\u{ba}", 5),
    ("5to", 5),
    ("sexta", 6),
    ("sexto", 6),
    ("6\u{aa}", 6),
    ("6\u{ba}", 6),
    ("6to", 6),
    ("septima", 7),
    ("septimo", 7),
    ("7\u{aa}", 7),
    ("7\u{ba}", 7),
    ("7mo", 7),
    ("octava", 8),
    ("octavo", 8),
    ("8\u{aa}", 8),
    ("8\u{ba}", 8),
    ("8vo", 8),
    ("novena", 9),
    ("noveno", 9),
    ("9\u{aa}", 9),
    ("9\u{ba}", 9),
    ("9no", 9),
    ("decima", 10),
    ("decimo", 10),
    ("10\u{aa}", 10),
    ("10\u{ba}", 10),
    ("10mo", 10),
];

/// Terms that turn an ordinal into a below-grade floor.
pub const BASEMENT_INDICATORS: &[&str] = &["sotano", "subterraneo", "subsuelo"];

/// Regex family for explicit basement descriptions. Each pattern captures the
/// unsigned level, returned negated.
pub const BASEMENT_PATTERNS: &[&str] = &[
    r"sotano\s*(\d+)",
    r"s\.\s*(\d+)",
    r"s-(\d+)",
    r"subterraneo\s*(\d+)",
    r"subsuelo\s*(\d+)",
    r"planta\s*-(\d+)",
    r"p\.\s*-(\d+)",
    r"nivel\s*-(\d+)",
];

/// Regex family for explicit above-grade descriptions.
pub const FLOOR_PATTERNS: &[&str] = &[
    r"planta\s*(\d+)",
    r"piso\s*(\d+)",
    r"p\.\s*(\d+)",
    r"nivel\s*(\d+)",
    r"p(\d+)",
    r"(\d+)\s*\u{ba}?\s*piso",
    r"(\d+)\s*\u{ba}?\s*planta",
];

/// Bare signed number, accepted only inside the valid floor range.
pub const BARE_NUMBER_PATTERN: &str = r"(-?\d+(?:\.\d+)?)";

#[cfg(test)]
mod tests {
    use super::*;
    use regex::Regex;

    #[test]
    fn test_special_floors_cover_the_three_special_values() {
        let mut values: Vec<f64> = SPECIAL_FLOORS.iter().map(|(_, v)| *v).collect();
        values.sort_by(|a, b| a.partial_cmp(b).unwrap());
        values.dedup();
        assert_eq!(values, vec![-0.5, 0.0, 0.5]);
    }

    #[test]
    fn test_special_floors_are_unaccented() {
        for (key, _) in SPECIAL_FLOORS {
            assert!(key.is_ascii(), "lexicon key '{key}' must be unaccented");
        }
    }

    #[test]
    fn test_ordinals_cover_one_to_ten() {
        for n in 1..=10 {
            assert!(
                ORDINALS.iter().any(|(_, v)| *v == n),
                "no ordinal form for {n}"
            );
        }
    }

    #[test]
    fn test_basement_patterns_compile_and_capture() {
        for pattern in BASEMENT_PATTERNS {
            let re = Regex::new(pattern).unwrap();
            assert_eq!(re.captures_len(), 2, "pattern '{pattern}' must capture");
        }
    }

    #[test]
    fn test_floor_patterns_compile_and_capture() {
        for pattern in FLOOR_PATTERNS {
            let re = Regex::new(pattern).unwrap();
            assert_eq!(re.captures_len(), 2, "pattern '{pattern}' must capture");
        }
    }

    #[test]
    fn test_basement_pattern_examples() {
        let cases = [
            ("sotano 2", "2"),
            ("s. 1", "1"),
            ("s-3", "3"),
            ("nivel -4", "4"),
            ("planta -1", "1"),
        ];
        for (text, level) in cases {
            let captured = BASEMENT_PATTERNS.iter().find_map(|p| {
                Regex::new(p)
                    .unwrap()
                    .captures(text)
                    .map(|c| c[1].to_string())
            });
            assert_eq!(captured.as_deref(), Some(level), "for '{text}'");
        }
    }

    #[test]
    fn test_floor_pattern_examples() {
        let cases = [
            ("planta 3", "3"),
            ("piso 12", "12"),
            ("nivel 2", "2"),
            ("p4", "4"),
            ("2\u{ba} piso", "2"),
        ];
        for (text, level) in cases {
            let captured = FLOOR_PATTERNS.iter().find_map(|p| {
                Regex::new(p)
                    .unwrap()
                    .captures(text)
                    .map(|c| c[1].to_string())
            });
            assert_eq!(captured.as_deref(), Some(level), "for '{text}'");
        }
    }
}
