//! Ambiguity pattern tables
//!
//! Fuzzy-language patterns and known-risky use combinations, kept as data so
//! each table is testable on its own. Patterns run on normalized text
//! (lowercased, accents stripped), so they are written unaccented.

use crate::project::BuildingUse;

/// Floor descriptions that hint at a mezzanine or in-between level without
/// naming one. Deterministic resolution may still succeed on these; the
/// detector flags them so the user confirms the intended level.
pub const FUZZY_FLOOR_PATTERNS: &[&str] = &[
    r"entre\s+.+\s+y\s+.+",
    r"planta\s+intermedia",
    r"intermedia",
    r"planta\s+media",
    r"nivel\s+intermedio",
    r"media\s+altura",
    r"mas\s+o\s+menos",
    r"aproximadamente",
    r"alrededor\s+de",
    r"cerca\s+de\s+la\s+planta",
];

/// Primary + secondary combinations that PGOUM treats as compatible only
/// under conditions, so the project must confirm mixed-use intent.
pub const RISKY_USE_COMBINATIONS: &[(BuildingUse, BuildingUse)] = &[
    (BuildingUse::Residencial, BuildingUse::ServiciosTerciarios),
    (BuildingUse::Industrial, BuildingUse::Residencial),
    (BuildingUse::GarajeAparcamiento, BuildingUse::ServiciosTerciarios),
];

/// Document kinds every verification run needs, with the filename substrings
/// that identify them.
pub const REQUIRED_DOCUMENTS: &[(&str, &[&str])] = &[
    ("memoria", &["memoria"]),
    ("planos", &["plano", "planos"]),
];

/// Top-level fields that must be present before verification can start.
pub const REQUIRED_FIELDS: &[&str] = &["is_existing_building", "primary_use", "has_secondary_uses"];
