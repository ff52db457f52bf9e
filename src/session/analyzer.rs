//! Answer analysis
//!
//! Turns a free-text user reply into a typed resolution value with a
//! confidence score. Generic yes/no recognition runs first and
//! short-circuits for confirmation-type items; otherwise the item's kind
//! routes to a type-specific analyzer. Inference-fallback replies go through
//! these same analyzers, never accepted verbatim.

use serde_json::{json, Value};
use strsim::jaro_winkler;
use tracing::debug;

use crate::ambiguity::{AmbiguityItem, AmbiguityKind, AmbiguitySite};
use crate::floors::FloorResolver;
use crate::project::BuildingUse;

/// Outcome of analyzing one user reply against one ambiguity item.
#[derive(Debug, Clone, PartialEq)]
pub struct Analysis {
    /// Machine-usable resolution value, when one was recognized.
    pub value: Option<Value>,
    /// Confidence in `[0, 1]`; zero when nothing was recognized.
    pub confidence: f64,
    /// Why the analysis succeeded or came up short, for the re-prompt.
    pub note: String,
}

impl Analysis {
    fn unresolved(note: impl Into<String>) -> Self {
        Self {
            value: None,
            confidence: 0.0,
            note: note.into(),
        }
    }

    fn resolved(value: Value, confidence: f64, note: impl Into<String>) -> Self {
        Self {
            value: Some(value),
            confidence,
            note: note.into(),
        }
    }
}

const YES_WORDS: &[&str] = &[
    "si", "yes", "correcto", "claro", "vale", "ok", "exacto", "afirmativo", "efectivamente",
    "de acuerdo",
];
const NO_WORDS: &[&str] = &["no", "negativo", "incorrecto", "tampoco"];

/// Colloquial names mapped to canonical use tags.
const USE_SYNONYMS: &[(&str, BuildingUse)] = &[
    ("vivienda", BuildingUse::Residencial),
    ("viviendas", BuildingUse::Residencial),
    ("piso", BuildingUse::Residencial),
    ("pisos", BuildingUse::Residencial),
    ("casa", BuildingUse::Residencial),
    ("residencial", BuildingUse::Residencial),
    ("nave", BuildingUse::Industrial),
    ("fabrica", BuildingUse::Industrial),
    ("taller", BuildingUse::Industrial),
    ("almacen", BuildingUse::Industrial),
    ("industrial", BuildingUse::Industrial),
    ("garaje", BuildingUse::GarajeAparcamiento),
    ("aparcamiento", BuildingUse::GarajeAparcamiento),
    ("parking", BuildingUse::GarajeAparcamiento),
    ("oficina", BuildingUse::ServiciosTerciarios),
    ("oficinas", BuildingUse::ServiciosTerciarios),
    ("comercial", BuildingUse::ServiciosTerciarios),
    ("tienda", BuildingUse::ServiciosTerciarios),
    ("local", BuildingUse::ServiciosTerciarios),
    ("hotel", BuildingUse::ServiciosTerciarios),
    ("terciario", BuildingUse::ServiciosTerciarios),
    ("colegio", BuildingUse::DotacionalEquipamiento),
    ("escuela", BuildingUse::DotacionalEquipamiento),
    ("equipamiento", BuildingUse::DotacionalEquipamiento),
    ("polideportivo", BuildingUse::DotacionalDeportivo),
    ("deportivo", BuildingUse::DotacionalDeportivo),
];

/// Minimum Jaro-Winkler similarity for a misspelled use tag.
const FUZZY_USE_THRESHOLD: f64 = 0.88;

/// Deterministic reply analyzer shared by user input and inference output.
pub struct AnswerAnalyzer {
    resolver: FloorResolver,
}

impl AnswerAnalyzer {
    pub fn new() -> Self {
        Self {
            resolver: FloorResolver::new(),
        }
    }

    /// Generic yes/no recognition over the normalized reply.
    pub fn recognize_yes_no(&self, text: &str) -> Option<bool> {
        let normalized = FloorResolver::normalize(text);
        let words: Vec<&str> = normalized.split_whitespace().collect();
        if YES_WORDS
            .iter()
            .any(|y| words.contains(y) || normalized == *y)
        {
            return Some(true);
        }
        if NO_WORDS.iter().any(|n| words.contains(n)) {
            return Some(false);
        }
        None
    }

    /// Map reply text to a building use: exact tag, then synonym word, then
    /// fuzzy match against tags and synonyms.
    pub fn analyze_building_use(&self, text: &str) -> Option<(BuildingUse, f64)> {
        let normalized = FloorResolver::normalize(text);
        // Tags contain '-' and '_' which survive normalization.
        if let Some(use_) = BuildingUse::from_tag(normalized.trim()) {
            return Some((use_, 1.0));
        }

        let words: Vec<&str> = normalized.split_whitespace().collect();
        for (synonym, use_) in USE_SYNONYMS {
            if words.contains(synonym) {
                return Some((*use_, 0.9));
            }
        }

        let mut best: Option<(BuildingUse, f64)> = None;
        for word in &words {
            for use_ in BuildingUse::ALL {
                let score = jaro_winkler(word, use_.as_tag());
                if score >= FUZZY_USE_THRESHOLD {
                    best = max_score(best, (use_, score));
                }
            }
            for (synonym, use_) in USE_SYNONYMS {
                let score = jaro_winkler(word, synonym);
                if score >= FUZZY_USE_THRESHOLD {
                    best = max_score(best, (*use_, score));
                }
            }
        }
        // Fuzzy hits are discounted below exact matches.
        best.map(|(use_, score)| (use_, score * 0.9))
    }

    /// Extract floor numbers from a reply that may list several
    /// ("planta baja y primera", "sótano 1, sótano 2").
    pub fn analyze_floors(&self, text: &str) -> Option<(Vec<f64>, f64)> {
        let parts: Vec<&str> = text
            .split([',', ';'])
            .flat_map(|part| part.split(" y "))
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .collect();
        if parts.is_empty() {
            return None;
        }

        let resolved = self.resolver.resolve_list(&parts);
        if resolved.is_empty() {
            return None;
        }
        let confidence = resolved.len() as f64 / parts.len() as f64;
        Some((resolved, confidence.min(1.0)))
    }

    /// Analyze a reply in the context of the active ambiguity item.
    pub fn analyze(&self, item: &AmbiguityItem, text: &str) -> Analysis {
        // Yes/no short-circuits for confirmation-type items.
        if item.is_confirmation() {
            if let Some(confirmed) = self.recognize_yes_no(text) {
                return self.confirmation_value(item, confirmed);
            }
        }

        let analysis = match (&item.kind, &item.site) {
            (AmbiguityKind::BuildingType, AmbiguitySite::PrimaryUse)
            | (AmbiguityKind::UseClassification, _) => self.analyze_use_reply(text),
            (AmbiguityKind::IncompleteData, AmbiguitySite::Field { name }) => {
                self.analyze_field_reply(name, text)
            }
            (_, AmbiguitySite::SecondaryUseFloors { .. }) => self.analyze_floor_reply(text),
            (AmbiguityKind::DocumentMissing, _) => {
                Analysis::unresolved("Indique si va a adjuntar la documentación (sí/no).")
            }
            (AmbiguityKind::ConflictingData, AmbiguitySite::Field { .. }) => {
                match self.recognize_yes_no(text) {
                    Some(b) => Analysis::resolved(json!(b), 1.0, "Confirmación reconocida"),
                    None => Analysis::unresolved(
                        "Indique si el edificio tiene usos secundarios (sí/no).",
                    ),
                }
            }
            (AmbiguityKind::ConflictingData, _) => match self.recognize_yes_no(text) {
                Some(confirmed) => self.confirmation_value(item, confirmed),
                None => Analysis::unresolved(
                    "Indique si debe eliminarse el uso duplicado (sí/no).",
                ),
            },
            _ => Analysis::unresolved("No se pudo interpretar la respuesta."),
        };
        debug!(item = %item.id, confidence = analysis.confidence, "reply analyzed");
        analysis
    }

    fn confirmation_value(&self, item: &AmbiguityItem, confirmed: bool) -> Analysis {
        let value = match (&item.kind, confirmed) {
            (AmbiguityKind::DocumentMissing, true) => json!("files_coming"),
            (AmbiguityKind::DocumentMissing, false) => json!("upload_now"),
            (AmbiguityKind::BuildingType, true) => json!("mixed_use"),
            (AmbiguityKind::BuildingType, false) => json!("primary_dominant"),
            (AmbiguityKind::ConflictingData, true) => json!("remove_duplicate"),
            (AmbiguityKind::ConflictingData, false) => json!("keep_as_is"),
            _ => json!(confirmed),
        };
        Analysis::resolved(value, 1.0, "Confirmación reconocida")
    }

    fn analyze_use_reply(&self, text: &str) -> Analysis {
        match self.analyze_building_use(text) {
            Some((use_, confidence)) => Analysis::resolved(
                json!(use_.as_tag()),
                confidence,
                format!("Uso reconocido: {use_}"),
            ),
            None => Analysis::unresolved(
                "No se reconoce ese uso. Indique uno de los usos del PGOUM \
                 (residencial, industrial, garaje-aparcamiento, ...).",
            ),
        }
    }

    fn analyze_floor_reply(&self, text: &str) -> Analysis {
        match self.analyze_floors(text) {
            Some((floors, confidence)) => {
                let note = format!("Plantas reconocidas: {floors:?}");
                Analysis::resolved(json!(floors), confidence, note)
            }
            None => Analysis::unresolved(
                "No se reconoce la planta. Use formas como 'planta 2', \
                 'sótano 1' o 'planta baja'.",
            ),
        }
    }

    fn analyze_field_reply(&self, field: &str, text: &str) -> Analysis {
        match field {
            "is_existing_building" => {
                let normalized = FloorResolver::normalize(text);
                if normalized.contains("existente") {
                    return Analysis::resolved(json!(true), 1.0, "Edificio existente");
                }
                if normalized.contains("obra nueva") || normalized.contains("nueva") {
                    return Analysis::resolved(json!(false), 1.0, "Obra nueva");
                }
                match self.recognize_yes_no(text) {
                    Some(b) => Analysis::resolved(json!(b), 0.9, "Confirmación reconocida"),
                    None => Analysis::unresolved(
                        "Indique si el edificio es existente o de obra nueva.",
                    ),
                }
            }
            "has_secondary_uses" => match self.recognize_yes_no(text) {
                Some(b) => Analysis::resolved(json!(b), 1.0, "Confirmación reconocida"),
                None => Analysis::unresolved(
                    "Indique si el edificio tiene usos secundarios (sí/no).",
                ),
            },
            "primary_use" | "secondary_uses" => self.analyze_use_reply(text),
            _ => Analysis::unresolved("No se pudo interpretar la respuesta."),
        }
    }
}

impl Default for AnswerAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

fn max_score(
    best: Option<(BuildingUse, f64)>,
    candidate: (BuildingUse, f64),
) -> Option<(BuildingUse, f64)> {
    match best {
        Some((_, score)) if score >= candidate.1 => best,
        _ => Some(candidate),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use crate::ambiguity::Severity;

    fn analyzer() -> AnswerAnalyzer {
        AnswerAnalyzer::new()
    }

    fn item(kind: AmbiguityKind, site: AmbiguitySite) -> AmbiguityItem {
        AmbiguityItem {
            id: "t".to_string(),
            kind,
            severity: Severity::High,
            title: String::new(),
            description: String::new(),
            detected_in: String::new(),
            site,
            suggested_questions: vec!["?".to_string()],
            possible_resolutions: vec![],
            detected_at: Utc::now(),
            status: Default::default(),
        }
    }

    #[test]
    fn test_yes_no_recognition() {
        let a = analyzer();
        assert_eq!(a.recognize_yes_no("Sí, claro"), Some(true));
        assert_eq!(a.recognize_yes_no("si"), Some(true));
        assert_eq!(a.recognize_yes_no("No, tampoco"), Some(false));
        assert_eq!(a.recognize_yes_no("la tercera planta"), None);
    }

    #[test]
    fn test_building_use_exact_and_synonym() {
        let a = analyzer();
        assert_eq!(
            a.analyze_building_use("residencial"),
            Some((BuildingUse::Residencial, 1.0))
        );
        let (use_, confidence) = a.analyze_building_use("es una nave con taller").unwrap();
        assert_eq!(use_, BuildingUse::Industrial);
        assert!(confidence >= 0.9);
        let (use_, _) = a.analyze_building_use("un parking").unwrap();
        assert_eq!(use_, BuildingUse::GarajeAparcamiento);
    }

    #[test]
    fn test_building_use_fuzzy_match() {
        let a = analyzer();
        let (use_, confidence) = a.analyze_building_use("residencal").unwrap();
        assert_eq!(use_, BuildingUse::Residencial);
        assert!(confidence < 1.0);
    }

    #[test]
    fn test_building_use_unrecognized() {
        assert_eq!(analyzer().analyze_building_use("zzz qqq"), None);
    }

    #[test]
    fn test_floor_list_analysis() {
        let a = analyzer();
        let (floors, confidence) = a.analyze_floors("planta baja y primera").unwrap();
        assert_eq!(floors, vec![0.0, 1.0]);
        assert_eq!(confidence, 1.0);

        let (floors, confidence) = a.analyze_floors("sótano 1, cafetería").unwrap();
        assert_eq!(floors, vec![-1.0]);
        assert!(confidence < 1.0);
    }

    #[test]
    fn test_confirmation_short_circuit_for_mixed_use() {
        let a = analyzer();
        let item = item(
            AmbiguityKind::BuildingType,
            AmbiguitySite::UseCombination {
                secondary_use: "servicios_terciarios".to_string(),
            },
        );
        let analysis = a.analyze(&item, "sí");
        assert_eq!(analysis.value, Some(json!("mixed_use")));
        assert_eq!(analysis.confidence, 1.0);

        let analysis = a.analyze(&item, "no");
        assert_eq!(analysis.value, Some(json!("primary_dominant")));
    }

    #[test]
    fn test_field_reply_existing_building() {
        let a = analyzer();
        let item = item(
            AmbiguityKind::IncompleteData,
            AmbiguitySite::Field {
                name: "is_existing_building".to_string(),
            },
        );
        assert_eq!(a.analyze(&item, "es un edificio existente").value, Some(json!(true)));
        assert_eq!(a.analyze(&item, "obra nueva").value, Some(json!(false)));
        assert_eq!(a.analyze(&item, "quizás").value, None);
    }

    #[test]
    fn test_floor_reply_routed_by_site() {
        let a = analyzer();
        let item = item(
            AmbiguityKind::FloorDescription,
            AmbiguitySite::SecondaryUseFloors {
                index: 0,
                description: Some("intermedia".to_string()),
            },
        );
        let analysis = a.analyze(&item, "la entreplanta");
        assert_eq!(analysis.value, Some(json!([0.5])));
    }

    #[test]
    fn test_unresolved_reply_has_note() {
        let a = analyzer();
        let item = item(
            AmbiguityKind::BuildingType,
            AmbiguitySite::PrimaryUse,
        );
        let analysis = a.analyze(&item, "pues no lo sé");
        assert!(analysis.value.is_none());
        assert!(!analysis.note.is_empty());
    }
}
