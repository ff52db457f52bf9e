//! Ambiguity detection
//!
//! Pure scan over a typed project record. Detection never mutates the
//! project; the only sanctioned mutation is `apply_resolution`, which
//! projects a resolved value back onto the detection site. Running the
//! detector twice on the same record yields the same items.

use chrono::Utc;
use regex::Regex;
use serde_json::Value;
use strsim::jaro_winkler;
use tracing::{debug, info};

use crate::ambiguity::patterns::{
    FUZZY_FLOOR_PATTERNS, REQUIRED_DOCUMENTS, REQUIRED_FIELDS, RISKY_USE_COMBINATIONS,
};
use crate::ambiguity::types::{
    AmbiguityItem, AmbiguityKind, AmbiguitySite, CandidateResolution, Severity,
};
use crate::config::EngineConfig;
use crate::floors::{self, FloorResolver};
use crate::project::{BuildingUse, FloorRef, Project, UseTag};

/// Scans project records for gaps, contradictions and vague values.
pub struct AmbiguityDetector {
    fuzzy_floor: Vec<Regex>,
    resolver: FloorResolver,
    config: EngineConfig,
}

impl AmbiguityDetector {
    pub fn new(config: EngineConfig) -> Self {
        let fuzzy_floor = FUZZY_FLOOR_PATTERNS
            .iter()
            .map(|p| Regex::new(p).expect("fuzzy floor pattern must compile"))
            .collect();
        Self {
            fuzzy_floor,
            resolver: FloorResolver::new(),
            config,
        }
    }

    /// Run every check against the project. Items come back ordered by
    /// severity, most urgent first; order is stable across runs.
    pub fn detect(&self, project: &Project) -> Vec<AmbiguityItem> {
        let mut items = Vec::new();

        self.check_required_fields(project, &mut items);
        self.check_building_type(project, &mut items);
        self.check_secondary_uses(project, &mut items);
        self.check_floor_descriptions(project, &mut items);
        self.check_documents(project, &mut items);
        self.check_conflicts(project, &mut items);

        items.sort_by(|a, b| b.severity.cmp(&a.severity));
        info!(
            count = items.len(),
            project_id = project.project_id.as_deref().unwrap_or("unknown"),
            "ambiguity detection finished"
        );
        items
    }

    // ------------------------------------------------------------------
    // Checks
    // ------------------------------------------------------------------

    fn check_required_fields(&self, project: &Project, items: &mut Vec<AmbiguityItem>) {
        for field in REQUIRED_FIELDS {
            let missing = match *field {
                "is_existing_building" => project.is_existing_building.is_none(),
                "primary_use" => project.primary_use.is_none(),
                "has_secondary_uses" => project.has_secondary_uses.is_none(),
                _ => false,
            };
            if !missing {
                continue;
            }
            let (question, candidates) = match *field {
                "primary_use" => (
                    "¿Cuál es el uso principal del edificio?".to_string(),
                    use_candidates(),
                ),
                "is_existing_building" => (
                    "¿Se trata de un edificio existente o de obra nueva?".to_string(),
                    bool_candidates("Edificio existente", "Obra nueva"),
                ),
                _ => (
                    "¿El edificio tiene usos secundarios además del principal?".to_string(),
                    bool_candidates("Sí, tiene usos secundarios", "No, un único uso"),
                ),
            };
            items.push(AmbiguityItem {
                id: format!("missing_field_{field}"),
                kind: AmbiguityKind::IncompleteData,
                severity: Severity::Critical,
                title: format!("Falta el campo obligatorio '{field}'"),
                description: format!(
                    "El campo '{field}' es necesario para iniciar la verificación."
                ),
                detected_in: (*field).to_string(),
                site: AmbiguitySite::Field {
                    name: (*field).to_string(),
                },
                suggested_questions: vec![question],
                possible_resolutions: candidates,
                detected_at: Utc::now(),
                status: Default::default(),
            });
        }
    }

    fn check_building_type(&self, project: &Project, items: &mut Vec<AmbiguityItem>) {
        let Some(primary) = &project.primary_use else {
            return;
        };

        if let UseTag::Unknown(raw) = primary {
            items.push(AmbiguityItem {
                id: "building_type_invalid".to_string(),
                kind: AmbiguityKind::BuildingType,
                severity: Severity::Critical,
                title: format!("Uso principal no reconocido: '{raw}'"),
                description: format!(
                    "'{raw}' no es un uso contemplado en el PGOUM. Seleccione el uso \
                     que mejor describe el edificio."
                ),
                detected_in: "primary_use".to_string(),
                site: AmbiguitySite::PrimaryUse,
                suggested_questions: vec![format!(
                    "'{raw}' no es un uso válido. ¿Cuál de los usos del PGOUM corresponde?"
                )],
                possible_resolutions: closest_uses(raw),
                detected_at: Utc::now(),
                status: Default::default(),
            });
            return;
        }

        if project.is_mixed_use {
            // Already confirmed mixed use; combination checks are moot.
            return;
        }
        let Some(primary_use) = primary.known() else {
            return;
        };
        for secondary in &project.secondary_uses {
            let Some(secondary_use) = secondary.use_type.known() else {
                continue;
            };
            let risky = RISKY_USE_COMBINATIONS
                .iter()
                .any(|(p, s)| *p == primary_use && *s == secondary_use);
            if !risky {
                continue;
            }
            debug!(%primary_use, %secondary_use, "risky use combination");
            items.push(AmbiguityItem {
                id: format!("use_combination_{primary_use}_{secondary_use}"),
                kind: AmbiguityKind::BuildingType,
                severity: Severity::High,
                title: format!("Combinación de usos a confirmar: {primary_use} + {secondary_use}"),
                description: format!(
                    "La combinación {primary_use} con {secondary_use} requiere confirmar \
                     si el edificio es de uso mixto."
                ),
                detected_in: "secondary_uses".to_string(),
                site: AmbiguitySite::UseCombination {
                    secondary_use: secondary_use.as_tag().to_string(),
                },
                suggested_questions: vec![format!(
                    "El edificio combina {primary_use} y {secondary_use}. \
                     ¿Es un edificio de uso mixto?"
                )],
                possible_resolutions: vec![
                    CandidateResolution::new("mixed_use", "Sí, es un edificio de uso mixto"),
                    CandidateResolution::new(
                        "primary_dominant",
                        "No, el uso principal es el dominante",
                    ),
                ],
                detected_at: Utc::now(),
                status: Default::default(),
            });
        }
    }

    fn check_secondary_uses(&self, project: &Project, items: &mut Vec<AmbiguityItem>) {
        if project.has_secondary_uses == Some(true) && project.secondary_uses.is_empty() {
            items.push(AmbiguityItem {
                id: "secondary_uses_missing".to_string(),
                kind: AmbiguityKind::UseClassification,
                severity: Severity::High,
                title: "Usos secundarios declarados pero no detallados".to_string(),
                description: "El proyecto declara usos secundarios sin especificar cuáles."
                    .to_string(),
                detected_in: "secondary_uses".to_string(),
                site: AmbiguitySite::Field {
                    name: "secondary_uses".to_string(),
                },
                suggested_questions: vec![
                    "¿Qué usos secundarios tiene el edificio y en qué plantas?".to_string(),
                ],
                possible_resolutions: use_candidates(),
                detected_at: Utc::now(),
                status: Default::default(),
            });
        }

        if project.secondary_uses.len() > self.config.max_secondary_uses {
            items.push(AmbiguityItem {
                id: "too_many_secondary_uses".to_string(),
                kind: AmbiguityKind::UseClassification,
                severity: Severity::Medium,
                title: format!(
                    "Número de usos secundarios elevado ({})",
                    project.secondary_uses.len()
                ),
                description: format!(
                    "Se recomienda un máximo de {} usos secundarios por proyecto.",
                    self.config.max_secondary_uses
                ),
                detected_in: "secondary_uses".to_string(),
                site: AmbiguitySite::Field {
                    name: "secondary_uses".to_string(),
                },
                suggested_questions: vec![
                    "¿Puede confirmar que todos los usos secundarios listados son necesarios?"
                        .to_string(),
                ],
                possible_resolutions: vec![],
                detected_at: Utc::now(),
                status: Default::default(),
            });
        }

        for (index, secondary) in project.secondary_uses.iter().enumerate() {
            if let UseTag::Unknown(raw) = &secondary.use_type {
                items.push(AmbiguityItem {
                    id: format!("secondary_use_invalid_{index}"),
                    kind: AmbiguityKind::UseClassification,
                    severity: Severity::High,
                    title: format!("Uso secundario no reconocido: '{raw}'"),
                    description: format!("'{raw}' no es un uso contemplado en el PGOUM."),
                    detected_in: format!("secondary_uses[{index}].use_type"),
                    site: AmbiguitySite::SecondaryUseType { index },
                    suggested_questions: vec![format!(
                        "El uso secundario '{raw}' no es válido. ¿A qué uso corresponde?"
                    )],
                    possible_resolutions: closest_uses(raw),
                    detected_at: Utc::now(),
                    status: Default::default(),
                });
            }

            if secondary.floors.is_empty() {
                items.push(AmbiguityItem {
                    id: format!("secondary_use_no_floors_{index}"),
                    kind: AmbiguityKind::IncompleteData,
                    severity: Severity::High,
                    title: format!("Uso secundario '{}' sin plantas", secondary.use_type),
                    description: format!(
                        "El uso secundario '{}' no indica las plantas que ocupa.",
                        secondary.use_type
                    ),
                    detected_in: format!("secondary_uses[{index}].floors"),
                    site: AmbiguitySite::SecondaryUseFloors {
                        index,
                        description: None,
                    },
                    suggested_questions: vec![format!(
                        "¿En qué plantas se ubica el uso '{}'?",
                        secondary.use_type
                    )],
                    possible_resolutions: vec![],
                    detected_at: Utc::now(),
                    status: Default::default(),
                });
            }
        }
    }

    fn check_floor_descriptions(&self, project: &Project, items: &mut Vec<AmbiguityItem>) {
        for (index, secondary) in project.secondary_uses.iter().enumerate() {
            for (entry, floor) in secondary.floors.iter().enumerate() {
                match floor {
                    FloorRef::Number(n) => {
                        if !floors::validate_range(*n) {
                            items.push(self.out_of_range_item(index, entry, *n));
                        }
                    }
                    FloorRef::Text(text) => {
                        let normalized = FloorResolver::normalize(text);
                        let fuzzy = self.fuzzy_floor.iter().any(|re| re.is_match(&normalized));
                        let resolved = self.resolver.resolve(text);
                        if fuzzy {
                            items.push(self.fuzzy_floor_item(index, entry, text, resolved));
                        } else if resolved.is_none() {
                            items.push(self.unresolved_floor_item(index, entry, text));
                        }
                    }
                }
            }
        }
    }

    fn fuzzy_floor_item(
        &self,
        index: usize,
        entry: usize,
        text: &str,
        resolved: Option<f64>,
    ) -> AmbiguityItem {
        let mut candidates = Vec::new();
        if let Some(floor) = resolved {
            candidates.push(CandidateResolution::new(floor, floors::label(floor)));
        }
        for floor in [0.5, -0.5] {
            if resolved != Some(floor) {
                candidates.push(CandidateResolution::new(floor, floors::label(floor)));
            }
        }
        AmbiguityItem {
            id: format!("floor_fuzzy_{index}_{entry}"),
            kind: AmbiguityKind::FloorDescription,
            severity: Severity::Medium,
            title: format!("Descripción de planta imprecisa: '{text}'"),
            description: format!(
                "'{text}' no identifica una planta concreta. Confirme el nivel exacto."
            ),
            detected_in: format!("secondary_uses[{index}].floors[{entry}]"),
            site: AmbiguitySite::SecondaryUseFloors {
                index,
                description: Some(text.to_string()),
            },
            suggested_questions: vec![format!(
                "'{text}' es ambiguo. ¿A qué planta exacta se refiere?"
            )],
            possible_resolutions: candidates,
            detected_at: Utc::now(),
            status: Default::default(),
        }
    }

    fn unresolved_floor_item(&self, index: usize, entry: usize, text: &str) -> AmbiguityItem {
        AmbiguityItem {
            id: format!("floor_unresolved_{index}_{entry}"),
            kind: AmbiguityKind::FloorDescription,
            severity: Severity::High,
            title: format!("Descripción de planta no reconocida: '{text}'"),
            description: format!("No se pudo interpretar '{text}' como una planta."),
            detected_in: format!("secondary_uses[{index}].floors[{entry}]"),
            site: AmbiguitySite::SecondaryUseFloors {
                index,
                description: Some(text.to_string()),
            },
            suggested_questions: vec![format!(
                "No se reconoce la planta '{text}'. Indique el número de planta \
                 (por ejemplo: planta 2, sótano 1, planta baja)."
            )],
            possible_resolutions: vec![],
            detected_at: Utc::now(),
            status: Default::default(),
        }
    }

    fn out_of_range_item(&self, index: usize, entry: usize, floor: f64) -> AmbiguityItem {
        AmbiguityItem {
            id: format!("floor_out_of_range_{index}_{entry}"),
            kind: AmbiguityKind::FloorDescription,
            severity: Severity::High,
            title: format!("Planta fuera de rango: {floor}"),
            description: format!(
                "La planta {floor} está fuera del rango admitido [{}, {}].",
                floors::FLOOR_MIN,
                floors::FLOOR_MAX
            ),
            detected_in: format!("secondary_uses[{index}].floors[{entry}]"),
            site: AmbiguitySite::SecondaryUseFloors {
                index,
                description: None,
            },
            suggested_questions: vec![format!(
                "La planta {floor} no es válida. ¿Cuál es la planta correcta?"
            )],
            possible_resolutions: vec![],
            detected_at: Utc::now(),
            status: Default::default(),
        }
    }

    fn check_documents(&self, project: &Project, items: &mut Vec<AmbiguityItem>) {
        if project.files_pending {
            // The user already promised documents; do not re-flag.
            return;
        }

        if project.files.is_empty() {
            items.push(AmbiguityItem {
                id: "files_missing".to_string(),
                kind: AmbiguityKind::DocumentMissing,
                severity: Severity::Critical,
                title: "No se ha adjuntado documentación".to_string(),
                description: "La verificación necesita al menos la memoria y los planos."
                    .to_string(),
                detected_in: "files".to_string(),
                site: AmbiguitySite::Files,
                suggested_questions: vec![
                    "No hay documentos adjuntos. ¿Va a subir la memoria y los planos?".to_string(),
                ],
                possible_resolutions: document_candidates(),
                detected_at: Utc::now(),
                status: Default::default(),
            });
            return;
        }

        let lowered: Vec<String> = project.files.iter().map(|f| f.to_lowercase()).collect();
        for (kind, needles) in REQUIRED_DOCUMENTS {
            let present = lowered
                .iter()
                .any(|f| needles.iter().any(|n| f.contains(n)));
            if present {
                continue;
            }
            items.push(AmbiguityItem {
                id: format!("document_missing_{kind}"),
                kind: AmbiguityKind::DocumentMissing,
                severity: Severity::High,
                title: format!("Falta documento requerido: {kind}"),
                description: format!(
                    "Ningún archivo adjunto parece corresponder al documento '{kind}'."
                ),
                detected_in: "files".to_string(),
                site: AmbiguitySite::Files,
                suggested_questions: vec![format!(
                    "No se encuentra el documento '{kind}'. ¿Lo va a adjuntar?"
                )],
                possible_resolutions: document_candidates(),
                detected_at: Utc::now(),
                status: Default::default(),
            });
        }
    }

    fn check_conflicts(&self, project: &Project, items: &mut Vec<AmbiguityItem>) {
        if project.has_secondary_uses == Some(false) && !project.secondary_uses.is_empty() {
            items.push(AmbiguityItem {
                id: "secondary_uses_contradiction".to_string(),
                kind: AmbiguityKind::ConflictingData,
                severity: Severity::High,
                title: "Usos secundarios listados pero declarados inexistentes".to_string(),
                description: format!(
                    "El proyecto declara no tener usos secundarios pero lista {}.",
                    project.secondary_uses.len()
                ),
                detected_in: "has_secondary_uses".to_string(),
                site: AmbiguitySite::Field {
                    name: "has_secondary_uses".to_string(),
                },
                suggested_questions: vec![
                    "El proyecto lista usos secundarios pero declara que no los tiene. \
                     ¿Tiene el edificio usos secundarios?"
                        .to_string(),
                ],
                possible_resolutions: bool_candidates(
                    "Sí, mantener los usos secundarios",
                    "No, eliminar los usos secundarios",
                ),
                detected_at: Utc::now(),
                status: Default::default(),
            });
        }

        let Some(primary) = project.primary_use.as_ref().and_then(UseTag::known) else {
            return;
        };
        for (index, secondary) in project.secondary_uses.iter().enumerate() {
            if secondary.use_type.known() == Some(primary) {
                items.push(AmbiguityItem {
                    id: format!("duplicate_primary_use_{index}"),
                    kind: AmbiguityKind::ConflictingData,
                    severity: Severity::Medium,
                    title: format!("Uso principal repetido como secundario: {primary}"),
                    description: format!(
                        "El uso '{primary}' figura como principal y como secundario."
                    ),
                    detected_in: format!("secondary_uses[{index}].use_type"),
                    site: AmbiguitySite::SecondaryUseType { index },
                    suggested_questions: vec![format!(
                        "El uso '{primary}' aparece como principal y secundario. \
                         ¿Debe eliminarse de los secundarios?"
                    )],
                    possible_resolutions: vec![
                        CandidateResolution::new("remove_duplicate", "Sí, eliminar el duplicado"),
                        CandidateResolution::new("keep_as_is", "No, mantener ambos"),
                    ],
                    detected_at: Utc::now(),
                    status: Default::default(),
                });
            }
        }
    }

    // ------------------------------------------------------------------
    // Resolution projection
    // ------------------------------------------------------------------

    /// Project a resolved value back onto the project field the item was
    /// detected in. Dispatch is on the item's kind and site, never on its id.
    /// Returns whether anything was changed; applying the same resolution
    /// twice is a no-op.
    pub fn apply_resolution(&self, project: &mut Project, item: &AmbiguityItem, value: &Value) -> bool {
        let applied = match (&item.kind, &item.site) {
            (AmbiguityKind::BuildingType, AmbiguitySite::PrimaryUse) => {
                self.apply_primary_use(project, value)
            }
            (AmbiguityKind::BuildingType, AmbiguitySite::UseCombination { .. }) => {
                self.apply_mixed_use(project, value)
            }
            (
                AmbiguityKind::UseClassification | AmbiguityKind::ConflictingData,
                AmbiguitySite::SecondaryUseType { index },
            ) => self.apply_secondary_use_type(project, *index, value),
            (
                AmbiguityKind::FloorDescription | AmbiguityKind::IncompleteData,
                AmbiguitySite::SecondaryUseFloors { index, description },
            ) => self.apply_floors(project, *index, description.as_deref(), value),
            (AmbiguityKind::DocumentMissing, AmbiguitySite::Files) => {
                self.apply_files_pending(project, value)
            }
            (
                AmbiguityKind::IncompleteData | AmbiguityKind::ConflictingData,
                AmbiguitySite::Field { name },
            ) => self.apply_field(project, name, value),
            _ => false,
        };
        if applied {
            debug!(id = %item.id, ?value, "resolution applied");
        }
        applied
    }

    fn apply_primary_use(&self, project: &mut Project, value: &Value) -> bool {
        let Some(tag) = value.as_str() else {
            return false;
        };
        let tag = UseTag::from(tag.to_string());
        if !tag.is_valid() || project.primary_use.as_ref() == Some(&tag) {
            return false;
        }
        project.primary_use = Some(tag);
        true
    }

    fn apply_mixed_use(&self, project: &mut Project, value: &Value) -> bool {
        let confirmed = match value {
            Value::Bool(b) => *b,
            Value::String(s) => s == "mixed_use",
            _ => return false,
        };
        if confirmed && !project.is_mixed_use {
            project.is_mixed_use = true;
            return true;
        }
        // "primary_dominant" acknowledges the combination without changes.
        !confirmed
    }

    fn apply_secondary_use_type(&self, project: &mut Project, index: usize, value: &Value) -> bool {
        if index >= project.secondary_uses.len() {
            return false;
        }
        match value {
            Value::String(s) if s == "remove_duplicate" => {
                project.secondary_uses.remove(index);
                true
            }
            Value::String(s) if s == "keep_as_is" => true,
            Value::String(s) => {
                let tag = UseTag::from(s.clone());
                if !tag.is_valid() || project.secondary_uses[index].use_type == tag {
                    return false;
                }
                project.secondary_uses[index].use_type = tag;
                true
            }
            _ => false,
        }
    }

    fn apply_floors(
        &self,
        project: &mut Project,
        index: usize,
        description: Option<&str>,
        value: &Value,
    ) -> bool {
        let Some(secondary) = project.secondary_uses.get_mut(index) else {
            return false;
        };
        let resolved: Vec<f64> = match value {
            Value::Number(n) => n.as_f64().into_iter().collect(),
            Value::String(s) => self.resolver.resolve(s).into_iter().collect(),
            Value::Array(values) => values
                .iter()
                .filter_map(|v| match v {
                    Value::Number(n) => n.as_f64(),
                    Value::String(s) => self.resolver.resolve(s),
                    _ => None,
                })
                .collect(),
            _ => vec![],
        };
        let resolved: Vec<f64> = resolved
            .into_iter()
            .filter(|f| floors::validate_range(*f))
            .collect();
        if resolved.is_empty() {
            return false;
        }

        // Drop the offending entry the item was raised for, then merge.
        if let Some(text) = description {
            secondary
                .floors
                .retain(|f| f.as_text().is_none_or(|t| t != text));
        }
        let mut changed = false;
        for floor in resolved {
            if !secondary
                .floors
                .iter()
                .any(|f| f.as_number() == Some(floor))
            {
                secondary.floors.push(FloorRef::Number(floor));
                changed = true;
            }
        }
        secondary.floors.sort_by(|a, b| {
            a.as_number()
                .unwrap_or(f64::MAX)
                .total_cmp(&b.as_number().unwrap_or(f64::MAX))
        });
        changed || description.is_some()
    }

    fn apply_files_pending(&self, project: &mut Project, value: &Value) -> bool {
        let promised = match value {
            Value::Bool(b) => *b,
            Value::String(s) => s == "files_coming" || s == "upload_later",
            _ => return false,
        };
        if promised && !project.files_pending {
            project.files_pending = true;
            return true;
        }
        promised
    }

    fn apply_field(&self, project: &mut Project, name: &str, value: &Value) -> bool {
        match name {
            "is_existing_building" => match value.as_bool() {
                Some(b) => {
                    project.is_existing_building = Some(b);
                    true
                }
                None => false,
            },
            "has_secondary_uses" => match value.as_bool() {
                Some(b) => {
                    project.has_secondary_uses = Some(b);
                    if !b {
                        project.secondary_uses.clear();
                    }
                    true
                }
                None => false,
            },
            "primary_use" => self.apply_primary_use(project, value),
            "secondary_uses" => {
                // A use tag answer turns into a new secondary use awaiting floors.
                let Some(tag) = value.as_str() else {
                    return false;
                };
                let tag = UseTag::from(tag.to_string());
                if !tag.is_valid() {
                    return false;
                }
                project
                    .secondary_uses
                    .push(crate::project::SecondaryUse::new(tag, vec![]));
                true
            }
            _ => false,
        }
    }
}

impl Default for AmbiguityDetector {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

/// All valid uses as quick-reply candidates.
fn use_candidates() -> Vec<CandidateResolution> {
    BuildingUse::ALL
        .iter()
        .map(|u| CandidateResolution::new(u.as_tag(), u.as_tag()))
        .collect()
}

/// The three closest valid tags to a misspelled one, by Jaro-Winkler.
fn closest_uses(raw: &str) -> Vec<CandidateResolution> {
    let lowered = raw.to_lowercase();
    let mut scored: Vec<(f64, BuildingUse)> = BuildingUse::ALL
        .iter()
        .map(|u| (jaro_winkler(&lowered, u.as_tag()), *u))
        .collect();
    scored.sort_by(|a, b| b.0.total_cmp(&a.0));
    scored
        .into_iter()
        .take(3)
        .map(|(_, u)| CandidateResolution::new(u.as_tag(), u.as_tag()))
        .collect()
}

fn bool_candidates(yes: &str, no: &str) -> Vec<CandidateResolution> {
    vec![
        CandidateResolution::new(true, yes),
        CandidateResolution::new(false, no),
    ]
}

fn document_candidates() -> Vec<CandidateResolution> {
    vec![
        CandidateResolution::new("files_coming", "Subiré la documentación más adelante"),
        CandidateResolution::new("upload_now", "Voy a adjuntarla ahora"),
    ]
}
