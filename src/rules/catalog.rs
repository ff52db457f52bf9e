//! Built-in rule catalog
//!
//! CTE (Código Técnico de la Edificación) and Madrid ordinance rules,
//! expressed as requirements with preconditions gating applicability.
//! Catalogs can also be exchanged as YAML; loading validates every rule and
//! fails fast on configuration defects such as a missing citation.

use tracing::info;

use crate::ambiguity::Severity;
use crate::error::{RuleError, RuleResult};
use crate::rules::types::{Action, Citation, Condition, Operator, Rule, RuleKind};

/// A validated set of compliance rules.
#[derive(Debug, Clone)]
pub struct RuleCatalog {
    rules: Vec<Rule>,
}

impl RuleCatalog {
    /// The built-in CTE + Madrid catalog.
    pub fn builtin() -> Self {
        let catalog = Self {
            rules: builtin_rules(),
        };
        // Built-in rules are validated in tests; re-check is cheap and keeps
        // one invariant path.
        debug_assert!(catalog.rules.iter().all(|r| validate_rule(r).is_ok()));
        info!(rules = catalog.rules.len(), "built-in rule catalog loaded");
        catalog
    }

    /// Load a catalog from YAML, validating every rule.
    pub fn from_yaml(yaml: &str) -> crate::error::EngineResult<Self> {
        let rules: Vec<Rule> =
            serde_yaml::from_str(yaml).map_err(|err| match unknown_operator(&err) {
                Some(operator) => {
                    crate::error::EngineError::Rule(RuleError::UnknownOperator { operator })
                }
                None => err.into(),
            })?;
        for rule in &rules {
            validate_rule(rule)?;
        }
        info!(rules = rules.len(), "rule catalog loaded from yaml");
        Ok(Self { rules })
    }

    /// Serialize the catalog to YAML.
    pub fn to_yaml(&self) -> crate::error::EngineResult<String> {
        Ok(serde_yaml::to_string(&self.rules)?)
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn get(&self, rule_id: &str) -> Option<&Rule> {
        self.rules.iter().find(|r| r.rule_id == rule_id)
    }

    /// Add a rule after validation.
    pub fn add(&mut self, rule: Rule) -> RuleResult<()> {
        validate_rule(&rule)?;
        self.rules.retain(|r| r.rule_id != rule.rule_id);
        self.rules.push(rule);
        Ok(())
    }
}

/// Recover the offending token when deserialization rejected an `operator`
/// value. serde reports every closed enum the same way, so the expected-list
/// is checked for an operator-only variant to avoid claiming a bad `kind`.
fn unknown_operator(err: &serde_yaml::Error) -> Option<String> {
    let text = err.to_string();
    if !text.contains("unknown variant") || !text.contains("`in_range`") {
        return None;
    }
    let start = text.find('`')? + 1;
    let end = start + text[start..].find('`')?;
    Some(text[start..end].to_string())
}

/// Structural validation applied at load time. Violations here are
/// configuration defects, not data-quality findings.
fn validate_rule(rule: &Rule) -> RuleResult<()> {
    if rule.rule_id.trim().is_empty() {
        return Err(RuleError::MalformedRule {
            rule_id: rule.rule_id.clone(),
            reason: "empty rule id".to_string(),
        });
    }
    if rule.conditions.is_empty() {
        return Err(RuleError::MalformedRule {
            rule_id: rule.rule_id.clone(),
            reason: "rule has no conditions".to_string(),
        });
    }
    if rule.applicable_uses.is_empty() {
        return Err(RuleError::MalformedRule {
            rule_id: rule.rule_id.clone(),
            reason: "rule has no applicable uses".to_string(),
        });
    }
    if rule.actions.is_empty() {
        return Err(RuleError::MalformedRule {
            rule_id: rule.rule_id.clone(),
            reason: "rule has no violation actions".to_string(),
        });
    }
    for action in &rule.actions {
        if !action.citation.is_complete() {
            return Err(RuleError::MissingCitation {
                rule_id: rule.rule_id.clone(),
                message: action.message.clone(),
            });
        }
    }
    for condition in rule.preconditions.iter().chain(&rule.conditions) {
        if !(0.0..=1.0).contains(&condition.confidence) {
            return Err(RuleError::MalformedRule {
                rule_id: rule.rule_id.clone(),
                reason: format!(
                    "condition '{}' confidence {} outside [0, 1]",
                    condition.field, condition.confidence
                ),
            });
        }
    }
    Ok(())
}

const RESIDENTIAL_TERTIARY: &[&str] = &[
    "residencial",
    "servicios_terciarios",
    "dotacional_equipamiento",
];

fn uses(tags: &[&str]) -> Vec<String> {
    tags.iter().map(|t| t.to_string()).collect()
}

fn builtin_rules() -> Vec<Rule> {
    vec![
        // ---------------- DB-SI: seguridad en caso de incendio ----------
        Rule {
            rule_id: "DB-SI-001".to_string(),
            name: "Resistencia al fuego de elementos estructurales".to_string(),
            description: "Los elementos estructurales deben declarar resistencia al fuego \
                          adecuada al uso y altura del edificio."
                .to_string(),
            kind: RuleKind::FireSafety,
            preconditions: vec![Condition::new("height", Operator::GreaterThan, 0)],
            conditions: vec![Condition::new("fire_resistance", Operator::Contains, "rf-")],
            actions: vec![Action::new(
                "Falta especificación de resistencia al fuego de elementos estructurales",
                Severity::High,
                Citation::new("DB-SI", "Artículo 3.1"),
            )],
            applicable_uses: uses(RESIDENTIAL_TERTIARY),
            madrid_specific: false,
            priority: 1,
            enabled: true,
        },
        Rule {
            rule_id: "DB-SI-002".to_string(),
            name: "Ancho mínimo de escaleras de evacuación".to_string(),
            description: "Las escaleras de evacuación deben tener un ancho mínimo de 1.0m \
                          cuando el aforo supera 50 personas."
                .to_string(),
            kind: RuleKind::FireSafety,
            preconditions: vec![
                Condition::new("stair_type", Operator::Equals, "evacuacion"),
                Condition::new("occupancy", Operator::GreaterThan, 50),
            ],
            conditions: vec![Condition::new("stair_width", Operator::GreaterEqual, 1.0)],
            actions: vec![Action::new(
                "El ancho de escalera de evacuación es insuficiente para el aforo",
                Severity::High,
                Citation::new("DB-SI", "Artículo 4.1"),
            )
            .with_suggestion("Aumentar el ancho de escalera a mínimo 1.0m")],
            applicable_uses: uses(&["servicios_terciarios", "dotacional_equipamiento"]),
            madrid_specific: false,
            priority: 1,
            enabled: true,
        },
        Rule {
            rule_id: "FIRE-001".to_string(),
            name: "Distancia máxima de evacuación".to_string(),
            description: "La distancia de evacuación no puede superar 15m.".to_string(),
            kind: RuleKind::FireSafety,
            preconditions: vec![],
            conditions: vec![Condition::new(
                "evacuation_distance",
                Operator::LessEqual,
                15,
            )],
            actions: vec![Action::new(
                "La distancia de evacuación excede el máximo permitido (15m)",
                Severity::High,
                Citation::new("DB-SI", "Artículo 4.1"),
            )
            .with_suggestion(
                "Reducir la distancia de evacuación o añadir salidas adicionales",
            )],
            applicable_uses: uses(&["residencial", "servicios_terciarios"]),
            madrid_specific: false,
            priority: 1,
            enabled: true,
        },
        Rule {
            rule_id: "FIRE-002".to_string(),
            name: "Sistemas de protección contra incendios".to_string(),
            description: "Los edificios dotacionales de gran superficie requieren sistemas \
                          de protección contra incendios."
                .to_string(),
            kind: RuleKind::FireSafety,
            preconditions: vec![Condition::new("total_area", Operator::GreaterThan, 1000)],
            conditions: vec![Condition::new(
                "fire_protection_systems",
                Operator::Contains,
                "extintor",
            )],
            actions: vec![Action::new(
                "Se requieren sistemas de protección contra incendios",
                Severity::High,
                Citation::new("DB-SI", "Artículo 5.1"),
            )
            .with_suggestion("Instalar sistemas de protección contra incendios")],
            applicable_uses: uses(&["dotacional_equipamiento"]),
            madrid_specific: false,
            priority: 1,
            enabled: true,
        },
        // ---------------- DB-SU: seguridad de utilización ---------------
        Rule {
            rule_id: "DB-SU-001".to_string(),
            name: "Pendiente máxima de rampas".to_string(),
            description: "Las rampas no pueden tener pendiente superior al 8%.".to_string(),
            kind: RuleKind::Accessibility,
            preconditions: vec![Condition::new("element_type", Operator::Equals, "rampa")],
            conditions: vec![Condition::new("slope", Operator::LessEqual, 8.0)],
            actions: vec![Action::new(
                "La pendiente de la rampa excede el máximo permitido (8%)",
                Severity::High,
                Citation::new("DB-SU", "Artículo 2.1"),
            )
            .with_suggestion("Reducir la pendiente de la rampa a máximo 8%")],
            applicable_uses: uses(&["general"]),
            madrid_specific: false,
            priority: 1,
            enabled: true,
        },
        Rule {
            rule_id: "DB-SU-002".to_string(),
            name: "Dimensiones de escaleras".to_string(),
            description: "Huella mínima 28cm y contrahuella máxima 18cm.".to_string(),
            kind: RuleKind::Accessibility,
            preconditions: vec![Condition::new("element_type", Operator::Equals, "escalera")],
            conditions: vec![
                Condition::new("tread", Operator::GreaterEqual, 28),
                Condition::new("riser", Operator::LessEqual, 18),
            ],
            actions: vec![Action::new(
                "Las dimensiones de la escalera no cumplen con los requisitos mínimos",
                Severity::Medium,
                Citation::new("DB-SU", "Artículo 2.2"),
            )
            .with_suggestion("Ajustar huella (mín. 28cm) y contrahuella (máx. 18cm)")],
            applicable_uses: uses(&["general"]),
            madrid_specific: false,
            priority: 2,
            enabled: true,
        },
        Rule {
            rule_id: "ACC-001".to_string(),
            name: "Ancho mínimo de puertas accesibles".to_string(),
            description: "Las puertas en itinerarios accesibles deben tener ancho mínimo \
                          de 0.8m."
                .to_string(),
            kind: RuleKind::Accessibility,
            preconditions: vec![Condition::new("door_type", Operator::Equals, "accesible")],
            conditions: vec![Condition::new("door_width", Operator::GreaterEqual, 0.8)],
            actions: vec![Action::new(
                "El ancho de puerta accesible es insuficiente (mín. 0.8m)",
                Severity::High,
                Citation::new("DB-SU", "Artículo 2.1"),
            )
            .with_suggestion("Aumentar el ancho de puerta a mínimo 0.8m")],
            applicable_uses: uses(&["general"]),
            madrid_specific: false,
            priority: 1,
            enabled: true,
        },
        Rule {
            rule_id: "ACC-002".to_string(),
            name: "Altura de pasamanos".to_string(),
            description: "Los pasamanos deben situarse entre 90 y 100cm de altura.".to_string(),
            kind: RuleKind::Accessibility,
            preconditions: vec![Condition::new("element_type", Operator::Equals, "pasamanos")],
            conditions: vec![Condition::new(
                "handrail_height",
                Operator::InRange,
                serde_json::json!([90, 100]),
            )],
            actions: vec![Action::new(
                "La altura del pasamanos debe estar entre 90-100cm",
                Severity::Medium,
                Citation::new("DB-SU", "Artículo 2.3"),
            )
            .with_suggestion("Ajustar la altura del pasamanos a 90-100cm")],
            applicable_uses: uses(&["general"]),
            madrid_specific: false,
            priority: 2,
            enabled: true,
        },
        // ---------------- DB-HE: ahorro de energía ----------------------
        Rule {
            rule_id: "DB-HE-001".to_string(),
            name: "Transmitancia térmica de cerramientos".to_string(),
            description: "Los cerramientos no pueden superar 0.57 W/m²K de transmitancia."
                .to_string(),
            kind: RuleKind::EnergyEfficiency,
            preconditions: vec![Condition::new(
                "element_type",
                Operator::In,
                serde_json::json!(["muro", "cubierta", "suelo"]),
            )],
            conditions: vec![Condition::new(
                "thermal_transmittance",
                Operator::LessEqual,
                0.57,
            )],
            actions: vec![Action::new(
                "La transmitancia térmica excede el límite permitido",
                Severity::High,
                Citation::new("DB-HE", "Artículo 2.1"),
            )
            .with_suggestion("Mejorar el aislamiento térmico del cerramiento")],
            applicable_uses: uses(RESIDENTIAL_TERTIARY),
            madrid_specific: false,
            priority: 1,
            enabled: true,
        },
        Rule {
            rule_id: "DB-HE-002".to_string(),
            name: "Demanda energética del edificio".to_string(),
            description: "La demanda energética no puede superar 30 kWh/m² año.".to_string(),
            kind: RuleKind::EnergyEfficiency,
            preconditions: vec![Condition::new("energy_demand", Operator::GreaterEqual, 0)],
            conditions: vec![Condition::new("energy_demand", Operator::LessEqual, 30.0)],
            actions: vec![Action::new(
                "La demanda energética excede el límite máximo permitido",
                Severity::High,
                Citation::new("DB-HE", "Artículo 3.1"),
            )
            .with_suggestion("Mejorar la eficiencia energética del edificio")],
            applicable_uses: uses(RESIDENTIAL_TERTIARY),
            madrid_specific: false,
            priority: 1,
            enabled: true,
        },
        Rule {
            rule_id: "ENERGY-001".to_string(),
            name: "Instalaciones térmicas eficientes".to_string(),
            description: "Las instalaciones térmicas deben declarar su eficiencia.".to_string(),
            kind: RuleKind::Installation,
            preconditions: vec![],
            conditions: vec![Condition::new(
                "thermal_installations",
                Operator::Contains,
                "eficiente",
            )],
            actions: vec![Action::new(
                "Falta información sobre eficiencia de instalaciones térmicas",
                Severity::Medium,
                Citation::new("DB-HE", "Artículo 4.1"),
            )
            .with_suggestion("Incluir especificaciones de eficiencia energética")],
            applicable_uses: uses(RESIDENTIAL_TERTIARY),
            madrid_specific: false,
            priority: 2,
            enabled: true,
        },
        // ---------------- Ordenanzas de Madrid ---------------------------
        Rule {
            rule_id: "MAD-001".to_string(),
            name: "Ascensor requerido en Madrid".to_string(),
            description: "Los edificios de más de 2 plantas requieren ascensor en Madrid."
                .to_string(),
            kind: RuleKind::Accessibility,
            preconditions: vec![Condition::new("floors", Operator::GreaterThan, 2)],
            conditions: vec![Condition::new("elevator", Operator::Contains, "ascensor")],
            actions: vec![Action::new(
                "Se requiere ascensor para edificios de más de 2 plantas en Madrid",
                Severity::High,
                Citation::new("Ordenanza de Accesibilidad de Madrid", "Artículo 6"),
            )
            .with_suggestion("Instalar ascensor accesible")],
            applicable_uses: uses(RESIDENTIAL_TERTIARY),
            madrid_specific: true,
            priority: 1,
            enabled: true,
        },
        Rule {
            rule_id: "MAD-002".to_string(),
            name: "Aislamiento acústico en Madrid".to_string(),
            description: "Madrid requiere especificaciones de aislamiento acústico."
                .to_string(),
            kind: RuleKind::Material,
            preconditions: vec![],
            conditions: vec![Condition::new(
                "acoustic_insulation",
                Operator::Contains,
                "aislamiento",
            )],
            actions: vec![Action::new(
                "Falta información de aislamiento acústico requerida en Madrid",
                Severity::Medium,
                Citation::new("Ordenanza de Ruido de Madrid", "Artículo 14"),
            )
            .with_suggestion("Incluir especificaciones de aislamiento acústico")],
            applicable_uses: uses(RESIDENTIAL_TERTIARY),
            madrid_specific: true,
            priority: 2,
            enabled: true,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::engine::RuleEngine;
    use serde_json::json;

    #[test]
    fn test_builtin_catalog_size_and_ids() {
        let catalog = RuleCatalog::builtin();
        assert_eq!(catalog.rules().len(), 13);
        for id in [
            "DB-SI-001", "DB-SI-002", "DB-SU-001", "DB-SU-002", "DB-HE-001", "DB-HE-002",
            "MAD-001", "MAD-002", "ACC-001", "ACC-002", "FIRE-001", "FIRE-002", "ENERGY-001",
        ] {
            assert!(catalog.get(id).is_some(), "missing rule {id}");
        }
    }

    #[test]
    fn test_every_builtin_rule_validates() {
        for rule in RuleCatalog::builtin().rules() {
            assert!(validate_rule(rule).is_ok(), "rule {}", rule.rule_id);
        }
    }

    #[test]
    fn test_every_builtin_action_has_citation() {
        for rule in RuleCatalog::builtin().rules() {
            for action in &rule.actions {
                assert!(action.citation.is_complete(), "rule {}", rule.rule_id);
            }
        }
    }

    #[test]
    fn test_yaml_round_trip() {
        let catalog = RuleCatalog::builtin();
        let yaml = catalog.to_yaml().unwrap();
        let loaded = RuleCatalog::from_yaml(&yaml).unwrap();
        assert_eq!(loaded.rules(), catalog.rules());
    }

    #[test]
    fn test_unknown_operator_fails_at_load_time() {
        let mut yaml = RuleCatalog::builtin().to_yaml().unwrap();
        yaml = yaml.replacen("greater_equal", "at_least", 1);
        let err = RuleCatalog::from_yaml(&yaml).unwrap_err();
        match err {
            crate::error::EngineError::Rule(RuleError::UnknownOperator { operator }) => {
                assert_eq!(operator, "at_least");
            }
            other => panic!("expected UnknownOperator, got {other}"),
        }
    }

    #[test]
    fn test_missing_citation_fails_at_load_time() {
        let mut rule = RuleCatalog::builtin().get("ACC-001").unwrap().clone();
        rule.actions[0].citation.section = String::new();
        let mut catalog = RuleCatalog::builtin();
        let err = catalog.add(rule).unwrap_err();
        assert!(matches!(err, RuleError::MissingCitation { .. }));
    }

    #[test]
    fn test_rule_without_conditions_is_malformed() {
        let mut rule = RuleCatalog::builtin().get("ACC-001").unwrap().clone();
        rule.conditions.clear();
        assert!(matches!(
            validate_rule(&rule),
            Err(RuleError::MalformedRule { .. })
        ));
    }

    #[test]
    fn test_mad_001_elevator_requirement() {
        let catalog = RuleCatalog::builtin();
        let engine = RuleEngine::new();

        let three_floors_no_elevator = json!({
            "building_use": "residencial",
            "location": "Madrid",
            "floors": 3
        });
        let results = engine.evaluate(catalog.rules(), &three_floors_no_elevator);
        let mad = results.iter().find(|r| r.rule_id == "MAD-001").unwrap();
        assert!(!mad.passed);
        assert!(mad.issues[0].citation.document.contains("Accesibilidad"));

        let with_elevator = json!({
            "building_use": "residencial",
            "location": "Madrid",
            "floors": 3,
            "elevator": "ascensor accesible"
        });
        let results = engine.evaluate(catalog.rules(), &with_elevator);
        assert!(results.iter().find(|r| r.rule_id == "MAD-001").unwrap().passed);

        // Two floors: the elevator requirement is out of scope.
        let two_floors = json!({
            "building_use": "residencial",
            "location": "Madrid",
            "floors": 2
        });
        let results = engine.evaluate(catalog.rules(), &two_floors);
        assert!(!results.iter().any(|r| r.rule_id == "MAD-001"));
    }

    #[test]
    fn test_ramp_slope_rule() {
        let catalog = RuleCatalog::builtin();
        let engine = RuleEngine::new();
        let context = json!({
            "building_use": "residencial",
            "element_type": "rampa",
            "slope": 10.0
        });
        let results = engine.evaluate(catalog.rules(), &context);
        let rule = results.iter().find(|r| r.rule_id == "DB-SU-001").unwrap();
        assert!(!rule.passed);
        assert_eq!(rule.issues[0].citation.to_string(), "DB-SU Artículo 2.1");
    }
}
