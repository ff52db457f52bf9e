//! End-to-end flows: detection → guided clarification → compliance
//! verification, exercised through the public crate surface only.

use serde_json::json;

use madrid_compliance::ambiguity::Severity;
use madrid_compliance::floors::{self, FloorResolver};
use madrid_compliance::project::Project;
use madrid_compliance::rules::{Action, Citation, Condition, Operator, Rule, RuleEngine, RuleKind};
use madrid_compliance::session::SessionRegistry;
use madrid_compliance::verify::{StaticNormativeProvider, VerificationStatus};
use madrid_compliance::{
    AmbiguityDetector, ComplianceVerifier, EngineConfig, RuleCatalog, SessionEngine, SessionState,
};

fn detector() -> AmbiguityDetector {
    AmbiguityDetector::new(EngineConfig::default())
}

#[test]
fn duplicated_primary_use_is_flagged_medium() {
    let project = Project::from_value(json!({
        "project_id": "E2E-1",
        "is_existing_building": true,
        "primary_use": "residencial",
        "has_secondary_uses": true,
        "secondary_uses": [
            {"use_type": "residencial", "floors": ["Planta Segunda"]}
        ],
        "files": ["memoria.pdf", "planos.pdf"]
    }))
    .unwrap();

    let items = detector().detect(&project);
    assert!(items
        .iter()
        .any(|i| i.id.starts_with("duplicate_primary_use") && i.severity == Severity::Medium));
    assert!(items.iter().all(|i| i.severity < Severity::Critical));
}

#[test]
fn basement_text_round_trips_through_resolver() {
    let resolver = FloorResolver::new();
    assert_eq!(resolver.resolve("Sótano 2"), Some(-2.0));
    assert_eq!(floors::label(-2.0), "Sótano 2");
}

#[test]
fn narrow_door_fails_accessibility_rule_with_citation() {
    let rule = Rule {
        rule_id: "door_min_width".to_string(),
        name: "Anchura mínima de puerta".to_string(),
        description: "Las puertas accesibles deben tener al menos 0,80 m de paso libre"
            .to_string(),
        kind: RuleKind::Accessibility,
        preconditions: vec![],
        conditions: vec![Condition::new("door_width", Operator::GreaterEqual, json!(0.8))],
        actions: vec![Action::new(
            "Anchura de puerta insuficiente para itinerario accesible",
            Severity::High,
            Citation::new("CTE DB-SUA", "Artículo 4.2.1"),
        )],
        applicable_uses: vec!["general".to_string()],
        madrid_specific: false,
        priority: 1,
        enabled: true,
    };

    let engine = RuleEngine::new();
    let results = engine.evaluate(&[rule], &json!({"door_width": 0.6}));
    assert_eq!(results.len(), 1);
    assert!(!results[0].passed);
    assert_eq!(results[0].violations.len(), 1);
    assert!(results[0]
        .issues
        .iter()
        .any(|issue| issue.citation.document.contains("DB-SUA")));
}

#[test]
fn missing_files_is_critical_before_any_rule_runs() {
    let project = Project::from_value(json!({
        "project_id": "E2E-4",
        "is_existing_building": true,
        "primary_use": "residencial",
        "has_secondary_uses": false
    }))
    .unwrap();

    let items = detector().detect(&project);
    let files = items.iter().find(|i| i.id == "files_missing").unwrap();
    assert_eq!(files.severity, Severity::Critical);
    assert!(!files.suggested_questions.is_empty());
    // Critical items sort to the front so they are asked about first.
    assert_eq!(items[0].severity, Severity::Critical);
}

#[tokio::test]
async fn clarified_project_flows_into_verification() {
    let engine = SessionEngine::new(EngineConfig::default());
    let project = Project::from_value(json!({
        "project_id": "E2E-5",
        "is_existing_building": true,
        "has_secondary_uses": false,
        "files": ["memoria.pdf", "planos.pdf"],
        "location": "Madrid, Calle Mayor 1",
        "door_width": 0.9,
        "ramp_slope": 5.0,
        "corridor_width": 1.4,
        "habitable_room_area": 11.0,
        "evacuation_distance": 10.0,
        "thermal_installations": "aerotermia eficiente",
        "acoustic_insulation": "aislamiento acustico"
    }))
    .unwrap();

    let mut session = engine.start(project);
    assert_eq!(session.state, SessionState::Resolving);
    engine.handle_message(&mut session, "vivienda").await.unwrap();
    assert_eq!(session.state, SessionState::Completed);
    assert_eq!(
        session.project.primary_use.as_ref().unwrap().as_str(),
        "residencial"
    );

    let verifier =
        ComplianceVerifier::new(Box::new(StaticNormativeProvider), RuleCatalog::builtin());
    let result = verifier.verify(&session.project).await.unwrap();
    assert!(result.total_items > 0);
    assert_eq!(result.project_id, "E2E-5");
    // Nothing measured is out of bounds; height and surface stay partial.
    assert_eq!(result.non_compliant_items, 0, "items: {:#?}", result.items);
    assert_ne!(result.overall_status, VerificationStatus::Error);
}

#[tokio::test]
async fn registry_routes_a_session_to_completion() {
    let engine = SessionEngine::new(EngineConfig::default());
    let registry = SessionRegistry::new(&EngineConfig::default());
    let project = Project::from_value(json!({
        "project_id": "E2E-6",
        "is_existing_building": true,
        "has_secondary_uses": false,
        "files": ["memoria.pdf", "planos.pdf"]
    }))
    .unwrap();

    let id = registry.insert(engine.start(project)).await;
    registry
        .handle_message(&engine, id, "garaje-aparcamiento")
        .await
        .unwrap();

    let session = registry.remove(id).await.unwrap();
    assert_eq!(session.state, SessionState::Completed);
    assert_eq!(session.resolutions.len(), 1);
    assert!(session.accounting_holds());
}
