//! Compliance verification
//!
//! `ComplianceVerifier` ties the pieces together: it resolves the applicable
//! normative corpus, instantiates verification items from the per-use
//! templates (primary use plus one suffixed set per secondary use), runs each
//! item's category routine, evaluates the rule catalog, and aggregates
//! everything into a single auditable verdict. Verification is a pure
//! read+compute step over the project record.

pub mod checks;
pub mod normative;
pub mod templates;
pub mod types;

use chrono::Utc;
use tracing::{info, instrument};

use crate::ambiguity::Severity;
use crate::error::EngineResult;
use crate::project::{BuildingUse, Project};
use crate::rules::{RuleCatalog, RuleEngine, RuleEvaluationResult};

pub use normative::{NormativeProvider, NormativeReference, StaticNormativeProvider};
pub use types::{
    aggregate_status, CheckCategory, VerificationItem, VerificationResult, VerificationStatus,
};

use templates::{templates_for, ItemTemplate};

/// Orchestrates template checks and rule evaluation into one verdict.
pub struct ComplianceVerifier {
    normative: Box<dyn NormativeProvider>,
    catalog: RuleCatalog,
    engine: RuleEngine,
}

impl ComplianceVerifier {
    pub fn new(normative: Box<dyn NormativeProvider>, catalog: RuleCatalog) -> Self {
        Self {
            normative,
            catalog,
            engine: RuleEngine::new(),
        }
    }

    /// Verify a project against templates and the rule catalog.
    #[instrument(skip_all, fields(project_id = project.project_id.as_deref().unwrap_or("unknown")))]
    pub async fn verify(&self, project: &Project) -> EngineResult<VerificationResult> {
        let corpus = self.normative.applicable_documents(project).await?;

        let mut items = Vec::new();

        // Template items for the primary use, then one suffixed set per
        // secondary use.
        if let Some(primary) = project.primary_use.as_ref().and_then(|t| t.known()) {
            for template in templates_for(primary) {
                items.push(self.instantiate(template, primary, None, &corpus, project));
            }
        }
        for secondary in &project.secondary_uses {
            let Some(use_) = secondary.use_type.known() else {
                continue;
            };
            for template in templates_for(use_) {
                items.push(self.instantiate(template, use_, Some(use_), &corpus, project));
            }
        }

        // Rule catalog evaluation feeds additional items.
        let context = project.to_rule_context();
        for result in self.engine.evaluate(self.catalog.rules(), &context) {
            items.push(self.rule_item(&result));
        }

        let overall_status = aggregate_status(&items);
        let count = |status: VerificationStatus| items.iter().filter(|i| i.status == status).count();
        let compliant_items = count(VerificationStatus::Compliant);
        let non_compliant_items = count(VerificationStatus::NonCompliant);
        let partial_items = count(VerificationStatus::Partial);
        let error_items = count(VerificationStatus::Error);
        let total_items = items.len();
        let compliance_percentage = if total_items == 0 {
            0.0
        } else {
            compliant_items as f64 / total_items as f64 * 100.0
        };

        let project_id = project
            .project_id
            .clone()
            .unwrap_or_else(|| "unknown".to_string());
        let completed_at = Utc::now();
        let verification_id = format!(
            "VER_{project_id}_{}",
            completed_at.format("%Y%m%d_%H%M%S")
        );
        let summary = format!(
            "{total_items} comprobaciones: {compliant_items} conformes, \
             {non_compliant_items} no conformes, {partial_items} parciales"
        );

        info!(
            verification_id,
            ?overall_status,
            compliance_percentage,
            "verification finished"
        );
        Ok(VerificationResult {
            project_id,
            verification_id,
            overall_status,
            compliance_percentage,
            total_items,
            compliant_items,
            non_compliant_items,
            partial_items,
            error_items,
            items,
            summary,
            completed_at,
        })
    }

    fn instantiate(
        &self,
        template: &ItemTemplate,
        use_: BuildingUse,
        secondary: Option<BuildingUse>,
        corpus: &[NormativeReference],
        project: &Project,
    ) -> VerificationItem {
        let (item_id, title) = match secondary {
            None => (template.id.to_string(), template.title.to_string()),
            Some(s) => (
                format!("{}_sec_{s}", template.id),
                format!("{} (Uso secundario: {s})", template.title),
            ),
        };
        let normative_references = template
            .normative_refs
            .iter()
            .filter_map(|name| {
                corpus
                    .iter()
                    .find(|doc| doc.document_name.contains(name))
                    .cloned()
            })
            .collect();

        let outcome = checks::run_check(template.category, use_, project);
        VerificationItem {
            item_id,
            title,
            description: template.description.to_string(),
            category: template.category,
            status: outcome.status,
            severity: template.severity,
            normative_references,
            notes: outcome.notes,
        }
    }

    /// Fold one rule evaluation into a verification item carrying the
    /// violated actions' citations.
    fn rule_item(&self, result: &RuleEvaluationResult) -> VerificationItem {
        let rule = self.catalog.get(&result.rule_id);
        let severity = result
            .issues
            .iter()
            .map(|i| i.severity)
            .max()
            .unwrap_or(Severity::Medium);

        let mut notes = result.violations.clone();
        notes.extend(result.suggestions.iter().cloned());
        let normative_references = result
            .issues
            .iter()
            .map(|issue| NormativeReference {
                document_name: issue.citation.document.clone(),
                document_category: "rule".to_string(),
                page_number: 0,
                section_title: issue.citation.section.clone(),
                section_content: issue.message.clone(),
                building_type: None,
            })
            .collect();

        VerificationItem {
            item_id: format!("rule_{}", result.rule_id),
            title: rule.map(|r| r.name.clone()).unwrap_or_else(|| result.rule_id.clone()),
            description: rule.map(|r| r.description.clone()).unwrap_or_default(),
            category: CheckCategory::Generic,
            status: if result.passed {
                VerificationStatus::Compliant
            } else {
                VerificationStatus::NonCompliant
            },
            severity,
            normative_references,
            notes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn verifier() -> ComplianceVerifier {
        ComplianceVerifier::new(Box::new(StaticNormativeProvider), RuleCatalog::builtin())
    }

    fn residential_project() -> Project {
        Project::from_value(json!({
            "project_id": "P-100",
            "is_existing_building": false,
            "primary_use": "residencial",
            "has_secondary_uses": true,
            "secondary_uses": [
                {"use_type": "garaje-aparcamiento", "floors": [-1.0]}
            ],
            "files": ["memoria.pdf", "planos.pdf"],
            "location": "Madrid",
            "height": 21.0,
            "floors": 6,
            "surface_per_unit": 60.0,
            "ventilation": "mecanica de doble flujo",
            "door_width": 0.9,
            "ramp_slope": 6.0,
            "corridor_width": 1.3,
            "habitable_room_area": 12.0,
            "evacuation_distance": 12.0,
            "fire_resistance": "RF-120",
            "elevator": "ascensor accesible",
            "acoustic_insulation": "aislamiento acustico reforzado",
            "thermal_installations": "bomba de calor eficiente",
            "energy_demand": 22.0
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_verification_builds_primary_and_secondary_items() {
        let result = verifier().verify(&residential_project()).await.unwrap();

        // 5 residential + 4 garage templates plus rule items.
        let template_items: Vec<&VerificationItem> = result
            .items
            .iter()
            .filter(|i| !i.item_id.starts_with("rule_"))
            .collect();
        assert_eq!(template_items.len(), 9);
        assert!(result
            .items
            .iter()
            .any(|i| i.item_id == "gar_03_sec_garaje-aparcamiento"));
        assert!(result
            .items
            .iter()
            .any(|i| i.title.contains("Uso secundario: garaje-aparcamiento")));
    }

    #[tokio::test]
    async fn test_fully_measured_project_has_no_violations() {
        let result = verifier().verify(&residential_project()).await.unwrap();
        assert_eq!(result.non_compliant_items, 0, "items: {:#?}", result.items);
        assert_eq!(result.error_items, 0);
        // res_03 and generic garage items stay pending (manual review).
        assert_eq!(result.overall_status, VerificationStatus::Pending);
        assert!(result.compliance_percentage > 0.0);
    }

    #[tokio::test]
    async fn test_height_violation_drives_overall_status() {
        let mut project = residential_project();
        project
            .attributes
            .insert("height".to_string(), json!(45.0));

        let result = verifier().verify(&project).await.unwrap();
        assert_eq!(result.overall_status, VerificationStatus::NonCompliant);
        let res01 = result.items.iter().find(|i| i.item_id == "res_01").unwrap();
        assert_eq!(res01.status, VerificationStatus::NonCompliant);
    }

    #[tokio::test]
    async fn test_missing_elevator_raises_cited_rule_item() {
        let mut project = residential_project();
        project.attributes.remove("elevator");

        let result = verifier().verify(&project).await.unwrap();
        let item = result
            .items
            .iter()
            .find(|i| i.item_id == "rule_MAD-001")
            .unwrap();
        assert_eq!(item.status, VerificationStatus::NonCompliant);
        assert!(item.normative_references[0]
            .document_name
            .contains("Accesibilidad"));
    }

    #[tokio::test]
    async fn test_verification_does_not_mutate_project() {
        let project = residential_project();
        let snapshot = project.clone();
        let _ = verifier().verify(&project).await.unwrap();
        assert_eq!(project, snapshot);
    }

    #[tokio::test]
    async fn test_items_carry_normative_references() {
        let result = verifier().verify(&residential_project()).await.unwrap();
        let res01 = result.items.iter().find(|i| i.item_id == "res_01").unwrap();
        let names: Vec<&str> = res01
            .normative_references
            .iter()
            .map(|r| r.document_name.as_str())
            .collect();
        assert!(names.contains(&"CTE_DBHE"));
        assert!(names.contains(&"PGOUM_residencial"));
    }

    #[tokio::test]
    async fn test_unknown_use_yields_rule_items_only() {
        let project = Project::from_value(json!({
            "project_id": "P-X",
            "primary_use": "dotacional_deportivo",
            "location": "Madrid"
        }))
        .unwrap();
        let result = verifier().verify(&project).await.unwrap();
        assert!(result
            .items
            .iter()
            .all(|i| i.item_id.starts_with("rule_")));
    }
}
