//! Normative document corpus
//!
//! The verifier resolves its applicable normative corpus through the
//! `NormativeProvider` trait so a document store can be plugged in; the
//! bundled static provider covers the CTE and PGOUM document families.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::EngineResult;
use crate::project::Project;

/// A citation into a normative document attached to a verification item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormativeReference {
    pub document_name: String,
    pub document_category: String,
    #[serde(default)]
    pub page_number: u32,
    pub section_title: String,
    #[serde(default)]
    pub section_content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub building_type: Option<String>,
}

/// Source of applicable normative documents for a project.
#[async_trait]
pub trait NormativeProvider: Send + Sync {
    /// Documents applicable to the project's primary and secondary uses.
    async fn applicable_documents(&self, project: &Project)
        -> EngineResult<Vec<NormativeReference>>;
}

/// Built-in corpus index: the CTE basic documents plus one PGOUM volume per
/// building use. Content fields are left empty; a real document store fills
/// them in.
#[derive(Debug, Default)]
pub struct StaticNormativeProvider;

impl StaticNormativeProvider {
    fn corpus() -> Vec<NormativeReference> {
        let doc = |name: &str, category: &str, title: &str, building_type: Option<&str>| {
            NormativeReference {
                document_name: name.to_string(),
                document_category: category.to_string(),
                page_number: 0,
                section_title: title.to_string(),
                section_content: String::new(),
                building_type: building_type.map(str::to_string),
            }
        };
        vec![
            doc("CTE_DBHE", "cte", "Ahorro de energía", None),
            doc("CTE_DBSI", "cte", "Seguridad en caso de incendio", None),
            doc("CTE_DBSUA", "cte", "Seguridad de utilización y accesibilidad", None),
            doc(
                "PGOUM_residencial",
                "pgoum",
                "Normas para uso residencial",
                Some("residencial"),
            ),
            doc(
                "PGOUM_industrial",
                "pgoum",
                "Normas para uso industrial",
                Some("industrial"),
            ),
            doc(
                "PGOUM_garaje-aparcamiento",
                "pgoum",
                "Normas para garaje-aparcamiento",
                Some("garaje-aparcamiento"),
            ),
            doc(
                "PGOUM_servicios_terciarios",
                "pgoum",
                "Normas para servicios terciarios",
                Some("servicios_terciarios"),
            ),
        ]
    }
}

#[async_trait]
impl NormativeProvider for StaticNormativeProvider {
    async fn applicable_documents(
        &self,
        project: &Project,
    ) -> EngineResult<Vec<NormativeReference>> {
        let mut uses: Vec<String> = Vec::new();
        if let Some(primary) = &project.primary_use {
            uses.push(primary.as_str().to_string());
        }
        for secondary in &project.secondary_uses {
            uses.push(secondary.use_type.as_str().to_string());
        }

        // CTE documents always apply; PGOUM volumes only for declared uses.
        Ok(Self::corpus()
            .into_iter()
            .filter(|doc| match &doc.building_type {
                None => true,
                Some(bt) => uses.iter().any(|u| u == bt),
            })
            .collect())
    }
}
