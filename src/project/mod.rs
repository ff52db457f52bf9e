//! Typed project record
//!
//! The project record arrives from the intake layer as loosely shaped JSON.
//! This module validates it once at the boundary into an explicit schema so
//! the detector, session and verifier operate on typed values instead of
//! untyped key lookups.
//!
//! Invalid enumeration values are deliberately preserved (`UseTag::Unknown`)
//! rather than rejected: flagging them is the ambiguity detector's job, not
//! the deserializer's.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{ProjectError, ProjectResult};

// ============================================================================
// Building uses
// ============================================================================

/// Closed enumeration of valid PGOUM building uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BuildingUse {
    #[serde(rename = "residencial")]
    Residencial,
    #[serde(rename = "industrial")]
    Industrial,
    #[serde(rename = "garaje-aparcamiento")]
    GarajeAparcamiento,
    #[serde(rename = "servicios_terciarios")]
    ServiciosTerciarios,
    #[serde(rename = "dotacional_zona_verde")]
    DotacionalZonaVerde,
    #[serde(rename = "dotacional_deportivo")]
    DotacionalDeportivo,
    #[serde(rename = "dotacional_equipamiento")]
    DotacionalEquipamiento,
    #[serde(rename = "dotacional_servicios_publicos")]
    DotacionalServiciosPublicos,
    #[serde(rename = "dotacional_administracion_publica")]
    DotacionalAdministracionPublica,
    #[serde(rename = "dotacional_infraestructural")]
    DotacionalInfraestructural,
    #[serde(rename = "dotacional_via_publica")]
    DotacionalViaPublica,
    #[serde(rename = "dotacional_transporte")]
    DotacionalTransporte,
}

impl BuildingUse {
    /// All valid uses, in PGOUM listing order.
    pub const ALL: [BuildingUse; 12] = [
        BuildingUse::Residencial,
        BuildingUse::Industrial,
        BuildingUse::GarajeAparcamiento,
        BuildingUse::ServiciosTerciarios,
        BuildingUse::DotacionalZonaVerde,
        BuildingUse::DotacionalDeportivo,
        BuildingUse::DotacionalEquipamiento,
        BuildingUse::DotacionalServiciosPublicos,
        BuildingUse::DotacionalAdministracionPublica,
        BuildingUse::DotacionalInfraestructural,
        BuildingUse::DotacionalViaPublica,
        BuildingUse::DotacionalTransporte,
    ];

    /// Canonical wire tag for this use.
    pub fn as_tag(&self) -> &'static str {
        match self {
            BuildingUse::Residencial => "residencial",
            BuildingUse::Industrial => "industrial",
            BuildingUse::GarajeAparcamiento => "garaje-aparcamiento",
            BuildingUse::ServiciosTerciarios => "servicios_terciarios",
            BuildingUse::DotacionalZonaVerde => "dotacional_zona_verde",
            BuildingUse::DotacionalDeportivo => "dotacional_deportivo",
            BuildingUse::DotacionalEquipamiento => "dotacional_equipamiento",
            BuildingUse::DotacionalServiciosPublicos => "dotacional_servicios_publicos",
            BuildingUse::DotacionalAdministracionPublica => "dotacional_administracion_publica",
            BuildingUse::DotacionalInfraestructural => "dotacional_infraestructural",
            BuildingUse::DotacionalViaPublica => "dotacional_via_publica",
            BuildingUse::DotacionalTransporte => "dotacional_transporte",
        }
    }

    /// Parse a canonical tag. Synonym-tolerant parsing lives in the session
    /// analyzers; this accepts only exact tags.
    pub fn from_tag(tag: &str) -> Option<Self> {
        BuildingUse::ALL.iter().copied().find(|u| u.as_tag() == tag)
    }
}

impl fmt::Display for BuildingUse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_tag())
    }
}

/// A building-use tag as it arrived at the boundary.
///
/// Unknown values are preserved so the ambiguity detector can flag them;
/// downstream code that needs a valid use matches on `Known`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum UseTag {
    Known(BuildingUse),
    Unknown(String),
}

impl UseTag {
    pub fn known(&self) -> Option<BuildingUse> {
        match self {
            UseTag::Known(use_) => Some(*use_),
            UseTag::Unknown(_) => None,
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, UseTag::Known(_))
    }

    pub fn as_str(&self) -> &str {
        match self {
            UseTag::Known(use_) => use_.as_tag(),
            UseTag::Unknown(raw) => raw,
        }
    }
}

impl From<String> for UseTag {
    fn from(raw: String) -> Self {
        match BuildingUse::from_tag(&raw) {
            Some(use_) => UseTag::Known(use_),
            None => UseTag::Unknown(raw),
        }
    }
}

impl From<UseTag> for String {
    fn from(tag: UseTag) -> Self {
        tag.as_str().to_string()
    }
}

impl From<BuildingUse> for UseTag {
    fn from(use_: BuildingUse) -> Self {
        UseTag::Known(use_)
    }
}

impl fmt::Display for UseTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Floors
// ============================================================================

/// A floor reference as provided by the intake layer: either already numeric
/// or a free-text description awaiting resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FloorRef {
    Number(f64),
    Text(String),
}

impl FloorRef {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            FloorRef::Number(n) => Some(*n),
            FloorRef::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FloorRef::Text(t) => Some(t),
            FloorRef::Number(_) => None,
        }
    }
}

// ============================================================================
// Project
// ============================================================================

/// A secondary use of the building and the floors it occupies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecondaryUse {
    pub use_type: UseTag,
    #[serde(default)]
    pub floors: Vec<FloorRef>,
}

impl SecondaryUse {
    pub fn new(use_type: impl Into<UseTag>, floors: Vec<FloorRef>) -> Self {
        Self {
            use_type: use_type.into(),
            floors,
        }
    }
}

/// Structured project attributes for a verification run.
///
/// Required fields are `Option` so a missing value survives the boundary and
/// is reported by the detector as an `IncompleteData` ambiguity instead of a
/// deserialization failure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Project {
    #[serde(default)]
    pub project_id: Option<String>,

    #[serde(default)]
    pub is_existing_building: Option<bool>,

    #[serde(default)]
    pub primary_use: Option<UseTag>,

    #[serde(default)]
    pub has_secondary_uses: Option<bool>,

    #[serde(default)]
    pub secondary_uses: Vec<SecondaryUse>,

    /// Uploaded file names (memoria, planos, ...).
    #[serde(default)]
    pub files: Vec<String>,

    /// Municipality, used for jurisdiction-specific rules.
    #[serde(default)]
    pub location: Option<String>,

    /// Set when a mixed-use resolution confirms the building is mixed.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_mixed_use: bool,

    /// Set when the user promises files after a document ambiguity.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub files_pending: bool,

    /// Measured attributes consumed by rule conditions (door_width, slope,
    /// height, ...). Kept as JSON since the rule engine addresses them by
    /// dot-path.
    #[serde(default)]
    pub attributes: Map<String, Value>,
}

impl Project {
    /// Validate a loosely shaped JSON record into a typed project.
    ///
    /// Unrecognized top-level keys are folded into `attributes` so measured
    /// values stay reachable for rule evaluation.
    pub fn from_value(value: Value) -> ProjectResult<Self> {
        let Value::Object(map) = value else {
            return Err(ProjectError::NotAnObject);
        };

        let mut project = Project::default();
        for (key, value) in map {
            match key.as_str() {
                "project_id" => project.project_id = opt_string(&key, value)?,
                "is_existing_building" => project.is_existing_building = opt_bool(&key, value)?,
                "primary_use" => {
                    project.primary_use = opt_string(&key, value)?.map(UseTag::from);
                }
                "has_secondary_uses" => project.has_secondary_uses = opt_bool(&key, value)?,
                "secondary_uses" => {
                    project.secondary_uses = serde_json::from_value(value).map_err(|_| {
                        ProjectError::FieldType {
                            field: key,
                            expected: "array of {use_type, floors}".to_string(),
                        }
                    })?;
                }
                "files" => {
                    project.files =
                        serde_json::from_value(value).map_err(|_| ProjectError::FieldType {
                            field: key,
                            expected: "array of strings".to_string(),
                        })?;
                }
                "location" => project.location = opt_string(&key, value)?,
                "is_mixed_use" => project.is_mixed_use = opt_bool(&key, value)?.unwrap_or(false),
                "files_pending" => project.files_pending = opt_bool(&key, value)?.unwrap_or(false),
                _ => {
                    project.attributes.insert(key, value);
                }
            }
        }

        Ok(project)
    }

    /// Whether the project is located in Madrid (jurisdiction gate for
    /// Madrid-specific rules).
    pub fn is_in_madrid(&self) -> bool {
        self.location
            .as_deref()
            .is_some_and(|loc| loc.to_lowercase().contains("madrid"))
    }

    /// Flatten the project into the key-path context the rule engine
    /// evaluates conditions against.
    pub fn to_rule_context(&self) -> Value {
        let mut ctx = self.attributes.clone();
        if let Some(use_) = &self.primary_use {
            ctx.insert(
                "building_use".to_string(),
                Value::String(use_.as_str().to_string()),
            );
            ctx.insert(
                "primary_use".to_string(),
                Value::String(use_.as_str().to_string()),
            );
        }
        if let Some(location) = &self.location {
            ctx.insert("location".to_string(), Value::String(location.clone()));
        }
        if let Some(existing) = self.is_existing_building {
            ctx.insert("is_existing_building".to_string(), Value::Bool(existing));
        }
        Value::Object(ctx)
    }
}

fn opt_string(field: &str, value: Value) -> ProjectResult<Option<String>> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s)),
        _ => Err(ProjectError::FieldType {
            field: field.to_string(),
            expected: "string".to_string(),
        }),
    }
}

fn opt_bool(field: &str, value: Value) -> ProjectResult<Option<bool>> {
    match value {
        Value::Null => Ok(None),
        Value::Bool(b) => Ok(Some(b)),
        _ => Err(ProjectError::FieldType {
            field: field.to_string(),
            expected: "boolean".to_string(),
        }),
    }
}
