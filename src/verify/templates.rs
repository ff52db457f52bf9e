//! Verification item templates and domain thresholds
//!
//! One template set per building use, instantiated once for the primary use
//! and once per secondary use (with suffixed ids). Threshold tables mirror
//! the PGOUM limits per use.

use crate::ambiguity::Severity;
use crate::project::BuildingUse;
use crate::verify::types::CheckCategory;

/// Static description of one verification check.
pub struct ItemTemplate {
    pub id: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    pub category: CheckCategory,
    pub severity: Severity,
    /// Normative document names resolved against the provider's corpus.
    pub normative_refs: &'static [&'static str],
}

const RESIDENTIAL_TEMPLATES: &[ItemTemplate] = &[
    ItemTemplate {
        id: "res_01",
        title: "Altura máxima del edificio",
        description: "Verificar que la altura no exceda los límites establecidos",
        category: CheckCategory::Height,
        severity: Severity::Critical,
        normative_refs: &["CTE_DBHE", "PGOUM_residencial"],
    },
    ItemTemplate {
        id: "res_02",
        title: "Superficie útil mínima por vivienda",
        description: "Verificar superficie mínima según normativa",
        category: CheckCategory::Surface,
        severity: Severity::High,
        normative_refs: &["CTE_DBHE", "PGOUM_residencial"],
    },
    ItemTemplate {
        id: "res_03",
        title: "Iluminación natural en viviendas",
        description: "Verificar cumplimiento de iluminación natural",
        category: CheckCategory::Generic,
        severity: Severity::High,
        normative_refs: &["CTE_DBHE"],
    },
    ItemTemplate {
        id: "res_04",
        title: "Ventilación en viviendas",
        description: "Verificar sistema de ventilación adecuado",
        category: CheckCategory::Ventilation,
        severity: Severity::High,
        normative_refs: &["CTE_DBHE"],
    },
    ItemTemplate {
        id: "res_05",
        title: "Accesibilidad universal",
        description: "Verificar cumplimiento de accesibilidad",
        category: CheckCategory::Accessibility,
        severity: Severity::Critical,
        normative_refs: &["CTE_DBSUA"],
    },
];

const INDUSTRIAL_TEMPLATES: &[ItemTemplate] = &[
    ItemTemplate {
        id: "ind_01",
        title: "Distancia a viviendas",
        description: "Verificar distancias mínimas a zonas residenciales",
        category: CheckCategory::Generic,
        severity: Severity::Critical,
        normative_refs: &["PGOUM_industrial"],
    },
    ItemTemplate {
        id: "ind_02",
        title: "Emisiones y contaminación",
        description: "Verificar cumplimiento de límites de emisiones",
        category: CheckCategory::Generic,
        severity: Severity::Critical,
        normative_refs: &["PGOUM_industrial"],
    },
    ItemTemplate {
        id: "ind_03",
        title: "Seguridad contra incendios",
        description: "Verificar medidas de seguridad contra incendios",
        category: CheckCategory::FireSafety,
        severity: Severity::Critical,
        normative_refs: &["CTE_DBSI"],
    },
    ItemTemplate {
        id: "ind_04",
        title: "Accesos y circulación",
        description: "Verificar accesos para vehículos industriales",
        category: CheckCategory::Generic,
        severity: Severity::High,
        normative_refs: &["PGOUM_industrial"],
    },
];

const GARAGE_TEMPLATES: &[ItemTemplate] = &[
    ItemTemplate {
        id: "gar_01",
        title: "Dimensiones de plazas de aparcamiento",
        description: "Verificar dimensiones mínimas de plazas",
        category: CheckCategory::Surface,
        severity: Severity::High,
        normative_refs: &["PGOUM_garaje-aparcamiento"],
    },
    ItemTemplate {
        id: "gar_02",
        title: "Accesos y circulación vehicular",
        description: "Verificar accesos y circulación interna",
        category: CheckCategory::Generic,
        severity: Severity::High,
        normative_refs: &["PGOUM_garaje-aparcamiento"],
    },
    ItemTemplate {
        id: "gar_03",
        title: "Ventilación mecánica",
        description: "Verificar sistema de ventilación mecánica",
        category: CheckCategory::Ventilation,
        severity: Severity::Critical,
        normative_refs: &["CTE_DBHE"],
    },
    ItemTemplate {
        id: "gar_04",
        title: "Seguridad contra incendios",
        description: "Verificar medidas de seguridad contra incendios",
        category: CheckCategory::FireSafety,
        severity: Severity::Critical,
        normative_refs: &["CTE_DBSI"],
    },
];

/// Template set for a building use; uses without templates fall back to an
/// empty set (they are verified through the rule catalog only).
pub fn templates_for(use_: BuildingUse) -> &'static [ItemTemplate] {
    match use_ {
        BuildingUse::Residencial => RESIDENTIAL_TEMPLATES,
        BuildingUse::Industrial => INDUSTRIAL_TEMPLATES,
        BuildingUse::GarajeAparcamiento => GARAGE_TEMPLATES,
        _ => &[],
    }
}

// ----------------------------------------------------------------------
// Threshold tables
// ----------------------------------------------------------------------

/// Maximum building height (m) and floor count per use.
pub fn height_limits(use_: BuildingUse) -> Option<(f64, u32)> {
    match use_ {
        BuildingUse::Residencial => Some((30.0, 8)),
        BuildingUse::Industrial => Some((15.0, 3)),
        BuildingUse::GarajeAparcamiento => Some((6.0, 2)),
        _ => None,
    }
}

/// Minimum surface (m²) per dwelling unit / industrial unit / parking spot.
pub fn min_surface(use_: BuildingUse) -> Option<f64> {
    match use_ {
        BuildingUse::Residencial => Some(45.0),
        BuildingUse::Industrial => Some(100.0),
        BuildingUse::GarajeAparcamiento => Some(12.0),
        _ => None,
    }
}

/// Accessibility thresholds, use-independent.
pub const RAMP_SLOPE_MAX: f64 = 8.0;
pub const DOOR_WIDTH_MIN: f64 = 0.8;
pub const CORRIDOR_WIDTH_MIN: f64 = 1.2;
pub const HABITABLE_ROOM_MIN: f64 = 9.0;
