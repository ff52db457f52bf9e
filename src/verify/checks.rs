//! Per-category verification routines
//!
//! Each routine inspects measured project attributes against the threshold
//! tables and returns a status plus human-readable notes. A routine never
//! mutates the project; missing measurements degrade to `Partial` (the limit
//! is known but unverifiable), not to an error.

use serde_json::Value;

use crate::project::{BuildingUse, Project};
use crate::verify::templates::{
    height_limits, min_surface, CORRIDOR_WIDTH_MIN, DOOR_WIDTH_MIN, HABITABLE_ROOM_MIN,
    RAMP_SLOPE_MAX,
};
use crate::verify::types::{CheckCategory, VerificationStatus};

/// Outcome of one routine.
pub struct CheckOutcome {
    pub status: VerificationStatus,
    pub notes: Vec<String>,
}

impl CheckOutcome {
    fn new(status: VerificationStatus, notes: Vec<String>) -> Self {
        Self { status, notes }
    }
}

/// Dispatch on the item's category.
pub fn run_check(category: CheckCategory, use_: BuildingUse, project: &Project) -> CheckOutcome {
    match category {
        CheckCategory::Height => check_height(use_, project),
        CheckCategory::Surface => check_surface(use_, project),
        CheckCategory::Accessibility => check_accessibility(project),
        CheckCategory::FireSafety => check_fire_safety(project),
        CheckCategory::Ventilation => check_ventilation(use_, project),
        CheckCategory::Generic => CheckOutcome::new(
            VerificationStatus::Pending,
            vec!["Verificación manual requerida".to_string()],
        ),
    }
}

fn check_height(use_: BuildingUse, project: &Project) -> CheckOutcome {
    let Some((max_height, max_floors)) = height_limits(use_) else {
        return CheckOutcome::new(
            VerificationStatus::Pending,
            vec![format!("Sin límites de altura definidos para '{use_}'")],
        );
    };

    let height = number_attr(project, "height");
    let floors = number_attr(project, "floors");
    let mut notes = vec![format!(
        "Límite de altura: {max_height}m, límite de plantas: {max_floors}"
    )];

    match (height, floors) {
        (None, None) => {
            notes.push("Altura y número de plantas sin declarar".to_string());
            CheckOutcome::new(VerificationStatus::Partial, notes)
        }
        (h, f) => {
            let mut compliant = true;
            if let Some(h) = h {
                if h > max_height {
                    compliant = false;
                    notes.push(format!("Altura declarada {h}m excede el máximo {max_height}m"));
                }
            }
            if let Some(f) = f {
                if f > f64::from(max_floors) {
                    compliant = false;
                    notes.push(format!(
                        "Plantas declaradas {f} exceden el máximo {max_floors}"
                    ));
                }
            }
            let status = if compliant {
                VerificationStatus::Compliant
            } else {
                VerificationStatus::NonCompliant
            };
            CheckOutcome::new(status, notes)
        }
    }
}

fn check_surface(use_: BuildingUse, project: &Project) -> CheckOutcome {
    let Some(minimum) = min_surface(use_) else {
        return CheckOutcome::new(
            VerificationStatus::Pending,
            vec![format!("Sin superficie mínima definida para '{use_}'")],
        );
    };

    let mut notes = vec![format!("Superficie mínima requerida: {minimum}m² por unidad")];
    match number_attr(project, "surface_per_unit") {
        None => {
            notes.push("Superficie por unidad sin declarar".to_string());
            CheckOutcome::new(VerificationStatus::Partial, notes)
        }
        Some(surface) if surface >= minimum => {
            CheckOutcome::new(VerificationStatus::Compliant, notes)
        }
        Some(surface) => {
            notes.push(format!(
                "Superficie declarada {surface}m² inferior al mínimo {minimum}m²"
            ));
            CheckOutcome::new(VerificationStatus::NonCompliant, notes)
        }
    }
}

fn check_accessibility(project: &Project) -> CheckOutcome {
    // (attribute, limit, limit is a maximum, note template)
    let thresholds: [(&str, f64, bool, &str); 4] = [
        ("ramp_slope", RAMP_SLOPE_MAX, true, "Pendiente máxima de rampa"),
        ("door_width", DOOR_WIDTH_MIN, false, "Ancho mínimo de puerta"),
        (
            "corridor_width",
            CORRIDOR_WIDTH_MIN,
            false,
            "Ancho mínimo de pasillo",
        ),
        (
            "habitable_room_area",
            HABITABLE_ROOM_MIN,
            false,
            "Superficie mínima de pieza habitable",
        ),
    ];

    let mut notes = Vec::new();
    let mut measured = 0usize;
    let mut violations = 0usize;
    for (attr, limit, is_max, label) in thresholds {
        let unit = if attr == "ramp_slope" {
            "%"
        } else if attr == "habitable_room_area" {
            "m²"
        } else {
            "m"
        };
        notes.push(format!("{label}: {limit}{unit}"));
        if let Some(value) = number_attr(project, attr) {
            measured += 1;
            let ok = if is_max { value <= limit } else { value >= limit };
            if !ok {
                violations += 1;
                notes.push(format!("Valor declarado {value}{unit} incumple el límite"));
            }
        }
    }

    let status = if violations > 0 {
        VerificationStatus::NonCompliant
    } else if measured == 0 {
        VerificationStatus::Partial
    } else {
        VerificationStatus::Compliant
    };
    CheckOutcome::new(status, notes)
}

fn check_fire_safety(project: &Project) -> CheckOutcome {
    let mut notes = vec!["Verificación según CTE DB-SI".to_string()];
    let mut measured = 0usize;
    let mut violations = 0usize;

    if let Some(distance) = number_attr(project, "evacuation_distance") {
        measured += 1;
        if distance > 15.0 {
            violations += 1;
            notes.push(format!(
                "Distancia de evacuación {distance}m supera el máximo de 15m"
            ));
        }
    }
    if let Some(resistance) = string_attr(project, "fire_resistance") {
        measured += 1;
        if !resistance.to_lowercase().contains("rf-") {
            violations += 1;
            notes.push("Resistencia al fuego sin clasificación RF declarada".to_string());
        }
    }

    let status = if violations > 0 {
        VerificationStatus::NonCompliant
    } else if measured == 0 {
        notes.push("Sin datos de evacuación ni resistencia al fuego".to_string());
        VerificationStatus::Partial
    } else {
        VerificationStatus::Compliant
    };
    CheckOutcome::new(status, notes)
}

fn check_ventilation(use_: BuildingUse, project: &Project) -> CheckOutcome {
    let mut notes = Vec::new();
    match string_attr(project, "ventilation") {
        None => {
            notes.push("Sistema de ventilación sin declarar".to_string());
            CheckOutcome::new(VerificationStatus::Partial, notes)
        }
        Some(system) => {
            let lowered = system.to_lowercase();
            // Below-grade parking requires mechanical ventilation.
            if use_ == BuildingUse::GarajeAparcamiento && !lowered.contains("mecanica") {
                notes.push(
                    "El garaje-aparcamiento requiere ventilación mecánica".to_string(),
                );
                CheckOutcome::new(VerificationStatus::NonCompliant, notes)
            } else {
                notes.push(format!("Sistema de ventilación declarado: {system}"));
                CheckOutcome::new(VerificationStatus::Compliant, notes)
            }
        }
    }
}

fn number_attr(project: &Project, name: &str) -> Option<f64> {
    match project.attributes.get(name)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn string_attr<'a>(project: &'a Project, name: &str) -> Option<&'a str> {
    project.attributes.get(name)?.as_str()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn project(attrs: Value) -> Project {
        Project::from_value(attrs).unwrap()
    }

    #[test]
    fn test_height_within_limits() {
        let p = project(json!({"height": 24.0, "floors": 7}));
        let outcome = check_height(BuildingUse::Residencial, &p);
        assert_eq!(outcome.status, VerificationStatus::Compliant);
    }

    #[test]
    fn test_height_exceeded() {
        let p = project(json!({"height": 35.0, "floors": 7}));
        let outcome = check_height(BuildingUse::Residencial, &p);
        assert_eq!(outcome.status, VerificationStatus::NonCompliant);
        assert!(outcome.notes.iter().any(|n| n.contains("excede")));
    }

    #[test]
    fn test_height_unmeasured_is_partial() {
        let outcome = check_height(BuildingUse::Residencial, &Project::default());
        assert_eq!(outcome.status, VerificationStatus::Partial);
    }

    #[test]
    fn test_garage_floor_limit() {
        let p = project(json!({"floors": 3}));
        let outcome = check_height(BuildingUse::GarajeAparcamiento, &p);
        assert_eq!(outcome.status, VerificationStatus::NonCompliant);
    }

    #[test]
    fn test_surface_thresholds() {
        let ok = project(json!({"surface_per_unit": 50.0}));
        assert_eq!(
            check_surface(BuildingUse::Residencial, &ok).status,
            VerificationStatus::Compliant
        );

        let short = project(json!({"surface_per_unit": 40.0}));
        assert_eq!(
            check_surface(BuildingUse::Residencial, &short).status,
            VerificationStatus::NonCompliant
        );
    }

    #[test]
    fn test_accessibility_thresholds() {
        let ok = project(json!({
            "door_width": 0.9,
            "ramp_slope": 6.0,
            "corridor_width": 1.3,
            "habitable_room_area": 10.0
        }));
        assert_eq!(
            check_accessibility(&ok).status,
            VerificationStatus::Compliant
        );

        let narrow_door = project(json!({"door_width": 0.6}));
        let outcome = check_accessibility(&narrow_door);
        assert_eq!(outcome.status, VerificationStatus::NonCompliant);

        assert_eq!(
            check_accessibility(&Project::default()).status,
            VerificationStatus::Partial
        );
    }

    #[test]
    fn test_fire_safety_checks() {
        let ok = project(json!({"evacuation_distance": 12.0, "fire_resistance": "RF-120"}));
        assert_eq!(check_fire_safety(&ok).status, VerificationStatus::Compliant);

        let far = project(json!({"evacuation_distance": 22.0}));
        assert_eq!(
            check_fire_safety(&far).status,
            VerificationStatus::NonCompliant
        );
    }

    #[test]
    fn test_garage_requires_mechanical_ventilation() {
        let natural = project(json!({"ventilation": "natural cruzada"}));
        assert_eq!(
            check_ventilation(BuildingUse::GarajeAparcamiento, &natural).status,
            VerificationStatus::NonCompliant
        );
        assert_eq!(
            check_ventilation(BuildingUse::Residencial, &natural).status,
            VerificationStatus::Compliant
        );

        let mechanical = project(json!({"ventilation": "mecanica forzada"}));
        assert_eq!(
            check_ventilation(BuildingUse::GarajeAparcamiento, &mechanical).status,
            VerificationStatus::Compliant
        );
    }

    #[test]
    fn test_generic_check_is_pending() {
        let outcome = run_check(
            CheckCategory::Generic,
            BuildingUse::Residencial,
            &Project::default(),
        );
        assert_eq!(outcome.status, VerificationStatus::Pending);
    }
}
