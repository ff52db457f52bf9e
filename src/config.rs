//! Engine configuration
//!
//! All tunable thresholds live here as named fields with documented defaults
//! instead of magic numbers scattered across call sites.

use chrono::Duration;
use serde::{Deserialize, Serialize};

/// Default confidence required before an analyzer result is accepted as a
/// resolution.
pub const DEFAULT_ACCEPT_CONFIDENCE: f64 = 0.7;

/// Default number of clarification re-prompts allowed per ambiguity before
/// the session gives up on it.
pub const DEFAULT_MAX_CLARIFICATION_ATTEMPTS: u32 = 3;

/// Default cap on secondary uses before the detector flags the project.
pub const DEFAULT_MAX_SECONDARY_USES: usize = 5;

/// Default idle time after which a session is eligible for expiry sweeps.
pub const DEFAULT_SESSION_IDLE_MINUTES: i64 = 30;

/// Tunable thresholds for detection, resolution and session lifecycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Minimum analyzer confidence for a user answer to resolve an ambiguity.
    pub accept_confidence: f64,

    /// Clarification re-prompts allowed per ambiguity item. When exhausted
    /// the item is marked failed (or resolved by default when the item
    /// carries candidate resolutions) and the queue advances.
    pub max_clarification_attempts: u32,

    /// Maximum recommended number of secondary uses.
    pub max_secondary_uses: usize,

    /// Sessions idle longer than this are removed by `expire_idle` sweeps.
    #[serde(with = "idle_minutes")]
    pub session_idle_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            accept_confidence: DEFAULT_ACCEPT_CONFIDENCE,
            max_clarification_attempts: DEFAULT_MAX_CLARIFICATION_ATTEMPTS,
            max_secondary_uses: DEFAULT_MAX_SECONDARY_USES,
            session_idle_timeout: Duration::minutes(DEFAULT_SESSION_IDLE_MINUTES),
        }
    }
}

/// Serialize the idle timeout as whole minutes.
mod idle_minutes {
    use chrono::Duration;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_i64(d.num_minutes())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let minutes = i64::deserialize(d)?;
        Ok(Duration::minutes(minutes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.accept_confidence, 0.7);
        assert_eq!(config.max_clarification_attempts, 3);
        assert_eq!(config.max_secondary_uses, 5);
        assert_eq!(config.session_idle_timeout, Duration::minutes(30));
    }

    #[test]
    fn test_config_round_trip() {
        let config = EngineConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let parsed: EngineConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.session_idle_timeout, config.session_idle_timeout);
    }
}
