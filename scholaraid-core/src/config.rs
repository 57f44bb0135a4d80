//! Controller configuration

use serde::{Deserialize, Serialize};

use crate::activity::DEFAULT_ACTIVITY_CAPACITY;
use crate::eligibility::EligibilityPolicy;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControllerConfig {
    /// Tag written alongside every new application
    #[serde(default = "default_application_tag")]
    pub application_tag: String,

    /// Prefix of generated application ids
    #[serde(default = "default_id_prefix")]
    pub id_prefix: String,

    /// Maximum activity entries kept per session
    #[serde(default = "default_activity_capacity")]
    pub activity_capacity: usize,

    #[serde(default)]
    pub eligibility: EligibilityPolicy,
}

// Defaults
fn default_application_tag() -> String { "Scholarship Application".to_string() }
fn default_id_prefix() -> String { "scholarship".to_string() }
fn default_activity_capacity() -> usize { DEFAULT_ACTIVITY_CAPACITY }

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            application_tag: default_application_tag(),
            id_prefix: default_id_prefix(),
            activity_capacity: default_activity_capacity(),
            eligibility: EligibilityPolicy::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_table_uses_defaults() {
        let config: ControllerConfig = toml::from_str("").expect("valid TOML");
        assert_eq!(config, ControllerConfig::default());
    }

    #[test]
    fn test_partial_override() {
        let config: ControllerConfig = toml::from_str(
            r#"
id_prefix = "grant"

[eligibility]
income_threshold = 30000
"#,
        )
        .expect("valid TOML");

        assert_eq!(config.id_prefix, "grant");
        assert_eq!(config.application_tag, "Scholarship Application");
        assert_eq!(config.eligibility.income_threshold, 30_000);
        assert_eq!(config.eligibility.min_academic_score, 7);
    }
}
