//! Simulator configuration

use serde::{Deserialize, Serialize};
use std::path::Path;

use scholaraid_core::ControllerConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub ledger: LedgerConfig,
    #[serde(default)]
    pub identity: IdentityConfig,
    #[serde(default)]
    pub controller: ControllerConfig,
    /// Applications submitted during the run
    #[serde(default)]
    pub applications: Vec<ApplicationSeed>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Address of the simulated contract
    #[serde(default = "default_contract_address")]
    pub contract_address: String,

    /// Leave decryption proofs unconfirmed
    #[serde(default)]
    pub defer_confirmation: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityConfig {
    /// Wallet address of the connected party
    #[serde(default = "default_identity")]
    pub address: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationSeed {
    pub name: String,
    pub income: i64,
    pub score: i64,
}

// Defaults
fn default_contract_address() -> String { "0x0000000000000000000000000000000000c0ffee".to_string() }
fn default_identity() -> String { "0x00000000000000000000000000000000000a11ce".to_string() }

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            contract_address: default_contract_address(),
            defer_confirmation: false,
        }
    }
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            address: default_identity(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ledger: LedgerConfig::default(),
            identity: IdentityConfig::default(),
            controller: ControllerConfig::default(),
            applications: vec![ApplicationSeed {
                name: "Alice".to_string(),
                income: 40_000,
                score: 8,
            }],
        }
    }
}

impl Config {
    /// Load from a TOML file, falling back to defaults when it does not exist.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            tracing::info!(path = %path.display(), "Config file not found, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config() {
        let config: Config = toml::from_str(
            r#"
[[applications]]
name = "Alice"
income = 40000
score = 8
"#,
        )
        .expect("valid TOML");

        assert_eq!(config.applications.len(), 1);
        assert_eq!(config.identity.address, default_identity());
        assert!(!config.ledger.defer_confirmation);
        assert_eq!(config.controller.eligibility.income_threshold, 50_000);
    }

    #[test]
    fn test_bundled_config_parses() {
        let content = include_str!("../scholaraid.toml");
        let config: Config = toml::from_str(content).expect("bundled config is valid");
        assert_eq!(config.applications.len(), 3);
        assert_eq!(config.controller.id_prefix, "scholarship");
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = Config::load(Path::new("/nonexistent/scholaraid.toml")).unwrap();
        assert_eq!(config.applications.len(), 1);
    }
}
