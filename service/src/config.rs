//! Service configuration with TOML file support.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use merit_types::Amount;

use crate::ServiceError;

/// Configuration for the merit service.
///
/// Can be loaded from a TOML file via [`ServiceConfig::load`] or built
/// programmatically (e.g. for tests). Money fields are given in micros
/// (1 unit = 1_000_000 micros) so the file carries exact integers.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Data directory for ledger storage.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// LMDB map size in megabytes.
    #[serde(default = "default_map_size_mb")]
    pub map_size_mb: usize,

    /// Reward credited for one accepted item, in micros.
    #[serde(default = "default_reward_micros")]
    pub reward_micros: u64,

    /// Minimum balance required to request a payout, in micros.
    #[serde(default = "default_min_payout_micros")]
    pub min_payout_micros: u64,

    /// Seconds until a reviewer's claim goes stale and can be taken over.
    /// Zero disables claim exclusivity.
    #[serde(default = "default_claim_stale_secs")]
    pub claim_stale_secs: u64,

    /// Seconds to wait for the transfer service before treating the attempt
    /// as failed.
    #[serde(default = "default_transfer_timeout_secs")]
    pub transfer_timeout_secs: u64,

    /// Base URL of the Coingecko-compatible price endpoint.
    #[serde(default = "default_rate_base_url")]
    pub rate_base_url: String,

    /// Asset id to quote.
    #[serde(default = "default_rate_asset_id")]
    pub rate_asset_id: String,

    /// Currency the reward balances are denominated in.
    #[serde(default = "default_rate_vs_currency")]
    pub rate_vs_currency: String,

    /// URL of the transfer gateway.
    #[serde(default = "default_transfer_endpoint")]
    pub transfer_endpoint: String,

    /// Reviewer ids with operator privileges.
    #[serde(default)]
    pub operators: Vec<u64>,

    /// Reviewer ids with supervisor privileges.
    #[serde(default)]
    pub supervisors: Vec<u64>,

    /// Log format: "human" or "json".
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_data_dir() -> PathBuf {
    PathBuf::from("./merit_data")
}

fn default_map_size_mb() -> usize {
    256
}

fn default_reward_micros() -> u64 {
    500_000
}

fn default_min_payout_micros() -> u64 {
    5_000_000
}

fn default_claim_stale_secs() -> u64 {
    900
}

fn default_transfer_timeout_secs() -> u64 {
    30
}

fn default_rate_base_url() -> String {
    "https://api.coingecko.com/api/v3".to_string()
}

fn default_rate_asset_id() -> String {
    "the-open-network".to_string()
}

fn default_rate_vs_currency() -> String {
    "usd".to_string()
}

fn default_transfer_endpoint() -> String {
    "http://127.0.0.1:8090/transfer".to_string()
}

fn default_log_format() -> String {
    "human".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

// ── Impl ───────────────────────────────────────────────────────────────

impl ServiceConfig {
    /// Load configuration from a TOML file. A missing file is not an error:
    /// the service runs on defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ServiceError> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .map_err(|e| ServiceError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, ServiceError> {
        toml::from_str(s).map_err(|e| ServiceError::Config(e.to_string()))
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> String {
        toml::to_string_pretty(self).expect("ServiceConfig is always serializable to TOML")
    }

    pub fn reward(&self) -> Amount {
        Amount::from_micros(self.reward_micros)
    }

    pub fn min_payout(&self) -> Amount {
        Amount::from_micros(self.min_payout_micros)
    }

    pub fn map_size_bytes(&self) -> usize {
        self.map_size_mb * 1024 * 1024
    }

    pub fn transfer_timeout(&self) -> Duration {
        Duration::from_secs(self.transfer_timeout_secs)
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            map_size_mb: default_map_size_mb(),
            reward_micros: default_reward_micros(),
            min_payout_micros: default_min_payout_micros(),
            claim_stale_secs: default_claim_stale_secs(),
            transfer_timeout_secs: default_transfer_timeout_secs(),
            rate_base_url: default_rate_base_url(),
            rate_asset_id: default_rate_asset_id(),
            rate_vs_currency: default_rate_vs_currency(),
            transfer_endpoint: default_transfer_endpoint(),
            operators: Vec::new(),
            supervisors: Vec::new(),
            log_format: default_log_format(),
            log_level: default_log_level(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_round_trips_through_toml() {
        let config = ServiceConfig::default();
        let toml_str = config.to_toml_string();
        let parsed = ServiceConfig::from_toml_str(&toml_str).expect("should parse");
        assert_eq!(parsed.reward_micros, config.reward_micros);
        assert_eq!(parsed.claim_stale_secs, config.claim_stale_secs);
    }

    #[test]
    fn minimal_toml_uses_defaults() {
        let config = ServiceConfig::from_toml_str("").expect("empty toml should use defaults");
        assert_eq!(config.reward(), Amount::from_micros(500_000));
        assert_eq!(config.min_payout(), Amount::from_units(5));
        assert_eq!(config.claim_stale_secs, 900);
        assert_eq!(config.rate_asset_id, "the-open-network");
    }

    #[test]
    fn partial_toml_overrides() {
        let toml = r#"
            reward_micros = 750000
            claim_stale_secs = 120
            supervisors = [1, 2]
        "#;
        let config = ServiceConfig::from_toml_str(toml).expect("should parse");
        assert_eq!(config.reward_micros, 750_000);
        assert_eq!(config.claim_stale_secs, 120);
        assert_eq!(config.supervisors, vec![1, 2]);
        assert_eq!(config.log_format, "human"); // default
    }

    #[test]
    fn missing_file_is_defaults() {
        let config = ServiceConfig::load("/nonexistent/merit.toml").expect("load");
        assert_eq!(config.min_payout_micros, 5_000_000);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("merit.toml");
        std::fs::write(&path, "reward_micros = \"lots\"").expect("write");
        let err = ServiceConfig::load(&path).unwrap_err();
        assert!(matches!(err, ServiceError::Config(_)));
    }
}
