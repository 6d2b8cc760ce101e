//! Application configuration management.
//!
//! This module handles loading and saving the application configuration:
//! the fund endpoint URL, the configured funds, and the staleness policy
//! every cache consumer shares.
//!
//! Configuration is stored at `~/.config/givecache/config.json`.

use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::cache::{StalenessMode, StalenessPolicy};
use crate::models::{FundKey, FundSpec};

/// Application name used for config/cache directory paths
const APP_NAME: &str = "givecache";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Default provider endpoint (deployed sheet script).
const DEFAULT_ENDPOINT: &str =
    "https://script.google.com/macros/s/AKfycbyn7BAXvOI-GRNI3DfFBXc6tBAgcuwlKu2PWgJ-JKi-ShZEP-eOnzmvxC01AjGsevQd/exec";

/// Default TTL for cached fund data, in minutes. Matches the refresh cadence
/// of the hosted dashboard pages sharing the same provider.
const DEFAULT_TTL_MINUTES: i64 = 5;

/// Default interval between background refresh checks, in seconds.
const DEFAULT_REFRESH_INTERVAL_SECS: u64 = 300;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Base URL of the deployed sheet-script endpoint
    pub endpoint_url: String,
    /// Configured giving campaigns
    pub funds: Vec<FundSpec>,
    /// Fund shown on startup
    pub default_fund: FundKey,
    /// Staleness mode applied to every cache read
    pub staleness_mode: StalenessMode,
    /// TTL in minutes; only meaningful in TTL mode
    pub ttl_minutes: i64,
    /// Seconds between background refresh checks
    pub refresh_interval_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint_url: DEFAULT_ENDPOINT.to_string(),
            funds: vec![
                FundSpec::new("tech", "Tech Fund", "tech-contributions"),
                FundSpec::new("christmasfund", "Christmas Fund", "christmas-fund"),
            ],
            default_fund: FundKey::new("tech"),
            staleness_mode: StalenessMode::Ttl,
            ttl_minutes: DEFAULT_TTL_MINUTES,
            refresh_interval_secs: DEFAULT_REFRESH_INTERVAL_SECS,
        }
    }
}

impl Config {
    /// Load the config file, falling back to defaults when absent.
    /// `GIVECACHE_ENDPOINT` and `GIVECACHE_FUND` env vars override the
    /// stored values.
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(&path)?;
            serde_json::from_str(&contents)?
        } else {
            Self::default()
        };

        if let Ok(endpoint) = std::env::var("GIVECACHE_ENDPOINT") {
            config.endpoint_url = endpoint;
        }
        if let Ok(fund) = std::env::var("GIVECACHE_FUND") {
            config.default_fund = FundKey::new(&fund);
        }

        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir =
            dirs::config_dir().ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn cache_dir(&self) -> Result<PathBuf> {
        let cache_dir =
            dirs::cache_dir().ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }

    /// The single staleness policy shared by every consumer of the cache.
    pub fn policy(&self) -> StalenessPolicy {
        match self.staleness_mode {
            StalenessMode::Ttl => {
                StalenessPolicy::ttl(chrono::Duration::minutes(self.ttl_minutes))
            }
            StalenessMode::Sticky => StalenessPolicy::sticky(),
        }
    }

    pub fn fund(&self, key: &FundKey) -> Option<&FundSpec> {
        self.funds.iter().find(|f| &f.key == key)
    }

    /// Index of the fund to show on startup, honoring an explicit override.
    pub fn initial_fund_index(&self, override_key: Option<&FundKey>) -> usize {
        let wanted = override_key.unwrap_or(&self.default_fund);
        self.funds
            .iter()
            .position(|f| &f.key == wanted)
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_has_two_funds() {
        let config = Config::default();
        assert_eq!(config.funds.len(), 2);
        assert_eq!(config.default_fund, FundKey::new("tech"));
        assert_eq!(config.staleness_mode, StalenessMode::Ttl);
        assert_eq!(config.ttl_minutes, 5);
    }

    #[test]
    fn test_policy_matches_mode() {
        let mut config = Config::default();
        assert_eq!(config.policy().mode(), StalenessMode::Ttl);

        config.staleness_mode = StalenessMode::Sticky;
        assert_eq!(config.policy().mode(), StalenessMode::Sticky);
    }

    #[test]
    fn test_fund_lookup() {
        let config = Config::default();
        assert!(config.fund(&FundKey::new("tech")).is_some());
        assert!(config.fund(&FundKey::new("Christmas Fund")).is_some());
        assert!(config.fund(&FundKey::new("missing")).is_none());
    }

    #[test]
    fn test_initial_fund_index_with_override() {
        let config = Config::default();
        assert_eq!(config.initial_fund_index(None), 0);
        assert_eq!(
            config.initial_fund_index(Some(&FundKey::new("christmasfund"))),
            1
        );
        // Unknown override falls back to the first fund
        assert_eq!(config.initial_fund_index(Some(&FundKey::new("nope"))), 0);
    }

    #[test]
    fn test_config_roundtrip() {
        let config = Config::default();
        let json = serde_json::to_string(&config).unwrap();
        let back: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(back.funds.len(), config.funds.len());
        assert_eq!(back.ttl_minutes, config.ttl_minutes);
    }
}
