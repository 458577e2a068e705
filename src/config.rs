use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use crate::rpc::retry::RetryPolicy;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub cardano: CardanoConfig,
    /// Venue name -> on-chain address.
    pub venues: BTreeMap<String, String>,
    pub monitoring: MonitoringConfig,
    pub notifications: NotificationConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CardanoConfig {
    /// Asset unit used for the transfer listing; also matched as a substring
    /// of every input/output unit.
    pub asset_id: String,
    pub ticker: String,
    pub api_url: String,
    pub api_key: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct MonitoringConfig {
    pub check_interval_minutes: u64,
    pub max_retries: u32,
    pub retry_delay_ms: u64,
    pub fetch_count: usize,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NotifierBackend {
    Webhook,
    Desktop,
    Log,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct NotificationConfig {
    pub enabled: bool,
    pub backend: NotifierBackend,
    pub webhook_url: Option<String>,
    pub cooldown_seconds: u64,
}

impl Default for CardanoConfig {
    fn default() -> Self {
        Self {
            asset_id: "ac597ca62a32cab3f4766c8f9cd577e50ebb1d00383ec7fa3990b016435241574a55".into(),
            ticker: "$CRAWJU".into(),
            api_url: "https://cardano-mainnet.blockfrost.io/api/v0".into(),
            api_key: String::new(),
        }
    }
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            check_interval_minutes: 5,
            max_retries: 3,
            retry_delay_ms: 5000,
            fetch_count: 5,
            request_timeout_secs: 10,
        }
    }
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            backend: NotifierBackend::Webhook,
            webhook_url: None,
            cooldown_seconds: 30,
        }
    }
}

impl MonitoringConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_retries, Duration::from_millis(self.retry_delay_ms))
    }

    /// Poll period, never shorter than one minute.
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_minutes.max(1) * 60)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Config {
    /// Load config from a TOML file. Falls back to defaults if file doesn't exist.
    /// Environment overrides are applied either way.
    pub fn load(path: impl AsRef<Path>) -> Self {
        let mut config = Self::load_file(path.as_ref());
        config.apply_overrides(|key| std::env::var(key).ok());
        config
    }

    fn load_file(path: &Path) -> Self {
        if !path.exists() {
            tracing::info!("Config file {} not found, using defaults", path.display());
            return Self::default();
        }
        match std::fs::read_to_string(path) {
            Ok(contents) => match toml::from_str(&contents) {
                Ok(config) => {
                    tracing::info!("Config loaded from {}", path.display());
                    config
                }
                Err(e) => {
                    tracing::warn!("Failed to parse {}: {e}, using defaults", path.display());
                    Self::default()
                }
            },
            Err(e) => {
                tracing::warn!("Failed to read {}: {e}, using defaults", path.display());
                Self::default()
            }
        }
    }

    /// Apply `BLOCKFROST_API_KEY`, `BLOCKFROST_API_URL`, `CHECK_INTERVAL_MINUTES`
    /// and `WEBHOOK_URL` from `lookup`.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(key) = lookup("BLOCKFROST_API_KEY") {
            self.cardano.api_key = key;
        }
        if let Some(url) = lookup("BLOCKFROST_API_URL") {
            self.cardano.api_url = url;
        }
        if let Some(raw) = lookup("CHECK_INTERVAL_MINUTES") {
            match raw.parse() {
                Ok(minutes) => self.monitoring.check_interval_minutes = minutes,
                Err(e) => tracing::warn!("Ignoring CHECK_INTERVAL_MINUTES={raw}: {e}"),
            }
        }
        if let Some(url) = lookup("WEBHOOK_URL") {
            self.notifications.webhook_url = Some(url);
        }
    }

    /// Human-readable problems with the loaded configuration.
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();
        if self.cardano.api_key.is_empty() {
            issues.push("Blockfrost API key not configured".to_string());
        }
        if self.cardano.asset_id.is_empty() {
            issues.push("Tracked asset id not configured".to_string());
        }
        if self.venues.is_empty() {
            issues.push("No venue addresses configured, address fallback disabled".to_string());
        }
        if self.monitoring.check_interval_minutes == 0 {
            issues.push("check_interval_minutes is 0, using 1".to_string());
        }
        if self.monitoring.fetch_count == 0 {
            issues.push("fetch_count is 0, no transactions will be examined".to_string());
        }
        if self.notifications.enabled
            && self.notifications.backend == NotifierBackend::Webhook
            && self.notifications.webhook_url.as_deref().is_none_or(str::is_empty)
        {
            issues.push("Webhook backend selected without webhook_url".to_string());
        }
        issues
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults_target_crawju_on_mainnet() {
        let config = Config::default();
        assert_eq!(config.monitoring.check_interval_minutes, 5);
        assert_eq!(config.monitoring.max_retries, 3);
        assert_eq!(config.monitoring.retry_delay_ms, 5000);
        assert_eq!(config.monitoring.fetch_count, 5);
        assert_eq!(config.monitoring.interval(), Duration::from_secs(300));
        assert!(config.notifications.enabled);
    }

    #[test]
    fn parses_partial_toml() {
        let raw = r#"
            [cardano]
            asset_id = "deadbeef"
            api_key = "mainnetXYZ"

            [venues]
            Splash = "addr1_splash"

            [monitoring]
            check_interval_minutes = 2

            [notifications]
            backend = "desktop"
        "#;
        let config: Config = toml::from_str(raw).unwrap();
        assert_eq!(config.cardano.asset_id, "deadbeef");
        assert_eq!(config.cardano.ticker, "$CRAWJU");
        assert_eq!(config.venues.get("Splash").map(String::as_str), Some("addr1_splash"));
        assert_eq!(config.monitoring.check_interval_minutes, 2);
        assert_eq!(config.monitoring.max_retries, 3);
        assert_eq!(config.notifications.backend, NotifierBackend::Desktop);
    }

    #[test]
    fn env_overrides_applied() {
        let env: HashMap<&str, &str> = [
            ("BLOCKFROST_API_KEY", "key123"),
            ("CHECK_INTERVAL_MINUTES", "7"),
            ("WEBHOOK_URL", "https://hooks.example/abc"),
        ]
        .into_iter()
        .collect();
        let mut config = Config::default();
        config.apply_overrides(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(config.cardano.api_key, "key123");
        assert_eq!(config.monitoring.check_interval_minutes, 7);
        assert_eq!(config.notifications.webhook_url.as_deref(), Some("https://hooks.example/abc"));
        assert_eq!(config.cardano.api_url, CardanoConfig::default().api_url);
    }

    #[test]
    fn bad_interval_override_ignored() {
        let mut config = Config::default();
        config.apply_overrides(|k| (k == "CHECK_INTERVAL_MINUTES").then(|| "soon".to_string()));
        assert_eq!(config.monitoring.check_interval_minutes, 5);
    }

    #[test]
    fn zero_interval_clamped() {
        let monitoring = MonitoringConfig {
            check_interval_minutes: 0,
            ..MonitoringConfig::default()
        };
        assert_eq!(monitoring.interval(), Duration::from_secs(60));
    }

    #[test]
    fn validation_flags_missing_pieces() {
        let issues = Config::default().validate();
        assert!(issues.iter().any(|i| i.contains("API key")));
        assert!(issues.iter().any(|i| i.contains("venue")));
        assert!(issues.iter().any(|i| i.contains("webhook_url")));
    }

    #[test]
    fn missing_file_uses_defaults() {
        let config = Config::load_file(Path::new("/nonexistent/buyradar.toml"));
        assert_eq!(config.monitoring.fetch_count, 5);
    }
}
