//! Application configuration. Paths, member identity, integrations.

use serde::Deserialize;

/// Default number of days ahead the booking menu offers.
pub const DEFAULT_HORIZON_DAYS: u32 = 14;

#[derive(Debug, Deserialize, Default)]
pub struct AppConfig {
    /// Directory holding gym.db and exports. Read from GYM_BOOKING_DATA_DIR.
    pub data_dir: Option<String>,

    /// Member the terminal session acts for. Stand-in for the session provider.
    /// Read from GYM_BOOKING_MEMBER_ID.
    #[serde(default)]
    pub member_id: Option<i64>,

    /// Trainer roster JSON imported at startup. Read from GYM_BOOKING_ROSTER_PATH.
    #[serde(default)]
    pub roster_path: Option<String>,

    /// Days ahead offered when picking a session date. Read from GYM_BOOKING_HORIZON_DAYS.
    #[serde(default)]
    pub horizon_days: Option<u32>,

    // ─────────────────────────────────────────────────────────────────────────
    // Webhook Configuration
    // ─────────────────────────────────────────────────────────────────────────
    /// Endpoint that receives booking notifications. Read from GYM_BOOKING_WEBHOOK_URL.
    #[serde(default)]
    pub webhook_url: Option<String>,
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        dotenv::dotenv().ok();
        let mut c = config::Config::builder();
        c = c.add_source(config::Environment::with_prefix("GYM_BOOKING").try_parsing(true));
        if let Ok(path) = std::env::var("GYM_BOOKING_CONFIG") {
            c = c.add_source(config::File::with_name(&path));
        }
        c.build()?.try_deserialize()
    }

    /// Returns the data directory. Defaults to ./data.
    pub fn data_dir_or_default(&self) -> String {
        self.data_dir.clone().unwrap_or_else(|| "./data".to_string())
    }

    /// Returns the roster path. Defaults to <data_dir>/trainers.json.
    pub fn roster_path_or_default(&self) -> String {
        self.roster_path
            .clone()
            .unwrap_or_else(|| format!("{}/trainers.json", self.data_dir_or_default()))
    }

    /// Returns the booking horizon in days. Defaults to DEFAULT_HORIZON_DAYS; 0 is treated as 1.
    pub fn horizon_days_or_default(&self) -> u32 {
        self.horizon_days.unwrap_or(DEFAULT_HORIZON_DAYS).max(1)
    }

    /// Returns the webhook URL if configured and non-empty.
    pub fn webhook_url(&self) -> Option<String> {
        self.webhook_url
            .clone()
            .filter(|u| !u.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.data_dir_or_default(), "./data");
        assert_eq!(cfg.roster_path_or_default(), "./data/trainers.json");
        assert_eq!(cfg.horizon_days_or_default(), DEFAULT_HORIZON_DAYS);
        assert!(cfg.webhook_url().is_none());
    }

    #[test]
    fn test_overrides() {
        let cfg = AppConfig {
            data_dir: Some("/var/gym".to_string()),
            horizon_days: Some(0),
            webhook_url: Some("  ".to_string()),
            ..Default::default()
        };
        assert_eq!(cfg.roster_path_or_default(), "/var/gym/trainers.json");
        assert_eq!(cfg.horizon_days_or_default(), 1);
        assert!(cfg.webhook_url().is_none());
    }
}
