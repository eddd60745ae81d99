//! Engine settings and their defaults.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use crate::errors::{Error, Result};

/// Default host for both the OAuth token endpoint and the web API.
pub const DEFAULT_BANK_HOST: &str = "https://www.csas.cz";

/// Default refresh period: 30 minutes.
pub const DEFAULT_REFRESH_INTERVAL_MS: u64 = 1_800_000;

/// Default transaction history window in days.
pub const DEFAULT_HISTORY_DAYS: u32 = 14;

/// The API refuses longer transaction windows.
pub const MAX_HISTORY_DAYS: u32 = 60;

/// Default timeout for API requests.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// When the refresh cycle asks the token endpoint for a new access token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TokenRefreshPolicy {
    /// Refresh at the start of every cycle, even when a token is held.
    #[default]
    EveryCycle,
    /// Refresh only while no access token is held, or after an API request
    /// failed with the current one.
    WhenEmpty,
}

impl std::str::FromStr for TokenRefreshPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "every_cycle" | "always" => Ok(Self::EveryCycle),
            "when_empty" | "empty" => Ok(Self::WhenEmpty),
            other => Err(Error::Config(format!("unknown token refresh policy '{}'", other))),
        }
    }
}

#[derive(Clone)]
pub struct Settings {
    pub bank_host: String,
    pub refresh_interval_ms: u64,
    history_days: u32,
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
    pub api_key: String,
    pub timeout: Duration,
    pub refresh_policy: TokenRefreshPolicy,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bank_host: DEFAULT_BANK_HOST.to_string(),
            refresh_interval_ms: DEFAULT_REFRESH_INTERVAL_MS,
            history_days: DEFAULT_HISTORY_DAYS,
            client_id: String::new(),
            client_secret: String::new(),
            refresh_token: String::new(),
            api_key: String::new(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            refresh_policy: TokenRefreshPolicy::default(),
        }
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("bank_host", &self.bank_host)
            .field("refresh_interval_ms", &self.refresh_interval_ms)
            .field("history_days", &self.history_days)
            .field("client_id", &self.client_id)
            .field("client_secret", &redacted(&self.client_secret))
            .field("refresh_token", &redacted(&self.refresh_token))
            .field("api_key", &redacted(&self.api_key))
            .field("timeout", &self.timeout)
            .field("refresh_policy", &self.refresh_policy)
            .finish()
    }
}

fn redacted(secret: &str) -> &'static str {
    if secret.is_empty() {
        ""
    } else {
        "<redacted>"
    }
}

impl Settings {
    /// Build settings from host configuration properties.
    ///
    /// Recognised keys: `refresh`, `history`, `clientId`, `clientSecret`,
    /// `refreshToken`, `webAPIKey`, `host`, `tokenRefresh`. Blank values keep
    /// the default.
    pub fn from_map(properties: &HashMap<String, String>) -> Result<Self> {
        let mut settings = Settings::default();
        let value = |key: &str| {
            properties
                .get(key)
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
        };

        if let Some(v) = value("refresh") {
            settings.refresh_interval_ms = v
                .parse()
                .ok()
                .filter(|ms: &u64| *ms > 0)
                .ok_or_else(|| {
                    Error::Config(format!("refresh must be positive milliseconds, got '{}'", v))
                })?;
        }
        if let Some(v) = value("history") {
            let days: u32 = v
                .parse()
                .map_err(|_| Error::Config(format!("history must be days, got '{}'", v)))?;
            settings.set_history_days(days);
        }
        if let Some(v) = value("clientId") {
            settings.client_id = v.to_string();
        }
        if let Some(v) = value("clientSecret") {
            settings.client_secret = v.to_string();
        }
        if let Some(v) = value("refreshToken") {
            settings.refresh_token = v.to_string();
        }
        if let Some(v) = value("webAPIKey") {
            settings.api_key = v.to_string();
        }
        if let Some(v) = value("host") {
            settings.bank_host = v.trim_end_matches('/').to_string();
        }
        if let Some(v) = value("tokenRefresh") {
            settings.refresh_policy = v.parse()?;
        }

        Ok(settings)
    }

    pub fn history_days(&self) -> u32 {
        self.history_days
    }

    /// Set the transaction window, clamped to [`MAX_HISTORY_DAYS`].
    pub fn set_history_days(&mut self, days: u32) {
        self.history_days = days.min(MAX_HISTORY_DAYS);
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval_ms)
    }

    pub fn token_url(&self) -> String {
        format!("{}/widp/oauth2/token", self.bank_host)
    }

    pub fn api_base_url(&self) -> String {
        format!("{}/webapi/api/v3/netbanking/", self.bank_host)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn props(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.refresh_interval_ms, 1_800_000);
        assert_eq!(settings.history_days(), 14);
        assert_eq!(settings.refresh_policy, TokenRefreshPolicy::EveryCycle);
        assert_eq!(
            settings.api_base_url(),
            "https://www.csas.cz/webapi/api/v3/netbanking/"
        );
        assert_eq!(settings.token_url(), "https://www.csas.cz/widp/oauth2/token");
    }

    #[test]
    fn test_from_map_reads_all_keys() {
        let settings = Settings::from_map(&props(&[
            ("refresh", "60000"),
            ("history", "30"),
            ("clientId", "client"),
            ("clientSecret", "secret"),
            ("refreshToken", "refresh"),
            ("webAPIKey", "key"),
            ("tokenRefresh", "when_empty"),
        ]))
        .unwrap();

        assert_eq!(settings.refresh_interval_ms, 60_000);
        assert_eq!(settings.history_days(), 30);
        assert_eq!(settings.client_id, "client");
        assert_eq!(settings.client_secret, "secret");
        assert_eq!(settings.refresh_token, "refresh");
        assert_eq!(settings.api_key, "key");
        assert_eq!(settings.refresh_policy, TokenRefreshPolicy::WhenEmpty);
    }

    #[test]
    fn test_history_is_clamped() {
        let settings = Settings::from_map(&props(&[("history", "365")])).unwrap();
        assert_eq!(settings.history_days(), 60);
    }

    #[test]
    fn test_blank_values_keep_defaults() {
        let settings = Settings::from_map(&props(&[("refresh", "  "), ("clientId", "")])).unwrap();
        assert_eq!(settings.refresh_interval_ms, DEFAULT_REFRESH_INTERVAL_MS);
        assert!(settings.client_id.is_empty());
    }

    #[test]
    fn test_invalid_numbers_are_config_errors() {
        let err = Settings::from_map(&props(&[("refresh", "soon")])).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        let err = Settings::from_map(&props(&[("refresh", "0")])).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        let err = Settings::from_map(&props(&[("history", "-1")])).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let settings = Settings::from_map(&props(&[
            ("clientId", "client"),
            ("clientSecret", "s3cr3t"),
            ("refreshToken", "rt-123"),
            ("webAPIKey", "key-456"),
        ]))
        .unwrap();

        let printed = format!("{:?}", settings);
        assert!(printed.contains("client"));
        assert!(printed.contains("<redacted>"));
        for secret in ["s3cr3t", "rt-123", "key-456"] {
            assert!(!printed.contains(secret), "{} leaked", secret);
        }
    }
}
