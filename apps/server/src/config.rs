use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;
use csas_netbanking::Settings;

/// Environment variables mapped onto the netbanking settings keys.
const SETTINGS_VARS: [(&str, &str); 8] = [
    ("CSAS_HOST", "host"),
    ("CSAS_CLIENT_ID", "clientId"),
    ("CSAS_CLIENT_SECRET", "clientSecret"),
    ("CSAS_REFRESH_TOKEN", "refreshToken"),
    ("CSAS_WEB_API_KEY", "webAPIKey"),
    ("CSAS_REFRESH_MS", "refresh"),
    ("CSAS_HISTORY_DAYS", "history"),
    ("CSAS_TOKEN_REFRESH", "tokenRefresh"),
];

pub struct Config {
    pub listen_addr: SocketAddr,
    pub items_file: PathBuf,
    pub settings: Settings,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let listen_addr: SocketAddr = std::env::var("CSAS_LISTEN_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:8090".to_string())
            .parse()
            .context("Invalid CSAS_LISTEN_ADDR")?;
        let items_file = std::env::var("CSAS_ITEMS_FILE")
            .unwrap_or_else(|_| "./items.json".into())
            .into();

        let properties: HashMap<String, String> = SETTINGS_VARS
            .iter()
            .filter_map(|(var, key)| std::env::var(var).ok().map(|v| (key.to_string(), v)))
            .collect();
        let settings = Settings::from_map(&properties)?;

        Ok(Self {
            listen_addr,
            items_file,
            settings,
        })
    }
}
