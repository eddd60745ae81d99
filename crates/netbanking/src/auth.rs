//! OAuth token lifecycle and authenticated API access.
//!
//! The refresh token is supplied by configuration and never rotated here.
//! The access token is the only mutable piece of state; it is replaced on a
//! successful refresh and otherwise left as it was, so a transient outage of
//! the token endpoint never discards a token that may still be valid.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use log::{debug, error, warn};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::client::Transport;
use crate::config::Settings;
use crate::errors::{Error, Result};
use crate::models::TokenResponse;

/// Redirect URI registered for the application; the token endpoint requires it.
pub const REDIRECT_URI: &str = "https://localhost/code";

/// Header carrying the web API key on every API request.
pub const API_KEY_HEADER: &str = "WEB-API-key";

#[derive(Clone)]
struct Credentials {
    client_id: String,
    client_secret: String,
    refresh_token: String,
    api_key: String,
}

/// Holds credentials and the current access token.
pub struct TokenManager {
    transport: Arc<dyn Transport>,
    credentials: Credentials,
    token_url: String,
    api_base_url: String,
    access_token: RwLock<String>,
    /// Set when an API request failed since the last successful refresh.
    request_failed: AtomicBool,
}

impl TokenManager {
    pub fn new(transport: Arc<dyn Transport>, settings: &Settings) -> Self {
        Self {
            transport,
            credentials: Credentials {
                client_id: settings.client_id.clone(),
                client_secret: settings.client_secret.clone(),
                refresh_token: settings.refresh_token.clone(),
                api_key: settings.api_key.clone(),
            },
            token_url: settings.token_url(),
            api_base_url: settings.api_base_url(),
            access_token: RwLock::new(String::new()),
            request_failed: AtomicBool::new(false),
        }
    }

    fn read_token(&self) -> RwLockReadGuard<'_, String> {
        self.access_token.read().unwrap_or_else(|poisoned| {
            warn!("Access token lock was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    fn write_token(&self) -> RwLockWriteGuard<'_, String> {
        self.access_token.write().unwrap_or_else(|poisoned| {
            warn!("Access token lock was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Current access token; empty while unauthenticated.
    pub fn access_token(&self) -> String {
        self.read_token().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        !self.read_token().is_empty()
    }

    /// Whether an API request failed since the token was last refreshed.
    ///
    /// The bank does not say when a token expires; a failed request is the
    /// only hint that the current one may no longer be accepted.
    pub fn needs_refresh(&self) -> bool {
        self.request_failed.load(Ordering::SeqCst)
    }

    /// Forget the access token, e.g. when the host deactivates the engine.
    pub fn clear(&self) {
        self.write_token().clear();
        self.request_failed.store(false, Ordering::SeqCst);
    }

    /// Exchange the refresh token for a new access token.
    ///
    /// On failure the error is logged and returned, and the previously held
    /// access token (if any) is kept.
    pub async fn refresh(&self) -> Result<()> {
        match self.request_access_token().await {
            Ok(token) => {
                *self.write_token() = token;
                self.request_failed.store(false, Ordering::SeqCst);
                debug!("[Netbanking] Access token refreshed successfully");
                Ok(())
            }
            Err(e) => {
                error!("Cannot get netbanking access token: {}", e);
                Err(e)
            }
        }
    }

    async fn request_access_token(&self) -> Result<String> {
        let creds = &self.credentials;
        let form = [
            ("client_id", creds.client_id.as_str()),
            ("client_secret", creds.client_secret.as_str()),
            ("redirect_uri", REDIRECT_URI),
            ("grant_type", "refresh_token"),
            ("refresh_token", creds.refresh_token.as_str()),
        ];

        let body = self
            .transport
            .post_form(&self.token_url, &form)
            .await
            .map_err(|e| Error::Auth(e.to_string()))?;

        let response: TokenResponse = serde_json::from_value(body)
            .map_err(|e| Error::Auth(format!("Malformed token response: {}", e)))?;

        response
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| Error::Auth("Token response has no access_token".to_string()))
    }

    /// GET an API path (relative to the netbanking base) with the current
    /// access token and API key, returning the raw JSON body.
    pub async fn authenticated_get(&self, path: &str) -> Result<Value> {
        let url = format!("{}{}", self.api_base_url, path);
        let bearer = format!("Bearer {}", self.access_token());
        let headers = [
            (API_KEY_HEADER, self.credentials.api_key.as_str()),
            ("Authorization", bearer.as_str()),
        ];

        let result = self.transport.get_json(&url, &headers).await;
        if let Err(Error::Request(_)) = &result {
            self.request_failed.store(true, Ordering::SeqCst);
        }
        result
    }

    /// [`authenticated_get`](Self::authenticated_get) decoded into `T`.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let body = self.authenticated_get(path).await?;
        serde_json::from_value(body).map_err(|e| Error::Parse(format!("{}: {}", path, e)))
    }
}
