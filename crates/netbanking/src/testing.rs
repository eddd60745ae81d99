//! In-memory transport used by the unit tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;

use crate::auth::TokenManager;
use crate::client::Transport;
use crate::config::Settings;
use crate::errors::{Error, Result};
use crate::items::{BindingProvider, BoundItem, ItemBus};

pub(crate) const TEST_HOST: &str = "https://bank.test";

pub(crate) fn test_settings() -> Settings {
    let mut settings = Settings::default();
    settings.bank_host = TEST_HOST.to_string();
    settings.client_id = "client".to_string();
    settings.client_secret = "secret".to_string();
    settings.refresh_token = "refresh".to_string();
    settings.api_key = "api-key".to_string();
    settings
}

/// Serves canned JSON keyed by API path (without the query string).
#[derive(Default)]
pub(crate) struct MockTransport {
    responses: Mutex<HashMap<String, Value>>,
    token: Mutex<Option<Value>>,
    requests: Mutex<Vec<String>>,
    headers: Mutex<Vec<(String, String)>>,
    forms: Mutex<Vec<Vec<(String, String)>>>,
}

impl MockTransport {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn respond(&self, path: &str, body: Value) {
        self.responses.lock().unwrap().insert(path.to_string(), body);
    }

    pub(crate) fn set_token_response(&self, body: Option<Value>) {
        *self.token.lock().unwrap() = body;
    }

    pub(crate) fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    pub(crate) fn request_count(&self, path: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.split('?').next() == Some(path))
            .count()
    }

    pub(crate) fn last_headers(&self) -> Vec<(String, String)> {
        self.headers.lock().unwrap().clone()
    }

    pub(crate) fn forms(&self) -> Vec<Vec<(String, String)>> {
        self.forms.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn post_form(&self, _url: &str, form: &[(&str, &str)]) -> Result<Value> {
        self.forms.lock().unwrap().push(
            form.iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        );
        self.token
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| Error::Request("HTTP 401 Unauthorized".to_string()))
    }

    async fn get_json(&self, url: &str, headers: &[(&str, &str)]) -> Result<Value> {
        let base = format!("{}/webapi/api/v3/netbanking/", TEST_HOST);
        let path = url.strip_prefix(&base).unwrap_or(url).to_string();
        self.requests.lock().unwrap().push(path.clone());
        *self.headers.lock().unwrap() = headers
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();

        let key = path.split('?').next().unwrap_or_default();
        self.responses
            .lock()
            .unwrap()
            .get(key)
            .cloned()
            .ok_or_else(|| Error::Request(format!("HTTP 404 Not Found: {}", key)))
    }
}

/// Token manager over `transport` that already holds an access token.
pub(crate) async fn authenticated(transport: Arc<MockTransport>) -> Arc<TokenManager> {
    transport.set_token_response(Some(serde_json::json!({ "access_token": "token-1" })));
    let tokens = TokenManager::new(transport, &test_settings());
    tokens.refresh().await.unwrap();
    Arc::new(tokens)
}

/// Fixed set of bound items.
pub(crate) struct StaticBindings(pub(crate) Vec<BoundItem>);

impl BindingProvider for StaticBindings {
    fn bound_items(&self) -> Vec<BoundItem> {
        self.0.clone()
    }
}

/// Item bus that keeps the last value per item and every update posted.
#[derive(Default)]
pub(crate) struct RecordingBus {
    states: Mutex<HashMap<String, String>>,
    updates: Mutex<Vec<(String, String)>>,
}

impl RecordingBus {
    pub(crate) fn updates(&self) -> Vec<(String, String)> {
        self.updates.lock().unwrap().clone()
    }
}

impl ItemBus for RecordingBus {
    fn state(&self, item_name: &str) -> Option<String> {
        self.states.lock().unwrap().get(item_name).cloned()
    }

    fn post_update(&self, item_name: &str, value: &str) {
        self.states
            .lock()
            .unwrap()
            .insert(item_name.to_string(), value.to_string());
        self.updates
            .lock()
            .unwrap()
            .push((item_name.to_string(), value.to_string()));
    }
}
