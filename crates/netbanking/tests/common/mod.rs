#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use csas_netbanking::{
    BindingProvider, BoundItem, Error, ItemBus, Result, Settings, Transport,
};
use serde_json::{json, Value};

pub const BANK_HOST: &str = "https://bank.example";

pub fn settings() -> Settings {
    let mut settings = Settings::default();
    settings.bank_host = BANK_HOST.to_string();
    settings.client_id = "client".to_string();
    settings.client_secret = "secret".to_string();
    settings.refresh_token = "refresh".to_string();
    settings.api_key = "key".to_string();
    settings
}

/// A canned netbanking backend.
#[derive(Default)]
pub struct FakeBank {
    routes: Mutex<HashMap<String, Value>>,
    token: Mutex<Option<String>>,
    /// Rejects API calls until the next token is issued.
    expired: Mutex<bool>,
    log: Mutex<Vec<String>>,
    token_requests: Mutex<usize>,
}

impl FakeBank {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// A bank with one account `42` holding 1234.56 CZK and no history.
    pub fn with_account() -> Arc<Self> {
        let bank = Self::new();
        bank.issue_token("token-1");
        bank.route(
            "my/accounts",
            json!({ "accounts": [{
                "id": "42",
                "accountno": {
                    "number": "2000145399",
                    "bankCode": "0800",
                    "iban": "CZ6508000000192000145399"
                }
            }] }),
        );
        bank.route(
            "my/accounts/42/balance",
            json!({
                "balance": { "value": 123456, "precision": 2, "currency": "CZK" },
                "disposable": { "value": 100000, "precision": 2, "currency": "CZK" }
            }),
        );
        for category in [
            "my/cards",
            "my/contracts/buildings",
            "cz/my/contracts/pensions",
            "my/contracts/insurances",
            "my/securities",
        ] {
            bank.route(category, json!({}));
        }
        bank.route("my/accounts/42/reservations", json!({ "reservations": [] }));
        bank.route(
            "cz/my/accounts/CZ6508000000192000145399/transactions",
            json!({ "transactions": [] }),
        );
        bank
    }

    pub fn route(&self, path: &str, body: Value) {
        self.routes.lock().unwrap().insert(path.to_string(), body);
    }

    pub fn issue_token(&self, token: &str) {
        *self.token.lock().unwrap() = Some(token.to_string());
    }

    /// Make the bank reject the current access token.
    pub fn expire_token(&self) {
        *self.expired.lock().unwrap() = true;
    }

    pub fn revoke_token(&self) {
        *self.token.lock().unwrap() = None;
    }

    /// API paths requested so far, query strings stripped.
    pub fn requested(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    pub fn hits(&self, path: &str) -> usize {
        self.requested().iter().filter(|p| p.as_str() == path).count()
    }

    pub fn token_requests(&self) -> usize {
        *self.token_requests.lock().unwrap()
    }
}

#[async_trait]
impl Transport for FakeBank {
    async fn post_form(&self, url: &str, _form: &[(&str, &str)]) -> Result<Value> {
        assert_eq!(url, format!("{}/widp/oauth2/token", BANK_HOST));
        *self.token_requests.lock().unwrap() += 1;
        match self.token.lock().unwrap().clone() {
            Some(token) => {
                *self.expired.lock().unwrap() = false;
                Ok(json!({ "access_token": token, "token_type": "bearer" }))
            }
            None => Err(Error::Request("HTTP 400 Bad Request: invalid_grant".to_string())),
        }
    }

    async fn get_json(&self, url: &str, _headers: &[(&str, &str)]) -> Result<Value> {
        let base = format!("{}/webapi/api/v3/netbanking/", BANK_HOST);
        let path = url
            .strip_prefix(&base)
            .unwrap_or(url)
            .split('?')
            .next()
            .unwrap_or_default()
            .to_string();
        self.log.lock().unwrap().push(path.clone());
        if *self.expired.lock().unwrap() {
            return Err(Error::Request("HTTP 401 Unauthorized".to_string()));
        }
        self.routes
            .lock()
            .unwrap()
            .get(&path)
            .cloned()
            .ok_or_else(|| Error::Request(format!("HTTP 404 Not Found: {}", path)))
    }
}

pub struct Items(pub Vec<BoundItem>);

impl BindingProvider for Items {
    fn bound_items(&self) -> Vec<BoundItem> {
        self.0.clone()
    }
}

/// Item registry that remembers every update.
#[derive(Default)]
pub struct Bus {
    values: Mutex<HashMap<String, String>>,
    posted: Mutex<Vec<(String, String)>>,
}

impl Bus {
    pub fn value(&self, item: &str) -> Option<String> {
        self.values.lock().unwrap().get(item).cloned()
    }

    pub fn posted(&self) -> Vec<(String, String)> {
        self.posted.lock().unwrap().clone()
    }
}

impl ItemBus for Bus {
    fn state(&self, item_name: &str) -> Option<String> {
        self.value(item_name)
    }

    fn post_update(&self, item_name: &str, value: &str) {
        self.values
            .lock()
            .unwrap()
            .insert(item_name.to_string(), value.to_string());
        self.posted
            .lock()
            .unwrap()
            .push((item_name.to_string(), value.to_string()));
    }
}
