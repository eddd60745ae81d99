//! In-memory item registry standing in for a home-automation event bus.

use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use csas_netbanking::ItemBus;
use serde::Serialize;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemState {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Default)]
pub struct MemoryItemBus {
    states: RwLock<BTreeMap<String, String>>,
}

impl MemoryItemBus {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, BTreeMap<String, String>> {
        self.states.read().unwrap_or_else(|poisoned| {
            warn!("Item state lock was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    fn write(&self) -> RwLockWriteGuard<'_, BTreeMap<String, String>> {
        self.states.write().unwrap_or_else(|poisoned| {
            warn!("Item state lock was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Current value of every item that has been published, by name.
    pub fn snapshot(&self) -> Vec<ItemState> {
        self.read()
            .iter()
            .map(|(name, value)| ItemState {
                name: name.clone(),
                value: value.clone(),
            })
            .collect()
    }
}

impl ItemBus for MemoryItemBus {
    fn state(&self, item_name: &str) -> Option<String> {
        self.read().get(item_name).cloned()
    }

    fn post_update(&self, item_name: &str, value: &str) {
        info!(item = item_name, value, "Item updated");
        self.write()
            .insert(item_name.to_string(), value.to_string());
    }
}
