//! Process-wide cache of discovered entities.
//!
//! Maps entity id to a display label, plus a companion id -> IBAN map for
//! accounts that can carry transactions. Entries are never replaced: the
//! first writer wins, and only [`EntityCache::clear`] removes anything.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use log::{error, warn};
use serde::Serialize;

#[derive(Debug, Default)]
struct Entries {
    labels: HashMap<String, String>,
    /// Ids in discovery order.
    order: Vec<String>,
    ibans: HashMap<String, String>,
}

/// A discovered entity as reported to operators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiscoveredEntity {
    pub id: String,
    pub label: String,
}

#[derive(Debug, Default)]
pub struct EntityCache {
    entries: RwLock<Entries>,
}

impl EntityCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Entries> {
        self.entries.read().unwrap_or_else(|poisoned| {
            warn!("Entity cache lock was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    fn write(&self) -> RwLockWriteGuard<'_, Entries> {
        self.entries.write().unwrap_or_else(|poisoned| {
            warn!("Entity cache lock was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Insert `id` with `label` unless it is already known.
    ///
    /// Returns `true` if the entry was inserted.
    pub fn record_if_absent(&self, id: &str, label: impl Into<String>) -> bool {
        let mut entries = self.write();
        if entries.labels.contains_key(id) {
            return false;
        }
        entries.labels.insert(id.to_string(), label.into());
        entries.order.push(id.to_string());
        true
    }

    /// Remember the IBAN of an account. The first IBAN seen for an id is kept.
    pub fn record_iban(&self, id: &str, iban: impl Into<String>) {
        self.write()
            .ibans
            .entry(id.to_string())
            .or_insert_with(|| iban.into());
    }

    /// IBAN for `id`, or an empty string (logged) when none is known.
    pub fn lookup_iban(&self, id: &str) -> String {
        match self.read().ibans.get(id) {
            Some(iban) => iban.clone(),
            None => {
                error!("Cannot get IBAN for account: {}", id);
                String::new()
            }
        }
    }

    pub fn label(&self, id: &str) -> Option<String> {
        self.read().labels.get(id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.read().labels.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.read().order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All entities in discovery order.
    pub fn entities(&self) -> Vec<DiscoveredEntity> {
        let entries = self.read();
        entries
            .order
            .iter()
            .map(|id| DiscoveredEntity {
                id: id.clone(),
                label: entries.labels.get(id).cloned().unwrap_or_default(),
            })
            .collect()
    }

    /// Entities for which `is_bound` returns false, in discovery order.
    pub fn list_unbound<F>(&self, is_bound: F) -> Vec<DiscoveredEntity>
    where
        F: Fn(&str) -> bool,
    {
        self.entities()
            .into_iter()
            .filter(|entity| !is_bound(&entity.id))
            .collect()
    }

    pub fn clear(&self) {
        *self.write() = Entries::default();
    }
}
