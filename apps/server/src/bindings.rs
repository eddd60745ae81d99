//! Item bindings loaded from a JSON items file.
//!
//! ```json
//! {
//!   "Savings": { "binding": "CCA4F9863D686D04" },
//!   "LastPayment": { "binding": "CCA4F9863D686D04#1", "role": "balance" }
//! }
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Context;
use csas_netbanking::{BindingProvider, BoundItem, ItemBinding, TransactionRole};
use serde::Deserialize;
use tracing::{info, warn};

#[derive(Debug, Deserialize)]
struct ItemEntry {
    binding: String,
    #[serde(default)]
    role: Option<String>,
}

/// Bindings declared in the items file, ordered by item name.
#[derive(Debug, Default)]
pub struct ItemsFile {
    items: Vec<BoundItem>,
}

impl ItemsFile {
    /// Load `path`. A missing file yields no items; the engine then idles.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            warn!("Items file {} not found, no item is bound", path.display());
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot read items file {}", path.display()))?;
        let items = Self::from_json(&raw)
            .with_context(|| format!("Invalid items file {}", path.display()))?;
        info!("Loaded {} item bindings from {}", items.items.len(), path.display());
        Ok(items)
    }

    /// Parse the items document. Entries with an invalid binding are skipped.
    pub fn from_json(raw: &str) -> anyhow::Result<Self> {
        let entries: BTreeMap<String, ItemEntry> = serde_json::from_str(raw)?;
        let items = entries
            .into_iter()
            .filter_map(|(name, entry)| match parse_entry(&entry) {
                Ok(binding) => Some(BoundItem::new(name, binding)),
                Err(e) => {
                    warn!("Ignoring item {}: {}", name, e);
                    None
                }
            })
            .collect();
        Ok(Self { items })
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

fn parse_entry(entry: &ItemEntry) -> csas_netbanking::Result<ItemBinding> {
    let role = entry
        .role
        .as_deref()
        .map(str::parse::<TransactionRole>)
        .transpose()?;
    ItemBinding::parse(&entry.binding, role)
}

impl BindingProvider for ItemsFile {
    fn bound_items(&self) -> Vec<BoundItem> {
        self.items.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use csas_netbanking::ItemKind;

    #[test]
    fn test_items_from_json() {
        let items = ItemsFile::from_json(
            r#"{
                "Savings": { "binding": "A1" },
                "Spendable": { "binding": "A1#disposable" },
                "LastShop": { "binding": "A1#1", "role": "info" },
                "Broken": { "binding": "A1#2" },
                "Unknown": { "binding": "A1#2", "role": "amount" }
            }"#,
        )
        .unwrap();

        let bound = items.bound_items();
        let names: Vec<&str> = bound.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["LastShop", "Savings", "Spendable"]);
        assert_eq!(bound[0].binding.kind, ItemKind::TransactionInfo);
        assert_eq!(bound[0].binding.ordinal, 1);
        assert_eq!(bound[2].binding.kind, ItemKind::DisposableBalance);
        assert!(items.is_bound("A1"));
        assert!(!items.is_bound("A2"));
    }

    #[test]
    fn test_missing_file_binds_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let items = ItemsFile::load(&dir.path().join("items.json")).unwrap();
        assert!(items.is_empty());
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("items.json");
        std::fs::write(&path, "[1, 2").unwrap();
        assert!(ItemsFile::load(&path).is_err());
    }
}
