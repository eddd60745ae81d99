//! Item bindings and the host seams the refresh cycle talks to.
//!
//! A binding descriptor has one of three forms:
//!
//! - `<entityId>` - ledger balance
//! - `<entityId>#disposable` - disposable balance
//! - `<entityId>#<ordinal>` - one field of the n-th (1-based) transaction
//!
//! Which transaction field an item shows is not part of the descriptor; it
//! comes from the role the item was declared with.

use std::fmt;
use std::str::FromStr;

use crate::errors::{Error, Result};

/// Pseudo entity id standing for the loyalty programme points.
pub const LOYALTY_ENTITY_ID: &str = "ibod";

const DISPOSABLE_SUFFIX: &str = "disposable";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemKind {
    Balance,
    DisposableBalance,
    TransactionBalance,
    TransactionParty,
    TransactionInfo,
    TransactionVs,
    TransactionDescription,
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ItemKind::Balance => "BALANCE",
            ItemKind::DisposableBalance => "DISPOSABLE_BALANCE",
            ItemKind::TransactionBalance => "TRANSACTION_BALANCE",
            ItemKind::TransactionParty => "TRANSACTION_PARTY",
            ItemKind::TransactionInfo => "TRANSACTION_INFO",
            ItemKind::TransactionVs => "TRANSACTION_VS",
            ItemKind::TransactionDescription => "TRANSACTION_DESCRIPTION",
        };
        f.write_str(name)
    }
}

/// Role an item declares to pick a transaction field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionRole {
    Balance,
    Party,
    Info,
    Vs,
    Description,
}

impl TransactionRole {
    pub fn kind(&self) -> ItemKind {
        match self {
            TransactionRole::Balance => ItemKind::TransactionBalance,
            TransactionRole::Party => ItemKind::TransactionParty,
            TransactionRole::Info => ItemKind::TransactionInfo,
            TransactionRole::Vs => ItemKind::TransactionVs,
            TransactionRole::Description => ItemKind::TransactionDescription,
        }
    }
}

impl FromStr for TransactionRole {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "balance" => Ok(Self::Balance),
            "party" => Ok(Self::Party),
            "info" => Ok(Self::Info),
            "vs" | "variable_symbol" => Ok(Self::Vs),
            "description" => Ok(Self::Description),
            other => Err(Error::Config(format!("unknown transaction role '{}'", other))),
        }
    }
}

/// What an item is bound to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemBinding {
    pub entity_id: String,
    pub kind: ItemKind,
    /// 1-based; only meaningful for transaction kinds.
    pub ordinal: usize,
}

impl ItemBinding {
    pub fn balance(entity_id: impl Into<String>) -> Self {
        Self {
            entity_id: entity_id.into(),
            kind: ItemKind::Balance,
            ordinal: 0,
        }
    }

    pub fn disposable(entity_id: impl Into<String>) -> Self {
        Self {
            entity_id: entity_id.into(),
            kind: ItemKind::DisposableBalance,
            ordinal: 0,
        }
    }

    pub fn transaction(
        entity_id: impl Into<String>,
        role: TransactionRole,
        ordinal: usize,
    ) -> Self {
        Self {
            entity_id: entity_id.into(),
            kind: role.kind(),
            ordinal,
        }
    }

    /// Parse a binding descriptor. `role` is required for transaction items.
    pub fn parse(descriptor: &str, role: Option<TransactionRole>) -> Result<Self> {
        let descriptor = descriptor.trim();
        let (entity_id, suffix) = match descriptor.split_once('#') {
            Some((id, suffix)) => (id.trim(), Some(suffix.trim())),
            None => (descriptor, None),
        };

        if entity_id.is_empty() {
            return Err(Error::Config(format!(
                "binding '{}' has no entity id",
                descriptor
            )));
        }

        match suffix {
            None => Ok(Self::balance(entity_id)),
            Some(s) if s.eq_ignore_ascii_case(DISPOSABLE_SUFFIX) => Ok(Self::disposable(entity_id)),
            Some(s) => {
                let ordinal: usize = s.parse().map_err(|_| {
                    Error::Config(format!("binding '{}' has an invalid suffix", descriptor))
                })?;
                if ordinal == 0 {
                    return Err(Error::Config(format!(
                        "binding '{}': transaction ordinals start at 1",
                        descriptor
                    )));
                }
                let role = role.ok_or_else(|| {
                    Error::Config(format!(
                        "binding '{}' selects a transaction but declares no role",
                        descriptor
                    ))
                })?;
                Ok(Self::transaction(entity_id, role, ordinal))
            }
        }
    }
}

/// An item name together with its binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundItem {
    pub name: String,
    pub binding: ItemBinding,
}

impl BoundItem {
    pub fn new(name: impl Into<String>, binding: ItemBinding) -> Self {
        Self {
            name: name.into(),
            binding,
        }
    }
}

/// Source of the currently configured item bindings.
pub trait BindingProvider: Send + Sync {
    fn bound_items(&self) -> Vec<BoundItem>;

    /// Whether any item references `entity_id`.
    fn is_bound(&self, entity_id: &str) -> bool {
        self.bound_items()
            .iter()
            .any(|item| item.binding.entity_id == entity_id)
    }
}

/// Item registry and event bus of the host.
pub trait ItemBus: Send + Sync {
    /// Last published value of `item_name`, if any.
    fn state(&self, item_name: &str) -> Option<String>;

    /// Publish a new value for `item_name`.
    fn post_update(&self, item_name: &str, value: &str);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_balance() {
        let binding = ItemBinding::parse("CCA4F9863D686D04", None).unwrap();
        assert_eq!(binding, ItemBinding::balance("CCA4F9863D686D04"));
    }

    #[test]
    fn test_parse_disposable() {
        let binding = ItemBinding::parse("42#disposable", Some(TransactionRole::Party)).unwrap();
        assert_eq!(binding.kind, ItemKind::DisposableBalance);
        assert_eq!(binding.entity_id, "42");
    }

    #[test]
    fn test_parse_transaction() {
        let binding = ItemBinding::parse("42#3", Some(TransactionRole::Vs)).unwrap();
        assert_eq!(binding.kind, ItemKind::TransactionVs);
        assert_eq!(binding.ordinal, 3);
    }

    #[test]
    fn test_parse_rejects_bad_descriptors() {
        for (descriptor, role) in [
            ("", None),
            ("#2", Some(TransactionRole::Info)),
            ("42#0", Some(TransactionRole::Info)),
            ("42#first", Some(TransactionRole::Info)),
            ("42#1", None),
        ] {
            let err = ItemBinding::parse(descriptor, role).unwrap_err();
            assert!(matches!(err, Error::Config(_)), "{}", descriptor);
        }
    }

    #[test]
    fn test_role_from_str() {
        assert_eq!("party".parse::<TransactionRole>().unwrap(), TransactionRole::Party);
        assert_eq!("VS".parse::<TransactionRole>().unwrap(), TransactionRole::Vs);
        assert!("amount".parse::<TransactionRole>().is_err());
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(ItemKind::TransactionDescription.to_string(), "TRANSACTION_DESCRIPTION");
        assert_eq!(ItemKind::Balance.to_string(), "BALANCE");
    }
}
