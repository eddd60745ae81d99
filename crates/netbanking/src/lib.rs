//! CSAS Netbanking - account balances and recent transactions from the
//! Česká spořitelna web API.
//!
//! This crate discovers the accounts, cards, savings contracts, pensions,
//! insurances and securities accounts of a netbanking user, and on every
//! refresh cycle resolves the configured items to display strings that are
//! published to the host's item bus.

pub mod auth;
pub mod cache;
pub mod client;
pub mod config;
pub mod cycle;
pub mod discovery;
pub mod errors;
pub mod items;
pub mod models;
pub mod money;
pub mod resolver;
pub mod transactions;

#[cfg(test)]
mod testing;

// Re-export commonly used types
pub use auth::TokenManager;
pub use cache::{DiscoveredEntity, EntityCache};
pub use client::{ReqwestTransport, Transport};
pub use config::{Settings, TokenRefreshPolicy};
pub use cycle::{CycleOutcome, CycleReport, CycleState, SyncEngine};
pub use discovery::{Category, DiscoveryScanner, DiscoverySummary};
pub use errors::{Error, Result};
pub use items::{
    BindingProvider, BoundItem, ItemBinding, ItemBus, ItemKind, TransactionRole,
    LOYALTY_ENTITY_ID,
};
pub use money::{format_amount, format_money, group_thousands};
pub use resolver::ItemResolver;
pub use transactions::{SimpleTransaction, TransactionAggregator, TransactionCache};
