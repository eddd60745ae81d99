//! The scheduled refresh cycle.
//!
//! ```text
//! Idle -> Authenticating -> [Discovering] -> Resolving -> Idle
//! ```
//!
//! Discovery only runs on the cycle that turns an empty access token into a
//! valid one. Everything a cycle touches is fault-isolated: a failing endpoint
//! costs the values that depend on it for this cycle and nothing else.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use log::{debug, info, warn};
use serde::Serialize;

use crate::auth::TokenManager;
use crate::cache::{DiscoveredEntity, EntityCache};
use crate::client::Transport;
use crate::config::{Settings, TokenRefreshPolicy};
use crate::discovery::{DiscoveryScanner, DiscoverySummary};
use crate::items::{BindingProvider, ItemBus};
use crate::resolver::ItemResolver;
use crate::transactions::{TransactionAggregator, TransactionCache};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleState {
    Idle,
    Authenticating,
    Discovering,
    Resolving,
}

impl fmt::Display for CycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CycleState::Idle => write!(f, "idle"),
            CycleState::Authenticating => write!(f, "authenticating"),
            CycleState::Discovering => write!(f, "discovering"),
            CycleState::Resolving => write!(f, "resolving"),
        }
    }
}

/// How a cycle ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleOutcome {
    /// No items are bound; nothing was requested.
    NoBindings,
    /// No access token could be obtained; retried on the next tick.
    Unauthenticated,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleReport {
    pub outcome: CycleOutcome,
    /// Present when this cycle ran discovery.
    pub discovery: Option<DiscoverySummary>,
    pub items_resolved: usize,
    pub items_published: usize,
}

impl CycleReport {
    fn ended(outcome: CycleOutcome) -> Self {
        Self {
            outcome,
            discovery: None,
            items_resolved: 0,
            items_published: 0,
        }
    }
}

/// Owns the process-wide state (token, entity cache) and drives cycles.
///
/// Cycles must not overlap; the caller awaits one before starting the next.
pub struct SyncEngine {
    tokens: Arc<TokenManager>,
    entities: Arc<EntityCache>,
    scanner: DiscoveryScanner,
    resolver: ItemResolver,
    refresh_policy: TokenRefreshPolicy,
    state: Mutex<CycleState>,
}

impl SyncEngine {
    pub fn new(settings: &Settings, transport: Arc<dyn Transport>) -> Self {
        let tokens = Arc::new(TokenManager::new(transport, settings));
        let entities = Arc::new(EntityCache::new());
        let aggregator =
            TransactionAggregator::new(tokens.clone(), entities.clone(), settings.history_days());

        Self {
            scanner: DiscoveryScanner::new(tokens.clone(), entities.clone()),
            resolver: ItemResolver::new(tokens.clone(), aggregator),
            tokens,
            entities,
            refresh_policy: settings.refresh_policy,
            state: Mutex::new(CycleState::Idle),
        }
    }

    pub fn tokens(&self) -> &Arc<TokenManager> {
        &self.tokens
    }

    pub fn entities(&self) -> &Arc<EntityCache> {
        &self.entities
    }

    fn lock_state(&self) -> MutexGuard<'_, CycleState> {
        self.state.lock().unwrap_or_else(|poisoned| {
            warn!("Cycle state mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    fn set_state(&self, state: CycleState) {
        *self.lock_state() = state;
    }

    pub fn state(&self) -> CycleState {
        *self.lock_state()
    }

    /// Discovered entities no bound item refers to.
    pub fn unbound_entities(&self, bindings: &dyn BindingProvider) -> Vec<DiscoveredEntity> {
        let items = bindings.bound_items();
        self.entities
            .list_unbound(|id| items.iter().any(|item| item.binding.entity_id == id))
    }

    /// Drop the session: forget the access token and every discovered entity.
    pub fn reset(&self) {
        self.tokens.clear();
        self.entities.clear();
        self.set_state(CycleState::Idle);
    }

    /// Run one refresh cycle to completion.
    pub async fn run_cycle(
        &self,
        bindings: &dyn BindingProvider,
        bus: &dyn ItemBus,
    ) -> CycleReport {
        let report = self.run_cycle_internal(bindings, bus).await;
        self.set_state(CycleState::Idle);

        info!(
            "Refresh cycle finished: {:?}, {} items resolved, {} published",
            report.outcome, report.items_resolved, report.items_published
        );
        report
    }

    async fn run_cycle_internal(
        &self,
        bindings: &dyn BindingProvider,
        bus: &dyn ItemBus,
    ) -> CycleReport {
        let items = bindings.bound_items();
        if items.is_empty() {
            debug!("No item is bound to netbanking, refresh cycle skipped");
            return CycleReport::ended(CycleOutcome::NoBindings);
        }

        self.set_state(CycleState::Authenticating);
        let mut discovery = None;
        if !self.tokens.is_authenticated() {
            if self.tokens.refresh().await.is_err() {
                debug!("Netbanking token refresh failed with no token held");
            }
            if !self.tokens.is_authenticated() {
                warn!("No netbanking access token, refresh cycle aborted");
                return CycleReport::ended(CycleOutcome::Unauthenticated);
            }

            self.set_state(CycleState::Discovering);
            discovery = Some(self.scanner.discover().await);
            self.log_unbound(bindings);
        } else if self.refresh_due() && self.tokens.refresh().await.is_err() {
            debug!("Netbanking token refresh failed, keeping the current token");
        }

        self.set_state(CycleState::Resolving);
        let mut cycle_cache = TransactionCache::new();
        let mut published = 0;
        for item in &items {
            let value = self.resolver.resolve(&item.binding, &mut cycle_cache).await;
            if bus.state(&item.name).as_deref() != Some(value.as_str()) {
                bus.post_update(&item.name, &value);
                published += 1;
            }
        }

        CycleReport {
            outcome: CycleOutcome::Completed,
            discovery,
            items_resolved: items.len(),
            items_published: published,
        }
    }

    fn refresh_due(&self) -> bool {
        match self.refresh_policy {
            TokenRefreshPolicy::EveryCycle => true,
            TokenRefreshPolicy::WhenEmpty => self.tokens.needs_refresh(),
        }
    }

    fn log_unbound(&self, bindings: &dyn BindingProvider) {
        let unbound = self.unbound_entities(bindings);
        if unbound.is_empty() {
            return;
        }

        let listing: String = unbound
            .iter()
            .map(|entity| format!("\t{} Id: {}\n", entity.label, entity.id))
            .collect();
        info!("Found unbound netbanking account(s): \n{}", listing);
    }
}
