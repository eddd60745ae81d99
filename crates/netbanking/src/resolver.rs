//! Resolves an item binding to the string value published for it.

use std::sync::Arc;

use log::{debug, error};

use crate::auth::TokenManager;
use crate::errors::{Error, Result};
use crate::items::{ItemBinding, ItemKind, LOYALTY_ENTITY_ID};
use crate::models::{BalanceResponse, LoyaltyResponse};
use crate::money;
use crate::transactions::{SimpleTransaction, TransactionAggregator, TransactionCache};

/// Shown for the loyalty item when the programme reports no points.
pub const NOT_AVAILABLE: &str = "N/A";

const LOYALTY_PATH: &str = "cz/my/contracts/loyalty";

pub struct ItemResolver {
    tokens: Arc<TokenManager>,
    aggregator: TransactionAggregator,
}

impl ItemResolver {
    pub fn new(tokens: Arc<TokenManager>, aggregator: TransactionAggregator) -> Self {
        Self { tokens, aggregator }
    }

    /// Value for `binding`; an empty string whenever it cannot be determined.
    ///
    /// Transaction items read through `cycle_cache`, which fetches each
    /// account's records at most once.
    pub async fn resolve(
        &self,
        binding: &ItemBinding,
        cycle_cache: &mut TransactionCache,
    ) -> String {
        match binding.kind {
            ItemKind::Balance | ItemKind::DisposableBalance => {
                self.resolve_balance(binding).await.unwrap_or_else(|e| {
                    error!("Cannot get balance of {}: {}", binding.entity_id, e);
                    String::new()
                })
            }
            ItemKind::TransactionBalance
            | ItemKind::TransactionParty
            | ItemKind::TransactionInfo
            | ItemKind::TransactionVs
            | ItemKind::TransactionDescription => {
                let records = cycle_cache
                    .get_or_fetch(&self.aggregator, &binding.entity_id)
                    .await;
                project(records, binding).unwrap_or_else(|e| {
                    debug!("{} of {}: {}", binding.kind, binding.entity_id, e);
                    String::new()
                })
            }
        }
    }

    async fn resolve_balance(&self, binding: &ItemBinding) -> Result<String> {
        if binding.entity_id == LOYALTY_ENTITY_ID {
            return self.loyalty_points().await;
        }
        self.account_balance(&binding.entity_id, binding.kind == ItemKind::DisposableBalance)
            .await
    }

    /// Loyalty points, grouped, or [`NOT_AVAILABLE`] when none are reported.
    pub async fn loyalty_points(&self) -> Result<String> {
        let response: LoyaltyResponse = self.tokens.get(LOYALTY_PATH).await?;
        Ok(response
            .points_count
            .map(|points| money::group_thousands(&points))
            .unwrap_or_else(|| NOT_AVAILABLE.to_string()))
    }

    /// Ledger or disposable balance of an account in display form.
    pub async fn account_balance(&self, entity_id: &str, disposable: bool) -> Result<String> {
        let path = format!("my/accounts/{}/balance", entity_id);
        let response: BalanceResponse = self.tokens.get(&path).await?;

        let (amount, field) = if disposable {
            (response.disposable, "disposable")
        } else {
            (response.balance, "balance")
        };
        let amount = amount
            .ok_or_else(|| Error::Parse(format!("{} response has no {}", path, field)))?;

        debug!("Balance of {}: {:?}", entity_id, amount);
        Ok(amount.to_display())
    }
}

/// Pick the field a transaction item shows off the record at its ordinal.
fn project(records: &[SimpleTransaction], binding: &ItemBinding) -> Result<String> {
    let record = binding
        .ordinal
        .checked_sub(1)
        .and_then(|idx| records.get(idx))
        .ok_or_else(|| {
            Error::Lookup(format!(
                "transaction #{} requested, {} available",
                binding.ordinal,
                records.len()
            ))
        })?;

    record
        .field(binding.kind)
        .map(str::to_string)
        .ok_or_else(|| Error::Lookup(format!("{} is not a transaction field", binding.kind)))
}
