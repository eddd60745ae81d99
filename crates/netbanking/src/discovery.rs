//! Entity discovery across the netbanking product categories.
//!
//! Each category endpoint is scanned independently: a failing category is
//! logged and skipped, and the remaining categories are still scanned.

use std::fmt;
use std::sync::Arc;

use log::{debug, error, info};
use serde::Serialize;

use crate::auth::TokenManager;
use crate::cache::EntityCache;
use crate::errors::Result;
use crate::models::{
    AccountNumber, AccountsResponse, BuildingsResponse, CardsResponse, InsurancesResponse,
    PensionsResponse, SecuritiesResponse,
};

/// Product categories that yield entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Accounts,
    Cards,
    BuildingSavings,
    Pensions,
    Insurances,
    Securities,
}

impl Category {
    /// Scan order used by [`DiscoveryScanner::discover`].
    pub const ALL: [Category; 6] = [
        Category::Accounts,
        Category::Cards,
        Category::BuildingSavings,
        Category::Pensions,
        Category::Insurances,
        Category::Securities,
    ];

    /// Endpoint path relative to the netbanking API base.
    pub fn path(&self) -> &'static str {
        match self {
            Category::Accounts => "my/accounts",
            Category::Cards => "my/cards",
            Category::BuildingSavings => "my/contracts/buildings",
            Category::Pensions => "cz/my/contracts/pensions",
            Category::Insurances => "my/contracts/insurances",
            Category::Securities => "my/securities",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Category::Accounts => write!(f, "accounts"),
            Category::Cards => write!(f, "cards"),
            Category::BuildingSavings => write!(f, "building savings"),
            Category::Pensions => write!(f, "pensions"),
            Category::Insurances => write!(f, "insurances"),
            Category::Securities => write!(f, "securities"),
        }
    }
}

/// Outcome of one discovery pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DiscoverySummary {
    /// Entities newly added to the cache.
    pub recorded: usize,
    /// Categories whose endpoint could not be read.
    pub failed: Vec<Category>,
}

pub struct DiscoveryScanner {
    tokens: Arc<TokenManager>,
    cache: Arc<EntityCache>,
}

impl DiscoveryScanner {
    pub fn new(tokens: Arc<TokenManager>, cache: Arc<EntityCache>) -> Self {
        Self { tokens, cache }
    }

    /// Scan every category and populate the entity cache.
    pub async fn discover(&self) -> DiscoverySummary {
        let mut summary = DiscoverySummary::default();

        for category in Category::ALL {
            match self.scan(category).await {
                Ok(recorded) => {
                    debug!("Discovered {} new entities in {}", recorded, category);
                    summary.recorded += recorded;
                }
                Err(e) => {
                    error!("Cannot get netbanking {}: {}", category, e);
                    summary.failed.push(category);
                }
            }
        }

        info!(
            "Discovery finished: {} new entities, {} categories failed",
            summary.recorded,
            summary.failed.len()
        );
        summary
    }

    /// Scan one category, returning how many entities were newly recorded.
    pub async fn scan(&self, category: Category) -> Result<usize> {
        let path = category.path();
        let recorded = match category {
            Category::Accounts => {
                let response: AccountsResponse = self.tokens.get(path).await?;
                response
                    .accounts
                    .iter()
                    .filter(|a| self.record_account(&a.id, a.accountno.as_ref()))
                    .count()
            }
            Category::Cards => {
                let response: CardsResponse = self.tokens.get(path).await?;
                response
                    .cards
                    .iter()
                    .filter_map(|card| card.main_account.as_ref())
                    .filter(|a| self.record_account(&a.id, a.accountno.as_ref()))
                    .count()
            }
            Category::BuildingSavings => {
                let response: BuildingsResponse = self.tokens.get(path).await?;
                response
                    .buildings
                    .iter()
                    .filter(|a| self.record_account(&a.id, a.accountno.as_ref()))
                    .count()
            }
            Category::Pensions => {
                let response: PensionsResponse = self.tokens.get(path).await?;
                response
                    .pensions
                    .iter()
                    .filter(|p| {
                        let number = p.agreement_number.as_deref().unwrap_or_default();
                        self.cache
                            .record_if_absent(&p.id, format!("Pension agreement: {}", number))
                    })
                    .count()
            }
            Category::Insurances => {
                let response: InsurancesResponse = self.tokens.get(path).await?;
                response
                    .insurances
                    .iter()
                    .filter(|i| {
                        let label = format!(
                            "Insurance: {} ({})",
                            i.policy_number.as_deref().unwrap_or_default(),
                            i.product_i18n.as_deref().unwrap_or_default()
                        );
                        self.cache.record_if_absent(&i.id, label)
                    })
                    .count()
            }
            Category::Securities => {
                let response: SecuritiesResponse = self.tokens.get(path).await?;
                response
                    .securities_accounts
                    .iter()
                    .filter(|s| {
                        let number = s.accountno.as_deref().unwrap_or_default();
                        self.cache
                            .record_if_absent(&s.id, format!("Securities account: {}", number))
                    })
                    .count()
            }
        };
        Ok(recorded)
    }

    /// Record a bank account and its IBAN. Accounts without a number are skipped.
    fn record_account(&self, id: &str, number: Option<&AccountNumber>) -> bool {
        let Some(number) = number else {
            return false;
        };

        let label = format!(
            "Account: {}/{}",
            number.number.as_deref().unwrap_or_default(),
            number.bank_code.as_deref().unwrap_or_default()
        );
        let inserted = self.cache.record_if_absent(id, label);
        if let Some(iban) = number.iban.as_deref().filter(|iban| !iban.is_empty()) {
            self.cache.record_iban(id, iban);
        }
        inserted
    }
}
