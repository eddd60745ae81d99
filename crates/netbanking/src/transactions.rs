//! Transaction and reservation aggregation for one account.
//!
//! Pending reservations and posted transactions are normalized into
//! [`SimpleTransaction`] records and concatenated, reservations first. Source
//! order is kept as-is inside each part; nothing is re-sorted by date.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Days, Local, NaiveDate, NaiveDateTime};
use log::{debug, error, warn};

use crate::auth::TokenManager;
use crate::cache::EntityCache;
use crate::errors::{Error, Result};
use crate::items::ItemKind;
use crate::models::{Reservation, ReservationsResponse, Transaction, TransactionsResponse};

/// Prefix marking a pending reservation in the formatted balance.
pub const RESERVATION_PREFIX: &str = "RES ";

/// Timestamps arrive without offset, e.g. `2024-03-18T00:00:00`.
const API_DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";
const API_DATE_LEN: usize = 19;
const DISPLAY_DATE_FORMAT: &str = "%d.%m.%Y";
/// Time and offset appended to the transaction window bounds.
const QUERY_TIME_SUFFIX: &str = "T00:00:00+01:00";

/// Normalized view of a posted transaction or a pending reservation.
///
/// Every field defaults to an empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SimpleTransaction {
    /// Amount and short date, e.g. `-1 250.00 CZK 18.03.2024`.
    pub balance: String,
    pub description: String,
    pub variable_symbol: String,
    pub party_info: String,
    pub party_description: String,
}

impl SimpleTransaction {
    /// The field an item of `kind` displays; `None` for balance kinds.
    pub fn field(&self, kind: ItemKind) -> Option<&str> {
        match kind {
            ItemKind::Balance | ItemKind::DisposableBalance => None,
            ItemKind::TransactionBalance => Some(&self.balance),
            ItemKind::TransactionParty => Some(&self.party_description),
            ItemKind::TransactionInfo => Some(&self.party_info),
            ItemKind::TransactionVs => Some(&self.variable_symbol),
            ItemKind::TransactionDescription => Some(&self.description),
        }
    }
}

/// Reformat an API timestamp as `dd.mm.yyyy`.
///
/// Anything after the seconds (fractions, offsets) is ignored.
pub fn short_date(raw: &str) -> Result<String> {
    let raw = raw.trim();
    let head = raw.get(..API_DATE_LEN).unwrap_or(raw);
    let date = match NaiveDateTime::parse_from_str(head, API_DATE_FORMAT) {
        Ok(dt) => dt.date(),
        Err(_) => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .map_err(|e| Error::Parse(format!("invalid date '{}': {}", raw, e)))?,
    };
    Ok(date.format(DISPLAY_DATE_FORMAT).to_string())
}

fn normalize_transaction(tx: &Transaction) -> Result<SimpleTransaction> {
    let amount = tx
        .amount
        .as_ref()
        .ok_or_else(|| Error::Parse("transaction without amount".to_string()))?;
    let booked = tx
        .booking_date
        .as_deref()
        .ok_or_else(|| Error::Parse("transaction without bookingDate".to_string()))?;

    let party = tx.account_party.clone().unwrap_or_default();
    Ok(SimpleTransaction {
        balance: format!("{} {}", amount.to_display(), short_date(booked)?),
        description: tx.description.clone().unwrap_or_default(),
        variable_symbol: tx.variable_symbol.clone().unwrap_or_default(),
        party_info: party.account_party_info.unwrap_or_default(),
        party_description: party.account_party_description.unwrap_or_default(),
    })
}

fn normalize_reservation(res: &Reservation) -> Result<SimpleTransaction> {
    let amount = res
        .amount
        .as_ref()
        .ok_or_else(|| Error::Parse("reservation without amount".to_string()))?;
    let created = res
        .creation_date
        .as_deref()
        .ok_or_else(|| Error::Parse("reservation without creationDate".to_string()))?;

    Ok(SimpleTransaction {
        balance: format!(
            "{}{} {}",
            RESERVATION_PREFIX,
            amount.to_display(),
            short_date(created)?
        ),
        description: res.description.clone().unwrap_or_default(),
        variable_symbol: String::new(),
        party_info: res.merchant_name.clone().unwrap_or_default(),
        party_description: res.merchant_address.clone().unwrap_or_default(),
    })
}

/// Normalize every record, logging and skipping the ones that fail.
fn normalize_all<T>(
    records: &[T],
    kind: &str,
    normalize: fn(&T) -> Result<SimpleTransaction>,
) -> Vec<SimpleTransaction> {
    records
        .iter()
        .enumerate()
        .filter_map(|(idx, record)| match normalize(record) {
            Ok(simple) => Some(simple),
            Err(e) => {
                warn!("Skipping {} #{}: {}", kind, idx + 1, e);
                None
            }
        })
        .collect()
}

pub struct TransactionAggregator {
    tokens: Arc<TokenManager>,
    cache: Arc<EntityCache>,
    history_days: u32,
}

impl TransactionAggregator {
    pub fn new(tokens: Arc<TokenManager>, cache: Arc<EntityCache>, history_days: u32) -> Self {
        Self {
            tokens,
            cache,
            history_days,
        }
    }

    /// Reservations followed by transactions of the trailing history window.
    ///
    /// A failure of either source is logged and yields no records for that
    /// source only.
    pub async fn fetch(&self, entity_id: &str) -> Vec<SimpleTransaction> {
        let mut records = self.reservations(entity_id).await.unwrap_or_else(|e| {
            error!("Cannot get reservations for {}: {}", entity_id, e);
            Vec::new()
        });

        let today = Local::now().date_naive();
        match self.transactions(entity_id, today).await {
            Ok(transactions) => records.extend(transactions),
            Err(e) => error!("Cannot get transactions for {}: {}", entity_id, e),
        }

        debug!("Aggregated {} records for {}", records.len(), entity_id);
        records
    }

    /// Pending reservations, unbounded by date.
    pub async fn reservations(&self, entity_id: &str) -> Result<Vec<SimpleTransaction>> {
        let path = format!("my/accounts/{}/reservations", entity_id);
        let response: ReservationsResponse = self.tokens.get(&path).await?;
        Ok(normalize_all(
            &response.reservations,
            "reservation",
            normalize_reservation,
        ))
    }

    /// Posted transactions from `history_days` before `today` through `today`.
    pub async fn transactions(
        &self,
        entity_id: &str,
        today: NaiveDate,
    ) -> Result<Vec<SimpleTransaction>> {
        let iban = self.cache.lookup_iban(entity_id);
        if iban.is_empty() {
            return Err(Error::Lookup(format!("no IBAN known for account {}", entity_id)));
        }

        let path = self.transactions_path(&iban, today);
        let response: TransactionsResponse = self.tokens.get(&path).await?;
        Ok(normalize_all(
            &response.transactions,
            "transaction",
            normalize_transaction,
        ))
    }

    fn transactions_path(&self, iban: &str, today: NaiveDate) -> String {
        let start = today
            .checked_sub_days(Days::new(u64::from(self.history_days)))
            .unwrap_or(today);
        let bound = |date: NaiveDate| {
            urlencoding::encode(&format!("{}{}", date.format("%Y-%m-%d"), QUERY_TIME_SUFFIX))
                .into_owned()
        };
        format!(
            "cz/my/accounts/{}/transactions?dateStart={}&dateEnd={}",
            iban,
            bound(start),
            bound(today)
        )
    }
}

/// Per-cycle cache of aggregated records, keyed by entity id.
///
/// Built fresh at the start of every refresh cycle and dropped at its end, so
/// each account is fetched at most once per cycle.
#[derive(Debug, Default)]
pub struct TransactionCache {
    entries: HashMap<String, Vec<SimpleTransaction>>,
}

impl TransactionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, entity_id: &str) -> bool {
        self.entries.contains_key(entity_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Records for `entity_id`, fetching them through `aggregator` on first use.
    pub async fn get_or_fetch(
        &mut self,
        aggregator: &TransactionAggregator,
        entity_id: &str,
    ) -> &[SimpleTransaction] {
        if !self.entries.contains_key(entity_id) {
            let records = aggregator.fetch(entity_id).await;
            self.entries.insert(entity_id.to_string(), records);
        }
        self.entries
            .get(entity_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}
