use std::sync::{Arc, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use csas_netbanking::{CycleReport, ReqwestTransport, SyncEngine};
use serde::Serialize;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use crate::{bindings::ItemsFile, bus::MemoryItemBus, config::Config};

/// Outcome of the most recent refresh cycle.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LastCycle {
    pub finished_at: DateTime<Utc>,
    pub report: CycleReport,
}

pub struct AppState {
    pub engine: SyncEngine,
    pub items: ItemsFile,
    pub bus: MemoryItemBus,
    pub refresh_interval: Duration,
    last_cycle: RwLock<Option<LastCycle>>,
}

impl AppState {
    pub fn new(engine: SyncEngine, items: ItemsFile, refresh_interval: Duration) -> Self {
        Self {
            engine,
            items,
            bus: MemoryItemBus::new(),
            refresh_interval,
            last_cycle: RwLock::new(None),
        }
    }

    /// Run one refresh cycle against the loaded bindings and remember its report.
    pub async fn run_cycle(&self) -> CycleReport {
        let report = self.engine.run_cycle(&self.items, &self.bus).await;
        let last = LastCycle {
            finished_at: Utc::now(),
            report: report.clone(),
        };
        *self
            .last_cycle
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(last);
        report
    }

    pub fn last_cycle(&self) -> Option<LastCycle> {
        self.last_cycle
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

pub fn init_tracing() {
    let log_format = std::env::var("CSAS_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    if log_format.eq_ignore_ascii_case("json") {
        registry
            .with(fmt::layer().json().with_current_span(false))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(true).with_line_number(true))
            .init();
    }
}

pub fn build_state(config: &Config) -> anyhow::Result<Arc<AppState>> {
    let transport = Arc::new(ReqwestTransport::new(config.settings.timeout)?);
    let engine = SyncEngine::new(&config.settings, transport);
    let items = ItemsFile::load(&config.items_file)?;
    tracing::info!(
        "Netbanking host {} ({} items bound, {} day history)",
        config.settings.bank_host,
        items.len(),
        config.settings.history_days()
    );

    Ok(Arc::new(AppState::new(
        engine,
        items,
        config.settings.refresh_interval(),
    )))
}
