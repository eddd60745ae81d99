//! Background scheduler for the netbanking refresh cycle.
//!
//! The first cycle runs right away; each later tick waits for the previous
//! cycle to finish, so cycles never overlap.

use std::sync::Arc;

use csas_netbanking::CycleOutcome;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::main_lib::AppState;

/// Starts the background refresh scheduler.
pub fn start_refresh_scheduler(state: Arc<AppState>) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(
            "Netbanking refresh scheduler started ({}s interval)",
            state.refresh_interval.as_secs()
        );

        let mut refresh_interval = interval(state.refresh_interval);
        refresh_interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            refresh_interval.tick().await;
            run_scheduled_cycle(&state).await;
        }
    })
}

/// Runs a single scheduled refresh cycle.
async fn run_scheduled_cycle(state: &Arc<AppState>) {
    let report = state.run_cycle().await;
    match report.outcome {
        CycleOutcome::NoBindings => debug!("Scheduled refresh skipped: no item is bound"),
        CycleOutcome::Unauthenticated => {
            warn!("Scheduled refresh skipped: not authenticated, retrying on next tick")
        }
        CycleOutcome::Completed => {
            if let Some(discovery) = &report.discovery {
                info!(
                    "Discovered {} entities ({} categories failed)",
                    discovery.recorded,
                    discovery.failed.len()
                );
            }
        }
    }
}
