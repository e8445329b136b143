use std::time::Duration;

use chrono::Utc;
use fulfillment_engine::{events::EventProducers, Assignment, AssignmentApi, AssignmentConfig, SqliteDatabase};
use log::*;
use tokio::task::JoinHandle;

/// Starts the courier assignment worker. Do not await the returned JoinHandle, as it will run indefinitely.
///
/// Every `interval` the worker scans for confirmed orders without a courier and binds one where the
/// eligibility window has elapsed. The scan holds no state between ticks, so killing and restarting the
/// process simply resumes the scan on the next tick.
pub fn start_assignment_worker(
    db: SqliteDatabase,
    producers: EventProducers,
    interval: Duration,
    config: AssignmentConfig,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(interval);
        let api = AssignmentApi::new(db, config, producers);
        info!("🚚️ Courier assignment worker started (scanning every {}s)", interval.as_secs());
        loop {
            timer.tick().await;
            debug!("🚚️ Running courier assignment scan");
            match api.run_tick(Utc::now()).await {
                Ok(summary) => {
                    if summary.scanned_count() > 0 {
                        info!(
                            "🚚️ Scan complete. {} assigned, {} inside their eligibility window, {} without a \
                             courier, {} failed",
                            summary.assigned_count(),
                            summary.waiting,
                            summary.starved,
                            summary.failed
                        );
                    }
                    debug!("🚚️ Assigned this tick: {}", assignment_list(&summary.assigned));
                },
                Err(e) => {
                    error!("🚚️ Error running courier assignment scan: {e}");
                },
            }
        }
    })
}

fn assignment_list(assignments: &[Assignment]) -> String {
    if assignments.is_empty() {
        return "none".to_string();
    }
    assignments
        .iter()
        .map(|a| format!("order {} -> courier {} ({})", a.order.order_id, a.courier.id, a.courier.name))
        .collect::<Vec<String>>()
        .join(", ")
}
