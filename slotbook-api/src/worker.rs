use slotbook_booking::ExpirationSweeper;
use std::sync::Arc;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{error, info};

/// Runs the sweeper forever on a fixed period. A failed pass is logged and
/// left for the next tick.
pub async fn start_sweep_worker(sweeper: Arc<ExpirationSweeper>, period: Duration) {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    info!("Hold sweeper started, running every {:?}", period);

    loop {
        ticker.tick().await;
        match sweeper.sweep().await {
            Ok(summary) if summary.released_count > 0 => {
                info!(
                    "Released {} expired holds for {} sessions",
                    summary.released_count,
                    summary.affected_sessions.len()
                );
            }
            Ok(_) => {}
            Err(e) => error!("Hold sweep failed: {}", e),
        }
    }
}
