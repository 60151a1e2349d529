//! Countdown tick task

use std::{sync::Arc, time::Duration};

use tokio::time::{interval_at, Instant};
use tracing::debug;

use crate::controller::{ControllerShared, TickOutcome};

const TICK_PERIOD: Duration = Duration::from_secs(1);

/// One-second tick source. Ends when the countdown completes or when a newer
/// tick source has replaced it.
pub(crate) async fn countdown_task(shared: Arc<ControllerShared>, generation: u64) {
    debug!(generation, "Tick source started");

    let mut interval = interval_at(Instant::now() + TICK_PERIOD, TICK_PERIOD);

    loop {
        interval.tick().await;
        match shared.on_tick(generation) {
            TickOutcome::Continue => {}
            TickOutcome::Completed => {
                debug!(generation, "Tick source finished with the countdown");
                break;
            }
            TickOutcome::Stale => {
                debug!(generation, "Tick source superseded");
                break;
            }
        }
    }
}
