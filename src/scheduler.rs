use std::{sync::Arc, time::Duration};

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::{client::BatchWriter, exporter::Exporter, registry::Registry, SetupError};

/// Runs one export cycle per tick, strictly one after another.
#[derive(Debug)]
pub struct Scheduler<R, W> {
    exporter: Arc<Exporter<R, W>>,
    interval: Duration,
}
impl<R, W> Scheduler<R, W>
where
    R: Registry + 'static,
    W: BatchWriter + 'static,
{
    pub fn new(exporter: Exporter<R, W>, interval: Duration) -> Result<Self, SetupError> {
        if interval.is_zero() {
            return Err(SetupError::ZeroInterval);
        }
        Ok(Self {
            exporter: Arc::new(exporter),
            interval,
        })
    }

    /// Ticks until `cancel` fires and returns the number of completed cycles.
    ///
    /// The first cycle starts one interval after the call. A cycle that
    /// overruns the interval delays the next tick instead of queueing extra
    /// ones. Cancellation is only observed between cycles.
    pub async fn run(self, cancel: CancellationToken) -> u64 {
        info!(
            interval = ?self.interval,
            database = self.exporter.database(),
            "starting metrics export"
        );
        let start = tokio::time::Instant::now() + self.interval;
        let mut ticker = tokio::time::interval_at(start, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut cycles = 0;
        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }
            let exporter = self.exporter.clone();
            // the write is blocking I/O
            if let Err(e) = tokio::task::spawn_blocking(move || exporter.run_cycle()).await {
                error!(error = %e, "export cycle aborted");
            }
            cycles += 1;
        }
        info!(cycles, "metrics export stopped");
        cycles
    }
}
