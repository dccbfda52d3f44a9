//! Periodically pushes the contents of an in-process metrics registry to
//! InfluxDB.
//!
//! ```rust,ignore
//! let registry = Arc::new(MetricRegistry::new());
//! registry.counter("requests").unwrap().inc(1);
//!
//! let config = Config::new("http://127.0.0.1:8086", "app");
//! export_to_influxdb(registry, &config, CancellationToken::new()).await?;
//! ```

use std::time::{SystemTime, UNIX_EPOCH};

use tokio_util::sync::CancellationToken;

pub mod batch;
pub mod client;
pub mod codec;
pub mod config;
pub mod error;
pub mod exporter;
pub mod histogram;
pub mod instrument;
pub mod logging;
pub mod meter;
pub mod registry;
pub mod scheduler;
pub mod timer;
pub mod translate;

pub use batch::{Batch, FieldValue, Point, Precision};
pub use client::{BatchWriter, InfluxClient};
pub use config::Config;
pub use error::{SetupError, WriteError};
pub use exporter::Exporter;
pub use histogram::{Histogram, HistogramSnapshot};
pub use instrument::{Counter, Gauge, GaugeFloat, Healthcheck, Instrument, Snapshot};
pub use meter::{Meter, MeterSnapshot};
pub use registry::{MetricRegistry, Registry};
pub use scheduler::Scheduler;
pub use timer::{Timer, TimerSnapshot};

/// Milliseconds since the Unix epoch.
pub type Time = u64;

pub fn now() -> Time {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
}

/// Connects to the store described by `config` and exports `registry` every
/// `config.interval` until `cancel` fires.
///
/// Setup problems are returned before the first cycle; delivery failures
/// during the loop are only logged.
pub async fn export_to_influxdb<R>(
    registry: R,
    config: &Config,
    cancel: CancellationToken,
) -> Result<(), SetupError>
where
    R: Registry + 'static,
{
    config.validate()?;
    let client = InfluxClient::new(config)?;
    let exporter = Exporter::new(registry, client, config.database.clone());
    let scheduler = Scheduler::new(exporter, config.interval)?;
    scheduler.run(cancel).await;
    Ok(())
}
