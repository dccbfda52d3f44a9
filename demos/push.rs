use std::{sync::Arc, time::Duration};

use metrics_influxdb::{export_to_influxdb, logging, Config, MetricRegistry};
use rand::Rng;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();

    let host = std::env::var("INFLUX_HOST").unwrap_or_else(|_| "http://127.0.0.1:8086".into());
    let mut config = Config::new(host, "demo");
    if let Ok(interval) = std::env::var("INFLUX_INTERVAL") {
        config.interval = humantime::parse_duration(&interval)?;
    }
    config.username = std::env::var("INFLUX_USER").ok();
    config.password = std::env::var("INFLUX_PASSWORD").ok();

    let registry = Arc::new(MetricRegistry::new());
    let requests = registry.counter("requests").unwrap();
    let in_flight = registry.gauge("in_flight").unwrap();
    let payload = registry.histogram("payload_bytes").unwrap();
    let events = registry.meter("events").unwrap();
    let handler = registry.timer("handler").unwrap();
    std::thread::spawn(move || {
        let mut rng = rand::rng();
        loop {
            std::thread::sleep(Duration::from_millis(100));
            requests.inc(1);
            in_flight.update(rng.random_range(0..32));
            payload.update(rng.random_range(128..4096));
            events.mark(rng.random_range(1..5));
            handler.time(|| std::thread::sleep(Duration::from_millis(rng.random_range(1..10))));
        }
    });

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        }
    });

    export_to_influxdb(registry, &config, cancel).await?;
    Ok(())
}
