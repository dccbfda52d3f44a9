use tracing::trace;

use crate::{
    batch::{FieldValue, Point},
    histogram::HistogramSnapshot,
    instrument::Instrument,
    registry::Registry,
    Time,
};

pub const PERCENTILES: [f64; 5] = [0.5, 0.75, 0.95, 0.99, 0.999];
const PERCENTILE_LABELS: [&str; 5] = [
    "50-percentile",
    "75-percentile",
    "95-percentile",
    "99-percentile",
    "999-percentile",
];

/// Turns one instrument into its point, or `None` for kinds that are not
/// exported.
pub fn translate(name: &str, instrument: &Instrument, now: Time) -> Option<Point> {
    let point = match instrument {
        Instrument::Counter(counter) => Point::new(format!("{name}.count"), now)
            .with("count", counter.snapshot())
            .with("time", i64::try_from(now).unwrap_or(i64::MAX)),
        Instrument::Gauge(gauge) => {
            Point::new(format!("{name}.value"), now).with("value", gauge.snapshot())
        }
        Instrument::GaugeFloat(gauge) => {
            Point::new(format!("{name}.value"), now).with("value", gauge.snapshot())
        }
        Instrument::Histogram(histogram) => {
            let snapshot = histogram.snapshot();
            let mut point = Point::new(format!("{name}.histogram"), now);
            push_distribution(&mut point.fields, &snapshot);
            point
        }
        Instrument::Meter(meter) => {
            let snapshot = meter.snapshot();
            Point::new(format!("{name}.meter"), now)
                .with("count", snapshot.count)
                .with("one-minute", snapshot.rate1)
                .with("five-minute", snapshot.rate5)
                .with("fifteen-minute", snapshot.rate15)
                .with("mean", snapshot.rate_mean)
        }
        Instrument::Timer(timer) => {
            let snapshot = timer.snapshot();
            let mut point = Point::new(format!("{name}.timer"), now);
            push_distribution(&mut point.fields, &snapshot.histogram);
            point
                .with("one-minute", snapshot.meter.rate1)
                .with("five-minute", snapshot.meter.rate5)
                .with("fifteen-minute", snapshot.meter.rate15)
                .with("mean-rate", snapshot.meter.rate_mean)
        }
        Instrument::Healthcheck(_) => {
            trace!(metric = name, kind = instrument.kind(), "skipping");
            return None;
        }
    };
    Some(point)
}

fn push_distribution(fields: &mut Vec<(&'static str, FieldValue)>, snapshot: &HistogramSnapshot) {
    fields.push(("count", snapshot.count().into()));
    fields.push(("min", (snapshot.min() as f64).into()));
    fields.push(("max", (snapshot.max() as f64).into()));
    fields.push(("mean", snapshot.mean().into()));
    fields.push(("std-dev", snapshot.std_dev().into()));
    let ps = snapshot.percentiles(&PERCENTILES);
    for (label, value) in PERCENTILE_LABELS.into_iter().zip(ps) {
        fields.push((label, value.into()));
    }
}

/// Samples every instrument of `registry`, reading the clock once per
/// instrument.
pub fn collect<R>(registry: &R, mut clock: impl FnMut() -> Time) -> Vec<Point>
where
    R: Registry + ?Sized,
{
    let mut points = vec![];
    registry.for_each(&mut |name, instrument| {
        let now = clock();
        if let Some(point) = translate(name, instrument, now) {
            points.push(point);
        }
    });
    points
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::{Counter, Healthcheck, MeterSnapshot, TimerSnapshot};

    use super::*;

    #[test]
    fn counter_point() {
        let counter = Arc::new(Counter::new());
        counter.inc(42);
        let point = translate("requests", &Instrument::Counter(counter), 1_000).unwrap();
        assert_eq!(point.name, "requests.count");
        assert_eq!(point.timestamp, 1_000);
        assert_eq!(
            point.fields,
            vec![
                ("count", FieldValue::Integer(42)),
                ("time", FieldValue::Integer(1_000)),
            ]
        );
    }

    #[test]
    fn gauge_points_use_value_suffix() {
        let point = translate("depth", &Instrument::Gauge(Arc::new(7_i64)), 5).unwrap();
        assert_eq!(point.name, "depth.value");
        assert_eq!(point.fields, vec![("value", FieldValue::Integer(7))]);

        let point = translate("load", &Instrument::GaugeFloat(Arc::new(0.5_f64)), 5).unwrap();
        assert_eq!(point.name, "load.value");
        assert_eq!(point.fields, vec![("value", FieldValue::Float(0.5))]);
    }

    #[test]
    fn histogram_fields_in_order() {
        let snapshot = HistogramSnapshot::from_values((1..=100).collect());
        let point = translate("size", &Instrument::Histogram(Arc::new(snapshot)), 9).unwrap();
        assert_eq!(point.name, "size.histogram");
        let labels: Vec<_> = point.labels().collect();
        assert_eq!(
            labels,
            [
                "count",
                "min",
                "max",
                "mean",
                "std-dev",
                "50-percentile",
                "75-percentile",
                "95-percentile",
                "99-percentile",
                "999-percentile",
            ]
        );
        assert_eq!(point.field("count"), Some(FieldValue::Integer(100)));
        assert_eq!(point.field("min"), Some(FieldValue::Float(1.0)));
        assert_eq!(point.field("max"), Some(FieldValue::Float(100.0)));
        assert_eq!(point.field("999-percentile"), Some(FieldValue::Float(100.0)));
    }

    #[test]
    fn meter_point() {
        let snapshot = MeterSnapshot {
            count: 100,
            rate1: 1.5,
            rate5: 1.2,
            rate15: 1.0,
            rate_mean: 1.3,
        };
        let point = translate("events", &Instrument::Meter(Arc::new(snapshot)), 1).unwrap();
        assert_eq!(point.name, "events.meter");
        assert_eq!(
            point.fields,
            vec![
                ("count", FieldValue::Integer(100)),
                ("one-minute", FieldValue::Float(1.5)),
                ("five-minute", FieldValue::Float(1.2)),
                ("fifteen-minute", FieldValue::Float(1.0)),
                ("mean", FieldValue::Float(1.3)),
            ]
        );
    }

    #[test]
    fn timer_point_has_sampling_timestamp() {
        let snapshot = TimerSnapshot {
            histogram: HistogramSnapshot::from_values(vec![100, 200]),
            meter: MeterSnapshot {
                count: 2,
                rate1: 0.1,
                rate5: 0.2,
                rate15: 0.3,
                rate_mean: 0.4,
            },
        };
        let point = translate("db", &Instrument::Timer(Arc::new(snapshot)), 77).unwrap();
        assert_eq!(point.name, "db.timer");
        assert_eq!(point.timestamp, 77);
        assert_eq!(point.fields.len(), 14);
        assert_eq!(point.field("count"), Some(FieldValue::Integer(2)));
        assert_eq!(point.field("mean"), Some(FieldValue::Float(150.0)));
        assert_eq!(point.field("mean-rate"), Some(FieldValue::Float(0.4)));
        assert_eq!(point.field("time"), None);
    }

    #[test]
    fn healthcheck_is_skipped() {
        let check = Instrument::Healthcheck(Arc::new(Healthcheck::new(|| Ok(()))));
        assert!(translate("db", &check, 1).is_none());
    }

    #[test]
    fn collect_reads_clock_per_instrument() {
        let registry: Vec<(String, Instrument)> = vec![
            ("a".into(), Instrument::Gauge(Arc::new(1_i64))),
            (
                "b".into(),
                Instrument::Healthcheck(Arc::new(Healthcheck::new(|| Ok(())))),
            ),
            ("c".into(), Instrument::Gauge(Arc::new(2_i64))),
        ];
        let mut ticks = 0;
        let points = collect(&registry, || {
            ticks += 1;
            ticks
        });
        assert_eq!(ticks, 3);
        let stamped: Vec<_> = points.iter().map(|p| (p.name.as_str(), p.timestamp)).collect();
        assert_eq!(stamped, [("a.value", 1), ("c.value", 3)]);
    }
}
