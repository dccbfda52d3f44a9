use influxdb_line_protocol::LineProtocolBuilder;
use tracing::debug;

use crate::batch::{Batch, FieldValue};

/// Encodes every point of `batch` as one line of InfluxDB line protocol.
///
/// Timestamps are written as-is, so they must already be in the batch's
/// precision. Line protocol has no NaN or infinity, so such fields are left
/// out, and a point left without fields is skipped.
pub fn encode_batch(batch: &Batch) -> Vec<u8> {
    let mut builder = LineProtocolBuilder::new();
    for point in &batch.points {
        let mut fields = point.fields.iter().filter(|(label, value)| {
            let finite = match value {
                FieldValue::Integer(_) => true,
                FieldValue::Float(v) => v.is_finite(),
            };
            if !finite {
                debug!(point = %point.name, field = *label, "dropping non-finite field");
            }
            finite
        });
        let Some((first_label, first_value)) = fields.next() else {
            debug!(point = %point.name, "skipping point without fields");
            continue;
        };
        let line = builder.measurement(&point.name);
        let mut line = match *first_value {
            FieldValue::Integer(v) => line.field(first_label, v),
            FieldValue::Float(v) => line.field(first_label, v),
        };
        for (label, value) in fields {
            line = match *value {
                FieldValue::Integer(v) => line.field(label, v),
                FieldValue::Float(v) => line.field(label, v),
            };
        }
        let timestamp = i64::try_from(point.timestamp).unwrap_or(i64::MAX);
        builder = line.timestamp(timestamp).close_line();
    }
    builder.build()
}

#[cfg(test)]
mod tests {
    use similar_asserts::assert_eq;

    use crate::batch::Point;

    use super::*;

    fn encode(points: Vec<Point>) -> String {
        let batch = Batch::new("app".into(), points);
        String::from_utf8(encode_batch(&batch)).unwrap()
    }

    #[test]
    fn integers_and_floats() {
        let lines = encode(vec![
            Point::new("requests.count".into(), 1_700_000_000_000)
                .with("count", 42_i64)
                .with("time", 1_700_000_000_000_i64),
            Point::new("load.value".into(), 1_700_000_000_001).with("value", 0.5),
        ]);
        assert_eq!(
            lines,
            "requests.count count=42i,time=1700000000000i 1700000000000\n\
             load.value value=0.5 1700000000001\n"
        );
    }

    #[test]
    fn empty_batch_encodes_to_nothing() {
        assert_eq!(encode(vec![]), "");
    }

    #[test]
    fn fieldless_point_is_dropped() {
        let lines = encode(vec![
            Point::new("empty".into(), 1),
            Point::new("queue.value".into(), 2).with("value", 7_i64),
        ]);
        assert_eq!(lines, "queue.value value=7i 2\n");
    }

    #[test]
    fn non_finite_floats_are_left_out() {
        let lines = encode(vec![
            Point::new("load.value".into(), 1).with("value", f64::NAN),
            Point::new("latency.timer".into(), 2)
                .with("count", 3_i64)
                .with("mean", f64::INFINITY)
                .with("max", 9.0)
                .with("m1", f64::NEG_INFINITY),
            Point::new("ratio.value".into(), 3).with("value", 0.25),
        ]);
        assert_eq!(
            lines,
            "latency.timer count=3i,max=9 2
             ratio.value value=0.25 3
"
        );
    }

    #[test]
    fn measurement_is_escaped() {
        let lines = encode(vec![
            Point::new("http requests,total.count".into(), 3).with("count", 1_i64)
        ]);
        assert!(lines.starts_with(r"http\ requests\,total.count count=1i 3"));
    }
}
