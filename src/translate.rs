//! iperf3 report translation: JSON parsing and wire-safe integer narrowing.

use serde_json::{Number, Value};

/// First integer magnitude the remote keyword transport cannot carry.
const WIRE_INT_BOUND: i64 = 1 << 31;

/// Replace every integer outside `(-2^31, 2^31)` with the equal-valued
/// float, in place, at every nesting level.
///
/// Remote keyword transports (XML-RPC) reject integers wider than signed
/// 32 bits, and every report gets the same treatment whether it is returned
/// locally or over the bridge. Floats, other scalars, and container
/// structure are left untouched; the pass is idempotent.
pub fn normalize(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for (_, entry) in map.iter_mut() {
                normalize(entry);
            }
        }
        Value::Array(items) => {
            for item in items.iter_mut() {
                normalize(item);
            }
        }
        Value::Number(number) => {
            if let Some(wide) = oversize_to_f64(number) {
                if let Some(replacement) = Number::from_f64(wide) {
                    *value = Value::Number(replacement);
                }
            }
        }
        _ => {}
    }
}

/// The float replacement for an integer the transport cannot carry, or
/// `None` when the number is in range (or not an integer at all).
fn oversize_to_f64(number: &Number) -> Option<f64> {
    if let Some(int) = number.as_i64() {
        if int > -WIRE_INT_BOUND && int < WIRE_INT_BOUND {
            None
        } else {
            Some(int as f64)
        }
    } else if let Some(wide) = number.as_u64() {
        // only reached above i64::MAX, which is always out of range
        Some(wide as f64)
    } else {
        None
    }
}

/// Parse the concatenated JSON documents a stopped server printed (one per
/// client that connected) into individual normalized reports.
///
/// Documents parse independently; the first malformed one is logged and
/// dropped together with the rest of the stream, and the successfully
/// parsed prefix is returned.
pub fn parse_reports(stdout: &str) -> Vec<Value> {
    let mut reports = Vec::new();

    for parsed in serde_json::Deserializer::from_str(stdout).into_iter::<Value>() {
        match parsed {
            Ok(mut report) => {
                normalize(&mut report);
                reports.push(report);
            }
            Err(err) => {
                tracing::error!(%err, "discarding unparseable server statistics");
                break;
            }
        }
    }

    reports
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_in_range_integers_unchanged() {
        let mut value = json!({
            "max": 2147483647i64,
            "min": -2147483647i64,
            "small": 42,
            "zero": 0
        });
        let before = value.clone();
        normalize(&mut value);
        assert_eq!(value, before);
        assert!(value["max"].is_i64() || value["max"].is_u64());
    }

    #[test]
    fn test_out_of_range_integers_become_floats() {
        let mut value = json!({
            "bytes": 5000000000i64,
            "negative": -5000000000i64,
            "huge": 10000000000000000000u64
        });
        normalize(&mut value);
        assert_eq!(value["bytes"], json!(5000000000.0));
        assert_eq!(value["negative"], json!(-5000000000.0));
        assert_eq!(value["huge"].as_f64().unwrap(), 1e19);
    }

    #[test]
    fn test_boundary_values_convert() {
        // the transport limit is exclusive on both sides
        let mut value = json!([2147483648i64, -2147483648i64]);
        normalize(&mut value);
        assert!(value[0].is_f64());
        assert!(value[1].is_f64());
        assert_eq!(value[0].as_f64().unwrap(), 2147483648.0);
        assert_eq!(value[1].as_f64().unwrap(), -2147483648.0);
    }

    #[test]
    fn test_nested_containers_are_walked() {
        let mut value = json!({
            "end": {
                "streams": [
                    { "sender": { "bytes": 11527782400i64 } }
                ],
                "sum_sent": { "bytes": 11527782400i64, "seconds": 1.000084 }
            }
        });
        normalize(&mut value);
        assert!(value["end"]["streams"][0]["sender"]["bytes"].is_f64());
        assert!(value["end"]["sum_sent"]["bytes"].is_f64());
        assert_eq!(value["end"]["sum_sent"]["seconds"], json!(1.000084));
    }

    #[test]
    fn test_non_integer_scalars_untouched() {
        let mut value = json!({
            "version": "iperf 3.7",
            "omitted": false,
            "rate": 92214509257.57492,
            "missing": null
        });
        let before = value.clone();
        normalize(&mut value);
        assert_eq!(value, before);
    }

    #[test]
    fn test_normalization_is_idempotent() {
        let mut once = json!({
            "intervals": [{ "sum": { "bytes": 11527782400i64, "retransmits": 0 } }]
        });
        normalize(&mut once);
        let mut twice = once.clone();
        normalize(&mut twice);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_structure_is_preserved() {
        let mut value = json!({
            "a": [1, 2147483648i64, 3],
            "b": { "c": 1, "d": 2 }
        });
        normalize(&mut value);
        assert_eq!(value["a"].as_array().unwrap().len(), 3);
        assert_eq!(value["a"][0], json!(1));
        assert_eq!(value["a"][2], json!(3));
        let keys: Vec<_> = value["b"].as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["c", "d"]);
    }

    #[test]
    fn test_parse_reports_splits_adjacent_documents() {
        let stdout = "{\"start\": {}, \"end\": {\"bytes\": 1024}}\n{\"start\": {}, \"end\": {\"bytes\": 2048}}\n";
        let reports = parse_reports(stdout);
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0]["end"]["bytes"], json!(1024));
        assert_eq!(reports[1]["end"]["bytes"], json!(2048));
    }

    #[test]
    fn test_parse_reports_normalizes_each_document() {
        let stdout = "{\"end\": {\"bytes\": 5000000000}}\n{\"end\": {\"bytes\": 1}}";
        let reports = parse_reports(stdout);
        assert_eq!(reports.len(), 2);
        assert!(reports[0]["end"]["bytes"].is_f64());
        assert!(reports[1]["end"]["bytes"].is_i64() || reports[1]["end"]["bytes"].is_u64());
    }

    #[test]
    fn test_parse_reports_empty_output() {
        assert!(parse_reports("").is_empty());
        assert!(parse_reports("\n").is_empty());
    }

    #[test]
    fn test_parse_reports_keeps_prefix_before_garbage() {
        let stdout = "{\"end\": {\"bytes\": 1024}}\nkilled";
        let reports = parse_reports(stdout);
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0]["end"]["bytes"], json!(1024));
    }
}
