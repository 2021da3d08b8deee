//! Per-metric measurement time series attached to fragments.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Measurements keyed by metric name
pub type Measurements = BTreeMap<String, Measurement>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    #[serde(default)]
    pub unit: String,
    #[serde(default)]
    pub values: Vec<MeasurementValue>,
}

/// One point of a measurement series
///
/// Chunked profiles stamp points with an absolute `timestamp` in seconds,
/// transaction profiles with an offset from profile start.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MeasurementValue {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<f64>,
    #[serde(default)]
    pub elapsed_since_start_ns: u64,
    pub value: f64,
}

/// Merge `other` into `into`, concatenating value lists per metric
///
/// The first unit seen for a metric is kept.
pub fn merge_measurements(into: &mut Measurements, other: Measurements) {
    for (name, measurement) in other {
        match into.get_mut(&name) {
            Some(existing) => existing.values.extend(measurement.values),
            None => {
                into.insert(name, measurement);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(unit: &str, values: &[f64]) -> Measurement {
        Measurement {
            unit: unit.to_string(),
            values: values
                .iter()
                .map(|&value| MeasurementValue { value, ..Default::default() })
                .collect(),
        }
    }

    #[test]
    fn test_merge_concatenates_values() {
        let mut into = Measurements::new();
        into.insert("cpu".into(), series("percent", &[1.0, 2.0]));

        let mut other = Measurements::new();
        other.insert("cpu".into(), series("ratio", &[3.0]));
        other.insert("memory".into(), series("byte", &[4.0]));

        merge_measurements(&mut into, other);

        let cpu = &into["cpu"];
        assert_eq!(cpu.unit, "percent");
        assert_eq!(cpu.values.iter().map(|v| v.value).collect::<Vec<_>>(), vec![1.0, 2.0, 3.0]);
        assert_eq!(into["memory"].values.len(), 1);
    }
}
