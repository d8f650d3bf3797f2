//! Metric extraction from YCSB output.
//!
//! YCSB ends every phase with lines such as:
//!
//! ```text
//! [OVERALL], RunTime(ms), 10110
//! [OVERALL], Throughput(ops/sec), 98.91196834817013
//! [READ], Operations, 496
//! [READ], AverageLatency(us), 245.3
//! [READ], Return=OK, 496
//! ```
//!
//! A line is recognized when it starts with `[` and has at least three
//! comma-separated fields. Everything else (banner, warnings, status) is
//! skipped.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

/// Value of a metric line's third field.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MetricValue {
    Number(f64),
    /// Kept verbatim when the field is not numeric
    Text(String),
}

impl MetricValue {
    fn parse(field: &str) -> Self {
        field
            .parse::<f64>()
            .map_or_else(|_| Self::Text(field.to_string()), Self::Number)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(_) => None,
        }
    }
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(t) => f.write_str(t),
        }
    }
}

/// One recognized line.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metric {
    /// First field without brackets, e.g. `READ`
    pub section: String,
    /// Second field, e.g. `AverageLatency(us)`
    pub measurement: String,
    pub value: MetricValue,
    #[serde(skip)]
    raw_measurement: String,
    #[serde(skip)]
    raw_value: String,
    #[serde(skip)]
    raw_section: String,
}

/// All metrics of one result file, in file order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Metrics {
    metrics: Vec<Metric>,
}

impl Metrics {
    /// Extract metrics from raw output. Never fails.
    pub fn parse_str(text: &str) -> Self {
        let metrics = text.lines().filter_map(parse_line).collect();
        Self { metrics }
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }

    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Metric> {
        self.metrics.iter()
    }

    /// Value of `measurement` in `section`; the last occurrence wins.
    pub fn get(&self, section: &str, measurement: &str) -> Option<&MetricValue> {
        self.metrics
            .iter()
            .rev()
            .find(|m| m.section == section && m.measurement == measurement)
            .map(|m| &m.value)
    }

    /// Numeric value of `measurement` in `section`.
    pub fn number(&self, section: &str, measurement: &str) -> Option<f64> {
        self.get(section, measurement).and_then(MetricValue::as_f64)
    }

    /// Distinct sections in order of first appearance.
    pub fn sections(&self) -> Vec<&str> {
        let mut seen: Vec<&str> = Vec::new();
        for m in &self.metrics {
            if !seen.contains(&m.section.as_str()) {
                seen.push(&m.section);
            }
        }
        seen
    }

    /// Legacy flattened view: first field as written mapped to the second
    /// and third fields concatenated as written. Later lines overwrite
    /// earlier ones with the same first field.
    pub fn legacy_map(&self) -> BTreeMap<String, String> {
        self.metrics
            .iter()
            .map(|m| (m.raw_section.clone(), format!("{}{}", m.raw_measurement, m.raw_value)))
            .collect()
    }
}

impl<'a> IntoIterator for &'a Metrics {
    type Item = &'a Metric;
    type IntoIter = std::slice::Iter<'a, Metric>;

    fn into_iter(self) -> Self::IntoIter {
        self.metrics.iter()
    }
}

fn parse_line(line: &str) -> Option<Metric> {
    if !line.starts_with('[') {
        return None;
    }

    let mut fields = line.splitn(3, ',');
    let raw_section = fields.next()?;
    let raw_measurement = fields.next()?;
    let raw_value = fields.next()?;

    let section = raw_section.trim().trim_start_matches('[').trim_end_matches(']');
    let value = raw_value.trim();

    Some(Metric {
        section: section.to_string(),
        measurement: raw_measurement.trim().to_string(),
        value: MetricValue::parse(value),
        raw_section: raw_section.to_string(),
        raw_measurement: raw_measurement.to_string(),
        raw_value: raw_value.trim_end_matches('\r').to_string(),
    })
}
