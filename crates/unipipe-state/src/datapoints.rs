//! Metric sample types stored in `{g|p|s}-metrics*.yml` batch files.
//!
//! Every batch shares the [`ServiceInstanceDatapoints`] envelope; the
//! sample payload differs per [`MetricType`]. Each sample type implements
//! [`MetricSample`], which supplies its own time key and window predicate
//! to the shared query pipeline in [`crate::metrics`].

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::StateError;

/// Closed set of metric shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricType {
    Gauge,
    Periodic,
    Sampling,
}

impl MetricType {
    pub fn name(&self) -> &'static str {
        match self {
            MetricType::Gauge => "GAUGE",
            MetricType::Periodic => "PERIODIC",
            MetricType::Sampling => "SAMPLING",
        }
    }

    /// File name prefix of batch files of this type: the first letter of
    /// the type name, lower-cased, followed by `-metrics`.
    pub fn file_prefix(&self) -> String {
        let initial = self.name()[..1].to_lowercase();
        format!("{initial}-metrics")
    }
}

impl fmt::Display for MetricType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for MetricType {
    type Err = StateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GAUGE" => Ok(MetricType::Gauge),
            "PERIODIC" => Ok(MetricType::Periodic),
            "SAMPLING" => Ok(MetricType::Sampling),
            _ => Err(StateError::InvalidMetricType(s.to_string())),
        }
    }
}

/// One batch of samples for a metered resource of a service instance.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ServiceInstanceDatapoints<T> {
    pub service_instance_id: String,
    pub resource: String,
    #[serde(default = "Vec::new")]
    pub values: Vec<T>,
}

impl<T> ServiceInstanceDatapoints<T> {
    pub fn new(service_instance_id: impl Into<String>, resource: impl Into<String>, values: Vec<T>) -> Self {
        ServiceInstanceDatapoints {
            service_instance_id: service_instance_id.into(),
            resource: resource.into(),
            values,
        }
    }
}

/// A sample type that can be queried by time window.
pub trait MetricSample: DeserializeOwned {
    /// Which batch files hold samples of this type.
    const METRIC_TYPE: MetricType;

    /// Key the samples of a series are ordered by.
    fn time_key(&self) -> DateTime<Utc>;

    /// Whether the sample belongs to the closed window `[from, to]`.
    fn in_window(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> bool;
}

/// Instantaneous value sampled at `observed_at`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GaugeMetricModel {
    pub observed_at: DateTime<Utc>,
    pub value: f64,
}

/// Counter delta accrued over `[period_start, period_end]`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PeriodicCounterMetricModel {
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
    pub value: f64,
}

/// Counter reading sampled at `observed_at`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SamplingCounterMetricModel {
    pub observed_at: DateTime<Utc>,
    pub value: f64,
}

/// Point samples: `from <= observed_at <= to`.
fn observed_within(observed_at: DateTime<Utc>, from: DateTime<Utc>, to: DateTime<Utc>) -> bool {
    !(observed_at < from || observed_at > to)
}

/// Period samples: the whole period must lie inside the window,
/// `from <= period_start` and `period_end <= to`.
fn period_within(
    period_start: DateTime<Utc>,
    period_end: DateTime<Utc>,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> bool {
    !(period_start < from || period_end > to)
}

impl MetricSample for GaugeMetricModel {
    const METRIC_TYPE: MetricType = MetricType::Gauge;

    fn time_key(&self) -> DateTime<Utc> {
        self.observed_at
    }

    fn in_window(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> bool {
        observed_within(self.observed_at, from, to)
    }
}

impl MetricSample for PeriodicCounterMetricModel {
    const METRIC_TYPE: MetricType = MetricType::Periodic;

    fn time_key(&self) -> DateTime<Utc> {
        self.period_start
    }

    fn in_window(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> bool {
        period_within(self.period_start, self.period_end, from, to)
    }
}

impl MetricSample for SamplingCounterMetricModel {
    const METRIC_TYPE: MetricType = MetricType::Sampling;

    fn time_key(&self) -> DateTime<Utc> {
        self.observed_at
    }

    fn in_window(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> bool {
        observed_within(self.observed_at, from, to)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[test]
    fn file_prefixes() {
        assert_eq!(MetricType::Gauge.file_prefix(), "g-metrics");
        assert_eq!(MetricType::Periodic.file_prefix(), "p-metrics");
        assert_eq!(MetricType::Sampling.file_prefix(), "s-metrics");
    }

    #[test]
    fn parse_metric_type() {
        assert_eq!("gauge".parse::<MetricType>().unwrap(), MetricType::Gauge);
        assert_eq!("PERIODIC".parse::<MetricType>().unwrap(), MetricType::Periodic);
        assert_eq!("Sampling".parse::<MetricType>().unwrap(), MetricType::Sampling);
        assert!(matches!(
            "histogram".parse::<MetricType>(),
            Err(StateError::InvalidMetricType(_))
        ));
    }

    #[test]
    fn gauge_window_is_closed_on_both_ends() {
        let sample = |t| GaugeMetricModel { observed_at: at(t), value: 1.0 };
        assert!(!sample(99).in_window(at(100), at(200)));
        assert!(sample(100).in_window(at(100), at(200)));
        assert!(sample(150).in_window(at(100), at(200)));
        assert!(sample(200).in_window(at(100), at(200)));
        assert!(!sample(201).in_window(at(100), at(200)));
    }

    #[test]
    fn periodic_window_requires_whole_period() {
        let sample = |start, end| PeriodicCounterMetricModel {
            period_start: at(start),
            period_end: at(end),
            value: 1.0,
        };
        assert!(sample(100, 200).in_window(at(100), at(200)));
        assert!(!sample(99, 200).in_window(at(100), at(200)));
        assert!(!sample(100, 201).in_window(at(100), at(200)));
        assert!(sample(120, 180).in_window(at(100), at(200)));
    }

    #[test]
    fn decode_camel_case_samples() {
        let yaml = r#"
serviceInstanceId: i-1
resource: cpu
values:
  - periodStart: 2024-01-01T00:00:00Z
    periodEnd: 2024-01-01T01:00:00Z
    value: 12.5
"#;
        let batch: ServiceInstanceDatapoints<PeriodicCounterMetricModel> =
            serde_yaml::from_str(yaml).unwrap();
        assert_eq!(batch.resource, "cpu");
        assert_eq!(batch.values.len(), 1);
        assert_eq!(batch.values[0].value, 12.5);
        assert_eq!(batch.values[0].time_key(), Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn decode_batch_without_values() {
        let yaml = "serviceInstanceId: i-1\nresource: cpu\n";
        let batch: ServiceInstanceDatapoints<GaugeMetricModel> = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(batch.service_instance_id, "i-1");
        assert!(batch.values.is_empty());
    }
}
