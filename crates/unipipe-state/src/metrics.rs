//! Metrics query engine over immutable batch files.
//!
//! A query runs in three stages, each usable on its own:
//!
//! 1. [`metric_batch_files`] enumerates `{g|p|s}-metrics*.yml` files in the
//!    instance folder.
//! 2. [`decode_batches`] decodes every file into datapoint batches.
//! 3. [`merge_datapoints`] groups batches by instance and resource, keeps
//!    the samples inside the window, and orders each series by time.
//!
//! Batches are never merged on disk. Every query re-reads the files.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::codec::RecordCodec;
use crate::datapoints::*;
use crate::error::StateResult;
use crate::paths;
use crate::store::{RepoFile, VersionedFileStore};

/// On-disk shape of a batch file: a single envelope or a list of them.
#[derive(Deserialize)]
#[serde(untagged)]
enum BatchDocument<T> {
    Many(Vec<ServiceInstanceDatapoints<T>>),
    One(ServiceInstanceDatapoints<T>),
}

impl<T> BatchDocument<T> {
    fn into_batches(self) -> Vec<ServiceInstanceDatapoints<T>> {
        match self {
            BatchDocument::Many(batches) => batches,
            BatchDocument::One(batch) => vec![batch],
        }
    }
}

/// Query result for a metric type chosen at runtime.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MetricSeries {
    Gauge(Vec<ServiceInstanceDatapoints<GaugeMetricModel>>),
    Periodic(Vec<ServiceInstanceDatapoints<PeriodicCounterMetricModel>>),
    Sampling(Vec<ServiceInstanceDatapoints<SamplingCounterMetricModel>>),
}

impl MetricSeries {
    pub fn metric_type(&self) -> MetricType {
        match self {
            MetricSeries::Gauge(_) => MetricType::Gauge,
            MetricSeries::Periodic(_) => MetricType::Periodic,
            MetricSeries::Sampling(_) => MetricType::Sampling,
        }
    }

    /// Number of (instance, resource) series in the result.
    pub fn len(&self) -> usize {
        match self {
            MetricSeries::Gauge(series) => series.len(),
            MetricSeries::Periodic(series) => series.len(),
            MetricSeries::Sampling(series) => series.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Batch files of `metric_type` in the folder of `service_instance_id`,
/// sorted by file name.
pub fn metric_batch_files<S: VersionedFileStore>(
    store: &S,
    service_instance_id: &str,
    metric_type: MetricType,
) -> StateResult<Vec<RepoFile>> {
    let files = store.files_in(&paths::instance_folder(service_instance_id))?;
    Ok(files
        .into_iter()
        .filter(|file| {
            file.file_name()
                .is_some_and(|name| paths::is_metrics_file(name, metric_type))
        })
        .collect())
}

/// Decode every file into its batches, in file order. A file that fails
/// to decode fails the whole query.
pub fn decode_batches<T: MetricSample, C: RecordCodec>(
    codec: &C,
    files: &[RepoFile],
) -> StateResult<Vec<ServiceInstanceDatapoints<T>>> {
    let mut batches = Vec::new();
    for file in files {
        let document: BatchDocument<T> = codec.read(file.path())?;
        batches.extend(document.into_batches());
    }
    Ok(batches)
}

/// Group batches by instance id, then by resource; keep the samples for
/// which [`MetricSample::in_window`] holds, sorted by time key.
///
/// Groups are emitted ordered by instance id, then resource. Groups left
/// without samples are dropped. The sort is stable, so samples with equal
/// time keys keep their file order.
pub fn merge_datapoints<T: MetricSample>(
    batches: Vec<ServiceInstanceDatapoints<T>>,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> Vec<ServiceInstanceDatapoints<T>> {
    let mut groups: BTreeMap<String, BTreeMap<String, Vec<T>>> = BTreeMap::new();
    for batch in batches {
        groups
            .entry(batch.service_instance_id)
            .or_default()
            .entry(batch.resource)
            .or_default()
            .extend(batch.values);
    }

    let mut series = Vec::new();
    for (service_instance_id, resources) in groups {
        for (resource, values) in resources {
            let mut values: Vec<T> = values
                .into_iter()
                .filter(|sample| sample.in_window(from, to))
                .collect();
            if values.is_empty() {
                continue;
            }
            values.sort_by_key(|sample| sample.time_key());
            series.push(ServiceInstanceDatapoints::new(
                service_instance_id.clone(),
                resource,
                values,
            ));
        }
    }
    series
}

/// Run the full pipeline for sample type `T`.
pub fn query_metrics<T: MetricSample, S: VersionedFileStore, C: RecordCodec>(
    store: &S,
    codec: &C,
    service_instance_id: &str,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> StateResult<Vec<ServiceInstanceDatapoints<T>>> {
    let files = metric_batch_files(store, service_instance_id, T::METRIC_TYPE)?;
    let batches = decode_batches::<T, C>(codec, &files)?;
    let series = merge_datapoints(batches, from, to);
    debug!(
        %service_instance_id,
        metric_type = %T::METRIC_TYPE,
        files = files.len(),
        series = series.len(),
        "metrics queried"
    );
    Ok(series)
}
