//! ServiceInstanceRepository — instance records and metrics on top of a
//! versioned file store.
//!
//! Every write path call writes all of its records first and only then
//! creates at most one commit. A failed write returns before the commit,
//! so no commit is ever created for a partially applied operation. A call
//! that leaves the working tree identical to HEAD (e.g. re-creating an
//! unchanged instance) creates no commit at all.
//!
//! Nothing is cached: every read re-derives state from the working tree.

use std::time::SystemTime;

use chrono::{DateTime, Utc};
use tracing::debug;

use unipipe_core::GitConfig;

use crate::codec::{RecordCodec, YamlCodec};
use crate::datapoints::*;
use crate::error::StateResult;
use crate::metrics::{self, MetricSeries};
use crate::paths;
use crate::store::{GitHandler, RepoFile, VersionedFileStore};
use crate::types::*;

/// Durable store of service instances, their status, and their metrics.
#[derive(Debug, Clone)]
pub struct ServiceInstanceRepository<S = GitHandler, C = YamlCodec> {
    store: S,
    codec: C,
}

impl ServiceInstanceRepository {
    /// Open (or initialize) the git repository described by `config`.
    pub fn open(config: &GitConfig) -> StateResult<Self> {
        Ok(Self::new(GitHandler::open_or_init(config)?, YamlCodec))
    }
}

impl<S: VersionedFileStore, C: RecordCodec> ServiceInstanceRepository<S, C> {
    pub fn new(store: S, codec: C) -> Self {
        Self { store, codec }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    // ── Write path ─────────────────────────────────────────────────

    /// Persist a newly provisioned instance.
    ///
    /// No status record is written; until the first update or delete the
    /// instance reports [`Status::default_status`]. Writing a descriptor
    /// identical to the committed one creates no commit.
    pub fn create_service_instance(&self, instance: &ServiceInstance) -> StateResult<()> {
        let id = &instance.service_instance_id;
        self.write_record(instance, &paths::instance_yml(id))?;
        self.store
            .commit_all_changes(&format!("Created Service instance {id}"))?;
        debug!(%id, "service instance created");
        Ok(())
    }

    /// Persist an updated descriptor and mark the instance as updating.
    /// Returns the status that was written. If neither file changes, for
    /// example a repeated identical update, no commit is created.
    pub fn update_service_instance(&self, instance: &ServiceInstance) -> StateResult<Status> {
        let id = &instance.service_instance_id;
        let status = Status::updating();
        self.write_record(instance, &paths::instance_yml(id))?;
        self.write_record(&status, &paths::status_yml(id))?;
        self.store
            .commit_all_changes(&format!("Updated Service instance {id}"))?;
        debug!(%id, "service instance updated");
        Ok(status)
    }

    /// Soft-delete an instance: the descriptor is rewritten with
    /// `deleted: true` and the status marks the deletion as in progress.
    /// The caller's `instance` is left untouched.
    pub fn delete_service_instance(&self, instance: &ServiceInstance) -> StateResult<()> {
        let deleted = instance.marked_deleted();
        let id = &deleted.service_instance_id;
        self.write_record(&deleted, &paths::instance_yml(id))?;
        self.write_record(&Status::deleting(), &paths::status_yml(id))?;
        self.store
            .commit_all_changes(&format!("Marked Service instance {id} as deleted."))?;
        debug!(%id, "service instance marked as deleted");
        Ok(())
    }

    fn write_record<T: serde::Serialize>(&self, record: &T, relative: &str) -> StateResult<()> {
        let file = self.store.file_at(relative);
        self.codec.write(record, file.path())
    }

    // ── Read path ──────────────────────────────────────────────────

    /// The instance descriptor, or `None` if it was never created.
    pub fn try_get_service_instance(&self, service_instance_id: &str) -> StateResult<Option<ServiceInstance>> {
        let file = self.store.file_at(&paths::instance_yml(service_instance_id));
        if !file.exists() {
            return Ok(None);
        }
        self.codec.read(file.path()).map(Some)
    }

    /// The last written status, or [`Status::default_status`] if the
    /// instance has never been updated or deleted.
    pub fn get_service_instance_status(&self, service_instance_id: &str) -> StateResult<Status> {
        let file = self.store.file_at(&paths::status_yml(service_instance_id));
        if !file.exists() {
            return Ok(Status::default_status());
        }
        self.codec.read(file.path())
    }

    /// All instances with a descriptor, oldest descriptor modification
    /// time first.
    pub fn list_instances(&self) -> StateResult<Vec<ServiceInstance>> {
        let mut descriptors: Vec<(SystemTime, RepoFile)> = Vec::new();
        for folder in self.store.dirs_in(paths::INSTANCES_DIR)? {
            let Some(id) = folder.file_name() else {
                continue;
            };
            let file = self.store.file_at(&paths::instance_yml(id));
            if !file.exists() {
                continue;
            }
            descriptors.push((file.last_modified()?, file));
        }
        descriptors.sort_by_key(|(modified, _)| *modified);

        descriptors
            .iter()
            .map(|(_, file)| self.codec.read(file.path()))
            .collect()
    }

    /// Instances provisioned from `service_definition_id`, ordered like
    /// [`list_instances`](Self::list_instances).
    pub fn find_instances_by_service_id(
        &self,
        service_definition_id: &str,
    ) -> StateResult<Vec<ServiceInstance>> {
        let mut instances = self.list_instances()?;
        instances.retain(|instance| instance.service_definition_id == service_definition_id);
        Ok(instances)
    }

    // ── Metrics ────────────────────────────────────────────────────

    /// Per-resource series of `T` samples inside `[from, to]`.
    pub fn query_metrics<T: MetricSample>(
        &self,
        service_instance_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> StateResult<Vec<ServiceInstanceDatapoints<T>>> {
        metrics::query_metrics(&self.store, &self.codec, service_instance_id, from, to)
    }

    pub fn gauge_metrics(
        &self,
        service_instance_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> StateResult<Vec<ServiceInstanceDatapoints<GaugeMetricModel>>> {
        self.query_metrics(service_instance_id, from, to)
    }

    pub fn periodic_counter_metrics(
        &self,
        service_instance_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> StateResult<Vec<ServiceInstanceDatapoints<PeriodicCounterMetricModel>>> {
        self.query_metrics(service_instance_id, from, to)
    }

    pub fn sampling_counter_metrics(
        &self,
        service_instance_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> StateResult<Vec<ServiceInstanceDatapoints<SamplingCounterMetricModel>>> {
        self.query_metrics(service_instance_id, from, to)
    }

    /// Query by a metric type only known at runtime.
    pub fn metrics_of_type(
        &self,
        metric_type: MetricType,
        service_instance_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> StateResult<MetricSeries> {
        Ok(match metric_type {
            MetricType::Gauge => MetricSeries::Gauge(self.gauge_metrics(service_instance_id, from, to)?),
            MetricType::Periodic => {
                MetricSeries::Periodic(self.periodic_counter_metrics(service_instance_id, from, to)?)
            }
            MetricType::Sampling => {
                MetricSeries::Sampling(self.sampling_counter_metrics(service_instance_id, from, to)?)
            }
        })
    }
}
