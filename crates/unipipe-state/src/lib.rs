//! unipipe-state — git-backed storage for Open Service Broker instances.
//!
//! Service instances, their operation status, and their metric batches are
//! plain YAML files in a git working tree:
//!
//! ```text
//! instances/{service_instance_id}/instance.yml
//! instances/{service_instance_id}/status.yml
//! instances/{service_instance_id}/{g|p|s}-metrics*.yml
//! ```
//!
//! # Architecture
//!
//! [`ServiceInstanceRepository`] is the entry point. It resolves paths with
//! [`paths`], encodes records with a [`RecordCodec`], and persists through a
//! [`VersionedFileStore`] that turns each logical write into one commit.
//! Metrics queries scan batch files and merge them at read time
//! (see [`metrics`]).
//!
//! The store assumes a single writer. Readers take no locks and may observe
//! a descriptor and status from different operations while a write is in
//! flight.

pub mod codec;
pub mod datapoints;
pub mod error;
pub mod metrics;
pub mod paths;
pub mod repository;
pub mod store;
pub mod types;

pub use codec::{RecordCodec, YamlCodec};
pub use datapoints::*;
pub use error::{StateError, StateResult};
pub use metrics::MetricSeries;
pub use repository::ServiceInstanceRepository;
pub use store::{GitHandler, RepoFile, VersionedFileStore};
pub use types::*;
