//! Repository layout for service instance records.
//!
//! All paths are relative to the repository root and follow
//! `instances/{service_instance_id}/...`. The mapping is pure; ids are not
//! validated here.

use crate::datapoints::MetricType;

/// Directory holding one folder per service instance.
pub const INSTANCES_DIR: &str = "instances";

/// Extension shared by every record file.
pub const RECORD_EXTENSION: &str = ".yml";

/// `instances/{id}`
pub fn instance_folder(service_instance_id: &str) -> String {
    format!("{INSTANCES_DIR}/{service_instance_id}")
}

/// `instances/{id}/instance.yml`
pub fn instance_yml(service_instance_id: &str) -> String {
    format!("{}/instance{RECORD_EXTENSION}", instance_folder(service_instance_id))
}

/// `instances/{id}/status.yml`
pub fn status_yml(service_instance_id: &str) -> String {
    format!("{}/status{RECORD_EXTENSION}", instance_folder(service_instance_id))
}

/// Whether `file_name` is a batch file for the given metric type,
/// i.e. `{g|p|s}-metrics*.yml`.
pub fn is_metrics_file(file_name: &str, metric_type: MetricType) -> bool {
    file_name.starts_with(&metric_type.file_prefix()) && file_name.ends_with(RECORD_EXTENSION)
}
