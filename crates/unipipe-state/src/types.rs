//! Domain types for the UniPipe instance repository.
//!
//! These types are the persisted records of provisioned service instances
//! and their asynchronous operation status. Field names are camelCase on
//! disk so the YAML stays readable by other tooling working on the same
//! repository.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Opaque identifier of a provisioned service instance.
pub type ServiceInstanceId = String;

/// Identifier of the service offering an instance was provisioned from.
pub type ServiceDefinitionId = String;

/// Free-form YAML payload carried through without interpretation.
pub type Payload = BTreeMap<String, serde_yaml::Value>;

// ── Service instance ──────────────────────────────────────────────

/// Descriptor of a provisioned service instance (`instance.yml`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ServiceInstance {
    pub service_instance_id: ServiceInstanceId,
    pub service_definition_id: ServiceDefinitionId,
    pub plan_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization_guid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub space_guid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub originating_identity: Option<Payload>,
    /// Provisioning parameters supplied by the platform.
    #[serde(default)]
    pub parameters: Payload,
    /// Platform context object (e.g. Cloud Foundry or Kubernetes context).
    #[serde(default)]
    pub context: Payload,
    /// Soft-delete marker. Deleted instances are kept on disk.
    #[serde(default)]
    pub deleted: bool,
}

impl ServiceInstance {
    pub fn new(
        service_instance_id: impl Into<String>,
        service_definition_id: impl Into<String>,
        plan_id: impl Into<String>,
    ) -> Self {
        ServiceInstance {
            service_instance_id: service_instance_id.into(),
            service_definition_id: service_definition_id.into(),
            plan_id: plan_id.into(),
            organization_guid: None,
            space_guid: None,
            originating_identity: None,
            parameters: Payload::new(),
            context: Payload::new(),
            deleted: false,
        }
    }

    /// A copy of this descriptor with the soft-delete marker set.
    pub fn marked_deleted(&self) -> Self {
        ServiceInstance {
            deleted: true,
            ..self.clone()
        }
    }
}

// ── Status ────────────────────────────────────────────────────────

/// OSB `last_operation` state values. The set is open: an external
/// reconciler may write any string.
pub mod operation_state {
    pub const IN_PROGRESS: &str = "in progress";
    pub const SUCCEEDED: &str = "succeeded";
    pub const FAILED: &str = "failed";
}

/// Current asynchronous operation state of an instance (`status.yml`).
///
/// Overwritten wholesale by every update or delete; no history is kept.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Status {
    pub status: String,
    pub description: String,
}

impl Status {
    pub fn new(status: impl Into<String>, description: impl Into<String>) -> Self {
        Status {
            status: status.into(),
            description: description.into(),
        }
    }

    /// Status reported for an instance that exists but was never updated
    /// or deleted, i.e. one without a `status.yml`.
    pub fn default_status() -> Self {
        Status::new(operation_state::IN_PROGRESS, "preparing deployment")
    }

    pub(crate) fn updating() -> Self {
        Status::new(operation_state::IN_PROGRESS, "updating service")
    }

    pub(crate) fn deleting() -> Self {
        Status::new(operation_state::IN_PROGRESS, "preparing service deletion")
    }

    /// Whether the reconciler has finished with the last operation.
    pub fn is_terminal(&self) -> bool {
        self.status == operation_state::SUCCEEDED || self.status == operation_state::FAILED
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marked_deleted_leaves_original_untouched() {
        let instance = ServiceInstance::new("i-1", "def-1", "plan-1");
        let deleted = instance.marked_deleted();

        assert!(deleted.deleted);
        assert!(!instance.deleted);
        assert_eq!(deleted.service_instance_id, instance.service_instance_id);
    }

    #[test]
    fn descriptor_uses_camel_case_fields() {
        let yaml = r#"
serviceInstanceId: abc
serviceDefinitionId: postgres
planId: small
context:
  platform: cloudfoundry
"#;
        let instance: ServiceInstance = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(instance.service_instance_id, "abc");
        assert_eq!(instance.service_definition_id, "postgres");
        assert!(!instance.deleted);
        assert_eq!(
            instance.context.get("platform"),
            Some(&serde_yaml::Value::from("cloudfoundry"))
        );

        let out = serde_yaml::to_string(&instance).unwrap();
        assert!(out.contains("serviceInstanceId: abc"));
        assert!(out.contains("deleted: false"));
    }

    #[test]
    fn default_status_is_in_progress() {
        let status = Status::default_status();
        assert_eq!(status.status, "in progress");
        assert_eq!(status.description, "preparing deployment");
        assert!(!status.is_terminal());
    }

    #[test]
    fn terminal_states() {
        assert!(Status::new(operation_state::SUCCEEDED, "done").is_terminal());
        assert!(Status::new(operation_state::FAILED, "boom").is_terminal());
        assert!(!Status::updating().is_terminal());
    }
}
