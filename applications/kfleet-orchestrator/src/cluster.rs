//! Cluster snapshot types
//!
//! A [`ClusterDescriptor`] is an immutable snapshot of one managed cluster as
//! reported by the control plane's listing endpoint. The batch engine only
//! ever mutates `current_status`, to track what it observed last.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle status reported by the control plane for a cluster
///
/// A *terminal* status means the control plane is not currently acting on
/// the cluster; only clusters in a terminal status may be triggered again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClusterStatus {
    /// Provisioned and idle, never deployed through the maintenance flow
    Ready,
    /// Last deployment finished successfully
    Deployed,
    /// Deployment accepted, waiting for an executor
    DeploymentQueued,
    /// Deployment in progress
    Deploying,
    /// Last deployment failed
    DeploymentError,
    /// Shutdown in progress
    Stopping,
    /// Cluster is stopped
    Stopped,
    /// Deletion in progress
    Deleting,
    /// Cluster is gone
    Deleted,
    /// Deletion failed
    DeleteError,
    /// Cloud credentials rejected by the provider
    InvalidCredentials,
    /// The control plane hit an unrecoverable fault for this cluster.
    /// Not a normal terminal status; the batch engine handles it separately
    /// during polling.
    InternalError,
    /// Any status value this client does not know about
    Unknown,
}

impl<'de> Deserialize<'de> for ClusterStatus {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        Ok(Self::from_wire(&value))
    }
}

impl ClusterStatus {
    /// Parse a wire value; anything unrecognized becomes [`Self::Unknown`]
    pub fn from_wire(value: &str) -> Self {
        match value {
            "READY" => Self::Ready,
            "DEPLOYED" => Self::Deployed,
            "DEPLOYMENT_QUEUED" => Self::DeploymentQueued,
            "DEPLOYING" => Self::Deploying,
            "DEPLOYMENT_ERROR" => Self::DeploymentError,
            "STOPPING" => Self::Stopping,
            "STOPPED" => Self::Stopped,
            "DELETING" => Self::Deleting,
            "DELETED" => Self::Deleted,
            "DELETE_ERROR" => Self::DeleteError,
            "INVALID_CREDENTIALS" => Self::InvalidCredentials,
            "INTERNAL_ERROR" => Self::InternalError,
            _ => Self::Unknown,
        }
    }

    /// Whether the control plane considers the cluster settled, with no
    /// operation in progress. `INTERNAL_ERROR` is deliberately excluded.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Ready
                | Self::Deployed
                | Self::DeploymentError
                | Self::Stopped
                | Self::Deleted
                | Self::DeleteError
                | Self::InvalidCredentials
        )
    }

    /// Wire representation of the status
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ready => "READY",
            Self::Deployed => "DEPLOYED",
            Self::DeploymentQueued => "DEPLOYMENT_QUEUED",
            Self::Deploying => "DEPLOYING",
            Self::DeploymentError => "DEPLOYMENT_ERROR",
            Self::Stopping => "STOPPING",
            Self::Stopped => "STOPPED",
            Self::Deleting => "DELETING",
            Self::Deleted => "DELETED",
            Self::DeleteError => "DELETE_ERROR",
            Self::InvalidCredentials => "INVALID_CREDENTIALS",
            Self::InternalError => "INTERNAL_ERROR",
            Self::Unknown => "UNKNOWN",
        }
    }
}

impl std::fmt::Display for ClusterStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kubernetes flavor the cluster runs on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClusterType {
    /// AWS EKS
    Eks,
    /// Google GKE
    Gke,
    /// Azure AKS
    Aks,
    /// Single-node / edge K3s
    K3s,
}

impl ClusterType {
    /// Wire representation of the type
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Eks => "EKS",
            Self::Gke => "GKE",
            Self::Aks => "AKS",
            Self::K3s => "K3S",
        }
    }
}

impl std::fmt::Display for ClusterType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who operates the cluster's control plane
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClusterMode {
    /// Fully managed by the platform
    Managed,
    /// Customer-operated, platform only deploys workloads
    SelfManaged,
}

impl ClusterMode {
    /// Wire representation of the mode
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Managed => "MANAGED",
            Self::SelfManaged => "SELF_MANAGED",
        }
    }
}

impl std::fmt::Display for ClusterMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of one managed cluster, as listed by the control plane
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterDescriptor {
    /// Owning organization ID
    pub organization_id: String,
    /// Owning organization name
    pub organization_name: String,
    /// Billing plan of the organization
    pub organization_plan: String,
    /// Cluster ID
    pub id: String,
    /// Cluster name
    pub name: String,
    /// Kubernetes flavor
    pub cluster_type: ClusterType,
    /// When the cluster was created
    pub created_at: DateTime<Utc>,
    /// When the cluster was last deployed, if ever
    pub last_deployed_at: Option<DateTime<Utc>>,
    /// Kubernetes version currently running
    pub version: String,
    /// Managed vs self-managed
    pub mode: ClusterMode,
    /// Whether the cluster is flagged as production
    pub production: bool,
    /// Last status observed for this cluster
    pub current_status: ClusterStatus,
    /// Whether the cluster autoscales with Karpenter instead of the
    /// cluster-autoscaler
    pub karpenter: bool,
    /// Whether a platform-side update is waiting to be rolled out
    pub pending_update: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_statuses() {
        assert!(ClusterStatus::Deployed.is_terminal());
        assert!(ClusterStatus::DeploymentError.is_terminal());
        assert!(ClusterStatus::Stopped.is_terminal());
        assert!(!ClusterStatus::Deploying.is_terminal());
        assert!(!ClusterStatus::DeploymentQueued.is_terminal());
        assert!(!ClusterStatus::Unknown.is_terminal());
    }

    #[test]
    fn test_internal_error_is_not_terminal() {
        // The engine special-cases INTERNAL_ERROR during polling; it must
        // not leak into the general terminal set used at admission.
        assert!(!ClusterStatus::InternalError.is_terminal());
    }

    #[test]
    fn test_status_wire_format() {
        let status: ClusterStatus = serde_json::from_str("\"INTERNAL_ERROR\"").unwrap();
        assert_eq!(status, ClusterStatus::InternalError);
        assert_eq!(
            serde_json::to_string(&ClusterStatus::DeploymentError).unwrap(),
            "\"DEPLOYMENT_ERROR\""
        );
    }

    #[test]
    fn test_unrecognized_status_maps_to_unknown() {
        let status: ClusterStatus = serde_json::from_str("\"SOMETHING_NEW\"").unwrap();
        assert_eq!(status, ClusterStatus::Unknown);
        assert!(!status.is_terminal());
    }
}
