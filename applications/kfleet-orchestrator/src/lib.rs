//! # kfleet Orchestrator
//!
//! Fleet maintenance for managed Kubernetes clusters.
//!
//! ## Architecture
//!
//! ```text
//! CLI (kfleet)
//! ├── ClusterDirectory   ←── control-plane listing + field filters
//! ├── BatchDeploymentEngine   tick loop, admission cap, cohort policy
//! ├── ControlPlaneClient      status / deploy / upgrade, reauth on 401
//! └── ConfirmationGate        operator [y/N] prompts
//! ```
//!
//! The engine is the only component with real state-machine logic: it
//! consumes a fixed ordered cluster list and drives every cluster to either
//! a triggered-and-completed or a pending outcome, under an admission cap.
//! Everything else is a thin proxy to the remote control plane.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod batch;
pub mod cluster;
pub mod confirm;
pub mod control;
pub mod directory;
pub mod error;
pub mod report;

// Batch orchestration
pub use batch::{
    BatchDeploymentEngine, BatchParameters, BatchReport, DEFAULT_PARALLEL_RUN,
    DEFAULT_REFRESH_DELAY_SECS, MAX_UNCONFIRMED_PARALLELISM,
};

// Cluster model
pub use cluster::{ClusterDescriptor, ClusterMode, ClusterStatus, ClusterType};

// Listing and filtering
pub use directory::{ClusterDirectory, ClusterFilter, parse_filter_pairs};

// Control plane access
pub use control::{ClusterControl, ControlPlaneClient};

// Confirmation prompts
pub use confirm::{ConfirmationGate, StdinGate};

// Error handling
pub use error::{FleetError, Result};
