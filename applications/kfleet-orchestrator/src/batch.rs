//! Batch deployment/upgrade engine
//!
//! Drives an ordered list of clusters to completion under an admission cap:
//!
//! ```text
//! tick
//!  ├── 1. Admission decision (cohort wait / operator confirmation)
//!  ├── 2. Admission (status fetch → trigger, or park as pending)
//!  ├── 3. Sleep (refresh delay)
//!  ├── 4. Poll in-flight clusters
//!  └── 5. Termination check
//! ```
//!
//! "Concurrency" here is an admission-control count against the control
//! plane, not local parallelism: a single control loop issues calls, sleeps
//! and polls, while the clusters deploy in parallel on the server side.
//! In-flight statuses are fetched concurrently within a tick, but every
//! state mutation happens on the control loop between ticks.
//!
//! Per cluster the state machine is one-way: a cluster enters the run
//! unvisited, is parked as *pending* if the control plane is already acting
//! on it, or is triggered and tracked *in flight* until a terminal status is
//! observed, at which point it is *processed*. Pending and processed are
//! absorbing for the rest of the run.

use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::cluster::{ClusterDescriptor, ClusterStatus};
use crate::confirm::ConfirmationGate;
use crate::control::ClusterControl;
use crate::error::{FleetError, Result};

/// Default admission cap
pub const DEFAULT_PARALLEL_RUN: usize = 5;

/// Default delay between ticks (seconds)
pub const DEFAULT_REFRESH_DELAY_SECS: u64 = 30;

/// Above this cap the operator must confirm that the control-plane
/// autoscaler has been scaled up manually
pub const MAX_UNCONFIRMED_PARALLELISM: usize = 20;

/// Parameters of one batch run, immutable for its duration
#[derive(Debug, Clone)]
pub struct BatchParameters {
    /// Pass the dry-run flag through to every trigger
    pub dry_run: bool,

    /// Maximum number of clusters in flight at once (clamped to ≥ 1)
    pub parallel_run: usize,

    /// Delay between ticks
    pub refresh_delay: Duration,

    /// Wait for an entire cohort to finish (and confirm) before starting
    /// the next one, instead of refilling slots as they free up
    pub complete_batch_before_continue: bool,

    /// Target Kubernetes version; a non-empty value switches the run from
    /// deploy mode to upgrade mode
    pub target_version: Option<String>,

    /// Skip the construction-time parallelism confirmation
    pub suppress_confirmation: bool,
}

impl Default for BatchParameters {
    fn default() -> Self {
        Self {
            dry_run: false,
            parallel_run: DEFAULT_PARALLEL_RUN,
            refresh_delay: Duration::from_secs(DEFAULT_REFRESH_DELAY_SECS),
            complete_batch_before_continue: true,
            target_version: None,
            suppress_confirmation: false,
        }
    }
}

impl BatchParameters {
    /// Set the dry-run flag
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Set the admission cap
    pub fn with_parallel_run(mut self, parallel_run: usize) -> Self {
        self.parallel_run = parallel_run;
        self
    }

    /// Set the delay between ticks
    pub fn with_refresh_delay(mut self, delay: Duration) -> Self {
        self.refresh_delay = delay;
        self
    }

    /// Choose between cohort mode (true) and on-the-fly refill (false)
    pub fn with_complete_batch(mut self, complete_batch: bool) -> Self {
        self.complete_batch_before_continue = complete_batch;
        self
    }

    /// Set the upgrade target version
    pub fn with_target_version(mut self, version: impl Into<String>) -> Self {
        self.target_version = Some(version.into());
        self
    }

    /// Skip the construction-time parallelism confirmation
    pub fn with_suppress_confirmation(mut self, suppress: bool) -> Self {
        self.suppress_confirmation = suppress;
        self
    }
}

/// Final partition of the input list, produced exactly once per run
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    /// Clusters that were triggered and reached a terminal outcome during
    /// this run, in admission order
    pub processed: Vec<ClusterDescriptor>,

    /// Clusters whose status was already non-terminal when the engine
    /// reached them; these were never triggered
    pub pending: Vec<ClusterDescriptor>,
}

/// Drives an ordered cluster list to completion under an admission cap
pub struct BatchDeploymentEngine<C, G> {
    control: C,
    gate: G,
    params: BatchParameters,
}

impl<C: ClusterControl, G: ConfirmationGate> BatchDeploymentEngine<C, G> {
    /// Validate the parameters and build the engine
    ///
    /// Parallelism is clamped to a minimum of 1. Above
    /// [`MAX_UNCONFIRMED_PARALLELISM`] the operator must confirm that the
    /// control-plane autoscaler has been scaled manually, unless
    /// confirmation is suppressed; refusal aborts construction and no
    /// remote call is made. A non-empty target version switches the run to
    /// upgrade mode and forces cohort mode, since upgrades are never
    /// interleaved on the fly.
    pub fn new(mut params: BatchParameters, control: C, gate: G) -> Result<Self> {
        if params.parallel_run < 1 {
            params.parallel_run = 1;
        }

        // Treat an empty version string as "not an upgrade".
        if params.target_version.as_deref().is_some_and(str::is_empty) {
            params.target_version = None;
        }
        if params.target_version.is_some() {
            params.complete_batch_before_continue = true;
        }

        if params.parallel_run > MAX_UNCONFIRMED_PARALLELISM && !params.suppress_confirmation {
            let approved = gate.confirm(&format!(
                "Parallelism {} exceeds {}. Scale the control-plane autoscaler manually first. Proceed",
                params.parallel_run, MAX_UNCONFIRMED_PARALLELISM
            ))?;
            if !approved {
                return Err(FleetError::aborted(format!(
                    "parallelism {} not confirmed",
                    params.parallel_run
                )));
            }
        }

        Ok(Self {
            control,
            gate,
            params,
        })
    }

    /// The normalized parameters this engine will run with
    pub fn parameters(&self) -> &BatchParameters {
        &self.params
    }

    /// Run every cluster in `clusters` to a pending or processed outcome
    ///
    /// Returns the final partition, or the first fatal error (status-fetch
    /// failure, refused cohort confirmation) with no partial report.
    pub async fn run(self, clusters: Vec<ClusterDescriptor>) -> Result<BatchReport> {
        let upgrade = self.params.target_version.as_deref();

        info!(
            clusters = clusters.len(),
            parallel_run = self.params.parallel_run,
            cohort_mode = self.params.complete_batch_before_continue,
            dry_run = self.params.dry_run,
            target_version = upgrade.unwrap_or("-"),
            "Starting batch run"
        );

        // Cursor into the immutable input order; everything before it has
        // been classified.
        let mut cursor = 0usize;
        let mut cohort_started = false;

        let mut in_flight: Vec<ClusterDescriptor> = Vec::with_capacity(self.params.parallel_run);
        let mut pending: Vec<ClusterDescriptor> = Vec::new();
        let mut processed: Vec<ClusterDescriptor> = Vec::new();

        loop {
            // 1. Admission decision. In cohort mode a started cohort must
            // fully drain, and the operator confirms each new cohort.
            let mut wait_for_cohort = false;
            if self.params.complete_batch_before_continue && cohort_started {
                if in_flight.is_empty() {
                    let approved = self.gate.confirm(&format!(
                        "Batch finished, {} of {} cluster(s) classified. Continue with the next batch",
                        processed.len() + pending.len(),
                        clusters.len()
                    ))?;
                    if !approved {
                        return Err(FleetError::aborted("next batch declined"));
                    }
                } else {
                    wait_for_cohort = true;
                }
            }

            // 2. Admission, in input order, up to the cap.
            while !wait_for_cohort
                && in_flight.len() < self.params.parallel_run
                && cursor < clusters.len()
            {
                let mut cluster = clusters[cursor].clone();
                cursor += 1;

                let status = self
                    .control
                    .cluster_status(&cluster.organization_id, &cluster.id)
                    .await?;
                cluster.current_status = status;

                if !status.is_terminal() {
                    info!(
                        organization = %cluster.organization_name,
                        cluster_id = %cluster.id,
                        status = %status,
                        "Cluster busy at entry, leaving it untouched"
                    );
                    pending.push(cluster);
                    continue;
                }

                let trigger = match upgrade {
                    Some(version) => {
                        self.control
                            .trigger_upgrade(&cluster.id, version, self.params.dry_run)
                            .await
                    }
                    None => {
                        self.control
                            .trigger_deploy(&cluster.id, self.params.dry_run)
                            .await
                    }
                };
                if let Err(e) = trigger {
                    // Not fatal: the cluster stays tracked so its outcome
                    // is still polled for.
                    warn!(
                        organization = %cluster.organization_name,
                        cluster_id = %cluster.id,
                        error = %e,
                        "Trigger failed, still watching cluster"
                    );
                }

                cluster.current_status = ClusterStatus::Deploying;
                cohort_started = true;
                in_flight.push(cluster);
            }

            // 3. Tick delay, the only scheduling primitive.
            tokio::time::sleep(self.params.refresh_delay).await;

            // 4. Poll. Statuses are fetched concurrently, mutations applied
            // here on the control loop.
            let polls = in_flight
                .iter()
                .map(|c| self.control.cluster_status(&c.organization_id, &c.id));
            let statuses = futures::future::join_all(polls).await;

            let mut still_running = Vec::with_capacity(in_flight.len());
            for (mut cluster, status) in in_flight.into_iter().zip(statuses) {
                let status = status?;
                cluster.current_status = status;

                // INTERNAL_ERROR is not a terminal status, but a cluster in
                // that state never settles on its own; count it as done so
                // one broken cluster cannot stall the whole run.
                if status.is_terminal() || status == ClusterStatus::InternalError {
                    info!(
                        organization = %cluster.organization_name,
                        cluster_id = %cluster.id,
                        status = %status,
                        "Cluster finished"
                    );
                    processed.push(cluster);
                } else {
                    debug!(
                        cluster_id = %cluster.id,
                        status = %status,
                        "Cluster still in flight"
                    );
                    still_running.push(cluster);
                }
            }
            in_flight = still_running;

            // 5. Termination: everything visited and nothing in flight.
            if in_flight.is_empty() && cursor == clusters.len() {
                info!(
                    processed = processed.len(),
                    pending = pending.len(),
                    "Batch run complete"
                );
                return Ok(BatchReport { processed, pending });
            }
        }
    }
}
