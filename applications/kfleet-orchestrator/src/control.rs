//! Control-plane API client
//!
//! Thin HTTP layer over the fleet control plane. Three operations matter to
//! the batch engine (status fetch, deploy trigger, upgrade trigger); the
//! listing endpoint feeds the [`crate::directory`] stage.
//!
//! ## Reauthentication
//!
//! Bearer tokens are short-lived. Every call goes through [`with_reauth`]:
//! a first 401 answer swaps the token for a fresh one from the token
//! endpoint and retries exactly once, a second failure surfaces as a normal
//! API error. The retry is invisible to callers.

use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::future::Future;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::cluster::{ClusterDescriptor, ClusterStatus};
use crate::error::{FleetError, Result};

/// Request timeout for control-plane calls
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Remote operations the batch engine needs
///
/// The engine works through this interface only, so tests can script
/// statuses without a control plane behind them.
#[async_trait]
pub trait ClusterControl {
    /// Fetch the current status of one cluster
    async fn cluster_status(
        &self,
        organization_id: &str,
        cluster_id: &str,
    ) -> Result<ClusterStatus>;

    /// Trigger a deployment of the cluster's current version
    async fn trigger_deploy(&self, cluster_id: &str, dry_run: bool) -> Result<()>;

    /// Trigger an upgrade to the target Kubernetes version
    async fn trigger_upgrade(
        &self,
        cluster_id: &str,
        target_version: &str,
        dry_run: bool,
    ) -> Result<()>;
}

/// HTTP client for the fleet control plane
pub struct ControlPlaneClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    bearer: RwLock<Option<String>>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    token: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ClusterListResponse {
    clusters: Vec<ClusterDescriptor>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ClusterStatusResponse {
    status: ClusterStatus,
}

impl ControlPlaneClient {
    /// Create a client for the given endpoint and API key
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            bearer: RwLock::new(None),
        })
    }

    /// List every cluster eligible for maintenance
    pub async fn list_clusters(&self) -> Result<Vec<ClusterDescriptor>> {
        let url = format!("{}/admin/clusters", self.base_url);

        let response: ClusterListResponse = self
            .with_reauth(|token| {
                let url = url.clone();
                let http = self.http.clone();
                async move {
                    let response = http.get(&url).bearer_auth(&token).send().await?;
                    parse_json(response).await
                }
            })
            .await?;

        debug!(count = response.clusters.len(), "Listed clusters");
        Ok(response.clusters)
    }

    /// Fetch the current status of one cluster
    pub async fn cluster_status(
        &self,
        organization_id: &str,
        cluster_id: &str,
    ) -> Result<ClusterStatus> {
        let url = format!(
            "{}/organizations/{}/clusters/{}/status",
            self.base_url, organization_id, cluster_id
        );

        let response: ClusterStatusResponse = self
            .with_reauth(|token| {
                let url = url.clone();
                let http = self.http.clone();
                async move {
                    let response = http.get(&url).bearer_auth(&token).send().await?;
                    parse_json(response).await
                }
            })
            .await?;

        Ok(response.status)
    }

    /// Trigger a deployment of the cluster's current version
    pub async fn trigger_deploy(&self, cluster_id: &str, dry_run: bool) -> Result<()> {
        let url = format!("{}/clusters/{}/deploy", self.base_url, cluster_id);
        let body = serde_json::json!({ "dryRun": dry_run });

        self.with_reauth(|token| {
            let url = url.clone();
            let body = body.clone();
            let http = self.http.clone();
            async move {
                let response = http.post(&url).bearer_auth(&token).json(&body).send().await?;
                expect_success(response).await
            }
        })
        .await?;

        info!(cluster_id = %cluster_id, dry_run = dry_run, "Deployment triggered");
        Ok(())
    }

    /// Trigger an upgrade to the target Kubernetes version
    pub async fn trigger_upgrade(
        &self,
        cluster_id: &str,
        target_version: &str,
        dry_run: bool,
    ) -> Result<()> {
        let url = format!("{}/clusters/{}/upgrade", self.base_url, cluster_id);
        let body = serde_json::json!({ "targetVersion": target_version, "dryRun": dry_run });

        self.with_reauth(|token| {
            let url = url.clone();
            let body = body.clone();
            let http = self.http.clone();
            async move {
                let response = http.post(&url).bearer_auth(&token).json(&body).send().await?;
                expect_success(response).await
            }
        })
        .await?;

        info!(
            cluster_id = %cluster_id,
            target_version = %target_version,
            dry_run = dry_run,
            "Upgrade triggered"
        );
        Ok(())
    }

    /// Run `call` with a bearer token, refreshing the token and retrying
    /// exactly once if the control plane answers 401
    async fn with_reauth<T, F, Fut>(&self, call: F) -> Result<T>
    where
        F: Fn(String) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let token = self.bearer_token().await?;

        match call(token).await {
            Err(e) if e.is_unauthorized() => {
                debug!("Bearer token rejected, reauthenticating once");
                let token = self.refresh_token().await?;
                call(token).await
            }
            other => other,
        }
    }

    /// Return the cached bearer token, fetching one on first use
    async fn bearer_token(&self) -> Result<String> {
        if let Some(token) = self.bearer.read().await.clone() {
            return Ok(token);
        }
        self.refresh_token().await
    }

    /// Exchange the API key for a fresh bearer token and cache it
    async fn refresh_token(&self) -> Result<String> {
        let url = format!("{}/auth/token", self.base_url);

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .send()
            .await?;
        let token = parse_json::<TokenResponse>(response).await?.token;

        *self.bearer.write().await = Some(token.clone());
        Ok(token)
    }
}

#[async_trait]
impl ClusterControl for ControlPlaneClient {
    async fn cluster_status(
        &self,
        organization_id: &str,
        cluster_id: &str,
    ) -> Result<ClusterStatus> {
        ControlPlaneClient::cluster_status(self, organization_id, cluster_id).await
    }

    async fn trigger_deploy(&self, cluster_id: &str, dry_run: bool) -> Result<()> {
        ControlPlaneClient::trigger_deploy(self, cluster_id, dry_run).await
    }

    async fn trigger_upgrade(
        &self,
        cluster_id: &str,
        target_version: &str,
        dry_run: bool,
    ) -> Result<()> {
        ControlPlaneClient::trigger_upgrade(self, cluster_id, target_version, dry_run).await
    }
}

/// Decode a JSON body, turning non-2xx answers into [`FleetError::Api`]
async fn parse_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    if response.status().is_success() {
        Ok(response.json().await?)
    } else {
        Err(api_error(response).await)
    }
}

/// Discard the body of a 2xx answer, keep it verbatim otherwise
async fn expect_success(response: reqwest::Response) -> Result<()> {
    if response.status().is_success() {
        Ok(())
    } else {
        Err(api_error(response).await)
    }
}

async fn api_error(response: reqwest::Response) -> FleetError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    FleetError::Api { status, body }
}
