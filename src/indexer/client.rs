// SPDX-License-Identifier: MIT
//! HTTP client for the external indexing service.
//!
//! Submission is fire-and-classify: the caller gets a [`SubmitOutcome`], never
//! an `Err`, because every way the service can fail is a normal result the
//! orchestrator maps to a repository status. Per-try classification:
//!
//! - 200/201            → success
//! - any other 2xx      → permanent (outside the service contract)
//! - 4xx                → permanent, no further tries
//! - 5xx / timeout / connection trouble → transient, retried with backoff
//! - anything else      → transient, but logged louder since we cannot name it
//!
//! The graph read path ([`HttpIndexerClient::graph_data`]) is the opposite:
//! it backs a UI poll, so any failure degrades to an empty graph instead of
//! propagating.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::config::ServiceConfig;
use crate::retry::{retry_with_backoff, RetryConfig};
use crate::validation::{is_valid_repo_url, is_valid_uuid};

// ─── Outcome ─────────────────────────────────────────────────────────────────

/// Terminal result of one submission (which may span several HTTP tries).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The service accepted the repository.
    Success,
    /// Retrying cannot help: invalid input, a 4xx, or a response outside the
    /// service contract.
    PermanentFailure { reason: String },
    /// The whole retry budget went to transient errors; carries the last one.
    TransientFailureExhausted { reason: String },
}

// ─── Client seam ─────────────────────────────────────────────────────────────

/// Seam between the orchestrator and the indexing service. Production wires
/// in [`HttpIndexerClient`]; tests inject fakes that resolve on cue.
#[async_trait]
pub trait IndexerClient: Send + Sync {
    /// Ask the service to index `repo_url` under `project_id`.
    async fn submit(&self, project_id: &str, repo_url: &str) -> SubmitOutcome;
}

pub type SharedIndexerClient = Arc<dyn IndexerClient>;

// ─── Per-try classification ──────────────────────────────────────────────────

#[derive(Debug)]
enum TryError {
    /// Will fail identically on every try.
    Permanent(String),
    /// Worth another try after backoff.
    Transient(String),
}

impl TryError {
    fn is_transient(&self) -> bool {
        matches!(self, TryError::Transient(_))
    }

    fn into_reason(self) -> String {
        match self {
            TryError::Permanent(r) | TryError::Transient(r) => r,
        }
    }
}

fn classify_transport_error(e: reqwest::Error) -> TryError {
    if e.is_timeout() {
        TryError::Transient(format!("request timed out: {e}"))
    } else if e.is_connect() {
        TryError::Transient(format!("connection failed: {e}"))
    } else {
        // Not a shape we recognize. Retry anyway, but leave a louder trace
        // than the expected transient cases get.
        warn!(err = %e, "unclassified transport error while calling indexing service");
        TryError::Transient(e.to_string())
    }
}

/// Error bodies may carry a human-readable message; nothing else in them is
/// part of the contract.
#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

async fn failure_reason(resp: reqwest::Response) -> String {
    let status = resp.status();
    match resp.json::<ErrorBody>().await.ok().and_then(|b| b.message) {
        Some(message) => format!("{status}: {message}"),
        None => status.to_string(),
    }
}

// ─── GraphData ───────────────────────────────────────────────────────────────

/// Response shape of the `graph-data` endpoint. Node and edge elements are
/// passed through untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphData {
    #[serde(default)]
    pub nodes: Vec<Value>,
    #[serde(default)]
    pub edges: Vec<Value>,
}

// ─── HTTP implementation ─────────────────────────────────────────────────────

pub struct HttpIndexerClient {
    base_url: String,
    http: reqwest::Client,
    retry: RetryConfig,
}

impl HttpIndexerClient {
    /// Build a client against `base_url` with a per-try request timeout.
    pub fn new(
        base_url: &str,
        request_timeout: Duration,
        retry: RetryConfig,
    ) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder().timeout(request_timeout).build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
            retry,
        })
    }

    pub fn from_config(config: &ServiceConfig) -> anyhow::Result<Self> {
        Self::new(
            &config.indexer_base_url,
            config.request_timeout(),
            config.retry(),
        )
    }

    async fn try_submit(&self, project_id: &str, repo_url: &str) -> Result<(), TryError> {
        let url = format!("{}/add-repository", self.base_url);
        let resp = self
            .http
            .post(&url)
            .json(&json!({ "project_id": project_id, "repo_url": repo_url }))
            .send()
            .await
            .map_err(classify_transport_error)?;

        let status = resp.status();
        if status == StatusCode::OK || status == StatusCode::CREATED {
            return Ok(());
        }
        if status.is_success() {
            // A 2xx we were never promised. Treat ambiguous success as
            // failure rather than guessing the repository got indexed.
            return Err(TryError::Permanent(format!("unexpected status {status}")));
        }
        let reason = failure_reason(resp).await;
        if status.is_client_error() {
            Err(TryError::Permanent(reason))
        } else if status.is_server_error() {
            Err(TryError::Transient(reason))
        } else {
            warn!(%status, "unclassified response status from indexing service");
            Err(TryError::Transient(reason))
        }
    }

    /// Fetch the rendered dependency graph for a project.
    ///
    /// Never fails: transport errors, bad statuses, and malformed bodies all
    /// degrade to an empty graph with a warning, since this read backs a UI
    /// poll that should keep rendering.
    pub async fn graph_data(&self, project_id: &str) -> GraphData {
        match self.try_graph_data(project_id).await {
            Ok(graph) => {
                debug!(
                    project_id,
                    nodes = graph.nodes.len(),
                    edges = graph.edges.len(),
                    "fetched graph data"
                );
                graph
            }
            Err(reason) => {
                warn!(project_id, reason, "graph-data fetch failed, serving empty graph");
                GraphData::default()
            }
        }
    }

    async fn try_graph_data(&self, project_id: &str) -> Result<GraphData, String> {
        if !is_valid_uuid(project_id) {
            return Err(format!("invalid project id: {project_id}"));
        }
        let url = format!("{}/graph-data", self.base_url);
        let resp = self
            .http
            .get(&url)
            .query(&[("project_id", project_id)])
            .send()
            .await
            .map_err(|e| e.to_string())?
            .error_for_status()
            .map_err(|e| e.to_string())?;
        resp.json::<GraphData>().await.map_err(|e| e.to_string())
    }
}

#[async_trait]
impl IndexerClient for HttpIndexerClient {
    async fn submit(&self, project_id: &str, repo_url: &str) -> SubmitOutcome {
        // Fail fast on input the service is guaranteed to reject; no network
        // call for these.
        if !is_valid_uuid(project_id) {
            warn!(project_id, "rejecting submission: project id is not a canonical uuid");
            return SubmitOutcome::PermanentFailure {
                reason: format!("invalid project id: {project_id}"),
            };
        }
        if !is_valid_repo_url(repo_url) {
            warn!(url = repo_url, "rejecting submission: unsupported repository url");
            return SubmitOutcome::PermanentFailure {
                reason: format!("invalid repository url: {repo_url}"),
            };
        }

        let started = Instant::now();
        let result = retry_with_backoff(&self.retry, TryError::is_transient, || {
            self.try_submit(project_id, repo_url)
        })
        .await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match result {
            Ok(()) => {
                info!(project_id, url = repo_url, elapsed_ms, "repository accepted for indexing");
                SubmitOutcome::Success
            }
            Err(e @ TryError::Permanent(_)) => {
                let reason = e.into_reason();
                warn!(project_id, url = repo_url, reason, elapsed_ms, "submission rejected");
                SubmitOutcome::PermanentFailure { reason }
            }
            Err(e @ TryError::Transient(_)) => {
                let reason = e.into_reason();
                warn!(
                    project_id,
                    url = repo_url,
                    reason,
                    elapsed_ms,
                    "submission gave up after transient failures"
                );
                SubmitOutcome::TransientFailureExhausted { reason }
            }
        }
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
