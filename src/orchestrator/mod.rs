// SPDX-License-Identifier: MIT
//! Repository status lifecycle.
//!
//! The orchestrator is the only writer of repository status. Every transition
//! follows the same shape: take the repository's transition lock, decide
//! against current state, write through the store, publish the event. When a
//! transition lands a repository in `Pending`, a detached background task
//! submits it to the indexing service; the task's only effects are one status
//! write and one event, and both are discarded if the repository's generation
//! counter moved while the submission was in flight.
//!
//! Collaborators (store, indexing client, event sink) are injected at
//! construction, so tests run the full lifecycle against fakes.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::events::{EventSink, RepositoryEvent};
use crate::graph::model::{Dependency, Project, RepoKind, RepoStatus, Repository};
use crate::graph::store::{GraphError, SharedGraphStore};
use crate::indexer::client::{SharedIndexerClient, SubmitOutcome};
use crate::validation::{is_valid_repo_url, is_valid_uuid};

// ─── Errors ──────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    #[error("invalid project id: {0}")]
    InvalidProjectId(String),
    #[error("invalid repository url: {0}")]
    InvalidRepoUrl(String),
    #[error(transparent)]
    Graph(#[from] GraphError),
}

// ─── Orchestrator ────────────────────────────────────────────────────────────

/// Drives repository status through its lifecycle and publishes an event for
/// every committed change.
#[derive(Clone)]
pub struct StatusOrchestrator {
    store: SharedGraphStore,
    indexer: SharedIndexerClient,
    events: Arc<dyn EventSink>,
    /// One mutex per repository id, held across each check-then-act on that
    /// repository's status. Two near-simultaneous dependency additions would
    /// otherwise both observe `Untracked` and submit twice.
    transition_locks: Arc<Mutex<HashMap<String, Arc<Mutex<()>>>>>,
}

pub type SharedOrchestrator = Arc<StatusOrchestrator>;

impl StatusOrchestrator {
    pub fn new(
        store: SharedGraphStore,
        indexer: SharedIndexerClient,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            store,
            indexer,
            events,
            transition_locks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    async fn transition_lock(&self, repo_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.transition_locks.lock().await;
        locks
            .entry(repo_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    // ─── Projects ────────────────────────────────────────────────────────────

    pub async fn create_project(&self, name: &str) -> Project {
        let project = self.store.create_project(name).await;
        info!(project_id = %project.id, name, "project created");
        project
    }

    pub async fn get_project(&self, id: &str) -> Result<Project, OrchestratorError> {
        Ok(self.store.get_project(id).await?)
    }

    pub async fn list_repositories(
        &self,
        project_id: &str,
    ) -> Result<Vec<Repository>, OrchestratorError> {
        Ok(self.store.list_repositories(project_id).await?)
    }

    pub async fn list_dependencies(
        &self,
        project_id: &str,
    ) -> Result<Vec<Dependency>, OrchestratorError> {
        Ok(self.store.list_dependencies(project_id).await?)
    }

    // ─── Repositories ────────────────────────────────────────────────────────

    /// Register a repository. Server repositories are created `Pending` and
    /// submitted for indexing immediately; everything else starts `Untracked`
    /// and waits for its first incoming dependency edge.
    pub async fn create_repository(
        &self,
        project_id: &str,
        name: &str,
        url: &str,
        kind: RepoKind,
    ) -> Result<Repository, OrchestratorError> {
        if !is_valid_uuid(project_id) {
            return Err(OrchestratorError::InvalidProjectId(project_id.to_string()));
        }
        if !is_valid_repo_url(url) {
            return Err(OrchestratorError::InvalidRepoUrl(url.to_string()));
        }

        let repo = self.store.add_repository(project_id, name, url, kind).await?;
        info!(
            repo_id = %repo.id,
            project_id,
            kind = kind.as_str(),
            status = repo.status.as_str(),
            "repository created"
        );
        self.events.publish(RepositoryEvent::added(repo.clone()));

        if repo.kind == RepoKind::Server {
            // Status and event are committed before the submission starts.
            self.spawn_submission(&repo).await;
        }
        Ok(repo)
    }

    pub async fn get_repository(&self, id: &str) -> Result<Repository, OrchestratorError> {
        Ok(self.store.get_repository(id).await?)
    }

    // ─── Dependency edges ────────────────────────────────────────────────────

    /// Add the edge `source -> target`. If this is the target's first incoming
    /// edge and it was `Untracked`, the target moves to `Pending` and is
    /// submitted for indexing. Re-adding an existing edge is a no-op success.
    pub async fn add_dependency(
        &self,
        source_id: &str,
        target_id: &str,
    ) -> Result<Dependency, OrchestratorError> {
        // Only ids the store knows may earn a lock arena entry.
        self.store.get_repository(target_id).await?;
        let lock = self.transition_lock(target_id).await;
        let _guard = lock.lock().await;

        let (edge, created) = self.store.add_dependency(source_id, target_id).await?;
        if !created {
            debug!(source_id, target_id, "dependency already present");
            return Ok(edge);
        }
        info!(source_id, target_id, "dependency added");

        let target = self.store.get_repository(target_id).await?;
        if target.status == RepoStatus::Untracked {
            // First incoming edge makes the target worth indexing.
            let updated = self.store.set_status(target_id, RepoStatus::Pending).await?;
            info!(repo_id = target_id, "repository pending indexing");
            self.events.publish(RepositoryEvent::updated(updated.clone()));
            self.spawn_submission(&updated).await;
        }
        Ok(edge)
    }

    /// Remove the edge `source -> target`. A non-server target whose incoming
    /// degree drops to zero reverts to `Untracked`; its generation is bumped
    /// so any submission still in flight discards its outcome.
    pub async fn remove_dependency(
        &self,
        source_id: &str,
        target_id: &str,
    ) -> Result<(), OrchestratorError> {
        // Only ids the store knows may earn a lock arena entry.
        self.store.get_repository(target_id).await?;
        let lock = self.transition_lock(target_id).await;
        let _guard = lock.lock().await;

        self.store.remove_dependency(source_id, target_id).await?;
        info!(source_id, target_id, "dependency removed");

        let target = self.store.get_repository(target_id).await?;
        if target.kind == RepoKind::Server {
            return Ok(());
        }
        let degree = self.store.incoming_degree(target_id).await?;
        if degree == 0 && target.status != RepoStatus::Untracked {
            let updated = self.store.set_status(target_id, RepoStatus::Untracked).await?;
            let generation = self.store.bump_generation(target_id).await?;
            info!(repo_id = target_id, generation, "repository orphaned, no longer tracked");
            self.events.publish(RepositoryEvent::updated(updated));
        }
        Ok(())
    }

    // ─── Submissions ─────────────────────────────────────────────────────────

    /// Launch the detached indexing task for a repository that just became
    /// `Pending`. Callers hold the repository's transition lock wherever a
    /// concurrent reversion could move the generation between the status
    /// write and the capture here.
    async fn spawn_submission(&self, repo: &Repository) {
        let generation = match self.store.generation(&repo.id).await {
            Ok(g) => g,
            Err(e) => {
                warn!(repo_id = %repo.id, err = %e, "repository vanished before submission");
                return;
            }
        };

        let this = self.clone();
        let repo_id = repo.id.clone();
        let project_id = repo.project_id.clone();
        let url = repo.url.clone();
        tokio::spawn(async move {
            let outcome = this.indexer.submit(&project_id, &url).await;
            this.apply_submit_outcome(&repo_id, generation, outcome).await;
        });
    }

    /// Record a submission's terminal outcome, unless the repository moved on
    /// while it was in flight.
    async fn apply_submit_outcome(&self, repo_id: &str, generation: u64, outcome: SubmitOutcome) {
        let lock = self.transition_lock(repo_id).await;
        let _guard = lock.lock().await;

        let current = match self.store.generation(repo_id).await {
            Ok(g) => g,
            Err(e) => {
                warn!(repo_id, err = %e, "repository vanished while its submission was in flight");
                return;
            }
        };
        if current != generation {
            debug!(
                repo_id,
                captured = generation,
                current,
                "discarding stale submission outcome"
            );
            return;
        }

        let status = match &outcome {
            SubmitOutcome::Success => RepoStatus::Indexed,
            SubmitOutcome::PermanentFailure { .. }
            | SubmitOutcome::TransientFailureExhausted { .. } => RepoStatus::Failed,
        };
        match self.store.set_status(repo_id, status).await {
            Ok(updated) => {
                match &outcome {
                    SubmitOutcome::Success => info!(repo_id, "repository indexed"),
                    SubmitOutcome::PermanentFailure { reason } => {
                        warn!(repo_id, reason = %reason, "indexing failed permanently")
                    }
                    SubmitOutcome::TransientFailureExhausted { reason } => {
                        warn!(repo_id, reason = %reason, "indexing gave up after retries")
                    }
                }
                self.events.publish(RepositoryEvent::updated(updated));
            }
            Err(e) => warn!(repo_id, err = %e, "could not record submission outcome"),
        }
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
