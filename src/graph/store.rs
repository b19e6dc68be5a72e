// SPDX-License-Identifier: MIT
//! In-memory store for projects, repositories, and dependency edges.
//!
//! Pure bookkeeping: each operation is atomic behind one `RwLock`, and no
//! indexing decisions happen here. The status lifecycle (who transitions,
//! when, and what gets broadcast) lives in [`crate::orchestrator`], which is
//! also the only writer of repository status.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use super::model::{Dependency, Project, RepoKind, RepoStatus, Repository};

// ─── Errors ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    #[error("project not found: {0}")]
    ProjectNotFound(String),
    #[error("repository not found: {0}")]
    RepositoryNotFound(String),
    // Field names avoid `source`, which thiserror reserves for error chaining.
    #[error("no dependency edge {source_id} -> {target_id}")]
    DependencyNotFound { source_id: String, target_id: String },
    #[error("repository cannot depend on itself: {0}")]
    SelfDependency(String),
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// One repository record plus bookkeeping the wire never sees.
#[derive(Debug, Clone)]
struct RepoEntry {
    repo: Repository,
    /// Bumped on every orphan reversion; in-flight submissions that captured
    /// an older value discard their outcome instead of applying it.
    generation: u64,
}

#[derive(Default)]
struct GraphInner {
    projects: HashMap<String, Project>,
    repos: HashMap<String, RepoEntry>,
    /// Keyed by `(source_id, target_id)`, which also makes parallel edges
    /// unrepresentable.
    edges: HashMap<(String, String), Dependency>,
}

/// The dependency graph and everything hanging off it.
pub struct GraphStore {
    inner: RwLock<GraphInner>,
}

pub type SharedGraphStore = Arc<GraphStore>;

impl Default for GraphStore {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(GraphInner::default()),
        }
    }

    // ─── Projects ────────────────────────────────────────────────────────────

    pub async fn create_project(&self, name: &str) -> Project {
        let project = Project::new(name);
        let mut inner = self.inner.write().await;
        inner.projects.insert(project.id.clone(), project.clone());
        project
    }

    pub async fn get_project(&self, id: &str) -> Result<Project, GraphError> {
        let inner = self.inner.read().await;
        inner
            .projects
            .get(id)
            .cloned()
            .ok_or_else(|| GraphError::ProjectNotFound(id.to_string()))
    }

    // ─── Repositories ────────────────────────────────────────────────────────

    /// Register a repository under an existing project. The initial status is
    /// derived from the kind: servers start `Pending`, everything else
    /// `Untracked`.
    pub async fn add_repository(
        &self,
        project_id: &str,
        name: &str,
        url: &str,
        kind: RepoKind,
    ) -> Result<Repository, GraphError> {
        let mut inner = self.inner.write().await;
        if !inner.projects.contains_key(project_id) {
            return Err(GraphError::ProjectNotFound(project_id.to_string()));
        }
        let repo = Repository::new(project_id, name, url, kind);
        inner.repos.insert(
            repo.id.clone(),
            RepoEntry {
                repo: repo.clone(),
                generation: 0,
            },
        );
        Ok(repo)
    }

    pub async fn get_repository(&self, id: &str) -> Result<Repository, GraphError> {
        let inner = self.inner.read().await;
        inner
            .repos
            .get(id)
            .map(|e| e.repo.clone())
            .ok_or_else(|| GraphError::RepositoryNotFound(id.to_string()))
    }

    /// All repositories of a project, oldest first.
    pub async fn list_repositories(&self, project_id: &str) -> Result<Vec<Repository>, GraphError> {
        let inner = self.inner.read().await;
        if !inner.projects.contains_key(project_id) {
            return Err(GraphError::ProjectNotFound(project_id.to_string()));
        }
        let mut repos: Vec<Repository> = inner
            .repos
            .values()
            .filter(|e| e.repo.project_id == project_id)
            .map(|e| e.repo.clone())
            .collect();
        repos.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(repos)
    }

    // ─── Dependency edges ────────────────────────────────────────────────────

    /// Add the directed edge `source -> target`.
    ///
    /// Idempotent: if the pair already exists the stored edge is returned
    /// with `created = false` and nothing changes.
    pub async fn add_dependency(
        &self,
        source_id: &str,
        target_id: &str,
    ) -> Result<(Dependency, bool), GraphError> {
        if source_id == target_id {
            return Err(GraphError::SelfDependency(source_id.to_string()));
        }
        let mut inner = self.inner.write().await;
        if !inner.repos.contains_key(source_id) {
            return Err(GraphError::RepositoryNotFound(source_id.to_string()));
        }
        if !inner.repos.contains_key(target_id) {
            return Err(GraphError::RepositoryNotFound(target_id.to_string()));
        }
        let key = (source_id.to_string(), target_id.to_string());
        if let Some(existing) = inner.edges.get(&key) {
            return Ok((existing.clone(), false));
        }
        let edge = Dependency::new(source_id, target_id);
        inner.edges.insert(key, edge.clone());
        Ok((edge, true))
    }

    pub async fn remove_dependency(
        &self,
        source_id: &str,
        target_id: &str,
    ) -> Result<(), GraphError> {
        let mut inner = self.inner.write().await;
        let key = (source_id.to_string(), target_id.to_string());
        match inner.edges.remove(&key) {
            Some(_) => Ok(()),
            None => Err(GraphError::DependencyNotFound {
                source_id: source_id.to_string(),
                target_id: target_id.to_string(),
            }),
        }
    }

    /// Number of edges pointing at `repo_id`.
    pub async fn incoming_degree(&self, repo_id: &str) -> Result<usize, GraphError> {
        let inner = self.inner.read().await;
        if !inner.repos.contains_key(repo_id) {
            return Err(GraphError::RepositoryNotFound(repo_id.to_string()));
        }
        Ok(inner
            .edges
            .keys()
            .filter(|(_, target)| target == repo_id)
            .count())
    }

    /// All edges whose source repository belongs to the project, oldest first.
    pub async fn list_dependencies(&self, project_id: &str) -> Result<Vec<Dependency>, GraphError> {
        let inner = self.inner.read().await;
        if !inner.projects.contains_key(project_id) {
            return Err(GraphError::ProjectNotFound(project_id.to_string()));
        }
        let mut edges: Vec<Dependency> = inner
            .edges
            .values()
            .filter(|d| {
                inner
                    .repos
                    .get(&d.source_id)
                    .is_some_and(|e| e.repo.project_id == project_id)
            })
            .cloned()
            .collect();
        edges.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(edges)
    }

    // ─── Status and generation ───────────────────────────────────────────────

    /// Overwrite a repository's status, returning the updated record.
    pub async fn set_status(
        &self,
        repo_id: &str,
        status: RepoStatus,
    ) -> Result<Repository, GraphError> {
        let mut inner = self.inner.write().await;
        let entry = inner
            .repos
            .get_mut(repo_id)
            .ok_or_else(|| GraphError::RepositoryNotFound(repo_id.to_string()))?;
        entry.repo.status = status;
        Ok(entry.repo.clone())
    }

    pub async fn generation(&self, repo_id: &str) -> Result<u64, GraphError> {
        let inner = self.inner.read().await;
        inner
            .repos
            .get(repo_id)
            .map(|e| e.generation)
            .ok_or_else(|| GraphError::RepositoryNotFound(repo_id.to_string()))
    }

    /// Advance the generation counter, invalidating submissions still in
    /// flight for this repository. Returns the new value.
    pub async fn bump_generation(&self, repo_id: &str) -> Result<u64, GraphError> {
        let mut inner = self.inner.write().await;
        let entry = inner
            .repos
            .get_mut(repo_id)
            .ok_or_else(|| GraphError::RepositoryNotFound(repo_id.to_string()))?;
        entry.generation += 1;
        Ok(entry.generation)
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
