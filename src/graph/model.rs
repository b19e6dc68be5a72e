// SPDX-License-Identifier: MIT

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ─── RepoKind ────────────────────────────────────────────────────────────────

/// What kind of codebase a repository holds.
///
/// `Server` is the distinguished kind: server repositories are submitted for
/// indexing the moment they are created, while every other kind waits until a
/// dependency edge points at it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepoKind {
    Server,
    Web,
    Mobile,
    Desktop,
}

impl RepoKind {
    /// Canonical string form used on the wire and in logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            RepoKind::Server => "server",
            RepoKind::Web => "web",
            RepoKind::Mobile => "mobile",
            RepoKind::Desktop => "desktop",
        }
    }

    /// Parse the canonical string form. Unknown strings are `None` rather than
    /// a fallback: silently coercing to or from `Server` would change
    /// indexing behavior.
    pub fn parse(s: &str) -> Option<RepoKind> {
        match s {
            "server" => Some(RepoKind::Server),
            "web" => Some(RepoKind::Web),
            "mobile" => Some(RepoKind::Mobile),
            "desktop" => Some(RepoKind::Desktop),
            _ => None,
        }
    }
}

// ─── RepoStatus ──────────────────────────────────────────────────────────────

/// Where a repository currently stands with the external indexing service.
///
/// ```text
///   UNTRACKED ──first incoming edge──► PENDING ──success──► INDEXED
///                                         │
///                                         └───failure─────► FAILED
/// ```
///
/// Server repositories skip `Untracked` and are created `Pending`. Any
/// non-server repository reverts to `Untracked` when its incoming degree
/// drops back to zero, whatever status it was in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepoStatus {
    Untracked,
    Pending,
    Indexed,
    Failed,
}

impl RepoStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RepoStatus::Untracked => "untracked",
            RepoStatus::Pending => "pending",
            RepoStatus::Indexed => "indexed",
            RepoStatus::Failed => "failed",
        }
    }

    /// Status a freshly created repository starts in. Server repositories are
    /// never `Untracked`; everything else becomes trackable only once a
    /// dependency edge points at it.
    pub fn initial_for(kind: RepoKind) -> RepoStatus {
        match kind {
            RepoKind::Server => RepoStatus::Pending,
            _ => RepoStatus::Untracked,
        }
    }
}

// ─── Project ─────────────────────────────────────────────────────────────────

/// A project groups the repositories that make up one product.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub name: String,
    pub created_at: String,
}

impl Project {
    pub fn new(name: &str) -> Project {
        Project {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            created_at: Utc::now().to_rfc3339(),
        }
    }
}

// ─── Repository ──────────────────────────────────────────────────────────────

/// A tracked code repository inside a project.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Repository {
    pub id: String,
    pub project_id: String,
    /// Human-readable name (e.g. `"storefront-api"`).
    pub name: String,
    /// Source locator: http(s) URL, `git@` remote, or an absolute local path.
    pub url: String,
    pub kind: RepoKind,
    pub status: RepoStatus,
    pub created_at: String,
}

impl Repository {
    /// Build a new repository record with a fresh id and the initial status
    /// derived from its kind.
    pub fn new(project_id: &str, name: &str, url: &str, kind: RepoKind) -> Repository {
        Repository {
            id: Uuid::new_v4().to_string(),
            project_id: project_id.to_string(),
            name: name.to_string(),
            url: url.to_string(),
            kind,
            status: RepoStatus::initial_for(kind),
            created_at: Utc::now().to_rfc3339(),
        }
    }
}

// ─── Dependency ──────────────────────────────────────────────────────────────

/// A directed dependency edge: the source repository depends on (consumes)
/// the target. A repository becomes eligible for indexing once at least one
/// edge points at it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dependency {
    pub source_id: String,
    pub target_id: String,
    pub created_at: String,
}

impl Dependency {
    pub fn new(source_id: &str, target_id: &str) -> Dependency {
        Dependency {
            source_id: source_id.to_string(),
            target_id: target_id.to_string(),
            created_at: Utc::now().to_rfc3339(),
        }
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
