//! Repository lifecycle events and the broadcaster the orchestrator publishes
//! them through. Delivery to the outside world (WebSocket, SSE, whatever the
//! embedding service uses) is the consumer's job; this module only defines the
//! event shape and an in-process fan-out.

use serde::Serialize;
use tokio::sync::broadcast;

use crate::graph::model::Repository;

// ─── Event types ─────────────────────────────────────────────────────────────

/// Event names on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RepositoryEventKind {
    #[serde(rename = "repository:added")]
    Added,
    #[serde(rename = "repository:updated")]
    Updated,
}

impl RepositoryEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RepositoryEventKind::Added => "repository:added",
            RepositoryEventKind::Updated => "repository:updated",
        }
    }
}

/// One lifecycle event: a repository was created, or its record (usually the
/// status field) changed. Carries the full current record so consumers never
/// have to read back.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryEvent {
    pub event: RepositoryEventKind,
    pub project_id: String,
    pub repository: Repository,
}

impl RepositoryEvent {
    pub fn added(repository: Repository) -> RepositoryEvent {
        RepositoryEvent {
            event: RepositoryEventKind::Added,
            project_id: repository.project_id.clone(),
            repository,
        }
    }

    pub fn updated(repository: Repository) -> RepositoryEvent {
        RepositoryEvent {
            event: RepositoryEventKind::Updated,
            project_id: repository.project_id.clone(),
            repository,
        }
    }
}

// ─── Sink seam ───────────────────────────────────────────────────────────────

/// Where the orchestrator hands committed events. Injected at construction so
/// tests can capture events and deployments can bridge to their transport.
pub trait EventSink: Send + Sync {
    fn publish(&self, event: RepositoryEvent);
}

// ─── Channel broadcaster ─────────────────────────────────────────────────────

/// Fans events out to every in-process subscriber.
#[derive(Clone)]
pub struct EventBroadcaster {
    tx: broadcast::Sender<RepositoryEvent>,
}

impl Default for EventBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBroadcaster {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1024);
        Self { tx }
    }

    /// Subscribe to all future events.
    pub fn subscribe(&self) -> broadcast::Receiver<RepositoryEvent> {
        self.tx.subscribe()
    }
}

impl EventSink for EventBroadcaster {
    fn publish(&self, event: RepositoryEvent) {
        // Ignore errors, no subscribers is fine
        let _ = self.tx.send(event);
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::model::RepoKind;

    fn sample_repo() -> Repository {
        Repository::new("p-1", "api", "https://example.com/api.git", RepoKind::Server)
    }

    #[test]
    fn publish_without_subscribers_is_fine() {
        let broadcaster = EventBroadcaster::new();
        broadcaster.publish(RepositoryEvent::added(sample_repo()));
    }

    #[tokio::test]
    async fn subscribers_receive_published_events() {
        let broadcaster = EventBroadcaster::new();
        let mut rx_a = broadcaster.subscribe();
        let mut rx_b = broadcaster.subscribe();

        let repo = sample_repo();
        broadcaster.publish(RepositoryEvent::updated(repo.clone()));

        let got_a = rx_a.recv().await.unwrap();
        let got_b = rx_b.recv().await.unwrap();
        assert_eq!(got_a.event, RepositoryEventKind::Updated);
        assert_eq!(got_a.repository.id, repo.id);
        assert_eq!(got_b.repository.id, repo.id);
    }

    #[test]
    fn event_serializes_with_wire_names() {
        let repo = sample_repo();
        let json = serde_json::to_value(RepositoryEvent::added(repo.clone())).unwrap();
        assert_eq!(json["event"], "repository:added");
        assert_eq!(json["projectId"], repo.project_id);
        assert_eq!(json["repository"]["id"], repo.id);
    }
}
