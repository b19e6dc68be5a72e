//! Project/repository dependency graph with externally indexed status.
//!
//! Repositories live in projects and point at each other through directed
//! dependency edges. An external HTTP indexing service decides whether a
//! repository's code search index is ready; the [`orchestrator`] keeps each
//! repository's status in step with that service and the edges around it,
//! and every committed change fans out through [`events`].

pub mod config;
pub mod events;
pub mod graph;
pub mod indexer;
pub mod observability;
pub mod orchestrator;
pub mod retry;
pub mod validation;

// Re-export the types nearly every embedder touches.
pub use events::{EventBroadcaster, RepositoryEvent};
pub use graph::model::{Project, RepoKind, RepoStatus, Repository};
pub use orchestrator::{SharedOrchestrator, StatusOrchestrator};

use std::sync::Arc;

use config::ServiceConfig;
use graph::store::{GraphStore, SharedGraphStore};
use indexer::client::HttpIndexerClient;

/// Fully wired service state, cheap to clone and hand to handlers.
#[derive(Clone)]
pub struct Service {
    pub config: Arc<ServiceConfig>,
    pub store: SharedGraphStore,
    pub broadcaster: EventBroadcaster,
    pub orchestrator: SharedOrchestrator,
}

impl Service {
    /// Wire the stock stack from config: in-memory graph store, broadcast
    /// events, HTTP indexer client.
    ///
    /// Fails only if the HTTP client cannot be constructed.
    pub fn from_config(config: ServiceConfig) -> anyhow::Result<Self> {
        let store: SharedGraphStore = Arc::new(GraphStore::new());
        let broadcaster = EventBroadcaster::new();
        let indexer = Arc::new(HttpIndexerClient::from_config(&config)?);
        let orchestrator = Arc::new(StatusOrchestrator::new(
            Arc::clone(&store),
            indexer,
            Arc::new(broadcaster.clone()),
        ));
        Ok(Self {
            config: Arc::new(config),
            store,
            broadcaster,
            orchestrator,
        })
    }

    /// Subscribe to repository lifecycle events.
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<RepositoryEvent> {
        self.broadcaster.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_config_wires_the_default_stack() {
        let service = Service::from_config(ServiceConfig::default()).unwrap();
        // A fresh subscriber proves the broadcaster the orchestrator publishes
        // to is the same one handed out here.
        let _rx = service.subscribe();
        assert_eq!(service.config.max_attempts, 3);
    }
}
