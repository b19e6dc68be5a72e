//! End-to-end repository lifecycle over the full stack.
//! Real graph store, real event broadcaster, HTTP indexer client against a
//! wiremock server; assertions follow the broadcast stream event by event.

use std::sync::Arc;
use std::time::Duration;

use repograph::events::{EventBroadcaster, RepositoryEvent, RepositoryEventKind};
use repograph::graph::model::{RepoKind, RepoStatus};
use repograph::graph::store::GraphStore;
use repograph::indexer::client::HttpIndexerClient;
use repograph::orchestrator::StatusOrchestrator;
use repograph::retry::RetryConfig;
use tokio::sync::broadcast;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SERVER_URL: &str = "https://github.com/acme/billing-api";
const WEB_URL: &str = "https://github.com/acme/billing-web";

/// Orchestrator wired to `server`, plus a subscription opened before any
/// action so no event can be missed.
fn stack_for(server: &MockServer) -> (StatusOrchestrator, broadcast::Receiver<RepositoryEvent>) {
    let store = Arc::new(GraphStore::new());
    let broadcaster = EventBroadcaster::new();
    let rx = broadcaster.subscribe();
    let indexer = Arc::new(
        HttpIndexerClient::new(&server.uri(), Duration::from_secs(5), RetryConfig::instant())
            .unwrap(),
    );
    let orchestrator = StatusOrchestrator::new(store, indexer, Arc::new(broadcaster));
    (orchestrator, rx)
}

/// Receive the next event or panic; detached submissions finish well inside
/// the window.
async fn next_event(rx: &mut broadcast::Receiver<RepositoryEvent>) -> RepositoryEvent {
    tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("no event within 2s")
        .expect("event channel closed")
}

fn assert_event(event: &RepositoryEvent, kind: RepositoryEventKind, repo_id: &str, status: RepoStatus) {
    assert_eq!(event.event, kind);
    assert_eq!(event.repository.id, repo_id);
    assert_eq!(event.repository.status, status);
}

#[tokio::test]
async fn full_lifecycle_from_creation_to_reversion_and_back() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/add-repository"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let (orchestrator, mut rx) = stack_for(&server);
    let project = orchestrator.create_project("billing").await;

    // Server repos are born tracked and submitted right away.
    let api = orchestrator
        .create_repository(&project.id, "billing-api", SERVER_URL, RepoKind::Server)
        .await
        .unwrap();
    assert_eq!(api.status, RepoStatus::Pending);
    let e = next_event(&mut rx).await;
    assert_event(&e, RepositoryEventKind::Added, &api.id, RepoStatus::Pending);
    let e = next_event(&mut rx).await;
    assert_event(&e, RepositoryEventKind::Updated, &api.id, RepoStatus::Indexed);

    // Non-server repos start untracked and stay quiet.
    let web = orchestrator
        .create_repository(&project.id, "billing-web", WEB_URL, RepoKind::Web)
        .await
        .unwrap();
    assert_eq!(web.status, RepoStatus::Untracked);
    let e = next_event(&mut rx).await;
    assert_event(&e, RepositoryEventKind::Added, &web.id, RepoStatus::Untracked);

    // First incoming edge pulls the target into indexing.
    orchestrator
        .add_dependency(&api.id, &web.id)
        .await
        .unwrap();
    let e = next_event(&mut rx).await;
    assert_event(&e, RepositoryEventKind::Updated, &web.id, RepoStatus::Pending);
    let e = next_event(&mut rx).await;
    assert_event(&e, RepositoryEventKind::Updated, &web.id, RepoStatus::Indexed);

    // Re-adding the same edge changes nothing and submits nothing.
    orchestrator
        .add_dependency(&api.id, &web.id)
        .await
        .unwrap();

    // Dropping the last incoming edge reverts the target to untracked.
    orchestrator
        .remove_dependency(&api.id, &web.id)
        .await
        .unwrap();
    let e = next_event(&mut rx).await;
    assert_event(&e, RepositoryEventKind::Updated, &web.id, RepoStatus::Untracked);

    // A reverted repository goes through the whole cycle again.
    orchestrator
        .add_dependency(&api.id, &web.id)
        .await
        .unwrap();
    let e = next_event(&mut rx).await;
    assert_event(&e, RepositoryEventKind::Updated, &web.id, RepoStatus::Pending);
    let e = next_event(&mut rx).await;
    assert_event(&e, RepositoryEventKind::Updated, &web.id, RepoStatus::Indexed);

    // One submission each for: api at creation, web on first edge, web after
    // reversion. The duplicate edge added none.
    assert_eq!(server.received_requests().await.unwrap().len(), 3);

    let web_now = orchestrator.get_repository(&web.id).await.unwrap();
    assert_eq!(web_now.status, RepoStatus::Indexed);
}

#[tokio::test]
async fn persistent_service_outage_marks_the_repository_failed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/add-repository"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let (orchestrator, mut rx) = stack_for(&server);
    let project = orchestrator.create_project("billing").await;

    let api = orchestrator
        .create_repository(&project.id, "billing-api", SERVER_URL, RepoKind::Server)
        .await
        .unwrap();

    let e = next_event(&mut rx).await;
    assert_event(&e, RepositoryEventKind::Added, &api.id, RepoStatus::Pending);
    let e = next_event(&mut rx).await;
    assert_event(&e, RepositoryEventKind::Updated, &api.id, RepoStatus::Failed);

    // The whole try budget was spent against the outage.
    assert_eq!(server.received_requests().await.unwrap().len(), 3);
}

#[tokio::test]
async fn rejection_by_the_service_marks_the_repository_failed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/add-repository"))
        .respond_with(ResponseTemplate::new(400))
        .mount(&server)
        .await;

    let (orchestrator, mut rx) = stack_for(&server);
    let project = orchestrator.create_project("billing").await;

    let api = orchestrator
        .create_repository(&project.id, "billing-api", SERVER_URL, RepoKind::Server)
        .await
        .unwrap();

    let e = next_event(&mut rx).await;
    assert_event(&e, RepositoryEventKind::Added, &api.id, RepoStatus::Pending);
    let e = next_event(&mut rx).await;
    assert_event(&e, RepositoryEventKind::Updated, &api.id, RepoStatus::Failed);

    // Permanent rejections are not retried.
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
}
