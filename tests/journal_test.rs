use std::sync::Arc;

use gate::config::Settings;
use gate::connectors::{ConnectionRequest, Status};
use gate::events::EventBus;
use gate::gateway::{Gateway, GatewayConfig};
use gate::journal::Journal;
use gate::journal::sqlite::SqliteJournal;

fn default_gateway() -> Gateway {
    let events = EventBus::default();
    let registry = Settings::default().build_registry(&events).unwrap();
    Gateway::new(Arc::new(registry), events, GatewayConfig::default())
}

#[tokio::test]
async fn records_routed_results_in_order() {
    let gateway = default_gateway();
    let journal = SqliteJournal::in_memory().unwrap();

    let requests = [
        ConnectionRequest::new("A", "B", "swift"),
        ConnectionRequest::new("A", "B", "missing"),
    ];
    for request in &requests {
        let result = gateway.route(request).await;
        journal.record(request, &result).await.unwrap();
    }

    let entries = journal.recent(10).await.unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].result.status(), Status::Connected);
    assert_eq!(entries[1].result.reason(), Some("unknown_connector"));
    assert!(!entries[0].timestamp.is_empty());
}

#[tokio::test]
async fn persists_to_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("journal.db");
    let path_str = path.to_str().unwrap();
    let request = ConnectionRequest::new("src", "dst", "java");

    {
        let gateway = default_gateway();
        let journal = SqliteJournal::open(path_str).unwrap();
        let result = gateway.route(&request).await;
        journal.record(&request, &result).await.unwrap();
    }

    {
        let journal = SqliteJournal::open(path_str).unwrap();
        let entries = journal.recent(5).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].source, "src");
        assert_eq!(entries[0].destination, "dst");
        assert_eq!(entries[0].result.connector_name(), "java");
    }
}

#[tokio::test]
async fn recent_with_zero_limit_is_empty() {
    let journal = SqliteJournal::in_memory().unwrap();
    let request = ConnectionRequest::new("A", "B", "go");
    let result = default_gateway().route(&request).await;
    journal.record(&request, &result).await.unwrap();

    assert!(journal.recent(0).await.unwrap().is_empty());
}
