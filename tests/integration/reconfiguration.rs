//! Live reconfiguration tests
//!
//! Enable/disable/edit of one connection must never disturb the others, and
//! a stopped connection must produce zero further updates.

use std::time::Duration;

use kpi_sync::config::Registry;
use kpi_sync::sync::supervisor::Supervisor;
use kpi_sync::update::QuantityStore;
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::helpers::*;

#[tokio::test]
async fn disabling_stops_updates_for_that_quantity_only() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/a"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"v": 1})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/b"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"v": 2})))
        .mount(&server)
        .await;

    let (store, updater, notifier) = seeded_engine(vec![
        integer_quantity("q-a", "0"),
        integer_quantity("q-b", "0"),
    ])
    .await;

    let connection_a = json_path_connection("a", &format!("{}/a", server.uri()), "q-a", "$.v");
    let connection_b = json_path_connection("b", &format!("{}/b", server.uri()), "q-b", "$.v");

    let registry = Registry {
        connections: vec![connection_a.clone(), connection_b],
    };

    let mut supervisor = Supervisor::new(updater, notifier);
    supervisor.start(&registry).await;

    tokio::time::sleep(Duration::from_millis(300)).await;

    let mut disabled = connection_a;
    disabled.enable = false;
    supervisor.on_connection_changed(&disabled).await;

    // Zero further update calls for q-a once the stop has returned
    let frozen = store.history("q-a").await.unwrap().len();

    tokio::time::sleep(Duration::from_millis(2500)).await;

    assert_eq!(store.history("q-a").await.unwrap().len(), frozen);

    // The sibling connection kept polling the whole time
    assert!(store.history("q-b").await.unwrap().len() >= 2);
    assert_eq!(
        store.load_quantity("q-b").await.unwrap().unwrap().current_value,
        "2"
    );

    supervisor.shutdown().await;
}

#[tokio::test]
async fn reenabled_connection_fetches_immediately() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"v": 9})))
        .mount(&server)
        .await;

    let (store, updater, notifier) = seeded_engine(vec![integer_quantity("q-1", "0")]).await;

    let mut connection = json_path_connection("orders", &server.uri(), "q-1", "$.v");
    // Long interval: any update visible shortly after enable comes from the
    // immediate start-up fetch, not a later tick
    connection.polling_period_seconds = 3600;
    connection.enable = false;

    let registry = Registry {
        connections: vec![connection.clone()],
    };

    let mut supervisor = Supervisor::new(updater, notifier);
    supervisor.start(&registry).await;
    assert!(!supervisor.is_running("orders"));

    connection.enable = true;
    supervisor.on_connection_changed(&connection).await;
    assert!(supervisor.is_running("orders"));

    tokio::time::sleep(Duration::from_millis(500)).await;

    assert_eq!(
        store.load_quantity("q-1").await.unwrap().unwrap().current_value,
        "9"
    );

    supervisor.shutdown().await;
}

#[tokio::test]
async fn edited_connection_picks_up_new_configuration() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/old"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"v": 1})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/new"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"v": 2})))
        .mount(&server)
        .await;

    let (store, updater, notifier) = seeded_engine(vec![integer_quantity("q-1", "0")]).await;

    let mut connection =
        json_path_connection("orders", &format!("{}/old", server.uri()), "q-1", "$.v");
    connection.polling_period_seconds = 3600;

    let registry = Registry {
        connections: vec![connection.clone()],
    };

    let mut supervisor = Supervisor::new(updater, notifier);
    supervisor.start(&registry).await;
    tokio::time::sleep(Duration::from_millis(300)).await;

    assert_eq!(
        store.load_quantity("q-1").await.unwrap().unwrap().current_value,
        "1"
    );

    connection.url = format!("{}/new", server.uri());
    supervisor.on_connection_changed(&connection).await;
    tokio::time::sleep(Duration::from_millis(300)).await;

    assert_eq!(
        store.load_quantity("q-1").await.unwrap().unwrap().current_value,
        "2"
    );

    supervisor.shutdown().await;
}

#[tokio::test]
async fn shutdown_stops_every_connection() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"v": 1})))
        .mount(&server)
        .await;

    let (store, updater, notifier) = seeded_engine(vec![
        integer_quantity("q-a", "0"),
        integer_quantity("q-b", "0"),
    ])
    .await;

    let registry = Registry {
        connections: vec![
            json_path_connection("a", &server.uri(), "q-a", "$.v"),
            json_path_connection("b", &server.uri(), "q-b", "$.v"),
        ],
    };

    let mut supervisor = Supervisor::new(updater, notifier);
    supervisor.start(&registry).await;
    tokio::time::sleep(Duration::from_millis(300)).await;

    supervisor.shutdown().await;

    let frozen_a = store.history("q-a").await.unwrap().len();
    let frozen_b = store.history("q-b").await.unwrap().len();

    tokio::time::sleep(Duration::from_millis(2500)).await;

    assert_eq!(store.history("q-a").await.unwrap().len(), frozen_a);
    assert_eq!(store.history("q-b").await.unwrap().len(), frozen_b);
    assert!(supervisor.running_connections().is_empty());
}
