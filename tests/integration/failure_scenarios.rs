//! Failure isolation tests
//!
//! One broken connection must never affect another, and no runtime failure
//! may crash the engine.

use std::sync::Arc;
use std::time::Duration;

use kpi_sync::adapters::{AdapterKind, build_adapter};
use kpi_sync::config::Registry;
use kpi_sync::sync::supervisor::Supervisor;
use kpi_sync::sync::worker::{StatusMap, WorkerHandle};
use kpi_sync::update::QuantityStore;
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::helpers::*;

#[tokio::test]
async fn unreachable_endpoint_leaves_current_value_untouched() {
    let (store, updater, notifier) = seeded_engine(vec![integer_quantity("q-1", "7")]).await;

    let registry = Registry {
        connections: vec![json_path_connection(
            "broken",
            "http://127.0.0.1:1/stats",
            "q-1",
            "$.v",
        )],
    };

    let mut supervisor = Supervisor::new(updater, notifier);
    supervisor.start(&registry).await;

    tokio::time::sleep(Duration::from_millis(500)).await;

    let quantity = store.load_quantity("q-1").await.unwrap().unwrap();
    assert_eq!(quantity.current_value, "7");
    assert!(store.history("q-1").await.unwrap().is_empty());

    let statuses = supervisor.statuses().await;
    assert!(!statuses["broken"].healthy);

    supervisor.shutdown().await;
}

#[tokio::test]
async fn failing_connection_does_not_affect_healthy_one() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/good"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"v": 5})))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/bad"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let (store, updater, notifier) = seeded_engine(vec![
        integer_quantity("q-good", "0"),
        integer_quantity("q-bad", "0"),
    ])
    .await;
    let statuses = StatusMap::default();

    // Long interval so only the spawn tick and the manual polls count
    let mut good_config =
        json_path_connection("good", &format!("{}/good", server.uri()), "q-good", "$.v");
    good_config.polling_period_seconds = 3600;
    let mut bad_config =
        json_path_connection("bad", &format!("{}/bad", server.uri()), "q-bad", "$.v");
    bad_config.polling_period_seconds = 3600;

    let good = WorkerHandle::spawn(
        good_config,
        build_adapter(AdapterKind::JsonPath),
        updater.clone(),
        notifier.clone(),
        statuses.clone(),
    );
    let bad = WorkerHandle::spawn(
        bad_config,
        build_adapter(AdapterKind::JsonPath),
        updater,
        notifier,
        statuses.clone(),
    );

    // Drive ten deterministic tick cycles on each connection
    for _ in 0..10 {
        assert!(bad.poll_now().await.is_err());
        good.poll_now().await.unwrap();
    }

    // The healthy connection applied every cycle...
    let healthy = store.load_quantity("q-good").await.unwrap().unwrap();
    assert_eq!(healthy.current_value, "5");
    // ...the spawn tick plus ten manual polls
    assert_eq!(store.history("q-good").await.unwrap().len(), 11);

    // The failing one never touched its quantity
    let broken = store.load_quantity("q-bad").await.unwrap().unwrap();
    assert_eq!(broken.current_value, "0");
    assert!(store.history("q-bad").await.unwrap().is_empty());

    let statuses = statuses.read().await;
    assert!(statuses["good"].healthy);
    assert!(!statuses["bad"].healthy);
    drop(statuses);

    good.shutdown().await;
    bad.shutdown().await;
}

#[tokio::test]
async fn unknown_adapter_type_does_not_stop_other_connections() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"v": 5})))
        .mount(&server)
        .await;

    let (store, updater, notifier) = seeded_engine(vec![integer_quantity("q-1", "0")]).await;

    let mut bogus = json_path_connection("bogus", &server.uri(), "q-1", "$.v");
    bogus.kind = "carrier-pigeon".to_string();

    let registry = Registry {
        connections: vec![
            bogus,
            json_path_connection("good", &server.uri(), "q-1", "$.v"),
        ],
    };

    let mut supervisor = Supervisor::new(updater, notifier);
    supervisor.start(&registry).await;

    tokio::time::sleep(Duration::from_millis(500)).await;

    assert!(supervisor.is_running("good"));
    assert!(!supervisor.is_running("bogus"));

    let quantity = store.load_quantity("q-1").await.unwrap().unwrap();
    assert_eq!(quantity.current_value, "5");

    supervisor.shutdown().await;
}

#[tokio::test]
async fn missing_target_quantity_is_isolated() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"v": 5})))
        .mount(&server)
        .await;

    // Store deliberately left empty
    let (store, updater, notifier) = seeded_engine(vec![]).await;
    let statuses = StatusMap::default();

    let handle = WorkerHandle::spawn(
        json_path_connection("orders", &server.uri(), "q-missing", "$.v"),
        build_adapter(AdapterKind::JsonPath),
        Arc::clone(&updater),
        notifier,
        statuses.clone(),
    );

    assert!(handle.poll_now().await.is_err());
    assert!(store.history("q-missing").await.unwrap().is_empty());

    let statuses = statuses.read().await;
    assert!(!statuses["orders"].healthy);
    assert!(
        statuses["orders"]
            .message
            .as_deref()
            .unwrap()
            .contains("not found")
    );
    drop(statuses);

    handle.shutdown().await;
}

#[tokio::test]
async fn malformed_response_is_isolated() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{invalid json"))
        .mount(&server)
        .await;

    let (store, updater, notifier) = seeded_engine(vec![integer_quantity("q-1", "7")]).await;
    let statuses = StatusMap::default();

    let handle = WorkerHandle::spawn(
        json_path_connection("orders", &server.uri(), "q-1", "$.v"),
        build_adapter(AdapterKind::JsonPath),
        updater,
        notifier,
        statuses,
    );

    assert!(handle.poll_now().await.is_err());

    let quantity = store.load_quantity("q-1").await.unwrap().unwrap();
    assert_eq!(quantity.current_value, "7");

    handle.shutdown().await;
}
