//! HTTP Client Integration Tests
//!
//! Starts a real proxy HTTP server on a random port, backed by the scripted
//! in-memory database, and drives it through `SqlrouteClient`:
//! - Reads and writes with each strategy
//! - 503 / 502 / 422 error mapping
//! - Health and metrics endpoints

use serde_json::json;
use sqlroute_client::SqlrouteClient;
use sqlroute_common::{
    DbCredentials, NodeAddr, QueryResult, SqlrouteError, Strategy, TopologyConfig,
};
use sqlroute_proxy::testing::{NodeScript, ScriptedConnector};
use sqlroute_proxy::{HttpServer, QueryHandler};
use std::sync::Arc;
use tokio::net::TcpListener;

/// Serves a proxy on `127.0.0.1:0` and returns its base URL.
async fn start_proxy(workers: &[&str], connector: &ScriptedConnector) -> String {
    let config = TopologyConfig {
        manager: NodeAddr::new("m", 3306),
        workers: workers.iter().map(|w| NodeAddr::new(*w, 3306)).collect(),
        listen_port: 0,
        connect_timeout_ms: 5000,
        query_timeout_ms: 30000,
    };
    let handler = QueryHandler::with_connector(
        &config,
        DbCredentials::new("app", "password", "sakila"),
        Arc::new(connector.clone()),
    );

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(HttpServer::new(Arc::new(handler)).serve(listener));

    format!("http://{}", addr)
}

#[tokio::test]
async fn test_direct_read() {
    let connector = ScriptedConnector::new()
        .with_node("m:3306", NodeScript::new().with_rows(&["cnt"], vec![vec![json!(1000)]]));
    let client = SqlrouteClient::new(start_proxy(&["w1"], &connector).await);

    let response = client
        .query("SELECT COUNT(*) AS cnt FROM film", Strategy::Direct)
        .await
        .unwrap();

    assert_eq!(response.target, "manager");
    assert_eq!(
        response.result,
        QueryResult::read(vec!["cnt".to_string()], vec![vec![json!(1000)]])
    );
}

#[tokio::test]
async fn test_random_write_goes_to_manager() {
    let connector =
        ScriptedConnector::new().with_node("m:3306", NodeScript::new().with_affected(1));
    let client = SqlrouteClient::new(start_proxy(&["w1", "w2"], &connector).await);
    let sql = "INSERT INTO actor (first_name, last_name) VALUES ('ANA', 'LIMA')";

    let response = client.query(sql, Strategy::Random).await.unwrap();

    assert_eq!(response.target, "manager");
    assert_eq!(response.result, QueryResult::write(1));
    assert_eq!(connector.statements_for("m:3306"), vec![sql.to_string()]);
    assert!(connector.statements_for("w1:3306").is_empty());
    assert!(connector.statements_for("w2:3306").is_empty());
}

#[tokio::test]
async fn test_random_read_goes_to_worker() {
    let connector = ScriptedConnector::new().with_node(
        "w1:3306",
        NodeScript::new().with_rows(&["title"], vec![vec![json!("ALIEN CENTER")]]),
    );
    let client = SqlrouteClient::new(start_proxy(&["w1"], &connector).await);

    let response = client
        .query("SELECT title FROM film WHERE film_id = 15", Strategy::Random)
        .await
        .unwrap();

    assert_eq!(response.target, "worker(random) w1");
}

#[tokio::test]
async fn test_no_workers_is_503() {
    let client = SqlrouteClient::new(start_proxy(&[], &ScriptedConnector::new()).await);

    let err = client.query("SELECT 1", Strategy::Custom).await.unwrap_err();

    match err {
        SqlrouteError::Http { status, detail } => {
            assert_eq!(status, 503);
            assert_eq!(detail, "No workers available for READ");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_database_error_is_502() {
    let connector = ScriptedConnector::new().with_node(
        "m:3306",
        NodeScript::new().failing("Table 'sakila.nope' doesn't exist"),
    );
    let client = SqlrouteClient::new(start_proxy(&[], &connector).await);

    let err = client.query("SELECT * FROM nope", Strategy::Direct).await.unwrap_err();

    match err {
        SqlrouteError::Http { status, detail } => {
            assert_eq!(status, 502);
            assert_eq!(detail, "MySQL error: Table 'sakila.nope' doesn't exist");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_bad_input_is_422() {
    let connector = ScriptedConnector::new();
    let base_url = start_proxy(&["w1"], &connector).await;
    let http = reqwest::Client::new();

    let response = http
        .post(format!("{}/query?strategy=fastest", base_url))
        .json(&json!({"sql": "SELECT 1"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 422);
    let body: serde_json::Value = response.json().await.unwrap();
    assert!(body["detail"].as_str().unwrap().contains("fastest"));

    let response = http
        .post(format!("{}/query", base_url))
        .header("content-type", "application/json")
        .body(r#"{"query": "SELECT 1"}"#)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 422);

    assert_eq!(connector.total_connections(), 0);
}

#[tokio::test]
async fn test_health_and_metrics() {
    let connector = ScriptedConnector::new();
    let client = SqlrouteClient::new(start_proxy(&["w1", "w2"], &connector).await);

    let health = client.health().await.unwrap();
    assert_eq!(health.manager, NodeAddr::new("m", 3306));
    assert_eq!(
        health.workers,
        vec![NodeAddr::new("w1", 3306), NodeAddr::new("w2", 3306)]
    );
    assert_eq!(health.db_user, "app");
    assert_eq!(health.db_name, "sakila");

    client.query("SELECT 1", Strategy::Direct).await.unwrap();
    let metrics = client.metrics().await.unwrap();
    assert_eq!(metrics["total_queries"], 1);
    assert_eq!(metrics["nodes"]["m:3306"]["request_count"], 1);
}

#[tokio::test]
async fn test_concurrent_queries() {
    let connector = ScriptedConnector::new();
    let client = SqlrouteClient::new(start_proxy(&["w1", "w2", "w3"], &connector).await);

    let queries = (0..20).map(|i| {
        let client = client.clone();
        async move {
            let strategy = if i % 2 == 0 { Strategy::Random } else { Strategy::Direct };
            client.query(format!("SELECT {}", i), strategy).await
        }
    });
    let results = futures::future::join_all(queries).await;

    assert!(results.iter().all(|r| r.is_ok()));
    assert_eq!(connector.open_connections(), 0);
}
