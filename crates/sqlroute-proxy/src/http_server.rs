//! HTTP Server for the Proxy
//!
//! This module exposes the [`QueryHandler`] over HTTP using axum:
//!
//! - `POST /query?strategy=direct|random|custom` with `{"sql": "..."}`
//! - `GET /health`
//! - `GET /metrics`
//!
//! Every failure is rendered as `{"detail": "..."}` with the status the
//! error maps to (503 no workers, 502 database errors, 422 bad input).

use axum::{
    extract::{rejection::JsonRejection, rejection::QueryRejection, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use sqlroute_common::{
    ErrorResponse, HealthResponse, QueryParams, QueryRequest, QueryResponse, SqlrouteError,
};
use sqlroute_metrics::MetricsSnapshot;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::handler::QueryHandler;

/// HTTP front end of the proxy.
pub struct HttpServer {
    handler: Arc<QueryHandler>,
}

impl HttpServer {
    pub fn new(handler: Arc<QueryHandler>) -> Self {
        Self { handler }
    }

    /// Builds the axum router with CORS and request tracing.
    pub fn router(&self) -> Router {
        Router::new()
            .route("/query", post(handle_query))
            .route("/health", get(health))
            .route("/metrics", get(metrics))
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive())
            .with_state(Arc::clone(&self.handler))
    }

    /// Serves on an already-bound listener until the server stops.
    pub async fn serve(self, listener: TcpListener) -> Result<(), SqlrouteError> {
        let local_addr = listener
            .local_addr()
            .map_err(|e| SqlrouteError::Transport(format!("Failed to get local addr: {}", e)))?;
        info!("sqlroute HTTP server listening on {}", local_addr);

        axum::serve(listener, self.router())
            .await
            .map_err(|e| SqlrouteError::Transport(format!("Server error: {}", e)))
    }

    /// Binds `addr` and serves.
    pub async fn run(self, addr: SocketAddr) -> Result<(), SqlrouteError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| SqlrouteError::Transport(format!("Failed to bind to {}: {}", addr, e)))?;
        self.serve(listener).await
    }
}

/// Error rendered as `{"detail": ...}`.
struct ApiError {
    status: StatusCode,
    detail: String,
}

impl ApiError {
    fn unprocessable(detail: String) -> Self {
        Self {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            detail,
        }
    }
}

impl From<SqlrouteError> for ApiError {
    fn from(err: SqlrouteError) -> Self {
        Self {
            status: StatusCode::from_u16(err.http_status())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            detail: err.detail(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorResponse::new(self.detail))).into_response()
    }
}

async fn handle_query(
    State(handler): State<Arc<QueryHandler>>,
    params: Result<Query<QueryParams>, QueryRejection>,
    body: Result<Json<QueryRequest>, JsonRejection>,
) -> Result<Json<QueryResponse>, ApiError> {
    let Query(params) = params.map_err(|e| ApiError::unprocessable(e.body_text()))?;
    let strategy = params.strategy()?;
    let Json(request) = body.map_err(|e| ApiError::unprocessable(e.body_text()))?;

    let response = handler.handle(&request.sql, strategy).await?;
    Ok(Json(response))
}

async fn health(State(handler): State<Arc<QueryHandler>>) -> Json<HealthResponse> {
    Json(handler.health())
}

async fn metrics(State(handler): State<Arc<QueryHandler>>) -> Json<MetricsSnapshot> {
    Json(handler.metrics())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{NodeScript, ScriptedConnector};
    use axum::body::Body;
    use axum::http::{header, Request};
    use serde_json::{json, Value};
    use sqlroute_common::{DbCredentials, TopologyConfig};
    use tower::util::ServiceExt;

    fn app(workers: &[&str], connector: &ScriptedConnector) -> Router {
        let workers: Vec<Value> = workers
            .iter()
            .map(|w| json!({"host": w, "port": 3306}))
            .collect();
        let config = TopologyConfig::from_json(
            &json!({"manager": {"host": "m", "port": 3306}, "workers": workers}).to_string(),
        )
        .unwrap();
        let handler = QueryHandler::with_connector(
            &config,
            DbCredentials::new("app", "secret", "sakila"),
            Arc::new(connector.clone()),
        );
        HttpServer::new(Arc::new(handler)).router()
    }

    fn post_query(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_direct_read() {
        let connector = ScriptedConnector::new()
            .with_node("m:3306", NodeScript::new().with_rows(&["cnt"], vec![vec![json!(1000)]]));

        let response = app(&["w1"], &connector)
            .oneshot(post_query(
                "/query?strategy=direct",
                r#"{"sql": "SELECT COUNT(*) AS cnt FROM film"}"#,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await,
            json!({
                "target": "manager",
                "operation": "read",
                "columns": ["cnt"],
                "rows": [[1000]],
                "count": 1
            })
        );
    }

    #[tokio::test]
    async fn test_strategy_defaults_to_direct() {
        let connector = ScriptedConnector::new();

        let response = app(&["w1"], &connector)
            .oneshot(post_query("/query", r#"{"sql": "SELECT 1"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["target"], "manager");
    }

    #[tokio::test]
    async fn test_random_write() {
        let connector =
            ScriptedConnector::new().with_node("m:3306", NodeScript::new().with_affected(1));

        let response = app(&["w1", "w2"], &connector)
            .oneshot(post_query(
                "/query?strategy=random",
                r#"{"sql": "INSERT INTO actor (first_name, last_name) VALUES ('ANA', 'LIMA')"}"#,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await,
            json!({"target": "manager", "operation": "write", "affected": 1})
        );
    }

    #[tokio::test]
    async fn test_no_workers_is_503() {
        let response = app(&[], &ScriptedConnector::new())
            .oneshot(post_query("/query?strategy=custom", r#"{"sql": "SELECT 1"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(
            body_json(response).await,
            json!({"detail": "No workers available for READ"})
        );
    }

    #[tokio::test]
    async fn test_database_error_is_502() {
        let connector = ScriptedConnector::new()
            .with_node("m:3306", NodeScript::new().failing("Unknown column 'x'"));

        let response = app(&[], &connector)
            .oneshot(post_query("/query", r#"{"sql": "SELECT x FROM film"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(
            body_json(response).await,
            json!({"detail": "MySQL error: Unknown column 'x'"})
        );
    }

    #[tokio::test]
    async fn test_unknown_strategy_is_422_before_routing() {
        let connector = ScriptedConnector::new();

        let response = app(&["w1"], &connector)
            .oneshot(post_query("/query?strategy=fastest", r#"{"sql": "SELECT 1"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body = body_json(response).await;
        assert!(body["detail"].as_str().unwrap().contains("fastest"));
        assert_eq!(connector.total_connections(), 0);
    }

    #[tokio::test]
    async fn test_malformed_body_is_422() {
        let response = app(&[], &ScriptedConnector::new())
            .oneshot(post_query("/query", r#"{"query": "SELECT 1"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body_json(response).await["detail"].is_string());
    }

    #[tokio::test]
    async fn test_health() {
        let response = app(&["w1", "w2"], &ScriptedConnector::new())
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await,
            json!({
                "manager": {"host": "m", "port": 3306},
                "workers": [{"host": "w1", "port": 3306}, {"host": "w2", "port": 3306}],
                "db_user": "app",
                "db_name": "sakila"
            })
        );
    }

    #[tokio::test]
    async fn test_metrics_endpoint() {
        let app = app(&[], &ScriptedConnector::new());

        app.clone()
            .oneshot(post_query("/query", r#"{"sql": "SELECT 1"}"#))
            .await
            .unwrap();
        let response = app
            .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["total_queries"], 1);
        assert_eq!(body["routes"]["direct/read"]["success_count"], 1);
    }
}
