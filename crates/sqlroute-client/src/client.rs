use reqwest::{Response, StatusCode};
use serde_json::Value;
use sqlroute_common::{
    ErrorResponse, HealthResponse, QueryRequest, QueryResponse, Result, SqlrouteError, Strategy,
};

/// HTTP client for a running sqlroute proxy.
///
/// Cheap to clone; clones share the underlying connection pool.
#[derive(Debug, Clone)]
pub struct SqlrouteClient {
    base_url: String,
    http: reqwest::Client,
}

impl SqlrouteClient {
    /// Creates a client for the proxy at `base_url` (e.g. `http://127.0.0.1:8080`).
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            http: reqwest::Client::new(),
        }
    }

    /// Sends `sql` to `POST /query` with the given routing strategy.
    ///
    /// Non-2xx answers become `SqlrouteError::Http` carrying the status and
    /// the proxy's `detail` message.
    pub async fn query(&self, sql: impl Into<String>, strategy: Strategy) -> Result<QueryResponse> {
        let response = self
            .http
            .post(format!("{}/query", self.base_url))
            .query(&[("strategy", strategy.as_str())])
            .json(&QueryRequest::new(sql))
            .send()
            .await
            .map_err(transport_error)?;

        parse(response).await
    }

    pub async fn health(&self) -> Result<HealthResponse> {
        let response = self
            .http
            .get(format!("{}/health", self.base_url))
            .send()
            .await
            .map_err(transport_error)?;

        parse(response).await
    }

    /// Raw metrics snapshot.
    pub async fn metrics(&self) -> Result<Value> {
        let response = self
            .http
            .get(format!("{}/metrics", self.base_url))
            .send()
            .await
            .map_err(transport_error)?;

        parse(response).await
    }
}

fn transport_error(err: reqwest::Error) -> SqlrouteError {
    SqlrouteError::Transport(err.to_string())
}

async fn parse<T: serde::de::DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status();
    let body = response.text().await.map_err(transport_error)?;

    if !status.is_success() {
        return Err(SqlrouteError::Http {
            status: status.as_u16(),
            detail: error_detail(status, &body),
        });
    }

    serde_json::from_str(&body).map_err(|e| {
        SqlrouteError::InvalidResponse(format!("Unexpected response body ({}): {}", e, body))
    })
}

/// `detail` from an error body, or the raw body if it isn't one.
fn error_detail(status: StatusCode, body: &str) -> String {
    match serde_json::from_str::<ErrorResponse>(body) {
        Ok(error) => error.detail,
        Err(_) if body.is_empty() => status.to_string(),
        Err(_) => body.to_string(),
    }
}
