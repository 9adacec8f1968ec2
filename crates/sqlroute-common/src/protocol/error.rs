use thiserror::Error;

#[derive(Error, Debug)]
pub enum SqlrouteError {
    #[error("No workers available for READ")]
    NoWorkersAvailable,

    #[error("Database unavailable: {0}")]
    DatabaseUnavailable(String),

    #[error("Query execution failed: {0}")]
    QueryExecutionFailed(String),

    #[error("Invalid strategy '{0}': expected one of direct, random, custom")]
    InvalidStrategy(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("HTTP {status}: {detail}")]
    Http { status: u16, detail: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl SqlrouteError {
    /// HTTP status code the proxy answers with for this error.
    pub fn http_status(&self) -> u16 {
        match self {
            SqlrouteError::NoWorkersAvailable => 503,
            SqlrouteError::DatabaseUnavailable(_) | SqlrouteError::QueryExecutionFailed(_) => 502,
            SqlrouteError::InvalidStrategy(_) => 422,
            SqlrouteError::Http { status, .. } => *status,
            _ => 500,
        }
    }

    /// Human-readable `detail` field of the HTTP error body.
    ///
    /// Database failures keep the engine message verbatim behind a
    /// `MySQL error:` prefix.
    pub fn detail(&self) -> String {
        match self {
            SqlrouteError::DatabaseUnavailable(msg) | SqlrouteError::QueryExecutionFailed(msg) => {
                format!("MySQL error: {}", msg)
            }
            SqlrouteError::Http { detail, .. } => detail.clone(),
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SqlrouteError>;
