pub mod error;
pub mod requests;
pub mod responses;


pub use error::{Result, SqlrouteError};
pub use requests::{OperationKind, QueryParams, QueryRequest, Strategy};
pub use responses::{ErrorResponse, HealthResponse, QueryResponse, QueryResult, Row};
