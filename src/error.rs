use thiserror::Error;

/// Errors raised by the dashboard core and its collaborators.
///
/// Every variant is scoped to the interaction that triggered it; nothing
/// here is fatal to the server process.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DashboardError {
    #[error("Unknown waste category: {0}")]
    UnknownCategory(String),

    #[error("Invalid quantity: {0} (must be a finite, non-negative number of kg)")]
    InvalidQuantity(f64),

    #[error("Malformed record: {0}")]
    MalformedRecord(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("{0}")]
    InvalidInput(String),
}

impl From<std::io::Error> for DashboardError {
    fn from(err: std::io::Error) -> Self {
        DashboardError::Store(err.to_string())
    }
}

impl From<serde_json::Error> for DashboardError {
    fn from(err: serde_json::Error) -> Self {
        DashboardError::Store(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, DashboardError>;
