use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Boxed cause carried by [`Error::Execution`].
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Error, Debug)]
pub enum Error {
    /// No client attached, or connector settings are unusable
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Malformed query, method flag, entity name or write options
    #[error("Validation error: {0}")]
    Validation(String),

    /// The remote call failed; `source` is the transport or vendor error
    #[error("Execution error: {context}: {source}")]
    Execution {
        context: String,
        #[source]
        source: BoxError,
    },

    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Table error: {0}")]
    Polars(#[from] polars::prelude::PolarsError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Generic error: {0}")]
    Generic(#[from] anyhow::Error),
}

impl Error {
    /// Wrap a transport or vendor failure, keeping it as the error source.
    pub fn execution(context: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Error::Execution {
            context: context.into(),
            source: source.into(),
        }
    }

    /// Execution failure for a non-success HTTP status with the response body as cause.
    pub fn http_status(context: impl Into<String>, status: u16, body: &str) -> Self {
        let body = body.trim();
        let cause = if body.is_empty() {
            format!("HTTP {}", status)
        } else {
            format!("HTTP {}: {}", status, body)
        };
        Error::execution(context, cause)
    }

    pub fn no_client(connector: &str) -> Self {
        Error::Configuration(format!(
            "No {} client configured. Call set_client() first.",
            connector
        ))
    }
}
