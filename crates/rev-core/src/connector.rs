use crate::{Error, Result, Table};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Trait for CRUD connectors over a vendor API
///
/// Every operation takes and returns a [`Table`]. Write operations return the
/// input rows annotated with the vendor's per-record outcome.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Connector type name (e.g. "salesforce")
    fn name(&self) -> &str;

    /// Submit new records
    async fn create(&self, request: WriteRequest) -> Result<Table>;

    /// Run a query; zero matches is an empty table, not an error
    async fn read(&self, query: &str, method: QueryMethod) -> Result<Table>;

    /// Modify existing records
    async fn update(&self, request: WriteRequest) -> Result<Table>;

    /// Insert or update records matched on `options.upsert_key`
    async fn upsert(&self, request: WriteRequest) -> Result<Table> {
        Err(Error::Unsupported(format!(
            "{} does not support upsert on '{}'",
            self.name(),
            request.entity
        )))
    }

    /// Remove records
    async fn delete(&self, request: WriteRequest) -> Result<Table>;
}

/// How a query is executed against the backing store
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryMethod {
    #[default]
    Rest,
    Bulk,
}

impl FromStr for QueryMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rest" => Ok(QueryMethod::Rest),
            "bulk" => Ok(QueryMethod::Bulk),
            other => Err(Error::Validation(format!(
                "Invalid query method: {}. Use 'rest' or 'bulk'",
                other
            ))),
        }
    }
}

impl fmt::Display for QueryMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryMethod::Rest => write!(f, "rest"),
            QueryMethod::Bulk => write!(f, "bulk"),
        }
    }
}

/// Transport used for write operations
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WriteMode {
    /// Batched composite REST calls, one per batch
    #[default]
    Rest,
    /// One bulk ingest job for the whole table
    Bulk,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WriteOptions {
    /// Maximum rows per REST call
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Field the vendor matches on for upserts
    #[serde(default)]
    pub upsert_key: Option<String>,

    /// Roll back the whole batch when any record fails
    #[serde(default)]
    pub all_or_none: bool,

    #[serde(default)]
    pub mode: WriteMode,
}

fn default_batch_size() -> usize {
    200
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            upsert_key: None,
            all_or_none: false,
            mode: WriteMode::Rest,
        }
    }
}

impl WriteOptions {
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(Error::Validation("batch size must be at least 1".to_string()));
        }
        if let Some(key) = &self.upsert_key {
            if key.trim().is_empty() {
                return Err(Error::Validation("upsert key must not be empty".to_string()));
            }
        }
        Ok(())
    }

    /// Upsert key, required for upsert operations
    pub fn require_upsert_key(&self) -> Result<&str> {
        self.upsert_key
            .as_deref()
            .ok_or_else(|| Error::Validation("upsert requires an upsert key".to_string()))
    }
}

/// Records to write to one target entity
#[derive(Debug, Clone)]
pub struct WriteRequest {
    pub entity: String,
    pub records: Table,
    pub options: WriteOptions,
}

impl WriteRequest {
    pub fn new(entity: impl Into<String>, records: Table) -> Self {
        Self {
            entity: entity.into(),
            records,
            options: WriteOptions::default(),
        }
    }

    pub fn with_options(mut self, options: WriteOptions) -> Self {
        self.options = options;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.entity.trim().is_empty() {
            return Err(Error::Validation("target entity name is empty".to_string()));
        }
        self.options.validate()
    }
}
