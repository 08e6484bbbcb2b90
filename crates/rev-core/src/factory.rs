use crate::{Connector, Result};
use async_trait::async_trait;
use serde_json::Value;

/// Factory trait for creating connectors
#[async_trait]
pub trait ConnectorFactory: Send + Sync {
    /// Get the name/type identifier for this connector
    fn name(&self) -> &str;

    /// Create a new connector instance from configuration.
    ///
    /// Credentials in `config` are consumed here to open the vendor session.
    async fn create(&self, config: Value) -> Result<Box<dyn Connector>>;
}
