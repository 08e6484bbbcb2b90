use crate::{ChuckConfig, ChuckConnector, HttpChuckClient};
use async_trait::async_trait;
use rev_core::{Connector, ConnectorFactory, Result};
use serde_json::Value;

pub struct ChuckConnectorFactory;

#[async_trait]
impl ConnectorFactory for ChuckConnectorFactory {
    fn name(&self) -> &str {
        "chuck"
    }

    async fn create(&self, config: Value) -> Result<Box<dyn Connector>> {
        let config: ChuckConfig = if config.is_null() {
            ChuckConfig::default()
        } else {
            serde_json::from_value(config)?
        };
        let client = HttpChuckClient::new(&config.base_url, &config.http)?;
        Ok(Box::new(ChuckConnector::new().with_client(Box::new(client))))
    }
}
