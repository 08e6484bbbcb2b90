use crate::{HttpStripeClient, StripeConfig, StripeConnector};
use async_trait::async_trait;
use rev_core::{Connector, ConnectorFactory, Result};
use serde_json::Value;

pub struct StripeConnectorFactory;

#[async_trait]
impl ConnectorFactory for StripeConnectorFactory {
    fn name(&self) -> &str {
        "stripe"
    }

    async fn create(&self, config: Value) -> Result<Box<dyn Connector>> {
        let config: StripeConfig = serde_json::from_value(config)?;
        let client = HttpStripeClient::new(&config)?;
        Ok(Box::new(StripeConnector::new().with_client(Box::new(client))))
    }
}
