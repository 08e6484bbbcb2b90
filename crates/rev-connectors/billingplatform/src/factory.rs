use crate::{BillingPlatformConfig, BillingPlatformConnector, HttpBillingPlatformClient};
use async_trait::async_trait;
use rev_core::{Connector, ConnectorFactory, Result};
use serde_json::Value;

pub struct BillingPlatformConnectorFactory;

#[async_trait]
impl ConnectorFactory for BillingPlatformConnectorFactory {
    fn name(&self) -> &str {
        "billingplatform"
    }

    async fn create(&self, config: Value) -> Result<Box<dyn Connector>> {
        let config: BillingPlatformConfig = serde_json::from_value(config)?;
        let client = HttpBillingPlatformClient::connect(&config).await?;
        Ok(Box::new(
            BillingPlatformConnector::new().with_client(Box::new(client)),
        ))
    }
}
