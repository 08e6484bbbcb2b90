use crate::{HttpSalesforceClient, SalesforceConfig, SalesforceConnector};
use async_trait::async_trait;
use rev_core::{Connector, ConnectorFactory, Result};
use serde_json::Value;

pub struct SalesforceConnectorFactory;

#[async_trait]
impl ConnectorFactory for SalesforceConnectorFactory {
    fn name(&self) -> &str {
        "salesforce"
    }

    async fn create(&self, config: Value) -> Result<Box<dyn Connector>> {
        let config: SalesforceConfig = serde_json::from_value(config)?;
        let client = HttpSalesforceClient::connect(&config).await?;
        Ok(Box::new(
            SalesforceConnector::from_config(&config).with_client(Box::new(client)),
        ))
    }
}
