use crate::client::{BillingPlatformClient, BrmOperation, BrmRequest};
use async_trait::async_trait;
use rev_core::reconcile::submit_in_batches;
use rev_core::{Connector, Error, QueryMethod, Result, Table, WriteMode, WriteRequest};
use tracing::info;

pub struct BillingPlatformConnector {
    client: Option<Box<dyn BillingPlatformClient>>,
}

impl BillingPlatformConnector {
    pub fn new() -> Self {
        Self { client: None }
    }

    pub fn with_client(mut self, client: Box<dyn BillingPlatformClient>) -> Self {
        self.client = Some(client);
        self
    }

    pub fn set_client(&mut self, client: Box<dyn BillingPlatformClient>) {
        self.client = Some(client);
    }

    fn client(&self) -> Result<&dyn BillingPlatformClient> {
        self.client
            .as_deref()
            .ok_or_else(|| Error::no_client("BillingPlatform"))
    }

    async fn write(&self, request: WriteRequest, operation: BrmOperation) -> Result<Table> {
        let client = self.client()?;
        request.validate()?;
        if request.options.mode == WriteMode::Bulk {
            return Err(Error::Unsupported(
                "BillingPlatform writes are REST only".to_string(),
            ));
        }

        if operation == BrmOperation::Delete {
            BrmRequest {
                entity: request.entity.clone(),
                operation: operation.clone(),
                records: request.records.records()?,
            }
            .ids()?;
        }

        let entity = request.entity.as_str();
        let result = submit_in_batches(&request.records, request.options.batch_size, |_, batch| {
            let call = BrmRequest {
                entity: entity.to_string(),
                operation: operation.clone(),
                records: batch,
            };
            async move { client.submit(&call).await }
        })
        .await?;

        info!(
            "BillingPlatform {} of {} {} records complete",
            operation.as_str(),
            result.len(),
            entity
        );
        Ok(result)
    }
}

impl Default for BillingPlatformConnector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Connector for BillingPlatformConnector {
    fn name(&self) -> &str {
        "billingplatform"
    }

    async fn create(&self, request: WriteRequest) -> Result<Table> {
        self.write(request, BrmOperation::Create).await
    }

    async fn read(&self, query: &str, method: QueryMethod) -> Result<Table> {
        let client = self.client()?;
        if method == QueryMethod::Bulk {
            return Err(Error::Unsupported(
                "BillingPlatform queries are REST only".to_string(),
            ));
        }
        Table::from_records(client.query(query).await?)
    }

    async fn update(&self, request: WriteRequest) -> Result<Table> {
        self.write(request, BrmOperation::Update).await
    }

    async fn upsert(&self, request: WriteRequest) -> Result<Table> {
        self.client()?;
        let external_id_field = request.options.require_upsert_key()?.to_string();
        self.write(request, BrmOperation::Upsert { external_id_field })
            .await
    }

    async fn delete(&self, request: WriteRequest) -> Result<Table> {
        self.write(request, BrmOperation::Delete).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_requires_client() {
        let connector = BillingPlatformConnector::new();
        assert!(matches!(
            connector.create(WriteRequest::new("ACCOUNT", Table::empty())).await,
            Err(Error::Configuration(_))
        ));
        assert!(matches!(
            connector.read("SELECT Id FROM ACCOUNT", QueryMethod::Rest).await,
            Err(Error::Configuration(_))
        ));
    }
}
