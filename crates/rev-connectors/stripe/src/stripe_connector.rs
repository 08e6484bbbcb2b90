use crate::client::StripeClient;
use crate::entity::StripeEntity;
use crate::form::form_fields;
use async_trait::async_trait;
use rev_core::reconcile::submit_in_batches;
use rev_core::{
    flatten_record, into_record, Connector, Error, QueryMethod, Record, Result, Table, WriteMode,
    WriteRequest,
};
use serde_json::{json, Value};
use tracing::{info, warn};

/// Nesting depth kept as dotted columns when reading
const FLATTEN_DEPTH: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriteKind {
    Create,
    Update,
    Delete,
}

pub struct StripeConnector {
    client: Option<Box<dyn StripeClient>>,
}

impl StripeConnector {
    pub fn new() -> Self {
        Self { client: None }
    }

    pub fn with_client(mut self, client: Box<dyn StripeClient>) -> Self {
        self.client = Some(client);
        self
    }

    pub fn set_client(&mut self, client: Box<dyn StripeClient>) {
        self.client = Some(client);
    }

    fn client(&self) -> Result<&dyn StripeClient> {
        self.client.as_deref().ok_or_else(|| Error::no_client("Stripe"))
    }

    /// Every object of `entity`, following `has_more` cursors
    pub async fn list_all(&self, entity: StripeEntity) -> Result<Vec<Value>> {
        let client = self.client()?;
        let mut objects = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let page = client.list_page(entity, cursor.as_deref()).await?;
            let next = page.last_id().map(str::to_string);
            let has_more = page.has_more;
            objects.extend(page.data);

            match next {
                Some(id) if has_more => cursor = Some(id),
                _ => break,
            }
        }

        info!("Listed {} Stripe {}", objects.len(), entity);
        Ok(objects)
    }

    async fn write(&self, request: WriteRequest, kind: WriteKind) -> Result<Table> {
        let client = self.client()?;
        request.validate()?;
        if request.options.mode == WriteMode::Bulk {
            return Err(Error::Unsupported(
                "Stripe has no bulk write API".to_string(),
            ));
        }
        let entity: StripeEntity = request.entity.parse()?;

        if kind != WriteKind::Create {
            if kind == WriteKind::Delete && !entity.deletable() {
                return Err(Error::Unsupported(format!("Stripe {} cannot be deleted", entity)));
            }
            for (i, record) in request.records.records()?.iter().enumerate() {
                if record_id(record).is_none() {
                    return Err(Error::Validation(format!("record {} has no id", i)));
                }
            }
        }

        // One call per record; a rejected record is reported, not fatal
        let result = submit_in_batches(&request.records, 1, |_, batch| async move {
            let mut outcomes = Vec::with_capacity(batch.len());
            for record in &batch {
                let id = record_id(record);
                let id = id.as_deref();
                let call = match kind {
                    WriteKind::Create => client.create(entity, &form_fields(record, &["id"])).await,
                    WriteKind::Update => {
                        client
                            .update(entity, id.unwrap_or_default(), &form_fields(record, &["id"]))
                            .await
                    }
                    WriteKind::Delete => client.delete(entity, id.unwrap_or_default()).await,
                };
                outcomes.push(outcome(call, id)?);
            }
            Ok(outcomes)
        })
        .await?;

        let failed = result
            .column_values("success")
            .into_iter()
            .filter(|v| *v == Value::Bool(false))
            .count();
        if failed > 0 {
            warn!("{} of {} Stripe {} writes failed", failed, result.len(), entity);
        }
        Ok(result)
    }
}

impl Default for StripeConnector {
    fn default() -> Self {
        Self::new()
    }
}

fn record_id(record: &Record) -> Option<String> {
    record
        .get("id")
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
}

/// Outcome fields for one call; vendor rejections become `success = false`
/// and keep the record's own id.
fn outcome(call: Result<Value>, record_id: Option<&str>) -> Result<Value> {
    match call {
        Ok(object) => Ok(json!({
            "id": object.get("id").cloned().unwrap_or(Value::Null),
            "success": true,
            "error": Value::Null,
        })),
        Err(err @ Error::Execution { .. }) => Ok(json!({
            "id": record_id,
            "success": false,
            "error": err.to_string(),
        })),
        Err(other) => Err(other),
    }
}

#[async_trait]
impl Connector for StripeConnector {
    fn name(&self) -> &str {
        "stripe"
    }

    async fn create(&self, request: WriteRequest) -> Result<Table> {
        self.write(request, WriteKind::Create).await
    }

    /// `query` names the entity to list, e.g. `customers`
    async fn read(&self, query: &str, method: QueryMethod) -> Result<Table> {
        self.client()?;
        if method == QueryMethod::Bulk {
            return Err(Error::Unsupported("Stripe has no bulk query API".to_string()));
        }
        let entity: StripeEntity = query.parse()?;
        let objects = self.list_all(entity).await?;
        let records = objects
            .into_iter()
            .map(|object| flatten_record(into_record(object), FLATTEN_DEPTH))
            .collect();
        Table::from_records(records)
    }

    async fn update(&self, request: WriteRequest) -> Result<Table> {
        self.write(request, WriteKind::Update).await
    }

    async fn delete(&self, request: WriteRequest) -> Result<Table> {
        self.write(request, WriteKind::Delete).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_fields() {
        let ok = outcome(Ok(json!({"id": "cus_1", "object": "customer"})), None).unwrap();
        assert_eq!(ok, json!({"id": "cus_1", "success": true, "error": null}));

        let rejection = Error::http_status(
            "Failed to update Stripe customers cus_9",
            400,
            "{\"error\":{\"message\":\"Invalid email\"}}",
        );
        let rejected = outcome(Err(rejection), Some("cus_9")).unwrap();
        assert_eq!(rejected["success"], json!(false));
        assert_eq!(rejected["id"], json!("cus_9"));
        assert!(rejected["error"].as_str().unwrap().contains("Invalid email"));

        assert!(outcome(Err(Error::Validation("bad".to_string())), None).is_err());
    }

    #[tokio::test]
    async fn test_requires_client() {
        let connector = StripeConnector::new();
        assert!(matches!(
            connector.read("customers", QueryMethod::Rest).await,
            Err(Error::Configuration(_))
        ));
    }
}
