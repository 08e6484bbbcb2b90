use crate::client::{
    combine_chunks, CollectionOperation, CollectionRequest, IngestJob, IngestOperation,
    SalesforceClient,
};
use crate::config::SalesforceConfig;
use crate::soql;
use async_trait::async_trait;
use rev_core::reconcile::{combine_partitions, submit_in_batches};
use rev_core::{
    Connector, Error, Outcome, QueryMethod, Record, Result, Table, WriteMode, WriteRequest,
};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use tracing::info;

/// CRM connector over a [`SalesforceClient`]
pub struct SalesforceConnector {
    client: Option<Box<dyn SalesforceClient>>,
    output_dir: Option<PathBuf>,
}

/// Write operation, resolved to its REST and bulk forms
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriteKind {
    Create,
    Update,
    Upsert,
    Delete,
}

impl SalesforceConnector {
    pub fn new() -> Self {
        Self {
            client: None,
            output_dir: None,
        }
    }

    pub fn from_config(config: &SalesforceConfig) -> Self {
        Self {
            client: None,
            output_dir: config.output_dir.clone(),
        }
    }

    pub fn with_client(mut self, client: Box<dyn SalesforceClient>) -> Self {
        self.client = Some(client);
        self
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }

    pub fn set_client(&mut self, client: Box<dyn SalesforceClient>) {
        self.client = Some(client);
    }

    fn client(&self) -> Result<&dyn SalesforceClient> {
        self.client
            .as_deref()
            .ok_or_else(|| Error::no_client("Salesforce"))
    }

    async fn write(&self, request: WriteRequest, kind: WriteKind) -> Result<Table> {
        let client = self.client()?;
        request.validate()?;

        match request.options.mode {
            WriteMode::Rest => self.write_rest(client, request, kind).await,
            WriteMode::Bulk => self.write_bulk(client, request, kind).await,
        }
    }

    async fn write_rest(
        &self,
        client: &dyn SalesforceClient,
        request: WriteRequest,
        kind: WriteKind,
    ) -> Result<Table> {
        let operation = match kind {
            WriteKind::Create => CollectionOperation::Insert,
            WriteKind::Update => CollectionOperation::Update,
            WriteKind::Upsert => CollectionOperation::Upsert {
                external_id_field: request.options.require_upsert_key()?.to_string(),
            },
            WriteKind::Delete => CollectionOperation::Delete,
        };

        if operation == CollectionOperation::Delete {
            // Reject before the first call so no batch is half-applied
            CollectionRequest {
                entity: request.entity.clone(),
                operation: operation.clone(),
                all_or_none: request.options.all_or_none,
                records: request.records.records()?,
            }
            .ids()?;
        }

        let entity = request.entity.as_str();
        let all_or_none = request.options.all_or_none;
        let result = submit_in_batches(&request.records, request.options.batch_size, |_, batch| {
            let call = CollectionRequest {
                entity: entity.to_string(),
                operation: operation.clone(),
                all_or_none,
                records: batch,
            };
            async move { client.submit_collection(&call).await }
        })
        .await?;

        info!(
            "Composite {} of {} {} records complete",
            operation.as_str(),
            result.len(),
            entity
        );
        Ok(result)
    }

    async fn write_bulk(
        &self,
        client: &dyn SalesforceClient,
        request: WriteRequest,
        kind: WriteKind,
    ) -> Result<Table> {
        let (operation, external_id_field) = match kind {
            WriteKind::Create => (IngestOperation::Insert, None),
            WriteKind::Update => (IngestOperation::Update, None),
            WriteKind::Upsert => (
                IngestOperation::Upsert,
                Some(request.options.require_upsert_key()?.to_string()),
            ),
            WriteKind::Delete => (IngestOperation::Delete, None),
        };

        if request.records.is_empty() {
            info!("No records to submit to {}, skipping bulk job", request.entity);
            return Ok(Table::new(request.records.columns()));
        }

        let job = IngestJob {
            entity: request.entity.clone(),
            operation,
            external_id_field,
            csv: request.records.to_csv_string()?,
        };
        let context = format!("Bulk {} of {} failed", job.operation.as_str(), job.entity);
        let info = client.run_ingest_job(&job).await?.ensure_complete(&context)?;

        let mut partitions = Vec::with_capacity(Outcome::ALL.len());
        for outcome in Outcome::ALL {
            let text = client.ingest_results(&info.id, outcome).await?;
            partitions.push((outcome, Table::from_csv_str(&text)?));
        }
        let combined = combine_partitions(partitions)?;
        info!("Bulk job {} reconciled: {} rows", info.id, combined.len());

        match &self.output_dir {
            Some(dir) => {
                let path = dir.join(format!("{}_combined.csv", info.id));
                write_table(dir, &path, &combined)?;
                manifest(vec![json!({
                    "job_id": info.id,
                    "path": path.display().to_string(),
                    "rows": combined.len(),
                })])
            }
            None => Ok(combined),
        }
    }

    async fn read_bulk(&self, client: &dyn SalesforceClient, query: &str) -> Result<Table> {
        soql::sobject_name(query)?;

        if let Some(dir) = &self.output_dir {
            let chunks = client.bulk_query_chunks(query).await?;
            std::fs::create_dir_all(dir)?;
            let mut entries = Vec::with_capacity(chunks.len());
            for (i, chunk) in chunks.iter().enumerate() {
                let part = i + 1;
                let path = dir.join(format!("part-{}.csv", part));
                std::fs::write(&path, chunk)?;
                entries.push(json!({
                    "part": part,
                    "path": path.display().to_string(),
                    "rows": Table::from_csv_str(chunk)?.len(),
                }));
            }
            info!("Wrote {} bulk query part(s) to {}", entries.len(), dir.display());
            return manifest(entries);
        }

        let chunks = client.bulk_query_chunks(query).await?;
        let table = combine_chunks(&chunks)?;
        info!("Bulk query returned {} rows in {} chunk(s)", table.len(), chunks.len());
        if table.columns().is_empty() {
            return Ok(declared_schema(query, false));
        }
        Ok(table)
    }
}

impl Default for SalesforceConnector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Connector for SalesforceConnector {
    fn name(&self) -> &str {
        "salesforce"
    }

    async fn create(&self, request: WriteRequest) -> Result<Table> {
        self.write(request, WriteKind::Create).await
    }

    async fn read(&self, query: &str, method: QueryMethod) -> Result<Table> {
        let client = self.client()?;

        match method {
            QueryMethod::Rest => {
                let records = client.query(query, QueryMethod::Rest).await?;
                if records.is_empty() {
                    return Ok(declared_schema(query, true));
                }
                Table::from_records(records.into_iter().map(lift_attributes).collect())
            }
            QueryMethod::Bulk => self.read_bulk(client, query).await,
        }
    }

    async fn update(&self, request: WriteRequest) -> Result<Table> {
        self.write(request, WriteKind::Update).await
    }

    async fn upsert(&self, request: WriteRequest) -> Result<Table> {
        self.write(request, WriteKind::Upsert).await
    }

    async fn delete(&self, request: WriteRequest) -> Result<Table> {
        self.write(request, WriteKind::Delete).await
    }
}

/// Replace the `attributes` struct with `sf_type` and `sf_url` columns.
fn lift_attributes(mut record: Record) -> Record {
    if let Some(attributes) = record.remove("attributes") {
        record.insert(
            "sf_type".to_string(),
            attributes.get("type").cloned().unwrap_or(Value::Null),
        );
        record.insert(
            "sf_url".to_string(),
            attributes.get("url").cloned().unwrap_or(Value::Null),
        );
    }
    record
}

/// Empty table carrying the columns the query selects.
fn declared_schema(query: &str, with_attributes: bool) -> Table {
    match soql::select_fields(query) {
        Some(mut fields) => {
            if with_attributes {
                fields.push("sf_type".to_string());
                fields.push("sf_url".to_string());
            }
            Table::new(fields)
        }
        None => Table::empty(),
    }
}

fn manifest(entries: Vec<Value>) -> Result<Table> {
    Table::from_values(entries)
}

fn write_table(dir: &Path, path: &Path, table: &Table) -> Result<()> {
    std::fs::create_dir_all(dir)?;
    table.write_csv_path(path)?;
    info!("Wrote {} rows to {}", table.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lift_attributes() {
        let record = json!({
            "attributes": {"type": "Contact", "url": "/services/data/v60.0/sobjects/Contact/003A"},
            "Id": "003A",
            "Name": "Ada"
        })
        .as_object()
        .cloned()
        .unwrap();

        let table = Table::from_records(vec![lift_attributes(record)]).unwrap();
        assert_eq!(table.columns(), ["Id", "Name", "sf_type", "sf_url"]);
        assert_eq!(table.get(0, "sf_type"), Some(json!("Contact")));
    }

    #[test]
    fn test_declared_schema() {
        let table = declared_schema("SELECT Id, Name FROM Contact", true);
        assert_eq!(table.columns(), ["Id", "Name", "sf_type", "sf_url"]);
        assert!(table.is_empty());

        let table = declared_schema("SELECT Id FROM Contact", false);
        assert_eq!(table.columns(), ["Id"]);

        assert!(declared_schema("not soql", true).columns().is_empty());
    }

    #[tokio::test]
    async fn test_operations_without_client_fail_with_configuration_error() {
        let connector = SalesforceConnector::new();
        let request = WriteRequest::new("Account", Table::empty());

        assert!(matches!(
            connector.create(request.clone()).await,
            Err(Error::Configuration(_))
        ));
        assert!(matches!(
            connector.read("SELECT Id FROM Account", QueryMethod::Rest).await,
            Err(Error::Configuration(_))
        ));
        assert!(matches!(
            connector.delete(request).await,
            Err(Error::Configuration(_))
        ));
    }
}
