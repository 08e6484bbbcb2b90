use async_trait::async_trait;
use rev_core::{Error, Outcome, QueryMethod, Record, Result, Table};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Capability set of a Salesforce session.
///
/// `query` is the one operation every client must provide. Write and bulk
/// operations default to [`Error::Unsupported`] so a read-only adapter stays
/// a one-method impl.
#[async_trait]
pub trait SalesforceClient: Send + Sync {
    /// Execute a SOQL query and return its records
    async fn query(&self, soql: &str, method: QueryMethod) -> Result<Vec<Record>>;

    /// Send one sObject collection call; one result entry per submitted record, in order
    async fn submit_collection(&self, request: &CollectionRequest) -> Result<Vec<Value>> {
        Err(Error::Unsupported(format!(
            "collection {} on {}",
            request.operation.as_str(),
            request.entity
        )))
    }

    /// Create a Bulk API ingest job, upload its CSV and wait for a terminal state
    async fn run_ingest_job(&self, job: &IngestJob) -> Result<JobInfo> {
        Err(Error::Unsupported(format!(
            "bulk {} on {}",
            job.operation.as_str(),
            job.entity
        )))
    }

    /// Fetch one result partition of a finished ingest job as CSV text
    async fn ingest_results(&self, job_id: &str, outcome: Outcome) -> Result<String> {
        Err(Error::Unsupported(format!(
            "{} results for job {}",
            outcome, job_id
        )))
    }

    /// Run a bulk query job and return its result chunks as CSV text, in order
    async fn bulk_query_chunks(&self, soql: &str) -> Result<Vec<String>> {
        Err(Error::Unsupported(format!("bulk query chunks for '{}'", soql)))
    }
}

/// sObject collection operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollectionOperation {
    Insert,
    Update,
    Upsert { external_id_field: String },
    Delete,
}

impl CollectionOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            CollectionOperation::Insert => "insert",
            CollectionOperation::Update => "update",
            CollectionOperation::Upsert { .. } => "upsert",
            CollectionOperation::Delete => "delete",
        }
    }
}

/// One batch of records for the composite sObject collections endpoint
#[derive(Debug, Clone)]
pub struct CollectionRequest {
    pub entity: String,
    pub operation: CollectionOperation,
    pub all_or_none: bool,
    pub records: Vec<Record>,
}

impl CollectionRequest {
    /// Request body `{allOrNone, records}` with every record tagged by its
    /// sObject type. Null cells are left out so blank input leaves the field unchanged.
    pub fn body(&self) -> Value {
        let records: Vec<Value> = self
            .records
            .iter()
            .map(|record| {
                let mut tagged = Record::with_capacity(record.len() + 1);
                tagged.insert("attributes".to_string(), json!({ "type": self.entity }));
                for (key, value) in record {
                    if key != "attributes" && !value.is_null() {
                        tagged.insert(key.clone(), value.clone());
                    }
                }
                Value::Object(tagged)
            })
            .collect();

        json!({
            "allOrNone": self.all_or_none,
            "records": records,
        })
    }

    /// Record ids for delete calls, read from `Id` (or `id`)
    pub fn ids(&self) -> Result<Vec<String>> {
        self.records
            .iter()
            .enumerate()
            .map(|(i, record)| {
                record
                    .get("Id")
                    .or_else(|| record.get("id"))
                    .and_then(Value::as_str)
                    .filter(|id| !id.is_empty())
                    .map(str::to_string)
                    .ok_or_else(|| {
                        Error::Validation(format!("record {} has no Id to delete", i))
                    })
            })
            .collect()
    }
}

/// Bulk API 2.0 ingest operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IngestOperation {
    Insert,
    Update,
    Upsert,
    Delete,
}

impl IngestOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            IngestOperation::Insert => "insert",
            IngestOperation::Update => "update",
            IngestOperation::Upsert => "upsert",
            IngestOperation::Delete => "delete",
        }
    }
}

/// A bulk ingest submission: the whole record set as one CSV upload
#[derive(Debug, Clone)]
pub struct IngestJob {
    pub entity: String,
    pub operation: IngestOperation,
    pub external_id_field: Option<String>,
    pub csv: String,
}

/// State of a Bulk API 2.0 job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobState {
    Open,
    UploadComplete,
    InProgress,
    JobComplete,
    Aborted,
    Failed,
    #[serde(other)]
    Unknown,
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::JobComplete | JobState::Aborted | JobState::Failed)
    }
}

/// Job status as reported by the Bulk API
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobInfo {
    pub id: String,
    pub state: JobState,
    #[serde(default)]
    pub number_records_processed: Option<u64>,
    #[serde(default)]
    pub number_records_failed: Option<u64>,
    #[serde(default)]
    pub error_message: Option<String>,
}

impl JobInfo {
    /// Pass the job through when it reached `JobComplete`; any other state is
    /// an execution error carrying the vendor's message.
    pub fn ensure_complete(self, context: &str) -> Result<Self> {
        if self.state == JobState::JobComplete {
            return Ok(self);
        }
        Err(Error::execution(
            context,
            format!(
                "job {} ended in state {:?}: {}",
                self.id,
                self.state,
                self.error_message.as_deref().unwrap_or("no message")
            ),
        ))
    }
}

/// Bulk query result chunks as one table, in chunk order.
pub fn combine_chunks(chunks: &[String]) -> Result<Table> {
    let tables = chunks
        .iter()
        .map(|chunk| Table::from_csv_str(chunk))
        .collect::<Result<Vec<Table>>>()?;
    Table::concat_diagonal(tables)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(value: Value) -> Record {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_body_tags_records_with_type() {
        let request = CollectionRequest {
            entity: "Contact".to_string(),
            operation: CollectionOperation::Insert,
            all_or_none: true,
            records: vec![
                record(json!({"LastName": "Smith"})),
                record(json!({"LastName": "Jones"})),
            ],
        };

        let body = request.body();
        assert_eq!(body["allOrNone"], json!(true));
        assert_eq!(body["records"][0]["attributes"]["type"], json!("Contact"));
        assert_eq!(body["records"][1]["LastName"], json!("Jones"));
    }

    #[test]
    fn test_body_leaves_out_null_cells() {
        let request = CollectionRequest {
            entity: "Contact".to_string(),
            operation: CollectionOperation::Update,
            all_or_none: false,
            records: vec![record(json!({
                "Id": "003A",
                "Phone": null,
                "Email": "new@example.com"
            }))],
        };

        let body = request.body();
        let sent = body["records"][0].as_object().unwrap();
        assert!(!sent.contains_key("Phone"));
        assert_eq!(sent["Email"], json!("new@example.com"));
        assert_eq!(sent["Id"], json!("003A"));
    }

    #[test]
    fn test_ids_require_every_record() {
        let mut request = CollectionRequest {
            entity: "Contact".to_string(),
            operation: CollectionOperation::Delete,
            all_or_none: false,
            records: vec![record(json!({"Id": "003A"})), record(json!({"id": "003B"}))],
        };
        assert_eq!(request.ids().unwrap(), vec!["003A", "003B"]);

        request.records.push(record(json!({"Name": "no id"})));
        assert!(matches!(request.ids(), Err(Error::Validation(_))));
    }

    #[test]
    fn test_job_info_parse() {
        let info: JobInfo = serde_json::from_value(json!({
            "id": "750R0000000zlh9IAA",
            "state": "JobComplete",
            "numberRecordsProcessed": 4,
            "numberRecordsFailed": 1,
            "object": "Account"
        }))
        .unwrap();
        assert_eq!(info.state, JobState::JobComplete);
        assert!(info.state.is_terminal());
        assert_eq!(info.number_records_failed, Some(1));

        let info: JobInfo =
            serde_json::from_value(json!({"id": "750", "state": "Queued"})).unwrap();
        assert_eq!(info.state, JobState::Unknown);
        assert!(!info.state.is_terminal());
    }

    #[test]
    fn test_ensure_complete() {
        let info: JobInfo =
            serde_json::from_value(json!({"id": "750A", "state": "JobComplete"})).unwrap();
        assert_eq!(info.ensure_complete("bulk insert").unwrap().id, "750A");

        let info: JobInfo = serde_json::from_value(json!({
            "id": "750B",
            "state": "Failed",
            "errorMessage": "InvalidBatch : Field name not found : Foo"
        }))
        .unwrap();
        let err = info.ensure_complete("bulk insert").unwrap_err();
        assert!(matches!(err, Error::Execution { .. }));
        assert!(err.to_string().contains("InvalidBatch"));
    }

    #[test]
    fn test_combine_chunks_in_order() {
        let chunks = vec![
            "\"Id\",\"Name\"\n\"003A\",\"Ada\"\n".to_string(),
            "\"Id\",\"Name\"\n\"003B\",\"Grace\"\n\"003C\",\"\"\n".to_string(),
        ];
        let table = combine_chunks(&chunks).unwrap();

        assert_eq!(table.len(), 3);
        assert_eq!(table.columns(), &["Id", "Name"]);
        assert_eq!(
            table.column_values("Id"),
            vec![json!("003A"), json!("003B"), json!("003C")]
        );
        assert!(combine_chunks(&[]).unwrap().columns().is_empty());
    }
}
