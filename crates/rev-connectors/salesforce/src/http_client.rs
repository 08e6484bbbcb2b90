use crate::client::{
    combine_chunks, CollectionOperation, CollectionRequest, IngestJob, JobInfo, SalesforceClient,
};
use crate::config::{SalesforceConfig, SalesforceCredentials};
use crate::soql;
use async_trait::async_trait;
use reqwest::header::{HeaderValue, CONTENT_TYPE};
use rev_core::http::{send, send_json, send_text};
use rev_core::{Error, Outcome, QueryMethod, Record, Result};
use serde::Deserialize;
use serde_json::{json, Value};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info};

const LOCATOR_HEADER: &str = "Sforce-Locator";

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    instance_url: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryResponse {
    #[serde(default)]
    records: Vec<Record>,
    #[serde(default = "default_done")]
    done: bool,
    #[serde(default)]
    next_records_url: Option<String>,
}

fn default_done() -> bool {
    true
}

/// Salesforce session over REST and Bulk API 2.0, backed by reqwest
pub struct HttpSalesforceClient {
    http: reqwest::Client,
    instance_url: String,
    access_token: String,
    api_version: String,
    poll_interval: Duration,
    max_poll_attempts: u32,
}

impl HttpSalesforceClient {
    /// Open a session from configuration.
    ///
    /// Uses `instance_url` + `access_token` when both are given, otherwise
    /// performs an OAuth 2.0 username-password login.
    pub async fn connect(config: &SalesforceConfig) -> Result<Self> {
        let http = config.http.build_client()?;
        let creds = &config.credentials;

        let (instance_url, access_token) = match (&creds.instance_url, &creds.access_token) {
            (Some(url), Some(token)) => {
                info!("Using supplied Salesforce session for {}", url);
                (url.clone(), token.clone())
            }
            _ => {
                let token = Self::login(&http, creds).await?;
                info!("Logged in to Salesforce instance {}", token.instance_url);
                (token.instance_url, token.access_token)
            }
        };

        Ok(Self {
            http,
            instance_url: instance_url.trim_end_matches('/').to_string(),
            access_token,
            api_version: config.api_version.trim_start_matches('v').to_string(),
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            max_poll_attempts: config.max_poll_attempts,
        })
    }

    async fn login(http: &reqwest::Client, creds: &SalesforceCredentials) -> Result<TokenResponse> {
        let missing = |field: &str| {
            Error::Configuration(format!("Salesforce credentials are missing '{}'", field))
        };
        let username = creds.username.as_deref().ok_or_else(|| missing("username"))?;
        let password = creds.password.as_deref().ok_or_else(|| missing("password"))?;
        let client_id = creds.oauth_key.as_deref().ok_or_else(|| missing("oauth_key"))?;
        let client_secret = creds
            .oauth_secret
            .as_deref()
            .ok_or_else(|| missing("oauth_secret"))?;

        let url = format!("https://{}.salesforce.com/services/oauth2/token", creds.domain);
        let secret = format!("{}{}", password, creds.security_token.as_deref().unwrap_or(""));
        let form = [
            ("grant_type", "password"),
            ("client_id", client_id),
            ("client_secret", client_secret),
            ("username", username),
            ("password", secret.as_str()),
        ];

        send_json(http.post(&url).form(&form), "Salesforce login failed").await
    }

    fn data_url(&self, path: &str) -> String {
        format!(
            "{}/services/data/v{}/{}",
            self.instance_url,
            self.api_version,
            path.trim_start_matches('/')
        )
    }

    fn get(&self, url: &str) -> reqwest::RequestBuilder {
        self.http.get(url).bearer_auth(&self.access_token)
    }

    fn request(&self, method: reqwest::Method, url: &str) -> reqwest::RequestBuilder {
        self.http.request(method, url).bearer_auth(&self.access_token)
    }

    async fn query_all(&self, soql: &str) -> Result<Vec<Record>> {
        let context = "Failed to execute rest query";
        let first = self.get(&self.data_url("query")).query(&[("q", soql)]);
        let page: QueryResponse = send_json(first, context).await?;

        let records = collect_pages(page, |next| {
            debug!("Fetching next query page {}", next);
            let request = self.get(&format!("{}{}", self.instance_url, next));
            async move { send_json(request, context).await }
        })
        .await?;

        debug!("REST query returned {} records", records.len());
        Ok(records)
    }

    async fn wait_for_job(&self, kind: &str, job_id: &str) -> Result<JobInfo> {
        let url = self.data_url(&format!("jobs/{}/{}", kind, job_id));
        let context = format!("Failed to poll {} job {}", kind, job_id);

        poll_until_terminal(
            self.max_poll_attempts,
            self.poll_interval,
            &context,
            |attempt| {
                let request = self.get(&url);
                let context = context.clone();
                async move {
                    let info: JobInfo = send_json(request, &context).await?;
                    debug!("Job {} state {:?} (poll {})", info.id, info.state, attempt);
                    Ok(info)
                }
            },
        )
        .await
    }
}

/// Records of a query response plus every page reached through `nextRecordsUrl`.
async fn collect_pages<F, Fut>(mut page: QueryResponse, mut fetch_next: F) -> Result<Vec<Record>>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<QueryResponse>>,
{
    let mut records = std::mem::take(&mut page.records);
    while !page.done {
        let Some(next) = page.next_records_url.take() else {
            break;
        };
        page = fetch_next(next).await?;
        records.append(&mut page.records);
    }
    Ok(records)
}

/// Fetch job status until it is terminal, sleeping `interval` between polls.
/// Running out of attempts is an execution error.
async fn poll_until_terminal<F, Fut>(
    max_attempts: u32,
    interval: Duration,
    context: &str,
    mut fetch: F,
) -> Result<JobInfo>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<JobInfo>>,
{
    for attempt in 1..=max_attempts {
        let info = fetch(attempt).await?;
        if info.state.is_terminal() {
            return Ok(info);
        }
        tokio::time::sleep(interval).await;
    }

    Err(Error::execution(
        context,
        format!("job did not finish after {} polls", max_attempts),
    ))
}

/// Locator for the next result chunk; absent, empty or `"null"` ends the stream.
fn next_locator(header: Option<&str>) -> Option<String> {
    header
        .map(str::trim)
        .filter(|v| !v.is_empty() && *v != "null")
        .map(str::to_string)
}

#[async_trait]
impl SalesforceClient for HttpSalesforceClient {
    async fn query(&self, soql: &str, method: QueryMethod) -> Result<Vec<Record>> {
        match method {
            QueryMethod::Rest => self.query_all(soql).await,
            QueryMethod::Bulk => {
                soql::sobject_name(soql)?;
                let chunks = self.bulk_query_chunks(soql).await?;
                combine_chunks(&chunks)?.records()
            }
        }
    }

    async fn submit_collection(&self, request: &CollectionRequest) -> Result<Vec<Value>> {
        let context = format!(
            "Composite {} of {} {} records failed",
            request.operation.as_str(),
            request.records.len(),
            request.entity
        );

        let builder = match &request.operation {
            CollectionOperation::Insert => self
                .request(reqwest::Method::POST, &self.data_url("composite/sobjects"))
                .json(&request.body()),
            CollectionOperation::Update => self
                .request(reqwest::Method::PATCH, &self.data_url("composite/sobjects"))
                .json(&request.body()),
            CollectionOperation::Upsert { external_id_field } => {
                let path = format!("composite/sobjects/{}/{}", request.entity, external_id_field);
                self.request(reqwest::Method::PATCH, &self.data_url(&path))
                    .json(&request.body())
            }
            CollectionOperation::Delete => {
                let ids = request.ids()?.join(",");
                self.request(reqwest::Method::DELETE, &self.data_url("composite/sobjects"))
                    .query(&[
                        ("ids", ids.as_str()),
                        ("allOrNone", if request.all_or_none { "true" } else { "false" }),
                    ])
            }
        };

        send_json(builder, &context).await
    }

    async fn run_ingest_job(&self, job: &IngestJob) -> Result<JobInfo> {
        let context = format!("Bulk {} into {} failed", job.operation.as_str(), job.entity);

        let mut job_spec = json!({
            "object": job.entity,
            "operation": job.operation,
            "contentType": "CSV",
            "lineEnding": "LF",
        });
        if let Some(field) = &job.external_id_field {
            job_spec["externalIdFieldName"] = json!(field);
        }

        let created: JobInfo = send_json(
            self.request(reqwest::Method::POST, &self.data_url("jobs/ingest"))
                .json(&job_spec),
            &context,
        )
        .await?;
        info!(
            "Created bulk ingest job {} ({} {})",
            created.id,
            job.operation.as_str(),
            job.entity
        );

        send(
            self.request(
                reqwest::Method::PUT,
                &self.data_url(&format!("jobs/ingest/{}/batches", created.id)),
            )
            .header(CONTENT_TYPE, HeaderValue::from_static("text/csv"))
            .body(job.csv.clone()),
            &context,
        )
        .await?;

        send(
            self.request(
                reqwest::Method::PATCH,
                &self.data_url(&format!("jobs/ingest/{}", created.id)),
            )
            .json(&json!({ "state": "UploadComplete" })),
            &context,
        )
        .await?;

        self.wait_for_job("ingest", &created.id)
            .await?
            .ensure_complete(&context)
    }

    async fn ingest_results(&self, job_id: &str, outcome: Outcome) -> Result<String> {
        let partition = match outcome {
            Outcome::Success => "successfulResults",
            Outcome::Failed => "failedResults",
            Outcome::Unprocessed => "unprocessedrecords",
        };
        let url = self.data_url(&format!("jobs/ingest/{}/{}/", job_id, partition));
        let context = format!("Failed to fetch {} results of job {}", outcome, job_id);
        send_text(self.get(&url), &context).await
    }

    async fn bulk_query_chunks(&self, soql: &str) -> Result<Vec<String>> {
        let context = "Failed to execute bulk query";
        let created: JobInfo = send_json(
            self.request(reqwest::Method::POST, &self.data_url("jobs/query"))
                .json(&json!({ "operation": "query", "query": soql })),
            context,
        )
        .await?;
        info!("Created bulk query job {}", created.id);

        self.wait_for_job("query", &created.id)
            .await?
            .ensure_complete(context)?;

        let url = self.data_url(&format!("jobs/query/{}/results", created.id));
        let mut chunks = Vec::new();
        let mut locator: Option<String> = None;
        loop {
            let mut builder = self.get(&url);
            if let Some(loc) = &locator {
                builder = builder.query(&[("locator", loc.as_str())]);
            }
            let response = send(builder, context).await?;
            let next = next_locator(
                response
                    .headers()
                    .get(LOCATOR_HEADER)
                    .and_then(|v| v.to_str().ok()),
            );
            let body = response
                .text()
                .await
                .map_err(|e| Error::execution(context, e))?;
            chunks.push(body);

            match next {
                Some(loc) => locator = Some(loc),
                None => break,
            }
        }

        info!("Bulk query job {} returned {} chunk(s)", created.id, chunks.len());
        Ok(chunks)
    }
}
