use crate::client::{
    login_session, query_rows, response_entries, BillingPlatformClient, BrmOperation, BrmRequest,
};
use crate::config::BillingPlatformConfig;
use async_trait::async_trait;
use rev_core::http::{send, send_json};
use rev_core::{Error, Record, Result};
use serde_json::Value;
use tracing::{debug, info};

const SESSION_HEADER: &str = "sessionid";

/// BillingPlatform REST session backed by reqwest
pub struct HttpBillingPlatformClient {
    http: reqwest::Client,
    rest_url: String,
    session_id: String,
}

impl HttpBillingPlatformClient {
    /// Log in and keep the returned session id for later calls
    pub async fn connect(config: &BillingPlatformConfig) -> Result<Self> {
        let http = config.http.build_client()?;
        let rest_url = config.rest_url();
        let context = "BillingPlatform login failed";

        let response = send(
            http.get(format!("{}/login", rest_url))
                .header("username", &config.username)
                .header("password", &config.password),
            context,
        )
        .await?;

        let header = response
            .headers()
            .get(SESSION_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let text = response
            .text()
            .await
            .map_err(|e| Error::execution(context, e))?;
        // Non-JSON bodies still allow the header fallback
        let body = serde_json::from_str(&text).unwrap_or(Value::Null);
        let session_id = login_session(&body, header.as_deref())?;

        info!("Opened BillingPlatform session at {}", rest_url);
        Ok(Self {
            http,
            rest_url,
            session_id,
        })
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        self.http
            .request(method, format!("{}/{}", self.rest_url, path))
            .header(SESSION_HEADER, &self.session_id)
    }
}

#[async_trait]
impl BillingPlatformClient for HttpBillingPlatformClient {
    async fn query(&self, sql: &str) -> Result<Vec<Record>> {
        let response: Value = send_json(
            self.request(reqwest::Method::GET, "query")
                .query(&[("sql", sql)]),
            "BillingPlatform query failed",
        )
        .await?;
        let rows = query_rows(response);
        debug!("BillingPlatform query returned {} rows", rows.len());
        Ok(rows)
    }

    async fn submit(&self, request: &BrmRequest) -> Result<Vec<Value>> {
        let context = format!(
            "BillingPlatform {} of {} {} records failed",
            request.operation.as_str(),
            request.records.len(),
            request.entity
        );

        let builder = match &request.operation {
            BrmOperation::Create => self.request(reqwest::Method::POST, &request.entity),
            BrmOperation::Update => self.request(reqwest::Method::PUT, &request.entity),
            BrmOperation::Upsert { .. } => {
                self.request(reqwest::Method::POST, &format!("upsert/{}", request.entity))
            }
            BrmOperation::Delete => {
                self.request(reqwest::Method::DELETE, &format!("delete/{}", request.entity))
            }
        };

        let response: Value = send_json(builder.json(&request.body()?), &context).await?;
        response_entries(response, &request.operation)
    }
}
