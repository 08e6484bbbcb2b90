use async_trait::async_trait;
use rev_core::http::send_json;
use rev_core::{HttpSettings, Result};
use serde_json::Value;

/// Fetches JSON from the joke API
#[async_trait]
pub trait ChuckClient: Send + Sync {
    /// `GET <base>/<path>` with query parameters
    async fn get(&self, path: &str, params: &[(&str, &str)]) -> Result<Value>;
}

pub struct HttpChuckClient {
    http: reqwest::Client,
    base_url: String,
}

impl HttpChuckClient {
    pub fn new(base_url: &str, settings: &HttpSettings) -> Result<Self> {
        Ok(Self {
            http: settings.build_client()?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl ChuckClient for HttpChuckClient {
    async fn get(&self, path: &str, params: &[(&str, &str)]) -> Result<Value> {
        let url = format!("{}/{}", self.base_url, path);
        send_json(
            self.http.get(&url).query(params),
            &format!("Joke API request to {} failed", path),
        )
        .await
    }
}
