use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// HTTP settings shared by every connector.
///
/// The request timeout is always set; a hung vendor call fails with an
/// execution error instead of blocking forever.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpSettings {
    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// User-Agent header sent with each request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_user_agent() -> String {
    concat!("rev-connectors/", env!("CARGO_PKG_VERSION")).to_string()
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

impl HttpSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Build a reqwest client honoring these settings
    pub fn build_client(&self) -> Result<reqwest::Client> {
        if self.timeout_secs == 0 {
            return Err(Error::Configuration(
                "timeout_secs must be greater than zero".to_string(),
            ));
        }
        reqwest::Client::builder()
            .user_agent(&self.user_agent)
            .timeout(self.timeout())
            .build()
            .map_err(|e| Error::Configuration(format!("Failed to build HTTP client: {}", e)))
    }
}

/// Send a request, mapping transport failures and non-success statuses to
/// [`Error::Execution`] with the response body as cause.
pub async fn send(request: reqwest::RequestBuilder, context: &str) -> Result<reqwest::Response> {
    let response = request
        .send()
        .await
        .map_err(|e| Error::execution(context, e))?;

    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(Error::http_status(context, status.as_u16(), &body))
}

/// Send a request and decode a JSON body.
pub async fn send_json<T: serde::de::DeserializeOwned>(
    request: reqwest::RequestBuilder,
    context: &str,
) -> Result<T> {
    send(request, context)
        .await?
        .json::<T>()
        .await
        .map_err(|e| Error::execution(context, e))
}

/// Send a request and return the body as text.
pub async fn send_text(request: reqwest::RequestBuilder, context: &str) -> Result<String> {
    send(request, context)
        .await?
        .text()
        .await
        .map_err(|e| Error::execution(context, e))
}
