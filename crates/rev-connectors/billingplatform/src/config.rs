use rev_core::HttpSettings;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Serialize, Deserialize)]
pub struct BillingPlatformConfig {
    /// Tenant URL, e.g. "https://acme.billingplatform.com/myorg"
    pub base_url: String,

    pub username: String,

    pub password: String,

    /// REST API version segment
    #[serde(default = "default_api_version")]
    pub api_version: String,

    #[serde(default)]
    pub http: HttpSettings,
}

fn default_api_version() -> String {
    "2.0".to_string()
}

impl BillingPlatformConfig {
    pub fn rest_url(&self) -> String {
        format!(
            "{}/rest/{}",
            self.base_url.trim_end_matches('/'),
            self.api_version
        )
    }
}

impl fmt::Debug for BillingPlatformConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BillingPlatformConfig")
            .field("base_url", &self.base_url)
            .field("username", &self.username)
            .field("password", &"***")
            .field("api_version", &self.api_version)
            .field("http", &self.http)
            .finish()
    }
}
