use rev_core::HttpSettings;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Serialize, Deserialize)]
pub struct StripeConfig {
    /// Secret API key (`sk_live_...` / `sk_test_...`)
    pub secret_key: String,

    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Objects requested per list page (1..=100)
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    #[serde(default)]
    pub http: HttpSettings,
}

fn default_base_url() -> String {
    "https://api.stripe.com/v1".to_string()
}

fn default_page_size() -> u32 {
    100
}

impl fmt::Debug for StripeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StripeConfig")
            .field("secret_key", &"***")
            .field("base_url", &self.base_url)
            .field("page_size", &self.page_size)
            .field("http", &self.http)
            .finish()
    }
}
