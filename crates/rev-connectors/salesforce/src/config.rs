use rev_core::HttpSettings;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Salesforce login material, consumed once when the session is opened
#[derive(Clone, Serialize, Deserialize)]
pub struct SalesforceCredentials {
    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub password: Option<String>,

    /// Appended to the password for username-password logins
    #[serde(default)]
    pub security_token: Option<String>,

    /// Login host prefix: "login" for production, "test" for sandboxes
    #[serde(default = "default_domain")]
    pub domain: String,

    /// Connected app consumer key
    #[serde(default)]
    pub oauth_key: Option<String>,

    /// Connected app consumer secret
    #[serde(default)]
    pub oauth_secret: Option<String>,

    /// Pre-established session: instance URL
    #[serde(default)]
    pub instance_url: Option<String>,

    /// Pre-established session: bearer token
    #[serde(default)]
    pub access_token: Option<String>,
}

fn default_domain() -> String {
    "login".to_string()
}

impl Default for SalesforceCredentials {
    fn default() -> Self {
        Self {
            username: None,
            password: None,
            security_token: None,
            domain: default_domain(),
            oauth_key: None,
            oauth_secret: None,
            instance_url: None,
            access_token: None,
        }
    }
}

impl fmt::Debug for SalesforceCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |v: &Option<String>| v.as_ref().map(|_| "***");
        f.debug_struct("SalesforceCredentials")
            .field("username", &self.username)
            .field("password", &redact(&self.password))
            .field("security_token", &redact(&self.security_token))
            .field("domain", &self.domain)
            .field("oauth_key", &redact(&self.oauth_key))
            .field("oauth_secret", &redact(&self.oauth_secret))
            .field("instance_url", &self.instance_url)
            .field("access_token", &redact(&self.access_token))
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SalesforceConfig {
    #[serde(default)]
    pub credentials: SalesforceCredentials,

    /// REST API version, e.g. "60.0"
    #[serde(default = "default_api_version")]
    pub api_version: String,

    #[serde(default)]
    pub http: HttpSettings,

    /// Delay between bulk job status checks
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Bulk job status checks before giving up
    #[serde(default = "default_max_poll_attempts")]
    pub max_poll_attempts: u32,

    /// When set, bulk results are written here as CSV instead of returned
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
}

fn default_api_version() -> String {
    "60.0".to_string()
}

fn default_poll_interval_ms() -> u64 {
    2000
}

fn default_max_poll_attempts() -> u32 {
    300
}

impl Default for SalesforceConfig {
    fn default() -> Self {
        Self {
            credentials: SalesforceCredentials::default(),
            api_version: default_api_version(),
            http: HttpSettings::default(),
            poll_interval_ms: default_poll_interval_ms(),
            max_poll_attempts: default_max_poll_attempts(),
            output_dir: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_config_defaults_from_partial_json() {
        let config: SalesforceConfig = serde_json::from_value(json!({
            "credentials": {
                "username": "ops@example.com",
                "password": "hunter2",
                "security_token": "tok",
                "oauth_key": "key",
                "oauth_secret": "secret"
            },
            "output_dir": "/tmp/sf"
        }))
        .unwrap();

        assert_eq!(config.credentials.domain, "login");
        assert_eq!(config.api_version, "60.0");
        assert_eq!(config.http.timeout_secs, 30);
        assert_eq!(config.poll_interval_ms, 2000);
        assert_eq!(config.output_dir, Some(PathBuf::from("/tmp/sf")));
    }

    #[test]
    fn test_credentials_debug_redacts_secrets() {
        let creds = SalesforceCredentials {
            username: Some("ops@example.com".to_string()),
            password: Some("hunter2".to_string()),
            oauth_secret: Some("s3cr3t".to_string()),
            ..Default::default()
        };
        let text = format!("{:?}", creds);
        assert!(text.contains("ops@example.com"));
        assert!(!text.contains("hunter2"));
        assert!(!text.contains("s3cr3t"));
    }
}
