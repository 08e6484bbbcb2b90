use anyhow::bail;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub connectors: Vec<ConnectorEntry>,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// A named connector instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectorEntry {
    /// Name used on the command line (`--connector`)
    pub name: String,

    /// Registered connector type, e.g. "salesforce"
    #[serde(rename = "type")]
    pub kind: String,

    /// Settings handed to the connector factory
    #[serde(default)]
    pub config: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// JSON formatted logs
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl AppConfig {
    pub fn load(config_dir: impl AsRef<Path>) -> anyhow::Result<Self> {
        let config_dir = config_dir.as_ref();
        let s = config::Config::builder()
            .add_source(config::Config::try_from(&Self::default())?)
            .add_source(
                config::File::with_name(&config_dir.join("default.yaml").to_string_lossy())
                    .required(false),
            )
            // Machine-local overrides, kept out of version control
            .add_source(
                config::File::with_name(&config_dir.join("local.yaml").to_string_lossy())
                    .required(false),
            )
            // REV__LOGGING__LEVEL=debug
            .add_source(config::Environment::with_prefix("REV").separator("__"))
            .build()?;

        let config: Self = s.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_file(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Connector names must be non-empty and unique
    pub fn validate(&self) -> anyhow::Result<()> {
        let mut seen = HashSet::new();
        for entry in &self.connectors {
            if entry.name.trim().is_empty() {
                bail!("connector of type '{}' has an empty name", entry.kind);
            }
            if !seen.insert(entry.name.as_str()) {
                bail!("connector name '{}' is defined more than once", entry.name);
            }
        }
        Ok(())
    }

    pub fn connector(&self, name: &str) -> Option<&ConnectorEntry> {
        self.connectors.iter().find(|c| c.name == name)
    }
}
