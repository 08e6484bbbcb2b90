use crate::{Connector, ConnectorFactory, Error, Result};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Registry mapping connector type names to their factories
pub struct Registry {
    connector_factories: HashMap<String, Arc<dyn ConnectorFactory>>,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            connector_factories: HashMap::new(),
        }
    }

    /// Register a connector factory
    pub fn register_connector(&mut self, factory: Arc<dyn ConnectorFactory>) {
        let name = factory.name().to_string();
        self.connector_factories.insert(name, factory);
    }

    /// Get a connector factory by name
    pub fn get_connector_factory(&self, name: &str) -> Result<Arc<dyn ConnectorFactory>> {
        self.connector_factories
            .get(name)
            .cloned()
            .ok_or_else(|| Error::Configuration(format!("Connector factory '{}' not found", name)))
    }

    /// Build a connector of type `name` from its configuration
    pub async fn create_connector(&self, name: &str, config: Value) -> Result<Box<dyn Connector>> {
        let factory = self.get_connector_factory(name)?;
        factory.create(config).await
    }

    pub fn contains(&self, name: &str) -> bool {
        self.connector_factories.contains_key(name)
    }

    /// List all registered connector types, sorted
    pub fn list_connectors(&self) -> Vec<String> {
        let mut names: Vec<String> = self.connector_factories.keys().cloned().collect();
        names.sort();
        names
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{QueryMethod, Table, WriteRequest};
    use async_trait::async_trait;
    use serde_json::json;

    struct EchoConnector {
        label: String,
    }

    #[async_trait]
    impl Connector for EchoConnector {
        fn name(&self) -> &str {
            "echo"
        }

        async fn create(&self, request: WriteRequest) -> Result<Table> {
            Ok(request.records)
        }

        async fn read(&self, _query: &str, _method: QueryMethod) -> Result<Table> {
            Ok(Table::new([self.label.clone()]))
        }

        async fn update(&self, request: WriteRequest) -> Result<Table> {
            Ok(request.records)
        }

        async fn delete(&self, request: WriteRequest) -> Result<Table> {
            Ok(request.records)
        }
    }

    struct EchoFactory;

    #[async_trait]
    impl ConnectorFactory for EchoFactory {
        fn name(&self) -> &str {
            "echo"
        }

        async fn create(&self, config: Value) -> Result<Box<dyn Connector>> {
            let label = config["label"].as_str().unwrap_or("value").to_string();
            Ok(Box::new(EchoConnector { label }))
        }
    }

    #[tokio::test]
    async fn test_registry_dispatch_by_name() {
        let mut registry = Registry::new();
        registry.register_connector(Arc::new(EchoFactory));

        assert!(registry.contains("echo"));
        assert_eq!(registry.list_connectors(), vec!["echo".to_string()]);

        let connector = registry
            .create_connector("echo", json!({"label": "Id"}))
            .await
            .unwrap();
        let table = connector.read("anything", QueryMethod::Rest).await.unwrap();
        assert_eq!(table.columns(), &["Id"]);
    }

    #[tokio::test]
    async fn test_unknown_connector_is_configuration_error() {
        let registry = Registry::default();
        let result = registry.create_connector("netsuite", json!({})).await;
        assert!(matches!(result, Err(Error::Configuration(_))));
    }

    #[tokio::test]
    async fn test_default_upsert_is_unsupported() {
        let connector = EchoConnector {
            label: "x".to_string(),
        };
        let result = connector
            .upsert(WriteRequest::new("Account", Table::empty()))
            .await;
        assert!(matches!(result, Err(Error::Unsupported(_))));
    }
}
