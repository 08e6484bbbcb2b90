use crate::client::ChuckClient;
use crate::query::ChuckQuery;
use async_trait::async_trait;
use rev_core::{
    Connector, Error, HttpSettings, QueryMethod, Record, Result, Table, WriteRequest,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChuckConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default)]
    pub http: HttpSettings,
}

fn default_base_url() -> String {
    "https://api.chucknorris.io/jokes".to_string()
}

impl Default for ChuckConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            http: HttpSettings::default(),
        }
    }
}

pub struct ChuckConnector {
    client: Option<Box<dyn ChuckClient>>,
}

impl ChuckConnector {
    pub fn new() -> Self {
        Self { client: None }
    }

    pub fn with_client(mut self, client: Box<dyn ChuckClient>) -> Self {
        self.client = Some(client);
        self
    }

    pub fn set_client(&mut self, client: Box<dyn ChuckClient>) {
        self.client = Some(client);
    }

    fn client(&self) -> Result<&dyn ChuckClient> {
        self.client.as_deref().ok_or_else(|| Error::no_client("joke API"))
    }

    /// All joke categories, one per row in a `category` column
    pub async fn categories(&self) -> Result<Table> {
        let body = self.client()?.get("categories", &[]).await?;
        let records = body
            .as_array()
            .into_iter()
            .flatten()
            .map(|category| {
                let mut record = Record::new();
                record.insert("category".to_string(), category.clone());
                record
            })
            .collect();
        Table::with_schema(["category"], records)
    }

    /// One random joke
    pub async fn random(&self) -> Result<Table> {
        let joke = self.client()?.get("random", &[]).await?;
        Table::from_values(vec![joke])
    }

    /// One random joke from `category`
    pub async fn random_category(&self, category: &str) -> Result<Table> {
        let joke = self
            .client()?
            .get("random", &[("category", category)])
            .await?;
        Table::from_values(vec![joke])
    }

    /// Jokes matching `text`; no match is an empty table
    pub async fn search(&self, text: &str) -> Result<Table> {
        let body = self.client()?.get("search", &[("query", text)]).await?;
        let jokes = match body.get("result") {
            Some(Value::Array(items)) => items.clone(),
            _ => Vec::new(),
        };
        debug!("Search '{}' matched {} jokes", text, jokes.len());
        Table::from_values(jokes)
    }

    fn read_only(&self, operation: &str) -> Error {
        Error::Unsupported(format!("{} is read-only: no {}", self.name(), operation))
    }
}

impl Default for ChuckConnector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Connector for ChuckConnector {
    fn name(&self) -> &str {
        "chuck"
    }

    async fn create(&self, _request: WriteRequest) -> Result<Table> {
        Err(self.read_only("create"))
    }

    async fn read(&self, query: &str, method: QueryMethod) -> Result<Table> {
        self.client()?;
        if method == QueryMethod::Bulk {
            return Err(Error::Unsupported("joke API has no bulk queries".to_string()));
        }
        match query.parse::<ChuckQuery>()? {
            ChuckQuery::Categories => self.categories().await,
            ChuckQuery::Random => self.random().await,
            ChuckQuery::RandomCategory(category) => self.random_category(&category).await,
            ChuckQuery::Search(text) => self.search(&text).await,
        }
    }

    async fn update(&self, _request: WriteRequest) -> Result<Table> {
        Err(self.read_only("update"))
    }

    async fn upsert(&self, _request: WriteRequest) -> Result<Table> {
        Err(self.read_only("upsert"))
    }

    async fn delete(&self, _request: WriteRequest) -> Result<Table> {
        Err(self.read_only("delete"))
    }
}
