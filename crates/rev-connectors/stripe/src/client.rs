use crate::entity::StripeEntity;
use async_trait::async_trait;
use rev_core::Result;
use serde::Deserialize;
use serde_json::Value;

/// One page of a Stripe list response
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListPage {
    #[serde(default)]
    pub data: Vec<Value>,
    #[serde(default)]
    pub has_more: bool,
}

impl ListPage {
    /// Cursor for the following page: the id of the last object
    pub fn last_id(&self) -> Option<&str> {
        self.data.last().and_then(|v| v.get("id")).and_then(Value::as_str)
    }
}

/// Calls the connector makes against the Stripe API
#[async_trait]
pub trait StripeClient: Send + Sync {
    /// `GET /v1/<entity>` with `limit` and an optional `starting_after` cursor
    async fn list_page(
        &self,
        entity: StripeEntity,
        starting_after: Option<&str>,
    ) -> Result<ListPage>;

    /// `POST /v1/<entity>`
    async fn create(&self, entity: StripeEntity, form: &[(String, String)]) -> Result<Value>;

    /// `POST /v1/<entity>/<id>`
    async fn update(
        &self,
        entity: StripeEntity,
        id: &str,
        form: &[(String, String)],
    ) -> Result<Value>;

    /// `DELETE /v1/<entity>/<id>`
    async fn delete(&self, entity: StripeEntity, id: &str) -> Result<Value>;
}
