use crate::client::{ListPage, StripeClient};
use crate::config::StripeConfig;
use crate::entity::StripeEntity;
use async_trait::async_trait;
use rev_core::http::send_json;
use rev_core::{Error, Result};
use serde_json::Value;
use tracing::debug;

/// Stripe API client backed by reqwest
pub struct HttpStripeClient {
    http: reqwest::Client,
    base_url: String,
    secret_key: String,
    page_size: u32,
}

impl HttpStripeClient {
    pub fn new(config: &StripeConfig) -> Result<Self> {
        if config.secret_key.trim().is_empty() {
            return Err(Error::Configuration(
                "Stripe secret_key is empty".to_string(),
            ));
        }
        if !(1..=100).contains(&config.page_size) {
            return Err(Error::Configuration(format!(
                "Stripe page_size must be between 1 and 100, got {}",
                config.page_size
            )));
        }

        Ok(Self {
            http: config.http.build_client()?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            secret_key: config.secret_key.clone(),
            page_size: config.page_size,
        })
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        self.http
            .request(method, format!("{}/{}", self.base_url, path))
            .bearer_auth(&self.secret_key)
    }
}

#[async_trait]
impl StripeClient for HttpStripeClient {
    async fn list_page(
        &self,
        entity: StripeEntity,
        starting_after: Option<&str>,
    ) -> Result<ListPage> {
        let limit = self.page_size.to_string();
        let mut params = vec![("limit", limit.as_str())];
        if let Some(cursor) = starting_after {
            params.push(("starting_after", cursor));
        }
        debug!("Listing Stripe {} after {:?}", entity, starting_after);

        send_json(
            self.request(reqwest::Method::GET, entity.path()).query(&params),
            &format!("Failed to list Stripe {}", entity),
        )
        .await
    }

    async fn create(&self, entity: StripeEntity, form: &[(String, String)]) -> Result<Value> {
        send_json(
            self.request(reqwest::Method::POST, entity.path()).form(form),
            &format!("Failed to create Stripe {}", entity),
        )
        .await
    }

    async fn update(
        &self,
        entity: StripeEntity,
        id: &str,
        form: &[(String, String)],
    ) -> Result<Value> {
        send_json(
            self.request(reqwest::Method::POST, &format!("{}/{}", entity.path(), id))
                .form(form),
            &format!("Failed to update Stripe {} {}", entity, id),
        )
        .await
    }

    async fn delete(&self, entity: StripeEntity, id: &str) -> Result<Value> {
        send_json(
            self.request(reqwest::Method::DELETE, &format!("{}/{}", entity.path(), id)),
            &format!("Failed to delete Stripe {} {}", entity, id),
        )
        .await
    }
}
