//! Stripe connector: paginated list reads flattened into tables and
//! per-record form-encoded writes.

mod client;
mod config;
mod entity;
mod factory;
mod form;
mod http_client;
mod stripe_connector;

pub use client::{ListPage, StripeClient};
pub use config::StripeConfig;
pub use entity::StripeEntity;
pub use factory::StripeConnectorFactory;
pub use form::form_fields;
pub use http_client::HttpStripeClient;
pub use stripe_connector::StripeConnector;
