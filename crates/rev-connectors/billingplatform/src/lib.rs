//! BillingPlatform connector: session-based REST 2.0 queries and batched
//! `brmObjects` writes annotated with per-record outcomes.

mod billingplatform_connector;
mod client;
mod config;
mod factory;
mod http_client;

pub use billingplatform_connector::BillingPlatformConnector;
pub use client::{BillingPlatformClient, BrmOperation, BrmRequest};
pub use config::BillingPlatformConfig;
pub use factory::BillingPlatformConnectorFactory;
pub use http_client::HttpBillingPlatformClient;
