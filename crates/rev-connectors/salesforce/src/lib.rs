//! Salesforce connector: SOQL reads over REST or Bulk API 2.0, batched
//! composite writes and bulk ingest jobs with per-record outcome tables.

mod client;
mod config;
mod factory;
mod http_client;
mod salesforce_connector;
pub mod soql;

pub use client::{
    CollectionOperation, CollectionRequest, IngestJob, IngestOperation, JobInfo, JobState,
    SalesforceClient,
};
pub use config::{SalesforceConfig, SalesforceCredentials};
pub use factory::SalesforceConnectorFactory;
pub use http_client::HttpSalesforceClient;
pub use salesforce_connector::SalesforceConnector;
