//! Read-only connector for the api.chucknorris.io joke API. Small enough to
//! serve as a template for new connectors.

mod chuck_connector;
mod client;
mod factory;
mod query;

pub use chuck_connector::{ChuckConfig, ChuckConnector};
pub use client::{ChuckClient, HttpChuckClient};
pub use factory::ChuckConnectorFactory;
pub use query::ChuckQuery;
