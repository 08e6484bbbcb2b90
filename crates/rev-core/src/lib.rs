mod connector;
mod error;
mod factory;
pub mod http;
pub mod reconcile;
mod registry;
mod table;

pub use connector::{Connector, QueryMethod, WriteMode, WriteOptions, WriteRequest};
pub use error::{BoxError, Error, Result};
pub use factory::ConnectorFactory;
pub use http::HttpSettings;
pub use reconcile::{Outcome, STATUS_COLUMN};
pub use registry::Registry;
pub use table::{cell_text, flatten_record, into_record, Record, Table};
