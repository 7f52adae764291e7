pub mod config;
pub mod error;
pub mod numeric;
pub mod schema;
pub mod types;

pub use config::Config;
pub use error::{Matched, NoMatch, StoreError, StoreResult};
pub use numeric::parse_numeric;
pub use schema::SchemaConfig;
pub use types::*;
