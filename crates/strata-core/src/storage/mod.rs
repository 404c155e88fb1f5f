mod migrations;
mod sqlite;

pub use migrations::{CURRENT_SCHEMA_VERSION, MIGRATIONS};
pub use sqlite::{Result, Store, StoreError};
