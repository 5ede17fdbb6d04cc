//! Database access for the agent
//!
//! - `pool`: read-only connections to a SQLite file, one per run
//! - `schema`: table introspection and the prompt schema block
//! - `sample`: the demo company database

pub mod error;
pub mod pool;
pub mod sample;
pub mod schema;

pub use error::PersistenceError;
pub use pool::{health_check, DatabaseTarget};
pub use sample::{seed_company_database, seed_company_tables};
pub use schema::{ColumnInfo, SchemaCatalog, TableInfo};
