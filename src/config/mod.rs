pub mod database;
pub mod environment;

pub use database::{init_db, DbPool};
pub use environment::{Config, EmailBackend, StorageBackend};
