pub mod sqlite;
pub mod evaluation_store;

pub use sqlite::*;
pub use evaluation_store::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Invalid enum value for {field}: {value}")]
    InvalidEnum { field: String, value: String },

    #[error("Migration failed at version {version}: {reason}")]
    MigrationFailed { version: i64, reason: String },

    #[error("Stored record could not be (de)serialized: {0}")]
    Serialization(String),

    #[error("Store lock poisoned")]
    LockPoisoned,
}
