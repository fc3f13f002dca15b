//! MongoDB backend for the shared game state.
//!
//! Uniqueness constraints live in the database itself (unique indexes, one
//! of them partial), so arbitration stays correct when several server
//! processes write concurrently.

mod config;
mod error;
mod models;
mod store;

pub use config::MongoConfig;
pub use error::MongoDaoError;
pub use store::MongoStateStore;

use crate::dao::storage::StorageError;

impl From<MongoDaoError> for StorageError {
    fn from(err: MongoDaoError) -> Self {
        match err {
            MongoDaoError::Duplicate { constraint } => StorageError::Duplicate { constraint },
            other => {
                let message = other.to_string();
                StorageError::unavailable(message, other)
            }
        }
    }
}
