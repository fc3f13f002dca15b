use mongodb::error::Error as MongoError;
use thiserror::Error;
use uuid::Uuid;

/// Result alias for MongoDB DAO operations.
pub type MongoResult<T> = std::result::Result<T, MongoDaoError>;

/// Errors raised by the MongoDB state store, each carrying the operation
/// context needed to make supervisor logs actionable.
#[derive(Debug, Error)]
pub enum MongoDaoError {
    /// A required environment variable was not set.
    #[error("missing environment variable `{var}`")]
    MissingEnvVar {
        /// Name of the missing variable.
        var: &'static str,
    },
    /// The connection URI could not be parsed.
    #[error("failed to parse MongoDB connection URI `{uri}`")]
    InvalidUri {
        /// The offending URI.
        uri: String,
        /// Driver-level parse failure.
        #[source]
        source: MongoError,
    },
    /// The driver rejected the parsed client options.
    #[error("failed to build MongoDB client from options")]
    ClientConstruction {
        /// Driver-level construction failure.
        #[source]
        source: MongoError,
    },
    /// The server never answered the initial ping.
    #[error("MongoDB ping failed during initial connection after {attempts} attempt(s)")]
    InitialPing {
        /// How many pings were attempted before giving up.
        attempts: u32,
        /// Last ping failure.
        #[source]
        source: MongoError,
    },
    /// A periodic health ping failed.
    #[error("MongoDB ping health check failed")]
    HealthPing {
        /// Driver-level ping failure.
        #[source]
        source: MongoError,
    },
    /// Index creation failed during startup.
    #[error("failed to ensure index `{index}` on collection `{collection}`")]
    EnsureIndex {
        /// Collection the index belongs to.
        collection: &'static str,
        /// Name of the index.
        index: &'static str,
        /// Driver-level failure.
        #[source]
        source: MongoError,
    },
    /// A write hit one of the unique indexes. Carries the logical constraint
    /// label shared with the other backends so the engines see one
    /// vocabulary.
    #[error("unique constraint violated: {constraint}")]
    Duplicate {
        /// Label of the violated constraint.
        constraint: &'static str,
    },
    /// An insert failed for a reason other than a unique index.
    #[error("failed to insert into `{collection}`")]
    Insert {
        /// Target collection.
        collection: &'static str,
        /// Driver-level failure.
        #[source]
        source: MongoError,
    },
    /// A read failed.
    #[error("failed to query `{collection}`")]
    Find {
        /// Target collection.
        collection: &'static str,
        /// Driver-level failure.
        #[source]
        source: MongoError,
    },
    /// An update or replace failed.
    #[error("failed to update `{collection}`")]
    Update {
        /// Target collection.
        collection: &'static str,
        /// Driver-level failure.
        #[source]
        source: MongoError,
    },
    /// A delete failed.
    #[error("failed to delete from `{collection}`")]
    Delete {
        /// Target collection.
        collection: &'static str,
        /// Driver-level failure.
        #[source]
        source: MongoError,
    },
    /// A multi-document transaction could not start or commit.
    #[error("transaction `{op}` failed for game `{game_id}`")]
    Transaction {
        /// Logical name of the composite operation.
        op: &'static str,
        /// Game the transaction belonged to.
        game_id: Uuid,
        /// Driver-level failure.
        #[source]
        source: MongoError,
    },
}
