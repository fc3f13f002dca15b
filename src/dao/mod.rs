/// Database model definitions.
pub mod models;
/// Pluggable backends for the shared game state.
pub mod state_store;
/// Storage abstraction layer for database operations.
pub mod storage;
