//! Storage abstractions for the record API
//!
//! ```text
//!                 Storage (async trait)
//!                 ↑                   ↑
//!        MongoStorage            MockStorage
//!   (document store, prod)   (in-memory, tests/load)
//! ```
//!
//! Both backends share the coercion rules in [`coerce`] and must agree on
//! every operation except `search`, where the mock ignores the filter.

pub mod coerce;
pub mod mock;
pub mod mongo;
pub mod reload;

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use configs::{AppConfig, BackendKind};
use models::{FieldTypes, Fields, Record};
use tracing::info;

use crate::errors::StorageError;

pub use mock::MockStorage;
pub use mongo::MongoStorage;

/// Uniform CRUD contract implemented by every backend.
///
/// Inputs are untyped string maps; each operation coerces them exactly once
/// with the backend's [`FieldTypes`]. Ids must pass [`Storage::valid_id`]
/// before they are handed to `get`/`update`/`replace`/`delete`.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Short backend name, e.g. `mongo`.
    fn backend_name(&self) -> &'static str;

    /// Where the data lives, for operators (`host:port`).
    fn describe(&self) -> String;

    /// Field types installed at construction.
    fn field_types(&self) -> &FieldTypes;

    /// Syntactic id check. Never fails, never touches the store.
    fn valid_id(&self, id: &str) -> bool;

    /// Replace every record with the contents of an NDJSON file.
    ///
    /// The reload counter is bumped before the file is read. A read or parse
    /// failure is logged and leaves whatever was loaded so far; the number of
    /// records inserted is returned either way.
    async fn reload_data(&self, path: &Path) -> Result<u64, StorageError>;

    async fn count_reloads(&self) -> Result<u64, StorageError>;

    async fn count(&self) -> Result<u64, StorageError>;

    async fn list_ids(&self) -> Result<Vec<String>, StorageError>;

    async fn get(&self, id: &str) -> Result<Option<Record>, StorageError>;

    /// Equality search sorted ascending by `sort_field`; `limit == 0` is unbounded.
    async fn search(&self, filter: Fields, sort_field: &str, skip: u64, limit: u64) -> Result<Vec<Record>, StorageError>;

    /// Insert a record and return its new id.
    async fn create(&self, fields: Fields) -> Result<String, StorageError>;

    /// Merge fields into an existing record. Returns the match count (0 or 1).
    async fn update(&self, id: &str, fields: Fields) -> Result<u64, StorageError>;

    /// Overwrite a record's fields, keeping its id. Returns the match count (0 or 1).
    async fn replace(&self, id: &str, fields: Fields) -> Result<u64, StorageError>;

    /// Returns the delete count (0 or 1).
    async fn delete(&self, id: &str) -> Result<u64, StorageError>;
}

/// Build the backend named in the config. A Mongo connection failure is fatal.
pub async fn configure(cfg: &AppConfig, field_types: FieldTypes) -> Result<Arc<dyn Storage>, StorageError> {
    let storage: Arc<dyn Storage> = match cfg.storage.backend {
        BackendKind::Mongo => Arc::new(MongoStorage::connect(&cfg.mongo, field_types).await?),
        BackendKind::Mock => Arc::new(MockStorage::new(field_types)),
    };
    info!(backend = storage.backend_name(), target = %storage.describe(), "storage configured");
    Ok(storage)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn configure_selects_mock_backend() -> Result<(), StorageError> {
        let mut cfg = AppConfig::default();
        cfg.storage.backend = BackendKind::Mock;
        let storage = configure(&cfg, FieldTypes::from_config(&cfg.api)).await?;
        assert_eq!(storage.backend_name(), "mock");
        assert_eq!(storage.count().await?, 0);
        assert_eq!(storage.field_types().len(), 2);
        Ok(())
    }
}
