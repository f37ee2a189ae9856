//! In-memory mock backend for tests and load generation.
//!
//! Ids are decimal strings from a monotonically increasing counter starting
//! at 10001 and are never reused. `search` ignores its filter and returns
//! every record (sorted and paged); the filter is still coerced so invalid
//! typed values fail exactly as they do against MongoDB.

use std::collections::BTreeMap;
use std::path::Path;

use async_trait::async_trait;
use models::record::sort_cmp_optional;
use models::{Document, FieldTypes, Fields, Record};
use tokio::sync::RwLock;
use tracing::{debug, instrument};

use super::coerce::{fix_input_types, Coerced};
use super::reload::load_into;
use super::Storage;
use crate::errors::StorageError;
use crate::pagination::window;

/// Ids at or below this value are never handed out.
pub const RESERVED_IDS: u64 = 10_000;

#[derive(Debug)]
struct MockState {
    records: BTreeMap<u64, Document>,
    next_id: u64,
    reloads: u64,
}

impl MockState {
    /// Insert under the next counter value. Never overwrites an existing key.
    fn insert_new(&mut self, doc: Document) -> Result<u64, StorageError> {
        let id = self.next_id;
        let next = id.checked_add(1).ok_or(StorageError::IdsExhausted)?;
        if self.records.contains_key(&id) {
            return Err(StorageError::DuplicateIdentifier(id.to_string()));
        }
        self.next_id = next;
        self.records.insert(id, doc);
        Ok(id)
    }
}

/// Example
/// ```
/// use models::{FieldType, FieldTypes, Fields};
/// use service::storage::MockStorage;
/// use service::Storage;
///
/// let store = MockStorage::new(FieldTypes::new().with("year", FieldType::Int));
/// let input: Fields = [("title".to_string(), "Blue".to_string()), ("year".to_string(), "1971".to_string())].into();
/// let id = tokio_test::block_on(store.create(input)).unwrap();
/// assert_eq!(id, "10001");
/// ```
pub struct MockStorage {
    state: RwLock<MockState>,
    field_types: FieldTypes,
}

impl MockStorage {
    pub fn new(field_types: FieldTypes) -> Self {
        Self {
            state: RwLock::new(MockState { records: BTreeMap::new(), next_id: RESERVED_IDS + 1, reloads: 0 }),
            field_types,
        }
    }

    fn coerce(&self, input: Fields) -> Result<Coerced<u64>, StorageError> {
        fix_input_types(input, &self.field_types, parse_key)
    }
}

/// Map a valid id string onto its key. Ids too large for `u64` match nothing.
fn parse_key(id: &str) -> Option<u64> {
    if is_digits(id) { id.parse().ok() } else { None }
}

fn is_digits(id: &str) -> bool {
    !id.is_empty() && id.bytes().all(|b| b.is_ascii_digit())
}

#[async_trait]
impl Storage for MockStorage {
    fn backend_name(&self) -> &'static str {
        "mock"
    }

    fn describe(&self) -> String {
        "in-memory mock".to_string()
    }

    fn field_types(&self) -> &FieldTypes {
        &self.field_types
    }

    fn valid_id(&self, id: &str) -> bool {
        is_digits(id)
    }

    #[instrument(skip(self, path), fields(path = %path.display()))]
    async fn reload_data(&self, path: &Path) -> Result<u64, StorageError> {
        {
            let mut st = self.state.write().await;
            st.records.clear();
            st.reloads += 1;
        }
        let loaded = load_into(path, |doc| async move {
            self.state.write().await.insert_new(doc).map(|_| ())
        })
        .await;
        Ok(loaded)
    }

    async fn count_reloads(&self) -> Result<u64, StorageError> {
        Ok(self.state.read().await.reloads)
    }

    async fn count(&self) -> Result<u64, StorageError> {
        Ok(self.state.read().await.records.len() as u64)
    }

    async fn list_ids(&self) -> Result<Vec<String>, StorageError> {
        Ok(self.state.read().await.records.keys().map(u64::to_string).collect())
    }

    async fn get(&self, id: &str) -> Result<Option<Record>, StorageError> {
        let Some(key) = parse_key(id) else { return Ok(None) };
        let st = self.state.read().await;
        Ok(st.records.get(&key).map(|doc| Record::new(key.to_string(), doc.clone())))
    }

    #[instrument(skip(self, filter))]
    async fn search(&self, filter: Fields, sort_field: &str, skip: u64, limit: u64) -> Result<Vec<Record>, StorageError> {
        // Coerced for parity with MongoDB; the mock does not filter.
        let _ = self.coerce(filter)?;
        let mut all: Vec<Record> = {
            let st = self.state.read().await;
            st.records.iter().map(|(k, doc)| Record::new(k.to_string(), doc.clone())).collect()
        };
        all.sort_by(|a, b| sort_cmp_optional(a.get(sort_field), b.get(sort_field)));
        Ok(window(all, skip, limit))
    }

    #[instrument(skip(self, fields))]
    async fn create(&self, fields: Fields) -> Result<String, StorageError> {
        let Coerced { id, fields } = self.coerce(fields)?;
        let mut st = self.state.write().await;
        let key = match id {
            Some(key) => {
                // the counter must stay ahead of every stored key
                let Some(next) = key.checked_add(1) else {
                    return Err(StorageError::invalid_id(&key.to_string()));
                };
                if st.records.contains_key(&key) {
                    return Err(StorageError::DuplicateIdentifier(key.to_string()));
                }
                st.records.insert(key, fields);
                st.next_id = st.next_id.max(next);
                key
            }
            None => st.insert_new(fields)?,
        };
        debug!(id = key, "mock create");
        Ok(key.to_string())
    }

    #[instrument(skip(self, fields))]
    async fn update(&self, id: &str, fields: Fields) -> Result<u64, StorageError> {
        let Coerced { fields, .. } = self.coerce(fields)?;
        let Some(key) = parse_key(id) else { return Ok(0) };
        let mut st = self.state.write().await;
        match st.records.get_mut(&key) {
            Some(doc) => {
                doc.extend(fields);
                Ok(1)
            }
            None => Ok(0),
        }
    }

    #[instrument(skip(self, fields))]
    async fn replace(&self, id: &str, fields: Fields) -> Result<u64, StorageError> {
        let Coerced { fields, .. } = self.coerce(fields)?;
        let Some(key) = parse_key(id) else { return Ok(0) };
        let mut st = self.state.write().await;
        match st.records.get_mut(&key) {
            Some(doc) => {
                *doc = fields;
                Ok(1)
            }
            None => Ok(0),
        }
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: &str) -> Result<u64, StorageError> {
        let Some(key) = parse_key(id) else { return Ok(0) };
        let removed = self.state.write().await.records.remove(&key);
        Ok(u64::from(removed.is_some()))
    }
}
