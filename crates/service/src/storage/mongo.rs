//! MongoDB backend.
//!
//! Records live in one collection; every reload appends a marker document
//! `{reload: 1, ts}` to a second collection, whose size is the reload count.
//! Filtering, sorting and paging all run inside the server.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use bson::{doc, oid::ObjectId, Bson, Document as BsonDocument};
use chrono::{TimeZone, Utc};
use configs::MongoConfig;
use futures::TryStreamExt;
use models::{Document, FieldTypes, Fields, Record, Value, ID_FIELD};
use mongodb::options::{ClientOptions, Credential, FindOptions, ServerAddress};
use mongodb::{Client, Collection};
use tracing::{debug, error, info, instrument};

use super::coerce::{fix_input_types, Coerced};
use super::reload::load_into;
use super::Storage;
use crate::errors::StorageError;

pub struct MongoStorage {
    records: Collection<BsonDocument>,
    reloads: Collection<BsonDocument>,
    target: String,
    field_types: FieldTypes,
}

impl MongoStorage {
    /// Connect and verify the server answers a `ping` within the configured timeout.
    #[instrument(skip_all, fields(target = %cfg.target()))]
    pub async fn connect(cfg: &MongoConfig, field_types: FieldTypes) -> Result<Self, StorageError> {
        let target = cfg.target();
        let conn_err = |reason: String| StorageError::Connection { target: target.clone(), reason };

        let credentials = cfg.decoded_credentials().map_err(|e| conn_err(e.to_string()))?;
        let timeout = Duration::from_secs(cfg.connect_timeout_secs);

        let mut opts = ClientOptions::default();
        opts.hosts = vec![ServerAddress::Tcp { host: cfg.host.clone(), port: Some(cfg.port) }];
        opts.server_selection_timeout = Some(timeout);
        opts.connect_timeout = Some(timeout);
        opts.app_name = Some("record-api".to_string());
        if let Some((user, pwd)) = credentials {
            opts.credential = Some(Credential::builder().username(user).password(pwd).build());
        }

        let client = Client::with_options(opts).map_err(|e| conn_err(e.to_string()))?;
        if let Err(e) = client.database("admin").run_command(doc! { "ping": 1 }, None).await {
            error!(%target, error = %e, "unable to connect to mongo");
            return Err(conn_err(e.to_string()));
        }
        info!(%target, database = %cfg.database, collection = %cfg.collection, "connected to mongo");

        let db = client.database(&cfg.database);
        Ok(Self {
            records: db.collection(&cfg.collection),
            reloads: db.collection(&cfg.reload_collection),
            target,
            field_types,
        })
    }

    fn coerce(&self, input: Fields) -> Result<Coerced<ObjectId>, StorageError> {
        fix_input_types(input, &self.field_types, |raw| ObjectId::parse_str(raw).ok())
    }
}

fn parse_oid(id: &str) -> Result<ObjectId, StorageError> {
    ObjectId::parse_str(id).map_err(|_| StorageError::invalid_id(id))
}

fn db_err(e: mongodb::error::Error) -> StorageError {
    StorageError::Db(e.to_string())
}

fn by_id(oid: ObjectId) -> BsonDocument {
    doc! { ID_FIELD: oid }
}

#[async_trait]
impl Storage for MongoStorage {
    fn backend_name(&self) -> &'static str {
        "mongo"
    }

    fn describe(&self) -> String {
        self.target.clone()
    }

    fn field_types(&self) -> &FieldTypes {
        &self.field_types
    }

    fn valid_id(&self, id: &str) -> bool {
        ObjectId::parse_str(id).is_ok()
    }

    #[instrument(skip(self, path), fields(path = %path.display()))]
    async fn reload_data(&self, path: &Path) -> Result<u64, StorageError> {
        self.records.drop(None).await.map_err(db_err)?;
        self.reloads
            .insert_one(doc! { "reload": 1, "ts": bson::DateTime::now() }, None)
            .await
            .map_err(db_err)?;
        let records = &self.records;
        let loaded = load_into(path, |doc| async move {
            records.insert_one(to_bson_document(doc), None).await.map(|_| ()).map_err(db_err)
        })
        .await;
        Ok(loaded)
    }

    async fn count_reloads(&self) -> Result<u64, StorageError> {
        self.reloads.count_documents(doc! {}, None).await.map_err(db_err)
    }

    async fn count(&self) -> Result<u64, StorageError> {
        self.records.count_documents(doc! {}, None).await.map_err(db_err)
    }

    async fn list_ids(&self) -> Result<Vec<String>, StorageError> {
        let mut opts = FindOptions::default();
        opts.projection = Some(doc! { ID_FIELD: 1 });
        let docs: Vec<BsonDocument> = self
            .records
            .find(doc! {}, opts)
            .await
            .map_err(db_err)?
            .try_collect()
            .await
            .map_err(db_err)?;
        Ok(docs.iter().filter_map(|d| d.get(ID_FIELD)).map(id_to_string).collect())
    }

    async fn get(&self, id: &str) -> Result<Option<Record>, StorageError> {
        let oid = parse_oid(id)?;
        let found = self.records.find_one(by_id(oid), None).await.map_err(db_err)?;
        Ok(found.map(record_from_bson))
    }

    #[instrument(skip(self, filter))]
    async fn search(&self, filter: Fields, sort_field: &str, skip: u64, limit: u64) -> Result<Vec<Record>, StorageError> {
        let Coerced { id, fields } = self.coerce(filter)?;
        let mut query = to_bson_document(fields);
        if let Some(oid) = id {
            query.insert(ID_FIELD, oid);
        }

        let mut sort = BsonDocument::new();
        sort.insert(sort_field, 1);
        let mut opts = FindOptions::default();
        opts.sort = Some(sort);
        if skip > 0 {
            opts.skip = Some(skip);
        }
        if limit > 0 {
            opts.limit = Some(i64::try_from(limit).unwrap_or(i64::MAX));
        }

        debug!(filter = %query, "mongo search");
        let docs: Vec<BsonDocument> = self
            .records
            .find(query, opts)
            .await
            .map_err(db_err)?
            .try_collect()
            .await
            .map_err(db_err)?;
        Ok(docs.into_iter().map(record_from_bson).collect())
    }

    #[instrument(skip(self, fields))]
    async fn create(&self, fields: Fields) -> Result<String, StorageError> {
        let Coerced { id, fields } = self.coerce(fields)?;
        let mut document = to_bson_document(fields);
        if let Some(oid) = id {
            document.insert(ID_FIELD, oid);
        }
        let inserted = self.records.insert_one(document, None).await.map_err(db_err)?;
        let id = id_to_string(&inserted.inserted_id);
        debug!(%id, "mongo create");
        Ok(id)
    }

    #[instrument(skip(self, fields))]
    async fn update(&self, id: &str, fields: Fields) -> Result<u64, StorageError> {
        let oid = parse_oid(id)?;
        let Coerced { fields, .. } = self.coerce(fields)?;
        if fields.is_empty() {
            // `$set` rejects an empty document; report whether the record exists.
            return self.records.count_documents(by_id(oid), None).await.map_err(db_err);
        }
        let res = self
            .records
            .update_one(by_id(oid), doc! { "$set": to_bson_document(fields) }, None)
            .await
            .map_err(db_err)?;
        Ok(res.matched_count)
    }

    #[instrument(skip(self, fields))]
    async fn replace(&self, id: &str, fields: Fields) -> Result<u64, StorageError> {
        let oid = parse_oid(id)?;
        let Coerced { fields, .. } = self.coerce(fields)?;
        let res = self
            .records
            .replace_one(by_id(oid), to_bson_document(fields), None)
            .await
            .map_err(db_err)?;
        Ok(res.matched_count)
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: &str) -> Result<u64, StorageError> {
        let oid = parse_oid(id)?;
        let res = self.records.delete_one(by_id(oid), None).await.map_err(db_err)?;
        Ok(res.deleted_count)
    }
}

pub(crate) fn to_bson(value: Value) -> Bson {
    match value {
        Value::Null => Bson::Null,
        Value::Bool(b) => Bson::Boolean(b),
        Value::Int(i) => Bson::Int64(i),
        Value::Float(f) => Bson::Double(f),
        Value::Str(s) => Bson::String(s),
        Value::Date(dt) => Bson::DateTime(bson::DateTime::from_chrono(Utc.from_utc_datetime(&dt))),
        Value::List(items) => Bson::Array(items.into_iter().map(to_bson).collect()),
        Value::Map(map) => Bson::Document(to_bson_document(map)),
    }
}

pub(crate) fn to_bson_document(doc: Document) -> BsonDocument {
    doc.into_iter().map(|(k, v)| (k, to_bson(v))).collect()
}

pub(crate) fn from_bson(value: Bson) -> Value {
    match value {
        Bson::Null | Bson::Undefined => Value::Null,
        Bson::Boolean(b) => Value::Bool(b),
        Bson::Int32(i) => Value::Int(i64::from(i)),
        Bson::Int64(i) => Value::Int(i),
        Bson::Double(f) => Value::Float(f),
        Bson::String(s) => Value::Str(s),
        Bson::DateTime(dt) => Value::Date(dt.to_chrono().naive_utc()),
        Bson::ObjectId(oid) => Value::Str(oid.to_hex()),
        Bson::Array(items) => Value::List(items.into_iter().map(from_bson).collect()),
        Bson::Document(d) => Value::Map(d.into_iter().map(|(k, v)| (k, from_bson(v))).collect()),
        other => Value::Str(other.to_string()),
    }
}

fn id_to_string(id: &Bson) -> String {
    match id {
        Bson::ObjectId(oid) => oid.to_hex(),
        Bson::String(s) => s.clone(),
        other => other.to_string(),
    }
}

pub(crate) fn record_from_bson(mut doc: BsonDocument) -> Record {
    let id = doc.remove(ID_FIELD).map(|b| id_to_string(&b)).unwrap_or_default();
    let fields = doc.into_iter().map(|(k, v)| (k, from_bson(v))).collect();
    Record::new(id, fields)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn values_round_trip_through_bson() {
        let released = NaiveDate::from_ymd_opt(1966, 5, 16).unwrap().and_hms_opt(0, 0, 0).unwrap();
        let mut doc = Document::new();
        doc.insert("title".into(), Value::Str("Pet Sounds".into()));
        doc.insert("year".into(), Value::Int(1966));
        doc.insert("released".into(), Value::Date(released));
        doc.insert("rating".into(), Value::Float(4.5));
        doc.insert("tracks".into(), Value::List(vec![Value::Str("Wouldn't It Be Nice".into())]));

        let bson_doc = to_bson_document(doc.clone());
        assert_eq!(bson_doc.get_i64("year").unwrap(), 1966);
        assert!(matches!(bson_doc.get("released"), Some(Bson::DateTime(_))));

        let rec = record_from_bson(bson_doc);
        assert_eq!(rec.fields, doc);
    }

    #[test]
    fn record_id_is_hex_string() {
        let oid = ObjectId::new();
        let rec = record_from_bson(doc! { "_id": oid, "title": "Blue", "year": 1971_i32 });
        assert_eq!(rec.id, oid.to_hex());
        assert_eq!(rec.get("year"), Some(&Value::Int(1971)));
        assert!(!rec.fields.contains_key("_id"));
    }

    #[test]
    fn object_id_syntax() {
        assert!(parse_oid("5f1d7e6b2c3a4b5d6e7f8091").is_ok());
        assert!(matches!(parse_oid("hdsghgkisbad"), Err(StorageError::InvalidIdentifier(_))));
        assert!(parse_oid("5f1d7e6b2c3a4b5d6e7f809").is_err());
    }
}
