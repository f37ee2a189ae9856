use std::cmp::Ordering;
use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::dates::format_date;

/// Name of the distinguished identifier field in stored records.
pub const ID_FIELD: &str = "_id";

/// Alias accepted from callers and renamed to [`ID_FIELD`] before storage.
pub const INPUT_ID_FIELD: &str = "id";

/// Untyped field map as received from a form body or a query string.
pub type Fields = BTreeMap<String, String>;

/// Field map of a stored record, without its identifier.
pub type Document = BTreeMap<String, Value>;

/// A stored field value.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Date(NaiveDateTime),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
}

impl Value {
    /// Rank of the value's type when sorting mixed columns.
    /// Mirrors the document store: null < numbers < strings < maps < lists < bools < dates.
    fn sort_rank(&self) -> u8 {
        match self {
            Value::Null => 0,
            Value::Int(_) | Value::Float(_) => 1,
            Value::Str(_) => 2,
            Value::Map(_) => 3,
            Value::List(_) => 4,
            Value::Bool(_) => 5,
            Value::Date(_) => 6,
        }
    }

    /// Total order used for client-side sorting.
    pub fn sort_cmp(&self, other: &Value) -> Ordering {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => a.cmp(b),
            (Value::Int(a), Value::Float(b)) => (*a as f64).total_cmp(b),
            (Value::Float(a), Value::Int(b)) => a.total_cmp(&(*b as f64)),
            (Value::Float(a), Value::Float(b)) => a.total_cmp(b),
            (Value::Str(a), Value::Str(b)) => a.cmp(b),
            (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
            (Value::Date(a), Value::Date(b)) => a.cmp(b),
            (Value::List(a), Value::List(b)) => cmp_seq(a.iter(), b.iter()),
            (Value::Map(a), Value::Map(b)) => a
                .iter()
                .zip(b.iter())
                .map(|((ka, va), (kb, vb))| ka.cmp(kb).then_with(|| va.sort_cmp(vb)))
                .find(|o| o.is_ne())
                .unwrap_or_else(|| a.len().cmp(&b.len())),
            _ => self.sort_rank().cmp(&other.sort_rank()),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }
}

fn cmp_seq<'a>(mut a: impl Iterator<Item = &'a Value>, mut b: impl Iterator<Item = &'a Value>) -> Ordering {
    loop {
        match (a.next(), b.next()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) => match x.sort_cmp(y) {
                Ordering::Equal => continue,
                o => return o,
            },
        }
    }
}

/// Missing fields sort first, like nulls.
pub fn sort_cmp_optional(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(v)) => Value::Null.sort_cmp(v).then(Ordering::Less),
        (Some(v), None) => v.sort_cmp(&Value::Null).then(Ordering::Greater),
        (Some(x), Some(y)) => x.sort_cmp(y),
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(i) => serializer.serialize_i64(*i),
            Value::Float(f) => serializer.serialize_f64(*f),
            Value::Str(s) => serializer.serialize_str(s),
            Value::Date(d) => serializer.serialize_str(&format_date(d)),
            Value::List(items) => serializer.collect_seq(items),
            Value::Map(map) => serializer.collect_map(map),
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => n.as_f64().map(Value::Float).unwrap_or(Value::Null),
            },
            serde_json::Value::String(s) => Value::Str(s),
            serde_json::Value::Array(items) => Value::List(items.into_iter().map(Value::from).collect()),
            serde_json::Value::Object(map) => {
                Value::Map(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

/// A stored record: identifier plus fields.
///
/// Serializes as one flat object with the identifier under `_id`.
#[derive(Clone, Debug, PartialEq)]
pub struct Record {
    pub id: String,
    pub fields: Document,
}

impl Record {
    pub fn new(id: impl Into<String>, fields: Document) -> Self {
        Self { id: id.into(), fields }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Attach a link back to this record (`_href`) for API responses.
    pub fn with_href(mut self, href: String) -> Self {
        self.fields.insert("_href".to_string(), Value::Str(href));
        self
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len() + 1))?;
        map.serialize_entry(ID_FIELD, &self.id)?;
        for (k, v) in self.fields.iter().filter(|(k, _)| k.as_str() != ID_FIELD) {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde_json::json;

    #[test]
    fn record_serializes_flat_with_id_first() {
        let mut fields = Document::new();
        fields.insert("title".into(), "Abbey Road".into());
        fields.insert("year".into(), Value::Int(1969));
        fields.insert(
            "released".into(),
            Value::Date(NaiveDate::from_ymd_opt(1969, 9, 26).unwrap().and_hms_opt(0, 0, 0).unwrap()),
        );
        let rec = Record::new("10001", fields);
        let v = serde_json::to_value(&rec).unwrap();
        assert_eq!(
            v,
            json!({"_id": "10001", "title": "Abbey Road", "year": 1969, "released": "1969-09-26T00:00:00"})
        );
        let text = serde_json::to_string(&rec).unwrap();
        assert!(text.starts_with("{\"_id\":\"10001\""));
    }

    #[test]
    fn json_numbers_keep_integer_type() {
        assert_eq!(Value::from(json!(1969)), Value::Int(1969));
        assert_eq!(Value::from(json!(33.3)), Value::Float(33.3));
        assert_eq!(
            Value::from(json!({"tracks": ["Come Together", 2]})),
            Value::Map(BTreeMap::from([(
                "tracks".to_string(),
                Value::List(vec!["Come Together".into(), Value::Int(2)])
            )]))
        );
    }

    #[test]
    fn mixed_types_sort_by_rank() {
        let mut vals = vec![
            Value::Str("b".into()),
            Value::Bool(false),
            Value::Int(3),
            Value::Null,
            Value::Float(2.5),
            Value::Str("a".into()),
        ];
        vals.sort_by(|a, b| a.sort_cmp(b));
        assert_eq!(
            vals,
            vec![
                Value::Null,
                Value::Float(2.5),
                Value::Int(3),
                Value::Str("a".into()),
                Value::Str("b".into()),
                Value::Bool(false),
            ]
        );
    }

    #[test]
    fn missing_sorts_before_present() {
        let one = Value::Int(1);
        assert_eq!(sort_cmp_optional(None, Some(&one)), Ordering::Less);
        assert_eq!(sort_cmp_optional(Some(&one), None), Ordering::Greater);
        assert_eq!(sort_cmp_optional(None, None), Ordering::Equal);
    }
}
