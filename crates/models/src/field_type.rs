use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use configs::ApiConfig;

use crate::dates::parse_date;
use crate::errors::ModelError;
use crate::record::Value;

/// Declared type of an input field. Undeclared fields are `String`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum FieldType {
    #[default]
    String,
    Int,
    Date,
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FieldType::String => "STRING",
            FieldType::Int => "INT",
            FieldType::Date => "DATE",
        };
        f.write_str(name)
    }
}

impl FromStr for FieldType {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "STRING" | "STR" => Ok(FieldType::String),
            "INT" | "INTEGER" => Ok(FieldType::Int),
            "DATE" | "DATETIME" => Ok(FieldType::Date),
            other => Err(ModelError::UnknownFieldType(other.to_string())),
        }
    }
}

impl FieldType {
    /// Convert one raw input string into a stored value of this type.
    pub fn coerce(self, field: &str, raw: String) -> Result<Value, ModelError> {
        match self {
            FieldType::String => Ok(Value::Str(raw)),
            FieldType::Int => raw
                .trim()
                .parse::<i64>()
                .map(Value::Int)
                .map_err(|_| self.invalid(field, raw)),
            FieldType::Date => match parse_date(&raw) {
                Some(dt) => Ok(Value::Date(dt)),
                None => Err(self.invalid(field, raw)),
            },
        }
    }

    fn invalid(self, field: &str, raw: String) -> ModelError {
        ModelError::InvalidValue { field: field.to_string(), value: raw, expected: self }
    }
}

/// Non-string field declarations, built once from configuration.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FieldTypes(HashMap<String, FieldType>);

impl FieldTypes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(api: &ApiConfig) -> Self {
        let ints = api.integer_fields.iter().map(|f| (f.clone(), FieldType::Int));
        let dates = api.date_fields.iter().map(|f| (f.clone(), FieldType::Date));
        ints.chain(dates).collect()
    }

    pub fn with(mut self, field: impl Into<String>, ty: FieldType) -> Self {
        self.0.insert(field.into(), ty);
        self
    }

    pub fn get(&self, field: &str) -> FieldType {
        self.0.get(field).copied().unwrap_or_default()
    }

    pub fn coerce(&self, field: &str, raw: String) -> Result<Value, ModelError> {
        self.get(field).coerce(field, raw)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, FieldType)> for FieldTypes {
    fn from_iter<I: IntoIterator<Item = (String, FieldType)>>(iter: I) -> Self {
        Self(iter.into_iter().filter(|(_, ty)| *ty != FieldType::String).collect())
    }
}
