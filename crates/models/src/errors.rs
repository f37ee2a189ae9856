use thiserror::Error;

use crate::field_type::FieldType;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("invalid value for {field}: {value:?} is not a valid {expected}")]
    InvalidValue { field: String, value: String, expected: FieldType },
    #[error("unknown field type: {0}")]
    UnknownFieldType(String),
}
