use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("unable to connect to {target}: {reason}")]
    Connection { target: String, reason: String },
    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),
    #[error(transparent)]
    Model(#[from] models::errors::ModelError),
    #[error("duplicate identifier: {0}")]
    DuplicateIdentifier(String),
    #[error("identifier space exhausted")]
    IdsExhausted,
    #[error("reload failed: {0}")]
    Reload(String),
    #[error("database error: {0}")]
    Db(String),
}

impl StorageError {
    pub fn invalid_id(id: &str) -> Self { Self::InvalidIdentifier(id.to_string()) }

    /// Errors caused by the caller's input rather than by the backend.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            StorageError::InvalidIdentifier(_) | StorageError::Model(_) | StorageError::DuplicateIdentifier(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use models::{errors::ModelError, FieldType};

    #[test]
    fn classifies_client_errors() {
        assert!(StorageError::invalid_id("zzz").is_client_error());
        let model = ModelError::InvalidValue { field: "year".into(), value: "x".into(), expected: FieldType::Int };
        assert!(StorageError::from(model).is_client_error());
        assert!(!StorageError::Db("boom".into()).is_client_error());
        assert!(!StorageError::Connection { target: "h:1".into(), reason: "timeout".into() }.is_client_error());
    }

    #[test]
    fn messages_name_the_input() {
        let model = ModelError::InvalidValue { field: "year".into(), value: "abc".into(), expected: FieldType::Int };
        assert_eq!(StorageError::from(model).to_string(), "invalid value for year: \"abc\" is not a valid INT");
    }
}
