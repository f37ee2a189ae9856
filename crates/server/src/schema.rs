//! Record schema enforced by the API layer (the store itself is schemaless).

use configs::ApiConfig;
use models::Fields;
use service::pagination::Pagination;

use crate::errors::JsonApiError;

#[derive(Debug, Clone)]
pub struct RecordSchema {
    pub route: String,
    pub required: Vec<String>,
    pub optional: Vec<String>,
    pub sort_by: String,
}

impl RecordSchema {
    pub fn from_config(api: &ApiConfig) -> Self {
        Self {
            route: api.route.trim_matches('/').to_string(),
            required: api.required_fields.clone(),
            optional: api.optional_fields.clone(),
            sort_by: api.sort_by.clone(),
        }
    }

    pub fn is_field(&self, name: &str) -> bool {
        self.required.iter().chain(self.optional.iter()).any(|f| f == name)
    }

    pub fn is_required(&self, name: &str) -> bool {
        self.required.iter().any(|f| f == name)
    }

    /// All allowed fields, required first.
    pub fn fields(&self) -> impl Iterator<Item = &String> {
        self.required.iter().chain(self.optional.iter())
    }

    /// Reject body fields outside the allow-list.
    pub fn check_fields(&self, fields: &Fields) -> Result<(), JsonApiError> {
        match fields.keys().find(|k| !self.is_field(k)) {
            Some(unknown) => Err(JsonApiError::invalid_object(format!("Unknown parameter: {unknown}"))),
            None => Ok(()),
        }
    }

    /// Query strings may also carry paging parameters.
    pub fn check_params(&self, params: &Fields) -> Result<(), JsonApiError> {
        match params.keys().find(|k| !self.is_field(k) && !Pagination::is_param(k)) {
            Some(unknown) => Err(JsonApiError::invalid_object(format!("Unknown parameter: {unknown}"))),
            None => Ok(()),
        }
    }

    pub fn check_required(&self, fields: &Fields) -> Result<(), JsonApiError> {
        match self.required.iter().find(|r| !fields.contains_key(*r)) {
            Some(missing) => Err(JsonApiError::invalid_object(format!("{missing} is a required field"))),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> RecordSchema {
        RecordSchema::from_config(&ApiConfig::default())
    }

    fn fields(pairs: &[(&str, &str)]) -> Fields {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn unknown_body_field_rejected() {
        let err = schema()
            .check_fields(&fields(&[("title", "t"), ("badfield", "badboy")]))
            .unwrap_err();
        assert_eq!(err.message.as_deref(), Some("Unknown parameter: badfield"));
    }

    #[test]
    fn paging_params_only_allowed_in_queries() {
        let s = schema();
        let q = fields(&[("year", "1969"), ("limit", "5"), ("page", "1")]);
        assert!(s.check_params(&q).is_ok());
        assert!(s.check_fields(&q).is_err());
    }

    #[test]
    fn missing_required_field_named() {
        let err = schema().check_required(&fields(&[("title", "t"), ("year", "2000")])).unwrap_err();
        assert_eq!(err.message.as_deref(), Some("artist is a required field"));
        assert!(schema().check_required(&fields(&[("title", "t"), ("artist", "a")])).is_ok());
    }
}
