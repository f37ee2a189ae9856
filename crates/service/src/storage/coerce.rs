//! Input coercion ("fix input types").
//!
//! Turns a caller's string map into stored values:
//! 1. `id` is renamed to `_id`, replacing any `_id` already present.
//! 2. `_id` is parsed into the backend's native id type.
//! 3. Declared INT/DATE fields are converted; everything else stays a string.
//!
//! The input map is consumed, so a coerced map cannot be coerced twice.

use models::{Document, FieldTypes, Fields, ID_FIELD, INPUT_ID_FIELD};

use crate::errors::StorageError;

/// Result of coercion: the optional native id, split from the typed fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Coerced<I> {
    pub id: Option<I>,
    pub fields: Document,
}

pub fn fix_input_types<I, P>(mut input: Fields, field_types: &FieldTypes, parse_id: P) -> Result<Coerced<I>, StorageError>
where
    P: Fn(&str) -> Option<I>,
{
    if let Some(raw) = input.remove(INPUT_ID_FIELD) {
        input.insert(ID_FIELD.to_string(), raw);
    }
    let id = match input.remove(ID_FIELD) {
        Some(raw) => Some(parse_id(raw.trim()).ok_or_else(|| StorageError::invalid_id(&raw))?),
        None => None,
    };

    let mut fields = Document::new();
    for (name, raw) in input {
        let value = field_types.coerce(&name, raw)?;
        fields.insert(name, value);
    }
    Ok(Coerced { id, fields })
}

#[cfg(test)]
mod tests {
    use super::*;
    use models::{FieldType, Value};

    fn numeric_id(raw: &str) -> Option<u64> {
        raw.parse().ok()
    }

    fn input(pairs: &[(&str, &str)]) -> Fields {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    fn types() -> FieldTypes {
        FieldTypes::new().with("year", FieldType::Int).with("released", FieldType::Date)
    }

    #[test]
    fn renames_id_and_parses_it() {
        let c = fix_input_types(input(&[("id", "10042"), ("title", "Blue")]), &types(), numeric_id).unwrap();
        assert_eq!(c.id, Some(10042));
        assert_eq!(c.fields.len(), 1);
        assert!(!c.fields.contains_key("id"));
    }

    #[test]
    fn id_alias_wins_over_underscore_id() {
        let c = fix_input_types(input(&[("id", "7"), ("_id", "8")]), &types(), numeric_id).unwrap();
        assert_eq!(c.id, Some(7));
    }

    #[test]
    fn malformed_id_is_invalid_identifier() {
        let err = fix_input_types(input(&[("_id", "abc")]), &types(), numeric_id).unwrap_err();
        assert!(matches!(err, StorageError::InvalidIdentifier(ref s) if s == "abc"));
    }

    #[test]
    fn typed_fields_are_converted() {
        let c = fix_input_types(
            input(&[("year", "1999"), ("released", "1999-03-05"), ("title", "1999")]),
            &types(),
            numeric_id,
        )
        .unwrap();
        assert_eq!(c.id, None);
        assert_eq!(c.fields["year"], Value::Int(1999));
        assert!(matches!(c.fields["released"], Value::Date(_)));
        assert_eq!(c.fields["title"], Value::Str("1999".into()));
    }

    #[test]
    fn bad_int_rejects_whole_input() {
        let err = fix_input_types(input(&[("year", "MCMXCIX"), ("title", "x")]), &types(), numeric_id).unwrap_err();
        assert!(matches!(err, StorageError::Model(_)));
    }
}
