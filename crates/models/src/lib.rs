//! Record data model shared by the storage backends and the HTTP layer.
//!
//! Records are schemaless: a document of named values plus one identifier.
//! The only typing comes from [`FieldTypes`], which says which string inputs
//! must become integers or dates before they are stored.

pub mod dates;
pub mod errors;
pub mod field_type;
pub mod record;

pub use field_type::{FieldType, FieldTypes};
pub use record::{Document, Fields, Record, Value, ID_FIELD, INPUT_ID_FIELD};
