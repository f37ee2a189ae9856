//! Storage layer for the record API.
//! - One async `Storage` contract, two interchangeable backends (MongoDB, in-memory mock).
//! - Owns input coercion: callers hand over untyped string maps, never typed values.
//! - Identifiers cross this boundary as opaque strings only.

pub mod errors;
pub mod pagination;
pub mod storage;

pub use errors::StorageError;
pub use storage::{configure, Storage};
