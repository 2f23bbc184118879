use serde::de::DeserializeOwned;
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use crate::records::from_document;
use crate::repository::StorageError;

pub(crate) fn conn<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

/// Decodes the JSON `document` column of a row into a storage record.
pub(crate) fn decode_document<T: DeserializeOwned>(row: &SqliteRow) -> Result<T, StorageError> {
    let document: String = row.try_get("document").map_err(ser)?;
    from_document(&document)
}

/// Builds `?start, ?start+1, ...` for an `IN (...)` clause with `count` values.
pub(crate) fn placeholders(start: usize, count: usize) -> String {
    let mut sql = String::new();
    for i in 0..count {
        if i > 0 {
            sql.push_str(", ");
        }
        sql.push('?');
        sql.push_str(&(start + i).to_string());
    }
    sql
}
