//! Domain subsystems built on the sync facade.
//!
//! Each plugin owns the typed view of one collection (or a small group) and
//! routes every write through [`SyncContext`](crate::core::facade::SyncContext).

pub mod assistant;
pub mod catalog;
pub mod groceries;
pub mod pantry;
pub mod recipes;
pub mod settings;
pub mod shops;
pub mod storage_spaces;

use crate::core::collection::Record;
use crate::core::error::PantryError;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Serialize a typed entity into a store record.
pub fn to_record<T: Serialize>(entity: &T) -> Result<Record, PantryError> {
    match serde_json::to_value(entity)? {
        Value::Object(map) => Ok(map),
        other => Err(PantryError::Validation(format!(
            "entity serialized to {} instead of an object",
            other
        ))),
    }
}

/// Deserialize a store record into a typed entity.
pub fn from_record<T: DeserializeOwned>(record: Record) -> Result<T, PantryError> {
    Ok(serde_json::from_value(Value::Object(record))?)
}

/// Deserialize every record, skipping (and logging) ones that no longer fit
/// the type instead of failing the whole listing.
pub fn from_records<T: DeserializeOwned>(collection: &str, records: Vec<Record>) -> Vec<T> {
    records
        .into_iter()
        .filter_map(|r| match from_record(r) {
            Ok(v) => Some(v),
            Err(e) => {
                tracing::warn!(collection, error = %e, "skipping unreadable record");
                None
            }
        })
        .collect()
}

pub(crate) fn require_name(name: &str, what: &str) -> Result<String, PantryError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(PantryError::Validation(format!("{} name is empty", what)));
    }
    Ok(trimmed.to_string())
}
