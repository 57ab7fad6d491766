//! Named places pantry items live in (fridge, cupboard, ...).

use crate::core::error::PantryError;
use crate::core::facade::SyncContext;
use crate::core::schemas::STORAGE_SPACES;
use crate::core::time;
use crate::plugins::pantry::{self, PantryItem};
use crate::plugins::{from_records, require_name, to_record};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageSpace {
    pub id: String,
    pub name: String,
}

pub fn add_space(ctx: &SyncContext, name: &str) -> Result<StorageSpace, PantryError> {
    let space = StorageSpace {
        id: time::new_record_id(),
        name: require_name(name, "storage space")?,
    };
    ctx.put_record(STORAGE_SPACES, to_record(&space)?)?;
    Ok(space)
}

pub fn list_spaces(ctx: &SyncContext) -> Result<Vec<StorageSpace>, PantryError> {
    let mut spaces: Vec<StorageSpace> = from_records(STORAGE_SPACES, ctx.get_all(STORAGE_SPACES)?);
    spaces.sort_by(|a, b| a.id.cmp(&b.id));
    Ok(spaces)
}

/// Items currently assigned to `space_id`.
pub fn items_in(ctx: &SyncContext, space_id: &str) -> Result<Vec<PantryItem>, PantryError> {
    Ok(pantry::list_items(ctx)?
        .into_iter()
        .filter(|i| i.storage_id.as_deref() == Some(space_id))
        .collect())
}

/// Unassign every pantry item in the space, then delete the space. Each
/// unassignment is its own mutation. Returns the number of items unassigned.
pub fn delete_space(ctx: &SyncContext, space_id: &str) -> Result<usize, PantryError> {
    let assigned = items_in(ctx, space_id)?;
    for item in &assigned {
        pantry::unassign_storage(ctx, &item.id)?;
    }
    ctx.delete_record(STORAGE_SPACES, space_id)?;
    debug!(space_id, unassigned = assigned.len(), "storage space deleted");
    Ok(assigned.len())
}
