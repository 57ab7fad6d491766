//! Pantry inventory.

use crate::core::error::PantryError;
use crate::core::facade::SyncContext;
use crate::core::schemas::PANTRY;
use crate::core::time;
use crate::plugins::catalog::Category;
use crate::plugins::groceries::{self, GroceryItem, NewGroceryItem, SuggestedItem};
use crate::plugins::{from_record, from_records, require_name, to_record};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

pub const EXPIRY_DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PantryStatus {
    #[default]
    Stocked,
    Low,
}

impl PantryStatus {
    pub fn toggled(self) -> Self {
        match self {
            PantryStatus::Stocked => PantryStatus::Low,
            PantryStatus::Low => PantryStatus::Stocked,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PantryItem {
    pub id: String,
    pub name: String,
    pub category: Category,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry_date: Option<String>,
    #[serde(default)]
    pub status: PantryStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_id: Option<String>,
}

impl PantryItem {
    /// Parsed expiry date. Unparseable dates count as none.
    pub fn expiry(&self) -> Option<NaiveDate> {
        self.expiry_date
            .as_deref()
            .and_then(|d| NaiveDate::parse_from_str(d, EXPIRY_DATE_FORMAT).ok())
    }

    /// Whole days from `today` until expiry; negative once expired.
    pub fn days_until_expiry(&self, today: NaiveDate) -> Option<i64> {
        self.expiry().map(|d| (d - today).num_days())
    }

    pub fn freshness(&self, today: NaiveDate) -> Freshness {
        match self.days_until_expiry(today) {
            None => Freshness::Undated,
            Some(d) if d < 0 => Freshness::Expired { days_ago: -d },
            Some(0) => Freshness::ExpiresToday,
            Some(d) if d <= 3 => Freshness::ExpiringSoon { days: d },
            Some(d) if d <= 7 => Freshness::ExpiringThisWeek { days: d },
            Some(_) => Freshness::Fresh,
        }
    }
}

/// How close an item is to its expiry date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    Undated,
    Expired { days_ago: i64 },
    ExpiresToday,
    ExpiringSoon { days: i64 },
    ExpiringThisWeek { days: i64 },
    Fresh,
}

#[derive(Debug, Clone, Default)]
pub struct NewPantryItem {
    pub name: String,
    pub category: Option<Category>,
    pub expiry_date: Option<String>,
    pub storage_id: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PantryPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiry_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<PantryStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_id: Option<String>,
}

fn check_expiry(date: Option<&str>) -> Result<(), PantryError> {
    if let Some(d) = date {
        NaiveDate::parse_from_str(d, EXPIRY_DATE_FORMAT).map_err(|e| {
            PantryError::Validation(format!("expiry date '{}' is not YYYY-MM-DD: {}", d, e))
        })?;
    }
    Ok(())
}

pub fn add_item(ctx: &SyncContext, item: NewPantryItem) -> Result<PantryItem, PantryError> {
    let expiry_date = item.expiry_date.filter(|d| !d.trim().is_empty());
    check_expiry(expiry_date.as_deref())?;
    let entity = PantryItem {
        id: time::new_record_id(),
        name: require_name(&item.name, "pantry item")?,
        category: item.category.unwrap_or(Category::Other),
        expiry_date,
        status: PantryStatus::Stocked,
        storage_id: item.storage_id.filter(|s| !s.is_empty()),
    };
    ctx.put_record(PANTRY, to_record(&entity)?)?;
    Ok(entity)
}

pub fn get_item(ctx: &SyncContext, id: &str) -> Result<Option<PantryItem>, PantryError> {
    ctx.get_record(PANTRY, id)?
        .map(from_record::<PantryItem>)
        .transpose()
}

pub fn list_items(ctx: &SyncContext) -> Result<Vec<PantryItem>, PantryError> {
    let mut items: Vec<PantryItem> = from_records(PANTRY, ctx.get_all(PANTRY)?);
    items.sort_by(|a, b| a.id.cmp(&b.id));
    Ok(items)
}

pub fn update_item(ctx: &SyncContext, id: &str, patch: PantryPatch) -> Result<PantryItem, PantryError> {
    if let Some(name) = &patch.name {
        require_name(name, "pantry item")?;
    }
    check_expiry(patch.expiry_date.as_deref())?;
    let applied = ctx.update_record(PANTRY, id, to_record(&patch)?)?;
    from_record(applied.record.unwrap_or_default())
}

/// Flip between `stocked` and `low`.
pub fn toggle_status(ctx: &SyncContext, id: &str) -> Result<PantryItem, PantryError> {
    let current =
        get_item(ctx, id)?.ok_or_else(|| PantryError::NotFound(format!("{}/{}", PANTRY, id)))?;
    update_item(
        ctx,
        id,
        PantryPatch {
            status: Some(current.status.toggled()),
            ..Default::default()
        },
    )
}

/// Detach an item from its storage space. A merge cannot drop a field, so
/// the stored record is rewritten without `storageId`, keeping every other
/// field even ones this type does not know.
pub fn unassign_storage(ctx: &SyncContext, id: &str) -> Result<PantryItem, PantryError> {
    let mut record = ctx
        .get_record(PANTRY, id)?
        .ok_or_else(|| PantryError::NotFound(format!("{}/{}", PANTRY, id)))?;
    record.remove("storageId");
    ctx.put_record(PANTRY, record.clone())?;
    from_record(record)
}

pub fn delete_item(ctx: &SyncContext, id: &str) -> Result<(), PantryError> {
    ctx.delete_record(PANTRY, id)?;
    Ok(())
}

/// Put the item on the shopping list, then drop it from the pantry. If the
/// pantry delete fails the grocery item stays.
pub fn move_to_shopping_list(ctx: &SyncContext, id: &str) -> Result<GroceryItem, PantryError> {
    let item =
        get_item(ctx, id)?.ok_or_else(|| PantryError::NotFound(format!("{}/{}", PANTRY, id)))?;
    let grocery = groceries::add_item(
        ctx,
        NewGroceryItem {
            name: item.name.clone(),
            category: Some(item.category),
            ..Default::default()
        },
    )?;
    ctx.delete_record(PANTRY, &item.id)?;
    Ok(grocery)
}

/// Scan results not already in the pantry (case-insensitive name).
pub fn unseen_scanned(ctx: &SyncContext, scanned: &[SuggestedItem]) -> Result<Vec<SuggestedItem>, PantryError> {
    let mut known: HashSet<String> = list_items(ctx)?
        .into_iter()
        .map(|i| i.name.to_lowercase())
        .collect();
    Ok(scanned
        .iter()
        .filter(|s| known.insert(s.name.trim().to_lowercase()))
        .cloned()
        .collect())
}

/// Add reviewed scan results as stocked items, skipping duplicates.
pub fn confirm_scanned(ctx: &SyncContext, scanned: &[SuggestedItem]) -> Result<Vec<PantryItem>, PantryError> {
    unseen_scanned(ctx, scanned)?
        .into_iter()
        .map(|s| {
            add_item(
                ctx,
                NewPantryItem {
                    name: s.name,
                    category: Some(s.category),
                    ..Default::default()
                },
            )
        })
        .collect()
}

/// Items expiring between `today` and `today + days`, soonest first.
/// Already-expired items are left out.
pub fn expiring_within(items: &[PantryItem], today: NaiveDate, days: i64) -> Vec<PantryItem> {
    let mut out: Vec<(i64, PantryItem)> = items
        .iter()
        .filter_map(|i| i.days_until_expiry(today).map(|d| (d, i.clone())))
        .filter(|(d, _)| (0..=days).contains(d))
        .collect();
    out.sort_by_key(|(d, _)| *d);
    out.into_iter().map(|(_, i)| i).collect()
}
