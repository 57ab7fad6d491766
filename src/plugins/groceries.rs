//! Shopping list.

use crate::core::error::PantryError;
use crate::core::facade::SyncContext;
use crate::core::schemas::{GROCERIES, PANTRY};
use crate::core::time;
use crate::plugins::catalog::Category;
use crate::plugins::pantry::PantryItem;
use crate::plugins::{from_record, from_records, require_name, to_record};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroceryItem {
    pub id: String,
    pub name: String,
    pub category: Category,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub quantity: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
}

#[derive(Debug, Clone, Default)]
pub struct NewGroceryItem {
    pub name: String,
    pub category: Option<Category>,
    pub quantity: Option<String>,
    pub price: Option<f64>,
    pub notes: Option<String>,
}

/// Fields to change; `None` leaves a field as stored.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroceryPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
}

/// A name/category pair proposed by the assistant or a scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuggestedItem {
    pub name: String,
    pub category: Category,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClearOutcome {
    AlreadyEmpty,
    Cleared(usize),
}

fn check_price(price: Option<f64>) -> Result<(), PantryError> {
    match price {
        Some(p) if !p.is_finite() || p < 0.0 => {
            Err(PantryError::Validation(format!("invalid price {}", p)))
        }
        _ => Ok(()),
    }
}

pub fn add_item(ctx: &SyncContext, item: NewGroceryItem) -> Result<GroceryItem, PantryError> {
    check_price(item.price)?;
    let entity = GroceryItem {
        id: time::new_record_id(),
        name: require_name(&item.name, "item")?,
        category: item.category.unwrap_or(Category::Other),
        completed: false,
        quantity: item.quantity.unwrap_or_default(),
        notes: item.notes.unwrap_or_default(),
        price: item.price.filter(|p| *p > 0.0),
    };
    ctx.put_record(GROCERIES, to_record(&entity)?)?;
    Ok(entity)
}

pub fn get_item(ctx: &SyncContext, id: &str) -> Result<Option<GroceryItem>, PantryError> {
    ctx.get_record(GROCERIES, id)?
        .map(from_record::<GroceryItem>)
        .transpose()
}

/// Items ordered by `category_order`, then by creation.
pub fn list_items(ctx: &SyncContext, category_order: &[Category]) -> Result<Vec<GroceryItem>, PantryError> {
    let mut items: Vec<GroceryItem> = from_records(GROCERIES, ctx.get_all(GROCERIES)?);
    items.sort_by(|a, b| a.id.cmp(&b.id));
    items.sort_by_key(|i| i.category.rank(category_order));
    Ok(items)
}

pub fn update_item(ctx: &SyncContext, id: &str, patch: GroceryPatch) -> Result<GroceryItem, PantryError> {
    if let Some(name) = &patch.name {
        require_name(name, "item")?;
    }
    check_price(patch.price)?;
    let applied = ctx.update_record(GROCERIES, id, to_record(&patch)?)?;
    from_record(applied.record.unwrap_or_default())
}

pub fn toggle_item(ctx: &SyncContext, id: &str) -> Result<GroceryItem, PantryError> {
    let current = get_item(ctx, id)?
        .ok_or_else(|| PantryError::NotFound(format!("{}/{}", GROCERIES, id)))?;
    update_item(
        ctx,
        id,
        GroceryPatch {
            completed: Some(!current.completed),
            ..Default::default()
        },
    )
}

pub fn delete_item(ctx: &SyncContext, id: &str) -> Result<(), PantryError> {
    ctx.delete_record(GROCERIES, id)?;
    Ok(())
}

/// Delete every completed item, one delete per item. Returns how many.
pub fn clear_completed(ctx: &SyncContext) -> Result<usize, PantryError> {
    let completed: Vec<GroceryItem> = from_records::<GroceryItem>(GROCERIES, ctx.get_all(GROCERIES)?)
        .into_iter()
        .filter(|i| i.completed)
        .collect();
    for item in &completed {
        ctx.delete_record(GROCERIES, &item.id)?;
    }
    Ok(completed.len())
}

/// Empty the list with a single clear. An empty list queues nothing.
pub fn clear_all(ctx: &SyncContext) -> Result<ClearOutcome, PantryError> {
    let count = ctx.store().count(GROCERIES)?;
    if count == 0 {
        return Ok(ClearOutcome::AlreadyEmpty);
    }
    ctx.clear_collection(GROCERIES)?;
    Ok(ClearOutcome::Cleared(count))
}

/// Add suggested items that are not already on the list or in the pantry
/// (by case-insensitive name). Returns the items actually added.
pub fn add_generated_items(
    ctx: &SyncContext,
    suggestions: &[SuggestedItem],
) -> Result<Vec<GroceryItem>, PantryError> {
    let mut known: HashSet<String> = from_records::<GroceryItem>(GROCERIES, ctx.get_all(GROCERIES)?)
        .into_iter()
        .map(|i| i.name.to_lowercase())
        .collect();
    known.extend(
        from_records::<PantryItem>(PANTRY, ctx.get_all(PANTRY)?)
            .into_iter()
            .map(|i| i.name.to_lowercase()),
    );

    let mut added = Vec::new();
    for s in suggestions {
        if !known.insert(s.name.trim().to_lowercase()) {
            continue;
        }
        added.push(add_item(
            ctx,
            NewGroceryItem {
                name: s.name.clone(),
                category: Some(s.category),
                ..Default::default()
            },
        )?);
    }
    Ok(added)
}

/// Sum of known prices.
pub fn total_cost(items: &[GroceryItem]) -> f64 {
    items.iter().filter_map(|i| i.price).sum()
}

/// Budget left after `items`; negative when over budget. `None` without a budget.
pub fn budget_remaining(items: &[GroceryItem], budget: f64) -> Option<f64> {
    if budget <= 0.0 {
        return None;
    }
    Some(budget - total_cost(items))
}
