//! Turns assistant output into list changes.
//!
//! Replies carry at most one action block:
//!
//! ```text
//! Sure. [ACTION]{"action":"add_items","items":[{"name":"Milk","category":"Dairy & Eggs"}]}[/ACTION]
//! ```
//!
//! Models sometimes close the block with a second `[ACTION]`; that is
//! accepted too. A block that is not valid JSON leaves the reply as text.

use crate::core::error::PantryError;
use crate::core::facade::SyncContext;
use crate::plugins::catalog::Category;
use crate::plugins::groceries::{self, GroceryItem, SuggestedItem};
use crate::plugins::recipes::{self, Recipe, SaveOutcome};
use regex::Regex;
use serde::Deserialize;
use std::sync::LazyLock;
use tracing::{debug, warn};

static ACTION_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)\[ACTION\](.*?)\[/?ACTION\]").expect("static regex")
});

const EMPTY_TEXT: &str = "Done! Here are the details:";

#[derive(Debug, Clone, PartialEq)]
pub enum AssistantReply {
    Text(String),
    AddItems {
        text: String,
        items: Vec<SuggestedItem>,
    },
    SuggestRecipe {
        text: String,
        recipe: Recipe,
    },
}

impl AssistantReply {
    pub fn text(&self) -> &str {
        match self {
            AssistantReply::Text(t) => t,
            AssistantReply::AddItems { text, .. } => text,
            AssistantReply::SuggestRecipe { text, .. } => text,
        }
    }
}

#[derive(Debug, Deserialize)]
struct WireItem {
    name: String,
    #[serde(default)]
    category: String,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
enum WireAction {
    AddItems { items: Vec<WireItem> },
    SuggestRecipe { recipe: Recipe },
}

pub fn parse_reply(raw: &str) -> AssistantReply {
    let Some(caps) = ACTION_BLOCK.captures(raw) else {
        return AssistantReply::Text(raw.trim().to_string());
    };
    let body = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
    let action: WireAction = match serde_json::from_str(body.trim()) {
        Ok(a) => a,
        Err(e) => {
            warn!(error = %e, "assistant action block is not valid JSON");
            return AssistantReply::Text(raw.trim().to_string());
        }
    };

    let stripped = ACTION_BLOCK.replace(raw, "");
    let text = match stripped.trim() {
        "" => EMPTY_TEXT.to_string(),
        t => t.to_string(),
    };
    match action {
        WireAction::AddItems { items } => AssistantReply::AddItems {
            text,
            items: items
                .into_iter()
                .filter(|i| !i.name.trim().is_empty())
                .map(|i| SuggestedItem {
                    category: i.category.parse().unwrap_or(Category::Other),
                    name: i.name.trim().to_string(),
                })
                .collect(),
        },
        WireAction::SuggestRecipe { recipe } => AssistantReply::SuggestRecipe { text, recipe },
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReplyEffect {
    None,
    ItemsAdded(Vec<GroceryItem>),
    Recipe(SaveOutcome),
}

/// Carry out the reply's action through the normal plugin paths.
pub fn apply_reply(ctx: &SyncContext, reply: &AssistantReply) -> Result<ReplyEffect, PantryError> {
    let effect = match reply {
        AssistantReply::Text(_) => ReplyEffect::None,
        AssistantReply::AddItems { items, .. } => {
            ReplyEffect::ItemsAdded(groceries::add_generated_items(ctx, items)?)
        }
        AssistantReply::SuggestRecipe { recipe, .. } => {
            ReplyEffect::Recipe(recipes::save_recipe(ctx, recipe.clone())?)
        }
    };
    debug!(?effect, "assistant reply applied");
    Ok(effect)
}

/// Put a suggested recipe's ingredients on the shopping list, filed under
/// `Other`. Names already on the list or in the pantry are skipped.
pub fn add_recipe_ingredients(ctx: &SyncContext, recipe: &Recipe) -> Result<Vec<GroceryItem>, PantryError> {
    let items: Vec<SuggestedItem> = recipe
        .ingredients
        .iter()
        .filter(|i| !i.trim().is_empty())
        .map(|i| SuggestedItem {
            name: i.trim().to_string(),
            category: Category::Other,
        })
        .collect();
    let added = groceries::add_generated_items(ctx, &items)?;
    debug!(recipe = %recipe.recipe_name, added = added.len(), "recipe ingredients added");
    Ok(added)
}
