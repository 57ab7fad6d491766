//! Saved recipes.

use crate::core::error::PantryError;
use crate::core::facade::SyncContext;
use crate::core::schemas::RECIPES;
use crate::core::time;
use crate::plugins::{from_records, require_name, to_record};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipe {
    #[serde(default)]
    pub id: String,
    pub recipe_name: String,
    #[serde(default)]
    pub ingredients: Vec<String>,
    #[serde(default)]
    pub instructions: Vec<String>,
    #[serde(default)]
    pub is_saved: bool,
}

/// A recipe as written by the user or imported, before it has an id.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeDraft {
    pub recipe_name: String,
    #[serde(default)]
    pub ingredients: Vec<String>,
    #[serde(default)]
    pub instructions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SaveOutcome {
    Saved(Recipe),
    AlreadySaved,
}

pub fn list_recipes(ctx: &SyncContext) -> Result<Vec<Recipe>, PantryError> {
    let mut recipes: Vec<Recipe> = from_records(RECIPES, ctx.get_all(RECIPES)?);
    // Newest first.
    recipes.sort_by(|a, b| b.id.cmp(&a.id));
    Ok(recipes)
}

pub fn find_by_name(ctx: &SyncContext, name: &str) -> Result<Option<Recipe>, PantryError> {
    let needle = name.trim().to_lowercase();
    Ok(list_recipes(ctx)?
        .into_iter()
        .find(|r| r.recipe_name.trim().to_lowercase() == needle))
}

/// Save a suggested recipe unless one with exactly the same name is
/// already saved. Imports match names ignoring case; see [`import`].
pub fn save_recipe(ctx: &SyncContext, recipe: Recipe) -> Result<SaveOutcome, PantryError> {
    let name = require_name(&recipe.recipe_name, "recipe")?;
    if list_recipes(ctx)?.iter().any(|r| r.recipe_name == name) {
        return Ok(SaveOutcome::AlreadySaved);
    }
    let entity = Recipe {
        id: if recipe.id.is_empty() {
            time::new_record_id()
        } else {
            recipe.id
        },
        recipe_name: name,
        is_saved: true,
        ..recipe
    };
    ctx.put_record(RECIPES, to_record(&entity)?)?;
    Ok(SaveOutcome::Saved(entity))
}

/// Save a user-written recipe under a fresh id.
pub fn save_new(ctx: &SyncContext, draft: RecipeDraft) -> Result<Recipe, PantryError> {
    let entity = Recipe {
        id: time::new_record_id(),
        recipe_name: require_name(&draft.recipe_name, "recipe")?,
        ingredients: draft.ingredients,
        instructions: draft.instructions,
        is_saved: true,
    };
    ctx.put_record(RECIPES, to_record(&entity)?)?;
    Ok(entity)
}

/// Import a recipe unless the cookbook already has one by that name.
pub fn import(ctx: &SyncContext, draft: RecipeDraft) -> Result<SaveOutcome, PantryError> {
    if find_by_name(ctx, &draft.recipe_name)?.is_some() {
        return Ok(SaveOutcome::AlreadySaved);
    }
    save_new(ctx, draft).map(SaveOutcome::Saved)
}

pub fn delete_recipe(ctx: &SyncContext, id: &str) -> Result<(), PantryError> {
    ctx.delete_record(RECIPES, id)?;
    Ok(())
}
