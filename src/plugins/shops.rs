//! Favorite shops and the last nearby-shops search.

use crate::core::error::PantryError;
use crate::core::facade::SyncContext;
use crate::core::schemas::{FAVORITE_SHOPS, NEARBY_SHOPS_CACHE};
use crate::plugins::{from_record, from_records, require_name, to_record};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Key of the single nearby-shops cache entry.
pub const NEARBY_CACHE_KEY: &str = "lastResult";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Shop {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub rating: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opening_hours: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_favorite: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NearbyShopsCache {
    pub id: String,
    pub shops: Vec<Shop>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShopOrder {
    #[default]
    AsFound,
    Rating,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FavoriteToggle {
    Added(Shop),
    Removed(String),
}

pub fn list_favorites(ctx: &SyncContext, order: ShopOrder) -> Result<Vec<Shop>, PantryError> {
    let mut shops: Vec<Shop> = from_records(FAVORITE_SHOPS, ctx.get_all(FAVORITE_SHOPS)?);
    sort_shops(&mut shops, order);
    Ok(shops)
}

pub fn sort_shops(shops: &mut [Shop], order: ShopOrder) {
    if order == ShopOrder::Rating {
        shops.sort_by(|a, b| b.rating.total_cmp(&a.rating));
    }
}

/// Unfavorite a favorited shop, otherwise favorite it.
pub fn toggle_favorite(ctx: &SyncContext, shop: Shop) -> Result<FavoriteToggle, PantryError> {
    if ctx.get_record(FAVORITE_SHOPS, &shop.id)?.is_some() {
        ctx.delete_record(FAVORITE_SHOPS, &shop.id)?;
        return Ok(FavoriteToggle::Removed(shop.id));
    }
    require_name(&shop.name, "shop")?;
    let favorite = Shop {
        is_favorite: Some(true),
        ..shop
    };
    ctx.put_record(FAVORITE_SHOPS, to_record(&favorite)?)?;
    Ok(FavoriteToggle::Added(favorite))
}

/// Replace the cached search result. The cache is device-local and never
/// synced.
pub fn cache_nearby(ctx: &SyncContext, shops: Vec<Shop>) -> Result<NearbyShopsCache, PantryError> {
    let cache = NearbyShopsCache {
        id: NEARBY_CACHE_KEY.to_string(),
        shops,
        timestamp: Utc::now(),
    };
    ctx.cache_record(NEARBY_SHOPS_CACHE, to_record(&cache)?)?;
    Ok(cache)
}

/// The last search result, with each shop's favorite flag refreshed from
/// the favorites collection.
pub fn cached_nearby(ctx: &SyncContext) -> Result<Option<NearbyShopsCache>, PantryError> {
    let Some(record) = ctx.get_record(NEARBY_SHOPS_CACHE, NEARBY_CACHE_KEY)? else {
        return Ok(None);
    };
    let mut cache: NearbyShopsCache = from_record(record)?;
    let favorites: HashSet<String> = list_favorites(ctx, ShopOrder::AsFound)?
        .into_iter()
        .map(|s| s.id)
        .collect();
    for shop in &mut cache.shops {
        shop.is_favorite = Some(favorites.contains(&shop.id));
    }
    Ok(Some(cache))
}
