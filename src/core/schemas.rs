//! Centralized database schema definitions for the pantry store.
//!
//! Everything lives in one SQLite file:
//! 1. `collections`: declared collection names and their key fields.
//! 2. `records`: schema-free JSON documents keyed by (collection, key).
//! 3. `sync_queue`: the mutation outbox, ordered by an autoincrement sequence.

pub const STORE_DB_NAME: &str = "pantry.db";
pub const CONFIG_FILE_NAME: &str = "pantrysync.toml";

// --- Collection names ---
pub const GROCERIES: &str = "groceries";
pub const PANTRY: &str = "pantry";
pub const RECIPES: &str = "recipes";
pub const SETTINGS: &str = "settings";
pub const FAVORITE_SHOPS: &str = "favoriteShops";
pub const STORAGE_SPACES: &str = "storageSpaces";
pub const NEARBY_SHOPS_CACHE: &str = "nearbyShopsCache";

/// Every collection the application declares at open time, with its key field.
pub const KNOWN_COLLECTIONS: &[(&str, &str)] = &[
    (GROCERIES, "id"),
    (PANTRY, "id"),
    (RECIPES, "id"),
    (SETTINGS, "key"),
    (FAVORITE_SHOPS, "id"),
    (STORAGE_SPACES, "id"),
    (NEARBY_SHOPS_CACHE, "id"),
];

/// Collections that stay on this device and are never queued for sync.
pub const LOCAL_ONLY_COLLECTIONS: &[&str] = &[NEARBY_SHOPS_CACHE];

pub fn is_local_only(collection: &str) -> bool {
    LOCAL_ONLY_COLLECTIONS.contains(&collection)
}

// --- Schema v1 ---
pub const COLLECTIONS_SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS collections (
        name TEXT PRIMARY KEY,
        key_field TEXT NOT NULL
    )
";
pub const RECORDS_SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS records (
        collection TEXT NOT NULL,
        record_key TEXT NOT NULL,
        body TEXT NOT NULL,
        PRIMARY KEY (collection, record_key),
        FOREIGN KEY(collection) REFERENCES collections(name)
    )
";

// --- Schema v2 ---
pub const SYNC_QUEUE_SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS sync_queue (
        seq INTEGER PRIMARY KEY AUTOINCREMENT,
        kind TEXT NOT NULL,
        collection TEXT NOT NULL,
        payload TEXT NOT NULL,
        enqueued_at TEXT NOT NULL
    )
";

// --- Schema v3 ---
pub const RECORDS_UPDATED_AT_COLUMN: &str = "ALTER TABLE records ADD COLUMN updated_at TEXT";
