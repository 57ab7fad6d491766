//! Collections, records, and per-collection key extraction.

use crate::core::error::PantryError;
use crate::core::schemas;
use regex::Regex;
use rustc_hash::FxHashMap;
use serde_json::{Map, Value};
use std::sync::LazyLock;

/// A schema-free document. The store only ever looks at the key field.
pub type Record = Map<String, Value>;

static COLLECTION_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9_]*$").expect("static regex"));

pub fn validate_collection_name(name: &str) -> Result<(), PantryError> {
    if COLLECTION_NAME.is_match(name) {
        Ok(())
    } else {
        Err(PantryError::Validation(format!(
            "invalid collection name '{}'",
            name
        )))
    }
}

/// A named partition of records sharing one key field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionSpec {
    pub name: String,
    pub key_field: String,
}

impl CollectionSpec {
    pub fn new(name: &str, key_field: &str) -> Result<Self, PantryError> {
        validate_collection_name(name)?;
        if key_field.is_empty() {
            return Err(PantryError::Validation(format!(
                "collection '{}' needs a key field",
                name
            )));
        }
        Ok(Self {
            name: name.to_string(),
            key_field: key_field.to_string(),
        })
    }

    /// Extract the primary key. Strings are used as-is, numbers by their
    /// decimal text; anything else is rejected.
    pub fn extract_key(&self, record: &Record) -> Result<String, PantryError> {
        match record.get(&self.key_field) {
            Some(Value::String(s)) if !s.is_empty() => Ok(s.clone()),
            Some(Value::Number(n)) => Ok(n.to_string()),
            Some(_) => Err(self.invalid(format!(
                "key field '{}' must be a non-empty string or a number",
                self.key_field
            ))),
            None => Err(self.invalid(format!("missing key field '{}'", self.key_field))),
        }
    }

    /// Payload identifying a single record, e.g. `{"id": "42"}`.
    pub fn key_payload(&self, key: &str) -> Value {
        let mut m = Map::new();
        m.insert(self.key_field.clone(), Value::String(key.to_string()));
        Value::Object(m)
    }

    fn invalid(&self, reason: String) -> PantryError {
        PantryError::InvalidRecord {
            collection: self.name.clone(),
            reason,
        }
    }
}

/// The set of collections a store declares, keyed by name.
#[derive(Debug, Clone, Default)]
pub struct CollectionRegistry {
    specs: FxHashMap<String, CollectionSpec>,
}

impl CollectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry of every collection the application uses.
    pub fn standard() -> Self {
        let mut reg = Self::new();
        for (name, key_field) in schemas::KNOWN_COLLECTIONS {
            reg.specs.insert(
                name.to_string(),
                CollectionSpec {
                    name: name.to_string(),
                    key_field: key_field.to_string(),
                },
            );
        }
        reg
    }

    pub fn declare(&mut self, spec: CollectionSpec) -> Result<(), PantryError> {
        if let Some(existing) = self.specs.get(&spec.name) {
            if existing.key_field != spec.key_field {
                return Err(PantryError::SchemaMismatch(format!(
                    "collection '{}' is keyed by '{}', not '{}'",
                    spec.name, existing.key_field, spec.key_field
                )));
            }
            return Ok(());
        }
        self.specs.insert(spec.name.clone(), spec);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<&CollectionSpec, PantryError> {
        self.specs
            .get(name)
            .ok_or_else(|| PantryError::UnknownCollection(name.to_string()))
    }

    /// Specs sorted by name.
    pub fn specs(&self) -> Vec<&CollectionSpec> {
        let mut out: Vec<_> = self.specs.values().collect();
        out.sort_by(|a, b| a.name.cmp(&b.name));
        out
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}
