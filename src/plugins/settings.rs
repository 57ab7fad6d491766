//! User preferences stored as `{key, value}` records.

use crate::core::error::PantryError;
use crate::core::facade::{Applied, SyncContext};
use crate::core::schemas::SETTINGS;
use crate::plugins::catalog::{Category, DEFAULT_CATEGORY_ORDER};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use tracing::warn;

pub const THEME: &str = "theme";
pub const LANGUAGE: &str = "language";
pub const DIETARY_PREFERENCE: &str = "dietaryPreference";
pub const CATEGORY_ORDER: &str = "categoryOrder";
pub const BUDGET: &str = "budget";

pub const SETTING_KEYS: [&str; 5] = [THEME, LANGUAGE, DIETARY_PREFERENCE, CATEGORY_ORDER, BUDGET];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
    #[default]
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Language {
    #[default]
    #[serde(rename = "en")]
    English,
    #[serde(rename = "ml")]
    Malayalam,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DietaryPreference {
    #[default]
    None,
    Vegetarian,
    Vegan,
    #[serde(rename = "Gluten-Free")]
    GlutenFree,
}

/// Parse through the serde name so the CLI accepts exactly what is stored.
fn parse_wire<T: DeserializeOwned>(raw: &str, what: &str) -> Result<T, PantryError> {
    serde_json::from_value(Value::String(raw.trim().to_string()))
        .map_err(|_| PantryError::Validation(format!("invalid {} '{}'", what, raw)))
}

fn wire_name<T: Serialize>(v: &T) -> String {
    match serde_json::to_value(v) {
        Ok(Value::String(s)) => s,
        _ => String::new(),
    }
}

macro_rules! wire_enum {
    ($ty:ty, $what:literal) => {
        impl FromStr for $ty {
            type Err = PantryError;
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                parse_wire(s, $what)
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&wire_name(self))
            }
        }
    };
}

wire_enum!(Theme, "theme");
wire_enum!(Language, "language");
wire_enum!(DietaryPreference, "dietary preference");

/// Every preference with its default filled in.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub theme: Theme,
    pub language: Language,
    pub dietary_preference: DietaryPreference,
    pub category_order: Vec<Category>,
    pub budget: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            theme: Theme::default(),
            language: Language::default(),
            dietary_preference: DietaryPreference::default(),
            category_order: DEFAULT_CATEGORY_ORDER.to_vec(),
            budget: 0.0,
        }
    }
}

fn read_value<T: DeserializeOwned>(key: &str, value: &Value, slot: &mut T) {
    match serde_json::from_value(value.clone()) {
        Ok(v) => *slot = v,
        Err(e) => warn!(key, error = %e, "ignoring unreadable setting"),
    }
}

impl Settings {
    /// Read the settings collection. Missing or unreadable keys keep their
    /// defaults; unknown keys are ignored.
    pub fn load(ctx: &SyncContext) -> Result<Self, PantryError> {
        let mut out = Settings::default();
        for record in ctx.get_all(SETTINGS)? {
            let (Some(Value::String(key)), Some(value)) = (record.get("key"), record.get("value"))
            else {
                continue;
            };
            match key.as_str() {
                THEME => read_value(key, value, &mut out.theme),
                LANGUAGE => read_value(key, value, &mut out.language),
                DIETARY_PREFERENCE => read_value(key, value, &mut out.dietary_preference),
                CATEGORY_ORDER => read_value(key, value, &mut out.category_order),
                BUDGET => read_value(key, value, &mut out.budget),
                _ => {}
            }
        }
        Ok(out)
    }
}

/// One preference change.
#[derive(Debug, Clone, PartialEq)]
pub enum Setting {
    Theme(Theme),
    Language(Language),
    DietaryPreference(DietaryPreference),
    CategoryOrder(Vec<Category>),
    Budget(f64),
}

impl Setting {
    /// Parse a CLI-style `key value` pair. Category orders are comma-separated.
    pub fn parse(key: &str, raw: &str) -> Result<Self, PantryError> {
        match key {
            THEME => Ok(Setting::Theme(raw.parse()?)),
            LANGUAGE => Ok(Setting::Language(raw.parse()?)),
            DIETARY_PREFERENCE => Ok(Setting::DietaryPreference(raw.parse()?)),
            CATEGORY_ORDER => {
                let order = raw
                    .split(',')
                    .filter(|s| !s.trim().is_empty())
                    .map(str::parse)
                    .collect::<Result<Vec<Category>, _>>()?;
                Setting::category_order(order)
            }
            BUDGET => {
                let amount: f64 = raw
                    .trim()
                    .parse()
                    .map_err(|_| PantryError::Validation(format!("invalid budget '{}'", raw)))?;
                Setting::budget(amount)
            }
            other => Err(PantryError::Validation(format!(
                "unknown setting '{}' (expected one of: {})",
                other,
                SETTING_KEYS.join(", ")
            ))),
        }
    }

    pub fn category_order(order: Vec<Category>) -> Result<Self, PantryError> {
        let mut seen = Vec::with_capacity(order.len());
        for c in order {
            if seen.contains(&c) {
                return Err(PantryError::Validation(format!("category '{}' listed twice", c)));
            }
            seen.push(c);
        }
        Ok(Setting::CategoryOrder(seen))
    }

    pub fn budget(amount: f64) -> Result<Self, PantryError> {
        if !amount.is_finite() || amount < 0.0 {
            return Err(PantryError::Validation(format!("invalid budget {}", amount)));
        }
        Ok(Setting::Budget(amount))
    }

    pub fn key(&self) -> &'static str {
        match self {
            Setting::Theme(_) => THEME,
            Setting::Language(_) => LANGUAGE,
            Setting::DietaryPreference(_) => DIETARY_PREFERENCE,
            Setting::CategoryOrder(_) => CATEGORY_ORDER,
            Setting::Budget(_) => BUDGET,
        }
    }

    pub fn value(&self) -> Result<Value, PantryError> {
        Ok(match self {
            Setting::Theme(v) => serde_json::to_value(v)?,
            Setting::Language(v) => serde_json::to_value(v)?,
            Setting::DietaryPreference(v) => serde_json::to_value(v)?,
            Setting::CategoryOrder(v) => serde_json::to_value(v)?,
            Setting::Budget(v) => serde_json::to_value(v)?,
        })
    }

    pub fn apply(&self, ctx: &SyncContext) -> Result<Applied, PantryError> {
        ctx.set_setting(self.key(), self.value()?)
    }
}
