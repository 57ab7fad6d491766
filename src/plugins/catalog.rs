//! Grocery categories.

use crate::core::error::PantryError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Produce,
    #[serde(rename = "Dairy & Eggs")]
    Dairy,
    #[serde(rename = "Meat & Seafood")]
    Meat,
    #[serde(rename = "Bakery & Bread")]
    Bakery,
    #[serde(rename = "Pantry Staples")]
    Pantry,
    #[serde(rename = "Frozen Foods")]
    Frozen,
    #[serde(rename = "Beverages")]
    Drinks,
    Other,
}

pub const DEFAULT_CATEGORY_ORDER: [Category; 8] = [
    Category::Produce,
    Category::Dairy,
    Category::Meat,
    Category::Bakery,
    Category::Pantry,
    Category::Frozen,
    Category::Drinks,
    Category::Other,
];

impl Category {
    pub fn label(&self) -> &'static str {
        match self {
            Category::Produce => "Produce",
            Category::Dairy => "Dairy & Eggs",
            Category::Meat => "Meat & Seafood",
            Category::Bakery => "Bakery & Bread",
            Category::Pantry => "Pantry Staples",
            Category::Frozen => "Frozen Foods",
            Category::Drinks => "Beverages",
            Category::Other => "Other",
        }
    }

    /// Position in `order`; categories missing from it sort last.
    pub fn rank(&self, order: &[Category]) -> usize {
        order.iter().position(|c| c == self).unwrap_or(order.len())
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Category {
    type Err = PantryError;

    /// Accepts the display label or the short variant name, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_lowercase();
        DEFAULT_CATEGORY_ORDER
            .iter()
            .copied()
            .find(|c| {
                c.label().to_lowercase() == needle || format!("{:?}", c).to_lowercase() == needle
            })
            .ok_or_else(|| PantryError::Validation(format!("unknown category '{}'", s)))
    }
}
