//! Core inventory types.

use serde::{Deserialize, Serialize};

/// A single pantry entry.
///
/// The `name` is the document key in the store, so at most one item exists
/// per distinct name. Names are case-preserving.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InventoryItem {
    /// Unique item name (document key).
    pub name: String,
    /// How many of this item are on hand.
    pub quantity: u32,
}

impl InventoryItem {
    /// Create a new item.
    #[must_use]
    pub fn new(name: impl Into<String>, quantity: u32) -> Self {
        Self {
            name: name.into(),
            quantity,
        }
    }

    /// The name as shown to the user: first character upper-cased, the rest
    /// untouched.
    #[must_use]
    pub fn display_name(&self) -> String {
        let mut chars = self.name.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        }
    }
}

impl std::fmt::Display for InventoryItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.display_name(), self.quantity)
    }
}
