//! `pantry` - A single-user pantry inventory tracker
//!
//! This library keeps a list of pantry items and their quantities in a
//! document store, reconciles the displayed inventory with the store after
//! every change, and proxies recipe suggestions to a text-completion API.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod cli;
pub mod config;
pub mod controller;
pub mod error;
pub mod item;
pub mod logging;
pub mod recipe;
pub mod server;
pub mod store;

pub use config::Config;
pub use controller::{InventoryController, RemoveMode};
pub use error::{Error, Result};
pub use item::InventoryItem;
pub use logging::init_logging;
pub use recipe::RecipeService;
pub use store::{InventoryStore, StoreError};
