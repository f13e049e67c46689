//! Inventory controller.
//!
//! Holds the in-memory view of the pantry and exposes the mutation commands
//! used by the CLI, the server and tests. Every mutation is followed by a
//! full reload of the store (`resynchronize`), so the view is always a
//! complete snapshot as of the last reconciliation. Nothing is updated
//! optimistically.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::error::{Error, Result};
use crate::item::InventoryItem;
use crate::store::{InventoryStore, StoreResult};

/// Quantity used by `add_item` when none (or a non-positive one) is given.
pub const DEFAULT_ADD_QUANTITY: u32 = 1;

/// How `remove_item` treats an existing record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemoveMode {
    /// Delete the record regardless of its quantity.
    Hard,
    /// Take one away; delete the record once nothing would be left.
    #[default]
    Decrement,
}

impl fmt::Display for RemoveMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hard => write!(f, "hard"),
            Self::Decrement => write!(f, "decrement"),
        }
    }
}

/// Owns the displayed inventory and drives all mutations through the store.
pub struct InventoryController {
    store: Arc<dyn InventoryStore>,
    view: Vec<InventoryItem>,
    remove_mode: RemoveMode,
}

impl fmt::Debug for InventoryController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InventoryController")
            .field("view", &self.view)
            .field("remove_mode", &self.remove_mode)
            .finish_non_exhaustive()
    }
}

impl InventoryController {
    /// Create a controller with an empty view. Call [`refresh`](Self::refresh)
    /// (or use [`load`](Self::load)) before reading the view.
    #[must_use]
    pub fn new(store: Arc<dyn InventoryStore>, remove_mode: RemoveMode) -> Self {
        Self {
            store,
            view: Vec::new(),
            remove_mode,
        }
    }

    /// Create a controller and perform the startup refresh.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OperationFailed`] if the store cannot be listed.
    pub async fn load(store: Arc<dyn InventoryStore>, remove_mode: RemoveMode) -> Result<Self> {
        let mut controller = Self::new(store, remove_mode);
        controller.refresh().await?;
        Ok(controller)
    }

    /// The current snapshot, in store order.
    #[must_use]
    pub fn view(&self) -> &[InventoryItem] {
        &self.view
    }

    /// Look up an item in the current snapshot (no store access).
    #[must_use]
    pub fn item(&self, name: &str) -> Option<&InventoryItem> {
        self.view.iter().find(|item| item.name == name)
    }

    /// The snapshot sorted by name for display.
    #[must_use]
    pub fn sorted_view(&self) -> Vec<InventoryItem> {
        let mut items = self.view.clone();
        items.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
        items
    }

    /// Item names joined with `", "`, as sent to the recipe endpoint.
    #[must_use]
    pub fn pantry_items(&self) -> String {
        self.view
            .iter()
            .map(|item| item.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// The removal policy used by [`remove_item`](Self::remove_item).
    #[must_use]
    pub fn remove_mode(&self) -> RemoveMode {
        self.remove_mode
    }

    /// Replace the view with the store's full contents.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OperationFailed`] if the store cannot be listed. The
    /// previous view is kept in that case.
    #[instrument(skip(self))]
    pub async fn refresh(&mut self) -> Result<()> {
        let items = self
            .store
            .list_all()
            .await
            .map_err(|source| Error::operation_failed("refresh", source))?;

        debug!("Inventory refreshed with {} items", items.len());
        self.view = items;
        Ok(())
    }

    /// Add `quantity` of `name`, creating the record if needed.
    ///
    /// A blank name (empty or whitespace only) is ignored and `Ok(false)` is
    /// returned without touching the store. A missing or non-positive
    /// quantity counts as [`DEFAULT_ADD_QUANTITY`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::OperationFailed`] if the store fails. The view is
    /// refreshed either way.
    #[instrument(skip(self))]
    pub async fn add_item(&mut self, name: &str, quantity: Option<i64>) -> Result<bool> {
        if name.trim().is_empty() {
            debug!("Ignoring add with empty name");
            return Ok(false);
        }
        let quantity = normalize_add_quantity(quantity);

        let outcome = self.add_to_store(name, quantity).await;
        self.resynchronize("add_item", outcome).await?;

        info!("Added {quantity} x {name}");
        Ok(true)
    }

    async fn add_to_store(&self, name: &str, quantity: u32) -> StoreResult<()> {
        let total = match self.store.get(name).await? {
            Some(existing) => existing.quantity.saturating_add(quantity),
            None => quantity,
        };
        self.store.upsert(name, total).await
    }

    /// Set the quantity of `name` to exactly `quantity`.
    ///
    /// The record is written whether or not it existed, so this can create
    /// an item. A blank name (empty or whitespace only) or a negative
    /// quantity is ignored (`Ok(false)`). Quantities above `u32::MAX` are
    /// clamped to it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OperationFailed`] if the store fails. The view is
    /// refreshed either way.
    #[instrument(skip(self))]
    pub async fn update_item_quantity(&mut self, name: &str, quantity: i64) -> Result<bool> {
        if name.trim().is_empty() {
            debug!("Ignoring update with empty name");
            return Ok(false);
        }
        if quantity < 0 {
            debug!("Ignoring update of {name} to negative quantity {quantity}");
            return Ok(false);
        }
        let quantity = u32::try_from(quantity).unwrap_or(u32::MAX);

        let outcome = self.store.upsert(name, quantity).await;
        self.resynchronize("update_item_quantity", outcome).await?;

        info!("Set {name} to {quantity}");
        Ok(true)
    }

    /// Remove `name` using the controller's configured [`RemoveMode`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::OperationFailed`] if the store fails.
    pub async fn remove_item(&mut self, name: &str) -> Result<bool> {
        self.remove_item_with(name, self.remove_mode).await
    }

    /// Remove `name` using an explicit [`RemoveMode`].
    ///
    /// Removing an unknown item is a no-op that still refreshes the view.
    /// A blank name (empty or whitespace only) is ignored (`Ok(false)`).
    ///
    /// # Errors
    ///
    /// Returns [`Error::OperationFailed`] if the store fails. The view is
    /// refreshed either way.
    #[instrument(skip(self))]
    pub async fn remove_item_with(&mut self, name: &str, mode: RemoveMode) -> Result<bool> {
        if name.trim().is_empty() {
            debug!("Ignoring remove with empty name");
            return Ok(false);
        }

        let outcome = match mode {
            RemoveMode::Hard => self.store.delete(name).await,
            RemoveMode::Decrement => self.decrement_in_store(name).await,
        };
        self.resynchronize("remove_item", outcome).await?;

        info!("Removed {name} ({mode})");
        Ok(true)
    }

    async fn decrement_in_store(&self, name: &str) -> StoreResult<()> {
        match self.store.get(name).await? {
            Some(item) if item.quantity <= 1 => self.store.delete(name).await,
            Some(item) => self.store.upsert(name, item.quantity - 1).await,
            None => {
                debug!("Nothing to remove for {name}");
                Ok(())
            }
        }
    }

    /// Reload the view after a mutation, whatever its outcome.
    ///
    /// A mutation failure takes precedence over a refresh failure; the
    /// latter is only logged in that case.
    async fn resynchronize<T>(
        &mut self,
        operation: &'static str,
        outcome: StoreResult<T>,
    ) -> Result<T> {
        let refreshed = self.refresh().await;

        match (outcome, refreshed) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(err)) => Err(err),
            (Err(source), refreshed) => {
                if let Err(refresh_err) = refreshed {
                    warn!("Refresh after failed {operation} also failed: {refresh_err}");
                }
                warn!("{operation} failed: {source}");
                Err(Error::operation_failed(operation, source))
            }
        }
    }
}

/// Map a requested add quantity onto a positive count.
fn normalize_add_quantity(quantity: Option<i64>) -> u32 {
    quantity
        .filter(|q| *q > 0)
        .map_or(DEFAULT_ADD_QUANTITY, |q| u32::try_from(q).unwrap_or(u32::MAX))
}

#[cfg(test)]
mod tests {
    use mockall::Sequence;

    use super::*;
    use crate::logging::init_test_logging;
    use crate::store::{MockInventoryStore, SqliteStore, StoreError};

    async fn controller() -> (InventoryController, Arc<SqliteStore>) {
        init_test_logging();
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        let controller = InventoryController::load(store.clone(), RemoveMode::Decrement)
            .await
            .unwrap();
        (controller, store)
    }

    async fn stored(store: &SqliteStore, name: &str) -> Option<u32> {
        store.get(name).await.unwrap().map(|item| item.quantity)
    }

    #[test]
    fn test_normalize_add_quantity() {
        assert_eq!(normalize_add_quantity(None), 1);
        assert_eq!(normalize_add_quantity(Some(0)), 1);
        assert_eq!(normalize_add_quantity(Some(-4)), 1);
        assert_eq!(normalize_add_quantity(Some(3)), 3);
        assert_eq!(normalize_add_quantity(Some(i64::MAX)), u32::MAX);
    }

    #[test]
    fn test_remove_mode_default_and_display() {
        assert_eq!(RemoveMode::default(), RemoveMode::Decrement);
        assert_eq!(RemoveMode::Hard.to_string(), "hard");
        assert_eq!(RemoveMode::Decrement.to_string(), "decrement");
    }

    #[tokio::test]
    async fn test_add_accumulates_quantities() {
        let (mut controller, store) = controller().await;

        for quantity in [2, 3, 4] {
            assert!(controller.add_item("flour", Some(quantity)).await.unwrap());
        }

        assert_eq!(stored(&store, "flour").await, Some(9));
        assert_eq!(controller.item("flour").unwrap().quantity, 9);
    }

    #[tokio::test]
    async fn test_add_defaults_to_one() {
        let (mut controller, store) = controller().await;

        controller.add_item("eggs", None).await.unwrap();
        controller.add_item("eggs", Some(0)).await.unwrap();
        controller.add_item("eggs", Some(-2)).await.unwrap();

        assert_eq!(stored(&store, "eggs").await, Some(3));
    }

    #[tokio::test]
    async fn test_add_empty_name_is_noop() {
        let (mut controller, store) = controller().await;

        assert!(!controller.add_item("", Some(2)).await.unwrap());
        assert!(!controller.add_item("   ", Some(2)).await.unwrap());
        assert!(store.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_overrides_accumulated_quantity() {
        let (mut controller, store) = controller().await;
        controller.add_item("flour", Some(5)).await.unwrap();

        assert!(controller.update_item_quantity("flour", 1).await.unwrap());

        assert_eq!(stored(&store, "flour").await, Some(1));
        assert_eq!(controller.item("flour").unwrap().quantity, 1);
    }

    #[tokio::test]
    async fn test_update_creates_missing_record() {
        let (mut controller, store) = controller().await;

        controller.update_item_quantity("honey", 4).await.unwrap();

        assert_eq!(stored(&store, "honey").await, Some(4));
    }

    #[tokio::test]
    async fn test_update_clamps_oversized_quantity() {
        let (mut controller, store) = controller().await;

        assert!(controller
            .update_item_quantity("rice", i64::from(u32::MAX) + 1)
            .await
            .unwrap());

        assert_eq!(stored(&store, "rice").await, Some(u32::MAX));
    }

    #[tokio::test]
    async fn test_update_rejects_negative_and_empty() {
        let (mut controller, store) = controller().await;
        controller.add_item("oats", Some(2)).await.unwrap();

        assert!(!controller.update_item_quantity("oats", -1).await.unwrap());
        assert!(!controller.update_item_quantity("", 3).await.unwrap());

        assert_eq!(stored(&store, "oats").await, Some(2));
    }

    #[tokio::test]
    async fn test_decrement_removes_last_unit() {
        let (mut controller, store) = controller().await;
        controller.add_item("lemon", Some(1)).await.unwrap();

        controller.remove_item("lemon").await.unwrap();

        assert_eq!(stored(&store, "lemon").await, None);
        assert!(controller.item("lemon").is_none());
    }

    #[tokio::test]
    async fn test_decrement_reduces_by_one() {
        let (mut controller, store) = controller().await;
        controller.add_item("lemon", Some(4)).await.unwrap();

        controller.remove_item("lemon").await.unwrap();

        assert_eq!(stored(&store, "lemon").await, Some(3));
    }

    #[tokio::test]
    async fn test_decrement_deletes_zero_quantity() {
        let (mut controller, store) = controller().await;
        controller.update_item_quantity("yeast", 0).await.unwrap();

        controller.remove_item("yeast").await.unwrap();

        assert_eq!(stored(&store, "yeast").await, None);
    }

    #[tokio::test]
    async fn test_decrement_nonexistent_is_noop() {
        let (mut controller, store) = controller().await;

        assert!(controller.remove_item("nonexistent").await.unwrap());
        assert!(store.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_hard_remove_ignores_quantity() {
        let (mut controller, store) = controller().await;
        controller.add_item("rice", Some(10)).await.unwrap();

        controller
            .remove_item_with("rice", RemoveMode::Hard)
            .await
            .unwrap();

        assert_eq!(stored(&store, "rice").await, None);
        assert!(controller.view().is_empty());
    }

    #[tokio::test]
    async fn test_hard_mode_from_controller_default() {
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        store.upsert("beans", 3).await.unwrap();
        let mut controller = InventoryController::load(store.clone(), RemoveMode::Hard)
            .await
            .unwrap();

        controller.remove_item("beans").await.unwrap();

        assert_eq!(stored(&store, "beans").await, None);
    }

    #[tokio::test]
    async fn test_unreadable_record_does_not_block_load_and_can_be_removed() {
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        store.upsert("flour", 2).await.unwrap();
        store
            .connection()
            .unwrap()
            .execute(
                "INSERT INTO inventory (name, quantity) VALUES ('bad', 5000000000)",
                [],
            )
            .unwrap();

        let mut controller = InventoryController::load(store.clone(), RemoveMode::Decrement)
            .await
            .unwrap();
        assert_eq!(controller.view(), &[InventoryItem::new("flour", 2)]);

        controller
            .remove_item_with("bad", RemoveMode::Hard)
            .await
            .unwrap();

        let rows: i64 = store
            .connection()
            .unwrap()
            .query_row(
                "SELECT COUNT(*) FROM inventory WHERE name = 'bad'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(rows, 0);
        assert_eq!(controller.view(), &[InventoryItem::new("flour", 2)]);
    }

    #[tokio::test]
    async fn test_flour_scenario() {
        let (mut controller, store) = controller().await;

        controller.add_item("flour", Some(2)).await.unwrap();
        assert_eq!(stored(&store, "flour").await, Some(2));

        controller.add_item("flour", Some(3)).await.unwrap();
        assert_eq!(stored(&store, "flour").await, Some(5));

        controller.update_item_quantity("flour", 1).await.unwrap();
        assert_eq!(stored(&store, "flour").await, Some(1));

        controller
            .remove_item_with("flour", RemoveMode::Decrement)
            .await
            .unwrap();
        assert_eq!(stored(&store, "flour").await, None);
    }

    #[tokio::test]
    async fn test_view_matches_store_after_each_mutation() {
        let (mut controller, store) = controller().await;

        controller.add_item("milk", Some(2)).await.unwrap();
        controller.add_item("bread", None).await.unwrap();
        controller.remove_item("milk").await.unwrap();
        controller.update_item_quantity("jam", 6).await.unwrap();

        let mut persisted = store.list_all().await.unwrap();
        persisted.sort_by(|a, b| a.name.cmp(&b.name));
        assert_eq!(controller.sorted_view(), persisted);
    }

    #[tokio::test]
    async fn test_refresh_picks_up_external_writes() {
        let (mut controller, store) = controller().await;
        store.upsert("tea", 2).await.unwrap();
        assert!(controller.item("tea").is_none());

        controller.refresh().await.unwrap();

        assert_eq!(controller.item("tea").unwrap().quantity, 2);
    }

    #[tokio::test]
    async fn test_pantry_items_and_sorted_view() {
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        store.upsert("milk", 1).await.unwrap();
        store.upsert("Eggs", 6).await.unwrap();
        let controller = InventoryController::load(store, RemoveMode::Decrement)
            .await
            .unwrap();

        let names: Vec<_> = controller
            .sorted_view()
            .into_iter()
            .map(|item| item.name)
            .collect();
        assert_eq!(names, vec!["Eggs", "milk"]);

        let pantry = controller.pantry_items();
        assert!(pantry.contains("Eggs"));
        assert!(pantry.contains("milk"));
        assert!(pantry.contains(", "));
    }

    #[tokio::test]
    async fn test_write_failure_still_refreshes_and_reports() {
        let mut store = MockInventoryStore::new();
        let mut seq = Sequence::new();

        store
            .expect_list_all()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| Ok(vec![]));
        store
            .expect_get()
            .withf(|name| name == "flour")
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(Some(InventoryItem::new("flour", 2))));
        store
            .expect_upsert()
            .withf(|name, quantity| name == "flour" && *quantity == 5)
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Err(StoreError::write_rejected("permission denied")));
        store
            .expect_list_all()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| Ok(vec![InventoryItem::new("flour", 2)]));

        let mut controller = InventoryController::load(Arc::new(store), RemoveMode::Decrement)
            .await
            .unwrap();

        let err = controller.add_item("flour", Some(3)).await.unwrap_err();
        assert!(err.is_write_rejected());
        assert!(matches!(
            err,
            Error::OperationFailed {
                operation: "add_item",
                ..
            }
        ));
        assert_eq!(controller.item("flour").unwrap().quantity, 2);
    }

    #[tokio::test]
    async fn test_read_failure_aborts_write() {
        let mut store = MockInventoryStore::new();
        store.expect_list_all().times(2).returning(|| Ok(vec![]));
        store
            .expect_get()
            .returning(|_| Err(StoreError::unavailable("connection reset")));
        store.expect_upsert().never();
        store.expect_delete().never();

        let mut controller = InventoryController::load(Arc::new(store), RemoveMode::Decrement)
            .await
            .unwrap();

        let err = controller.remove_item("milk").await.unwrap_err();
        assert!(err.is_store_unavailable());
    }

    #[tokio::test]
    async fn test_mutation_error_wins_over_refresh_error() {
        let mut store = MockInventoryStore::new();
        store
            .expect_delete()
            .returning(|_| Err(StoreError::write_rejected("locked")));
        store
            .expect_list_all()
            .returning(|| Err(StoreError::unavailable("offline")));

        let mut controller = InventoryController::new(Arc::new(store), RemoveMode::Hard);

        let err = controller.remove_item("salt").await.unwrap_err();
        assert!(err.is_write_rejected());
    }

    #[tokio::test]
    async fn test_refresh_failure_after_success_is_reported() {
        let mut store = MockInventoryStore::new();
        store.expect_upsert().returning(|_, _| Ok(()));
        store
            .expect_list_all()
            .returning(|| Err(StoreError::unavailable("offline")));

        let mut controller = InventoryController::new(Arc::new(store), RemoveMode::Decrement);

        let err = controller
            .update_item_quantity("salt", 2)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::OperationFailed {
                operation: "refresh",
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_rejected_input_makes_no_store_calls() {
        let mut store = MockInventoryStore::new();
        store.expect_list_all().never();
        store.expect_get().never();
        store.expect_upsert().never();
        store.expect_delete().never();

        let mut controller = InventoryController::new(Arc::new(store), RemoveMode::Decrement);

        assert!(!controller.add_item("", Some(1)).await.unwrap());
        assert!(!controller.update_item_quantity("salt", -3).await.unwrap());
        assert!(!controller.remove_item(" ").await.unwrap());
    }

    #[tokio::test]
    async fn test_load_fails_when_store_unavailable() {
        let mut store = MockInventoryStore::new();
        store
            .expect_list_all()
            .returning(|| Err(StoreError::unavailable("dns failure")));

        let err = InventoryController::load(Arc::new(store), RemoveMode::Decrement)
            .await
            .unwrap_err();
        assert!(err.is_store_unavailable());
    }
}
