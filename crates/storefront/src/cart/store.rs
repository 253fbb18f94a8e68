//! The cart store: the single owner of the shopper's cart.
//!
//! Every mutation runs the same sequence:
//!
//! 1. apply the action to the current [`CartState`] (pure, in `snack-shop-core`)
//! 2. if anything changed, write the new state through to storage
//! 3. publish the new snapshot to watchers
//! 4. broadcast a [`Notice`] when the change is worth telling the shopper about
//!
//! Operations never fail from the caller's point of view. Rejected input comes
//! back as [`CartChange::Unchanged`]; a failed write is logged and announced
//! with [`NoticeKind::PersistenceFailed`] while the in-memory cart stays usable.

use tokio::sync::{broadcast, watch};
use tracing::{debug, info, instrument, warn};

use snack_shop_core::{
    CartAction, CartChange, CartLineItem, CartState, CartTotals, CheckoutSummary, LineItemId,
    NoChange, ShippingMethod, ShippingPolicy, Transition,
};

use super::notice::{Notice, NoticeKind};
use crate::storage::{KeyValueStore, StorageError, validate_key};

/// Storage key the web client has always used for the cart.
pub const DEFAULT_STORAGE_KEY: &str = "cartItems";

/// Notices buffered per subscriber before the oldest are dropped.
const NOTICE_CAPACITY: usize = 32;

/// Owns the cart, its storage, and its observers.
///
/// Mutating methods take `&mut self`, so only one operation can run at a
/// time. Views hold a [`watch::Receiver`] from [`CartStore::subscribe`] and
/// re-render from the latest snapshot.
pub struct CartStore<S> {
    storage: S,
    key: String,
    state: CartState,
    snapshots: watch::Sender<CartState>,
    notices: broadcast::Sender<Notice>,
}

impl<S: KeyValueStore> CartStore<S> {
    /// Open the cart persisted under [`DEFAULT_STORAGE_KEY`].
    pub fn open(storage: S) -> Self {
        Self::hydrated(storage, DEFAULT_STORAGE_KEY.to_string())
    }

    /// Open the cart persisted under `key`.
    ///
    /// A missing or unreadable value yields an empty cart. Persisted items
    /// with duplicate IDs are merged and invalid items are dropped; if that
    /// changed anything the normalized cart is written back.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidKey`] if `key` is not a valid storage
    /// key, so a bad key fails here instead of on every write.
    pub fn open_with_key(storage: S, key: impl Into<String>) -> Result<Self, StorageError> {
        let key = key.into();
        validate_key(&key)?;
        Ok(Self::hydrated(storage, key))
    }

    #[instrument(skip_all, fields(key = %key))]
    fn hydrated(storage: S, key: String) -> Self {
        let (state, normalized) = hydrate(&storage, &key);
        let (snapshots, _) = watch::channel(state.clone());
        let (notices, _) = broadcast::channel(NOTICE_CAPACITY);

        let mut store = Self {
            storage,
            key,
            state,
            snapshots,
            notices,
        };
        if normalized {
            store.persist();
        }
        store
    }

    /// Current cart contents.
    #[must_use]
    pub const fn state(&self) -> &CartState {
        &self.state
    }

    /// Watch the cart. The receiver always holds the latest snapshot.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<CartState> {
        self.snapshots.subscribe()
    }

    /// Receive toast notices emitted from now on.
    #[must_use]
    pub fn notices(&self) -> broadcast::Receiver<Notice> {
        self.notices.subscribe()
    }

    /// Add `item`, merging with an existing line of the same ID.
    #[instrument(skip(self, item), fields(id = %item.id, quantity = item.quantity))]
    pub fn add(&mut self, item: CartLineItem) -> CartChange {
        let id = item.id.clone();
        self.dispatch(CartAction::Add(item), Some(&id))
    }

    /// Remove the line with `id`. Unknown IDs are ignored.
    #[instrument(skip_all, fields(id = %id))]
    pub fn remove(&mut self, id: &LineItemId) -> CartChange {
        self.dispatch(CartAction::Remove(id.clone()), None)
    }

    /// Set the quantity of the line with `id`.
    ///
    /// Quantities below 1 are rejected and leave the cart untouched.
    #[instrument(skip_all, fields(id = %id, quantity = quantity))]
    pub fn update_quantity(&mut self, id: &LineItemId, quantity: i64) -> CartChange {
        self.dispatch(
            CartAction::UpdateQuantity {
                id: id.clone(),
                quantity,
            },
            None,
        )
    }

    /// Raise the quantity of the line with `id` by one.
    pub fn increment(&mut self, id: &LineItemId) -> CartChange {
        match self.current_quantity(id) {
            Some(quantity) => self.update_quantity(id, quantity + 1),
            None => CartChange::Unchanged(NoChange::UnknownItem),
        }
    }

    /// Lower the quantity of the line with `id` by one, never below 1.
    pub fn decrement(&mut self, id: &LineItemId) -> CartChange {
        match self.current_quantity(id) {
            Some(quantity) => self.update_quantity(id, quantity - 1),
            None => CartChange::Unchanged(NoChange::UnknownItem),
        }
    }

    /// Empty the cart and erase its persisted value.
    #[instrument(skip(self))]
    pub fn clear(&mut self) -> CartChange {
        self.dispatch(CartAction::Clear, None)
    }

    /// Derived totals for the current cart.
    #[must_use]
    pub fn totals(&self, policy: &ShippingPolicy, method: ShippingMethod) -> CartTotals {
        self.state.totals(policy, method)
    }

    /// Order summary for the current cart.
    #[must_use]
    pub fn checkout_summary(
        &self,
        policy: &ShippingPolicy,
        method: ShippingMethod,
    ) -> CheckoutSummary {
        CheckoutSummary::new(&self.state, policy, method)
    }

    /// Storage key this cart is persisted under.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The underlying storage backend.
    #[must_use]
    pub const fn storage(&self) -> &S {
        &self.storage
    }

    /// Tear down the store and hand back its storage.
    #[must_use]
    pub fn into_storage(self) -> S {
        self.storage
    }

    fn current_quantity(&self, id: &LineItemId) -> Option<i64> {
        self.state.get(id).map(|item| i64::from(item.quantity))
    }

    fn dispatch(&mut self, action: CartAction, added: Option<&LineItemId>) -> CartChange {
        let Transition { state, change } = self.state.apply(action);
        if !change.is_change() {
            debug!(?change, "Cart unchanged");
            return change;
        }

        self.state = state;
        let saved = if matches!(change, CartChange::Cleared) {
            self.erase()
        } else {
            self.persist()
        };
        debug!(?change, items = self.state.len(), saved, "Cart updated");

        self.snapshots.send_replace(self.state.clone());

        let item = added.and_then(|id| self.state.get(id));
        if let Some(notice) = Notice::for_change(&change, item) {
            self.notify(notice);
        }
        if !saved {
            self.notify(Notice::from(NoticeKind::PersistenceFailed));
        }
        change
    }

    fn persist(&mut self) -> bool {
        let value = match serde_json::to_string(&self.state) {
            Ok(value) => value,
            Err(e) => {
                warn!(error = %e, "Failed to serialize cart");
                return false;
            }
        };
        match self.storage.set(&self.key, &value) {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, key = %self.key, "Failed to persist cart");
                false
            }
        }
    }

    fn erase(&mut self) -> bool {
        match self.storage.remove(&self.key) {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, key = %self.key, "Failed to erase persisted cart");
                false
            }
        }
    }

    fn notify(&self, notice: Notice) {
        // No subscribers is fine.
        let _ = self.notices.send(notice);
    }
}

impl<S> std::fmt::Debug for CartStore<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartStore")
            .field("key", &self.key)
            .field("items", &self.state.len())
            .finish_non_exhaustive()
    }
}

/// Load the cart from storage, failing open to an empty cart.
///
/// The flag is `true` when the loaded items had to be normalized.
fn hydrate<S: KeyValueStore>(storage: &S, key: &str) -> (CartState, bool) {
    let raw = match storage.get(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => {
            debug!("No persisted cart");
            return (CartState::new(), false);
        }
        Err(e) => {
            warn!(error = %e, "Failed to read persisted cart, starting empty");
            return (CartState::new(), false);
        }
    };

    let entries: Vec<serde_json::Value> = match serde_json::from_str(&raw) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(error = %e, "Persisted cart is malformed, starting empty");
            return (CartState::new(), false);
        }
    };

    let loaded = entries.len();
    let mut items = Vec::with_capacity(loaded);
    let mut malformed = 0_usize;
    for entry in entries {
        match serde_json::from_value::<CartLineItem>(entry) {
            Ok(item) => items.push(item),
            Err(e) => {
                malformed += 1;
                debug!(error = %e, "Skipping malformed cart entry");
            }
        }
    }
    if malformed > 0 {
        warn!(malformed, "Dropped malformed entries from persisted cart");
    }

    let (state, rejected) = CartState::from_items(items);
    if !rejected.is_empty() {
        let ids: Vec<&str> = rejected.iter().map(|item| item.id.as_str()).collect();
        warn!(?ids, "Dropped invalid items from persisted cart");
    }
    info!(items = state.len(), "Hydrated cart");

    let normalized = state.len() != loaded;
    (state, normalized)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;
    use crate::storage::{MemoryStore, StorageError};

    fn item(id: &str, price: i64, quantity: u32) -> CartLineItem {
        CartLineItem::new(id, format!("Snack {id}"), Decimal::new(price, 0), quantity).unwrap()
    }

    fn persisted(store: &CartStore<MemoryStore>) -> Option<String> {
        store.storage().get(store.key()).unwrap()
    }

    fn assert_written_through(store: &CartStore<MemoryStore>) {
        let expected = serde_json::to_string(store.state()).unwrap();
        assert_eq!(persisted(store), Some(expected));
    }

    /// Storage that can be switched into a failing mode.
    #[derive(Default)]
    struct FlakyStore {
        inner: MemoryStore,
        failing: bool,
    }

    impl KeyValueStore for FlakyStore {
        fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
            self.inner.get(key)
        }

        fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
            if self.failing {
                return Err(StorageError::Io {
                    key: key.to_string(),
                    source: std::io::Error::other("quota exceeded"),
                });
            }
            self.inner.set(key, value)
        }

        fn remove(&mut self, key: &str) -> Result<(), StorageError> {
            if self.failing {
                return Err(StorageError::Io {
                    key: key.to_string(),
                    source: std::io::Error::other("storage unavailable"),
                });
            }
            self.inner.remove(key)
        }
    }

    #[test]
    fn test_open_empty_storage() {
        let store = CartStore::open(MemoryStore::new());
        assert!(store.state().is_empty());
        assert_eq!(store.key(), "cartItems");
        assert_eq!(persisted(&store), None);
    }

    #[test]
    fn test_open_malformed_storage_fails_open() {
        let store = CartStore::open(MemoryStore::with_entry("cartItems", "{not json"));
        assert!(store.state().is_empty());
    }

    #[test]
    fn test_open_wrong_shape_fails_open() {
        let store = CartStore::open(MemoryStore::with_entry("cartItems", r#"{"items":[]}"#));
        assert!(store.state().is_empty());
    }

    #[test]
    fn test_open_reads_web_client_format() {
        let raw = r#"[
            {"id":"1","name":"Banh trang tron","price":75000,"image":"/a.jpg","quantity":2},
            {"id":"2-5","name":"Kho ga","variantName":"500g","price":140000,"image":"/b.jpg","quantity":1}
        ]"#;
        let store = CartStore::open(MemoryStore::with_entry("cartItems", raw));

        assert_eq!(store.state().len(), 2);
        let kho_ga = store.state().get(&"2-5".into()).unwrap();
        assert_eq!(kho_ga.variant_name.as_deref(), Some("500g"));
        assert_eq!(store.state().subtotal(), Decimal::new(290_000, 0));
        // Nothing needed normalizing, so the original value is untouched.
        assert_eq!(persisted(&store).as_deref(), Some(raw));
    }

    #[test]
    fn test_open_normalizes_and_writes_back() {
        let raw = r#"[
            {"id":"1","name":"A","price":"10","image":"","quantity":2},
            {"id":"1","name":"A","price":"10","image":"","quantity":3},
            {"id":"2","name":"B","price":"10","image":"","quantity":0}
        ]"#;
        let store = CartStore::open(MemoryStore::with_entry("cartItems", raw));

        assert_eq!(store.state().len(), 1);
        assert_eq!(store.state().items()[0].quantity, 5);
        assert_written_through(&store);
    }

    #[test]
    fn test_open_drops_malformed_entries_only() {
        let raw = r#"[
            {"id":"1","name":"A","price":"10","image":"","quantity":2},
            {"id":"2","name":"B","price":"10","image":"","quantity":-1},
            {"id":"3","name":"C","price":"5","image":"","quantity":1},
            "not an item"
        ]"#;
        let store = CartStore::open(MemoryStore::with_entry("cartItems", raw));

        let ids: Vec<_> = store.state().items().iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, ["1", "3"]);
        assert_eq!(store.state().subtotal(), Decimal::new(25, 0));
        assert_written_through(&store);
    }

    #[test]
    fn test_open_drops_overflowing_items() {
        let raw = r#"[
            {"id":"1","name":"Gold leaf","price":"79228162514264337593543950335","image":"","quantity":2},
            {"id":"2","name":"B","price":"10","image":"","quantity":1}
        ]"#;
        let store = CartStore::open(MemoryStore::with_entry("cartItems", raw));

        assert_eq!(store.state().len(), 1);
        assert_eq!(store.state().items()[0].id.as_str(), "2");
        let policy = ShippingPolicy::default();
        let totals = store.totals(&policy, ShippingMethod::Express);
        assert_eq!(totals.subtotal, Decimal::new(10, 0));
        let summary = store.checkout_summary(&policy, ShippingMethod::Standard);
        assert_eq!(summary.lines.len(), 1);
        assert_written_through(&store);
    }

    #[test]
    fn test_add_rejects_total_overflow() {
        let price: Decimal = "50000000000000000000000000000".parse().unwrap();
        let mut store = CartStore::open(MemoryStore::new());
        store.add(CartLineItem::new("1", "Gold leaf", price, 1).unwrap());
        let mut notices = store.notices();

        let change = store.add(CartLineItem::new("2", "Gold leaf", price, 1).unwrap());
        assert_eq!(change, CartChange::Unchanged(NoChange::TotalOverflow));
        assert_eq!(store.state().len(), 1);
        assert_eq!(store.totals(&ShippingPolicy::default(), ShippingMethod::Standard).subtotal, price);
        assert!(notices.try_recv().is_err());
        assert_written_through(&store);
    }

    #[test]
    fn test_add_merges_and_writes_through() {
        let mut store = CartStore::open(MemoryStore::new());

        assert_eq!(store.add(item("X", 10, 2)), CartChange::Added);
        assert_written_through(&store);

        assert_eq!(store.add(item("X", 10, 3)), CartChange::Merged { quantity: 5 });
        assert_written_through(&store);

        assert_eq!(store.state().len(), 1);
        assert_eq!(store.state().items()[0].quantity, 5);
    }

    #[test]
    fn test_add_preserves_order() {
        let mut store = CartStore::open(MemoryStore::new());
        store.add(item("A", 10, 1));
        store.add(item("B", 10, 1));
        let ids: Vec<_> = store.state().items().iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, ["A", "B"]);
    }

    #[test]
    fn test_update_quantity_floor() {
        let mut store = CartStore::open(MemoryStore::new());
        store.add(item("A", 10, 3));
        let before = persisted(&store);

        for quantity in [0, -1] {
            assert_eq!(
                store.update_quantity(&"A".into(), quantity),
                CartChange::Unchanged(NoChange::InvalidQuantity)
            );
        }
        assert_eq!(store.state().items()[0].quantity, 3);
        assert_eq!(persisted(&store), before);
    }

    #[test]
    fn test_update_quantity_writes_through() {
        let mut store = CartStore::open(MemoryStore::new());
        store.add(item("A", 10, 3));
        assert_eq!(
            store.update_quantity(&"A".into(), 8),
            CartChange::QuantityUpdated { quantity: 8 }
        );
        assert_written_through(&store);
    }

    #[test]
    fn test_increment_and_decrement() {
        let mut store = CartStore::open(MemoryStore::new());
        store.add(item("A", 10, 1));

        store.increment(&"A".into());
        store.increment(&"A".into());
        assert_eq!(store.state().items()[0].quantity, 3);

        store.decrement(&"A".into());
        store.decrement(&"A".into());
        assert_eq!(store.state().items()[0].quantity, 1);

        assert_eq!(
            store.decrement(&"A".into()),
            CartChange::Unchanged(NoChange::InvalidQuantity)
        );
        assert_eq!(store.state().items()[0].quantity, 1);

        assert_eq!(
            store.increment(&"missing".into()),
            CartChange::Unchanged(NoChange::UnknownItem)
        );
    }

    #[test]
    fn test_remove() {
        let mut store = CartStore::open(MemoryStore::new());
        store.add(item("A", 10, 1));
        store.add(item("B", 10, 1));

        assert!(matches!(store.remove(&"A".into()), CartChange::Removed(_)));
        assert_eq!(store.state().len(), 1);
        assert_eq!(store.state().items()[0].id.as_str(), "B");
        assert_written_through(&store);

        assert_eq!(
            store.remove(&"A".into()),
            CartChange::Unchanged(NoChange::UnknownItem)
        );
    }

    #[test]
    fn test_clear_erases_persisted_value() {
        let mut store = CartStore::open(MemoryStore::new());
        store.add(item("A", 10, 1));
        assert_eq!(store.clear(), CartChange::Cleared);

        assert!(store.state().is_empty());
        assert_eq!(persisted(&store), None);

        let rehydrated = CartStore::open(store.into_storage());
        assert!(rehydrated.state().is_empty());
    }

    #[test]
    fn test_clear_erases_corrupt_value() {
        let mut store = CartStore::open(MemoryStore::with_entry("cartItems", "garbage"));
        assert_eq!(store.clear(), CartChange::Cleared);
        assert_eq!(persisted(&store), None);
    }

    #[test]
    fn test_persistence_round_trip() {
        let mut store = CartStore::open(MemoryStore::new());
        store.add(item("A", 75_000, 2));
        store.add(item("B", 140_000, 1).with_variant("500g"));
        store.add(item("A", 75_000, 1));
        let expected = store.state().clone();

        let rehydrated = CartStore::open(store.into_storage());
        assert_eq!(rehydrated.state(), &expected);
    }

    #[test]
    fn test_custom_key() {
        let mut store = CartStore::open_with_key(MemoryStore::new(), "guestCart").unwrap();
        store.add(item("A", 10, 1));
        assert!(store.storage().contains("guestCart"));
        assert!(!store.storage().contains("cartItems"));
    }

    #[test]
    fn test_open_with_invalid_key_rejected() {
        for key in ["", "../escape", "cart items"] {
            let result = CartStore::open_with_key(MemoryStore::new(), key);
            assert!(matches!(result, Err(StorageError::InvalidKey(_))), "{key:?}");
        }
    }

    #[test]
    fn test_subscribers_see_latest_snapshot() {
        let mut store = CartStore::open(MemoryStore::new());
        let mut badge = store.subscribe();
        assert!(!badge.has_changed().unwrap());

        store.add(item("A", 10, 2));
        store.add(item("B", 10, 1));
        assert!(badge.has_changed().unwrap());
        assert_eq!(badge.borrow_and_update().item_count(), 3);

        store.update_quantity(&"A".into(), 0);
        assert!(!badge.has_changed().unwrap());
    }

    #[test]
    fn test_notices() {
        let mut store = CartStore::open(MemoryStore::new());
        let mut toasts = store.notices();

        store.add(item("A", 10, 1));
        store.add(item("A", 10, 1));
        store.update_quantity(&"A".into(), 4);
        store.remove(&"missing".into());
        store.remove(&"A".into());
        store.clear();

        let kinds: Vec<_> = std::iter::from_fn(|| toasts.try_recv().ok())
            .map(|notice| notice.kind)
            .collect();
        assert!(matches!(kinds[0], NoticeKind::ItemAdded { .. }));
        assert!(matches!(kinds[1], NoticeKind::QuantityIncreased { quantity: 2, .. }));
        assert!(matches!(kinds[2], NoticeKind::ItemRemoved { .. }));
        assert_eq!(kinds[3], NoticeKind::CartCleared);
        assert_eq!(kinds.len(), 4);
    }

    #[test]
    fn test_persistence_failure_keeps_mutation() {
        let mut store = CartStore::open(FlakyStore::default());
        store.add(item("A", 10, 1));
        let mut toasts = store.notices();

        store.storage.failing = true;
        assert_eq!(store.add(item("B", 10, 1)), CartChange::Added);
        assert_eq!(store.state().len(), 2);

        let kinds: Vec<_> = std::iter::from_fn(|| toasts.try_recv().ok())
            .map(|notice| notice.kind)
            .collect();
        assert!(matches!(kinds[0], NoticeKind::ItemAdded { .. }));
        assert_eq!(kinds[1], NoticeKind::PersistenceFailed);

        // The last successful write is what survives a restart.
        store.storage.failing = false;
        let rehydrated = CartStore::open(store.into_storage());
        assert_eq!(rehydrated.state().len(), 1);
    }

    #[test]
    fn test_clear_failure_still_empties_memory() {
        let mut store = CartStore::open(FlakyStore::default());
        store.add(item("A", 10, 1));
        store.storage.failing = true;

        assert_eq!(store.clear(), CartChange::Cleared);
        assert!(store.state().is_empty());
    }

    #[test]
    fn test_totals_and_summary() {
        let mut store = CartStore::open(MemoryStore::new());
        store.add(item("A", 75_000, 2));
        store.add(item("B", 140_000, 1));

        let policy = ShippingPolicy::default();
        let totals = store.totals(&policy, ShippingMethod::Standard);
        assert_eq!(totals.total, Decimal::new(320_000, 0));

        let summary = store.checkout_summary(&policy, ShippingMethod::Standard);
        assert_eq!(summary.totals, totals);
        assert_eq!(summary.lines.len(), 2);
    }
}
