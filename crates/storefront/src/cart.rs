//! Cart state engine.
//!
//! Owns the in-memory cart and reconciles it against the server cart.
//! Mutation runs on two tracks: the local track is synchronous and always
//! succeeds (the shopper keeps shopping even with the backend down), the
//! server track is best-effort background sync through [`SyncQueue`]. The
//! two can diverge until the next wholesale snapshot sync; that window is
//! part of the contract, not a bug to fix here.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::instrument;

use shophub_core::{CartId, ProductId};

use crate::auth::AuthIdentity;
use crate::services::{ApiError, CartClient, Product};
use crate::store::{SharedStore, keys, lock_store};
use crate::sync::{SyncOutcome, SyncQueue};

/// One product entry in the local cart.
///
/// Unique per `product_id`; quantity is always at least 1. Persisted under
/// the `cart` store key in the same shape the embedding shell reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLineItem {
    pub product_id: ProductId,
    pub product_name: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub base_price: Decimal,
    pub quantity: u32,
}

impl CartLineItem {
    /// Price times quantity for this line.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.base_price * Decimal::from(self.quantity)
    }
}

impl From<&Product> for CartLineItem {
    fn from(product: &Product) -> Self {
        Self {
            product_id: product.id,
            product_name: product.product_name.clone(),
            image_url: product.image_url.clone(),
            // A product without a price still goes in the cart; it totals as 0.
            base_price: product.base_price.unwrap_or_default(),
            quantity: 1,
        }
    }
}

/// One record of the server-side cart, as the cart service returns it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerCartRecord {
    /// Server-side cart record id (the service names it `id`).
    #[serde(rename = "cartId", alias = "id")]
    pub cart_id: CartId,
    #[serde(default)]
    pub product_id: Option<ProductId>,
    #[serde(default)]
    pub product_name: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub base_price: Option<Decimal>,
    #[serde(default)]
    pub quantity: i64,
}

/// Notification emitted after a local cart mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartEvent {
    /// A new line item was appended.
    Added(ProductId),
    /// An existing line item's quantity changed.
    QuantityUpdated {
        product_id: ProductId,
        quantity: u32,
    },
    /// A line item was removed.
    Removed(ProductId),
    /// The cart was emptied.
    Cleared,
}

/// Owns the local cart and the last-seen server snapshot.
///
/// Only this engine mutates cart state; views read through the accessors and
/// listen on [`CartEngine::subscribe`].
pub struct CartEngine {
    lines: Vec<CartLineItem>,
    server_snapshot: Vec<ServerCartRecord>,
    store: SharedStore,
    api: CartClient,
    sync: SyncQueue,
    events: broadcast::Sender<CartEvent>,
}

impl CartEngine {
    /// Create the engine, restoring the persisted local cart once.
    #[must_use]
    pub fn new(store: SharedStore, api: CartClient, sync: SyncQueue) -> Self {
        let lines: Vec<CartLineItem> = lock_store(&store).get(keys::CART).unwrap_or_default();
        let (events, _) = broadcast::channel(16);

        Self {
            lines,
            server_snapshot: Vec::new(),
            store,
            api,
            sync,
            events,
        }
    }

    /// Subscribe to cart mutation notifications.
    ///
    /// A lagging or dropped receiver never blocks a mutation.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<CartEvent> {
        self.events.subscribe()
    }

    /// The local cart lines, in insertion order.
    #[must_use]
    pub fn lines(&self) -> &[CartLineItem] {
        &self.lines
    }

    /// The last server snapshot taken via [`Self::sync_from_server`].
    #[must_use]
    pub fn server_snapshot(&self) -> &[ServerCartRecord] {
        &self.server_snapshot
    }

    // =========================================================================
    // Local-track mutations (synchronous, always succeed)
    // =========================================================================

    /// Add one unit of a product to the cart.
    ///
    /// Increments the existing line or appends a new one, persists, and
    /// notifies. When an identity is given, a background request adds the
    /// product to the server cart as well; its failure is logged, never
    /// surfaced, and never rolls back the local mutation.
    pub fn add_to_cart(&mut self, product: &Product, identity: Option<&AuthIdentity>) -> CartEvent {
        let event = match self
            .lines
            .iter_mut()
            .find(|line| line.product_id == product.id)
        {
            Some(line) => {
                line.quantity += 1;
                CartEvent::QuantityUpdated {
                    product_id: product.id,
                    quantity: line.quantity,
                }
            }
            None => {
                self.lines.push(CartLineItem::from(product));
                CartEvent::Added(product.id)
            }
        };

        self.persist_lines();
        let _ = self.events.send(event.clone());

        if let Some(identity) = identity {
            self.spawn_server_add(identity, product.id);
        } else {
            tracing::debug!(product_id = %product.id, "No session, server cart add skipped");
        }

        event
    }

    /// Remove a line item. No error (but still a notification) if absent.
    pub fn remove_from_cart(&mut self, product_id: ProductId) {
        self.lines.retain(|line| line.product_id != product_id);
        self.persist_lines();
        let _ = self.events.send(CartEvent::Removed(product_id));
    }

    /// Set a line item's quantity.
    ///
    /// A quantity of zero or less behaves exactly like
    /// [`Self::remove_from_cart`]. Unknown ids are a no-op.
    pub fn update_quantity(&mut self, product_id: ProductId, quantity: i64) {
        if quantity <= 0 {
            self.remove_from_cart(product_id);
            return;
        }

        let Some(line) = self
            .lines
            .iter_mut()
            .find(|line| line.product_id == product_id)
        else {
            tracing::debug!(%product_id, "Quantity update for item not in cart, skipped");
            return;
        };

        line.quantity = u32::try_from(quantity).unwrap_or(u32::MAX);
        let quantity = line.quantity;
        self.persist_lines();
        let _ = self.events.send(CartEvent::QuantityUpdated {
            product_id,
            quantity,
        });
    }

    /// Empty the local cart.
    pub fn clear_cart(&mut self) {
        self.lines.clear();
        self.persist_lines();
        let _ = self.events.send(CartEvent::Cleared);
    }

    /// Replace the server snapshot wholesale.
    ///
    /// The sole integration point between server state and local display
    /// state; there is no merging. Call sites fetch the records first (see
    /// [`Self::refresh_from_server`]).
    pub fn sync_from_server(&mut self, records: Vec<ServerCartRecord>) {
        self.server_snapshot = records;
    }

    // =========================================================================
    // Derived values (recomputed, never stored as truth)
    // =========================================================================

    /// Sum of local line quantities.
    #[must_use]
    pub fn cart_count(&self) -> u32 {
        self.lines.iter().map(|line| line.quantity).sum()
    }

    /// Number of records in the server snapshot.
    #[must_use]
    pub fn server_cart_count(&self) -> usize {
        self.server_snapshot.len()
    }

    /// Total over the server snapshot: `base_price x max(quantity, 1)`,
    /// missing prices as 0.
    ///
    /// The server snapshot is the source of truth for the displayed total;
    /// the local cart total is only used when building an order payload.
    #[must_use]
    pub fn cart_total(&self) -> Decimal {
        self.server_snapshot
            .iter()
            .map(|record| {
                record.base_price.unwrap_or_default() * Decimal::from(record.quantity.max(1))
            })
            .sum()
    }

    /// The badge count to display, cached under the `cartCount` store key.
    ///
    /// Authenticated sessions show the server count, anonymous ones the
    /// local count; a zero candidate keeps the previously cached value so
    /// the badge does not flicker to 0 before the first sync completes.
    pub fn display_count(&self, authenticated: bool) -> u32 {
        let mut store = lock_store(&self.store);
        let cached: u32 = store.get(keys::CART_COUNT).unwrap_or(0);

        let candidate = if authenticated {
            u32::try_from(self.server_cart_count()).unwrap_or(u32::MAX)
        } else {
            self.cart_count()
        };

        let count = if candidate > 0 { candidate } else { cached };
        store.set(keys::CART_COUNT, &count);
        count
    }

    // =========================================================================
    // Server-track flows
    // =========================================================================

    /// Fetch the user's server cart and replace the snapshot.
    ///
    /// # Errors
    ///
    /// Returns an `ApiError` if the fetch fails; the previous snapshot is
    /// kept in that case.
    #[instrument(skip(self, identity))]
    pub async fn refresh_from_server(&mut self, identity: &AuthIdentity) -> Result<(), ApiError> {
        let records = self
            .api
            .find_all_for_user(identity.bearer_token(), identity.id)
            .await?;
        self.sync_from_server(records);
        Ok(())
    }

    /// Change the quantity of a server cart record.
    ///
    /// Quantities below 1 delegate to [`Self::remove_server_item`].
    /// Otherwise the matching local line is updated first, then the server,
    /// then the snapshot is re-fetched. A server failure leaves local state
    /// as already mutated.
    ///
    /// # Errors
    ///
    /// Returns an `ApiError` if the server update or re-fetch fails.
    #[instrument(skip(self, identity))]
    pub async fn change_server_quantity(
        &mut self,
        identity: &AuthIdentity,
        cart_id: CartId,
        quantity: i64,
    ) -> Result<(), ApiError> {
        if quantity < 1 {
            return self.remove_server_item(identity, cart_id).await;
        }

        if let Some(product_id) = self.snapshot_product_id(cart_id) {
            self.update_quantity(product_id, quantity);
        }

        self.api
            .update_quantity(identity.bearer_token(), cart_id, quantity)
            .await?;
        self.refresh_from_server(identity).await
    }

    /// Delete a server cart record.
    ///
    /// The server is asked first; only on success is the matching local line
    /// removed and the snapshot refreshed.
    ///
    /// # Errors
    ///
    /// Returns an `ApiError` if the delete fails; nothing changes locally in
    /// that case.
    #[instrument(skip(self, identity))]
    pub async fn remove_server_item(
        &mut self,
        identity: &AuthIdentity,
        cart_id: CartId,
    ) -> Result<(), ApiError> {
        self.api
            .delete_item(identity.bearer_token(), cart_id)
            .await?;

        if let Some(product_id) = self.snapshot_product_id(cart_id) {
            self.remove_from_cart(product_id);
        }

        self.refresh_from_server(identity).await
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn snapshot_product_id(&self, cart_id: CartId) -> Option<ProductId> {
        self.server_snapshot
            .iter()
            .find(|record| record.cart_id == cart_id)
            .and_then(|record| record.product_id)
    }

    fn persist_lines(&self) {
        lock_store(&self.store).set(keys::CART, &self.lines);
    }

    fn spawn_server_add(&self, identity: &AuthIdentity, product_id: ProductId) {
        let api = self.api.clone();
        let token = identity.bearer_token().clone();
        let user_id = identity.id;

        self.sync.submit(
            "cart-add",
            async move {
                let outcome = api.add_to_cart(&token, user_id, product_id).await?;
                tracing::debug!(%product_id, ?outcome, "Server cart add finished");
                Ok::<(), ApiError>(())
            },
            move |outcome| {
                if let SyncOutcome::Failed(error) = outcome {
                    tracing::warn!(%product_id, error, "Server cart add not applied, local cart kept");
                }
            },
        );
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::store::LocalStore;

    fn product(id: i64, name: &str, price_cents: i64) -> Product {
        Product {
            id: ProductId::new(id),
            product_name: name.to_string(),
            catalogue_name: None,
            sub_catalogue_name: None,
            image_url: None,
            base_price: Some(Decimal::new(price_cents, 2)),
            short_description: None,
            long_description: None,
            brand: None,
            material: None,
            is_returnable: None,
        }
    }

    fn record(cart_id: i64, product_id: i64, price_cents: Option<i64>, quantity: i64) -> ServerCartRecord {
        ServerCartRecord {
            cart_id: CartId::new(cart_id),
            product_id: Some(ProductId::new(product_id)),
            product_name: format!("product-{product_id}"),
            image_url: None,
            base_price: price_cents.map(|cents| Decimal::new(cents, 2)),
            quantity,
        }
    }

    fn engine() -> (tempfile::TempDir, CartEngine) {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::open_shared(dir.path().join("store.json")).unwrap();
        let api = CartClient::new(&url::Url::parse("http://localhost:9090").unwrap());
        (dir, CartEngine::new(store, api, SyncQueue::new()))
    }

    #[test]
    fn test_add_same_product_twice_increments() {
        let (_dir, mut engine) = engine();
        let bottle = product(1, "Bottle", 999);

        assert_eq!(
            engine.add_to_cart(&bottle, None),
            CartEvent::Added(ProductId::new(1))
        );
        assert_eq!(
            engine.add_to_cart(&bottle, None),
            CartEvent::QuantityUpdated {
                product_id: ProductId::new(1),
                quantity: 2
            }
        );

        assert_eq!(engine.lines().len(), 1);
        assert_eq!(engine.lines()[0].quantity, 2);
        assert_eq!(engine.cart_count(), 2);
    }

    #[test]
    fn test_add_preserves_insertion_order() {
        let (_dir, mut engine) = engine();
        engine.add_to_cart(&product(2, "Mug", 450), None);
        engine.add_to_cart(&product(1, "Bottle", 999), None);
        engine.add_to_cart(&product(2, "Mug", 450), None);

        let ids: Vec<i64> = engine
            .lines()
            .iter()
            .map(|line| line.product_id.as_i64())
            .collect();
        assert_eq!(ids, vec![2, 1]);
    }

    #[test]
    fn test_update_quantity_zero_and_negative_remove() {
        let (_dir, mut engine) = engine();
        engine.add_to_cart(&product(1, "Bottle", 999), None);
        engine.update_quantity(ProductId::new(1), 0);
        assert!(engine.lines().is_empty());

        engine.add_to_cart(&product(1, "Bottle", 999), None);
        engine.update_quantity(ProductId::new(1), -1);
        assert!(engine.lines().is_empty());
    }

    #[test]
    fn test_update_quantity_missing_id_is_noop() {
        let (_dir, mut engine) = engine();
        engine.add_to_cart(&product(1, "Bottle", 999), None);
        let mut events = engine.subscribe();

        engine.update_quantity(ProductId::new(42), 5);

        assert_eq!(engine.lines().len(), 1);
        assert_eq!(engine.lines()[0].quantity, 1);
        assert!(events.try_recv().is_err());
    }

    #[test]
    fn test_cart_count_tracks_any_sequence() {
        let (_dir, mut engine) = engine();
        let bottle = product(1, "Bottle", 999);
        let mug = product(2, "Mug", 450);

        engine.add_to_cart(&bottle, None);
        engine.add_to_cart(&mug, None);
        engine.add_to_cart(&bottle, None);
        assert_eq!(engine.cart_count(), 3);

        engine.update_quantity(ProductId::new(2), 5);
        assert_eq!(engine.cart_count(), 7);

        engine.remove_from_cart(ProductId::new(1));
        assert_eq!(engine.cart_count(), 5);

        engine.clear_cart();
        assert_eq!(engine.cart_count(), 0);
    }

    #[test]
    fn test_cart_total_over_snapshot() {
        let (_dir, mut engine) = engine();
        engine.sync_from_server(vec![
            record(10, 1, Some(999), 2),  // 19.98
            record(11, 2, None, 3),       // missing price -> 0
            record(12, 3, Some(450), 0),  // non-positive quantity counts as 1
            record(13, 4, Some(100), -2), // likewise
        ]);

        assert_eq!(engine.cart_total(), Decimal::new(2548, 2));
    }

    #[test]
    fn test_sync_is_wholesale_replace() {
        let (_dir, mut engine) = engine();
        engine.sync_from_server(vec![
            record(10, 1, Some(999), 1),
            record(11, 2, Some(450), 1),
            record(12, 3, Some(100), 1),
        ]);
        assert_eq!(engine.server_cart_count(), 3);

        engine.sync_from_server(Vec::new());
        assert_eq!(engine.server_cart_count(), 0);
        assert!(engine.server_snapshot().is_empty());
        assert_eq!(engine.cart_total(), Decimal::ZERO);
    }

    #[test]
    fn test_mutations_are_mirrored_to_store_and_restored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        let api = CartClient::new(&url::Url::parse("http://localhost:9090").unwrap());

        {
            let store = LocalStore::open_shared(&path).unwrap();
            let mut engine = CartEngine::new(store, api.clone(), SyncQueue::new());
            engine.add_to_cart(&product(1, "Bottle", 999), None);
            engine.add_to_cart(&product(1, "Bottle", 999), None);
            engine.add_to_cart(&product(2, "Mug", 450), None);
        }

        let store = LocalStore::open_shared(&path).unwrap();
        let engine = CartEngine::new(store, api, SyncQueue::new());
        assert_eq!(engine.cart_count(), 3);
        assert_eq!(engine.lines()[0].product_name, "Bottle");
        assert_eq!(engine.lines()[0].quantity, 2);
    }

    #[test]
    fn test_events_reach_subscribers() {
        let (_dir, mut engine) = engine();
        let mut events = engine.subscribe();

        engine.add_to_cart(&product(1, "Bottle", 999), None);
        engine.remove_from_cart(ProductId::new(1));
        engine.clear_cart();

        assert_eq!(events.try_recv().unwrap(), CartEvent::Added(ProductId::new(1)));
        assert_eq!(
            events.try_recv().unwrap(),
            CartEvent::Removed(ProductId::new(1))
        );
        assert_eq!(events.try_recv().unwrap(), CartEvent::Cleared);
    }

    #[test]
    fn test_display_count_prefers_live_candidate() {
        let (_dir, mut engine) = engine();
        engine.add_to_cart(&product(1, "Bottle", 999), None);
        engine.add_to_cart(&product(1, "Bottle", 999), None);

        // Anonymous: local count wins.
        assert_eq!(engine.display_count(false), 2);

        // Authenticated with an empty snapshot: cached value is kept.
        assert_eq!(engine.display_count(true), 2);

        // Authenticated with a snapshot: server count wins.
        engine.sync_from_server(vec![record(10, 1, Some(999), 2)]);
        assert_eq!(engine.display_count(true), 1);
    }

    #[test]
    fn test_server_record_parses_service_json() {
        let json = r#"{
            "id": 31,
            "productId": 7,
            "productName": "Steel Water Bottle",
            "imageUrl": "http://cdn.example/bottle.png",
            "basePrice": 9.99,
            "quantity": 2
        }"#;

        let parsed: ServerCartRecord = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.cart_id, CartId::new(31));
        assert_eq!(parsed.product_id, Some(ProductId::new(7)));
        assert_eq!(parsed.base_price, Some(Decimal::new(999, 2)));
    }

    #[test]
    fn test_server_record_tolerates_missing_fields() {
        let parsed: ServerCartRecord = serde_json::from_str(r#"{"id": 31}"#).unwrap();
        assert_eq!(parsed.product_id, None);
        assert_eq!(parsed.quantity, 0);
        assert_eq!(parsed.base_price, None);
    }
}
