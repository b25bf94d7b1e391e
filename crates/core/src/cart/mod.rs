//! Cart aggregate

use std::fmt;

use decimal_percentage::Percentage;
use jiff::{SignedDuration, Timestamp};
use rust_decimal::{Decimal, RoundingStrategy};
use rusty_money::iso::{self, Currency};
use slotmap::SlotMap;
use thiserror::Error;
use tracing::warn;

use crate::{
    items::LineItem,
    observer::{CartEvent, CartObserver, SubscriberKey},
    store::{CartStore, decode_envelope},
};

/// Errors surfaced by cart mutations.
///
/// Every variant leaves the cart untouched: nothing is persisted and no
/// observer is notified.
#[derive(Debug, Error)]
pub enum CartError {
    /// The product id was empty.
    #[error("product id must not be empty")]
    EmptyId,

    /// The product name was empty.
    #[error("product name must not be empty")]
    EmptyName,

    /// The unit price was zero or negative.
    #[error("unit price must be positive, got {0}")]
    NonPositivePrice(Decimal),

    /// The requested quantity was zero.
    #[error("quantity must be at least 1")]
    ZeroQuantity,

    /// The resulting quantity would exceed the per-item maximum. The
    /// existing quantity is left as it was, never clamped.
    #[error("quantity {requested} for {id} exceeds the maximum of {max}")]
    QuantityAboveMax {
        /// Product id of the rejected mutation.
        id: String,
        /// Quantity the mutation would have produced.
        requested: u32,
        /// Configured per-item maximum.
        max: u32,
    },
}

/// Configuration for a cart session.
#[derive(Debug, Clone)]
pub struct CartConfig {
    /// Upper bound for a single line item's quantity.
    pub max_item_quantity: u32,

    /// Fixed tax rate applied to the subtotal.
    pub tax_rate: Percentage,

    /// Currency all prices are denominated in.
    pub currency: &'static Currency,

    /// Persisted items older than this are silently dropped on load.
    pub retention: SignedDuration,
}

impl Default for CartConfig {
    fn default() -> Self {
        Self {
            max_item_quantity: 99,
            tax_rate: Percentage::from(0.19),
            currency: iso::COP,
            retention: SignedDuration::from_hours(7 * 24),
        }
    }
}

/// Derived cart totals. Never persisted, always recomputed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CartSummary {
    /// Sum of `unit_price × quantity` over all items.
    pub subtotal: Decimal,

    /// `subtotal × tax_rate`, rounded to two decimal places.
    pub tax: Decimal,

    /// `subtotal + tax`.
    pub total: Decimal,

    /// Sum of all item quantities.
    pub item_count: u32,
}

/// The ordered collection of line items owned by one browsing session.
///
/// Loaded once from its [`CartStore`] at construction; every successful
/// mutation writes the full item list back through the store and then
/// signals subscribed observers, in that order, so an observer reacting
/// to a signal can rely on storage matching memory.
pub struct Cart {
    items: Vec<LineItem>,
    config: CartConfig,
    store: Box<dyn CartStore>,
    observers: SlotMap<SubscriberKey, Box<dyn CartObserver>>,
}

impl fmt::Debug for Cart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cart")
            .field("items", &self.items)
            .field("config", &self.config)
            .field("observers", &self.observers.len())
            .finish_non_exhaustive()
    }
}

impl Cart {
    /// Creates a cart by loading whatever the store currently holds.
    ///
    /// Expired and malformed persisted entries are dropped; if that
    /// pruning changed the set, the pruned set is immediately written
    /// back. A load failure yields an empty cart rather than an error.
    #[must_use]
    pub fn new(config: CartConfig, store: Box<dyn CartStore>) -> Self {
        let raw = match store.load() {
            Ok(raw) => raw,
            Err(error) => {
                warn!("cart load failed, starting empty: {error}");
                None
            }
        };

        let (items, dropped) = match raw {
            Some(raw) => decode_envelope(&raw, Timestamp::now(), config.retention),
            None => (Vec::new(), false),
        };

        if dropped {
            if let Err(error) = store.save(&items) {
                warn!("failed to re-persist pruned cart: {error}");
            }
        }

        Self {
            items,
            config,
            store,
            observers: SlotMap::with_key(),
        }
    }

    /// Adds a product, merging quantities if it is already present.
    ///
    /// # Errors
    ///
    /// Returns a [`CartError`] when the name or id is empty, the price
    /// is not positive, the quantity is zero, or the merged quantity
    /// would exceed the configured maximum. On error nothing is
    /// persisted and no observer is signalled.
    pub fn add_item(
        &mut self,
        id: impl Into<String>,
        name: impl Into<String>,
        unit_price: Decimal,
        quantity: u32,
    ) -> Result<(), CartError> {
        let id = id.into();
        let name = name.into();

        if id.is_empty() {
            return Err(CartError::EmptyId);
        }
        if name.is_empty() {
            return Err(CartError::EmptyName);
        }
        if unit_price <= Decimal::ZERO {
            return Err(CartError::NonPositivePrice(unit_price));
        }
        if quantity == 0 {
            return Err(CartError::ZeroQuantity);
        }

        let max = self.config.max_item_quantity;

        if let Some(existing) = self.items.iter_mut().find(|item| item.id() == id) {
            let merged = existing.quantity().saturating_add(quantity);

            if merged > max {
                return Err(CartError::QuantityAboveMax {
                    id,
                    requested: merged,
                    max,
                });
            }

            existing.set_quantity(merged);
        } else {
            if quantity > max {
                return Err(CartError::QuantityAboveMax {
                    id,
                    requested: quantity,
                    max,
                });
            }

            self.items.push(LineItem::new(&id, name, unit_price, quantity));
        }

        self.persist_then_notify(CartEvent::ItemAdded { id });

        Ok(())
    }

    /// Removes a product. Removing an absent id is a no-op.
    ///
    /// Returns whether anything was removed.
    pub fn remove_item(&mut self, id: &str) -> bool {
        let Some(index) = self.items.iter().position(|item| item.id() == id) else {
            return false;
        };

        self.items.remove(index);
        self.persist_then_notify(CartEvent::ItemRemoved { id: id.to_owned() });

        true
    }

    /// Replaces a product's quantity exactly.
    ///
    /// A quantity of zero removes the item. Setting the quantity of an
    /// absent id is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::QuantityAboveMax`] when the new quantity
    /// exceeds the configured maximum; the cart is left unchanged.
    pub fn set_quantity(&mut self, id: &str, quantity: u32) -> Result<(), CartError> {
        let max = self.config.max_item_quantity;

        if !self.items.iter().any(|item| item.id() == id) {
            return Ok(());
        }

        if quantity == 0 {
            self.remove_item(id);
            return Ok(());
        }

        if quantity > max {
            return Err(CartError::QuantityAboveMax {
                id: id.to_owned(),
                requested: quantity,
                max,
            });
        }

        if let Some(item) = self.items.iter_mut().find(|item| item.id() == id) {
            item.set_quantity(quantity);
        }
        self.persist_then_notify(CartEvent::QuantityChanged {
            id: id.to_owned(),
            quantity,
        });

        Ok(())
    }

    /// Empties the cart. Clearing an already-empty cart is a no-op.
    ///
    /// Any confirmation prompt belongs at the UI boundary; callers are
    /// expected to have gated a user-initiated clear before invoking
    /// this.
    pub fn clear(&mut self) {
        if self.items.is_empty() {
            return;
        }

        self.items.clear();
        self.persist_then_notify(CartEvent::Cleared);
    }

    /// Recomputes the derived totals.
    ///
    /// Pure and deterministic: repeated calls with no mutation in
    /// between return identical results.
    #[must_use]
    pub fn summary(&self) -> CartSummary {
        let subtotal: Decimal = self.items.iter().map(LineItem::line_total).sum();

        let tax = (self.config.tax_rate * subtotal)
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);

        CartSummary {
            subtotal,
            tax,
            total: subtotal + tax,
            item_count: self.items.iter().map(LineItem::quantity).sum(),
        }
    }

    /// Iterates over the line items in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &LineItem> {
        self.items.iter()
    }

    /// Looks up a line item by product id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&LineItem> {
        self.items.iter().find(|item| item.id() == id)
    }

    /// Returns the number of distinct line items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Checks whether the cart holds no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Returns the currency all prices are denominated in.
    #[must_use]
    pub fn currency(&self) -> &'static Currency {
        self.config.currency
    }

    /// Registers an observer; the returned key unsubscribes it.
    pub fn subscribe(&mut self, observer: Box<dyn CartObserver>) -> SubscriberKey {
        self.observers.insert(observer)
    }

    /// Removes an observer. Returns whether it was registered.
    pub fn unsubscribe(&mut self, key: SubscriberKey) -> bool {
        self.observers.remove(key).is_some()
    }

    /// Write-through persist followed by observer notification. A
    /// persistence failure is logged and swallowed; the in-memory cart
    /// stays authoritative for the rest of the session.
    fn persist_then_notify(&mut self, event: CartEvent) {
        if let Err(error) = self.store.save(&self.items) {
            warn!("cart persistence failed, continuing in memory: {error}");
        }

        for (_key, observer) in &self.observers {
            observer.on_cart_event(&event, self);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, rc::Rc};

    use testresult::TestResult;

    use crate::store::{MemoryStore, decode_envelope};

    use super::*;

    fn price(minor: i64) -> Decimal {
        Decimal::new(minor, 2)
    }

    fn cart() -> Cart {
        Cart::new(CartConfig::default(), Box::new(MemoryStore::new()))
    }

    fn stored_items(store: &MemoryStore, config: &CartConfig) -> Vec<LineItem> {
        let raw = store.load().expect("load should succeed").unwrap_or_default();
        decode_envelope(&raw, Timestamp::now(), config.retention).0
    }

    #[test]
    fn summary_of_empty_cart_is_zero() {
        let summary = cart().summary();

        assert_eq!(summary.subtotal, Decimal::ZERO);
        assert_eq!(summary.tax, Decimal::ZERO);
        assert_eq!(summary.total, Decimal::ZERO);
        assert_eq!(summary.item_count, 0);
    }

    #[test]
    fn summary_applies_the_tax_rate() -> TestResult {
        let mut cart = cart();
        cart.add_item("p1", "Widget", price(10_00), 2)?;

        let summary = cart.summary();

        assert_eq!(summary.subtotal, price(20_00));
        assert_eq!(summary.tax, price(3_80));
        assert_eq!(summary.total, price(23_80));
        assert_eq!(summary.item_count, 2);

        Ok(())
    }

    #[test]
    fn summary_is_idempotent() -> TestResult {
        let mut cart = cart();
        cart.add_item("p1", "Widget", price(13_37), 3)?;

        assert_eq!(cart.summary(), cart.summary());

        Ok(())
    }

    #[test]
    fn re_adding_merges_quantities() -> TestResult {
        let mut cart = cart();

        cart.add_item("p1", "Widget", price(10_00), 2)?;
        cart.add_item("p1", "Widget", price(10_00), 3)?;

        assert_eq!(cart.len(), 1);
        assert_eq!(cart.get("p1").map(LineItem::quantity), Some(5));

        Ok(())
    }

    #[test]
    fn merge_up_to_the_maximum_succeeds() -> TestResult {
        let mut cart = cart();

        cart.add_item("p1", "Widget", price(10_00), 95)?;
        cart.add_item("p1", "Widget", price(10_00), 4)?;

        assert_eq!(cart.get("p1").map(LineItem::quantity), Some(99));

        Ok(())
    }

    #[test]
    fn merge_past_the_maximum_is_rejected_without_clamping() -> TestResult {
        let mut cart = cart();
        cart.add_item("p1", "Widget", price(10_00), 95)?;

        let result = cart.add_item("p1", "Widget", price(10_00), 5);

        assert!(
            matches!(
                result,
                Err(CartError::QuantityAboveMax {
                    requested: 100,
                    max: 99,
                    ..
                })
            ),
            "expected QuantityAboveMax, got {result:?}"
        );
        assert_eq!(cart.get("p1").map(LineItem::quantity), Some(95));

        Ok(())
    }

    #[test]
    fn add_rejects_invalid_input() {
        let mut cart = cart();

        assert!(matches!(
            cart.add_item("", "Widget", price(100), 1),
            Err(CartError::EmptyId)
        ));
        assert!(matches!(
            cart.add_item("p1", "", price(100), 1),
            Err(CartError::EmptyName)
        ));
        assert!(matches!(
            cart.add_item("p1", "Widget", Decimal::ZERO, 1),
            Err(CartError::NonPositivePrice(_))
        ));
        assert!(matches!(
            cart.add_item("p1", "Widget", price(100), 0),
            Err(CartError::ZeroQuantity)
        ));
        assert!(cart.is_empty());
    }

    #[test]
    fn set_quantity_replaces_exactly() -> TestResult {
        let mut cart = cart();
        cart.add_item("p1", "Widget", price(10_00), 3)?;

        cart.set_quantity("p1", 1)?;

        assert_eq!(cart.summary().item_count, 1);
        assert_eq!(cart.summary().subtotal, price(10_00));

        Ok(())
    }

    #[test]
    fn set_quantity_zero_removes_the_item() -> TestResult {
        let mut cart = cart();
        cart.add_item("p1", "Widget", price(10_00), 3)?;

        cart.set_quantity("p1", 0)?;

        assert!(cart.is_empty());

        Ok(())
    }

    #[test]
    fn set_quantity_above_max_is_rejected() -> TestResult {
        let mut cart = cart();
        cart.add_item("p1", "Widget", price(10_00), 3)?;

        let result = cart.set_quantity("p1", 100);

        assert!(
            matches!(result, Err(CartError::QuantityAboveMax { .. })),
            "expected QuantityAboveMax, got {result:?}"
        );
        assert_eq!(cart.get("p1").map(LineItem::quantity), Some(3));

        Ok(())
    }

    #[test]
    fn set_quantity_of_absent_id_is_a_no_op() -> TestResult {
        let mut cart = cart();

        cart.set_quantity("ghost", 5)?;

        assert!(cart.is_empty());

        Ok(())
    }

    #[test]
    fn remove_of_absent_id_is_a_no_op() {
        let mut cart = cart();

        assert!(!cart.remove_item("ghost"));
    }

    #[test]
    fn mutations_write_through_to_the_store() -> TestResult {
        let store = Rc::new(MemoryStore::new());
        let config = CartConfig::default();
        let mut cart = Cart::new(config.clone(), Box::new(Rc::clone(&store)));

        cart.add_item("p1", "Widget", price(10_00), 2)?;
        assert_eq!(stored_items(&store, &config).len(), 1);

        cart.clear();
        assert!(stored_items(&store, &config).is_empty());

        Ok(())
    }

    #[test]
    fn failed_mutations_are_fully_inert() -> TestResult {
        let store = Rc::new(MemoryStore::new());
        let config = CartConfig::default();
        let mut cart = Cart::new(config.clone(), Box::new(Rc::clone(&store)));
        cart.add_item("p1", "Widget", price(10_00), 95)?;

        let signals = Rc::new(RefCell::new(Vec::new()));
        let seen = Rc::clone(&signals);
        cart.subscribe(Box::new(move |event: &CartEvent, _cart: &Cart| {
            seen.borrow_mut().push(event.clone());
        }));

        let _rejected = cart.add_item("p1", "Widget", price(10_00), 5);

        assert!(signals.borrow().is_empty());
        assert_eq!(stored_items(&store, &config).len(), 1);
        assert_eq!(
            stored_items(&store, &config).first().map(LineItem::quantity),
            Some(95)
        );

        Ok(())
    }

    #[test]
    fn observers_see_fresh_state_after_persist() -> TestResult {
        let mut cart = cart();

        let counts = Rc::new(RefCell::new(Vec::new()));
        let seen = Rc::clone(&counts);
        cart.subscribe(Box::new(move |_event: &CartEvent, cart: &Cart| {
            seen.borrow_mut().push(cart.summary().item_count);
        }));

        cart.add_item("p1", "Widget", price(10_00), 2)?;
        cart.set_quantity("p1", 5)?;
        cart.remove_item("p1");

        assert_eq!(*counts.borrow(), vec![2, 5, 0]);

        Ok(())
    }

    #[test]
    fn unsubscribed_observers_are_not_signalled() -> TestResult {
        let mut cart = cart();

        let signals = Rc::new(RefCell::new(0_usize));
        let seen = Rc::clone(&signals);
        let key = cart.subscribe(Box::new(move |_event: &CartEvent, _cart: &Cart| {
            *seen.borrow_mut() += 1;
        }));

        cart.add_item("p1", "Widget", price(10_00), 1)?;
        assert!(cart.unsubscribe(key));
        cart.add_item("p2", "Gadget", price(5_00), 1)?;

        assert_eq!(*signals.borrow(), 1);

        Ok(())
    }

    #[test]
    fn load_prunes_expired_items_and_re_persists() -> TestResult {
        let now = Timestamp::now();
        let stale = now - SignedDuration::from_hours(8 * 24);

        let raw = format!(
            r#"[
                {{"id":"old","name":"Old","unit_price":"1.00","quantity":1,"added_at":"{stale}"}},
                {{"id":"new","name":"New","unit_price":"2.00","quantity":1,"added_at":"{now}"}}
            ]"#
        );

        let store = Rc::new(MemoryStore::with_raw(raw));
        let config = CartConfig::default();
        let cart = Cart::new(config.clone(), Box::new(Rc::clone(&store)));

        assert_eq!(cart.len(), 1);
        assert!(cart.get("new").is_some());

        // The pruned set was written straight back.
        let persisted = stored_items(&store, &config);
        assert_eq!(persisted.len(), 1);
        assert_eq!(persisted.first().map(LineItem::id), Some("new"));

        Ok(())
    }

    #[test]
    fn corrupt_envelope_loads_an_empty_cart() {
        let store = MemoryStore::with_raw("{definitely not json");
        let cart = Cart::new(CartConfig::default(), Box::new(store));

        assert!(cart.is_empty());
    }
}
