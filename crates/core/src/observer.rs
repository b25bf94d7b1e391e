//! Cart observers
//!
//! Views (badge counter, item list, page summary) subscribe to the cart
//! and are told *that* something changed, not *what* the new state is:
//! they pull fresh totals through [`Cart::summary`] and
//! [`Cart::iter`], so a view registered after an event but before its
//! next read can never observe stale derived values.
//!
//! [`Cart::summary`]: crate::cart::Cart::summary
//! [`Cart::iter`]: crate::cart::Cart::iter

use slotmap::new_key_type;

use crate::cart::Cart;

new_key_type! {
    /// Handle for an observer subscription, used to unsubscribe when the
    /// hosting view is torn down.
    pub struct SubscriberKey;
}

/// A signal emitted after each successful cart mutation.
///
/// Emitted only after both the in-memory mutation and its write-through
/// persist have completed. Validation failures emit nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartEvent {
    /// An item was added, or its quantity grew by a re-add merge.
    ItemAdded {
        /// Product id of the affected line item.
        id: String,
    },

    /// An item was removed, either explicitly or by setting its
    /// quantity to zero.
    ItemRemoved {
        /// Product id of the removed line item.
        id: String,
    },

    /// An item's quantity was replaced.
    QuantityChanged {
        /// Product id of the affected line item.
        id: String,
        /// The new quantity.
        quantity: u32,
    },

    /// The cart was emptied.
    Cleared,
}

/// A consumer of cart mutation signals.
pub trait CartObserver {
    /// Called after a successful mutation; `cart` exposes the fresh
    /// post-mutation state.
    fn on_cart_event(&self, event: &CartEvent, cart: &Cart);
}

impl<F> CartObserver for F
where
    F: Fn(&CartEvent, &Cart),
{
    fn on_cart_event(&self, event: &CartEvent, cart: &Cart) {
        self(event, cart);
    }
}
