//! Line items

use jiff::Timestamp;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One product entry and its quantity in a cart.
///
/// At most one line item exists per distinct product `id`; re-adding the
/// same product merges quantities instead of duplicating the entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    id: String,
    name: String,
    unit_price: Decimal,
    quantity: u32,
    /// `None` only for legacy persisted entries written before the
    /// timestamp field existed; such entries are never expired.
    #[serde(default)]
    added_at: Option<Timestamp>,
}

impl LineItem {
    /// Creates a new line item stamped with the current time.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>, unit_price: Decimal, quantity: u32) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            unit_price,
            quantity,
            added_at: Some(Timestamp::now()),
        }
    }

    /// Returns the stable product id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the product name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the unit price.
    #[must_use]
    pub fn unit_price(&self) -> Decimal {
        self.unit_price
    }

    /// Returns the quantity.
    #[must_use]
    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    /// Returns when the item was first added, if known.
    #[must_use]
    pub fn added_at(&self) -> Option<Timestamp> {
        self.added_at
    }

    /// Returns `unit_price × quantity`.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }

    pub(crate) fn set_quantity(&mut self, quantity: u32) {
        self.quantity = quantity;
    }

    /// A well-formed item has a non-empty id and name, a positive price,
    /// and a quantity of at least one.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        !self.id.is_empty()
            && !self.name.is_empty()
            && self.unit_price > Decimal::ZERO
            && self.quantity >= 1
    }
}
