//! Storefront
//!
//! A cart and checkout hand-off engine for a small storefront: line items
//! with write-through persistence, recomputed totals, observer-based view
//! synchronization, and a single-attempt payment hand-off state machine.

pub mod cart;
pub mod checkout;
pub mod items;
pub mod observer;
pub mod store;
