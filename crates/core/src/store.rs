//! Cart persistence
//!
//! The cart is persisted as a single key holding a JSON array of line
//! items. Stores are write-through and deliberately forgiving: a load
//! failure yields an empty cart and a save failure is reported to the
//! caller, never raised as a panic. The key is shared across concurrent
//! sessions of the same origin; the last writer wins.

use std::{cell::RefCell, fs, io, path::PathBuf};

use jiff::{SignedDuration, Timestamp};
use thiserror::Error;

use crate::items::LineItem;

/// Errors related to reading or writing the persisted cart.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The underlying storage could not be read or written.
    #[error("cart storage i/o failed: {0}")]
    Io(#[from] io::Error),

    /// The line items could not be serialized.
    #[error("cart serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Durable key-value persistence for the cart envelope.
pub trait CartStore {
    /// Serializes and writes the full line item list.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] when the write fails. Callers treat this
    /// as non-fatal: the in-memory cart stays authoritative.
    fn save(&self, items: &[LineItem]) -> Result<(), StoreError>;

    /// Reads the raw envelope, or `None` when nothing was ever saved.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] when the read fails.
    fn load(&self) -> Result<Option<String>, StoreError>;
}

/// Decodes a raw envelope into line items.
///
/// Malformed entries (missing fields, non-numeric prices, zero
/// quantities) are dropped rather than failing the whole load, and
/// entries older than `retention` are expired. Legacy entries without an
/// `added_at` stamp are kept. Returns the surviving items plus whether
/// anything was dropped, so the caller can re-persist the pruned set.
#[must_use]
pub fn decode_envelope(
    raw: &str,
    now: Timestamp,
    retention: SignedDuration,
) -> (Vec<LineItem>, bool) {
    let Ok(values) = serde_json::from_str::<Vec<serde_json::Value>>(raw) else {
        return (Vec::new(), false);
    };

    let total = values.len();

    let items: Vec<LineItem> = values
        .into_iter()
        .filter_map(|value| serde_json::from_value::<LineItem>(value).ok())
        .filter(LineItem::is_well_formed)
        .filter(|item| match item.added_at() {
            None => true,
            Some(added_at) => now.duration_since(added_at) < retention,
        })
        .collect();

    let dropped = items.len() != total;

    (items, dropped)
}

impl<S: CartStore + ?Sized> CartStore for std::rc::Rc<S> {
    fn save(&self, items: &[LineItem]) -> Result<(), StoreError> {
        (**self).save(items)
    }

    fn load(&self) -> Result<Option<String>, StoreError> {
        (**self).load()
    }
}

/// A [`CartStore`] backed by a single JSON file.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// Creates a store that reads and writes the given file.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl CartStore for JsonFileStore {
    fn save(&self, items: &[LineItem]) -> Result<(), StoreError> {
        let raw = serde_json::to_string(items)?;
        fs::write(&self.path, raw)?;

        Ok(())
    }

    fn load(&self) -> Result<Option<String>, StoreError> {
        match fs::read_to_string(&self.path) {
            Ok(raw) => Ok(Some(raw)),
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(error) => Err(StoreError::Io(error)),
        }
    }
}

/// An in-memory [`CartStore`] for tests and storage-less sessions.
#[derive(Debug, Default)]
pub struct MemoryStore {
    raw: RefCell<Option<String>>,
}

impl MemoryStore {
    /// Creates an empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-seeded with a raw envelope.
    #[must_use]
    pub fn with_raw(raw: impl Into<String>) -> Self {
        Self {
            raw: RefCell::new(Some(raw.into())),
        }
    }
}

impl CartStore for MemoryStore {
    fn save(&self, items: &[LineItem]) -> Result<(), StoreError> {
        let raw = serde_json::to_string(items)?;
        *self.raw.borrow_mut() = Some(raw);

        Ok(())
    }

    fn load(&self) -> Result<Option<String>, StoreError> {
        Ok(self.raw.borrow().clone())
    }
}
