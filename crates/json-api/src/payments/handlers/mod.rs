//! Payment endpoint handlers.

pub(crate) mod generate_hash;
pub(crate) mod transaction;
pub(crate) mod webhook;
