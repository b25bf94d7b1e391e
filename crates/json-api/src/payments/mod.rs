//! Payment provider endpoints: integrity hash generation, the status
//! webhook, and transaction lookup.

pub(crate) mod handlers;
