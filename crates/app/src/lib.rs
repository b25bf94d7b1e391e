//! Shared application services: payment integrity signing, payment event
//! tracking, and the two external payment provider adapters.

pub mod context;
pub mod integrity;
pub mod payments;
pub mod providers;
