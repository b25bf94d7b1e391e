//! App Context

use std::sync::Arc;

use crate::{
    integrity::{IntegritySigner, PaymentSecret, Sha256IntegritySigner},
    payments::{InMemoryPaymentEvents, PaymentEventsService},
};

/// Services shared by every request handler.
#[derive(Clone)]
pub struct AppContext {
    pub integrity: Arc<dyn IntegritySigner>,
    pub payments: Arc<dyn PaymentEventsService>,
}

impl AppContext {
    /// Builds the context from an optional signing secret.
    ///
    /// A missing secret is not fatal here; the hash endpoint reports it
    /// per request instead.
    #[must_use]
    pub fn new(secret: Option<PaymentSecret>) -> Self {
        Self {
            integrity: Arc::new(Sha256IntegritySigner::new(secret)),
            payments: Arc::new(InMemoryPaymentEvents::new()),
        }
    }
}
