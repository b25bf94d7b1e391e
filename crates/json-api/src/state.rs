//! State

use std::sync::Arc;

use storefront_app::{
    context::AppContext, integrity::IntegritySigner, payments::PaymentEventsService,
};

#[derive(Clone)]
pub(crate) struct State {
    pub(crate) integrity: Arc<dyn IntegritySigner>,
    pub(crate) payments: Arc<dyn PaymentEventsService>,
}

impl State {
    #[must_use]
    pub(crate) fn new(
        integrity: Arc<dyn IntegritySigner>,
        payments: Arc<dyn PaymentEventsService>,
    ) -> Self {
        Self {
            integrity,
            payments,
        }
    }

    #[must_use]
    pub(crate) fn from_app_context(app: AppContext) -> Arc<Self> {
        Arc::new(Self::new(app.integrity, app.payments))
    }
}
