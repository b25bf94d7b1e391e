//! Test helpers.

use std::sync::Arc;

use salvo::{affix_state::inject, prelude::*};

use storefront_app::{integrity::MockIntegritySigner, payments::MockPaymentEventsService};

use crate::state::State;

fn strict_integrity_mock() -> MockIntegritySigner {
    let mut integrity = MockIntegritySigner::new();

    integrity.expect_sign().never();

    integrity
}

fn strict_payments_mock() -> MockPaymentEventsService {
    let mut payments = MockPaymentEventsService::new();

    payments.expect_record().never();
    payments.expect_find().never();

    payments
}

pub(crate) fn state_with_integrity(integrity: MockIntegritySigner) -> Arc<State> {
    Arc::new(State::new(
        Arc::new(integrity),
        Arc::new(strict_payments_mock()),
    ))
}

pub(crate) fn state_with_payments(payments: MockPaymentEventsService) -> Arc<State> {
    Arc::new(State::new(
        Arc::new(strict_integrity_mock()),
        Arc::new(payments),
    ))
}

pub(crate) fn payments_service(state: Arc<State>, route: Router) -> Service {
    Service::new(Router::new().hoop(inject(state)).push(route))
}
