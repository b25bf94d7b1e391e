//! App Router

use salvo::Router;

use crate::{healthcheck, payments};

pub(crate) fn app_router() -> Router {
    Router::new()
        .push(Router::with_path("healthcheck").get(healthcheck::handler))
        .push(
            Router::with_path("api").push(
                Router::with_path("bold")
                    .push(
                        Router::with_path("generate-hash")
                            .post(payments::handlers::generate_hash::handler),
                    )
                    .push(
                        Router::with_path("transaction/{order_id}")
                            .get(payments::handlers::transaction::handler),
                    ),
            ),
        )
        .push(
            Router::with_path("webhooks/bold-payment").post(payments::handlers::webhook::handler),
        )
}
