//! Payment Webhook Handler

use std::sync::Arc;

use jiff::Timestamp;
use salvo::{oapi::ToSchema, prelude::*};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use storefront_app::payments::PaymentNotification;

use crate::state::State;

/// Webhook Acknowledgement
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub(crate) struct WebhookResponse {
    /// Whether the notification was processed
    pub success: bool,

    /// Human-readable processing summary
    pub message: String,

    /// Time the webhook was acknowledged
    pub timestamp: String,
}

/// Payment Webhook Handler
///
/// Always answers 200, even when processing fails, so the provider does
/// not retry-storm the endpoint. Genuine failures are only logged.
#[endpoint(
    tags("payments"),
    summary = "Receive payment status notifications",
    responses(
        (status_code = StatusCode::OK, description = "Notification acknowledged"),
    ),
)]
pub(crate) async fn handler(req: &mut Request, depot: &mut Depot, res: &mut Response) {
    let acknowledged = |success: bool, message: &str| WebhookResponse {
        success,
        message: message.to_owned(),
        timestamp: Timestamp::now().to_string(),
    };

    let notification = match req.parse_json::<PaymentNotification>().await {
        Ok(notification) => notification,
        Err(parse_error) => {
            warn!("unparseable payment notification: {parse_error}");

            res.render(Json(acknowledged(false, "Could not parse notification")));
            return;
        }
    };

    let Ok(state) = depot.obtain::<Arc<State>>() else {
        error!("application state missing while processing webhook");

        res.render(Json(acknowledged(false, "Error processing notification")));
        return;
    };

    info!(
        order_id = ?notification.order_id,
        status = ?notification.status,
        "payment notification received"
    );

    state.payments.record(notification).await;

    res.render(Json(acknowledged(true, "Notification processed")));
}
