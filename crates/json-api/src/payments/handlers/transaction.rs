//! Transaction Lookup Handler

use std::sync::Arc;

use salvo::{
    oapi::{ToSchema, extract::PathParam},
    prelude::*,
};
use serde::{Deserialize, Serialize};

use crate::{extensions::*, state::State};

/// Transaction Status Response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TransactionResponse {
    /// Always `true` on this shape
    pub success: bool,

    /// The order reference that was queried
    pub order_id: String,

    /// Latest status reported by the provider
    pub status: Option<String>,

    /// Amount in minor units, when the provider reported one
    pub amount: Option<i64>,
}

/// Transaction Lookup Handler
///
/// Answers from the recorded webhook notifications; orders the provider
/// has not reported on yet are a 404, not a placeholder.
#[endpoint(
    tags("payments"),
    summary = "Look up a transaction's status",
    responses(
        (status_code = StatusCode::OK, description = "Latest known status"),
        (status_code = StatusCode::NOT_FOUND, description = "No notification recorded for this order"),
        (status_code = StatusCode::INTERNAL_SERVER_ERROR, description = "Internal Server Error"),
    ),
)]
pub(crate) async fn handler(
    order_id: PathParam<String>,
    depot: &mut Depot,
) -> Result<Json<TransactionResponse>, StatusError> {
    let state = depot.obtain_or_500::<Arc<State>>()?;
    let order_id = order_id.into_inner();

    let notification = state
        .payments
        .find(&order_id)
        .await
        .ok_or_else(StatusError::not_found)?;

    Ok(Json(TransactionResponse {
        success: true,
        order_id,
        status: notification.status,
        amount: notification.amount,
    }))
}
