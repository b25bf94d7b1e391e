//! Integrity Hash Handler

use std::sync::Arc;

use jiff::Timestamp;
use salvo::{
    oapi::{ToSchema, extract::JsonBody},
    prelude::*,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use storefront_app::integrity::IntegrityError;

use crate::{extensions::*, state::State};

/// Integrity Hash Request
///
/// Every field is optional at the parsing level so missing ones can be
/// reported back by name.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GenerateHashRequest {
    /// Order reference to sign
    pub order_id: Option<String>,

    /// ISO currency code
    pub currency: Option<String>,

    /// Order amount in currency minor units
    pub amount: Option<i64>,
}

impl GenerateHashRequest {
    fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();

        if self.order_id.is_none() {
            missing.push("orderId");
        }
        if self.currency.is_none() {
            missing.push("currency");
        }
        if self.amount.is_none() {
            missing.push("amount");
        }

        missing
    }
}

/// Integrity Hash Response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub(crate) struct HashGeneratedResponse {
    /// Always `true` on this shape
    pub success: bool,

    /// Hex-encoded integrity hash
    pub hash: String,

    /// The order reference that was signed
    pub order_id: String,

    /// Time the hash was generated
    pub timestamp: String,
}

/// Integrity Hash Error Response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub(crate) struct HashErrorResponse {
    /// Always `false` on this shape
    pub success: bool,

    /// What went wrong
    pub error: String,

    /// Names of required fields absent from the request
    #[serde(skip_serializing_if = "Option::is_none")]
    pub missing: Option<Vec<String>>,
}

/// Integrity Hash Handler
///
/// Signs an order so the embedded button provider can verify it. The
/// signing secret never leaves the server; clients only ever see the
/// resulting hash.
#[endpoint(
    tags("payments"),
    summary = "Generate order integrity hash",
    responses(
        (status_code = StatusCode::OK, description = "Hash generated"),
        (status_code = StatusCode::BAD_REQUEST, description = "Missing or invalid fields"),
        (status_code = StatusCode::INTERNAL_SERVER_ERROR, description = "Signing secret not configured"),
    ),
)]
pub(crate) async fn handler(
    json: JsonBody<GenerateHashRequest>,
    depot: &mut Depot,
    res: &mut Response,
) -> Result<(), StatusError> {
    let state = depot.obtain_or_500::<Arc<State>>()?;
    let request = json.into_inner();

    let missing = request.missing_fields();
    if !missing.is_empty() {
        warn!(?missing, "hash request with missing fields");

        res.status_code(StatusCode::BAD_REQUEST)
            .render(Json(HashErrorResponse {
                success: false,
                error: "Missing required fields".to_owned(),
                missing: Some(missing.iter().map(ToString::to_string).collect()),
            }));

        return Ok(());
    }

    let (Some(order_id), Some(currency), Some(amount)) =
        (request.order_id, request.currency, request.amount)
    else {
        return Err(StatusError::bad_request());
    };

    if amount <= 0 {
        warn!(amount, "hash request with non-positive amount");

        res.status_code(StatusCode::BAD_REQUEST)
            .render(Json(HashErrorResponse {
                success: false,
                error: "Amount must be a positive integer".to_owned(),
                missing: None,
            }));

        return Ok(());
    }

    match state.integrity.sign(&order_id, &currency, amount) {
        Ok(hash) => {
            info!(%order_id, %currency, amount, "integrity hash generated");

            res.render(Json(HashGeneratedResponse {
                success: true,
                hash,
                order_id,
                timestamp: Timestamp::now().to_string(),
            }));
        }
        Err(IntegrityError::SecretNotConfigured) => {
            error!("integrity secret is not configured");

            res.status_code(StatusCode::INTERNAL_SERVER_ERROR)
                .render(Json(HashErrorResponse {
                    success: false,
                    error: "Server configuration error".to_owned(),
                    missing: None,
                }));
        }
    }

    Ok(())
}
