//! Embedded button payment provider.
//!
//! Unlike the modal widget, this provider renders its own button from a
//! script tag's `data-*` attributes and returns the shopper via a
//! redirect URL rather than a callback. The integrity signature the
//! attributes carry comes from the backend's hash endpoint; failing to
//! obtain one blocks the checkout.

use async_trait::async_trait;
use mockall::automock;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use storefront::checkout::CheckoutRequest;

/// Render mode requested from the provider's script.
const RENDER_MODE: &str = "embedded";

/// Button style identifier.
const BUTTON_STYLE: &str = "dark-L";

/// VAT marker attached when the order carries tax.
const VAT_MARKER: &str = "vat-19";

#[derive(Debug, Error)]
pub enum ButtonError {
    /// The hash endpoint could not be reached or answered with an error
    /// status.
    #[error("integrity hash request failed")]
    Http(#[from] reqwest::Error),

    /// The hash endpoint answered but refused to sign the order.
    #[error("integrity hash rejected: {0}")]
    Rejected(String),
}

/// Obtains an integrity signature for one order.
#[automock]
#[async_trait]
pub trait IntegrityClient: Send + Sync {
    /// # Errors
    ///
    /// Any failure here is critical and blocks the checkout; there is no
    /// fallback signature.
    async fn generate_hash(
        &self,
        order_id: &str,
        currency: &str,
        amount_minor_units: i64,
    ) -> Result<String, ButtonError>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct HashRequest<'a> {
    order_id: &'a str,
    currency: &'a str,
    amount: i64,
}

#[derive(Debug, Deserialize)]
struct HashResponse {
    success: bool,
    hash: Option<String>,
    error: Option<String>,
}

/// Integrity client backed by the backend's hash endpoint.
#[derive(Debug, Clone)]
pub struct HttpIntegrityClient {
    http: reqwest::Client,
    base_url: String,
}

impl HttpIntegrityClient {
    #[must_use]
    pub fn new(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl IntegrityClient for HttpIntegrityClient {
    async fn generate_hash(
        &self,
        order_id: &str,
        currency: &str,
        amount_minor_units: i64,
    ) -> Result<String, ButtonError> {
        let url = format!("{}/api/bold/generate-hash", self.base_url);

        let response = self
            .http
            .post(&url)
            .json(&HashRequest {
                order_id,
                currency,
                amount: amount_minor_units,
            })
            .send()
            .await?
            .error_for_status()?;

        let body: HashResponse = response.json().await?;

        if !body.success {
            return Err(ButtonError::Rejected(
                body.error.unwrap_or_else(|| "unknown error".to_owned()),
            ));
        }

        body.hash
            .ok_or_else(|| ButtonError::Rejected("response carried no hash".to_owned()))
    }
}

/// Merchant-level settings for the embedded button.
#[derive(Debug, Clone)]
pub struct ButtonConfig {
    /// Public API key identifying the merchant.
    pub api_key: String,

    /// Site origin the provider redirects back to.
    pub site_origin: String,
}

impl ButtonConfig {
    #[must_use]
    pub fn new(api_key: impl Into<String>, site_origin: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            site_origin: site_origin.into(),
        }
    }

    /// Where the provider sends the shopper after a completed payment.
    #[must_use]
    pub fn redirection_url(&self) -> String {
        format!("{}/carrito?payment=success", self.site_origin)
    }

    /// Where the provider sends the shopper after abandoning payment.
    #[must_use]
    pub fn origin_url(&self) -> String {
        format!("{}/carrito?payment=abandoned", self.site_origin)
    }

    /// Renders the `data-*` attributes the provider script consumes.
    ///
    /// `tax_minor_units` drives the optional VAT marker; zero-tax orders
    /// omit it.
    #[must_use]
    pub fn attributes(
        &self,
        request: &CheckoutRequest,
        integrity_signature: &str,
        tax_minor_units: i64,
    ) -> Vec<(&'static str, String)> {
        let mut attributes = vec![
            ("data-bold-button", BUTTON_STYLE.to_owned()),
            ("data-order-id", request.reference.clone()),
            ("data-currency", request.currency.clone()),
            ("data-amount", request.amount_minor_units.to_string()),
            ("data-api-key", self.api_key.clone()),
            ("data-integrity-signature", integrity_signature.to_owned()),
            ("data-redirection-url", self.redirection_url()),
            ("data-origin-url", self.origin_url()),
            ("data-description", request.description.clone()),
            ("data-render-mode", RENDER_MODE.to_owned()),
        ];

        if tax_minor_units > 0 {
            attributes.push(("data-tax", VAT_MARKER.to_owned()));
        }

        info!(
            order_id = %request.reference,
            amount = request.amount_minor_units,
            "prepared embedded button attributes"
        );

        attributes
    }
}
