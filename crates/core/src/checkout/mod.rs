//! Checkout hand-off
//!
//! Packages the cart into a single [`CheckoutRequest`] and hands it to an
//! external [`PaymentCapability`]. The flow is a two-state machine: `Idle`
//! until a request is handed off, `AwaitingProvider` until the provider
//! reports a terminal result, then back to `Idle`. The request itself is
//! ephemeral and discarded with the terminal state.

use jiff::Timestamp;
use num_traits::ToPrimitive;
use rand::{Rng, distributions::Alphanumeric};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cart::Cart;

/// Smallest amount, in currency minor units, a provider will accept.
pub const MIN_CHECKOUT_MINOR_UNITS: i64 = 100;

/// Number of random characters appended to a generated reference.
const REFERENCE_SUFFIX_LEN: usize = 7;

/// Errors surfaced by the checkout hand-off.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// Checkout was attempted with no items in the cart.
    #[error("cannot check out an empty cart")]
    EmptyCart,

    /// The order total, in minor units, is below the provider floor.
    /// Rejected outright rather than silently rounded up.
    #[error("amount of {amount} minor units is below the provider minimum of {min}")]
    BelowMinimum {
        /// The computed order amount in minor units.
        amount: i64,
        /// The provider floor.
        min: i64,
    },

    /// The order total does not fit in a signed 64-bit minor-unit amount.
    #[error("order total {0} cannot be expressed in minor units")]
    AmountOutOfRange(Decimal),

    /// The payment capability's script has not (or failed to) become
    /// available.
    #[error("payment capability is not ready (state: {0})")]
    CapabilityUnavailable(CapabilityState),

    /// A second checkout was begun while one was already awaiting the
    /// provider.
    #[error("a checkout attempt is already in progress")]
    AlreadyInProgress,

    /// A resolution arrived while no checkout was in flight.
    #[error("no checkout attempt is in progress")]
    NotInProgress,

    /// The provider rejected the hand-off. The flow is back at `Idle` and
    /// the cart is untouched, so the attempt can simply be retried.
    #[error(transparent)]
    Provider(#[from] CapabilityError),
}

/// Error reported by a [`PaymentCapability`] when opening its checkout
/// surface fails.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct CapabilityError(pub String);

/// Load state of an external payment capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapabilityState {
    /// The provider script has not been requested yet.
    NotLoaded,
    /// The provider script is loading.
    Loading,
    /// The provider is ready to accept a checkout.
    Ready,
    /// The provider script failed to load.
    Failed,
}

impl std::fmt::Display for CapabilityState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::NotLoaded => "not loaded",
            Self::Loading => "loading",
            Self::Ready => "ready",
            Self::Failed => "failed",
        };
        f.write_str(label)
    }
}

/// An external payment surface the flow can hand a request to.
///
/// Implementations wrap a provider script or SDK. `open` must either
/// accept the request and later deliver exactly one terminal
/// [`CheckoutResolution`], or fail immediately without side effects.
pub trait PaymentCapability {
    /// Current load state of the underlying provider.
    fn state(&self) -> CapabilityState;

    /// Hands the request to the provider's checkout surface.
    fn open(&self, request: &CheckoutRequest) -> Result<(), CapabilityError>;
}

/// Customer fields attached to a checkout request.
///
/// Every field is defaulted when the shopper has not identified
/// themselves; providers require the full set to be present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Customer {
    /// Contact email address.
    pub email: String,

    /// Full display name.
    pub full_name: String,

    /// Phone number without the country prefix.
    pub phone_number: String,

    /// International dialling prefix.
    pub phone_number_prefix: String,

    /// Legal identification number.
    pub legal_id: String,

    /// Legal identification document type (`CC`, `CE`, `NIT`, ...).
    pub legal_id_type: String,
}

impl Default for Customer {
    fn default() -> Self {
        Self {
            email: "customer@example.com".to_owned(),
            full_name: "Storefront Customer".to_owned(),
            phone_number: "3001234567".to_owned(),
            phone_number_prefix: "+57".to_owned(),
            legal_id: "1234567890".to_owned(),
            legal_id_type: "CC".to_owned(),
        }
    }
}

/// Terminal status a provider reports for a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionStatus {
    /// Payment went through. The cart is cleared.
    Approved,
    /// Payment is pending confirmation. The cart is cleared; the
    /// provider settles asynchronously via webhook.
    Pending,
    /// Payment was declined. The cart is preserved for a retry.
    Declined,
    /// The provider hit an error. The cart is preserved for a retry.
    Error,
}

impl TransactionStatus {
    /// Whether this status counts as a successful hand-off, clearing the
    /// cart.
    #[must_use]
    pub fn clears_cart(self) -> bool {
        matches!(self, Self::Approved | Self::Pending)
    }
}

impl std::str::FromStr for TransactionStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "APPROVED" => Ok(Self::Approved),
            "PENDING" => Ok(Self::Pending),
            "DECLINED" => Ok(Self::Declined),
            "ERROR" => Ok(Self::Error),
            other => Err(UnknownStatus(other.to_owned())),
        }
    }
}

/// A status string the provider sent that we do not recognise.
#[derive(Debug, Error)]
#[error("unknown transaction status {0:?}")]
pub struct UnknownStatus(pub String);

/// The transaction object a provider's callback delivers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderTransaction {
    /// Provider-assigned transaction id.
    pub id: String,
    /// Terminal status.
    pub status: TransactionStatus,
    /// The reference the request was created with.
    pub reference: String,
}

/// How an in-flight checkout attempt ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckoutResolution {
    /// The provider delivered a terminal transaction.
    Completed(ProviderTransaction),
    /// The shopper closed the checkout surface without paying.
    Cancelled,
}

/// Result of resolving a checkout attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutOutcome {
    /// The resolution that ended the attempt.
    pub resolution: CheckoutResolution,
    /// Whether the resolution cleared the cart.
    pub cart_cleared: bool,
}

/// An ephemeral payment request built for a single checkout attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    /// Unique per attempt: `{PREFIX}-{millis}-{random}`, uppercased.
    pub reference: String,

    /// Order total in the currency's minor units, rounded midpoint away
    /// from zero.
    pub amount_minor_units: i64,

    /// ISO alpha code of the cart's currency.
    pub currency: String,

    /// Customer fields, defaulted where the shopper gave none.
    pub customer: Customer,

    /// Human-readable order description.
    pub description: String,
}

impl CheckoutRequest {
    /// Builds a request for the cart's current contents.
    ///
    /// # Errors
    ///
    /// [`CheckoutError::EmptyCart`] when the cart holds no items,
    /// [`CheckoutError::AmountOutOfRange`] when the total does not fit in
    /// minor units, and [`CheckoutError::BelowMinimum`] when it is under
    /// the provider floor.
    pub fn from_cart(
        cart: &Cart,
        reference_prefix: &str,
        customer: Customer,
    ) -> Result<Self, CheckoutError> {
        if cart.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        let summary = cart.summary();
        let currency = cart.currency();

        let scale = Decimal::from(10_i64.pow(currency.exponent));
        let amount_minor_units = (summary.total * scale)
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
            .to_i64()
            .ok_or(CheckoutError::AmountOutOfRange(summary.total))?;

        if amount_minor_units < MIN_CHECKOUT_MINOR_UNITS {
            return Err(CheckoutError::BelowMinimum {
                amount: amount_minor_units,
                min: MIN_CHECKOUT_MINOR_UNITS,
            });
        }

        Ok(Self {
            reference: generate_reference(reference_prefix),
            amount_minor_units,
            currency: currency.iso_alpha_code.to_owned(),
            customer,
            description: describe_order(cart),
        })
    }
}

/// Generates a `{prefix}-{millis}-{random}` reference, uppercased.
#[must_use]
pub fn generate_reference(prefix: &str) -> String {
    let millis = Timestamp::now().as_millisecond();
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(REFERENCE_SUFFIX_LEN)
        .map(char::from)
        .collect();

    format!("{prefix}-{millis}-{suffix}").to_uppercase()
}

/// Single item orders carry the item's name; anything larger carries the
/// total unit count.
fn describe_order(cart: &Cart) -> String {
    if cart.len() == 1 {
        if let Some(item) = cart.iter().next() {
            return item.name().to_owned();
        }
    }

    format!("Order of {} items", cart.summary().item_count)
}

#[derive(Debug)]
enum FlowState {
    Idle,
    AwaitingProvider(CheckoutRequest),
}

/// The checkout hand-off state machine.
///
/// At most one attempt is in flight at a time. `begin` validates and
/// hands the request to the capability; `resolve` consumes the provider's
/// one terminal result. Every terminal path returns the flow to `Idle`.
#[derive(Debug)]
pub struct CheckoutFlow {
    state: FlowState,
}

impl Default for CheckoutFlow {
    fn default() -> Self {
        Self::new()
    }
}

impl CheckoutFlow {
    /// Creates a flow with no attempt in flight.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: FlowState::Idle,
        }
    }

    /// Whether an attempt is currently awaiting the provider.
    #[must_use]
    pub fn is_in_progress(&self) -> bool {
        matches!(self.state, FlowState::AwaitingProvider(_))
    }

    /// The in-flight request's reference, if any.
    #[must_use]
    pub fn pending_reference(&self) -> Option<&str> {
        match &self.state {
            FlowState::Idle => None,
            FlowState::AwaitingProvider(request) => Some(&request.reference),
        }
    }

    /// Validates the cart, builds the request and hands it to the
    /// capability.
    ///
    /// On success the flow is `AwaitingProvider` and the request's
    /// reference is returned. On any error the flow stays `Idle`, the
    /// cart is untouched and the capability has not been handed anything
    /// (a failed `open` must be side-effect free).
    ///
    /// # Errors
    ///
    /// Request construction errors from [`CheckoutRequest::from_cart`],
    /// [`CheckoutError::AlreadyInProgress`] on re-entry,
    /// [`CheckoutError::CapabilityUnavailable`] when the provider script
    /// is not ready, and [`CheckoutError::Provider`] when the hand-off
    /// itself fails.
    pub fn begin(
        &mut self,
        cart: &Cart,
        capability: &dyn PaymentCapability,
        customer: Customer,
        reference_prefix: &str,
    ) -> Result<String, CheckoutError> {
        if self.is_in_progress() {
            return Err(CheckoutError::AlreadyInProgress);
        }

        let request = CheckoutRequest::from_cart(cart, reference_prefix, customer)?;

        let state = capability.state();
        if state != CapabilityState::Ready {
            return Err(CheckoutError::CapabilityUnavailable(state));
        }

        capability.open(&request)?;

        let reference = request.reference.clone();
        self.state = FlowState::AwaitingProvider(request);

        Ok(reference)
    }

    /// Consumes the provider's terminal result for the in-flight attempt.
    ///
    /// `Approved` and `Pending` clear the cart (write-through, observers
    /// signalled); `Declined`, `Error` and a cancellation leave it
    /// intact. The flow returns to `Idle` either way and the request is
    /// discarded.
    ///
    /// # Errors
    ///
    /// [`CheckoutError::NotInProgress`] when no attempt is in flight.
    pub fn resolve(
        &mut self,
        cart: &mut Cart,
        resolution: CheckoutResolution,
    ) -> Result<CheckoutOutcome, CheckoutError> {
        if !self.is_in_progress() {
            return Err(CheckoutError::NotInProgress);
        }

        self.state = FlowState::Idle;

        let cart_cleared = match &resolution {
            CheckoutResolution::Completed(transaction) => {
                if transaction.status.clears_cart() {
                    cart.clear();
                    true
                } else {
                    false
                }
            }
            CheckoutResolution::Cancelled => false,
        };

        Ok(CheckoutOutcome {
            resolution,
            cart_cleared,
        })
    }
}
