//! Modal widget payment provider.
//!
//! The provider ships as an externally loaded script exposing a checkout
//! constructor. Its load state is observed through a [`ScriptProbe`] and
//! the hand-off goes through a [`WidgetLauncher`], so the adapter stays
//! testable without the script itself.

use std::time::Duration;

use mockall::automock;
use serde::Serialize;
use tokio::time::sleep;
use tracing::debug;

use storefront::checkout::{
    CapabilityError, CapabilityState, CheckoutRequest, Customer, PaymentCapability,
};

/// Sandbox public key the provider hands out for test merchants.
pub const SANDBOX_PUBLIC_KEY: &str = "pub_test_Q5yDA9xoKdePzhSGeVe9HAqZlX8xnTxh";

/// Default number of readiness polls before giving up on the script.
pub const DEFAULT_READY_ATTEMPTS: u32 = 20;

/// Default pause between readiness polls.
pub const DEFAULT_READY_DELAY: Duration = Duration::from_millis(100);

/// Provider endpoints that routinely 404 in sandbox mode. Failures
/// against these are logged at debug level and never surfaced.
const NONCRITICAL_ENDPOINTS: &[&str] = &[
    "feature_flags",
    "global_settings",
    "checkout_intelligence",
    "complete_api_access",
    "is_nequi_negocios",
    "enable_smart_checkout",
    "check_pco_blacklist",
    "merchants/undefined",
];

/// Merchant-level settings for the widget.
#[derive(Debug, Clone)]
pub struct WidgetSettings {
    pub public_key: String,
    pub redirect_url: String,
}

impl WidgetSettings {
    /// Sandbox settings with the provider's public test key.
    #[must_use]
    pub fn sandbox(redirect_url: impl Into<String>) -> Self {
        Self {
            public_key: SANDBOX_PUBLIC_KEY.to_owned(),
            redirect_url: redirect_url.into(),
        }
    }

    /// Maps a checkout request onto the widget's configuration contract.
    /// The currency is the request's own, so the payload can never
    /// contradict the cart it was built from.
    #[must_use]
    pub fn checkout_payload(&self, request: &CheckoutRequest) -> WidgetCheckoutPayload {
        WidgetCheckoutPayload {
            currency: request.currency.clone(),
            amount_in_cents: request.amount_minor_units,
            reference: request.reference.clone(),
            public_key: self.public_key.clone(),
            redirect_url: self.redirect_url.clone(),
            customer_data: request.customer.clone(),
        }
    }
}

/// The configuration object the widget's constructor consumes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetCheckoutPayload {
    pub currency: String,
    pub amount_in_cents: i64,
    pub reference: String,
    pub public_key: String,
    pub redirect_url: String,
    pub customer_data: Customer,
}

/// Reports the widget script's load state.
#[automock]
pub trait ScriptProbe: Send + Sync {
    fn state(&self) -> CapabilityState;
}

/// Opens the widget's checkout surface with a prepared payload.
#[automock]
pub trait WidgetLauncher: Send + Sync {
    /// # Errors
    ///
    /// Returns an error when the widget rejects the payload; a failed
    /// launch must leave no checkout surface behind.
    fn launch(&self, payload: &WidgetCheckoutPayload) -> Result<(), CapabilityError>;
}

/// The modal widget as a [`PaymentCapability`].
pub struct WidgetCapability {
    settings: WidgetSettings,
    probe: Box<dyn ScriptProbe>,
    launcher: Box<dyn WidgetLauncher>,
}

impl WidgetCapability {
    #[must_use]
    pub fn new(
        settings: WidgetSettings,
        probe: Box<dyn ScriptProbe>,
        launcher: Box<dyn WidgetLauncher>,
    ) -> Self {
        Self {
            settings,
            probe,
            launcher,
        }
    }
}

impl PaymentCapability for WidgetCapability {
    fn state(&self) -> CapabilityState {
        self.probe.state()
    }

    fn open(&self, request: &CheckoutRequest) -> Result<(), CapabilityError> {
        let payload = self.settings.checkout_payload(request);

        debug!(reference = %payload.reference, amount = payload.amount_in_cents, "opening widget checkout");

        self.launcher.launch(&payload)
    }
}

/// Polls the probe until the script is ready.
///
/// `Failed` short-circuits; `NotLoaded` and `Loading` are polled up to
/// `max_attempts` times with `delay` between polls.
///
/// # Errors
///
/// Returns an error when the script fails to load or the attempts run
/// out.
pub async fn await_ready(
    probe: &dyn ScriptProbe,
    max_attempts: u32,
    delay: Duration,
) -> Result<(), CapabilityError> {
    for attempt in 1..=max_attempts {
        match probe.state() {
            CapabilityState::Ready => return Ok(()),
            CapabilityState::Failed => {
                return Err(CapabilityError("widget script failed to load".to_owned()));
            }
            CapabilityState::NotLoaded | CapabilityState::Loading => {
                debug!(attempt, max_attempts, "widget script not ready yet");
            }
        }

        if attempt < max_attempts {
            sleep(delay).await;
        }
    }

    Err(CapabilityError(format!(
        "widget script not available after {max_attempts} attempts"
    )))
}

/// Whether a provider request path belongs to the sandbox endpoints that
/// are expected to fail. Such failures stay out of user-visible logs.
#[must_use]
pub fn is_noncritical_request(path: &str) -> bool {
    NONCRITICAL_ENDPOINTS
        .iter()
        .any(|endpoint| path.contains(endpoint))
}

#[cfg(test)]
mod tests {
    use std::{
        sync::atomic::{AtomicU32, Ordering},
        time::Duration,
    };

    use testresult::TestResult;

    use storefront::checkout::{
        CapabilityState, CheckoutRequest, Customer, PaymentCapability,
    };

    use super::{
        MockScriptProbe, MockWidgetLauncher, ScriptProbe, WidgetCapability, WidgetSettings,
        await_ready, is_noncritical_request,
    };

    fn request() -> CheckoutRequest {
        CheckoutRequest {
            reference: "ADF-1700000000000-ABC1234".to_owned(),
            amount_minor_units: 23_80,
            currency: "COP".to_owned(),
            customer: Customer::default(),
            description: "Short Film Edit".to_owned(),
        }
    }

    #[test]
    fn payload_follows_the_widget_contract() -> TestResult {
        let settings = WidgetSettings::sandbox("https://example.com/confirmacion");

        let payload = settings.checkout_payload(&request());
        let value = serde_json::to_value(&payload)?;

        assert_eq!(value["amountInCents"], 23_80);
        assert_eq!(value["currency"], "COP");
        assert_eq!(value["reference"], "ADF-1700000000000-ABC1234");
        assert_eq!(value["publicKey"], super::SANDBOX_PUBLIC_KEY);
        assert_eq!(value["customerData"]["email"], "customer@example.com");
        assert_eq!(value["customerData"]["phoneNumberPrefix"], "+57");
        assert_eq!(value["customerData"]["legalIdType"], "CC");

        Ok(())
    }

    #[test]
    fn payload_currency_follows_the_request() {
        let settings = WidgetSettings::sandbox("https://example.com/confirmacion");

        let mut request = request();
        request.currency = "USD".to_owned();

        let payload = settings.checkout_payload(&request);

        assert_eq!(payload.currency, "USD");
    }

    #[test]
    fn capability_launches_through_the_widget() -> TestResult {
        let mut probe = MockScriptProbe::new();
        probe.expect_state().return_const(CapabilityState::Ready);

        let mut launcher = MockWidgetLauncher::new();
        launcher
            .expect_launch()
            .withf(|payload| payload.reference == "ADF-1700000000000-ABC1234")
            .times(1)
            .returning(|_| Ok(()));

        let capability = WidgetCapability::new(
            WidgetSettings::sandbox("https://example.com/confirmacion"),
            Box::new(probe),
            Box::new(launcher),
        );

        assert_eq!(capability.state(), CapabilityState::Ready);
        capability.open(&request())?;

        Ok(())
    }

    struct EventuallyReady {
        polls: AtomicU32,
        ready_after: u32,
    }

    impl ScriptProbe for EventuallyReady {
        fn state(&self) -> CapabilityState {
            let polls = self.polls.fetch_add(1, Ordering::SeqCst) + 1;

            if polls >= self.ready_after {
                CapabilityState::Ready
            } else {
                CapabilityState::Loading
            }
        }
    }

    #[tokio::test]
    async fn await_ready_polls_until_the_script_arrives() -> TestResult {
        let probe = EventuallyReady {
            polls: AtomicU32::new(0),
            ready_after: 3,
        };

        await_ready(&probe, 20, Duration::ZERO).await?;

        assert_eq!(probe.polls.load(Ordering::SeqCst), 3);

        Ok(())
    }

    #[tokio::test]
    async fn await_ready_gives_up_after_max_attempts() {
        let probe = EventuallyReady {
            polls: AtomicU32::new(0),
            ready_after: u32::MAX,
        };

        let result = await_ready(&probe, 5, Duration::ZERO).await;

        assert!(result.is_err());
        assert_eq!(probe.polls.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn await_ready_short_circuits_on_failure() {
        let mut probe = MockScriptProbe::new();
        probe
            .expect_state()
            .times(1)
            .return_const(CapabilityState::Failed);

        let result = await_ready(&probe, 20, Duration::ZERO).await;

        assert!(result.is_err());
    }

    #[test]
    fn sandbox_feature_probes_are_noncritical() {
        assert!(is_noncritical_request("https://api.wompi.co/v1/feature_flags"));
        assert!(is_noncritical_request("/v1/merchants/undefined"));
        assert!(is_noncritical_request("check_pco_blacklist?merchant=1"));
        assert!(!is_noncritical_request("https://api.wompi.co/v1/transactions"));
    }
}
