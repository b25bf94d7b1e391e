//! Integrity signature generation for the embedded button provider.
//!
//! The provider verifies each order against
//! `sha256(order_id ‖ currency ‖ amount ‖ secret)`; the secret stays on
//! the server and is zeroized when dropped.

use std::fmt;

use mockall::automock;
use sha2::{Digest, Sha256};
use thiserror::Error;
use zeroize::Zeroize;

/// The shared secret used to sign orders. Never logged, never serialized.
#[derive(Clone)]
pub struct PaymentSecret {
    value: String,
}

impl PaymentSecret {
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.value
    }
}

impl fmt::Debug for PaymentSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PaymentSecret(**redacted**)")?;
        Ok(())
    }
}

impl Drop for PaymentSecret {
    fn drop(&mut self) {
        self.value.zeroize();
    }
}

#[derive(Debug, Error)]
pub enum IntegrityError {
    /// No signing secret was configured. Surfaced per call so the rest of
    /// the API keeps working without one.
    #[error("payment integrity secret is not configured")]
    SecretNotConfigured,
}

/// Signs order parameters for provider-side verification.
#[automock]
pub trait IntegritySigner: Send + Sync {
    /// Computes the hex-encoded integrity hash for one order.
    ///
    /// # Errors
    ///
    /// Returns [`IntegrityError::SecretNotConfigured`] when the server has
    /// no signing secret.
    fn sign(
        &self,
        order_id: &str,
        currency: &str,
        amount_minor_units: i64,
    ) -> Result<String, IntegrityError>;
}

/// SHA-256 signer over the concatenated order fields and secret.
#[derive(Debug)]
pub struct Sha256IntegritySigner {
    secret: Option<PaymentSecret>,
}

impl Sha256IntegritySigner {
    #[must_use]
    pub fn new(secret: Option<PaymentSecret>) -> Self {
        Self { secret }
    }
}

impl IntegritySigner for Sha256IntegritySigner {
    fn sign(
        &self,
        order_id: &str,
        currency: &str,
        amount_minor_units: i64,
    ) -> Result<String, IntegrityError> {
        let secret = self
            .secret
            .as_ref()
            .ok_or(IntegrityError::SecretNotConfigured)?;

        let mut hasher = Sha256::new();
        hasher.update(order_id.as_bytes());
        hasher.update(currency.as_bytes());
        hasher.update(amount_minor_units.to_string().as_bytes());
        hasher.update(secret.as_str().as_bytes());

        Ok(format!("{:x}", hasher.finalize()))
    }
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use super::{IntegrityError, IntegritySigner, PaymentSecret, Sha256IntegritySigner};

    #[test]
    fn known_answer_for_full_order() -> TestResult {
        let signer = Sha256IntegritySigner::new(Some(PaymentSecret::new("test-secret")));

        let hash = signer.sign("ORD-1700000000000-ABC1234", "COP", 2380)?;

        assert_eq!(
            hash,
            "e8c3f5c6e68788558bdce99ba7818eebae78ef042887b23bb5a0cd982b82f2f2"
        );

        Ok(())
    }

    #[test]
    fn known_answer_for_short_inputs() -> TestResult {
        let signer = Sha256IntegritySigner::new(Some(PaymentSecret::new("s")));

        let hash = signer.sign("order-1", "COP", 100)?;

        assert_eq!(
            hash,
            "5bd95bf1b9dd3e16c6f6b6e2c0b080f27307a83777fd92c5011bc373401e8aa4"
        );

        Ok(())
    }

    #[test]
    fn missing_secret_is_surfaced_per_call() {
        let signer = Sha256IntegritySigner::new(None);

        let result = signer.sign("order-1", "COP", 100);

        assert!(matches!(result, Err(IntegrityError::SecretNotConfigured)));
    }

    #[test]
    fn secret_debug_output_is_redacted() {
        let secret = PaymentSecret::new("hunter2");

        assert_eq!(format!("{secret:?}"), "PaymentSecret(**redacted**)");
    }
}
