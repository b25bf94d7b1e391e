//! Payment status notifications delivered by the provider's webhook.

use std::sync::Mutex;

use async_trait::async_trait;
use mockall::automock;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// An asynchronous payment-status notification.
///
/// Providers vary in which fields they send, so every field is optional
/// and unknown fields are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PaymentNotification {
    /// Provider-assigned notification or transaction id.
    pub id: Option<String>,

    /// The order reference the notification is about.
    pub order_id: Option<String>,

    /// Provider status string, passed through verbatim.
    pub status: Option<String>,

    /// Amount in minor units, when the provider includes it.
    pub amount: Option<i64>,
}

/// Records webhook notifications and answers transaction-status queries.
#[automock]
#[async_trait]
pub trait PaymentEventsService: Send + Sync {
    /// Stores a notification, keyed by its order id. Later notifications
    /// for the same order replace earlier ones.
    async fn record(&self, notification: PaymentNotification);

    /// Looks up the most recent notification for an order.
    async fn find(&self, order_id: &str) -> Option<PaymentNotification>;
}

/// In-memory notification log.
///
/// Order state is not persisted across restarts; the webhook's job here
/// is to answer status queries for the current process only.
#[derive(Debug, Default)]
pub struct InMemoryPaymentEvents {
    by_order: Mutex<FxHashMap<String, PaymentNotification>>,
}

impl InMemoryPaymentEvents {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PaymentEventsService for InMemoryPaymentEvents {
    async fn record(&self, notification: PaymentNotification) {
        let Some(order_id) = notification.order_id.clone() else {
            warn!(?notification, "payment notification without an order id");
            return;
        };

        if let Ok(mut by_order) = self.by_order.lock() {
            by_order.insert(order_id, notification);
        }
    }

    async fn find(&self, order_id: &str) -> Option<PaymentNotification> {
        self.by_order
            .lock()
            .ok()
            .and_then(|by_order| by_order.get(order_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use super::{InMemoryPaymentEvents, PaymentEventsService, PaymentNotification};

    fn notification(order_id: &str, status: &str) -> PaymentNotification {
        PaymentNotification {
            id: Some("evt-1".to_owned()),
            order_id: Some(order_id.to_owned()),
            status: Some(status.to_owned()),
            amount: Some(2380),
        }
    }

    #[tokio::test]
    async fn recorded_notifications_can_be_found() {
        let events = InMemoryPaymentEvents::new();

        events.record(notification("ORD-1", "APPROVED")).await;

        let found = events.find("ORD-1").await;
        assert_eq!(found.and_then(|n| n.status), Some("APPROVED".to_owned()));
    }

    #[tokio::test]
    async fn later_notifications_replace_earlier_ones() {
        let events = InMemoryPaymentEvents::new();

        events.record(notification("ORD-1", "PENDING")).await;
        events.record(notification("ORD-1", "APPROVED")).await;

        let found = events.find("ORD-1").await;
        assert_eq!(found.and_then(|n| n.status), Some("APPROVED".to_owned()));
    }

    #[tokio::test]
    async fn notifications_without_an_order_id_are_dropped() {
        let events = InMemoryPaymentEvents::new();

        events
            .record(PaymentNotification {
                id: Some("evt-2".to_owned()),
                ..PaymentNotification::default()
            })
            .await;

        assert_eq!(events.find("ORD-1").await, None);
    }

    #[test]
    fn unknown_payload_fields_are_ignored() -> TestResult {
        let raw = r#"{"id":"evt-3","orderId":"ORD-9","status":"APPROVED","signature":"abc","extra":{"nested":true}}"#;

        let parsed: PaymentNotification = serde_json::from_str(raw)?;

        assert_eq!(parsed.order_id.as_deref(), Some("ORD-9"));
        assert_eq!(parsed.amount, None);

        Ok(())
    }
}
