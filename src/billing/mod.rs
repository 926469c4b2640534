//! Billing provider webhooks.
//!
//! Events are authenticated with an HMAC-SHA256 of the raw body and mirrored
//! into the `subscriptions` table. Delivery is at-least-once and may be out of
//! order, so the store ignores events older than the state it already holds.

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;

use crate::error::{Error, Result};
use crate::types::Subscription;

pub const SIGNATURE_HEADER: &str = "x-billing-signature";
const SIGNATURE_PREFIX: &str = "sha256=";

type HmacSha256 = Hmac<Sha256>;

/// Computes the signature header value for a body.
#[must_use]
pub fn sign(secret: &str, body: &[u8]) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts keys of any length");
    mac.update(body);
    format!("{SIGNATURE_PREFIX}{}", hex::encode(mac.finalize().into_bytes()))
}

/// Checks a signature header against the body in constant time.
pub fn verify_signature(secret: &str, body: &[u8], header: Option<&str>) -> Result<()> {
    let provided = header
        .and_then(|h| h.trim().strip_prefix(SIGNATURE_PREFIX))
        .and_then(|h| hex::decode(h).ok())
        .ok_or(Error::Unauthorized)?;

    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts keys of any length");
    mac.update(body);
    mac.verify_slice(&provided).map_err(|_| Error::Unauthorized)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    SubscriptionCreated,
    SubscriptionUpdated,
    SubscriptionCanceled,
    Other,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BillingEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    /// Provider timestamp, seconds since the epoch.
    pub created: i64,
    pub data: SubscriptionData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubscriptionData {
    pub subscription_id: String,
    pub user_id: String,
    pub status: String,
    #[serde(default)]
    pub current_period_end: Option<i64>,
}

impl BillingEvent {
    pub fn parse(body: &[u8]) -> Result<Self> {
        serde_json::from_slice(body)
            .map_err(|e| Error::Validation(format!("invalid billing event: {e}")))
    }

    #[must_use]
    pub fn kind(&self) -> EventKind {
        match self.event_type.as_str() {
            "subscription.created" => EventKind::SubscriptionCreated,
            "subscription.updated" => EventKind::SubscriptionUpdated,
            "subscription.canceled" => EventKind::SubscriptionCanceled,
            _ => EventKind::Other,
        }
    }

    /// The subscription state this event describes, or None for event types
    /// that do not touch subscriptions.
    pub fn to_subscription(&self, now: DateTime<Utc>) -> Result<Option<Subscription>> {
        let status = match self.kind() {
            EventKind::Other => return Ok(None),
            EventKind::SubscriptionCanceled => "canceled".to_string(),
            EventKind::SubscriptionCreated | EventKind::SubscriptionUpdated => {
                self.data.status.to_ascii_lowercase()
            }
        };

        let event_created_at = DateTime::from_timestamp(self.created, 0)
            .ok_or_else(|| Error::Validation("event timestamp out of range".to_string()))?;
        let current_period_end = match self.data.current_period_end {
            Some(ts) => Some(DateTime::from_timestamp(ts, 0).ok_or_else(|| {
                Error::Validation("current_period_end out of range".to_string())
            })?),
            None => None,
        };

        Ok(Some(Subscription {
            provider_subscription_id: self.data.subscription_id.clone(),
            user_id: self.data.user_id.clone(),
            status,
            current_period_end,
            event_created_at,
            updated_at: now,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_test";

    fn event_json(event_type: &str, status: &str) -> String {
        format!(
            r#"{{"id":"evt_1","type":"{event_type}","created":1767225600,
                "data":{{"subscription_id":"sub_1","user_id":"user-1","status":"{status}"}}}}"#
        )
    }

    #[test]
    fn test_signature_round_trip() {
        let body = br#"{"hello":"world"}"#;
        let header = sign(SECRET, body);
        assert!(header.starts_with("sha256="));
        assert!(verify_signature(SECRET, body, Some(&header)).is_ok());
    }

    #[test]
    fn test_signature_rejects_tampering() {
        let header = sign(SECRET, b"original");
        assert!(matches!(
            verify_signature(SECRET, b"tampered", Some(&header)),
            Err(Error::Unauthorized)
        ));
        assert!(matches!(
            verify_signature("other", b"original", Some(&header)),
            Err(Error::Unauthorized)
        ));
        assert!(verify_signature(SECRET, b"original", None).is_err());
        assert!(verify_signature(SECRET, b"original", Some("sha256=zz")).is_err());
        assert!(verify_signature(SECRET, b"original", Some("md5=abcd")).is_err());
    }

    #[test]
    fn test_parse_subscription_event() {
        let event =
            BillingEvent::parse(event_json("subscription.updated", "Active").as_bytes()).unwrap();
        assert_eq!(event.kind(), EventKind::SubscriptionUpdated);

        let sub = event.to_subscription(Utc::now()).unwrap().unwrap();
        assert_eq!(sub.provider_subscription_id, "sub_1");
        assert_eq!(sub.status, "active");
        assert!(sub.grants_premium());
        assert_eq!(sub.event_created_at.timestamp(), 1_767_225_600);
    }

    #[test]
    fn test_canceled_event_forces_status() {
        let event =
            BillingEvent::parse(event_json("subscription.canceled", "active").as_bytes()).unwrap();
        let sub = event.to_subscription(Utc::now()).unwrap().unwrap();
        assert_eq!(sub.status, "canceled");
        assert!(!sub.grants_premium());
    }

    #[test]
    fn test_unrelated_event_is_ignored() {
        let event = BillingEvent::parse(event_json("invoice.paid", "paid").as_bytes()).unwrap();
        assert_eq!(event.kind(), EventKind::Other);
        assert!(event.to_subscription(Utc::now()).unwrap().is_none());
    }

    #[test]
    fn test_malformed_event() {
        assert!(matches!(
            BillingEvent::parse(b"{\"id\":1}"),
            Err(Error::Validation(_))
        ));
    }
}
