//! Verified Stripe Events
//!
//! The guard treats an event as opaque: whatever JSON the provider signed is
//! kept as-is and handed to downstream handlers. The helpers here only read
//! the envelope fields every Stripe event carries.

use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::stripe::error::SignatureResult;

/// Stripe event types with first-class names
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StripeEventType {
    // Checkout events
    /// `checkout.session.completed`
    #[serde(rename = "checkout.session.completed")]
    CheckoutSessionCompleted,

    // Customer events
    /// `customer.created`
    #[serde(rename = "customer.created")]
    CustomerCreated,

    // Subscription events
    /// `customer.subscription.created`
    #[serde(rename = "customer.subscription.created")]
    SubscriptionCreated,
    /// `customer.subscription.updated`
    #[serde(rename = "customer.subscription.updated")]
    SubscriptionUpdated,
    /// `customer.subscription.deleted`
    #[serde(rename = "customer.subscription.deleted")]
    SubscriptionDeleted,

    // Invoice events
    /// `invoice.payment_succeeded`
    #[serde(rename = "invoice.payment_succeeded")]
    InvoicePaymentSucceeded,
    /// `invoice.payment_failed`
    #[serde(rename = "invoice.payment_failed")]
    InvoicePaymentFailed,

    // Payment intent events
    /// `payment_intent.succeeded`
    #[serde(rename = "payment_intent.succeeded")]
    PaymentIntentSucceeded,
    /// `payment_intent.payment_failed`
    #[serde(rename = "payment_intent.payment_failed")]
    PaymentIntentFailed,

    /// Any event type without a named variant
    #[serde(other)]
    Unknown,
}

impl FromStr for StripeEventType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "checkout.session.completed" => Self::CheckoutSessionCompleted,
            "customer.created" => Self::CustomerCreated,
            "customer.subscription.created" => Self::SubscriptionCreated,
            "customer.subscription.updated" => Self::SubscriptionUpdated,
            "customer.subscription.deleted" => Self::SubscriptionDeleted,
            "invoice.payment_succeeded" => Self::InvoicePaymentSucceeded,
            "invoice.payment_failed" => Self::InvoicePaymentFailed,
            "payment_intent.succeeded" => Self::PaymentIntentSucceeded,
            "payment_intent.payment_failed" => Self::PaymentIntentFailed,
            _ => Self::Unknown,
        })
    }
}

impl StripeEventType {
    /// Get the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CheckoutSessionCompleted => "checkout.session.completed",
            Self::CustomerCreated => "customer.created",
            Self::SubscriptionCreated => "customer.subscription.created",
            Self::SubscriptionUpdated => "customer.subscription.updated",
            Self::SubscriptionDeleted => "customer.subscription.deleted",
            Self::InvoicePaymentSucceeded => "invoice.payment_succeeded",
            Self::InvoicePaymentFailed => "invoice.payment_failed",
            Self::PaymentIntentSucceeded => "payment_intent.succeeded",
            Self::PaymentIntentFailed => "payment_intent.payment_failed",
            Self::Unknown => "unknown",
        }
    }

    /// Check if this is a known event type
    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Unknown)
    }
}

/// A webhook event whose signature has been verified.
///
/// Wraps the JSON document exactly as the provider sent it, so serializing
/// an `Event` yields a value deep-equal to the signed payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Event(serde_json::Value);

impl Event {
    /// Wrap an already-parsed JSON value
    pub fn new(value: serde_json::Value) -> Self {
        Self(value)
    }

    /// Parse from raw JSON bytes
    pub fn from_bytes(bytes: &[u8]) -> SignatureResult<Self> {
        Ok(Self(serde_json::from_slice(bytes)?))
    }

    /// Event ID (`evt_...`), if the payload carries one
    pub fn id(&self) -> Option<&str> {
        self.0.get("id").and_then(serde_json::Value::as_str)
    }

    /// Object kind; `"event"` for genuine Stripe events
    pub fn object(&self) -> Option<&str> {
        self.0.get("object").and_then(serde_json::Value::as_str)
    }

    /// Raw event type string (`customer.subscription.created`, ...)
    pub fn event_type(&self) -> Option<&str> {
        self.0.get("type").and_then(serde_json::Value::as_str)
    }

    /// Get the typed event type
    pub fn typed_event_type(&self) -> StripeEventType {
        match self.event_type() {
            Some(raw) => raw.parse().unwrap_or(StripeEventType::Unknown),
            None => StripeEventType::Unknown,
        }
    }

    /// Whether the event came from live mode
    pub fn livemode(&self) -> bool {
        self.0
            .get("livemode")
            .and_then(serde_json::Value::as_bool)
            .unwrap_or(false)
    }

    /// Borrow the underlying JSON
    pub fn as_value(&self) -> &serde_json::Value {
        &self.0
    }

    /// Take ownership of the underlying JSON
    pub fn into_value(self) -> serde_json::Value {
        self.0
    }

    /// Deserialize the event into an application-defined type
    pub fn deserialize_into<T: DeserializeOwned>(&self) -> SignatureResult<T> {
        Ok(T::deserialize(&self.0)?)
    }
}

impl From<serde_json::Value> for Event {
    fn from(value: serde_json::Value) -> Self {
        Self(value)
    }
}
