//! Stripe Signature Verification
//!
//! Stripe signs every webhook delivery with the endpoint's signing secret and
//! sends the result in the `stripe-signature` header:
//!
//! ```text
//! stripe-signature: t=1614556800,v1=5257a869e7ecebeda32affa62cdca3fa51cad7e77a0e56ff536d0ce8e108d8bd
//! ```
//!
//! The `v1` value is the hex HMAC-SHA256 of `"{t}.{raw body}"`. A header may
//! carry several `v1` entries while a secret is being rolled; any match is
//! accepted.
//!
//! [`SignatureVerifier`] is the seam the guard calls through. Swap in another
//! implementation to verify with a different scheme or to stub verification
//! in tests.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::stripe::error::{SignatureError, SignatureResult};
use crate::stripe::events::Event;

type HmacSha256 = Hmac<Sha256>;

/// Signature scheme Stripe currently signs with
pub const EXPECTED_SCHEME: &str = "v1";

/// Default maximum age of a signed timestamp (5 minutes)
pub const DEFAULT_TOLERANCE: Duration = Duration::from_secs(300);

/// Options forwarded untouched from the guard to the verifier.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerificationOptions {
    /// Maximum timestamp age. `None` uses [`DEFAULT_TOLERANCE`], zero disables
    /// the freshness check.
    pub tolerance: Option<Duration>,
    /// Unix time treated as "now". `None` reads the system clock.
    pub received_at: Option<i64>,
}

impl VerificationOptions {
    /// Options with every field left to the verifier's defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the timestamp tolerance
    pub fn with_tolerance(mut self, tolerance: Duration) -> Self {
        self.tolerance = Some(tolerance);
        self
    }

    /// Disable the timestamp freshness check
    pub fn without_tolerance(self) -> Self {
        self.with_tolerance(Duration::ZERO)
    }

    /// Pin the verification clock to a Unix timestamp
    pub fn with_received_at(mut self, unix_secs: i64) -> Self {
        self.received_at = Some(unix_secs);
        self
    }
}

/// Verifies a signed webhook delivery and produces the event it carries.
///
/// # Example
///
/// ```rust,ignore
/// use stripe_webhook_guard::stripe::{Event, SignatureResult, SignatureVerifier, VerificationOptions};
///
/// struct AcceptEverything;
///
/// #[async_trait::async_trait]
/// impl SignatureVerifier for AcceptEverything {
///     async fn verify_signed_event(
///         &self,
///         payload: &[u8],
///         _signature_header: &str,
///         _secret: &str,
///         _options: &VerificationOptions,
///     ) -> SignatureResult<Event> {
///         Event::from_bytes(payload)
///     }
/// }
/// ```
#[async_trait]
pub trait SignatureVerifier: Send + Sync + 'static {
    /// Check `signature_header` against the exact `payload` bytes.
    ///
    /// Returns the verified event, or an error for any rejection: bad
    /// signature, stale timestamp, malformed header or unparsable payload.
    async fn verify_signed_event(
        &self,
        payload: &[u8],
        signature_header: &str,
        secret: &str,
        options: &VerificationOptions,
    ) -> SignatureResult<Event>;
}

#[async_trait]
impl<V: SignatureVerifier + ?Sized> SignatureVerifier for Arc<V> {
    async fn verify_signed_event(
        &self,
        payload: &[u8],
        signature_header: &str,
        secret: &str,
        options: &VerificationOptions,
    ) -> SignatureResult<Event> {
        (**self)
            .verify_signed_event(payload, signature_header, secret, options)
            .await
    }
}

/// Verifier for Stripe's `v1` HMAC-SHA256 scheme
#[derive(Debug, Clone, Copy, Default)]
pub struct StripeSignatureVerifier;

impl StripeSignatureVerifier {
    /// Create a new verifier
    pub fn new() -> Self {
        Self
    }

    /// Check the header without parsing the payload.
    pub fn verify_header(
        &self,
        payload: &[u8],
        signature_header: &str,
        secret: &str,
        options: &VerificationOptions,
    ) -> SignatureResult<()> {
        let header = parse_signature_header(signature_header)?;
        let expected = compute_signature(secret, header.timestamp, payload);

        let matched = header
            .signatures
            .iter()
            .any(|candidate| bool::from(expected.as_bytes().ct_eq(candidate.as_bytes())));

        if !matched {
            tracing::debug!(
                timestamp = header.timestamp,
                candidates = header.signatures.len(),
                "No webhook signature matched the payload"
            );
            return Err(SignatureError::NoMatchingSignature);
        }

        let tolerance = options.tolerance.unwrap_or(DEFAULT_TOLERANCE);
        let now = options
            .received_at
            .unwrap_or_else(|| chrono::Utc::now().timestamp());
        let age_secs = now.saturating_sub(header.timestamp);
        let too_old = i64::try_from(tolerance.as_secs()).map_or(false, |limit| age_secs > limit);

        if !tolerance.is_zero() && too_old {
            tracing::debug!(
                timestamp = header.timestamp,
                age_secs,
                tolerance_secs = tolerance.as_secs(),
                "Webhook timestamp outside tolerance"
            );
            return Err(SignatureError::TimestampOutsideTolerance {
                age_secs,
                tolerance_secs: tolerance.as_secs(),
            });
        }

        Ok(())
    }
}

#[async_trait]
impl SignatureVerifier for StripeSignatureVerifier {
    async fn verify_signed_event(
        &self,
        payload: &[u8],
        signature_header: &str,
        secret: &str,
        options: &VerificationOptions,
    ) -> SignatureResult<Event> {
        self.verify_header(payload, signature_header, secret, options)?;
        Event::from_bytes(payload)
    }
}

/// Build a valid `stripe-signature` header for `payload`.
///
/// Used to drive the guard in tests and local tooling without a live Stripe
/// account.
pub fn generate_test_header(payload: &[u8], secret: &str, timestamp: i64) -> String {
    format!(
        "t={},{}={}",
        timestamp,
        EXPECTED_SCHEME,
        compute_signature(secret, timestamp, payload)
    )
}

/// Parsed signature header parts
#[derive(Debug)]
struct SignedHeader {
    timestamp: i64,
    signatures: Vec<String>,
}

/// Parse the `stripe-signature` header.
///
/// Pairs without `=` and schemes other than `v1` are skipped.
fn parse_signature_header(header: &str) -> SignatureResult<SignedHeader> {
    let mut timestamp = None;
    let mut signatures = Vec::new();

    for part in header.split(',') {
        let Some((key, value)) = part.split_once('=') else {
            continue;
        };

        match key.trim() {
            "t" => timestamp = value.trim().parse::<i64>().ok(),
            EXPECTED_SCHEME => signatures.push(value.trim().to_string()),
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or_else(|| {
        SignatureError::MalformedHeader("missing or invalid timestamp".to_string())
    })?;

    if signatures.is_empty() {
        return Err(SignatureError::NoSignaturesForScheme {
            scheme: EXPECTED_SCHEME,
        });
    }

    Ok(SignedHeader {
        timestamp,
        signatures,
    })
}

/// Hex HMAC-SHA256 of `"{timestamp}." ++ payload`
fn compute_signature(secret: &str, timestamp: i64, payload: &[u8]) -> String {
    // HMAC-SHA256 accepts keys of any size (RFC 2104)
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC-SHA256 accepts any key size");
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    hex::encode(mac.finalize().into_bytes())
}
