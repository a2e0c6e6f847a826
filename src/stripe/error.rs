//! Errors raised by signature verifiers.

use thiserror::Error;

/// Why a verifier rejected a signed webhook delivery.
///
/// These never reach the HTTP response body; the guard collapses every
/// variant into a generic 400 and keeps this value as the error source.
#[derive(Error, Debug)]
pub enum SignatureError {
    /// Header could not be parsed as `t=...,v1=...`
    #[error("Unable to extract timestamp and signatures from header: {0}")]
    MalformedHeader(String),

    /// Header carried no signature for the expected scheme
    #[error("No signatures found with expected scheme {scheme}")]
    NoSignaturesForScheme {
        /// Scheme that was looked for (e.g. `v1`)
        scheme: &'static str,
    },

    /// None of the supplied signatures match the payload
    #[error("No signatures found matching the expected signature for payload")]
    NoMatchingSignature,

    /// Signature is valid but older than the allowed tolerance
    #[error("Timestamp outside the tolerance zone ({age_secs}s old, tolerance {tolerance_secs}s)")]
    TimestampOutsideTolerance {
        /// Seconds between the signed timestamp and now
        age_secs: i64,
        /// Configured tolerance in seconds
        tolerance_secs: u64,
    },

    /// Signature matched but the body is not a JSON event
    #[error("Invalid webhook payload: {0}")]
    InvalidPayload(#[from] serde_json::Error),

    /// Failure reported by a custom verifier implementation
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type for verifier operations
pub type SignatureResult<T> = std::result::Result<T, SignatureError>;
