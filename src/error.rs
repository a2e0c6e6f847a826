//! Error types for the webhook guard
//!
//! Configuration problems surface while the application is being wired up.
//! Verification problems surface per request as a 400 response. The
//! underlying cause stays in the error chain for server-side logging and
//! never reaches the response body.

use std::error::Error as StdError;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use crate::stripe::error::SignatureError;

/// The main error type for webhook guard operations
#[derive(Error, Debug)]
pub enum Error {
    /// Setup-time configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Per-request verification errors
    #[error("Verification error: {0}")]
    Verification(#[from] VerificationError),

    /// I/O errors (binding the listener, serving)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while building a guard or loading its configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Secret is absent or does not look like `whsec_<alphanumerics>`
    #[error("invalid webhook secret")]
    InvalidSecret,

    /// Required environment variable not set
    #[error("{0} environment variable not set")]
    MissingEnv(&'static str),

    /// Environment variable present but unusable
    #[error("Invalid value for {var}: {reason}")]
    InvalidValue {
        /// Variable name
        var: &'static str,
        /// Why it was rejected
        reason: String,
    },
}

/// Message returned when the signature header is absent
pub const MISSING_SIGNATURE_MESSAGE: &str = "Missing signature header";

/// Message returned for every other verification failure
pub const VERIFICATION_FAILED_MESSAGE: &str = "Signature verification failed";

/// A webhook delivery the guard refused
#[derive(Error, Debug)]
pub enum VerificationError {
    /// No `stripe-signature` header on the request
    #[error("Missing signature header")]
    MissingSignature,

    /// The verifier rejected the delivery
    #[error("Signature verification failed")]
    InvalidSignature(#[source] SignatureError),

    /// The body could not be buffered for verification
    #[error("Signature verification failed")]
    UnreadableBody(#[source] axum::Error),
}

impl VerificationError {
    /// HTTP status for this error; always 400
    pub fn status_code(&self) -> StatusCode {
        StatusCode::BAD_REQUEST
    }

    /// Message safe to show the caller
    pub fn public_message(&self) -> &'static str {
        match self {
            Self::MissingSignature => MISSING_SIGNATURE_MESSAGE,
            Self::InvalidSignature(_) | Self::UnreadableBody(_) => VERIFICATION_FAILED_MESSAGE,
        }
    }

    /// Short label for logs
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MissingSignature => "missing_signature",
            Self::InvalidSignature(_) => "invalid_signature",
            Self::UnreadableBody(_) => "unreadable_body",
        }
    }

    /// Render the full source chain, `outer: inner: ...`
    pub fn chain(&self) -> String {
        let mut rendered = self.to_string();
        let mut source = self.source();
        while let Some(cause) = source {
            rendered.push_str(": ");
            rendered.push_str(&cause.to_string());
            source = cause.source();
        }
        rendered
    }
}

impl From<SignatureError> for VerificationError {
    fn from(err: SignatureError) -> Self {
        Self::InvalidSignature(err)
    }
}

/// JSON body of a rejected delivery
#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
}

impl IntoResponse for VerificationError {
    fn into_response(self) -> Response {
        tracing::warn!(
            kind = self.kind(),
            error = %self.chain(),
            "Rejected webhook delivery"
        );

        (
            self.status_code(),
            Json(ErrorBody {
                error: self.public_message(),
            }),
        )
            .into_response()
    }
}

/// Result type alias for webhook guard operations
pub type Result<T> = std::result::Result<T, Error>;
