//! Webhook Guard Middleware
//!
//! Verifies the `stripe-signature` header of an incoming delivery against the
//! raw request body before any handler sees it.
//!
//! ```text
//! Request -> [stripe-signature?] --no--> 400 "Missing signature header"
//!                   |
//!                  yes
//!                   v
//!            [buffer raw body] -> [verifier] --err--> 400 "Signature verification failed"
//!                                      |
//!                                      ok
//!                                      v
//!                     extensions.insert(Event) -> next handler
//! ```
//!
//! The guard holds no per-request state. One `Arc<WebhookGuard>` serves any
//! number of concurrent deliveries.
//!
//! Mount the guard before anything that consumes or rewrites the body. The
//! signature is defined over the exact bytes Stripe sent.
//!
//! # Example
//!
//! ```rust,no_run
//! use axum::http::StatusCode;
//! use stripe_webhook_guard::{webhook_router, VerifiedEvent, WebhookGuard};
//!
//! async fn on_event(VerifiedEvent(event): VerifiedEvent) -> StatusCode {
//!     tracing::info!(event_id = ?event.id(), "received");
//!     StatusCode::OK
//! }
//!
//! # fn main() -> Result<(), stripe_webhook_guard::error::ConfigError> {
//! let guard = WebhookGuard::stripe("whsec_abc123")?;
//! let app: axum::Router = webhook_router("/webhooks/stripe", guard, on_event);
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::sync::{Arc, OnceLock};

use axum::body::Body;
use axum::extract::{Request, State};
use axum::handler::Handler;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::post;
use axum::Router;
use regex::Regex;
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, instrument};

use crate::error::{ConfigError, VerificationError};
use crate::stripe::config::{StripeWebhookConfig, DEFAULT_MAX_BODY_BYTES};
use crate::stripe::error::SignatureError;
use crate::stripe::events::Event;
use crate::stripe::signature::{SignatureVerifier, StripeSignatureVerifier, VerificationOptions};

/// Header Stripe puts the signature in (matched case-insensitively)
pub const SIGNATURE_HEADER: &str = "stripe-signature";

/// Shape every Stripe endpoint secret has
pub const SECRET_PATTERN: &str = r"^whsec_[a-zA-Z0-9]+$";

fn secret_regex() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(SECRET_PATTERN).expect("secret pattern is a valid regex"))
}

/// Check whether `secret` looks like a Stripe endpoint secret
pub fn is_valid_secret(secret: &str) -> bool {
    secret_regex().is_match(secret)
}

/// Signature-verifying pipeline step for one webhook endpoint.
///
/// Construction validates the secret, so a guard that exists is always
/// usable.
pub struct WebhookGuard<V = StripeSignatureVerifier> {
    secret: SecretString,
    verifier: V,
    options: VerificationOptions,
    max_body_bytes: usize,
}

impl<V: SignatureVerifier> WebhookGuard<V> {
    /// Build a guard around a verifier.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidSecret`] unless `secret` matches
    /// `^whsec_[a-zA-Z0-9]+$`.
    pub fn new(
        secret: &str,
        verifier: V,
        options: VerificationOptions,
    ) -> Result<Self, ConfigError> {
        if !is_valid_secret(secret) {
            return Err(ConfigError::InvalidSecret);
        }

        Ok(Self {
            secret: SecretString::from(secret.to_string()),
            verifier,
            options,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        })
    }

    /// Like [`WebhookGuard::new`], treating an absent secret as invalid
    pub fn from_optional_secret(
        secret: Option<&str>,
        verifier: V,
        options: VerificationOptions,
    ) -> Result<Self, ConfigError> {
        let secret = secret.ok_or(ConfigError::InvalidSecret)?;
        Self::new(secret, verifier, options)
    }

    /// Cap the number of body bytes buffered for verification
    pub fn with_max_body_bytes(mut self, max_body_bytes: usize) -> Self {
        self.max_body_bytes = max_body_bytes;
        self
    }

    /// Options forwarded to the verifier
    pub fn options(&self) -> &VerificationOptions {
        &self.options
    }

    /// The verifier this guard delegates to
    pub fn verifier(&self) -> &V {
        &self.verifier
    }

    /// Body size limit in bytes
    pub fn max_body_bytes(&self) -> usize {
        self.max_body_bytes
    }

    /// Verify one delivery without going through HTTP.
    pub async fn verify(&self, signature: &str, body: &[u8]) -> Result<Event, VerificationError> {
        let event = self
            .verifier
            .verify_signed_event(body, signature, self.secret.expose_secret(), &self.options)
            .await?;
        Ok(event)
    }

    /// Wrap `handler` in a router that only runs it for verified deliveries
    pub fn into_router<H, T>(self, path: &str, handler: H) -> Router
    where
        H: Handler<T, ()>,
        T: 'static,
    {
        Router::new()
            .route(path, post(handler))
            .route_layer(middleware::from_fn_with_state(
                Arc::new(self),
                verify_webhook::<V>,
            ))
    }
}

impl WebhookGuard<StripeSignatureVerifier> {
    /// Guard using Stripe's `v1` scheme and default options
    pub fn stripe(secret: &str) -> Result<Self, ConfigError> {
        Self::new(secret, StripeSignatureVerifier, VerificationOptions::default())
    }

    /// Guard using Stripe's `v1` scheme with explicit options
    pub fn stripe_with_options(
        secret: &str,
        options: VerificationOptions,
    ) -> Result<Self, ConfigError> {
        Self::new(secret, StripeSignatureVerifier, options)
    }

    /// Guard built from environment-loaded configuration
    pub fn from_config(config: &StripeWebhookConfig) -> Result<Self, ConfigError> {
        Ok(Self::stripe_with_options(config.expose_secret(), config.options.clone())?
            .with_max_body_bytes(config.max_body_bytes))
    }
}

impl<V> fmt::Debug for WebhookGuard<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebhookGuard")
            .field("secret", &self.secret)
            .field("options", &self.options)
            .field("max_body_bytes", &self.max_body_bytes)
            .finish_non_exhaustive()
    }
}

/// Middleware step: verify the delivery, publish the [`Event`], continue.
///
/// Use with [`axum::middleware::from_fn_with_state`]:
///
/// ```rust,ignore
/// let app = Router::new()
///     .route("/webhooks/stripe", post(handler))
///     .route_layer(middleware::from_fn_with_state(
///         Arc::new(guard),
///         verify_webhook::<StripeSignatureVerifier>,
///     ));
/// ```
///
/// Responses from `next` are returned untouched.
#[instrument(name = "webhook_guard", skip_all)]
pub async fn verify_webhook<V: SignatureVerifier>(
    State(guard): State<Arc<WebhookGuard<V>>>,
    request: Request,
    next: Next,
) -> Result<Response, VerificationError> {
    let (mut parts, body) = request.into_parts();

    let Some(signature) = parts.headers.get(SIGNATURE_HEADER).cloned() else {
        return Err(VerificationError::MissingSignature);
    };

    let bytes = axum::body::to_bytes(body, guard.max_body_bytes)
        .await
        .map_err(VerificationError::UnreadableBody)?;

    let signature = signature.to_str().map_err(|_| {
        SignatureError::MalformedHeader("header is not visible ASCII".to_string())
    })?;

    let event = guard.verify(signature, &bytes).await?;

    debug!(
        event_id = event.id().unwrap_or("<none>"),
        event_type = event.event_type().unwrap_or("<none>"),
        body_bytes = bytes.len(),
        "Webhook signature verified"
    );

    parts.extensions.insert(event);
    let request = Request::from_parts(parts, Body::from(bytes));

    Ok(next.run(request).await)
}

/// Router serving `POST path` with `handler` behind `guard`
pub fn webhook_router<V, H, T>(path: &str, guard: WebhookGuard<V>, handler: H) -> Router
where
    V: SignatureVerifier,
    H: Handler<T, ()>,
    T: 'static,
{
    guard.into_router(path, handler)
}
