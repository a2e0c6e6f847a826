//! Stripe Webhook Guard - Signature Verification Middleware for Axum
//!
//! This crate provides a request-pipeline step that sits in front of a Stripe
//! webhook endpoint, verifies the `stripe-signature` header against the raw
//! body, and hands the verified event to downstream handlers.
//!
//! # Architecture
//!
//! ```text
//! Stripe ──▶ Router ──▶ WebhookGuard ──▶ Handler
//!                           │               ▲
//!                           ▼               │
//!                   SignatureVerifier   VerifiedEvent
//!                           │          (request extensions)
//!                           ▼
//!                    400 on rejection
//! ```
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use axum::http::StatusCode;
//! use stripe_webhook_guard::{webhook_router, VerifiedEvent, WebhookGuard};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let guard = WebhookGuard::stripe("whsec_abc123")?;
//!
//!     let app = webhook_router("/webhooks/stripe", guard, |event: VerifiedEvent| async move {
//!         println!("verified {:?}", event.id());
//!         StatusCode::OK
//!     });
//!
//!     let listener = tokio::net::TcpListener::bind("127.0.0.1:4242").await?;
//!     axum::serve(listener, app).await?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod error;
pub mod extract;
pub mod guard;
pub mod stripe;

// Re-exports for convenience
pub use error::{ConfigError, Error, Result, VerificationError};
pub use extract::VerifiedEvent;
pub use guard::{verify_webhook, webhook_router, WebhookGuard, SIGNATURE_HEADER};
pub use stripe::{Event, SignatureVerifier, StripeSignatureVerifier, VerificationOptions};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
