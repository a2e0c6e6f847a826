//! Stripe Webhook Verification
//!
//! Provider-specific pieces the guard delegates to:
//!
//! - **Signature Verification**: HMAC-SHA256 validation of the `stripe-signature` header
//! - **Events**: the verified event object handed to downstream handlers
//! - **Configuration**: signing secret and verifier options from the environment
//!
//! # Security
//!
//! - Signing secret loaded from environment, held in a redacting `SecretString`
//! - Constant-time signature comparison to prevent timing attacks
//! - Verification runs over the raw, unparsed body

pub mod config;
pub mod error;
pub mod events;
pub mod signature;

// Re-export commonly used items
pub use config::StripeWebhookConfig;
pub use error::{SignatureError, SignatureResult};
pub use events::{Event, StripeEventType};
pub use signature::{
    generate_test_header, SignatureVerifier, StripeSignatureVerifier, VerificationOptions,
};
