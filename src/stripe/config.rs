//! Webhook configuration loaded from the environment.
//!
//! - `STRIPE_WEBHOOK_SECRET` (required): endpoint signing secret, `whsec_...`
//! - `STRIPE_WEBHOOK_TOLERANCE_SECS` (optional): timestamp tolerance, `0` disables
//! - `STRIPE_WEBHOOK_MAX_BODY_BYTES` (optional): largest body the guard will buffer

use std::env;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use tracing::{info, warn};

use crate::error::ConfigError;
use crate::guard::is_valid_secret;
use crate::stripe::signature::{VerificationOptions, DEFAULT_TOLERANCE};

/// Environment variable holding the signing secret
pub const SECRET_ENV: &str = "STRIPE_WEBHOOK_SECRET";

/// Environment variable overriding the timestamp tolerance
pub const TOLERANCE_ENV: &str = "STRIPE_WEBHOOK_TOLERANCE_SECS";

/// Environment variable overriding the body size limit
pub const MAX_BODY_ENV: &str = "STRIPE_WEBHOOK_MAX_BODY_BYTES";

/// Default body size limit (1 MiB)
pub const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;

/// Stripe webhook endpoint configuration
#[derive(Debug)]
pub struct StripeWebhookConfig {
    /// Signing secret; redacted in `Debug` output
    pub secret: SecretString,
    /// Options forwarded to the verifier
    pub options: VerificationOptions,
    /// Largest request body buffered for verification
    pub max_body_bytes: usize,
}

impl StripeWebhookConfig {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingEnv`] when the secret is unset and
    /// [`ConfigError::InvalidSecret`] when it is not a `whsec_` secret.
    pub fn from_env() -> Result<Self, ConfigError> {
        let secret = env::var(SECRET_ENV).map_err(|_| ConfigError::MissingEnv(SECRET_ENV))?;
        if !is_valid_secret(&secret) {
            return Err(ConfigError::InvalidSecret);
        }

        let tolerance = match env::var(TOLERANCE_ENV) {
            Ok(raw) => {
                let secs = raw.parse::<u64>().map_err(|e| ConfigError::InvalidValue {
                    var: TOLERANCE_ENV,
                    reason: e.to_string(),
                })?;
                if secs == 0 {
                    warn!("Webhook timestamp tolerance disabled; replayed deliveries will verify");
                }
                Duration::from_secs(secs)
            }
            Err(_) => DEFAULT_TOLERANCE,
        };

        let max_body_bytes = match env::var(MAX_BODY_ENV) {
            Ok(raw) => match raw.parse::<usize>() {
                Ok(0) => {
                    return Err(ConfigError::InvalidValue {
                        var: MAX_BODY_ENV,
                        reason: "body limit cannot be 0".to_string(),
                    })
                }
                Ok(n) => n,
                Err(e) => {
                    return Err(ConfigError::InvalidValue {
                        var: MAX_BODY_ENV,
                        reason: e.to_string(),
                    })
                }
            },
            Err(_) => DEFAULT_MAX_BODY_BYTES,
        };

        info!(
            tolerance_secs = tolerance.as_secs(),
            max_body_bytes, "Loaded Stripe webhook configuration"
        );

        Ok(Self {
            secret: SecretString::from(secret),
            options: VerificationOptions::new().with_tolerance(tolerance),
            max_body_bytes,
        })
    }

    /// Create a test configuration (for testing only)
    #[cfg(test)]
    pub fn test_config() -> Self {
        Self {
            secret: SecretString::from("whsec_test".to_string()),
            options: VerificationOptions::new(),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }

    /// Borrow the raw secret
    pub fn expose_secret(&self) -> &str {
        self.secret.expose_secret()
    }
}
