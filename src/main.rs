//! Stripe Webhook Guard demo receiver
//!
//! Serves a single signature-verified webhook endpoint plus `/health`.
//! The signing secret comes from `STRIPE_WEBHOOK_SECRET`.

use std::net::SocketAddr;

use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use clap::Parser;
use serde_json::{json, Value};
use tower_http::trace::TraceLayer;

use stripe_webhook_guard::stripe::StripeWebhookConfig;
use stripe_webhook_guard::{webhook_router, ConfigError, Result, VerifiedEvent, WebhookGuard};

/// Stripe Webhook Guard
#[derive(Parser, Debug)]
#[command(name = "stripe-webhook-guard")]
#[command(author = "ReasonKit Team <team@reasonkit.sh>")]
#[command(version)]
#[command(about = "Receive Stripe webhooks behind signature verification")]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "4242")]
    port: u16,

    /// Host to bind to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Path the webhook endpoint is mounted at
    #[arg(long, default_value = "/webhooks/stripe")]
    path: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

async fn receive(VerifiedEvent(event): VerifiedEvent) -> (StatusCode, Json<Value>) {
    tracing::info!(
        event_id = event.id().unwrap_or("<none>"),
        event_type = event.typed_event_type().as_str(),
        livemode = event.livemode(),
        "Received Stripe event"
    );

    (
        StatusCode::OK,
        Json(json!({
            "received": true,
            "id": event.id(),
            "type": event.event_type(),
        })),
    )
}

async fn health() -> &'static str {
    "ok"
}

fn bind_addr(host: &str, port: u16) -> std::result::Result<SocketAddr, ConfigError> {
    format!("{}:{}", host, port)
        .parse()
        .map_err(|e: std::net::AddrParseError| ConfigError::InvalidValue {
            var: "--host",
            reason: format!("{}:{}: {}", host, port, e),
        })
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize tracing
    let filter = if args.verbose {
        "debug"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .init();

    let config = StripeWebhookConfig::from_env()?;
    let guard = WebhookGuard::from_config(&config)?;

    let app = Router::new()
        .route("/health", get(health))
        .merge(webhook_router(&args.path, guard, receive))
        .layer(TraceLayer::new_for_http());

    let addr = bind_addr(&args.host, args.port)?;

    tracing::info!(
        "Stripe webhook guard listening on {} (endpoint {})",
        addr,
        args.path
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
