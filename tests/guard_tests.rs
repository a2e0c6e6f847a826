//! Webhook guard integration tests
//!
//! Drive the guard through a real axum router and check the HTTP-facing
//! contract: status codes, error bodies, and what downstream handlers see.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::extract::Extension;
use axum::http::{HeaderValue, Request, StatusCode};
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{middleware, Json, Router};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use tower::ServiceExt;

use stripe_webhook_guard::stripe::{
    generate_test_header, SignatureError, SignatureResult, SignatureVerifier,
    StripeSignatureVerifier, VerificationOptions,
};
use stripe_webhook_guard::{verify_webhook, webhook_router, Event, VerifiedEvent, WebhookGuard};

const SECRET: &str = "whsec_test";
const PAYLOAD: &str = r#"{"id":"evt_test_webhook","object":"event"}"#;
const NOW: i64 = 1_700_000_000;
const PATH: &str = "/webhooks/stripe";

/// Verifier wrapper that counts how often it is consulted
struct CountingVerifier {
    inner: StripeSignatureVerifier,
    calls: AtomicU32,
}

impl CountingVerifier {
    fn new() -> Self {
        Self {
            inner: StripeSignatureVerifier,
            calls: AtomicU32::new(0),
        }
    }
}

#[async_trait::async_trait]
impl SignatureVerifier for CountingVerifier {
    async fn verify_signed_event(
        &self,
        payload: &[u8],
        signature_header: &str,
        secret: &str,
        options: &VerificationOptions,
    ) -> SignatureResult<Event> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner
            .verify_signed_event(payload, signature_header, secret, options)
            .await
    }
}

/// Verifier that records exactly what it was handed
struct RecordingVerifier {
    seen: std::sync::Mutex<Vec<(Vec<u8>, String, String, VerificationOptions)>>,
}

#[async_trait::async_trait]
impl SignatureVerifier for RecordingVerifier {
    async fn verify_signed_event(
        &self,
        payload: &[u8],
        signature_header: &str,
        secret: &str,
        options: &VerificationOptions,
    ) -> SignatureResult<Event> {
        self.seen.lock().unwrap().push((
            payload.to_vec(),
            signature_header.to_string(),
            secret.to_string(),
            options.clone(),
        ));
        Err(SignatureError::Other(anyhow::anyhow!("recording only")))
    }
}

fn pinned() -> VerificationOptions {
    VerificationOptions::new().with_received_at(NOW)
}

fn request(signature: Option<&str>, body: &'static str) -> Request<Body> {
    let mut builder = Request::builder().method("POST").uri(PATH);
    if let Some(signature) = signature {
        builder = builder.header("Stripe-Signature", signature);
    }
    builder.body(Body::from(body)).unwrap()
}

/// Router whose handler counts invocations and echoes the published event
fn counting_app(verifier: Arc<CountingVerifier>, next_calls: Arc<AtomicU32>) -> Router {
    let guard = WebhookGuard::new(SECRET, verifier, pinned()).unwrap();

    webhook_router(PATH, guard, move |VerifiedEvent(event): VerifiedEvent| {
        let next_calls = next_calls.clone();
        async move {
            next_calls.fetch_add(1, Ordering::SeqCst);
            (StatusCode::OK, Json(event.into_value()))
        }
    })
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_valid_signature_reaches_handler() {
    let verifier = Arc::new(CountingVerifier::new());
    let next_calls = Arc::new(AtomicU32::new(0));
    let app = counting_app(verifier.clone(), next_calls.clone());

    let header = generate_test_header(PAYLOAD.as_bytes(), SECRET, NOW);
    let response = app.oneshot(request(Some(&header), PAYLOAD)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        json_body(response).await,
        json!({"id": "evt_test_webhook", "object": "event"})
    );
    assert_eq!(verifier.calls.load(Ordering::SeqCst), 1);
    assert_eq!(next_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_missing_header_short_circuits() {
    let verifier = Arc::new(CountingVerifier::new());
    let next_calls = Arc::new(AtomicU32::new(0));
    let app = counting_app(verifier.clone(), next_calls.clone());

    let response = app.oneshot(request(None, PAYLOAD)).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        json_body(response).await,
        json!({"error": "Missing signature header"})
    );
    assert_eq!(verifier.calls.load(Ordering::SeqCst), 0);
    assert_eq!(next_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_wrong_signature_rejected() {
    let verifier = Arc::new(CountingVerifier::new());
    let next_calls = Arc::new(AtomicU32::new(0));
    let app = counting_app(verifier.clone(), next_calls.clone());

    let header = format!("t={},v1={}", NOW, "ab".repeat(32));
    let response = app.oneshot(request(Some(&header), PAYLOAD)).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        json_body(response).await,
        json!({"error": "Signature verification failed"})
    );
    assert_eq!(verifier.calls.load(Ordering::SeqCst), 1);
    assert_eq!(next_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_signature_for_other_secret_rejected() {
    let verifier = Arc::new(CountingVerifier::new());
    let next_calls = Arc::new(AtomicU32::new(0));
    let app = counting_app(verifier, next_calls.clone());

    let header = generate_test_header(PAYLOAD.as_bytes(), "whsec_someoneelse", NOW);
    let response = app.oneshot(request(Some(&header), PAYLOAD)).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(next_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_garbage_header_rejected() {
    let verifier = Arc::new(CountingVerifier::new());
    let next_calls = Arc::new(AtomicU32::new(0));
    let app = counting_app(verifier, next_calls.clone());

    let response = app
        .oneshot(request(Some("definitely not a signature"), PAYLOAD))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        json_body(response).await,
        json!({"error": "Signature verification failed"})
    );
    assert_eq!(next_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_non_ascii_header_rejected() {
    let verifier = Arc::new(CountingVerifier::new());
    let next_calls = Arc::new(AtomicU32::new(0));
    let app = counting_app(verifier.clone(), next_calls.clone());

    // Present but not visible ASCII, so it never reaches the verifier
    let mut req = request(None, PAYLOAD);
    req.headers_mut().insert(
        "stripe-signature",
        HeaderValue::from_bytes(b"t=1,v1=\xff").unwrap(),
    );
    let response = app.oneshot(req).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        json_body(response).await,
        json!({"error": "Signature verification failed"})
    );
    assert_eq!(verifier.calls.load(Ordering::SeqCst), 0);
    assert_eq!(next_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_stale_timestamp_rejected() {
    let verifier = Arc::new(CountingVerifier::new());
    let next_calls = Arc::new(AtomicU32::new(0));
    let app = counting_app(verifier, next_calls.clone());

    let header = generate_test_header(PAYLOAD.as_bytes(), SECRET, NOW - 3600);
    let response = app.oneshot(request(Some(&header), PAYLOAD)).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(next_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_downstream_status_propagates() {
    let guard = WebhookGuard::stripe_with_options(SECRET, pinned()).unwrap();
    let app = webhook_router(PATH, guard, || async {
        (StatusCode::ACCEPTED, "queued").into_response()
    });

    let header = generate_test_header(PAYLOAD.as_bytes(), SECRET, NOW);
    let response = app.oneshot(request(Some(&header), PAYLOAD)).await.unwrap();

    assert_eq!(response.status(), StatusCode::ACCEPTED);
}

#[tokio::test]
async fn test_downstream_error_propagates_unmodified() {
    let guard = WebhookGuard::stripe_with_options(SECRET, pinned()).unwrap();
    let app = webhook_router(PATH, guard, || async {
        (StatusCode::INTERNAL_SERVER_ERROR, "handler exploded").into_response()
    });

    let header = generate_test_header(PAYLOAD.as_bytes(), SECRET, NOW);
    let response = app.oneshot(request(Some(&header), PAYLOAD)).await.unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"handler exploded");
}

#[tokio::test]
async fn test_body_still_readable_downstream() {
    let guard = WebhookGuard::stripe_with_options(SECRET, pinned()).unwrap();
    let app = webhook_router(PATH, guard, |body: String| async move { body });

    let header = generate_test_header(PAYLOAD.as_bytes(), SECRET, NOW);
    let response = app.oneshot(request(Some(&header), PAYLOAD)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], PAYLOAD.as_bytes());
}

#[tokio::test]
async fn test_event_available_as_extension() {
    let guard = Arc::new(WebhookGuard::stripe_with_options(SECRET, pinned()).unwrap());
    let app = Router::new()
        .route(
            PATH,
            post(|Extension(event): Extension<Event>| async move {
                event.id().unwrap_or_default().to_string()
            }),
        )
        .route_layer(middleware::from_fn_with_state(
            guard,
            verify_webhook::<StripeSignatureVerifier>,
        ));

    let header = generate_test_header(PAYLOAD.as_bytes(), SECRET, NOW);
    let response = app.oneshot(request(Some(&header), PAYLOAD)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"evt_test_webhook");
}

#[tokio::test]
async fn test_oversized_body_rejected() {
    let guard = WebhookGuard::stripe_with_options(SECRET, pinned())
        .unwrap()
        .with_max_body_bytes(8);
    let app = webhook_router(PATH, guard, || async { StatusCode::OK });

    let header = generate_test_header(PAYLOAD.as_bytes(), SECRET, NOW);
    let response = app.oneshot(request(Some(&header), PAYLOAD)).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        json_body(response).await,
        json!({"error": "Signature verification failed"})
    );
}

#[tokio::test]
async fn test_verifier_receives_exact_inputs() {
    let verifier = Arc::new(RecordingVerifier {
        seen: std::sync::Mutex::new(Vec::new()),
    });
    let options = pinned().without_tolerance();
    let guard = WebhookGuard::new(SECRET, verifier.clone(), options.clone()).unwrap();
    let app = webhook_router(PATH, guard, || async { StatusCode::OK });

    let response = app
        .oneshot(request(Some("t=1,v1=abc"), PAYLOAD))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let seen = verifier.seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    let (payload, header, secret, forwarded) = &seen[0];
    assert_eq!(payload.as_slice(), PAYLOAD.as_bytes());
    assert_eq!(header, "t=1,v1=abc");
    assert_eq!(secret, SECRET);
    assert_eq!(forwarded, &options);
}

#[tokio::test]
async fn test_same_delivery_verifies_identically() {
    let verifier = Arc::new(CountingVerifier::new());
    let next_calls = Arc::new(AtomicU32::new(0));
    let app = counting_app(verifier.clone(), next_calls.clone());

    let good = generate_test_header(PAYLOAD.as_bytes(), SECRET, NOW);
    let bad = format!("t={},v1={}", NOW, "cd".repeat(32));

    for _ in 0..2 {
        let ok = app
            .clone()
            .oneshot(request(Some(&good), PAYLOAD))
            .await
            .unwrap();
        assert_eq!(ok.status(), StatusCode::OK);

        let rejected = app
            .clone()
            .oneshot(request(Some(&bad), PAYLOAD))
            .await
            .unwrap();
        assert_eq!(rejected.status(), StatusCode::BAD_REQUEST);
    }

    assert_eq!(verifier.calls.load(Ordering::SeqCst), 4);
    assert_eq!(next_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_concurrent_deliveries_share_one_guard() {
    let verifier = Arc::new(CountingVerifier::new());
    let next_calls = Arc::new(AtomicU32::new(0));
    let app = counting_app(verifier.clone(), next_calls.clone());

    let mut tasks = Vec::new();
    for _ in 0..16 {
        let app = app.clone();
        tasks.push(tokio::spawn(async move {
            let header = generate_test_header(PAYLOAD.as_bytes(), SECRET, NOW);
            app.oneshot(request(Some(&header), PAYLOAD))
                .await
                .unwrap()
                .status()
        }));
    }

    for task in tasks {
        assert_eq!(task.await.unwrap(), StatusCode::OK);
    }
    assert_eq!(next_calls.load(Ordering::SeqCst), 16);
}

#[tokio::test]
async fn test_handler_without_guard_is_server_error() {
    let app = Router::new().route(
        PATH,
        post(|VerifiedEvent(_event): VerifiedEvent| async { StatusCode::OK }),
    );

    let response = app.oneshot(request(None, PAYLOAD)).await.unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}
