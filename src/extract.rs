//! Extractor for the event published by the guard.

use std::ops::Deref;

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::stripe::events::Event;

/// The verified event for the current request.
///
/// Only available to handlers mounted behind the guard; anywhere else the
/// extractor rejects with a 500, since that is a wiring mistake rather than
/// a bad delivery.
#[derive(Debug, Clone)]
pub struct VerifiedEvent(pub Event);

impl Deref for VerifiedEvent {
    type Target = Event;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Rejection when no guard ran before the handler
#[derive(Debug)]
pub struct MissingVerifiedEvent;

impl IntoResponse for MissingVerifiedEvent {
    fn into_response(self) -> Response {
        tracing::error!("VerifiedEvent extracted on a route without the webhook guard");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Verified webhook event missing from request",
        )
            .into_response()
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for VerifiedEvent
where
    S: Send + Sync,
{
    type Rejection = MissingVerifiedEvent;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Event>()
            .cloned()
            .map(VerifiedEvent)
            .ok_or(MissingVerifiedEvent)
    }
}
