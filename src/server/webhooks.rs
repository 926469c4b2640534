use std::sync::Arc;

use axum::{Json, extract::State, http::HeaderMap, response::IntoResponse};
use bytes::Bytes;
use chrono::Utc;

use crate::billing::{BillingEvent, SIGNATURE_HEADER, verify_signature};
use crate::server::AppState;
use crate::server::dto::WebhookResponse;
use crate::server::response::{ApiError, ApiResponse};

pub async fn billing_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    let secret = state
        .billing_secret
        .as_deref()
        .ok_or_else(|| ApiError::unavailable("Billing webhooks are not configured"))?;

    let signature = headers.get(SIGNATURE_HEADER).and_then(|h| h.to_str().ok());
    verify_signature(secret, &body, signature)
        .map_err(|_| ApiError::unauthorized("Invalid webhook signature"))?;

    let event = BillingEvent::parse(&body)?;

    let Some(subscription) = event.to_subscription(Utc::now())? else {
        tracing::debug!(event_id = %event.id, event_type = %event.event_type, "Ignoring billing event");
        return Ok::<_, ApiError>(Json(ApiResponse::success(WebhookResponse {
            received: true,
            applied: false,
            is_premium: None,
        })));
    };

    let result = state
        .store
        .apply_subscription_event(&subscription)
        .map_err(ApiError::from)?;

    tracing::info!(
        event_id = %event.id,
        subscription_id = %subscription.provider_subscription_id,
        user_id = %subscription.user_id,
        status = %subscription.status,
        applied = result.applied,
        is_premium = result.is_premium,
        "Billing event processed"
    );

    Ok(Json(ApiResponse::success(WebhookResponse {
        received: true,
        applied: result.applied,
        is_premium: Some(result.is_premium),
    })))
}
