//! Processor webhook receiver.
//!
//! Subscription events are verified, decoded into a snapshot and reconciled
//! without a second round trip to the processor.

use axum::{
    Router,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::post,
};
use secrecy::ExposeSecret;
use tracing::{debug, error, info, warn};

use crate::{
    adapters::http::app_state::AppState,
    app_error::{AppError, AppResult},
    application::{
        ports::payment_processor::{SubscriptionId, SubscriptionSnapshot, TransportError},
        use_cases::subscription_sync::{SyncOutcome, SyncRequest},
    },
    infra::stripe_client::{StripeClient, StripeWebhookEvent},
};

const SUBSCRIPTION_EVENTS: &[&str] = &[
    "customer.subscription.created",
    "customer.subscription.updated",
    "customer.subscription.deleted",
    "customer.subscription.trial_will_end",
    "customer.subscription.paused",
    "customer.subscription.resumed",
];

pub fn router() -> Router<AppState> {
    Router::new().route("/stripe", post(handle_stripe_webhook))
}

/// POST /api/webhooks/stripe
async fn handle_stripe_webhook(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> AppResult<impl IntoResponse> {
    let signature = headers
        .get("stripe-signature")
        .and_then(|v| v.to_str().ok())
        .ok_or(AppError::InvalidInput("Missing Stripe signature".into()))?;

    StripeClient::verify_webhook_signature(
        &body,
        signature,
        app_state.config.stripe_webhook_secret.expose_secret(),
        app_state.config.webhook_tolerance_secs,
    )?;

    let event: StripeWebhookEvent = serde_json::from_str(&body)
        .map_err(|e| AppError::InvalidInput(format!("Invalid webhook payload: {}", e)))?;

    if !SUBSCRIPTION_EVENTS.contains(&event.event_type.as_str()) {
        debug!(event_type = %event.event_type, event_id = %event.id, "Ignoring webhook event");
        return Ok(StatusCode::OK);
    }

    let subscription = match event.get_subscription() {
        Ok(subscription) => subscription,
        Err(e) => return Ok(acknowledge_undecodable(&e, &event)),
    };

    let mut request = if subscription.items.has_more {
        debug!(
            event_type = %event.event_type,
            event_id = %event.id,
            subscription_id = %subscription.id,
            "Webhook item list truncated, fetching subscription"
        );
        SyncRequest::fetch(SubscriptionId::new(subscription.id))
    } else {
        match SubscriptionSnapshot::try_from(subscription) {
            Ok(snapshot) => SyncRequest::from_snapshot(snapshot),
            Err(e) => return Ok(acknowledge_undecodable(&e, &event)),
        }
    };
    if let Some(account) = &event.account {
        request = request.with_account(account.clone());
    }

    match app_state.sync_use_cases.sync(request).await {
        Ok(SyncOutcome::Reconciled { subscription, items }) => {
            info!(
                event_type = %event.event_type,
                event_id = %event.id,
                subscription_id = %subscription.id,
                status = %subscription.status,
                items = items.len(),
                "Webhook reconciled subscription"
            );
            Ok(StatusCode::OK)
        }
        Ok(SyncOutcome::Skipped { customer_id }) => {
            debug!(
                event_type = %event.event_type,
                event_id = %event.id,
                customer_id = %customer_id,
                "Webhook for unknown customer"
            );
            Ok(StatusCode::OK)
        }
        Err(e) => Ok(webhook_error_status(&e, &event)),
    }
}

/// Redelivery carries the same payload, so it is acknowledged.
fn acknowledge_undecodable(error: &TransportError, event: &StripeWebhookEvent) -> StatusCode {
    warn!(
        error = %error,
        event_type = %event.event_type,
        event_id = %event.id,
        "Undecodable subscription in webhook, acknowledging"
    );
    StatusCode::OK
}

/// 500 asks the processor to redeliver; anything a retry cannot fix is
/// acknowledged with 200 and logged.
fn webhook_error_status(error: &AppError, event: &StripeWebhookEvent) -> StatusCode {
    if error.is_retryable() {
        error!(
            error = %error,
            event_type = %event.event_type,
            event_id = %event.id,
            retryable = true,
            "Webhook processing failed, returning 500 for redelivery"
        );
        StatusCode::INTERNAL_SERVER_ERROR
    } else {
        warn!(
            error = %error,
            code = error.code().as_str(),
            event_type = %event.event_type,
            event_id = %event.id,
            retryable = false,
            "Webhook processing failed, acknowledging"
        );
        StatusCode::OK
    }
}
