use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    adapters::http::app_state::AppState,
    app_error::{AppError, AppResult},
    application::{
        ports::payment_processor::SubscriptionId,
        use_cases::{
            subscription_commands::SubscriptionCommands,
            subscription_sync::{SyncOutcome, SyncRequest},
        },
    },
    domain::entities::{subscription::SubscriptionProfile, subscription_item::SubscriptionItemProfile},
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/sync/{processor_id}", post(sync_subscription))
        .route("/{id}", get(get_subscription))
        .route("/{id}/cancel", post(cancel_subscription))
        .route("/{id}/cancel-now", post(cancel_subscription_now))
        .route("/{id}/resume", post(resume_subscription))
        .route("/{id}/pause", post(pause_subscription))
        .route("/{id}/swap", post(swap_subscription))
        .route("/{id}/quantity", post(change_subscription_quantity))
}

// ============================================================================
// Request / Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
struct SyncQuery {
    name: Option<String>,
    account: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SwapPayload {
    plan: String,
}

#[derive(Debug, Deserialize)]
struct QuantityPayload {
    quantity: i64,
}

#[derive(Debug, Serialize)]
struct SubscriptionState {
    active: bool,
    canceled: bool,
    on_trial: bool,
    on_grace_period: bool,
    paused: bool,
}

#[derive(Debug, Serialize)]
struct SubscriptionResponse {
    #[serde(flatten)]
    subscription: SubscriptionProfile,
    state: SubscriptionState,
    items: Vec<SubscriptionItemProfile>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
enum SyncResponse {
    Reconciled {
        #[serde(flatten)]
        subscription: SubscriptionResponse,
    },
    Skipped {
        customer_id: String,
    },
}

fn subscription_response(
    subscription: SubscriptionProfile,
    items: Vec<SubscriptionItemProfile>,
    paused: bool,
) -> SubscriptionResponse {
    let state = SubscriptionState {
        active: subscription.active(),
        canceled: subscription.canceled(),
        on_trial: subscription.on_trial(),
        on_grace_period: subscription.on_grace_period(),
        paused,
    };
    SubscriptionResponse {
        subscription,
        state,
        items,
    }
}

// ============================================================================
// Helpers
// ============================================================================

async fn load_subscription(app_state: &AppState, id: Uuid) -> AppResult<SubscriptionProfile> {
    app_state
        .subscription_repo
        .get_by_id(id)
        .await?
        .ok_or(AppError::NotFound)
}

async fn load_with_commands(
    app_state: &AppState,
    id: Uuid,
) -> AppResult<(SubscriptionProfile, Arc<dyn SubscriptionCommands>)> {
    let subscription = load_subscription(app_state, id).await?;
    let commands = app_state
        .processor_factory
        .commands(subscription.processor)?;
    Ok((subscription, commands))
}

/// Processors without command support never report a pause.
fn is_paused(app_state: &AppState, subscription: &SubscriptionProfile) -> bool {
    app_state
        .processor_factory
        .commands(subscription.processor)
        .is_ok_and(|commands| commands.is_paused(subscription))
}

async fn respond_with(
    app_state: &AppState,
    subscription: SubscriptionProfile,
) -> AppResult<Json<SubscriptionResponse>> {
    let items = app_state
        .subscription_repo
        .list_items(subscription.id)
        .await?;
    let paused = is_paused(app_state, &subscription);
    Ok(Json(subscription_response(subscription, items, paused)))
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /api/subscriptions/{id}
async fn get_subscription(
    State(app_state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let subscription = load_subscription(&app_state, id).await?;
    respond_with(&app_state, subscription).await
}

/// POST /api/subscriptions/sync/{processor_id}
///
/// Pulls the subscription from the processor and reconciles it.
async fn sync_subscription(
    State(app_state): State<AppState>,
    Path(processor_id): Path<String>,
    Query(query): Query<SyncQuery>,
) -> AppResult<impl IntoResponse> {
    if processor_id.trim().is_empty() {
        return Err(AppError::InvalidInput("Subscription id is required".into()));
    }

    let mut request = SyncRequest::fetch(SubscriptionId::new(processor_id));
    if let Some(name) = query.name {
        request = request.with_name(name);
    }
    if let Some(account) = query.account {
        request = request.with_account(account);
    }

    let outcome = app_state.sync_use_cases.sync(request).await?;

    let response = match outcome {
        SyncOutcome::Reconciled {
            subscription,
            items,
        } => {
            let paused = is_paused(&app_state, &subscription);
            SyncResponse::Reconciled {
                subscription: subscription_response(subscription, items, paused),
            }
        }
        SyncOutcome::Skipped { customer_id } => SyncResponse::Skipped {
            customer_id: customer_id.to_string(),
        },
    };

    Ok(Json(response))
}

/// POST /api/subscriptions/{id}/cancel
async fn cancel_subscription(
    State(app_state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let (subscription, commands) = load_with_commands(&app_state, id).await?;
    let updated = commands.cancel(&subscription).await?;
    respond_with(&app_state, updated).await
}

/// POST /api/subscriptions/{id}/cancel-now
async fn cancel_subscription_now(
    State(app_state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let (subscription, commands) = load_with_commands(&app_state, id).await?;
    let updated = commands.cancel_now(&subscription).await?;
    respond_with(&app_state, updated).await
}

/// POST /api/subscriptions/{id}/resume
async fn resume_subscription(
    State(app_state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let (subscription, commands) = load_with_commands(&app_state, id).await?;
    let updated = commands.resume(&subscription).await?;
    respond_with(&app_state, updated).await
}

/// POST /api/subscriptions/{id}/pause
async fn pause_subscription(
    State(app_state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let (subscription, commands) = load_with_commands(&app_state, id).await?;
    commands.pause(&subscription).await?;
    Ok(StatusCode::ACCEPTED)
}

/// POST /api/subscriptions/{id}/swap
///
/// The local record is refreshed by the next sync.
async fn swap_subscription(
    State(app_state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<SwapPayload>,
) -> AppResult<impl IntoResponse> {
    let (subscription, commands) = load_with_commands(&app_state, id).await?;
    commands.swap(&subscription, &payload.plan).await?;
    Ok(StatusCode::ACCEPTED)
}

/// POST /api/subscriptions/{id}/quantity
async fn change_subscription_quantity(
    State(app_state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<QuantityPayload>,
) -> AppResult<impl IntoResponse> {
    let (subscription, commands) = load_with_commands(&app_state, id).await?;
    commands
        .change_quantity(&subscription, payload.quantity)
        .await?;
    Ok(StatusCode::ACCEPTED)
}
