use reqwest::{Client, RequestBuilder};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::{
    app_error::{AppError, AppResult},
    application::ports::payment_processor::TransportError,
};

pub const STRIPE_API_BASE: &str = "https://api.stripe.com/v1";

const STRIPE_ACCOUNT_HEADER: &str = "Stripe-Account";

const SUBSCRIPTION_ITEMS_PAGE_SIZE: &str = "100";

#[derive(Clone)]
pub struct StripeClient {
    client: Client,
    secret_key: SecretString,
    api_base: String,
}

impl StripeClient {
    pub fn new(secret_key: SecretString, api_base: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            secret_key,
            api_base: api_base.into().trim_end_matches('/').to_string(),
        }
    }

    fn auth_header(&self) -> String {
        use base64::Engine;
        let encoded = base64::engine::general_purpose::STANDARD
            .encode(format!("{}:", self.secret_key.expose_secret()));
        format!("Basic {}", encoded)
    }

    fn subscription_url(&self, subscription_id: &str) -> String {
        format!("{}/subscriptions/{}", self.api_base, subscription_id)
    }

    /// Attach auth and, for connected accounts, the account header
    fn authorize(&self, request: RequestBuilder, account: Option<&str>) -> RequestBuilder {
        let request = request.header("Authorization", self.auth_header());
        match account {
            Some(account) => request.header(STRIPE_ACCOUNT_HEADER, account),
            None => request,
        }
    }

    // ========================================================================
    // Subscriptions
    // ========================================================================

    pub async fn get_subscription(
        &self,
        subscription_id: &str,
        account: Option<&str>,
    ) -> Result<StripeSubscription, TransportError> {
        let response = self
            .authorize(self.client.get(self.subscription_url(subscription_id)), account)
            .send()
            .await
            .map_err(|e| TransportError::Request(e.to_string()))?;

        self.handle_response(response).await
    }

    /// One page of a subscription's items, after `starting_after` when given.
    pub async fn list_subscription_items(
        &self,
        subscription_id: &str,
        starting_after: Option<&str>,
        account: Option<&str>,
    ) -> Result<StripeSubscriptionItems, TransportError> {
        let mut query: Vec<(&str, &str)> = vec![
            ("subscription", subscription_id),
            ("limit", SUBSCRIPTION_ITEMS_PAGE_SIZE),
        ];
        if let Some(starting_after) = starting_after {
            query.push(("starting_after", starting_after));
        }

        let response = self
            .authorize(
                self.client.get(format!("{}/subscription_items", self.api_base)),
                account,
            )
            .query(&query)
            .send()
            .await
            .map_err(|e| TransportError::Request(e.to_string()))?;

        self.handle_response(response).await
    }

    pub async fn update_subscription(
        &self,
        subscription_id: &str,
        params: &[(&str, String)],
        account: Option<&str>,
    ) -> Result<StripeSubscription, TransportError> {
        let response = self
            .authorize(self.client.post(self.subscription_url(subscription_id)), account)
            .form(params)
            .send()
            .await
            .map_err(|e| TransportError::Request(e.to_string()))?;

        self.handle_response(response).await
    }

    /// Cancel immediately
    pub async fn delete_subscription(
        &self,
        subscription_id: &str,
        account: Option<&str>,
    ) -> Result<StripeSubscription, TransportError> {
        let response = self
            .authorize(self.client.delete(self.subscription_url(subscription_id)), account)
            .send()
            .await
            .map_err(|e| TransportError::Request(e.to_string()))?;

        self.handle_response(response).await
    }

    // ========================================================================
    // Webhook Signature Verification
    // ========================================================================

    pub fn verify_webhook_signature(
        payload: &str,
        signature_header: &str,
        webhook_secret: &str,
        tolerance_secs: i64,
    ) -> AppResult<()> {
        Self::verify_webhook_signature_at(
            payload,
            signature_header,
            webhook_secret,
            tolerance_secs,
            chrono::Utc::now().timestamp(),
        )
    }

    fn verify_webhook_signature_at(
        payload: &str,
        signature_header: &str,
        webhook_secret: &str,
        tolerance_secs: i64,
        now: i64,
    ) -> AppResult<()> {
        use hmac::{Hmac, Mac};
        use sha2::Sha256;

        // Parse signature header: "t=timestamp,v1=signature,..."
        let mut timestamp: Option<&str> = None;
        let mut signatures: Vec<&str> = Vec::new();

        for part in signature_header.split(',') {
            let Some((key, value)) = part.trim().split_once('=') else {
                continue;
            };
            match key {
                "t" => timestamp = Some(value),
                "v1" => signatures.push(value),
                _ => {}
            }
        }

        let timestamp =
            timestamp.ok_or_else(|| AppError::InvalidInput("Missing timestamp in signature".into()))?;

        if signatures.is_empty() {
            return Err(AppError::InvalidInput("Missing signature".into()));
        }

        let signed_payload = format!("{}.{}", timestamp, payload);
        let mut mac = Hmac::<Sha256>::new_from_slice(webhook_secret.as_bytes())
            .map_err(|_| AppError::Internal("HMAC error".into()))?;
        mac.update(signed_payload.as_bytes());
        let expected = hex::encode(mac.finalize().into_bytes());

        if !signatures
            .iter()
            .any(|sig| constant_time_compare(sig, &expected))
        {
            return Err(AppError::InvalidInput("Invalid signature".into()));
        }

        let ts: i64 = timestamp
            .parse()
            .map_err(|_| AppError::InvalidInput("Invalid timestamp".into()))?;
        if (now - ts).abs() > tolerance_secs {
            return Err(AppError::InvalidInput("Timestamp outside tolerance".into()));
        }

        Ok(())
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    async fn handle_response<T: for<'de> Deserialize<'de>>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, TransportError> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| TransportError::Request(format!("Failed to read response: {}", e)))?;

        if !status.is_success() {
            tracing::error!(status = %status, body = %body, "Stripe API error");

            let (message, code) = match serde_json::from_str::<StripeErrorResponse>(&body) {
                Ok(error) => (
                    error.error.message.unwrap_or(error.error.error_type),
                    error.error.code,
                ),
                Err(_) => (body, None),
            };

            return Err(TransportError::Api {
                status: status.as_u16(),
                message,
                code,
            });
        }

        serde_json::from_str(&body).map_err(|e| {
            tracing::error!(body = %body, error = %e, "Failed to parse Stripe response");
            TransportError::Decode(e.to_string())
        })
    }
}

pub(crate) fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut result = 0u8;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }
    result == 0
}

// ============================================================================
// Stripe Types
// ============================================================================

/// A field Stripe returns either as an id or, when expanded, as an object
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum StripeExpandable {
    Id(String),
    Object { id: String },
}

impl StripeExpandable {
    pub fn id(&self) -> &str {
        match self {
            StripeExpandable::Id(id) => id,
            StripeExpandable::Object { id } => id,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeSubscription {
    pub id: String,
    pub customer: StripeExpandable,
    pub status: String,
    #[serde(default)]
    pub plan: Option<StripePlan>,
    #[serde(default)]
    pub quantity: Option<i64>,
    #[serde(default)]
    pub current_period_end: Option<i64>,
    #[serde(default)]
    pub cancel_at_period_end: bool,
    #[serde(default)]
    pub ended_at: Option<i64>,
    #[serde(default)]
    pub trial_end: Option<i64>,
    #[serde(default)]
    pub application_fee_percent: Option<f64>,
    pub items: StripeSubscriptionItems,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripePlan {
    pub id: String,
}

/// Embedded lists hold the first page only; `has_more` marks a truncated one.
#[derive(Debug, Clone, Deserialize)]
pub struct StripeSubscriptionItems {
    pub data: Vec<StripeSubscriptionItem>,
    #[serde(default)]
    pub has_more: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeSubscriptionItem {
    pub id: String,
    pub price: StripePrice,
    #[serde(default)]
    pub quantity: Option<i64>,
    #[serde(default)]
    pub current_period_end: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripePrice {
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub struct StripeErrorResponse {
    pub error: StripeError,
}

#[derive(Debug, Deserialize)]
pub struct StripeError {
    #[serde(rename = "type")]
    pub error_type: String,
    pub message: Option<String>,
    pub code: Option<String>,
}

// ============================================================================
// Webhook Event Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct StripeWebhookEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub account: Option<String>,
    pub data: StripeWebhookEventData,
}

#[derive(Debug, Deserialize)]
pub struct StripeWebhookEventData {
    pub object: serde_json::Value,
}

impl StripeWebhookEvent {
    pub fn get_subscription(&self) -> Result<StripeSubscription, TransportError> {
        serde_json::from_value(self.data.object.clone())
            .map_err(|e| TransportError::Decode(e.to_string()))
    }
}
