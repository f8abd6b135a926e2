use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::entities::payment_processor::PaymentProcessor;

// ============================================================================
// Port Types - Processor-agnostic domain types
// ============================================================================

/// Unique identifier for a customer in a payment processor
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CustomerId(pub String);

impl CustomerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CustomerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a subscription in a payment processor
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubscriptionId(pub String);

impl SubscriptionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One line item as the processor reports it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteItem {
    pub id: String,
    pub price_id: String,
    pub quantity: i64,
}

/// The processor's view of a subscription at fetch time.
///
/// Timestamps are unix epoch seconds, exactly as the processor reports them.
#[derive(Debug, Clone, PartialEq)]
pub struct SubscriptionSnapshot {
    pub id: SubscriptionId,
    pub customer_id: CustomerId,
    pub plan_id: String,
    pub quantity: i64,
    pub status: String,
    pub trial_end: Option<i64>,
    pub cancel_at_period_end: bool,
    pub current_period_end: i64,
    pub ended_at: Option<i64>,
    pub application_fee_percent: Option<f64>,
    pub items: Vec<RemoteItem>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProrationBehavior {
    CreateProrations,
    None,
}

impl ProrationBehavior {
    pub fn from_prorate(prorate: bool) -> Self {
        if prorate {
            ProrationBehavior::CreateProrations
        } else {
            ProrationBehavior::None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProrationBehavior::CreateProrations => "create_prorations",
            ProrationBehavior::None => "none",
        }
    }
}

/// When the processor should end a trial
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrialEnd {
    Now,
    At(i64),
}

/// Fields to change on a remote subscription. Unset fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubscriptionUpdateParams {
    pub cancel_at_period_end: Option<bool>,
    pub plan: Option<String>,
    pub quantity: Option<i64>,
    pub proration_behavior: Option<ProrationBehavior>,
    pub trial_end: Option<TrialEnd>,
}

impl SubscriptionUpdateParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel_at_period_end(mut self, value: bool) -> Self {
        self.cancel_at_period_end = Some(value);
        self
    }

    pub fn plan(mut self, plan: impl Into<String>) -> Self {
        self.plan = Some(plan.into());
        self
    }

    pub fn quantity(mut self, quantity: i64) -> Self {
        self.quantity = Some(quantity);
        self
    }

    pub fn proration_behavior(mut self, behavior: ProrationBehavior) -> Self {
        self.proration_behavior = Some(behavior);
        self
    }

    pub fn trial_end(mut self, trial_end: TrialEnd) -> Self {
        self.trial_end = Some(trial_end);
        self
    }
}

/// Failure talking to the remote processor.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransportError {
    #[error("Processor request failed: {0}")]
    Request(String),

    #[error("Processor returned {status}: {message}")]
    Api {
        status: u16,
        message: String,
        code: Option<String>,
    },

    #[error("Unexpected processor response: {0}")]
    Decode(String),
}

impl TransportError {
    /// Whether a later attempt could succeed (network failures, rate limits, 5xx)
    pub fn is_retryable(&self) -> bool {
        match self {
            TransportError::Request(_) => true,
            TransportError::Api { status, .. } => *status == 429 || *status >= 500,
            TransportError::Decode(_) => false,
        }
    }
}

// ============================================================================
// Processor Client Port
// ============================================================================

/// Remote processor boundary used by reconciliation and lifecycle commands.
///
/// `account` is the connected-account context the call runs under, if any.
/// Every returned snapshot carries the complete item list.
#[async_trait]
pub trait ProcessorClient: Send + Sync {
    fn processor(&self) -> PaymentProcessor;

    async fn retrieve_subscription(
        &self,
        id: &SubscriptionId,
        account: Option<&str>,
    ) -> Result<SubscriptionSnapshot, TransportError>;

    async fn update_subscription(
        &self,
        id: &SubscriptionId,
        params: &SubscriptionUpdateParams,
        account: Option<&str>,
    ) -> Result<SubscriptionSnapshot, TransportError>;

    /// Cancel immediately
    async fn delete_subscription(
        &self,
        id: &SubscriptionId,
        account: Option<&str>,
    ) -> Result<SubscriptionSnapshot, TransportError>;
}
