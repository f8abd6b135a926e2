use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

use super::payment_processor::PaymentProcessor;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, AsRefStr, Display,
    EnumString,
)]
#[sqlx(type_name = "subscription_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SubscriptionStatus {
    Active,
    Trialing,
    PastDue,
    Canceled,
    Incomplete,
    IncompleteExpired,
    Unpaid,
    Paused,
}

impl SubscriptionStatus {
    /// Statuses under which the owner keeps access, before `ends_at` is considered
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            SubscriptionStatus::Active | SubscriptionStatus::Trialing
        )
    }
}

/// Local record of one processor subscription.
///
/// Keyed by `(processor, processor_id)`. Rows are never deleted by reconciliation:
/// cancellation is expressed through `status` and `ends_at`.
#[derive(Debug, Clone, Serialize)]
pub struct SubscriptionProfile {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub processor: PaymentProcessor,
    pub processor_id: String,
    pub name: String,
    pub processor_plan: String,
    pub quantity: i32,
    pub status: SubscriptionStatus,
    pub trial_ends_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    pub application_fee_percent: Option<f64>,
    pub processor_account: Option<String>,
    pub prorate: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl SubscriptionProfile {
    pub fn on_trial(&self) -> bool {
        self.on_trial_at(Utc::now())
    }

    pub fn on_trial_at(&self, now: DateTime<Utc>) -> bool {
        self.trial_ends_at.is_some_and(|trial_end| now < trial_end)
    }

    /// A cancellation has been scheduled or has taken effect.
    pub fn canceled(&self) -> bool {
        self.ends_at.is_some() || self.status == SubscriptionStatus::Canceled
    }

    pub fn on_grace_period(&self) -> bool {
        self.on_grace_period_at(Utc::now())
    }

    /// Canceled, but `ends_at` has not been reached yet.
    pub fn on_grace_period_at(&self, now: DateTime<Utc>) -> bool {
        self.canceled() && self.ends_at.is_some_and(|ends_at| now < ends_at)
    }

    pub fn active(&self) -> bool {
        self.active_at(Utc::now())
    }

    pub fn active_at(&self, now: DateTime<Utc>) -> bool {
        self.status.is_active()
            && (self.ends_at.is_none() || self.on_grace_period_at(now) || self.on_trial_at(now))
    }
}
