//! Maps a processor snapshot onto the attributes stored on the local subscription.

use chrono::{DateTime, Utc};

use crate::application::ports::payment_processor::SubscriptionSnapshot;

const TRIALING: &str = "trialing";

/// Attributes a sync writes onto the local subscription.
#[derive(Debug, Clone, PartialEq)]
pub struct SubscriptionAttributes {
    pub processor_plan: String,
    pub quantity: i64,
    pub name: String,
    pub status: String,
    pub processor_account: Option<String>,
    pub application_fee_percent: Option<f64>,
    pub trial_ends_at: Option<DateTime<Utc>>,
    /// `None` leaves the stored value untouched.
    pub ends_at: Option<DateTime<Utc>>,
}

/// Convert a unix timestamp to `DateTime<Utc>`
pub fn epoch_to_datetime(secs: i64) -> Option<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp(secs, 0)
}

/// Derive local attributes from a snapshot.
///
/// `ends_at` resolution, later rules win:
/// 1. `cancel_at_period_end` schedules the end at the period end, or at the trial
///    end while the subscription is still trialing.
/// 2. `ended_at` is a terminal cancellation and overrides any scheduled end.
pub fn map_subscription_attributes(
    snapshot: &SubscriptionSnapshot,
    name: &str,
    processor_account: Option<&str>,
) -> SubscriptionAttributes {
    let trial_ends_at = snapshot.trial_end.and_then(epoch_to_datetime);

    let mut ends_at = None;

    if snapshot.cancel_at_period_end {
        ends_at = match trial_ends_at {
            Some(trial_end) if snapshot.status == TRIALING => Some(trial_end),
            _ => epoch_to_datetime(snapshot.current_period_end),
        };
    }

    if let Some(ended_at) = snapshot.ended_at {
        ends_at = epoch_to_datetime(ended_at);
    }

    SubscriptionAttributes {
        processor_plan: snapshot.plan_id.clone(),
        quantity: snapshot.quantity,
        name: name.to_string(),
        status: snapshot.status.clone(),
        processor_account: processor_account.map(str::to_string),
        application_fee_percent: snapshot.application_fee_percent,
        trial_ends_at,
        ends_at,
    }
}
