use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Line item owned by exactly one subscription.
///
/// Identity that matters is `processor_id`; `id` is a local surrogate that changes
/// every time the item collection is replaced.
#[derive(Debug, Clone, Serialize)]
pub struct SubscriptionItemProfile {
    pub id: Uuid,
    pub subscription_id: Uuid,
    pub processor_id: String,
    pub processor_price: String,
    pub quantity: i32,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSubscriptionItem {
    pub processor_id: String,
    pub processor_price: String,
    pub quantity: i32,
}
