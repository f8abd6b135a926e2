use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::payment_processor::PaymentProcessor;

/// Local customer record linking an owner (user, team, ...) to a processor customer.
#[derive(Debug, Clone, Serialize)]
pub struct BillableOwnerProfile {
    pub id: Uuid,
    pub owner_type: String,
    pub owner_id: Uuid,
    pub processor: PaymentProcessor,
    pub processor_id: String,
    /// Connected account the customer lives under, if any
    pub processor_account: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}
