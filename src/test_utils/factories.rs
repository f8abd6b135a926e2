//! Test data factories for creating valid test fixtures.
//!
//! Each factory function creates a complete, valid object with sensible defaults.
//! Use the closure parameter to override specific fields as needed.

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::{
    application::ports::payment_processor::{
        CustomerId, RemoteItem, SubscriptionId, SubscriptionSnapshot,
    },
    domain::entities::{
        billable_owner::BillableOwnerProfile,
        payment_processor::PaymentProcessor,
        subscription::{SubscriptionProfile, SubscriptionStatus},
        subscription_item::SubscriptionItemProfile,
    },
};

/// Create a billable owner linked to processor customer `cus_123`.
pub fn create_test_billable_owner(
    overrides: impl FnOnce(&mut BillableOwnerProfile),
) -> BillableOwnerProfile {
    let mut owner = BillableOwnerProfile {
        id: Uuid::new_v4(),
        owner_type: "User".to_string(),
        owner_id: Uuid::new_v4(),
        processor: PaymentProcessor::Stripe,
        processor_id: "cus_123".to_string(),
        processor_account: None,
        created_at: Some(test_datetime()),
    };
    overrides(&mut owner);
    owner
}

/// Create an active local subscription `sub_123` with no trial and no scheduled end.
pub fn create_test_subscription(
    overrides: impl FnOnce(&mut SubscriptionProfile),
) -> SubscriptionProfile {
    let mut sub = SubscriptionProfile {
        id: Uuid::new_v4(),
        owner_id: Uuid::new_v4(),
        processor: PaymentProcessor::Stripe,
        processor_id: "sub_123".to_string(),
        name: "default".to_string(),
        processor_plan: "price_basic".to_string(),
        quantity: 1,
        status: SubscriptionStatus::Active,
        trial_ends_at: None,
        ends_at: None,
        application_fee_percent: None,
        processor_account: None,
        prorate: true,
        created_at: Some(test_datetime()),
        updated_at: Some(test_datetime()),
    };
    overrides(&mut sub);
    sub
}

pub fn create_test_subscription_item(
    subscription_id: Uuid,
    overrides: impl FnOnce(&mut SubscriptionItemProfile),
) -> SubscriptionItemProfile {
    let mut item = SubscriptionItemProfile {
        id: Uuid::new_v4(),
        subscription_id,
        processor_id: "si_1".to_string(),
        processor_price: "price_basic".to_string(),
        quantity: 1,
        created_at: Some(test_datetime()),
    };
    overrides(&mut item);
    item
}

/// Create an active remote subscription `sub_123` for customer `cus_123`, one item,
/// renewing in 30 days.
pub fn create_test_snapshot(
    overrides: impl FnOnce(&mut SubscriptionSnapshot),
) -> SubscriptionSnapshot {
    let mut snapshot = SubscriptionSnapshot {
        id: SubscriptionId::new("sub_123"),
        customer_id: CustomerId::new("cus_123"),
        plan_id: "price_basic".to_string(),
        quantity: 1,
        status: "active".to_string(),
        trial_end: None,
        cancel_at_period_end: false,
        current_period_end: (Utc::now() + Duration::days(30)).timestamp(),
        ended_at: None,
        application_fee_percent: None,
        items: vec![remote_item("si_1", "price_basic", 1)],
    };
    overrides(&mut snapshot);
    snapshot
}

pub fn remote_item(id: &str, price_id: &str, quantity: i64) -> RemoteItem {
    RemoteItem {
        id: id.to_string(),
        price_id: price_id.to_string(),
        quantity,
    }
}

/// Fixed timestamp for fields whose value does not matter.
pub fn test_datetime() -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(1_735_689_600, 0).unwrap_or_default()
}
