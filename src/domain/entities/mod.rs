pub mod billable_owner;
pub mod payment_processor;
pub mod subscription;
pub mod subscription_item;
