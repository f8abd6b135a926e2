pub mod item_reconciler;
pub mod subscription_attributes;
