//! Full-replace reconciliation of subscription line items.
//!
//! Remote item ids carry no stable local correlation, so the collection is treated
//! as a value: every sync inserts the remote list and removes every existing row.

use uuid::Uuid;

use crate::{
    app_error::{AppError, AppResult},
    application::ports::payment_processor::RemoteItem,
    domain::entities::subscription_item::{NewSubscriptionItem, SubscriptionItemProfile},
};

/// Rows to insert and rows to delete, applied together in one transaction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemReplacementPlan {
    pub inserts: Vec<NewSubscriptionItem>,
    pub removals: Vec<Uuid>,
}

pub fn reconcile_items(
    existing: &[SubscriptionItemProfile],
    remote: &[RemoteItem],
) -> AppResult<ItemReplacementPlan> {
    let inserts = remote
        .iter()
        .map(|item| {
            Ok(NewSubscriptionItem {
                processor_id: item.id.clone(),
                processor_price: item.price_id.clone(),
                quantity: item_quantity(item)?,
            })
        })
        .collect::<AppResult<Vec<_>>>()?;

    // Existing rows are never matched against remote ids, even when they coincide.
    let removals = existing.iter().map(|item| item.id).collect();

    Ok(ItemReplacementPlan { inserts, removals })
}

fn item_quantity(item: &RemoteItem) -> AppResult<i32> {
    i32::try_from(item.quantity)
        .ok()
        .filter(|quantity| *quantity >= 0)
        .ok_or_else(|| {
            AppError::Validation(format!(
                "Item {} has invalid quantity {}",
                item.id, item.quantity
            ))
        })
}
