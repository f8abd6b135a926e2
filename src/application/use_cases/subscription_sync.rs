use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::{str::FromStr, sync::Arc};
use uuid::Uuid;

use crate::{
    app_error::{AppError, AppResult},
    application::{
        helpers::{
            item_reconciler::{ItemReplacementPlan, reconcile_items},
            subscription_attributes::{SubscriptionAttributes, map_subscription_attributes},
        },
        ports::payment_processor::{
            CustomerId, ProcessorClient, SubscriptionId, SubscriptionSnapshot,
        },
    },
    domain::entities::{
        billable_owner::BillableOwnerProfile,
        payment_processor::PaymentProcessor,
        subscription::{SubscriptionProfile, SubscriptionStatus},
        subscription_item::SubscriptionItemProfile,
    },
};

// ============================================================================
// Input Types
// ============================================================================

/// Values written by a sync. Keyed by `(processor, processor_id)`.
#[derive(Debug, Clone, PartialEq)]
pub struct SaveSubscriptionInput {
    pub owner_id: Uuid,
    pub processor: PaymentProcessor,
    pub processor_id: String,
    pub name: String,
    pub processor_plan: String,
    pub quantity: i32,
    pub status: SubscriptionStatus,
    pub trial_ends_at: Option<DateTime<Utc>>,
    /// `None` keeps whatever is stored.
    pub ends_at: Option<DateTime<Utc>>,
    pub application_fee_percent: Option<f64>,
    pub processor_account: Option<String>,
}

impl SaveSubscriptionInput {
    /// Validate mapped attributes against what the store accepts.
    pub fn from_attributes(
        owner_id: Uuid,
        processor: PaymentProcessor,
        processor_id: &str,
        attrs: SubscriptionAttributes,
    ) -> AppResult<Self> {
        let status = SubscriptionStatus::from_str(&attrs.status).map_err(|_| {
            AppError::Validation(format!("Unknown subscription status '{}'", attrs.status))
        })?;

        let quantity = i32::try_from(attrs.quantity)
            .ok()
            .filter(|quantity| *quantity >= 0)
            .ok_or_else(|| {
                AppError::Validation(format!("Invalid quantity {}", attrs.quantity))
            })?;

        if attrs.processor_plan.is_empty() {
            return Err(AppError::Validation(format!(
                "Subscription {processor_id} has no plan"
            )));
        }

        Ok(Self {
            owner_id,
            processor,
            processor_id: processor_id.to_string(),
            name: attrs.name,
            processor_plan: attrs.processor_plan,
            quantity,
            status,
            trial_ends_at: attrs.trial_ends_at,
            ends_at: attrs.ends_at,
            application_fee_percent: attrs.application_fee_percent,
            processor_account: attrs.processor_account,
        })
    }
}

/// Local effect of a lifecycle command.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LifecycleUpdate {
    /// `None` keeps the stored status
    pub status: Option<SubscriptionStatus>,
    /// Always written; `None` clears a scheduled end
    pub ends_at: Option<DateTime<Utc>>,
}

// ============================================================================
// Repository Traits
// ============================================================================

#[async_trait]
pub trait OwnerRepo: Send + Sync {
    /// Owner whose processor customer id matches, if any.
    async fn find_billable(
        &self,
        processor: PaymentProcessor,
        processor_customer_id: &str,
    ) -> AppResult<Option<BillableOwnerProfile>>;
}

#[async_trait]
pub trait SubscriptionRepo: Send + Sync {
    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<SubscriptionProfile>>;
    async fn find_by_processor_id(
        &self,
        processor: PaymentProcessor,
        processor_id: &str,
    ) -> AppResult<Option<SubscriptionProfile>>;
    /// Insert or update by `(processor, processor_id)`.
    async fn save(&self, input: &SaveSubscriptionInput) -> AppResult<SubscriptionProfile>;
    async fn list_items(&self, subscription_id: Uuid) -> AppResult<Vec<SubscriptionItemProfile>>;
    /// Atomically swap the stored item set for `plan.inserts` and return it.
    ///
    /// Every stored item is dropped, not only `plan.removals`, so a concurrent
    /// sync's rows never survive alongside this one's.
    async fn replace_items(
        &self,
        subscription_id: Uuid,
        plan: &ItemReplacementPlan,
    ) -> AppResult<Vec<SubscriptionItemProfile>>;
    async fn update_lifecycle(
        &self,
        id: Uuid,
        update: &LifecycleUpdate,
    ) -> AppResult<SubscriptionProfile>;
}

// ============================================================================
// Use Cases
// ============================================================================

#[derive(Debug, Clone)]
pub struct SyncRequest {
    pub subscription_id: SubscriptionId,
    /// Already-fetched processor state (e.g. a webhook payload). Fetched when absent.
    pub snapshot: Option<SubscriptionSnapshot>,
    pub name: Option<String>,
    /// Connected account to fetch under and to store on the subscription.
    pub account: Option<String>,
}

impl SyncRequest {
    pub fn fetch(subscription_id: SubscriptionId) -> Self {
        Self {
            subscription_id,
            snapshot: None,
            name: None,
            account: None,
        }
    }

    pub fn from_snapshot(snapshot: SubscriptionSnapshot) -> Self {
        Self {
            subscription_id: snapshot.id.clone(),
            snapshot: Some(snapshot),
            name: None,
            account: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_account(mut self, account: impl Into<String>) -> Self {
        self.account = Some(account.into());
        self
    }
}

#[derive(Debug, Clone)]
pub enum SyncOutcome {
    Reconciled {
        subscription: SubscriptionProfile,
        items: Vec<SubscriptionItemProfile>,
    },
    /// The processor customer belongs to no local owner; nothing was written.
    Skipped { customer_id: CustomerId },
}

impl SyncOutcome {
    pub fn subscription(&self) -> Option<&SubscriptionProfile> {
        match self {
            SyncOutcome::Reconciled { subscription, .. } => Some(subscription),
            SyncOutcome::Skipped { .. } => None,
        }
    }
}

#[derive(Clone)]
pub struct SubscriptionSyncUseCases {
    client: Arc<dyn ProcessorClient>,
    owner_repo: Arc<dyn OwnerRepo>,
    subscription_repo: Arc<dyn SubscriptionRepo>,
    default_name: String,
}

impl SubscriptionSyncUseCases {
    pub fn new(
        client: Arc<dyn ProcessorClient>,
        owner_repo: Arc<dyn OwnerRepo>,
        subscription_repo: Arc<dyn SubscriptionRepo>,
        default_name: impl Into<String>,
    ) -> Self {
        Self {
            client,
            owner_repo,
            subscription_repo,
            default_name: default_name.into(),
        }
    }

    pub fn processor(&self) -> PaymentProcessor {
        self.client.processor()
    }

    /// Bring the local subscription and its items in line with the processor.
    ///
    /// Fetch failures are returned as [`AppError::Transport`] so the caller can
    /// decide whether to retry. Validation failures abort before anything is written.
    pub async fn sync(&self, request: SyncRequest) -> AppResult<SyncOutcome> {
        let processor = self.client.processor();

        let snapshot = match request.snapshot {
            Some(snapshot) => snapshot,
            None => {
                tracing::debug!(
                    subscription_id = %request.subscription_id,
                    processor = %processor,
                    "Fetching subscription from processor"
                );
                self.client
                    .retrieve_subscription(&request.subscription_id, request.account.as_deref())
                    .await?
            }
        };

        let Some(owner) = self
            .owner_repo
            .find_billable(processor, snapshot.customer_id.as_str())
            .await?
        else {
            tracing::info!(
                subscription_id = %snapshot.id,
                customer_id = %snapshot.customer_id,
                processor = %processor,
                "No billable owner for customer, skipping sync"
            );
            return Ok(SyncOutcome::Skipped {
                customer_id: snapshot.customer_id,
            });
        };

        let existing = self
            .subscription_repo
            .find_by_processor_id(processor, snapshot.id.as_str())
            .await?;

        let name = request
            .name
            .or_else(|| existing.as_ref().map(|sub| sub.name.clone()))
            .unwrap_or_else(|| self.default_name.clone());
        let account = request.account.or_else(|| owner.processor_account.clone());

        let attrs = map_subscription_attributes(&snapshot, &name, account.as_deref());
        let input =
            SaveSubscriptionInput::from_attributes(owner.id, processor, snapshot.id.as_str(), attrs)?;

        let existing_items = match &existing {
            Some(sub) => self.subscription_repo.list_items(sub.id).await?,
            None => Vec::new(),
        };
        let plan = reconcile_items(&existing_items, &snapshot.items)?;

        let subscription = self.subscription_repo.save(&input).await?;

        tracing::debug!(
            subscription_id = %subscription.id,
            items_inserted = plan.inserts.len(),
            items_removed = plan.removals.len(),
            "Replacing subscription items"
        );
        let items = self
            .subscription_repo
            .replace_items(subscription.id, &plan)
            .await?;

        tracing::info!(
            subscription_id = %subscription.id,
            processor_id = %subscription.processor_id,
            customer_id = %snapshot.customer_id,
            processor = %processor,
            status = %subscription.status,
            "Subscription reconciled"
        );

        Ok(SyncOutcome::Reconciled {
            subscription,
            items,
        })
    }
}
