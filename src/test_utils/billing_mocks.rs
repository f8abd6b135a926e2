//! In-memory mock implementations for billing-related repository traits and the
//! processor client.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use uuid::Uuid;

use crate::{
    app_error::{AppError, AppResult},
    application::{
        helpers::item_reconciler::ItemReplacementPlan,
        ports::payment_processor::{
            ProcessorClient, SubscriptionId, SubscriptionSnapshot, SubscriptionUpdateParams,
            TransportError,
        },
        use_cases::subscription_sync::{
            LifecycleUpdate, OwnerRepo, SaveSubscriptionInput, SubscriptionRepo,
        },
    },
    domain::entities::{
        billable_owner::BillableOwnerProfile, payment_processor::PaymentProcessor,
        subscription::SubscriptionProfile, subscription_item::SubscriptionItemProfile,
    },
};

// ============================================================================
// InMemoryOwnerRepo
// ============================================================================

#[derive(Default)]
pub struct InMemoryOwnerRepo {
    pub owners: Mutex<Vec<BillableOwnerProfile>>,
}

impl InMemoryOwnerRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_owners(owners: Vec<BillableOwnerProfile>) -> Self {
        Self {
            owners: Mutex::new(owners),
        }
    }
}

#[async_trait]
impl OwnerRepo for InMemoryOwnerRepo {
    async fn find_billable(
        &self,
        processor: PaymentProcessor,
        processor_customer_id: &str,
    ) -> AppResult<Option<BillableOwnerProfile>> {
        Ok(self
            .owners
            .lock()
            .unwrap()
            .iter()
            .find(|o| o.processor == processor && o.processor_id == processor_customer_id)
            .cloned())
    }
}

// ============================================================================
// InMemorySubscriptionRepo
// ============================================================================

/// Mirrors the Postgres adapter: upsert on `(processor, processor_id)`, `ends_at`
/// merged rather than cleared, item replacement swapping the whole stored set
/// all-or-nothing.
#[derive(Default)]
pub struct InMemorySubscriptionRepo {
    pub subscriptions: Mutex<HashMap<Uuid, SubscriptionProfile>>,
    pub items: Mutex<HashMap<Uuid, SubscriptionItemProfile>>,
}

impl InMemorySubscriptionRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_subscription(&self, sub: SubscriptionProfile) -> SubscriptionProfile {
        self.subscriptions
            .lock()
            .unwrap()
            .insert(sub.id, sub.clone());
        sub
    }

    pub fn insert_item(&self, item: SubscriptionItemProfile) -> SubscriptionItemProfile {
        self.items.lock().unwrap().insert(item.id, item.clone());
        item
    }

    pub fn subscription_count(&self) -> usize {
        self.subscriptions.lock().unwrap().len()
    }

    pub fn item_count(&self) -> usize {
        self.items.lock().unwrap().len()
    }

    pub fn items_for(&self, subscription_id: Uuid) -> Vec<SubscriptionItemProfile> {
        let mut items: Vec<_> = self
            .items
            .lock()
            .unwrap()
            .values()
            .filter(|i| i.subscription_id == subscription_id)
            .cloned()
            .collect();
        items.sort_by(|a, b| a.processor_id.cmp(&b.processor_id));
        items
    }
}

#[async_trait]
impl SubscriptionRepo for InMemorySubscriptionRepo {
    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<SubscriptionProfile>> {
        Ok(self.subscriptions.lock().unwrap().get(&id).cloned())
    }

    async fn find_by_processor_id(
        &self,
        processor: PaymentProcessor,
        processor_id: &str,
    ) -> AppResult<Option<SubscriptionProfile>> {
        Ok(self
            .subscriptions
            .lock()
            .unwrap()
            .values()
            .find(|s| s.processor == processor && s.processor_id == processor_id)
            .cloned())
    }

    async fn save(&self, input: &SaveSubscriptionInput) -> AppResult<SubscriptionProfile> {
        let mut subs = self.subscriptions.lock().unwrap();
        let now = Utc::now();

        let existing = subs
            .values_mut()
            .find(|s| s.processor == input.processor && s.processor_id == input.processor_id);

        if let Some(sub) = existing {
            sub.owner_id = input.owner_id;
            sub.name = input.name.clone();
            sub.processor_plan = input.processor_plan.clone();
            sub.quantity = input.quantity;
            sub.status = input.status;
            sub.trial_ends_at = input.trial_ends_at;
            sub.ends_at = input.ends_at.or(sub.ends_at);
            sub.application_fee_percent = input.application_fee_percent;
            sub.processor_account = input.processor_account.clone();
            sub.updated_at = Some(now);
            return Ok(sub.clone());
        }

        let sub = SubscriptionProfile {
            id: Uuid::new_v4(),
            owner_id: input.owner_id,
            processor: input.processor,
            processor_id: input.processor_id.clone(),
            name: input.name.clone(),
            processor_plan: input.processor_plan.clone(),
            quantity: input.quantity,
            status: input.status,
            trial_ends_at: input.trial_ends_at,
            ends_at: input.ends_at,
            application_fee_percent: input.application_fee_percent,
            processor_account: input.processor_account.clone(),
            prorate: true,
            created_at: Some(now),
            updated_at: Some(now),
        };
        subs.insert(sub.id, sub.clone());
        Ok(sub)
    }

    async fn list_items(&self, subscription_id: Uuid) -> AppResult<Vec<SubscriptionItemProfile>> {
        Ok(self.items_for(subscription_id))
    }

    async fn replace_items(
        &self,
        subscription_id: Uuid,
        plan: &ItemReplacementPlan,
    ) -> AppResult<Vec<SubscriptionItemProfile>> {
        if !self
            .subscriptions
            .lock()
            .unwrap()
            .contains_key(&subscription_id)
        {
            return Err(AppError::InvalidInput("Referenced record not found".into()));
        }

        let mut items = self.items.lock().unwrap();

        // Check the unique (subscription_id, processor_id) key before touching anything
        let mut taken: HashSet<&str> = HashSet::new();
        for insert in &plan.inserts {
            if !taken.insert(insert.processor_id.as_str()) {
                return Err(AppError::InvalidInput(format!(
                    "Duplicate subscription item {}",
                    insert.processor_id
                )));
            }
        }

        // Every stored row goes, not only the planned removals
        items.retain(|_, item| item.subscription_id != subscription_id);

        let now = Utc::now();
        for insert in &plan.inserts {
            let item = SubscriptionItemProfile {
                id: Uuid::new_v4(),
                subscription_id,
                processor_id: insert.processor_id.clone(),
                processor_price: insert.processor_price.clone(),
                quantity: insert.quantity,
                created_at: Some(now),
            };
            items.insert(item.id, item);
        }

        let mut result: Vec<_> = items
            .values()
            .filter(|i| i.subscription_id == subscription_id)
            .cloned()
            .collect();
        result.sort_by(|a, b| a.processor_id.cmp(&b.processor_id));
        Ok(result)
    }

    async fn update_lifecycle(
        &self,
        id: Uuid,
        update: &LifecycleUpdate,
    ) -> AppResult<SubscriptionProfile> {
        let mut subs = self.subscriptions.lock().unwrap();
        let sub = subs.get_mut(&id).ok_or(AppError::NotFound)?;
        if let Some(status) = update.status {
            sub.status = status;
        }
        sub.ends_at = update.ends_at;
        sub.updated_at = Some(Utc::now());
        Ok(sub.clone())
    }
}

// ============================================================================
// MockProcessorClient
// ============================================================================

/// A call received by [`MockProcessorClient`].
#[derive(Debug, Clone, PartialEq)]
pub enum ProcessorCall {
    Retrieve {
        id: String,
        account: Option<String>,
    },
    Update {
        id: String,
        params: SubscriptionUpdateParams,
        account: Option<String>,
    },
    Delete {
        id: String,
        account: Option<String>,
    },
}

/// Scripted processor: returns the configured snapshot (with updates applied) or
/// the configured error, and records every call.
#[derive(Default)]
pub struct MockProcessorClient {
    snapshot: Mutex<Option<SubscriptionSnapshot>>,
    error: Mutex<Option<TransportError>>,
    calls: Mutex<Vec<ProcessorCall>>,
}

impl MockProcessorClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_snapshot(self, snapshot: SubscriptionSnapshot) -> Self {
        *self.snapshot.lock().unwrap() = Some(snapshot);
        self
    }

    pub fn with_error(self, error: TransportError) -> Self {
        *self.error.lock().unwrap() = Some(error);
        self
    }

    pub fn calls(&self) -> Vec<ProcessorCall> {
        self.calls.lock().unwrap().clone()
    }

    fn respond(
        &self,
        call: ProcessorCall,
        apply: impl FnOnce(&mut SubscriptionSnapshot),
    ) -> Result<SubscriptionSnapshot, TransportError> {
        self.calls.lock().unwrap().push(call);

        if let Some(error) = self.error.lock().unwrap().clone() {
            return Err(error);
        }

        let mut guard = self.snapshot.lock().unwrap();
        let snapshot = guard.as_mut().ok_or_else(|| TransportError::Api {
            status: 404,
            message: "No such subscription".to_string(),
            code: Some("resource_missing".to_string()),
        })?;
        apply(snapshot);
        Ok(snapshot.clone())
    }
}

#[async_trait]
impl ProcessorClient for MockProcessorClient {
    fn processor(&self) -> PaymentProcessor {
        PaymentProcessor::Stripe
    }

    async fn retrieve_subscription(
        &self,
        id: &SubscriptionId,
        account: Option<&str>,
    ) -> Result<SubscriptionSnapshot, TransportError> {
        self.respond(
            ProcessorCall::Retrieve {
                id: id.to_string(),
                account: account.map(str::to_string),
            },
            |_| {},
        )
    }

    async fn update_subscription(
        &self,
        id: &SubscriptionId,
        params: &SubscriptionUpdateParams,
        account: Option<&str>,
    ) -> Result<SubscriptionSnapshot, TransportError> {
        self.respond(
            ProcessorCall::Update {
                id: id.to_string(),
                params: params.clone(),
                account: account.map(str::to_string),
            },
            |snapshot| {
                if let Some(cancel) = params.cancel_at_period_end {
                    snapshot.cancel_at_period_end = cancel;
                }
                if let Some(plan) = &params.plan {
                    snapshot.plan_id = plan.clone();
                }
                if let Some(quantity) = params.quantity {
                    snapshot.quantity = quantity;
                }
            },
        )
    }

    async fn delete_subscription(
        &self,
        id: &SubscriptionId,
        account: Option<&str>,
    ) -> Result<SubscriptionSnapshot, TransportError> {
        self.respond(
            ProcessorCall::Delete {
                id: id.to_string(),
                account: account.map(str::to_string),
            },
            |snapshot| {
                snapshot.status = "canceled".to_string();
                snapshot.cancel_at_period_end = false;
                snapshot.ended_at = Some(Utc::now().timestamp());
            },
        )
    }
}
