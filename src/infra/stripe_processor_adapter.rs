use async_trait::async_trait;
use secrecy::SecretString;

use crate::{
    application::ports::payment_processor::{
        CustomerId, ProcessorClient, RemoteItem, SubscriptionId, SubscriptionSnapshot,
        SubscriptionUpdateParams, TransportError, TrialEnd,
    },
    domain::entities::payment_processor::PaymentProcessor,
    infra::stripe_client::{StripeClient, StripeSubscription},
};

/// Adapter that wraps StripeClient to implement ProcessorClient.
#[derive(Clone)]
pub struct StripeProcessorAdapter {
    client: StripeClient,
}

impl StripeProcessorAdapter {
    pub fn new(secret_key: SecretString, api_base: impl Into<String>) -> Self {
        Self {
            client: StripeClient::new(secret_key, api_base),
        }
    }

    /// Page in the items an embedded list left out.
    async fn with_all_items(
        &self,
        mut sub: StripeSubscription,
        account: Option<&str>,
    ) -> Result<StripeSubscription, TransportError> {
        while sub.items.has_more {
            let last = sub.items.data.last().map(|item| item.id.clone());
            let page = self
                .client
                .list_subscription_items(&sub.id, last.as_deref(), account)
                .await?;
            if page.data.is_empty() {
                return Err(TransportError::Decode(format!(
                    "subscription {} item pages ended early",
                    sub.id
                )));
            }
            tracing::debug!(subscription_id = %sub.id, page_len = page.data.len(), "Fetched subscription item page");
            sub.items.data.extend(page.data);
            sub.items.has_more = page.has_more;
        }
        Ok(sub)
    }
}

/// Form fields for `POST /subscriptions/{id}`
pub fn update_form_params(params: &SubscriptionUpdateParams) -> Vec<(&'static str, String)> {
    let mut form = Vec::new();

    if let Some(cancel) = params.cancel_at_period_end {
        form.push(("cancel_at_period_end", cancel.to_string()));
    }
    if let Some(plan) = &params.plan {
        form.push(("plan", plan.clone()));
    }
    if let Some(quantity) = params.quantity {
        form.push(("quantity", quantity.to_string()));
    }
    if let Some(behavior) = params.proration_behavior {
        form.push(("proration_behavior", behavior.as_str().to_string()));
    }
    match params.trial_end {
        Some(TrialEnd::Now) => form.push(("trial_end", "now".to_string())),
        Some(TrialEnd::At(ts)) => form.push(("trial_end", ts.to_string())),
        None => {}
    }

    form
}

impl TryFrom<StripeSubscription> for SubscriptionSnapshot {
    type Error = TransportError;

    fn try_from(sub: StripeSubscription) -> Result<Self, Self::Error> {
        // A partial list would make full replacement drop the missing rows
        if sub.items.has_more {
            return Err(TransportError::Decode(format!(
                "subscription {} has a truncated item list",
                sub.id
            )));
        }

        let first_item = sub.items.data.first();

        // Multi-item subscriptions have no top-level plan or quantity
        let plan_id = sub
            .plan
            .map(|plan| plan.id)
            .or_else(|| first_item.map(|item| item.price.id.clone()))
            .ok_or_else(|| TransportError::Decode(format!("subscription {} has no plan", sub.id)))?;
        let quantity = sub
            .quantity
            .or_else(|| first_item.and_then(|item| item.quantity))
            .unwrap_or(1);

        // Newer API versions report the period on items only
        let current_period_end = sub
            .current_period_end
            .or_else(|| {
                sub.items
                    .data
                    .iter()
                    .filter_map(|item| item.current_period_end)
                    .max()
            })
            .ok_or_else(|| {
                TransportError::Decode(format!("subscription {} has no current period end", sub.id))
            })?;

        let items = sub
            .items
            .data
            .into_iter()
            .map(|item| RemoteItem {
                id: item.id,
                price_id: item.price.id,
                quantity: item.quantity.unwrap_or(0),
            })
            .collect();

        Ok(SubscriptionSnapshot {
            id: SubscriptionId::new(sub.id),
            customer_id: CustomerId::new(sub.customer.id()),
            plan_id,
            quantity,
            status: sub.status,
            trial_end: sub.trial_end,
            cancel_at_period_end: sub.cancel_at_period_end,
            current_period_end,
            ended_at: sub.ended_at,
            application_fee_percent: sub.application_fee_percent,
            items,
        })
    }
}

#[async_trait]
impl ProcessorClient for StripeProcessorAdapter {
    fn processor(&self) -> PaymentProcessor {
        PaymentProcessor::Stripe
    }

    async fn retrieve_subscription(
        &self,
        id: &SubscriptionId,
        account: Option<&str>,
    ) -> Result<SubscriptionSnapshot, TransportError> {
        let sub = self.client.get_subscription(id.as_str(), account).await?;
        self.with_all_items(sub, account).await?.try_into()
    }

    async fn update_subscription(
        &self,
        id: &SubscriptionId,
        params: &SubscriptionUpdateParams,
        account: Option<&str>,
    ) -> Result<SubscriptionSnapshot, TransportError> {
        let form = update_form_params(params);
        let sub = self
            .client
            .update_subscription(id.as_str(), &form, account)
            .await?;
        self.with_all_items(sub, account).await?.try_into()
    }

    async fn delete_subscription(
        &self,
        id: &SubscriptionId,
        account: Option<&str>,
    ) -> Result<SubscriptionSnapshot, TransportError> {
        let sub = self.client.delete_subscription(id.as_str(), account).await?;
        self.with_all_items(sub, account).await?.try_into()
    }
}
