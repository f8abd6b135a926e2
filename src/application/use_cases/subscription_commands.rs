use async_trait::async_trait;
use chrono::Utc;
use std::{str::FromStr, sync::Arc};

use crate::{
    app_error::{AppError, AppResult},
    application::{
        helpers::subscription_attributes::epoch_to_datetime,
        ports::payment_processor::{
            ProcessorClient, ProrationBehavior, SubscriptionId, SubscriptionUpdateParams,
            TransportError, TrialEnd,
        },
    },
    domain::entities::{
        payment_processor::PaymentProcessor,
        subscription::{SubscriptionProfile, SubscriptionStatus},
    },
};

use super::subscription_sync::{LifecycleUpdate, SubscriptionRepo};

/// Lifecycle commands whose semantics differ per processor.
///
/// `change_quantity` and `swap` only talk to the processor; the local record catches
/// up on the next sync.
#[async_trait]
pub trait SubscriptionCommands: Send + Sync {
    fn processor(&self) -> PaymentProcessor;

    /// Cancel at the end of the current period, or of the trial when on one.
    async fn cancel(&self, sub: &SubscriptionProfile) -> AppResult<SubscriptionProfile>;

    async fn cancel_now(&self, sub: &SubscriptionProfile) -> AppResult<SubscriptionProfile>;

    async fn change_quantity(&self, sub: &SubscriptionProfile, quantity: i64) -> AppResult<()>;

    /// Undo a scheduled cancellation. Only valid during the grace period.
    async fn resume(&self, sub: &SubscriptionProfile) -> AppResult<SubscriptionProfile>;

    async fn swap(&self, sub: &SubscriptionProfile, plan: &str) -> AppResult<()>;

    async fn pause(&self, sub: &SubscriptionProfile) -> AppResult<()>;

    fn is_paused(&self, _sub: &SubscriptionProfile) -> bool {
        false
    }
}

pub struct StripeSubscriptionCommands {
    client: Arc<dyn ProcessorClient>,
    subscription_repo: Arc<dyn SubscriptionRepo>,
}

impl StripeSubscriptionCommands {
    pub fn new(client: Arc<dyn ProcessorClient>, subscription_repo: Arc<dyn SubscriptionRepo>) -> Self {
        Self {
            client,
            subscription_repo,
        }
    }

    fn remote_id(sub: &SubscriptionProfile) -> SubscriptionId {
        SubscriptionId::new(sub.processor_id.clone())
    }

    fn processor_error(&self, command: &str, sub: &SubscriptionProfile, err: TransportError) -> AppError {
        tracing::warn!(
            subscription_id = %sub.id,
            processor_id = %sub.processor_id,
            command,
            error = %err,
            "Processor rejected subscription command"
        );
        AppError::processor(self.processor(), err)
    }
}

#[async_trait]
impl SubscriptionCommands for StripeSubscriptionCommands {
    fn processor(&self) -> PaymentProcessor {
        PaymentProcessor::Stripe
    }

    async fn cancel(&self, sub: &SubscriptionProfile) -> AppResult<SubscriptionProfile> {
        let params = SubscriptionUpdateParams::new().cancel_at_period_end(true);
        let remote = self
            .client
            .update_subscription(&Self::remote_id(sub), &params, sub.processor_account.as_deref())
            .await
            .map_err(|e| self.processor_error("cancel", sub, e))?;

        let ends_at = if sub.on_trial() {
            sub.trial_ends_at
        } else {
            epoch_to_datetime(remote.current_period_end)
        };

        let updated = self
            .subscription_repo
            .update_lifecycle(
                sub.id,
                &LifecycleUpdate {
                    status: None,
                    ends_at,
                },
            )
            .await?;

        tracing::info!(subscription_id = %sub.id, ends_at = ?updated.ends_at, "Subscription cancellation scheduled");
        Ok(updated)
    }

    async fn cancel_now(&self, sub: &SubscriptionProfile) -> AppResult<SubscriptionProfile> {
        self.client
            .delete_subscription(&Self::remote_id(sub), sub.processor_account.as_deref())
            .await
            .map_err(|e| self.processor_error("cancel_now", sub, e))?;

        let updated = self
            .subscription_repo
            .update_lifecycle(
                sub.id,
                &LifecycleUpdate {
                    status: Some(SubscriptionStatus::Canceled),
                    ends_at: Some(Utc::now()),
                },
            )
            .await?;

        tracing::info!(subscription_id = %sub.id, "Subscription canceled immediately");
        Ok(updated)
    }

    async fn change_quantity(&self, sub: &SubscriptionProfile, quantity: i64) -> AppResult<()> {
        if quantity < 0 {
            return Err(AppError::InvalidInput(format!(
                "Quantity must not be negative, got {quantity}"
            )));
        }

        let params = SubscriptionUpdateParams::new().quantity(quantity);
        self.client
            .update_subscription(&Self::remote_id(sub), &params, sub.processor_account.as_deref())
            .await
            .map_err(|e| self.processor_error("change_quantity", sub, e))?;

        tracing::info!(subscription_id = %sub.id, quantity, "Subscription quantity change sent");
        Ok(())
    }

    async fn resume(&self, sub: &SubscriptionProfile) -> AppResult<SubscriptionProfile> {
        if !sub.on_grace_period() {
            return Err(AppError::Precondition(
                "You can only resume subscriptions within their grace period.".to_string(),
            ));
        }

        let trial_end = match sub.trial_ends_at {
            Some(trial_ends_at) if sub.on_trial() => TrialEnd::At(trial_ends_at.timestamp()),
            _ => TrialEnd::Now,
        };
        let params = SubscriptionUpdateParams::new()
            .cancel_at_period_end(false)
            .plan(sub.processor_plan.clone())
            .trial_end(trial_end);

        let remote = self
            .client
            .update_subscription(&Self::remote_id(sub), &params, sub.processor_account.as_deref())
            .await
            .map_err(|e| self.processor_error("resume", sub, e))?;

        // Syncs never clear ends_at, so the scheduled end is dropped here.
        let status = SubscriptionStatus::from_str(&remote.status).unwrap_or(SubscriptionStatus::Active);
        let updated = self
            .subscription_repo
            .update_lifecycle(
                sub.id,
                &LifecycleUpdate {
                    status: Some(status),
                    ends_at: None,
                },
            )
            .await?;

        tracing::info!(subscription_id = %sub.id, status = %updated.status, "Subscription resumed");
        Ok(updated)
    }

    async fn swap(&self, sub: &SubscriptionProfile, plan: &str) -> AppResult<()> {
        if plan.trim().is_empty() {
            return Err(AppError::InvalidInput("Plan is required".to_string()));
        }

        let trial_end = match sub.trial_ends_at {
            Some(trial_ends_at) if sub.on_trial() => TrialEnd::At(trial_ends_at.timestamp()),
            _ => TrialEnd::Now,
        };
        let params = SubscriptionUpdateParams::new()
            .plan(plan)
            .quantity(i64::from(sub.quantity))
            .proration_behavior(ProrationBehavior::from_prorate(sub.prorate))
            .trial_end(trial_end)
            .cancel_at_period_end(false);

        self.client
            .update_subscription(&Self::remote_id(sub), &params, sub.processor_account.as_deref())
            .await
            .map_err(|e| self.processor_error("swap", sub, e))?;

        tracing::info!(subscription_id = %sub.id, plan, "Subscription plan swap sent");
        Ok(())
    }

    async fn pause(&self, _sub: &SubscriptionProfile) -> AppResult<()> {
        Err(AppError::NotImplemented(format!(
            "{} does not support pausing subscriptions",
            self.processor().display_name()
        )))
    }
}
