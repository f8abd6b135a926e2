use std::sync::Arc;

use crate::{
    app_error::{AppError, AppResult},
    application::ports::payment_processor::ProcessorClient,
    domain::entities::payment_processor::PaymentProcessor,
};

use super::{
    subscription_commands::{StripeSubscriptionCommands, SubscriptionCommands},
    subscription_sync::SubscriptionRepo,
};

/// Selects the command variant for a subscription's processor.
///
/// Only Stripe resolves; the rest return [`AppError::ProcessorNotSupported`].
#[derive(Clone)]
pub struct ProcessorFactory {
    stripe_client: Arc<dyn ProcessorClient>,
    subscription_repo: Arc<dyn SubscriptionRepo>,
}

impl ProcessorFactory {
    pub fn new(
        stripe_client: Arc<dyn ProcessorClient>,
        subscription_repo: Arc<dyn SubscriptionRepo>,
    ) -> Self {
        Self {
            stripe_client,
            subscription_repo,
        }
    }

    pub fn commands(&self, processor: PaymentProcessor) -> AppResult<Arc<dyn SubscriptionCommands>> {
        match processor {
            PaymentProcessor::Stripe => Ok(Arc::new(StripeSubscriptionCommands::new(
                self.stripe_client.clone(),
                self.subscription_repo.clone(),
            ))),
            PaymentProcessor::Braintree | PaymentProcessor::Paddle => {
                tracing::debug!(processor = %processor, "No command support for processor");
                Err(AppError::ProcessorNotSupported)
            }
        }
    }
}
