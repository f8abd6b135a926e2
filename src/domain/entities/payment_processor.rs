use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

/// Remote billing system a subscription is reconciled against.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, AsRefStr, Display,
    EnumString,
)]
#[sqlx(type_name = "payment_processor", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
#[derive(Default)]
pub enum PaymentProcessor {
    #[default]
    Stripe,
    Braintree,
    Paddle,
}

impl PaymentProcessor {
    /// Human-readable display name for the processor
    pub fn display_name(&self) -> &'static str {
        match self {
            PaymentProcessor::Stripe => "Stripe",
            PaymentProcessor::Braintree => "Braintree",
            PaymentProcessor::Paddle => "Paddle",
        }
    }
}
