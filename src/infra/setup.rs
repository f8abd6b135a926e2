use std::sync::Arc;

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::{
    adapters::http::app_state::AppState,
    application::{
        ports::payment_processor::ProcessorClient,
        use_cases::{
            processor_factory::ProcessorFactory,
            subscription_sync::{OwnerRepo, SubscriptionRepo, SubscriptionSyncUseCases},
        },
    },
    infra::{
        config::AppConfig, postgres_persistence,
        stripe_processor_adapter::StripeProcessorAdapter,
    },
};

pub async fn init_app_state() -> anyhow::Result<AppState> {
    let config = AppConfig::from_env()?;

    let postgres_arc =
        Arc::new(postgres_persistence(&config.database_url, config.db_max_connections).await?);

    let owner_repo_arc = postgres_arc.clone() as Arc<dyn OwnerRepo>;
    let subscription_repo_arc = postgres_arc.clone() as Arc<dyn SubscriptionRepo>;

    let stripe_client: Arc<dyn ProcessorClient> = Arc::new(StripeProcessorAdapter::new(
        config.stripe_secret_key.clone(),
        config.stripe_api_base.to_string(),
    ));

    let sync_use_cases = SubscriptionSyncUseCases::new(
        stripe_client.clone(),
        owner_repo_arc,
        subscription_repo_arc.clone(),
        config.default_subscription_name.clone(),
    );

    let processor_factory = ProcessorFactory::new(stripe_client, subscription_repo_arc.clone());

    Ok(AppState {
        config: Arc::new(config),
        sync_use_cases: Arc::new(sync_use_cases),
        processor_factory: Arc::new(processor_factory),
        subscription_repo: subscription_repo_arc,
    })
}

/// Console logs by default, JSON lines when `LOG_FORMAT=json`.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "subsync=debug,tower_http=info".into());

    let json = std::env::var("LOG_FORMAT").is_ok_and(|format| format.eq_ignore_ascii_case("json"));

    let console_layer = (!json).then(|| {
        fmt::layer()
            .with_target(false) // don’t show target (module path)
            .with_level(true)
            .pretty()
    });

    let json_layer = json.then(|| {
        fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(json_layer)
        .try_init()
        .ok();
}
