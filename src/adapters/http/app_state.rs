use std::sync::Arc;

use axum::extract::FromRef;

use crate::{
    infra::config::AppConfig,
    use_cases::{
        processor_factory::ProcessorFactory,
        subscription_sync::{SubscriptionRepo, SubscriptionSyncUseCases},
    },
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub sync_use_cases: Arc<SubscriptionSyncUseCases>,
    pub processor_factory: Arc<ProcessorFactory>,
    pub subscription_repo: Arc<dyn SubscriptionRepo>,
}

impl FromRef<AppState> for Arc<SubscriptionSyncUseCases> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.sync_use_cases.clone()
    }
}
