//! Test app state builder for HTTP-level testing.
//!
//! `TestAppStateBuilder` wires an `AppState` from in-memory repos and a scripted
//! processor client. The repo and client handles stay reachable for assertions.

use std::{
    net::{Ipv4Addr, SocketAddr},
    sync::Arc,
};

use secrecy::SecretString;
use url::Url;

use crate::{
    adapters::http::app_state::AppState,
    application::{
        ports::payment_processor::ProcessorClient,
        use_cases::{
            processor_factory::ProcessorFactory,
            subscription_sync::{OwnerRepo, SubscriptionRepo, SubscriptionSyncUseCases},
        },
    },
    domain::entities::{
        billable_owner::BillableOwnerProfile, subscription::SubscriptionProfile,
        subscription_item::SubscriptionItemProfile,
    },
    infra::{config::AppConfig, stripe_client::STRIPE_API_BASE},
    test_utils::{InMemoryOwnerRepo, InMemorySubscriptionRepo, MockProcessorClient},
};

pub const TEST_WEBHOOK_SECRET: &str = "whsec_test_secret";
pub const TEST_ADMIN_TOKEN: &str = "admin_test_token";

pub fn test_config() -> AppConfig {
    AppConfig {
        database_url: "postgres://localhost/subsync_test".to_string(),
        db_max_connections: 1,
        bind_addr: SocketAddr::from((Ipv4Addr::LOCALHOST, 0)),
        stripe_secret_key: SecretString::new("sk_test_123".into()),
        stripe_webhook_secret: SecretString::new(TEST_WEBHOOK_SECRET.into()),
        stripe_api_base: Url::parse(STRIPE_API_BASE).unwrap(),
        default_subscription_name: "default".to_string(),
        admin_api_token: SecretString::new(TEST_ADMIN_TOKEN.into()),
        webhook_tolerance_secs: 300,
    }
}

pub struct TestAppStateBuilder {
    owners: Vec<BillableOwnerProfile>,
    subscription_repo: Arc<InMemorySubscriptionRepo>,
    client: Arc<MockProcessorClient>,
}

impl Default for TestAppStateBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TestAppStateBuilder {
    pub fn new() -> Self {
        Self {
            owners: Vec::new(),
            subscription_repo: Arc::new(InMemorySubscriptionRepo::new()),
            client: Arc::new(MockProcessorClient::new()),
        }
    }

    pub fn with_owner(mut self, owner: BillableOwnerProfile) -> Self {
        self.owners.push(owner);
        self
    }

    pub fn with_subscription(self, sub: SubscriptionProfile) -> Self {
        self.subscription_repo.insert_subscription(sub);
        self
    }

    pub fn with_item(self, item: SubscriptionItemProfile) -> Self {
        self.subscription_repo.insert_item(item);
        self
    }

    pub fn with_client(mut self, client: MockProcessorClient) -> Self {
        self.client = Arc::new(client);
        self
    }

    pub fn subscription_repo(&self) -> Arc<InMemorySubscriptionRepo> {
        self.subscription_repo.clone()
    }

    pub fn client(&self) -> Arc<MockProcessorClient> {
        self.client.clone()
    }

    pub fn build(self) -> AppState {
        let owner_repo = Arc::new(InMemoryOwnerRepo::with_owners(self.owners)) as Arc<dyn OwnerRepo>;
        let subscription_repo = self.subscription_repo as Arc<dyn SubscriptionRepo>;
        let client = self.client as Arc<dyn ProcessorClient>;
        let config = test_config();

        let sync_use_cases = SubscriptionSyncUseCases::new(
            client.clone(),
            owner_repo,
            subscription_repo.clone(),
            config.default_subscription_name.clone(),
        );

        AppState {
            config: Arc::new(config),
            sync_use_cases: Arc::new(sync_use_cases),
            processor_factory: Arc::new(ProcessorFactory::new(client, subscription_repo.clone())),
            subscription_repo,
        }
    }
}
