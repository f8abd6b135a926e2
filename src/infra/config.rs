use std::net::{Ipv4Addr, SocketAddr};

use env_helpers::{get_env, get_env_default};
use secrecy::SecretString;
use url::Url;

use crate::infra::stripe_client::STRIPE_API_BASE;

pub struct AppConfig {
    pub database_url: String,
    pub db_max_connections: u32,
    pub bind_addr: SocketAddr,
    pub stripe_secret_key: SecretString,
    pub stripe_webhook_secret: SecretString,
    pub stripe_api_base: Url,
    /// Name given to subscriptions synced without an explicit one.
    pub default_subscription_name: String,
    /// Bearer token for the resync and command endpoints.
    pub admin_api_token: SecretString,
    /// Max age of a webhook signature, in seconds.
    pub webhook_tolerance_secs: i64,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url: String = get_env("DATABASE_URL");
        let db_max_connections: u32 = get_env_default("DB_MAX_CONNECTIONS", 5);
        let bind_addr: SocketAddr =
            get_env_default("BIND_ADDR", SocketAddr::from((Ipv4Addr::LOCALHOST, 3001)));

        let stripe_secret_key = SecretString::new(get_env::<String>("STRIPE_SECRET_KEY").into());
        let stripe_webhook_secret =
            SecretString::new(get_env::<String>("STRIPE_WEBHOOK_SECRET").into());
        let stripe_api_base = Url::parse(&get_env_default(
            "STRIPE_API_BASE",
            STRIPE_API_BASE.to_string(),
        ))
        .map_err(|e| anyhow::anyhow!("STRIPE_API_BASE must be a valid URL: {e}"))?;

        let default_subscription_name: String =
            get_env_default("DEFAULT_SUBSCRIPTION_NAME", "default".to_string());
        let admin_api_token = SecretString::new(get_env::<String>("ADMIN_API_TOKEN").into());
        let webhook_tolerance_secs: i64 = get_env_default("WEBHOOK_TOLERANCE_SECS", 300);

        Ok(Self {
            database_url,
            db_max_connections,
            bind_addr,
            stripe_secret_key,
            stripe_webhook_secret,
            stripe_api_base,
            default_subscription_name,
            admin_api_token,
            webhook_tolerance_secs,
        })
    }
}
