use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    #[serde(default)]
    pub store: StoreConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub redis: Option<RedisConfig>,
    pub auth: AuthConfig,
    pub payments: PaymentsConfig,
    #[serde(default)]
    pub business_rules: BusinessRules,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Postgres,
    Memory,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BusinessRules {
    #[serde(default = "default_hold_ttl")]
    pub hold_ttl_seconds: u64,
    /// 0 disables the in-process sweeper; an external scheduler must call the sweep endpoint.
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_seconds: u64,
}

impl Default for BusinessRules {
    fn default() -> Self {
        Self {
            hold_ttl_seconds: default_hold_ttl(),
            sweep_interval_seconds: default_sweep_interval(),
        }
    }
}

fn default_hold_ttl() -> u64 { slotbook_core::HOLD_TTL_SECONDS as u64 }
fn default_sweep_interval() -> u64 { 180 }

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub jwt_expiration_seconds: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default)]
    pub run_migrations: bool,
}

fn default_max_connections() -> u32 { 5 }

#[derive(Debug, Deserialize, Clone)]
pub struct RedisConfig {
    pub url: String,
    #[serde(default = "default_rate_limit")]
    pub rate_limit_per_minute: i64,
}

fn default_rate_limit() -> i64 { 100 }

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PaymentProviderKind {
    #[default]
    Dummy,
    Stripe,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PaymentsConfig {
    #[serde(default)]
    pub provider: PaymentProviderKind,
    pub webhook_secret: String,
    #[serde(default = "default_tolerance")]
    pub signature_tolerance_seconds: i64,
    #[serde(default)]
    pub stripe_api_key: Option<String>,
    #[serde(default = "default_stripe_base")]
    pub stripe_api_base: String,
    pub success_url: String,
    pub cancel_url: String,
}

fn default_tolerance() -> i64 { 300 }
fn default_stripe_base() -> String { "https://api.stripe.com".to_string() }

#[derive(Debug, Deserialize, Clone, Default)]
pub struct SchedulerConfig {
    /// Bearer token the external cron presents on the sweep endpoint. Unset disables the endpoint.
    #[serde(default)]
    pub token: Option<String>,
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Not checked in
            .add_source(config::File::with_name("config/local").required(false))
            // Eg. `SLOTBOOK_DATABASE__URL=postgres://...`
            .add_source(config::Environment::with_prefix("SLOTBOOK").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
