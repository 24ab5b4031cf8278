pub mod app_config;
pub mod database;
pub mod memory;
pub mod pg_repo;
pub mod redis_repo;
pub mod stripe_gateway;

pub use database::DbClient;
pub use memory::MemoryStore;
pub use pg_repo::PostgresStore;
pub use redis_repo::RedisClient;
pub use stripe_gateway::StripeCheckoutGateway;
