pub mod auth;

pub use auth::{creator_auth_middleware, scheduler_auth_middleware, sponsor_auth_middleware, Claims};
