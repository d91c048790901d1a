pub mod app_config;
pub mod memory;
pub mod postgres;

pub use app_config::{Config, DatabaseConfig, MarketConfig, PaymentConfig, ServerConfig};
pub use memory::MemoryLedger;
pub use postgres::PgLedger;
