pub mod memory;
pub mod postgres;
pub mod repositories;

pub use memory::*;
pub use postgres::{create_pool, create_pool_with_config, health_check, migrate, PostgresConfig};
pub use repositories::*;
