pub mod loader;
pub mod schema;

pub use loader::MAX_RETRY_BUDGET;
pub use schema::{Config, GuardrailConfig, MonitorKind, RoutingConfig, RoutingPrecedence, StoreConfig};
