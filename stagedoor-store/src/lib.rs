pub mod app_config;
pub mod stubs;

pub use app_config::{BusinessRules, Config, ServerConfig};
pub use stubs::{MemoryEventCatalog, MemoryUserDirectory};
