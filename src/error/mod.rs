pub mod config;
pub mod router;

pub use config::ConfigError;
pub use router::{RouterError, RouterResult};
