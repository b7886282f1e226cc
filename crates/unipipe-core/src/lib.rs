pub mod config;

pub use config::{BrokerConfig, GitConfig};
