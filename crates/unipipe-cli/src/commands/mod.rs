pub mod list;
pub mod metrics;
pub mod show;
