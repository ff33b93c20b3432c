pub mod error;
pub mod manager;
pub mod models;
pub mod resilience;
pub mod telemetry;

// Re-export config from crate root
pub use crate::config;
