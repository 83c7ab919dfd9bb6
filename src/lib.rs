pub mod api;
pub mod config;
pub mod core;
pub mod narrative;
pub mod report;
pub mod telemetry;
