pub mod config;
pub mod errors;
pub mod intake;
pub mod telemetry;
