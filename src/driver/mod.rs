mod errors;
mod simulation;

pub use errors::DriverError;
pub use simulation::{Driver, RunSummary, StopReason, Tick, build_env};
