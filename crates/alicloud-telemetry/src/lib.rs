//! This crate contains the tracing primitives shared by the binaries of this
//! workspace: console and rolling file log subscribers, configurable through
//! CLI arguments and environment variables.
pub mod tracing;

pub use tracing::{TelemetryOptions, Tracing};
