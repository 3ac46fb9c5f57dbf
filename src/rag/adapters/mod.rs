//! Integration helpers for host binaries.

pub mod telemetry;

pub use telemetry::init_tracing;
