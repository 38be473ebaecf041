//! `fhir-alarm` library crate.
//!
//! Re-exports the runner and logging setup for integration testing. The
//! binary entrypoint lives in `main.rs`.

pub mod runner;
pub mod telemetry;
