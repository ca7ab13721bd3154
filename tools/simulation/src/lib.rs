//! Escrow Ledger Simulation
//!
//! Seeded workload driver for the escrow swap ledger. Exercises operation
//! creation, completion and cancellation across many actors and audits
//! custody conservation after every step.
//!
//! # Modules
//! - `engine`: `SwapSimulation` driver, `SimConfig` and `SimReport`
//! - `metrics`: Outcome counters and throughput

pub mod engine;
pub mod metrics;

pub use engine::{SimConfig, SimReport, SwapSimulation};
pub use metrics::{SimAction, SimMetrics};

/// Crate version constant
pub const VERSION: &str = "0.1.0";
