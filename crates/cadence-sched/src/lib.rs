//! Cadence Scheduler - multi-clock discrete-time scheduling
//!
//! This crate implements the scheduler:
//! - `Clock`: independent discretized time sources (integer step counts,
//!   no float accumulation drift)
//! - `Schedulable` / `Operation`: the unit contract and the closure adapter
//! - `Network`: the explicit scheduler with its deterministic run loop
//! - `Registry` and the implicit global `run`/`stop` surface
//!
//! Execution is single-threaded and cooperative: given identical inputs,
//! a run produces a bit-for-bit identical execution order.

pub mod clock;
pub mod implicit;
pub mod network;
pub mod registry;
pub mod unit;

pub use cadence_core::{CancellationToken, SchedResult, SchedulerError, Slot};

pub use clock::*;
pub use implicit::*;
pub use network::*;
pub use registry::*;
pub use unit::*;
