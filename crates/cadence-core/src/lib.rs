//! Cadence Core - Fundamental scheduling primitives
//!
//! This crate defines the types shared by every part of the scheduler:
//! - Phase slots (`Slot`) ordering unit execution within a batch
//! - Error types (`SchedulerError`, `SchedResult`)
//! - Cooperative cancellation (`CancellationToken`)

pub mod cancel;
pub mod error;
pub mod slot;

pub use cancel::*;
pub use error::*;
pub use slot::*;
