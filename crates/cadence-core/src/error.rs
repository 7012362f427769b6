//! Error types for the scheduler

use thiserror::Error;

/// Scheduler errors
#[derive(Error, Debug)]
pub enum SchedulerError {
    /// `run` was asked for a negative, NaN or infinite duration
    #[error("invalid run duration: {0}")]
    InvalidDuration(f64),

    /// The unit graph contains a cycle and cannot be flattened
    #[error("unit graph contains a cycle and cannot be flattened")]
    CyclicUnitGraph,

    /// A scheduled unit no longer exists
    #[error("scheduled unit no longer exists")]
    StaleUnit,

    /// A unit's update/prepare/reinit failed; propagated out of `run`
    #[error("unit failed: {0}")]
    Unit(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl SchedulerError {
    /// Wrap a unit-level failure
    pub fn unit(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        SchedulerError::Unit(err.into())
    }
}

/// Result type for scheduler operations
pub type SchedResult<T> = Result<T, SchedulerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_error_message() {
        let err = SchedulerError::unit("voltage out of range");
        assert_eq!(err.to_string(), "unit failed: voltage out of range");
    }

    #[test]
    fn test_invalid_duration_message() {
        let err = SchedulerError::InvalidDuration(-1.0);
        assert_eq!(err.to_string(), "invalid run duration: -1");
    }
}
