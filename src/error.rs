/*!
 * Error Types
 * Outcome taxonomy for bounded execution
 */

use std::io;
use thiserror::Error;

/// Final outcome of a bounded call that did not return the work's value
#[derive(Debug, Error)]
pub enum TimeoutError<E> {
    /// The bound was exceeded, or an external termination request arrived
    /// first. Takes priority over a racing successful completion.
    #[error("execution expired")]
    Expired,

    /// Duration below the configured minimum granularity; the work was
    /// never started.
    #[error("timeout duration must be at least {min_ms}ms (got {got_ms}ms)")]
    InvalidDuration { got_ms: u64, min_ms: u64 },

    /// The watchdog thread or signal interception could not be set up;
    /// fatal to the call, no work was executed.
    #[error("failed to start timeout supervisor: {0}")]
    Supervisor(#[source] io::Error),

    /// The work's own error, propagated unchanged (no timeout occurred)
    #[error(transparent)]
    Operation(E),
}

impl<E> TimeoutError<E> {
    /// Check if this is the timeout outcome
    #[inline]
    pub fn is_expired(&self) -> bool {
        matches!(self, Self::Expired)
    }

    /// Check if the duration was rejected before execution
    #[inline]
    pub fn is_invalid_duration(&self) -> bool {
        matches!(self, Self::InvalidDuration { .. })
    }

    /// Extract the work's own error, if that is what this is
    pub fn into_operation(self) -> Option<E> {
        match self {
            Self::Operation(e) => Some(e),
            _ => None,
        }
    }
}

/// Raised at a cooperative safe point once the enclosing bounded call has
/// expired or been aborted. Carries the same fixed message as `Expired`.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("execution expired")]
pub struct Interrupted;
