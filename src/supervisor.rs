/*!
 * Timeout Supervisor
 * Entry point: run caller-supplied work bounded by a duration
 *
 * Wires the shared outcome, watchdog, and interruption channel together,
 * runs the work on the invoking thread, and resolves the race with timeout
 * priority: an expired deadline or external abort is always reported as
 * `Expired`, never swallowed by a completion racing ahead. Teardown
 * (watchdog join, signal restore, token removal) runs on every exit path.
 */

use crate::clock::Deadline;
use crate::error::TimeoutError;
use crate::interrupt::{self, ThreadHandle};
use crate::outcome::SharedOutcome;
use crate::watchdog::Watchdog;
use log::{debug, trace};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

/// Default minimum accepted duration (poll-variant contract)
pub const DEFAULT_MIN_DURATION: Duration = Duration::from_millis(100);

/// Default watchdog wait slice; bounds abort-detection latency
pub const DEFAULT_POLL_SLICE: Duration = Duration::from_millis(25);

/// Configuration and entry point for bounded execution.
///
/// `None` or zero duration means unbounded: the work runs directly on the
/// invoking thread with no watchdog. Durations below the minimum
/// granularity are rejected before any thread is spawned.
#[derive(Debug, Clone)]
pub struct Supervisor {
    min_duration: Duration,
    poll_slice: Duration,
    intercept_termination: bool,
}

impl Supervisor {
    /// Create a supervisor with defaults: 100ms minimum, 25ms slice,
    /// SIGTERM/SIGINT interception on (Unix).
    pub fn new() -> Self {
        Self {
            min_duration: DEFAULT_MIN_DURATION,
            poll_slice: DEFAULT_POLL_SLICE,
            intercept_termination: cfg!(unix),
        }
    }

    /// Set the minimum accepted duration
    pub fn with_min_duration(mut self, min: Duration) -> Self {
        self.min_duration = min;
        self
    }

    /// Set the watchdog wait slice (clamped to at least 1ms)
    pub fn with_poll_slice(mut self, slice: Duration) -> Self {
        self.poll_slice = slice.max(Duration::from_millis(1));
        self
    }

    /// Enable or disable reinterpreting SIGTERM/SIGINT as `Expired` while
    /// a call is active. No effect on non-Unix targets.
    pub fn with_signal_interception(mut self, enabled: bool) -> Self {
        self.intercept_termination = enabled;
        self
    }

    /// Whether external termination requests are intercepted during calls
    pub fn intercepts_termination(&self) -> bool {
        self.intercept_termination
    }

    /// Run `work`, bounded by `duration`.
    ///
    /// Resolution priority when the work returns: if the deadline fired or
    /// an external abort arrived, the result is `Expired` regardless of
    /// what the work produced; otherwise the work's error propagates
    /// unchanged; otherwise its value is returned.
    pub fn execute<T, E, F>(&self, duration: Option<Duration>, work: F) -> Result<T, TimeoutError<E>>
    where
        F: FnOnce() -> Result<T, E>,
    {
        let Some(duration) = duration.filter(|d| !d.is_zero()) else {
            trace!("unbounded call; running work directly");
            return work().map_err(TimeoutError::Operation);
        };

        if duration < self.min_duration {
            return Err(TimeoutError::InvalidDuration {
                got_ms: duration.as_millis() as u64,
                min_ms: self.min_duration.as_millis() as u64,
            });
        }

        let outcome = Arc::new(SharedOutcome::new(Deadline::after(duration)));
        let _token_guard = interrupt::install_current(outcome.clone());

        #[cfg(unix)]
        let _signal_guards = self
            .install_signal_guards(&outcome)
            .map_err(TimeoutError::Supervisor)?;

        let watchdog = Watchdog::spawn(outcome.clone(), ThreadHandle::current(), self.poll_slice)
            .map_err(TimeoutError::Supervisor)?;
        trace!("watchdog started for {duration:?} bound");

        let work_result = panic::catch_unwind(AssertUnwindSafe(work));

        // Wake the watchdog before inspecting any flag; the final decision
        // is made only after it has observably stopped.
        outcome.mark_work_finished();
        watchdog.join();

        if outcome.expired() {
            debug!(
                "bounded call expired (deadline_fired={}, abort_requested={})",
                outcome.deadline_fired(),
                outcome.abort_requested()
            );
            return Err(TimeoutError::Expired);
        }

        match work_result {
            Ok(result) => result.map_err(TimeoutError::Operation),
            // No timeout occurred: the work's own panic resumes unchanged
            Err(payload) => panic::resume_unwind(payload),
        }
    }

    #[cfg(unix)]
    fn install_signal_guards(
        &self,
        outcome: &Arc<SharedOutcome>,
    ) -> std::io::Result<(
        crate::signal_bridge::AlarmGuard,
        Option<crate::signal_bridge::TerminationGuard>,
    )> {
        // Alarm handler first: the watchdog may interrupt at any point
        // after spawn, and an unhandled SIGALRM would kill the process.
        let alarm = crate::signal_bridge::install_alarm()?;
        let termination = if self.intercept_termination {
            Some(crate::signal_bridge::intercept_termination(outcome)?)
        } else {
            None
        };
        Ok((alarm, termination))
    }
}

impl Default for Supervisor {
    fn default() -> Self {
        Self::new()
    }
}

/// Run `work` bounded by `duration` with the default [`Supervisor`].
///
/// `None` or zero means unbounded, same as calling `work` directly.
pub fn timeout<T, E, F>(duration: Option<Duration>, work: F) -> Result<T, TimeoutError<E>>
where
    F: FnOnce() -> Result<T, E>,
{
    Supervisor::new().execute(duration, work)
}
