/*!
 * Watchdog Timer
 * Background thread that enforces one bounded call's deadline
 *
 * The wait is sliced: an async signal handler can only flip an atomic, not
 * signal the condvar, so the watchdog never sleeps longer than one slice.
 * This bounds abort-detection latency by the slice length; completion wakes
 * it immediately via the condvar.
 */

use crate::interrupt::ThreadHandle;
use crate::outcome::SharedOutcome;
use log::{debug, trace, warn};
use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Handle to a spawned watchdog. The supervisor exclusively owns its
/// lifecycle: spawn, wake via the shared outcome, join.
pub struct Watchdog {
    handle: JoinHandle<()>,
}

impl Watchdog {
    /// Start the watchdog for one bounded call.
    ///
    /// Spawn failure is fatal to the call; the supervisor never downgrades
    /// it to "no timeout".
    pub fn spawn(
        outcome: Arc<SharedOutcome>,
        target: ThreadHandle,
        poll_slice: Duration,
    ) -> io::Result<Self> {
        let handle = thread::Builder::new()
            .name("timebound-watchdog".into())
            .spawn(move || run(outcome, target, poll_slice))?;
        Ok(Self { handle })
    }

    /// Block until the watchdog has observably stopped
    pub fn join(self) {
        if self.handle.join().is_err() {
            warn!("watchdog thread panicked during teardown");
        }
    }
}

fn run(outcome: Arc<SharedOutcome>, target: ThreadHandle, poll_slice: Duration) {
    let mut guard = outcome.lock();
    loop {
        // Flag order matters: a completed or aborted call must never be
        // re-reported as a fresh deadline hit.
        if outcome.work_finished() {
            trace!("work finished before deadline; watchdog exiting");
            return;
        }
        if outcome.abort_requested() {
            debug!("external abort observed; interrupting watched thread");
            target.interrupt();
            return;
        }

        let remaining = outcome.deadline().remaining();
        if remaining.is_zero() {
            // Real-time deadline elapsed with neither terminal flag set:
            // a timeout is the correct outcome even if completion lands now.
            outcome.set_deadline_fired();
            debug!("deadline fired; interrupting watched thread");
            target.interrupt();
            return;
        }

        let slice = remaining.min(poll_slice);
        outcome.wait_for(&mut guard, slice);
    }
}
