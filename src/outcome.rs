/*!
 * Shared Outcome State
 * Per-call record of the race between work, watchdog, and external signals
 *
 * The three flags are the sole channel of communication between the
 * invoking thread, the watchdog thread, and the async signal handler.
 * All accesses are SeqCst; the condvar/mutex pair orders "mark finished,
 * wake watchdog" before the watchdog's final flag check.
 */

use crate::clock::Deadline;
use parking_lot::{Condvar, Mutex, MutexGuard};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// State shared between the invoking thread and its watchdog.
///
/// Allocated fresh per bounded call; once `deadline_fired` or
/// `work_finished` is set the outcome is fixed and no later event may
/// change the reported result.
pub struct SharedOutcome {
    deadline: Deadline,
    deadline_fired: AtomicBool,
    work_finished: AtomicBool,
    abort_requested: AtomicBool,
    lock: Mutex<()>,
    wake: Condvar,
}

impl SharedOutcome {
    /// Create fresh state for one bounded call
    pub fn new(deadline: Deadline) -> Self {
        Self {
            deadline,
            deadline_fired: AtomicBool::new(false),
            work_finished: AtomicBool::new(false),
            abort_requested: AtomicBool::new(false),
            lock: Mutex::new(()),
            wake: Condvar::new(),
        }
    }

    /// The call's absolute deadline
    pub fn deadline(&self) -> Deadline {
        self.deadline
    }

    /// Whether the watchdog marked the deadline as fired
    pub fn deadline_fired(&self) -> bool {
        self.deadline_fired.load(Ordering::SeqCst)
    }

    /// Whether the invoking thread marked the work as finished
    pub fn work_finished(&self) -> bool {
        self.work_finished.load(Ordering::SeqCst)
    }

    /// Whether an external termination request arrived
    pub fn abort_requested(&self) -> bool {
        self.abort_requested.load(Ordering::SeqCst)
    }

    /// Whether the call must resolve to `Expired`
    pub fn expired(&self) -> bool {
        self.deadline_fired() || self.abort_requested()
    }

    /// Mark the deadline as fired. Watchdog only; one-shot.
    pub(crate) fn set_deadline_fired(&self) {
        self.deadline_fired.store(true, Ordering::SeqCst);
    }

    /// Request an abort from normal (non-handler) code
    pub fn request_abort(&self) {
        self.abort_requested.store(true, Ordering::SeqCst);
    }

    /// Mark the work as finished and wake the watchdog.
    ///
    /// The store happens under the condvar mutex so it is ordered before
    /// the watchdog's next flag check; the watchdog can never sleep on
    /// through a completion.
    pub fn mark_work_finished(&self) {
        let _guard = self.lock.lock();
        self.work_finished.store(true, Ordering::SeqCst);
        self.wake.notify_all();
    }

    /// The abort flag itself, for registration in the process-wide slot.
    /// The async signal handler stores through this and nothing else.
    #[cfg(unix)]
    pub(crate) fn abort_flag(&self) -> &AtomicBool {
        &self.abort_requested
    }

    /// Acquire the wake-channel lock (watchdog wait loop)
    pub(crate) fn lock(&self) -> MutexGuard<'_, ()> {
        self.lock.lock()
    }

    /// Timed wait on the wake channel; returns true if the wait timed out
    pub(crate) fn wait_for(&self, guard: &mut MutexGuard<'_, ()>, timeout: Duration) -> bool {
        self.wake.wait_for(guard, timeout).timed_out()
    }
}
