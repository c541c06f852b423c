/*!
 * Interruption Channel
 * Cooperative interrupt tokens plus directed interruption of a blocked thread
 *
 * Two complementary strategies:
 * - Cooperative: work polls an `InterruptToken` at safe points. This is the
 *   only way to stop pure computation that never enters a syscall.
 * - Directed (Unix): the watchdog delivers `SIGALRM` to the invoking thread
 *   via `pthread_kill`, so blocking syscalls return `EINTR`. Requires the
 *   no-op handler from `signal_bridge` to be installed; the supervisor
 *   guarantees that ordering. On non-Unix targets directed delivery is a
 *   no-op and only the cooperative path applies.
 */

use crate::error::Interrupted;
use crate::outcome::SharedOutcome;
use std::cell::RefCell;
use std::sync::Arc;

/// Observer handle onto a bounded call's outcome, for cooperative
/// interruption at explicit safe points inside the work.
#[derive(Clone)]
pub struct InterruptToken {
    outcome: Arc<SharedOutcome>,
}

impl InterruptToken {
    pub(crate) fn new(outcome: Arc<SharedOutcome>) -> Self {
        Self { outcome }
    }

    /// Whether the enclosing bounded call has expired or been aborted
    pub fn is_interrupted(&self) -> bool {
        self.outcome.expired()
    }

    /// Safe-point check: errors once the call has expired or been aborted
    pub fn check(&self) -> Result<(), Interrupted> {
        if self.is_interrupted() {
            Err(Interrupted)
        } else {
            Ok(())
        }
    }
}

thread_local! {
    // Stack, not a single slot: bounded calls nest and the innermost wins.
    static CURRENT: RefCell<Vec<InterruptToken>> = const { RefCell::new(Vec::new()) };
}

/// Token of the innermost bounded call running on this thread, if any.
///
/// Unbounded calls (`None`/zero duration) install no token.
pub fn current_token() -> Option<InterruptToken> {
    CURRENT.with(|stack| stack.borrow().last().cloned())
}

/// Registers `outcome` as this thread's innermost bounded call until the
/// guard drops.
pub(crate) fn install_current(outcome: Arc<SharedOutcome>) -> TokenGuard {
    CURRENT.with(|stack| stack.borrow_mut().push(InterruptToken::new(outcome)));
    TokenGuard { _priv: () }
}

pub(crate) struct TokenGuard {
    _priv: (),
}

impl Drop for TokenGuard {
    fn drop(&mut self) {
        CURRENT.with(|stack| {
            stack.borrow_mut().pop();
        });
    }
}

#[cfg(unix)]
mod directed {
    use nix::sys::pthread::{pthread_kill, pthread_self, Pthread};
    use nix::sys::signal::Signal;

    /// Handle to the invoking thread, targetable by the watchdog
    #[derive(Debug, Clone, Copy)]
    pub struct ThreadHandle(Pthread);

    // pthread_t is an opaque thread id; the watchdog only ever passes it
    // to pthread_kill, which is valid from any thread while the target is
    // joined before the call returns.
    unsafe impl Send for ThreadHandle {}
    unsafe impl Sync for ThreadHandle {}

    impl ThreadHandle {
        /// Handle to the calling thread
        pub fn current() -> Self {
            Self(pthread_self())
        }

        /// Deliver `SIGALRM` so a blocking syscall on the target returns
        /// `EINTR`. Only called while the no-op handler is installed.
        pub fn interrupt(&self) {
            // ESRCH means the thread is already gone; nothing left to stop
            let _ = pthread_kill(self.0, Signal::SIGALRM);
        }
    }
}

#[cfg(unix)]
pub use directed::ThreadHandle;

#[cfg(not(unix))]
mod directed {
    /// Handle to the invoking thread. Directed interruption is unavailable
    /// on this platform; only the cooperative token path applies.
    #[derive(Debug, Clone, Copy)]
    pub struct ThreadHandle;

    impl ThreadHandle {
        pub fn current() -> Self {
            Self
        }

        pub fn interrupt(&self) {}
    }
}

#[cfg(not(unix))]
pub use directed::ThreadHandle;
