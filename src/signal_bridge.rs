/*!
 * Signal Bridge
 * Process-wide signal interception for the innermost live bounded call
 *
 * While a bounded call is active, SIGTERM/SIGINT are reinterpreted as an
 * abort of that call instead of terminating the process, and a no-op
 * SIGALRM handler is kept installed so the watchdog's directed interrupt
 * produces `EINTR` rather than killing the process.
 *
 * The async handlers run outside normal control flow: they perform exactly
 * one atomic load and one atomic store, never allocate, and never lock.
 * Registration and sigaction install/restore happen on the owning thread,
 * serialized by a registry mutex that is never held across a wait. The
 * registry holds an Arc to every registered outcome, plus a one-slot
 * graveyard for the most recently unregistered one, so any flag pointer a
 * handler could have loaded from the slot stays alive until it can no
 * longer be stored through.
 */

use crate::outcome::SharedOutcome;
use log::warn;
use nix::libc::c_int;
use nix::sys::signal::{sigaction, SaFlags, SigAction, SigHandler, SigSet, Signal};
use parking_lot::Mutex;
use std::io;
use std::ptr;
use std::sync::atomic::{AtomicBool, AtomicPtr, AtomicU64, Ordering};
use std::sync::Arc;

/// Abort flag of the innermost live bounded call. Read lock-free by the
/// termination handler; written only under `TERMINATION_REGISTRY`.
static ACTIVE_ABORT: AtomicPtr<AtomicBool> = AtomicPtr::new(ptr::null_mut());

static TERMINATION_REGISTRY: Mutex<TerminationRegistry> = Mutex::new(TerminationRegistry {
    stack: Vec::new(),
    graveyard: None,
    saved_term: None,
    saved_int: None,
});

static ALARM_REGISTRY: Mutex<AlarmRegistry> = Mutex::new(AlarmRegistry {
    depth: 0,
    saved: None,
});

static NEXT_REGISTRATION_ID: AtomicU64 = AtomicU64::new(1);

struct TerminationRegistry {
    /// Live registrations, innermost last. Owning the Arcs here is what
    /// keeps the published `ACTIVE_ABORT` pointer from dangling.
    stack: Vec<Registration>,
    /// Most recently unregistered outcome. A handler preempted between
    /// loading the slot and storing through it may still hold that
    /// pointer, so the allocation stays alive until the next
    /// unregistration replaces it.
    graveyard: Option<Arc<SharedOutcome>>,
    saved_term: Option<SigAction>,
    saved_int: Option<SigAction>,
}

struct Registration {
    id: u64,
    outcome: Arc<SharedOutcome>,
}

struct AlarmRegistry {
    depth: usize,
    saved: Option<SigAction>,
}

impl TerminationRegistry {
    /// Point the handler-visible slot at the innermost registration
    fn publish_top(&self) {
        let flag = match self.stack.last() {
            Some(registration) => {
                registration.outcome.abort_flag() as *const AtomicBool as *mut AtomicBool
            }
            None => ptr::null_mut(),
        };
        ACTIVE_ABORT.store(flag, Ordering::Release);
    }
}

/// SIGTERM/SIGINT handler: flips the live call's abort flag and nothing
/// else. Must stay async-signal-safe.
extern "C" fn on_termination(_signum: c_int) {
    let flag = ACTIVE_ABORT.load(Ordering::Acquire);
    if !flag.is_null() {
        // The registry keeps the outcome this flag lives in alive while
        // published, and in its graveyard slot after unpublish, covering
        // a handler preempted between this load and the store.
        unsafe { (*flag).store(true, Ordering::SeqCst) };
    }
}

/// SIGALRM handler: exists only so a directed interrupt makes blocking
/// syscalls on the invoking thread return `EINTR`.
extern "C" fn on_alarm(_signum: c_int) {}

fn interception_action(handler: extern "C" fn(c_int)) -> SigAction {
    // SA_RESTART deliberately omitted: interrupted syscalls must return
    // EINTR, not resume transparently.
    SigAction::new(
        SigHandler::Handler(handler),
        SaFlags::empty(),
        SigSet::empty(),
    )
}

fn install(signal: Signal, action: &SigAction) -> io::Result<SigAction> {
    unsafe { sigaction(signal, action) }.map_err(io::Error::from)
}

fn restore(signal: Signal, saved: SigAction) {
    if unsafe { sigaction(signal, &saved) }.is_err() {
        warn!("failed to restore prior {signal} disposition");
    }
}

/// Keeps SIGTERM/SIGINT pointed at the abort flag of one bounded call.
/// Dropping unregisters the call; the last guard out restores the prior
/// dispositions.
pub struct TerminationGuard {
    id: u64,
}

/// Reinterpret external termination requests as an abort of `outcome`.
///
/// Calls stack: the handler-visible slot always refers to the innermost
/// live registration, and unregistering re-exposes the next one down.
pub fn intercept_termination(outcome: &Arc<SharedOutcome>) -> io::Result<TerminationGuard> {
    let mut registry = TERMINATION_REGISTRY.lock();

    if registry.stack.is_empty() {
        let action = interception_action(on_termination);
        let saved_term = install(Signal::SIGTERM, &action)?;
        let saved_int = match install(Signal::SIGINT, &action) {
            Ok(saved) => saved,
            Err(e) => {
                restore(Signal::SIGTERM, saved_term);
                return Err(e);
            }
        };
        registry.saved_term = Some(saved_term);
        registry.saved_int = Some(saved_int);
    }

    let id = NEXT_REGISTRATION_ID.fetch_add(1, Ordering::Relaxed);
    registry.stack.push(Registration {
        id,
        outcome: outcome.clone(),
    });
    registry.publish_top();

    Ok(TerminationGuard { id })
}

impl Drop for TerminationGuard {
    fn drop(&mut self) {
        let mut registry = TERMINATION_REGISTRY.lock();
        let mut removed = None;
        if let Some(index) = registry.stack.iter().position(|r| r.id == self.id) {
            removed = Some(registry.stack.remove(index));
        }
        registry.publish_top();
        if let Some(registration) = removed {
            // Parked in the graveyard, not dropped: an in-flight handler
            // may have loaded this outcome's flag pointer just before the
            // republish above.
            registry.graveyard = Some(registration.outcome);
        }
        if registry.stack.is_empty() {
            if let Some(saved) = registry.saved_term.take() {
                restore(Signal::SIGTERM, saved);
            }
            if let Some(saved) = registry.saved_int.take() {
                restore(Signal::SIGINT, saved);
            }
        }
    }
}

/// Keeps the no-op SIGALRM handler installed. Must be live whenever a
/// watchdog may deliver a directed interrupt.
pub struct AlarmGuard {
    _priv: (),
}

/// Install the no-op SIGALRM handler (refcounted across nested calls)
pub fn install_alarm() -> io::Result<AlarmGuard> {
    let mut registry = ALARM_REGISTRY.lock();
    if registry.depth == 0 {
        let saved = install(Signal::SIGALRM, &interception_action(on_alarm))?;
        registry.saved = Some(saved);
    }
    registry.depth += 1;
    Ok(AlarmGuard { _priv: () })
}

impl Drop for AlarmGuard {
    fn drop(&mut self) {
        let mut registry = ALARM_REGISTRY.lock();
        registry.depth -= 1;
        if registry.depth == 0 {
            if let Some(saved) = registry.saved.take() {
                restore(Signal::SIGALRM, saved);
            }
        }
    }
}
