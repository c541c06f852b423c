/*!
 * Timebound
 * Bounded execution of blocking work, enforced by a watchdog thread
 *
 * Runs a caller-supplied closure and guarantees a distinguishable
 * [`TimeoutError::Expired`] outcome if it overruns its duration, even while
 * blocked in a system call. Exactly one resolution per call: a timeout that
 * races a successful completion is always reported as a timeout.
 *
 * On Unix, the watchdog interrupts a blocked syscall by delivering `SIGALRM`
 * to the invoking thread (blocking calls return `EINTR`), and external
 * `SIGTERM`/`SIGINT` arriving during a bounded call are reinterpreted as
 * `Expired` instead of terminating the process. Pure computation that never
 * blocks is interruptible only at the safe points where it consults
 * [`interrupt::current_token`]; otherwise it completes late and is then
 * reported as expired.
 */

pub mod clock;
pub mod error;
pub mod interrupt;
pub mod outcome;
#[cfg(unix)]
pub mod signal_bridge;
pub mod supervisor;
pub mod watchdog;

// Re-exports
pub use error::{Interrupted, TimeoutError};
pub use interrupt::InterruptToken;
pub use supervisor::{timeout, Supervisor};
