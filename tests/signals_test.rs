#![cfg(unix)]

/*!
 * Signal Interception Integration Tests
 * External termination requests and directed interruption of blocked work
 */

use nix::libc::c_int;
use nix::sys::signal::{raise, sigaction, SaFlags, SigAction, SigHandler, SigSet, Signal};
use serial_test::serial;
use std::convert::Infallible;
use std::io::Read;
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};
use timebound::{timeout, Supervisor, TimeoutError};

fn fast_supervisor() -> Supervisor {
    Supervisor::new()
        .with_min_duration(Duration::from_millis(50))
        .with_poll_slice(Duration::from_millis(5))
}

#[test]
#[serial]
fn test_sigterm_during_bounded_call_reports_expired() {
    let start = Instant::now();
    let result: Result<(), TimeoutError<Infallible>> = timeout(Some(Duration::from_secs(5)), || {
        raise(Signal::SIGTERM).unwrap();
        thread::sleep(Duration::from_millis(200));
        Ok(())
    });

    // The process survived and the request became a timeout outcome,
    // well before the 5s deadline
    assert!(matches!(result, Err(TimeoutError::Expired)));
    assert!(start.elapsed() < Duration::from_secs(2));
}

#[test]
#[serial]
fn test_sigint_during_bounded_call_reports_expired() {
    let result: Result<(), TimeoutError<Infallible>> = timeout(Some(Duration::from_secs(5)), || {
        raise(Signal::SIGINT).unwrap();
        thread::sleep(Duration::from_millis(200));
        Ok(())
    });
    assert!(matches!(result, Err(TimeoutError::Expired)));
}

static PRIOR_HANDLER_CAUGHT: AtomicBool = AtomicBool::new(false);

extern "C" fn note_sigterm(_signum: c_int) {
    PRIOR_HANDLER_CAUGHT.store(true, Ordering::SeqCst);
}

#[test]
#[serial]
fn test_prior_disposition_restored_after_call() {
    PRIOR_HANDLER_CAUGHT.store(false, Ordering::SeqCst);

    // Install our own SIGTERM handler, then let a bounded call displace it
    let ours = SigAction::new(
        SigHandler::Handler(note_sigterm),
        SaFlags::empty(),
        SigSet::empty(),
    );
    let saved = unsafe { sigaction(Signal::SIGTERM, &ours) }.unwrap();

    let result: Result<(), TimeoutError<Infallible>> = timeout(Some(Duration::from_secs(5)), || {
        raise(Signal::SIGTERM).unwrap();
        thread::sleep(Duration::from_millis(100));
        Ok(())
    });
    assert!(matches!(result, Err(TimeoutError::Expired)));
    // During the call, interception owned the signal, not our handler
    assert!(!PRIOR_HANDLER_CAUGHT.load(Ordering::SeqCst));

    // After the call, our handler is back
    raise(Signal::SIGTERM).unwrap();
    assert!(PRIOR_HANDLER_CAUGHT.load(Ordering::SeqCst));

    unsafe { sigaction(Signal::SIGTERM, &saved) }.unwrap();
}

#[test]
#[serial]
fn test_blocked_read_is_interrupted_by_watchdog() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let mut stream = TcpStream::connect(addr).unwrap();
    // Keep the peer open so the read blocks instead of hitting EOF
    let (_peer, _) = listener.accept().unwrap();

    let start = Instant::now();
    let result = fast_supervisor().execute(Some(Duration::from_millis(200)), || {
        let mut buf = [0u8; 1];
        // Blocks in recv until SIGALRM from the watchdog makes it EINTR
        stream.read(&mut buf)
    });

    assert!(matches!(result, Err(TimeoutError::Expired)));
    // Interruption, not an eventual read: resolution near the deadline
    assert!(start.elapsed() < Duration::from_secs(2));
}

#[test]
#[serial]
fn test_interception_can_be_disabled() {
    // With interception off the supervisor must leave dispositions alone.
    // Install a handler, run a bounded call, and confirm the handler is
    // the one that sees the signal raised inside the work.
    PRIOR_HANDLER_CAUGHT.store(false, Ordering::SeqCst);
    let ours = SigAction::new(
        SigHandler::Handler(note_sigterm),
        SaFlags::empty(),
        SigSet::empty(),
    );
    let saved = unsafe { sigaction(Signal::SIGTERM, &ours) }.unwrap();

    let supervisor = fast_supervisor().with_signal_interception(false);
    let result = supervisor.execute(Some(Duration::from_secs(5)), || {
        raise(Signal::SIGTERM).unwrap();
        Ok::<_, Infallible>(())
    });

    // No abort recorded: the call completes normally
    assert!(result.is_ok());
    assert!(PRIOR_HANDLER_CAUGHT.load(Ordering::SeqCst));

    unsafe { sigaction(Signal::SIGTERM, &saved) }.unwrap();
}
