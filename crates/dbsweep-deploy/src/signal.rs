//! Ctrl+C handling for long-running sweeps.
//!
//! - First signal: sets the shutdown flag. The benchmark phase in flight is
//!   left to finish, but no further phase is started.
//! - Second signal: immediate process exit.
//!
//! Handles SIGINT, SIGTERM, and SIGHUP (terminal hangup).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use parking_lot::{Condvar, Mutex};
use signal_hook::consts::TERM_SIGNALS;
use signal_hook::flag;

#[cfg(unix)]
use signal_hook::consts::signal::SIGHUP;

static SHUTDOWN_REQUESTED: AtomicBool = AtomicBool::new(false);

static INSTALLED: AtomicBool = AtomicBool::new(false);

static SHUTDOWN_CONDVAR: OnceLock<(Mutex<bool>, Condvar)> = OnceLock::new();

fn shutdown_condvar() -> &'static (Mutex<bool>, Condvar) {
    SHUTDOWN_CONDVAR.get_or_init(|| (Mutex::new(false), Condvar::new()))
}

/// Install signal handlers for graceful shutdown.
///
/// Safe to call multiple times; subsequent calls are no-ops.
///
/// # Errors
///
/// Returns an error if a signal handler cannot be registered.
pub fn install_signal_handler() -> Result<(), std::io::Error> {
    if INSTALLED.swap(true, Ordering::SeqCst) {
        return Ok(());
    }

    let shutdown = Arc::new(AtomicBool::new(false));

    for &sig in TERM_SIGNALS {
        // Second signal terminates immediately if shutdown already requested
        flag::register_conditional_shutdown(sig, 130, Arc::clone(&shutdown))?;
        flag::register(sig, Arc::clone(&shutdown))?;
    }

    #[cfg(unix)]
    {
        flag::register_conditional_shutdown(SIGHUP, 130, Arc::clone(&shutdown))?;
        flag::register(SIGHUP, Arc::clone(&shutdown))?;
    }

    let watched = Arc::clone(&shutdown);
    std::thread::Builder::new()
        .name("dbsweep-signal".to_string())
        .spawn(move || {
            while !watched.load(Ordering::Relaxed) {
                std::thread::sleep(Duration::from_millis(50));
            }
            request_shutdown();
            eprintln!(
                "\nShutdown requested: finishing the current phase (Ctrl+C again to force exit)"
            );
        })?;

    Ok(())
}

/// Mark shutdown as requested and wake every waiter.
///
/// Called by the signal watcher; also usable to stop a sweep programmatically.
pub fn request_shutdown() {
    SHUTDOWN_REQUESTED.store(true, Ordering::SeqCst);
    let (lock, cvar) = shutdown_condvar();
    let mut guard = lock.lock();
    *guard = true;
    cvar.notify_all();
}

/// Check if shutdown was requested.
pub fn shutdown_requested() -> bool {
    SHUTDOWN_REQUESTED.load(Ordering::SeqCst)
}

/// Sleep for `timeout`, waking early if shutdown is requested.
///
/// Returns `true` if shutdown was requested, `false` if the full timeout
/// elapsed.
pub fn wait_for_shutdown_timeout(timeout: Duration) -> bool {
    if shutdown_requested() {
        return true;
    }

    let (lock, cvar) = shutdown_condvar();
    let mut guard = lock.lock();

    if shutdown_requested() {
        return true;
    }

    let result = cvar.wait_while_for(&mut guard, |signalled| !*signalled, timeout);
    !result.timed_out() || shutdown_requested()
}

/// Clear shutdown state.
pub fn clear_shutdown() {
    SHUTDOWN_REQUESTED.store(false, Ordering::SeqCst);
    let (lock, _cvar) = shutdown_condvar();
    *lock.lock() = false;
}
