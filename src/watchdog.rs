//! Wall-clock cancellation for the two blocking waits in this supervisor
//! (the execution monitor's `waitpid` loop, and the dynamic comparator's
//! wait on the judge). Spec §9 calls this out as a deliberate departure
//! from the original C sandbox's `jmp_buf`/`longjmp` escape: instead of a
//! non-local jump out of the signal handler, the handler only flips an
//! `AtomicBool`. The blocking call returns `EINTR` (no `SA_RESTART`), and
//! the caller checks the flag right there and converts it into a verdict.

use crate::error::Result;
use nix::sys::signal::{self, SaFlags, SigAction, SigHandler, SigSet, Signal};
use nix::unistd::alarm;
use std::sync::atomic::{AtomicBool, Ordering};

static TIMED_OUT: AtomicBool = AtomicBool::new(false);

extern "C" fn on_alarm(_: libc::c_int) {
    TIMED_OUT.store(true, Ordering::SeqCst);
}

/// Installs the `SIGALRM` handler. Idempotent — cheap enough to call
/// before every monitor/comparator invocation rather than threading a
/// once-only guard through the driver. A failure here is a sandbox bug,
/// not a candidate fault, so it's surfaced as a `SandboxError` for the
/// caller to fold into an `InternalError` verdict rather than a panic
/// (`original_source/case.c`'s `case_monitor_child` treats `signal(2)`
/// returning `SIG_ERR` as `EXIT_IE`, not a crash).
pub fn install_handler() -> Result<()> {
    let action = SigAction::new(
        SigHandler::Handler(on_alarm),
        SaFlags::empty(),
        SigSet::empty(),
    );
    // SAFETY: `on_alarm` performs a single atomic store, which is
    // async-signal-safe.
    unsafe { signal::sigaction(Signal::SIGALRM, &action) }?;
    Ok(())
}

/// Arms the watchdog for `secs` seconds and clears any stale flag left
/// over from a previous case.
pub fn arm(secs: u32) {
    TIMED_OUT.store(false, Ordering::SeqCst);
    alarm::set(secs);
}

/// Disarms the watchdog. Called on every exit path of the guarded section,
/// mirroring the original's `alarm(0)` at each return point.
pub fn disarm() {
    alarm::cancel();
    TIMED_OUT.store(false, Ordering::SeqCst);
}

/// Whether the watchdog fired since the last `arm`.
pub fn timed_out() -> bool {
    TIMED_OUT.load(Ordering::SeqCst)
}
