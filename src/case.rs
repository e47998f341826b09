//! Per-case orchestration: forks the tracee, wires up the control pipe,
//! and runs the pre-exec wait, execution monitor, and comparator in
//! sequence, grounded on `original_source/case.c`'s `case_run_test`.

use crate::child::ChildSetup;
use crate::compare;
use crate::error::{Result, SandboxError};
use crate::trace::{monitor, waiter};
use crate::verdict::{CaseResult, Verdict};
use nix::sys::signal::{kill, Signal};
use nix::unistd::{close, fork, ForkResult, Pid};
use std::ffi::CString;
use std::os::unix::io::RawFd;
use std::path::Path;

/// One test case's inputs: the already-open input/output fds, the
/// resource limits, the candidate's argv, and the answer path to compare
/// against.
pub struct CaseInput<'a> {
    pub infd: RawFd,
    pub outfd: RawFd,
    pub time_ms: u32,
    pub memory_kb: u32,
    pub fsize_kb: u32,
    pub who: u32,
    pub basedir: &'a Path,
    pub command: &'a [CString],
    pub answer: &'a Path,
}

/// Runs one (input, answer) test case end to end and returns its verdict.
/// Never panics: any internal failure collapses to an `InternalError`
/// `CaseResult` rather than propagating.
pub fn run_test(input: &CaseInput) -> CaseResult {
    match run_test_inner(input) {
        Ok(result) => result,
        Err(e) => CaseResult::with_diagnostic(Verdict::InternalError, e.to_string()),
    }
}

fn run_test_inner(input: &CaseInput) -> Result<CaseResult> {
    let (pipe_read, pipe_write) = raw_pipe()?;

    let setup = ChildSetup {
        infd: input.infd,
        outfd: input.outfd,
        pipe_write,
        time_ms: input.time_ms,
        fsize_kb: input.fsize_kb,
        basedir: input.basedir,
        who: input.who,
        command: input.command,
    };

    // SAFETY: single-threaded parent; the child only calls
    // async-signal-safe operations before it execs (see `child.rs`).
    let pid = match unsafe { fork() }? {
        ForkResult::Child => setup.run(pipe_read),
        ForkResult::Parent { child } => child,
    };
    let _ = close(pipe_write);

    let ctx = match waiter::wait_for_exec(pid, pipe_read, input.memory_kb as u64) {
        Ok(ctx) => ctx,
        Err(result) => {
            let _ = close(pipe_read);
            return Ok(result);
        }
    };
    let _ = close(pipe_read);

    let outcome = match monitor::run(&ctx, input.time_ms, input.memory_kb as u64) {
        Ok(outcome) => outcome,
        Err(result) => return Ok(result),
    };

    let verdict = match compare::compare(input.outfd, input.answer) {
        Ok(v) => v,
        Err(result) => return Ok(result),
    };
    if verdict != Verdict::Accepted {
        return Ok(CaseResult::plain(verdict));
    }

    let used_time_ms = outcome.last_time_ms.saturating_sub(ctx.pre_time_ms);
    let used_memory_kb = outcome.last_memory_kb.saturating_sub(ctx.pre_memory_kb);

    if used_time_ms > input.time_ms as u64 {
        return Ok(CaseResult::plain(Verdict::TimeLimitExceeded));
    }
    if used_memory_kb > input.memory_kb as u64 {
        return Ok(CaseResult::plain(Verdict::MemoryLimitExceeded));
    }

    Ok(CaseResult::accepted(used_time_ms, used_memory_kb))
}

pub(crate) fn raw_pipe() -> Result<(RawFd, RawFd)> {
    let mut fds = [0i32; 2];
    // SAFETY: fds is a valid two-element out-param per pipe(2).
    let rc = unsafe { libc::pipe(fds.as_mut_ptr()) };
    if rc != 0 {
        return Err(SandboxError::Io(std::io::Error::last_os_error()));
    }
    Ok((fds[0], fds[1]))
}

/// Sends `SIGKILL` unconditionally. If the first attempt is rejected with
/// `EPERM` because the parent's effective uid had been dropped, swaps
/// real/effective uid back to root for the retry, then restores the drop
/// (spec §5/§9, "privilege juggling").
pub(crate) fn kill_unconditionally(pid: Pid) {
    if kill(pid, Signal::SIGKILL).is_ok() {
        return;
    }
    let euid = nix::unistd::geteuid();
    let uid = nix::unistd::getuid();
    let _ = nix::unistd::setreuid(euid, uid);
    let _ = kill(pid, Signal::SIGKILL);
    let _ = nix::unistd::setreuid(euid, uid);
}
