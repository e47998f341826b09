//! Component D: the execution monitor, grounded on
//! `original_source/case.c`'s `case_monitor_child` and `case_signal_ok`.

use super::{Direction, MonitorOutcome, TraceContext};
use crate::rusage::{cpu_time_ms, minor_fault_memory_kb, vm_size_kb, wait4};
use crate::syscalls;
use crate::verdict::{CaseResult, Verdict};
use crate::watchdog;
use nix::errno::Errno;
use nix::sys::ptrace;
use nix::sys::signal::Signal;
use nix::sys::wait::WaitStatus;

/// Drives the tracee across syscall-stop pairs until it exits normally, a
/// disallowed syscall is observed at entry, a memory-affecting syscall's
/// exit leaves it over the memory limit, a fatal signal arrives, or the
/// watchdog fires. On normal exit, returns the resource usage recorded at
/// that point so `case.rs` can do the final used-time/used-memory check.
pub fn run(
    ctx: &TraceContext,
    time_limit_ms: u32,
    memory_limit_kb: u64,
) -> std::result::Result<MonitorOutcome, CaseResult> {
    if let Err(e) = watchdog::install_handler() {
        crate::case::kill_unconditionally(ctx.pid);
        return Err(ie(format!("sigaction(SIGALRM) error: {}", e)));
    }
    let alarm_secs = if time_limit_ms % 1000 == 0 {
        time_limit_ms / 1000 + 2
    } else {
        time_limit_ms / 1000 + 3
    };
    watchdog::arm(alarm_secs);

    let mut direction = Direction::Exit;

    let outcome = loop {
        match wait4(ctx.pid) {
            Err(crate::error::SandboxError::Errno(Errno::EINTR)) if watchdog::timed_out() => {
                crate::case::kill_unconditionally(ctx.pid);
                break Err(CaseResult::plain(Verdict::TimeLimitExceeded));
            }
            Err(e) => {
                crate::case::kill_unconditionally(ctx.pid);
                break Err(ie(format!("wait4 error: {}", e)));
            }
            Ok((status, usage)) => match status {
                WaitStatus::Signaled(_, sig, _) => {
                    break Err(CaseResult::with_diagnostic(
                        Verdict::RuntimeErrorInternal,
                        format!("child killed by signal = {}", sig as i32),
                    ));
                }

                WaitStatus::Stopped(pid, Signal::SIGTRAP) => {
                    direction = direction.toggle();
                    log::debug!("pid {}: syscall-stop, direction={:?}", pid, direction);

                    let regs = match ptrace::getregs(pid) {
                        Ok(r) => r,
                        Err(e) => {
                            crate::case::kill_unconditionally(pid);
                            break Err(ie(format!("ptrace(GETREGS) error: {}", e)));
                        }
                    };
                    let nr = regs.orig_rax as i64;

                    if direction == Direction::Entry && !syscalls::is_valid(nr) {
                        crate::case::kill_unconditionally(pid);
                        break Err(CaseResult::with_diagnostic(
                            Verdict::RuntimeErrorInternal,
                            format!("syscall = {}", nr),
                        ));
                    }

                    if direction == Direction::Exit && syscalls::affects_memory(nr) {
                        let over_limit = !matches!(vm_size_kb(pid), Ok(kb) if kb <= memory_limit_kb);
                        if over_limit {
                            crate::case::kill_unconditionally(pid);
                            break Err(CaseResult::plain(Verdict::MemoryLimitExceeded));
                        }
                    }

                    if let Err(e) = ptrace::syscall(pid, None) {
                        crate::case::kill_unconditionally(pid);
                        break Err(ie(format!("ptrace(SYSCALL) error: {}", e)));
                    }
                }

                WaitStatus::Stopped(pid, signo) => match classify_signal(signo) {
                    Some(verdict) => {
                        crate::case::kill_unconditionally(pid);
                        break Err(verdict);
                    }
                    None => {
                        // Other signals pass through undelivered rather
                        // than being forwarded to the tracee (spec §9).
                        log::warn!("pid {}: signal {:?} passed through undelivered", pid, signo);
                        if let Err(e) = ptrace::syscall(pid, None) {
                            crate::case::kill_unconditionally(pid);
                            break Err(ie(format!("ptrace(SYSCALL) error: {}", e)));
                        }
                    }
                },

                WaitStatus::Exited(_, _code) => {
                    break Ok(MonitorOutcome {
                        last_time_ms: cpu_time_ms(&usage),
                        last_memory_kb: minor_fault_memory_kb(&usage),
                    });
                }

                other => {
                    crate::case::kill_unconditionally(ctx.pid);
                    break Err(ie(format!("unexpected status: {:?}", other)));
                }
            },
        }
    };

    watchdog::disarm();
    outcome
}

fn classify_signal(signo: Signal) -> Option<CaseResult> {
    match signo {
        Signal::SIGXCPU => Some(CaseResult::plain(Verdict::TimeLimitExceeded)),
        Signal::SIGXFSZ => Some(CaseResult::plain(Verdict::OutputLimitExceeded)),
        Signal::SIGFPE => Some(CaseResult::with_diagnostic(
            Verdict::RuntimeErrorUser,
            "Floating point exception",
        )),
        Signal::SIGSEGV => Some(CaseResult::with_diagnostic(
            Verdict::RuntimeErrorUser,
            "Invalid memory reference",
        )),
        _ => None,
    }
}

fn ie(msg: String) -> CaseResult {
    CaseResult::with_diagnostic(Verdict::InternalError, msg)
}
