//! Component C: the pre-exec wait, grounded on
//! `original_source/case.c`'s `case_wait_child`.

use super::TraceContext;
use crate::rusage::{cpu_time_ms, minor_fault_memory_kb, vm_size_kb, wait4};
use crate::verdict::{CaseResult, Verdict};
use nix::sys::ptrace;
use nix::sys::signal::Signal;
use nix::sys::wait::WaitStatus;
use nix::unistd::Pid;
use std::os::unix::io::RawFd;

/// Waits once for the tracee's first stop. On the expected path — a
/// `SIGTRAP` at the `execve` boundary, with the tracee's VM size already
/// within the memory limit — resumes it in syscall-stop mode and returns a
/// `TraceContext` baseline for the monitor. Any other outcome is already a
/// final verdict; the tracee is unconditionally killed before returning.
pub fn wait_for_exec(
    pid: Pid,
    pipe_read: RawFd,
    memory_limit_kb: u64,
) -> std::result::Result<TraceContext, CaseResult> {
    let (status, usage) = match wait4(pid) {
        Ok(v) => v,
        Err(e) => {
            crate::case::kill_unconditionally(pid);
            return Err(ie(format!("wait4 error: {}", e)));
        }
    };

    match status {
        WaitStatus::Stopped(child, Signal::SIGTRAP) => {
            let regs = match ptrace::getregs(child) {
                Ok(r) => r,
                Err(e) => {
                    crate::case::kill_unconditionally(child);
                    return Err(ie(format!("ptrace(GETREGS) error: {}", e)));
                }
            };

            if regs.orig_rax as i64 != libc::SYS_execve {
                crate::case::kill_unconditionally(child);
                return Err(ie(format!(
                    "child stopped at unexpected syscall = {}",
                    regs.orig_rax as i64
                )));
            }

            let within_limit = matches!(vm_size_kb(child), Ok(kb) if kb <= memory_limit_kb);
            if !within_limit {
                crate::case::kill_unconditionally(child);
                return Err(CaseResult::plain(Verdict::MemoryLimitExceeded));
            }

            if let Err(e) = ptrace::syscall(child, None) {
                crate::case::kill_unconditionally(child);
                return Err(ie(format!("ptrace(SYSCALL) error: {}", e)));
            }

            let pre_time_ms = cpu_time_ms(&usage);
            let pre_memory_kb = minor_fault_memory_kb(&usage);
            log::debug!(
                "pid {}: execve stop, baseline time={}ms memory={}kb",
                child,
                pre_time_ms,
                pre_memory_kb
            );

            Ok(TraceContext {
                pid: child,
                pre_time_ms,
                pre_memory_kb,
            })
        }

        WaitStatus::Exited(_, 1) => Err(ie(read_pipe_diagnostic(pipe_read))),

        WaitStatus::Exited(_, 2) => Err(ie("exec of candidate program failed".to_string())),

        WaitStatus::Exited(_, code) => {
            Err(ie(format!("child exited before exec: value = {}", code)))
        }

        WaitStatus::Signaled(_, sig, _) => Err(ie(format!(
            "child terminated before exec: signal = {}",
            sig as i32
        ))),

        other => {
            crate::case::kill_unconditionally(pid);
            Err(ie(format!("unexpected status before exec: {:?}", other)))
        }
    }
}

fn read_pipe_diagnostic(pipe_read: RawFd) -> String {
    let mut buf = [0u8; 1024];
    // SAFETY: buf is a valid out-buffer of the given length; pipe_read is
    // the parent's end of the control pipe.
    let n = unsafe { libc::read(pipe_read, buf.as_mut_ptr() as *mut libc::c_void, buf.len()) };
    if n > 0 {
        String::from_utf8_lossy(&buf[..n as usize]).into_owned()
    } else {
        "pre-exec setup failed with no diagnostic".to_string()
    }
}

fn ie(msg: String) -> CaseResult {
    CaseResult::with_diagnostic(Verdict::InternalError, msg)
}
