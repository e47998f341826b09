//! CPU-time and memory accounting helpers shared by the pre-exec waiter
//! and the execution monitor.
//!
//! Grounded on `original_source/case.c`: `pre_time`/`lst_time` come from
//! `ru_utime`/`ru_stime` in the `rusage` struct `wait4`/`wait3` fills in;
//! `pre_memory`/`lst_memory` are *not* RSS — they're minor-fault count
//! times the page size, an approximation the original source relies on.
//! We preserve that approximation rather than switching to a direct RSS
//! read (see spec §9).

use crate::error::{Result, SandboxError};
use nix::sys::wait::WaitStatus;
use nix::unistd::Pid;
use std::fs;

/// Milliseconds of user+system CPU time consumed according to a
/// `getrusage`-style record.
pub fn cpu_time_ms(usage: &libc::rusage) -> u64 {
    let user_ms = usage.ru_utime.tv_sec as u64 * 1000 + usage.ru_utime.tv_usec as u64 / 1000;
    let sys_ms = usage.ru_stime.tv_sec as u64 * 1000 + usage.ru_stime.tv_usec as u64 / 1000;
    user_ms + sys_ms
}

/// Minor-fault-based memory approximation, in KiB, matching the original
/// `case_wait_child`/`case_monitor_child` arithmetic: `ru_minflt * page_size / 1024`.
pub fn minor_fault_memory_kb(usage: &libc::rusage) -> u64 {
    let page_size = page_size_bytes();
    (usage.ru_minflt as u64 * page_size) / 1024
}

fn page_size_bytes() -> u64 {
    // SAFETY: sysconf(_SC_PAGESIZE) has no preconditions and never fails
    // on a running Linux process.
    unsafe { libc::sysconf(libc::_SC_PAGESIZE) as u64 }
}

/// Reads a child's total virtual memory size from `/proc/<pid>/statm`, in
/// KiB. `statm`'s first field is the process's size in pages.
///
/// The original C sandbox treats a failure to open `/proc/<pid>/statm` as
/// "over the memory limit" (a fail-closed default for a process that may
/// already be gone); we preserve that by surfacing the failure as an
/// error the caller turns into MLE rather than propagating it as an IE,
/// except where the process has genuinely vanished out from under us for
/// reasons unrelated to memory (handled by the caller via `SandboxError`).
pub fn vm_size_kb(pid: nix::unistd::Pid) -> Result<u64> {
    let path = format!("/proc/{}/statm", pid);
    let contents = fs::read_to_string(&path).map_err(SandboxError::Io)?;
    let pages: u64 = contents
        .split_whitespace()
        .next()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| SandboxError::fatal("statm", format!("unparseable contents of {}", path)))?;
    Ok((pages * page_size_bytes()) / 1024)
}

/// `wait4(2)`, which `nix` does not expose safely. The waiter and monitor
/// need the `rusage` accumulated *so far* at every syscall-stop, not just
/// at final reap time, which is what the original sandbox's `wait3`/`wait4`
/// calls gave it and `nix::sys::resource::getrusage(RUSAGE_CHILDREN)`
/// cannot reproduce for a still-running ptraced child.
pub fn wait4(pid: Pid) -> Result<(WaitStatus, libc::rusage)> {
    let mut status: libc::c_int = 0;
    let mut usage: libc::rusage = unsafe { std::mem::zeroed() };

    // SAFETY: status/usage are valid out-params per wait4(2); pid is a
    // valid, live Pid owned by this process.
    let ret = unsafe { libc::wait4(pid.as_raw(), &mut status, 0, &mut usage) };
    if ret == -1 {
        return Err(SandboxError::Errno(nix::Error::last()));
    }

    let wait_status = WaitStatus::from_raw(Pid::from_raw(ret), status)
        .map_err(SandboxError::Errno)?;
    Ok((wait_status, usage))
}
