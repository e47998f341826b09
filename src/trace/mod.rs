//! Components C and D: the ptrace-driven state machine that takes a
//! tracee from its post-`execve` stop through to normal exit or an
//! abnormal-termination verdict.

pub mod monitor;
pub mod waiter;

use nix::unistd::Pid;

/// Parent-side per-case tracing baseline, handed from the pre-exec waiter
/// to the execution monitor (spec §3 `TraceContext`).
pub struct TraceContext {
    pub pid: Pid,
    pub pre_time_ms: u64,
    pub pre_memory_kb: u64,
}

/// Syscall-stop parity. A freshly `PTRACE_SYSCALL`-resumed tracee's next
/// stop is always an entry stop, so the monitor starts at `Exit` and
/// toggles on every `SIGTRAP` (spec §4.D, §9).
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum Direction {
    Entry,
    Exit,
}

impl Direction {
    pub fn toggle(self) -> Self {
        match self {
            Direction::Entry => Direction::Exit,
            Direction::Exit => Direction::Entry,
        }
    }
}

/// Resource usage recorded at the tracee's normal exit, still needing the
/// final used-time/used-memory-vs-limit check against `pre_*` (done by
/// `case.rs`).
pub struct MonitorOutcome {
    pub last_time_ms: u64,
    pub last_memory_kb: u64,
}
