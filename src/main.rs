//! Component G entry point: establishes the process-identity prerequisites
//! (spec §6), parses and validates argv into a `Condition`, drives the
//! case loop, and emits exactly one verdict.
//!
//! Grounded on `original_source/main.c`'s `main` for the identity dance,
//! and on the teacher's `commands/trace_info_command.rs` for the
//! "parse options, run, print" entry-point shape.

mod case;
mod child;
mod cli;
mod compare;
mod driver;
mod error;
mod manifest;
mod rusage;
mod syscalls;
mod trace;
mod verdict;
mod watchdog;

use cli::Condition;
use error::{Result, SandboxError};
use nix::unistd::{getegid, geteuid, getgid, getuid, setreuid, Uid};
use verdict::{CaseResult, Verdict};

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let result = match check_identity_prerequisites().and_then(|()| {
        let args: Vec<String> = std::env::args().skip(1).collect();
        Condition::parse_args(args)
    }) {
        Ok(condition) => {
            log::info!(
                "starting run: t={}ms m={}kb f={}kb who={}",
                condition.time_ms,
                condition.memory_kb,
                condition.fsize_kb,
                condition.who
            );
            driver::run(&condition)
        }
        Err(e) => CaseResult::with_diagnostic(Verdict::ExternalError, e.to_string()),
    };

    std::process::exit(result.emit());
}

/// Verifies the prerequisites spec §6 requires of the process's identity —
/// effective uid 0, effective gid nonzero, real uid/gid nonzero — then
/// swaps real and effective uid so the process runs unprivileged by
/// default, regaining privilege only transiently (child setup, a forced
/// kill) via `setreuid` the way `case::kill_unconditionally` does.
fn check_identity_prerequisites() -> Result<()> {
    if !geteuid().is_root() {
        return Err(SandboxError::fatal(
            "identity",
            "effective uid must be 0",
        ));
    }
    if getegid().as_raw() == 0 {
        return Err(SandboxError::fatal(
            "identity",
            "effective gid must be nonzero",
        ));
    }
    if getuid().is_root() {
        return Err(SandboxError::fatal("identity", "real uid must be nonzero"));
    }
    if getgid().as_raw() == 0 {
        return Err(SandboxError::fatal("identity", "real gid must be nonzero"));
    }

    setreuid(Uid::from_raw(geteuid().as_raw()), getuid()).map_err(SandboxError::Errno)?;
    Ok(())
}
