//! Component G: the verdict taxonomy and its fixed stdout rendering.
//!
//! `Verdict::render` is a pure function so the output shape can be
//! unit-tested without spawning a process; `emit` is the thin `println!`
//! wrapper the driver actually calls.

use std::fmt;

/// The fixed verdict taxonomy. Discriminants are the status-code line
/// printed as the first line of output (see `original_source/global.h`'s
/// `enum estatus`); preserved here rather than renumbered, since that
/// ordering is part of the external stdout contract.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Verdict {
    Accepted,
    PresentationError,
    WrongAnswer,
    /// Runtime error the candidate's own author should see (SIGFPE, SIGSEGV).
    RuntimeErrorUser,
    /// Runtime error attributable to the candidate doing something
    /// forbidden (disallowed syscall, unexpected termination); shown with
    /// an internal diagnostic rather than echoed to the end user.
    RuntimeErrorInternal,
    TimeLimitExceeded,
    MemoryLimitExceeded,
    OutputLimitExceeded,
    InternalError,
    ExternalError,
}

impl Verdict {
    fn code(self) -> u8 {
        use Verdict::*;
        match self {
            Accepted => 0,
            PresentationError => 1,
            WrongAnswer => 2,
            RuntimeErrorUser => 3,
            RuntimeErrorInternal => 4,
            TimeLimitExceeded => 5,
            MemoryLimitExceeded => 6,
            OutputLimitExceeded => 7,
            InternalError => 8,
            ExternalError => 9,
        }
    }

    fn label(self) -> &'static str {
        use Verdict::*;
        match self {
            Accepted => "Accepted",
            PresentationError => "Presentation Error",
            WrongAnswer => "Wrong Answer",
            RuntimeErrorUser | RuntimeErrorInternal => "Runtime Error",
            TimeLimitExceeded => "Time Limit Exceeded",
            MemoryLimitExceeded => "Memory Limit Exceeded",
            OutputLimitExceeded => "Output Limit Exceeded",
            InternalError => "Internal Error",
            ExternalError => "External Error",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// The outcome of one test case. `time_ms`/`memory_kb` are only
/// meaningful for `Accepted`; `diagnostic` is only meaningful for the
/// error-bearing verdicts.
#[derive(Clone, Debug)]
pub struct CaseResult {
    pub verdict: Verdict,
    pub time_ms: u64,
    pub memory_kb: u64,
    pub diagnostic: String,
}

impl CaseResult {
    pub fn accepted(time_ms: u64, memory_kb: u64) -> Self {
        CaseResult {
            verdict: Verdict::Accepted,
            time_ms,
            memory_kb,
            diagnostic: String::new(),
        }
    }

    pub fn plain(verdict: Verdict) -> Self {
        CaseResult {
            verdict,
            time_ms: 0,
            memory_kb: 0,
            diagnostic: String::new(),
        }
    }

    pub fn with_diagnostic(verdict: Verdict, diagnostic: impl Into<String>) -> Self {
        CaseResult {
            verdict,
            time_ms: 0,
            memory_kb: 0,
            diagnostic: diagnostic.into(),
        }
    }

    pub fn is_accepted(&self) -> bool {
        self.verdict == Verdict::Accepted
    }

    /// Renders the fixed §4.G shape: a status-code line, a human label,
    /// then verdict-specific trailing lines.
    pub fn render(&self) -> String {
        use Verdict::*;
        let mut out = format!("{}\n{}\n", self.verdict.code(), self.verdict.label());
        match self.verdict {
            Accepted => {
                out.push_str(&format!("{}ms\n{}kb\n", self.time_ms, self.memory_kb));
            }
            PresentationError | WrongAnswer | TimeLimitExceeded | MemoryLimitExceeded
            | OutputLimitExceeded => {}
            InternalError | ExternalError | RuntimeErrorUser | RuntimeErrorInternal => {
                out.push_str(&self.diagnostic);
                out.push('\n');
            }
        }
        out
    }

    /// Writes the rendered verdict to stdout and returns the process exit
    /// code — always 0; abnormal termination of this process would itself
    /// be a failure mode (spec §7).
    pub fn emit(&self) -> i32 {
        match self.verdict {
            Verdict::Accepted => log::info!(
                "case stream complete: {} ({}ms, {}kb)",
                self.verdict,
                self.time_ms,
                self.memory_kb
            ),
            Verdict::InternalError | Verdict::ExternalError | Verdict::RuntimeErrorInternal => {
                log::error!("{}: {}", self.verdict, self.diagnostic)
            }
            _ => log::info!("{}", self.verdict),
        }
        print!("{}", self.render());
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_accepted_with_time_and_memory() {
        let r = CaseResult::accepted(123, 4096);
        assert_eq!(r.render(), "0\nAccepted\n123ms\n4096kb\n");
    }

    #[test]
    fn renders_plain_verdicts_with_no_trailer() {
        for (v, code, label) in [
            (Verdict::PresentationError, 1, "Presentation Error"),
            (Verdict::WrongAnswer, 2, "Wrong Answer"),
            (Verdict::TimeLimitExceeded, 5, "Time Limit Exceeded"),
            (Verdict::MemoryLimitExceeded, 6, "Memory Limit Exceeded"),
            (Verdict::OutputLimitExceeded, 7, "Output Limit Exceeded"),
        ] {
            let r = CaseResult::plain(v);
            assert_eq!(r.render(), format!("{}\n{}\n", code, label));
        }
    }

    #[test]
    fn renders_error_verdicts_with_diagnostic() {
        let r = CaseResult::with_diagnostic(Verdict::RuntimeErrorInternal, "syscall = 41");
        assert_eq!(r.render(), "4\nRuntime Error\nsyscall = 41\n");

        let r = CaseResult::with_diagnostic(Verdict::InternalError, "fork error: oh no");
        assert_eq!(r.render(), "8\nInternal Error\nfork error: oh no\n");
    }
}
