//! Component H: command-line parsing and validation (spec §6, §4.H).
//!
//! `--end` is handled outside `structopt`'s own parsing: everything after
//! that literal token is the candidate's own argv and must never be
//! interpreted as one of this program's flags. The flags that precede it
//! are parsed and validated the ordinary `structopt` way, the same shape
//! the teacher's `flags.rs` used for its own option struct.

use crate::error::{Result, SandboxError};
use std::ffi::CString;
use std::path::PathBuf;
use structopt::StructOpt;

#[derive(StructOpt, Debug)]
#[structopt(
    name = "oj-runner",
    about = "Traced-child supervisor for an online-judge execution sandbox"
)]
struct Opt {
    #[structopt(short = "t")]
    time_ms: u32,
    #[structopt(short = "m")]
    memory_kb: u32,
    #[structopt(short = "f")]
    fsize_kb: u32,
    #[structopt(long = "who")]
    who: u32,
    #[structopt(long = "basedir", parse(from_os_str))]
    basedir: PathBuf,
    #[structopt(long = "datadir", parse(from_os_str))]
    datadir: PathBuf,
    #[structopt(long = "magic")]
    magic: String,
}

/// The validated run condition (spec §3 `Condition`).
pub struct Condition {
    pub time_ms: u32,
    pub memory_kb: u32,
    pub fsize_kb: u32,
    pub who: u32,
    pub basedir: PathBuf,
    pub datadir: PathBuf,
    pub magic: String,
    pub command: Vec<CString>,
}

impl Condition {
    pub fn parse_args(args: Vec<String>) -> Result<Self> {
        let end_pos = args
            .iter()
            .position(|a| a == "--end")
            .ok_or(SandboxError::InvalidArgument { flag: "--end" })?;

        let (head, tail) = args.split_at(end_pos);
        let command_args = &tail[1..];
        if command_args.is_empty() {
            return Err(SandboxError::InvalidArgument { flag: "--end" });
        }

        let mut argv0 = vec!["oj-runner".to_string()];
        argv0.extend_from_slice(head);
        let opt = Opt::from_iter_safe(argv0).map_err(|e| SandboxError::fatal("cli", e))?;

        let command = command_args
            .iter()
            .map(|s| {
                CString::new(s.as_str())
                    .map_err(|e| SandboxError::fatal("cli", format!("argv contains NUL: {}", e)))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Condition {
            time_ms: require_positive("-t", opt.time_ms)?,
            memory_kb: require_positive("-m", opt.memory_kb)?,
            fsize_kb: require_positive("-f", opt.fsize_kb)?,
            who: require_positive("--who", opt.who)?,
            basedir: opt.basedir,
            datadir: opt.datadir,
            magic: opt.magic,
            command,
        })
    }
}

fn require_positive(flag: &'static str, value: u32) -> Result<u32> {
    if value == 0 {
        Err(SandboxError::InvalidArgument { flag })
    } else {
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(s: &str) -> Vec<String> {
        s.split_whitespace().map(String::from).collect()
    }

    #[test]
    fn parses_a_well_formed_invocation() {
        let cond = Condition::parse_args(args(
            "-t 1000 -m 65536 -f 1024 --who 1001 --basedir /tmp --datadir /tmp/data --magic abc123 --end /bin/cat",
        ))
        .unwrap();
        assert_eq!(cond.time_ms, 1000);
        assert_eq!(cond.memory_kb, 65536);
        assert_eq!(cond.who, 1001);
        assert_eq!(cond.command.len(), 1);
    }

    #[test]
    fn rejects_missing_end() {
        assert!(Condition::parse_args(args(
            "-t 1000 -m 65536 -f 1024 --who 1001 --basedir /tmp --datadir /tmp --magic abc"
        ))
        .is_err());
    }

    #[test]
    fn rejects_zero_time_limit() {
        assert!(Condition::parse_args(args(
            "-t 0 -m 65536 -f 1024 --who 1001 --basedir /tmp --datadir /tmp --magic abc --end /bin/cat"
        ))
        .is_err());
    }

    #[test]
    fn rejects_empty_command_after_end() {
        assert!(Condition::parse_args(args(
            "-t 1000 -m 65536 -f 1024 --who 1001 --basedir /tmp --datadir /tmp --magic abc --end"
        ))
        .is_err());
    }

    #[test]
    fn candidates_own_flags_are_not_parsed_as_ours() {
        let cond = Condition::parse_args(args(
            "-t 1000 -m 65536 -f 1024 --who 1001 --basedir /tmp --datadir /tmp --magic abc --end /bin/prog -t 99 -m",
        ))
        .unwrap();
        assert_eq!(cond.command.len(), 4);
        assert_eq!(cond.time_ms, 1000);
    }
}
