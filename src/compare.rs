//! Component E: the output comparator, grounded on
//! `original_source/case.c`'s `case_compare_answer` and its two branches
//! (`case_compare_static`, `case_compare_dynamic`).

use crate::verdict::{CaseResult, Verdict};
use crate::watchdog;
use memmap2::Mmap;
use nix::errno::Errno;
use nix::sys::wait::WaitStatus;
use nix::unistd::{close, dup2, execv, fork, setuid, ForkResult, Uid};
use std::ffi::CString;
use std::fs::File;
use std::os::unix::ffi::OsStrExt;
use std::os::unix::io::{FromRawFd, RawFd};
use std::path::Path;

type CompareResult = std::result::Result<Verdict, CaseResult>;

/// Decides AC/PE/WA (or an error verdict) for one case's captured output.
/// A `.exe` answer path is a dynamic (program) judge; anything else is
/// compared as a static answer file.
pub fn compare(outfd: RawFd, answer_path: &Path) -> CompareResult {
    if answer_path.to_string_lossy().ends_with(".exe") {
        compare_dynamic(outfd, answer_path)
    } else {
        compare_static(outfd, answer_path)
    }
}

fn compare_static(outfd: RawFd, answer_path: &Path) -> CompareResult {
    let answer_file = File::open(answer_path)
        .map_err(|e| ee(format!("open {} error: {}", answer_path.display(), e)))?;
    let out_file = dup_as_file(outfd).map_err(|e| ie(format!("dup of output error: {}", e)))?;

    let out_len = out_file
        .metadata()
        .map_err(|e| ie(format!("stat of output error: {}", e)))?
        .len();
    let ans_len = answer_file
        .metadata()
        .map_err(|e| ie(format!("stat of {} error: {}", answer_path.display(), e)))?
        .len();

    if out_len == 0 {
        return Ok(Verdict::WrongAnswer);
    }
    if ans_len == 0 {
        return Err(ee(format!("no data in {}", answer_path.display())));
    }

    // SAFETY: both files are read-only and not modified elsewhere in this
    // process for the lifetime of the mapping.
    let out_map =
        unsafe { Mmap::map(&out_file) }.map_err(|e| ie(format!("mmap of output error: {}", e)))?;
    let ans_map = unsafe { Mmap::map(&answer_file) }
        .map_err(|e| ie(format!("mmap of {} error: {}", answer_path.display(), e)))?;

    Ok(whitespace_compare(&out_map, &ans_map))
}

fn dup_as_file(fd: RawFd) -> std::io::Result<File> {
    let dup_fd = unsafe { libc::dup(fd) };
    if dup_fd < 0 {
        return Err(std::io::Error::last_os_error());
    }
    // SAFETY: dup_fd is a freshly duplicated, uniquely owned descriptor.
    Ok(unsafe { File::from_raw_fd(dup_fd) })
}

/// Whitespace-tolerant comparison (spec §4.E): trailing whitespace is
/// trimmed from both sides first; a byte-exact match after trimming is
/// `Accepted`, a match that only differs in the placement of interior
/// spaces/tabs/newlines is a `PresentationError`, anything else is `WA`.
fn whitespace_compare(a: &[u8], b: &[u8]) -> Verdict {
    let a = trim_trailing_ws(a);
    let b = trim_trailing_ws(b);

    if a.is_empty() || b.is_empty() {
        return Verdict::WrongAnswer;
    }
    if a == b {
        return Verdict::Accepted;
    }

    let (mut i, mut j) = (0usize, 0usize);
    while i < a.len() && j < b.len() {
        if is_ws(a[i]) {
            i += 1;
            continue;
        }
        if is_ws(b[j]) {
            j += 1;
            continue;
        }
        if a[i] != b[j] {
            return Verdict::WrongAnswer;
        }
        i += 1;
        j += 1;
    }

    if i == a.len() && j == b.len() {
        Verdict::PresentationError
    } else {
        Verdict::WrongAnswer
    }
}

fn is_ws(c: u8) -> bool {
    c == b' ' || c == b'\t' || c == b'\n'
}

fn trim_trailing_ws(s: &[u8]) -> &[u8] {
    let mut end = s.len();
    while end > 0 && is_ws(s[end - 1]) {
        end -= 1;
    }
    &s[..end]
}

fn compare_dynamic(outfd: RawFd, judge_path: &Path) -> CompareResult {
    let (read_fd, write_fd) = crate::case::raw_pipe().map_err(|e| ie(e.to_string()))?;

    // SAFETY: single-threaded parent; the forked child only calls
    // async-signal-safe operations before it execs the judge.
    match unsafe { fork() } {
        Err(e) => Err(ie(format!("fork error: {}", e))),

        Ok(ForkResult::Child) => {
            let _ = close(read_fd);
            let _ = close(libc::STDERR_FILENO);

            if setuid(Uid::from_raw(nix::unistd::getuid().as_raw())).is_err()
                || dup2(outfd, libc::STDIN_FILENO).is_err()
                || dup2(write_fd, libc::STDOUT_FILENO).is_err()
            {
                report_judge_setup_failure(write_fd);
            }
            let _ = close(write_fd);

            let path = CString::new(judge_path.as_os_str().as_bytes())
                .unwrap_or_else(|_| CString::new("").unwrap());
            let _ = execv(&path, &[path.clone()]);
            report_judge_setup_failure(libc::STDOUT_FILENO);
        }

        Ok(ForkResult::Parent { child }) => {
            let _ = close(write_fd);

            if let Err(e) = watchdog::install_handler() {
                crate::case::kill_unconditionally(child);
                let _ = close(read_fd);
                return Err(ie(format!("sigaction(SIGALRM) error: {}", e)));
            }
            watchdog::arm(5);
            let wait_outcome = crate::rusage::wait4(child);
            watchdog::disarm();

            let status = match wait_outcome {
                Ok((status, _usage)) => status,
                Err(crate::error::SandboxError::Errno(Errno::EINTR)) if watchdog::timed_out() => {
                    crate::case::kill_unconditionally(child);
                    let _ = close(read_fd);
                    return Err(ee("answer program error: output too much".into()));
                }
                Err(e) => {
                    let _ = close(read_fd);
                    return Err(ie(format!("wait on judge error: {}", e)));
                }
            };

            if let WaitStatus::Stopped(pid, signo) = status {
                log::warn!("judge pid {}: stopped by {:?} instead of exiting, killing", pid, signo);
                crate::case::kill_unconditionally(pid);
            }

            let mut byte = [0u8; 1];
            // SAFETY: byte is a valid one-byte out-buffer; read_fd is the
            // parent's end of the judge's stdout pipe.
            let n = unsafe { libc::read(read_fd, byte.as_mut_ptr() as *mut libc::c_void, 1) };
            let _ = close(read_fd);

            if n != 1 {
                return Err(ee("answer program error: no output".into()));
            }

            match byte[0] {
                b'0' => Ok(Verdict::Accepted),
                b'1' => Ok(Verdict::PresentationError),
                b'2' => Ok(Verdict::WrongAnswer),
                b'3' => Err(ie("answer program error: before execl".into())),
                other => Err(ee(format!(
                    "answer program error: output unrecognisable ({})",
                    other as char
                ))),
            }
        }
    }
}

fn report_judge_setup_failure(fd: RawFd) -> ! {
    // SAFETY: fd is a valid descriptor; '3' is the judge protocol's own
    // code for "failed before doing its real work" (spec §6).
    unsafe {
        libc::write(fd, b"3".as_ptr() as *const libc::c_void, 1);
    }
    std::process::exit(1);
}

fn ie(msg: String) -> CaseResult {
    CaseResult::with_diagnostic(Verdict::InternalError, msg)
}

fn ee(msg: String) -> CaseResult {
    CaseResult::with_diagnostic(Verdict::ExternalError, msg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_match_is_accepted() {
        assert_eq!(whitespace_compare(b"hello\n", b"hello"), Verdict::Accepted);
    }

    #[test]
    fn trailing_whitespace_only_difference_is_accepted() {
        assert_eq!(
            whitespace_compare(b"hello\n \n", b"hello"),
            Verdict::Accepted
        );
    }

    #[test]
    fn interior_whitespace_difference_is_presentation_error() {
        assert_eq!(whitespace_compare(b"he llo", b"hello"), Verdict::PresentationError);
    }

    #[test]
    fn different_content_is_wrong_answer() {
        assert_eq!(whitespace_compare(b"hemlo", b"hello"), Verdict::WrongAnswer);
    }

    #[test]
    fn empty_after_trim_is_wrong_answer() {
        assert_eq!(whitespace_compare(b"   \n", b"hello"), Verdict::WrongAnswer);
    }
}
