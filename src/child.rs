//! Component B: post-fork, pre-exec tracee setup, following
//! `original_source/child.c`'s `child_run_process` step for step.

use crate::error::Result;
use nix::sys::resource::{setrlimit, Resource};
use nix::unistd::{chdir, close, dup2, setgid, setuid, Gid, Uid};
use std::ffi::CString;
use std::os::unix::io::RawFd;
use std::path::Path;

/// Everything the post-fork tracee needs before it `exec`s the candidate.
pub struct ChildSetup<'a> {
    pub infd: RawFd,
    pub outfd: RawFd,
    pub pipe_write: RawFd,
    pub time_ms: u32,
    pub fsize_kb: u32,
    pub basedir: &'a Path,
    pub who: u32,
    pub command: &'a [CString],
}

impl<'a> ChildSetup<'a> {
    /// Runs in the forked child; never returns. Either `exec`s the
    /// candidate, or writes a diagnostic to the control pipe and exits 1
    /// (pre-exec setup failure), or exits 2 (`exec` itself failed).
    pub fn run(self, pipe_read: RawFd) -> ! {
        let _ = close(pipe_read);

        if let Err(e) = self.setup() {
            let msg = e.to_string();
            // SAFETY: pipe_write is a valid fd owned by this process; a
            // short/failed write just leaves the parent with no message
            // and it reports a generic internal error instead.
            unsafe {
                libc::write(self.pipe_write, msg.as_ptr() as *const libc::c_void, msg.len());
            }
            let _ = close(self.pipe_write);
            std::process::exit(1);
        }
        let _ = close(self.pipe_write);

        let prog = self.command[0].as_c_str();
        let _ = nix::unistd::execvp(prog, self.command);
        std::process::exit(2);
    }

    fn setup(&self) -> Result<()> {
        self.redirect_io()?;
        self.set_directory()?;
        self.set_rlimits()?;
        self.drop_privileges()?;
        nix::sys::ptrace::traceme()?;
        Ok(())
    }

    fn redirect_io(&self) -> Result<()> {
        dup2(self.infd, libc::STDIN_FILENO)?;
        close(self.infd)?;
        dup2(self.outfd, libc::STDOUT_FILENO)?;
        close(self.outfd)?;
        close(libc::STDERR_FILENO)?;
        Ok(())
    }

    /// Changes the working directory only. No `chroot` is performed here —
    /// filesystem isolation is a Non-goal left to the caller (a container
    /// or mount namespace), not something this supervisor fakes (spec §9).
    fn set_directory(&self) -> Result<()> {
        chdir(self.basedir)?;
        Ok(())
    }

    fn set_rlimits(&self) -> Result<()> {
        setrlimit(Resource::RLIMIT_CORE, 0, 0)?;

        let fsize_bytes = self.fsize_kb as u64 * 1024;
        setrlimit(Resource::RLIMIT_FSIZE, fsize_bytes, fsize_bytes)?;

        // The CPU soft limit is set a little above T_ms/1000 so that, in
        // the common case, the parent's own time accounting (and its
        // SIGKILL) wins the race against the kernel's SIGXCPU.
        let soft = if self.time_ms % 1000 == 0 {
            self.time_ms / 1000 + 1
        } else {
            self.time_ms / 1000 + 2
        } as u64;
        setrlimit(Resource::RLIMIT_CPU, soft, soft + 1)?;

        Ok(())
    }

    /// Regains the real uid (root) transiently — the parent has already
    /// swapped real/effective uid to drop privileges by default — to set
    /// gid then uid to the unprivileged `who`, landing real/effective/saved
    /// all at `who`.
    fn drop_privileges(&self) -> Result<()> {
        nix::unistd::setreuid(nix::unistd::geteuid(), nix::unistd::getuid())?;
        setgid(Gid::from_raw(self.who))?;
        setuid(Uid::from_raw(self.who))?;
        Ok(())
    }
}
