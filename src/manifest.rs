//! Component A: the `data.conf` manifest loader.
//!
//! Transliterates `original_source/data.c`'s `dd_init`/`dd_get_input`/
//! `dd_get_output` into an idiomatic parse-once, index-by-position API.

use crate::error::{Result, SandboxError};
use std::fs;
use std::path::{Path, PathBuf};

/// An ordered list of (input, answer) path pairs read from `data.conf`.
pub struct Manifest {
    entries: Vec<PathBuf>,
}

impl Manifest {
    /// Reads `<datadir>/data.conf`. A line is a comment (ignored) if it is
    /// empty or starts with `#`; the first remaining line is the declared
    /// pair count `N`, and the next `N` remaining lines alternate input and
    /// answer paths. Trailing lines beyond `2*N` are ignored; if the file
    /// runs out before `2*N` lines, the missing entries are simply absent
    /// (spec §4.A) rather than an error.
    pub fn load(datadir: &Path) -> Result<Self> {
        let path = datadir.join("data.conf");
        let contents = fs::read_to_string(&path).map_err(|e| SandboxError::Manifest {
            path: path.clone(),
            reason: e.to_string(),
        })?;

        let mut lines = contents.lines().filter(|line| !is_comment_line(line));

        let declared: usize = lines
            .next()
            .ok_or_else(|| SandboxError::Manifest {
                path: path.clone(),
                reason: "missing count line".into(),
            })?
            .trim()
            .parse()
            .map_err(|_| SandboxError::Manifest {
                path: path.clone(),
                reason: "count line is not an integer".into(),
            })?;

        let entries: Vec<PathBuf> = lines.take(declared * 2).map(PathBuf::from).collect();

        Ok(Manifest { entries })
    }

    /// Number of complete (input, answer) pairs actually present.
    pub fn count(&self) -> usize {
        self.entries.len() / 2
    }

    pub fn input(&self, i: usize) -> Option<&Path> {
        self.entries.get(i * 2).map(PathBuf::as_path)
    }

    pub fn answer(&self, i: usize) -> Option<&Path> {
        self.entries.get(i * 2 + 1).map(PathBuf::as_path)
    }
}

fn is_comment_line(line: &str) -> bool {
    line.is_empty() || line.starts_with('#')
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    fn write_conf(dir: &Path, body: &str) {
        let mut f = fs::File::create(dir.join("data.conf")).unwrap();
        f.write_all(body.as_bytes()).unwrap();
    }

    #[test]
    fn parses_pairs_and_skips_comments() {
        let dir = tempdir().unwrap();
        write_conf(dir.path(), "# a comment\n\n2\nin1\nans1\nin2\nans2\n");
        let m = Manifest::load(dir.path()).unwrap();
        assert_eq!(m.count(), 2);
        assert_eq!(m.input(0).unwrap(), Path::new("in1"));
        assert_eq!(m.answer(0).unwrap(), Path::new("ans1"));
        assert_eq!(m.input(1).unwrap(), Path::new("in2"));
        assert_eq!(m.answer(1).unwrap(), Path::new("ans2"));
    }

    #[test]
    fn truncates_to_declared_count() {
        let dir = tempdir().unwrap();
        write_conf(dir.path(), "1\nin1\nans1\nin2\nans2\n");
        let m = Manifest::load(dir.path()).unwrap();
        assert_eq!(m.count(), 1);
        assert!(m.input(1).is_none());
    }

    #[test]
    fn pads_absent_entries_when_file_has_fewer_lines() {
        let dir = tempdir().unwrap();
        write_conf(dir.path(), "2\nin1\nans1\n");
        let m = Manifest::load(dir.path()).unwrap();
        assert_eq!(m.count(), 1);
        assert!(m.input(1).is_none());
        assert!(m.answer(1).is_none());
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempdir().unwrap();
        assert!(Manifest::load(dir.path()).is_err());
    }

    #[test]
    fn non_integer_count_is_an_error() {
        let dir = tempdir().unwrap();
        write_conf(dir.path(), "not-a-number\nin1\nans1\n");
        assert!(Manifest::load(dir.path()).is_err());
    }
}
