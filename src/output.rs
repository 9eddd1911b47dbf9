//! Output targets for optional-path command-line flags
//!
//! `--output` and `--profile` accept an optional path. Given without a
//! value they write to standard output.

use std::convert::Infallible;
use std::fmt;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Where a report or record is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputTarget {
    /// Standard output
    Stdout,
    /// File, appended to when it exists
    File(PathBuf),
}

impl OutputTarget {
    /// File path, if the target is a file.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Stdout => None,
            Self::File(path) => Some(path),
        }
    }

    /// Append `bytes` with a single write.
    ///
    /// `header` is called with `true` when the target starts empty (a new
    /// or zero-length file, or standard output) and must return the bytes
    /// to write, so that a header row is only emitted once per file.
    ///
    /// # Errors
    ///
    /// Returns the I/O error from opening or writing the target.
    pub fn append_with(&self, bytes: impl FnOnce(bool) -> Vec<u8>) -> io::Result<()> {
        match self {
            Self::Stdout => {
                let mut stdout = io::stdout().lock();
                stdout.write_all(&bytes(true))?;
                stdout.flush()
            }
            Self::File(path) => {
                let mut file = OpenOptions::new().create(true).append(true).open(path)?;
                let fresh = file.metadata()?.len() == 0;
                file.write_all(&bytes(fresh))?;
                file.flush()
            }
        }
    }
}

impl FromStr for OutputTarget {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "" | "-" => Ok(Self::Stdout),
            path => Ok(Self::File(PathBuf::from(path))),
        }
    }
}

impl fmt::Display for OutputTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stdout => f.write_str("<stdout>"),
            Self::File(path) => write!(f, "{}", path.display()),
        }
    }
}
