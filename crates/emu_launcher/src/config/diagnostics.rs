//! Recorded launch errors
//!
//! Problems found while reading launch files or preparing the child process
//! are collected rather than returned, so a single pass surfaces all of them.
//! Any recorded error blocks the launch.

use super::context::Location;
use std::fmt;

/// Kinds of launch errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ErrorKind {
    #[error("expected the path to a launch file on the command line")]
    MissingArgument,

    #[error("unable to find file from path '{0}'")]
    FileNotFound(String),

    #[error("failed to read file '{path}': {reason}")]
    FileUnreadable { path: String, reason: String },

    #[error("couldn't find matching end variable delimiter '$' in '{0}'")]
    UnterminatedDelimiter(String),

    #[error("couldn't find entry for variable '{0}'")]
    UndefinedVariable(String),

    #[error("no separator '=' found")]
    MissingSeparator,

    #[error("no variable set before separator '='")]
    EmptyKey,

    #[error("invalid character '{0}' in variable name")]
    InvalidKeyCharacter(char),

    #[error("cycle detected: {0}")]
    CycleDetected(String),

    #[error("failed to parse variable 'shutdown_timeout' = '{0}' into an integer")]
    TimeoutParseError(String),

    #[error("couldn't find program to launch launch_exe = '{0}'")]
    ExecutableNotFound(String),

    #[error("failed to split launch_args '{args}': {reason}")]
    InvalidArguments { args: String, reason: String },

    #[error("child process already exists (pid {0})")]
    ProcessAlreadyRunning(u32),

    #[error("failed to start '{path}': {reason}")]
    SpawnFailed { path: String, reason: String },
}

/// An error together with the launch file position it was found at
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub location: Option<Location>,
    pub kind: ErrorKind,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.location {
            Some(location) => write!(f, "{}: {}", location, self.kind),
            None => write!(f, "{}", self.kind),
        }
    }
}

/// Append-only, ordered error list
#[derive(Debug, Default)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, kind: ErrorKind, location: Option<&Location>) {
        let diagnostic = Diagnostic {
            location: location.cloned(),
            kind,
        };
        log::debug!("recorded error: {}", diagnostic);
        self.entries.push(diagnostic);
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter()
    }

    /// Whether any recorded error matches `pred`
    #[cfg(test)]
    pub(crate) fn any(&self, pred: impl Fn(&ErrorKind) -> bool) -> bool {
        self.entries.iter().any(|d| pred(&d.kind))
    }
}

/// One error per line, in the order they were recorded
impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for diagnostic in &self.entries {
            writeln!(f, "{}", diagnostic)?;
        }
        Ok(())
    }
}
