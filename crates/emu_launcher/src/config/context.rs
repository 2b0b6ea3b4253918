//! Stack of (file, line) locations for the files being parsed

use std::fmt;
use std::path::{Path, PathBuf};

/// A position inside a launch file; lines are 1-based, 0 before the first line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub file: PathBuf,
    pub line: usize,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.file.display(), self.line)
    }
}

/// LIFO stack of parsing locations; the top is the active context
#[derive(Debug, Default)]
pub struct ContextStack {
    frames: Vec<Location>,
}

impl ContextStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, file: PathBuf) {
        self.frames.push(Location { file, line: 0 });
    }

    pub fn pop(&mut self) -> Option<Location> {
        self.frames.pop()
    }

    pub fn active(&self) -> Option<&Location> {
        self.frames.last()
    }

    /// Advance the active context to its next line
    pub fn next_line(&mut self) {
        if let Some(frame) = self.frames.last_mut() {
            frame.line += 1;
        }
    }

    /// Directory of the active file, used to resolve relative includes
    pub fn active_dir(&self) -> Option<&Path> {
        self.active().and_then(|l| l.file.parent())
    }

    /// Whether `file` is currently being parsed somewhere down the stack
    pub fn contains(&self, file: &Path) -> bool {
        self.frames.iter().any(|l| l.file == file)
    }
}
