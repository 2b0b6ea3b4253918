//! Projection of the parsed variables into what the supervisor needs

use super::diagnostics::ErrorKind;
use super::parser::ParseSession;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Path of the program to start
pub const LAUNCH_EXE: &str = "launch_exe";
/// Argument string passed to the program
pub const LAUNCH_ARGS: &str = "launch_args";
/// Working directory for the program
pub const LAUNCH_DIR: &str = "launch_dir";
/// Milliseconds to wait after a close request before killing the program
pub const SHUTDOWN_TIMEOUT: &str = "shutdown_timeout";

/// Default grace period before forced termination
pub const DEFAULT_SHUTDOWN_TIMEOUT_MS: i64 = 5000;

/// Grace period between the close request and forced termination
///
/// Negative values disable forced termination entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShutdownTimeout(pub i64);

impl ShutdownTimeout {
    /// How long to wait before killing, or `None` to never kill
    pub fn grace_period(&self) -> Option<Duration> {
        u64::try_from(self.0).ok().map(Duration::from_millis)
    }
}

impl Default for ShutdownTimeout {
    fn default() -> Self {
        Self(DEFAULT_SHUTDOWN_TIMEOUT_MS)
    }
}

impl fmt::Display for ShutdownTimeout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Everything needed to start and stop the child process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchSpec {
    pub executable: PathBuf,
    /// Argument string as written in the launch file
    pub raw_args: String,
    /// `raw_args` split into words
    pub args: Vec<String>,
    /// `None` inherits the launcher's working directory
    pub working_dir: Option<PathBuf>,
    pub shutdown_timeout: ShutdownTimeout,
}

impl LaunchSpec {
    /// Read the reserved variables of a parsed session
    ///
    /// Problems are recorded in the session; the returned spec is only usable
    /// when the session has no errors.
    pub fn from_session(session: &mut ParseSession, default_timeout: ShutdownTimeout) -> Self {
        let exe = session.lookup(LAUNCH_EXE);
        let executable = PathBuf::from(&exe);

        // A missing executable is only worth reporting when nothing else failed
        if session.diagnostics().is_empty() && !executable.is_file() {
            session.report(ErrorKind::ExecutableNotFound(exe.clone()));
        }
        let executable = std::path::absolute(&executable).unwrap_or(executable);

        let raw_args = session.lookup(LAUNCH_ARGS);
        let args = match shell_words::split(&raw_args) {
            Ok(args) => args,
            Err(e) => {
                session.report(ErrorKind::InvalidArguments {
                    args: raw_args.clone(),
                    reason: e.to_string(),
                });
                Vec::new()
            }
        };

        let dir = session.lookup(LAUNCH_DIR);
        let working_dir = (!dir.is_empty()).then(|| PathBuf::from(dir));

        let shutdown_timeout = parse_timeout(session, default_timeout);

        Self {
            executable,
            raw_args,
            args,
            working_dir,
            shutdown_timeout,
        }
    }
}

/// Empty text keeps the default silently; unparsable text is reported and
/// also keeps the default
fn parse_timeout(session: &mut ParseSession, default_timeout: ShutdownTimeout) -> ShutdownTimeout {
    let text = session.lookup(SHUTDOWN_TIMEOUT);
    if text.is_empty() {
        return default_timeout;
    }

    match text.trim().parse::<i64>() {
        Ok(ms) => ShutdownTimeout(ms),
        Err(_) => {
            session.report(ErrorKind::TimeoutParseError(text));
            default_timeout
        }
    }
}
