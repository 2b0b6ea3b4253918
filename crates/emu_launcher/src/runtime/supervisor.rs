//! Supervision of the single launched child process

use crate::config::{Diagnostics, ErrorKind, LaunchSpec, ShutdownTimeout};
use std::process::ExitStatus;
use std::time::{Duration, Instant};
use tokio::process::{Child, Command};

/// Observable lifecycle of the supervised process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessStatus {
    /// Nothing launched yet
    Idle,
    /// Process is being started
    Launching,
    /// Process is running
    Running,
    /// Process has exited but its handle is still held
    Exited(Option<i32>),
    /// Handle released
    Closed,
}

impl ProcessStatus {
    /// Check if a child handle is held
    pub fn holds_process(&self) -> bool {
        matches!(
            self,
            ProcessStatus::Launching | ProcessStatus::Running | ProcessStatus::Exited(_)
        )
    }
}

/// A started child, owned by the `Running` state
#[derive(Debug)]
struct RunningProcess {
    child: Child,
    pid: u32,
    started_at: Instant,
}

#[derive(Debug)]
enum State {
    Idle,
    Launching,
    Running(RunningProcess),
    Exited { pid: u32, status: ExitStatus },
    Closed,
}

/// Owns at most one child process and drives it from launch to close
#[derive(Debug)]
pub struct Supervisor {
    state: State,
}

impl Default for Supervisor {
    fn default() -> Self {
        Self::new()
    }
}

impl Supervisor {
    pub fn new() -> Self {
        Self { state: State::Idle }
    }

    pub fn status(&self) -> ProcessStatus {
        match &self.state {
            State::Idle => ProcessStatus::Idle,
            State::Launching => ProcessStatus::Launching,
            State::Running(_) => ProcessStatus::Running,
            State::Exited { status, .. } => ProcessStatus::Exited(status.code()),
            State::Closed => ProcessStatus::Closed,
        }
    }

    /// Process ID of the held child
    pub fn pid(&self) -> Option<u32> {
        match &self.state {
            State::Running(running) => Some(running.pid),
            State::Exited { pid, .. } => Some(*pid),
            _ => None,
        }
    }

    /// Start the child described by `spec`
    ///
    /// Refused while a child is held, and whenever `diagnostics` holds any
    /// error. Must be called from within a Tokio runtime.
    pub fn launch(
        &mut self,
        spec: &LaunchSpec,
        diagnostics: &mut Diagnostics,
    ) -> Result<u32, ProcessError> {
        if let Some(pid) = self.pid() {
            diagnostics.record(ErrorKind::ProcessAlreadyRunning(pid), None);
            return Err(ProcessError::AlreadyRunning(pid));
        }
        if !diagnostics.is_empty() {
            return Err(ProcessError::Blocked(diagnostics.len()));
        }

        self.state = State::Launching;
        log::info!(
            "Starting: {} {}",
            spec.executable.display(),
            spec.args.join(" ")
        );

        let mut cmd = Command::new(&spec.executable);
        cmd.args(&spec.args).kill_on_drop(false);
        if let Some(dir) = &spec.working_dir {
            cmd.current_dir(dir);
        }
        // Own process group, so the whole tree can be signalled at once
        #[cfg(unix)]
        cmd.process_group(0);

        match cmd.spawn() {
            Ok(child) => {
                let pid = child.id().unwrap_or(0);
                log::info!("Process started with PID: {}", pid);
                self.state = State::Running(RunningProcess {
                    child,
                    pid,
                    started_at: Instant::now(),
                });
                Ok(pid)
            }
            Err(e) => {
                self.state = State::Idle;
                let path = spec.executable.display().to_string();
                log::error!("Failed to spawn process '{}': {}", path, e);
                diagnostics.record(
                    ErrorKind::SpawnFailed {
                        path: path.clone(),
                        reason: e.to_string(),
                    },
                    None,
                );
                Err(ProcessError::SpawnFailed { path, source: e })
            }
        }
    }

    /// Move from `Running` to `Exited` if the child has terminated
    pub fn check_status(&mut self) -> ProcessStatus {
        let State::Running(running) = &mut self.state else {
            return self.status();
        };

        match running.child.try_wait() {
            Ok(Some(status)) => {
                let pid = running.pid;
                log::info!("Process {} exited with code: {:?}", pid, status.code());
                self.state = State::Exited { pid, status };
            }
            Ok(None) => {
                // Still running
            }
            Err(e) => {
                log::error!("Error checking process status: {}", e);
            }
        }

        self.status()
    }

    /// Periodic exit check
    ///
    /// Returns the exit status once the child has exited, after releasing it.
    pub fn poll(&mut self) -> Option<ExitStatus> {
        self.check_status();

        match std::mem::replace(&mut self.state, State::Closed) {
            State::Exited { status, .. } => Some(status),
            other => {
                self.state = other;
                None
            }
        }
    }

    /// Ask the child to close, then kill its process tree if it is still
    /// alive after the timeout
    ///
    /// With a negative timeout the child is only asked to close and is left
    /// running. Does nothing when no child is held.
    pub async fn shutdown(&mut self, timeout: ShutdownTimeout) -> Option<ExitStatus> {
        let mut running = match std::mem::replace(&mut self.state, State::Closed) {
            State::Running(running) => running,
            State::Exited { status, .. } => return Some(status),
            other => {
                self.state = other;
                return None;
            }
        };

        if let Ok(Some(status)) = running.child.try_wait() {
            log::info!("Process {} had already exited", running.pid);
            return Some(status);
        }

        log::info!(
            "Stopping process {} after {:?} of uptime...",
            running.pid,
            running.started_at.elapsed()
        );
        request_close(&running);

        let Some(grace) = timeout.grace_period() else {
            log::info!(
                "Forced termination disabled, leaving process {} running",
                running.pid
            );
            return None;
        };

        match tokio::time::timeout(grace, running.child.wait()).await {
            Ok(Ok(status)) => {
                log::info!("Process exited with code: {:?}", status.code());
                Some(status)
            }
            Ok(Err(e)) => {
                log::error!("Error waiting for process: {}", e);
                None
            }
            Err(_) => {
                log::warn!(
                    "Process {} did not exit within {}ms, forcing kill",
                    running.pid,
                    grace.as_millis()
                );
                kill_tree(&mut running);
                reap(&mut running).await
            }
        }
    }
}

/// Graceful close request: SIGTERM to the child's process group
#[cfg(unix)]
fn request_close(running: &RunningProcess) {
    use nix::sys::signal::{kill, killpg, Signal};
    use nix::unistd::Pid;

    let pid = Pid::from_raw(running.pid as i32);
    if let Err(e) = killpg(pid, Signal::SIGTERM).or_else(|_| kill(pid, Signal::SIGTERM)) {
        log::warn!("Failed to send SIGTERM to {}: {}", running.pid, e);
    }
}

#[cfg(not(unix))]
fn request_close(running: &RunningProcess) {
    log::warn!(
        "Graceful close is not supported on this platform, process {} will be killed after the timeout",
        running.pid
    );
}

/// Forced termination of the child and everything it started
fn kill_tree(running: &mut RunningProcess) {
    #[cfg(unix)]
    {
        use nix::sys::signal::{killpg, Signal};
        use nix::unistd::Pid;

        if killpg(Pid::from_raw(running.pid as i32), Signal::SIGKILL).is_ok() {
            return;
        }
    }

    if let Err(e) = running.child.start_kill() {
        log::error!("Failed to kill process {}: {}", running.pid, e);
    }
}

/// Wait for a killed child to be reaped
async fn reap(running: &mut RunningProcess) -> Option<ExitStatus> {
    const REAP_TIMEOUT: Duration = Duration::from_secs(5);

    match tokio::time::timeout(REAP_TIMEOUT, running.child.wait()).await {
        Ok(Ok(status)) => Some(status),
        Ok(Err(e)) => {
            log::error!("Error waiting for killed process: {}", e);
            None
        }
        Err(_) => {
            log::error!("Process {} did not terminate after kill", running.pid);
            None
        }
    }
}

/// Errors that can occur when launching the child
#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error("Process is already running (pid {0})")]
    AlreadyRunning(u32),

    #[error("Launch blocked by {0} recorded error(s)")]
    Blocked(usize),

    #[error("Failed to spawn process '{path}': {source}")]
    SpawnFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
