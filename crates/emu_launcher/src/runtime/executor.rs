//! Launch executor - ties the parsed launch file to the supervised process

use crate::config::{
    Diagnostics, ErrorKind, HostEnvironment, LaunchSpec, ParseSession, ShutdownTimeout,
};
use crate::runtime::supervisor::{ProcessError, ProcessStatus, Supervisor};
use std::time::Duration;
use tokio::sync::watch;

/// Launch executor configuration
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// How often the child is checked for exit
    pub poll_interval: Duration,
    /// Shutdown timeout used until the launch file sets one
    pub default_shutdown_timeout: ShutdownTimeout,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            default_shutdown_timeout: ShutdownTimeout::default(),
        }
    }
}

/// Why [`Executor::wait`] returned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    /// The child exited on its own with this code
    ProcessExited(Option<i32>),
    /// The host asked for shutdown
    ShutdownRequested,
    /// There was no child to wait for
    NotRunning,
}

/// Launch executor state
pub struct Executor {
    config: ExecutorConfig,
    session: ParseSession,
    spec: Option<LaunchSpec>,
    supervisor: Supervisor,
}

impl Executor {
    /// Create a new executor
    pub fn new(env: HostEnvironment, config: ExecutorConfig) -> Self {
        let session = ParseSession::new(env, config.default_shutdown_timeout);
        Self {
            config,
            session,
            spec: None,
            supervisor: Supervisor::new(),
        }
    }

    /// Parse the launch file and derive the launch spec from it
    pub fn load(&mut self, launch_file: Option<&str>) {
        match launch_file {
            Some(path) => {
                log::info!("Loading launch file: {}", path);
                self.session.parse(path);
            }
            None => self.session.report(ErrorKind::MissingArgument),
        }

        self.spec = Some(LaunchSpec::from_session(
            &mut self.session,
            self.config.default_shutdown_timeout,
        ));
    }

    /// Errors recorded so far, in order
    pub fn errors(&self) -> &Diagnostics {
        self.session.diagnostics()
    }

    /// `key = value` lines for every variable
    pub fn variable_dump(&self) -> String {
        self.session.variables().to_string()
    }

    /// Variable dump followed by the error list, shown when a launch is refused
    pub fn error_report(&self) -> String {
        format!(
            "Variables:\n{}\nErrors:\n{}",
            self.variable_dump(),
            self.errors()
        )
    }

    pub fn spec(&self) -> Option<&LaunchSpec> {
        self.spec.as_ref()
    }

    pub fn status(&self) -> ProcessStatus {
        self.supervisor.status()
    }

    /// Generate a launch plan (for dry-run mode)
    pub fn plan(&self) -> LaunchPlan {
        LaunchPlan {
            variables: self.variable_dump(),
            spec: self.spec.clone(),
            errors: self.errors().iter().map(|d| d.to_string()).collect(),
        }
    }

    /// Start the child process
    pub fn launch(&mut self) -> Result<u32, ExecutorError> {
        let spec = self.spec.as_ref().ok_or(ExecutorError::NotLoaded)?;
        let pid = self
            .supervisor
            .launch(spec, self.session.diagnostics_mut())?;
        Ok(pid)
    }

    /// Poll the child until it exits or a shutdown is requested
    ///
    /// Exit polling and shutdown requests are handled in this one task, so
    /// they never touch the supervisor at the same time.
    pub async fn wait(&mut self, mut shutdown_rx: watch::Receiver<()>) -> ExitReason {
        if !self.supervisor.status().holds_process() {
            return ExitReason::NotRunning;
        }

        let mut interval = tokio::time::interval(self.config.poll_interval);
        loop {
            tokio::select! {
                _ = shutdown_rx.changed() => {
                    log::info!("Shutdown signal received");
                    return ExitReason::ShutdownRequested;
                }

                _ = interval.tick() => {
                    if let Some(status) = self.supervisor.poll() {
                        return ExitReason::ProcessExited(status.code());
                    }
                }
            }
        }
    }

    /// Stop the child using the launch file's shutdown timeout
    pub async fn shutdown(&mut self) {
        let timeout = self
            .spec
            .as_ref()
            .map(|s| s.shutdown_timeout)
            .unwrap_or(self.config.default_shutdown_timeout);

        self.supervisor.shutdown(timeout).await;
    }
}

/// Errors that can occur in the executor
#[derive(Debug, thiserror::Error)]
pub enum ExecutorError {
    #[error("No launch file has been loaded")]
    NotLoaded,

    #[error(transparent)]
    Process(#[from] ProcessError),
}

/// Launch plan for dry-run mode
#[derive(Debug)]
pub struct LaunchPlan {
    /// Variable dump, one `key = value` per line
    pub variables: String,
    pub spec: Option<LaunchSpec>,
    pub errors: Vec<String>,
}

/// Display the launch plan in a human-readable format
impl std::fmt::Display for LaunchPlan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Launch Plan")?;
        writeln!(f, "===========")?;
        writeln!(f)?;

        writeln!(f, "Variables:")?;
        for line in self.variables.lines() {
            writeln!(f, "  {}", line)?;
        }

        if let Some(spec) = &self.spec {
            writeln!(f)?;
            writeln!(f, "Command: {} {}", spec.executable.display(), spec.raw_args)?;
            if let Some(dir) = &spec.working_dir {
                writeln!(f, "Working directory: {}", dir.display())?;
            }
            match spec.shutdown_timeout.grace_period() {
                Some(grace) => writeln!(f, "Shutdown timeout: {}ms", grace.as_millis())?,
                None => writeln!(f, "Shutdown timeout: never kill")?,
            }
        }

        if !self.errors.is_empty() {
            writeln!(f)?;
            writeln!(f, "Errors:")?;
            for error in &self.errors {
                writeln!(f, "  {}", error)?;
            }
        }

        Ok(())
    }
}
