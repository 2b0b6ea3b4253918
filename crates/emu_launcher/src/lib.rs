//! Emu Launcher
//!
//! Starts a program described by a small launch file and supervises it until
//! it exits.
//!
//! # Overview
//!
//! The launcher:
//! - Reads `key = value` launch files, following `include` lines
//! - Expands `$name$` variable references, including host variables such as
//!   `$MachineName$` and `$ConfigFileDir$`
//! - Collects every problem with its file and line, and refuses to launch
//!   while any exist
//! - Polls the child for exit, and on shutdown asks it to close before
//!   killing its process tree after `shutdown_timeout` milliseconds
//!
//! # Example Launch File
//!
//! ```text
//! // zelda.emu
//! include          = snes.emu
//! rom              = $ConfigFileDir$/roms/zelda.sfc
//! launch_args      = --fullscreen "$rom$"
//! shutdown_timeout = 3000
//! ```

pub mod cli;
pub mod config;
pub mod runtime;

pub use cli::LaunchArgs;
pub use config::{
    Diagnostic, Diagnostics, ErrorKind, HostEnvironment, LaunchSpec, ParseSession,
    ShutdownTimeout, SubstitutionError, VariableTable,
};
pub use runtime::{
    Executor, ExecutorConfig, ExecutorError, ExitReason, LaunchPlan, ProcessError,
    ProcessStatus, Supervisor,
};
