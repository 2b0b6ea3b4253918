//! Emu Launcher CLI
//!
//! Usage:
//!   emu_launcher games/zelda.emu
//!   emu_launcher games/zelda.emu --dry-run
//!   emu_launcher games/zelda.emu --validate

use emu_launcher::{
    Executor, ExecutorConfig, ExitReason, HostEnvironment, LaunchArgs, ShutdownTimeout,
};
use std::path::PathBuf;
use tokio::sync::watch;

#[tokio::main]
async fn main() {
    let args: LaunchArgs = argh::from_env();

    // Initialize logging
    let env = env_logger::Env::default().default_filter_or(args.log_filter());
    env_logger::init_from_env(env);

    let launcher_path = std::env::current_exe()
        .ok()
        .or_else(|| std::env::args_os().next().map(PathBuf::from))
        .unwrap_or_default();

    let mut config = ExecutorConfig::default();
    if let Some(ms) = args.shutdown_timeout {
        config.default_shutdown_timeout = ShutdownTimeout(ms);
    }

    let host = HostEnvironment::detect(&launcher_path, args.launch_file.as_deref());
    let mut executor = Executor::new(host, config);
    executor.load(args.launch_file.as_deref());

    // Validate only mode
    if args.validate {
        if executor.errors().is_empty() {
            println!(
                "Launch file '{}' is valid",
                args.launch_file.as_deref().unwrap_or_default()
            );
            return;
        }
        eprint!("{}", executor.errors());
        std::process::exit(1);
    }

    // Dry run mode
    if args.dry_run {
        println!("{}", executor.plan());
        return;
    }

    log::debug!("Variables:\n{}", executor.variable_dump());

    // Create shutdown channel
    let (shutdown_tx, shutdown_rx) = watch::channel(());

    // Set up Ctrl+C handler
    {
        let shutdown_tx = shutdown_tx.clone();
        if let Err(e) = ctrlc::set_handler(move || {
            log::info!("Received Ctrl+C, initiating shutdown...");
            let _ = shutdown_tx.send(());
        }) {
            log::warn!("Error setting Ctrl+C handler: {}", e);
        }
    }

    if let Err(e) = executor.launch() {
        log::error!("Launch failed: {}", e);
        eprint!("{}", executor.error_report());
        std::process::exit(1);
    }

    // Wait for shutdown signal or the process to exit
    let reason = executor.wait(shutdown_rx).await;

    executor.shutdown().await;

    log::info!("Emu launcher exiting");
    if let ExitReason::ProcessExited(code) = reason {
        std::process::exit(code.unwrap_or(1));
    }
}
