//! Host information used to seed the variable table

use std::path::{Path, PathBuf};

/// Facts about the host and the launcher invocation, captured once at startup
#[derive(Debug, Clone, Default)]
pub struct HostEnvironment {
    /// Network host name of this machine
    pub machine_name: String,
    /// Name of the user running the launcher
    pub user_name: String,
    /// Working directory the launcher was started from
    pub working_dir: PathBuf,
    /// Directory containing the launcher executable
    pub launcher_dir: PathBuf,
    /// Directory of the launch file given on the command line
    pub config_dir: PathBuf,
}

impl HostEnvironment {
    /// Detect the environment for a launcher at `launcher_path` reading `launch_file`
    pub fn detect(launcher_path: &Path, launch_file: Option<&str>) -> Self {
        let machine_name = hostname::get()
            .map(|h| h.to_string_lossy().to_string())
            .unwrap_or_else(|_| "unknown".to_string());

        Self {
            machine_name,
            user_name: whoami::username(),
            working_dir: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            launcher_dir: parent_dir(launcher_path),
            config_dir: launch_file
                .map(|f| parent_dir(Path::new(f)))
                .unwrap_or_default(),
        }
    }
}

/// Directory part of a path, empty when it has none
fn parent_dir(path: &Path) -> PathBuf {
    path.parent().map(Path::to_path_buf).unwrap_or_default()
}
