//! Command-line interface for emu_launcher

use argh::FromArgs;

/// Launch a program described by a launch file and supervise it until it exits
#[derive(FromArgs, Debug)]
pub struct LaunchArgs {
    /// path to the launch file
    #[argh(positional)]
    pub launch_file: Option<String>,

    /// show the resolved variables and command without launching
    #[argh(switch)]
    pub dry_run: bool,

    /// validate the launch file and exit
    #[argh(switch)]
    pub validate: bool,

    /// default shutdown timeout in milliseconds (negative never kills)
    #[argh(option, from_str_fn(parse_timeout))]
    pub shutdown_timeout: Option<i64>,

    /// log level (error, warn, info, debug, trace)
    #[argh(option, short = 'l', default = "String::from(\"info\")")]
    pub log_level: String,
}

/// Parse a millisecond timeout, allowing negative values
fn parse_timeout(s: &str) -> Result<i64, String> {
    s.trim()
        .parse::<i64>()
        .map_err(|_| format!("Invalid timeout '{}'. Expected an integer", s))
}

impl LaunchArgs {
    /// Log filter for env_logger, falling back to `info` for unknown levels
    pub fn log_filter(&self) -> &'static str {
        match self.log_level.to_lowercase().as_str() {
            "error" => "error",
            "warn" => "warn",
            "debug" => "debug",
            "trace" => "trace",
            _ => "info",
        }
    }
}
