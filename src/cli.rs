// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

/// Command-line arguments for `contentmon`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "contentmon",
    version,
    about = "Report content changes of a fixed set of files.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Default: `contentmon.toml` in the current working directory. Optional
    /// when files are given on the command line.
    #[arg(long, value_name = "PATH", default_value = "contentmon.toml")]
    pub config: String,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `CONTENTMON_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Coalescing window in milliseconds; overrides `[monitor].coalesce_ms`.
    #[arg(long, value_name = "N")]
    pub coalesce_ms: Option<u64>,

    /// Print the new file content after each change line.
    #[arg(long)]
    pub print_body: bool,

    /// Files to watch; overrides `[monitor].files`.
    #[arg(value_name = "FILE")]
    pub files: Vec<String>,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positional_files_and_flags() {
        let args = CliArgs::try_parse_from([
            "contentmon",
            "--coalesce-ms",
            "50",
            "--print-body",
            "--log-level",
            "debug",
            "a.json",
            "sub/b.json",
        ])
        .unwrap();

        assert_eq!(args.config, "contentmon.toml");
        assert_eq!(args.coalesce_ms, Some(50));
        assert!(args.print_body);
        assert!(matches!(args.log_level, Some(LogLevel::Debug)));
        assert_eq!(args.files, vec!["a.json", "sub/b.json"]);
    }
}
