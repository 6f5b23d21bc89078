//! CLI definitions for display-tool.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "display-tool",
    version,
    about = "Check, inspect, normalize and run display files",
    after_help = "Examples:\n  display-tool check main.bob\n  display-tool show main.bob --properties\n  display-tool normalize main.bob -o clean.bob\n  display-tool run main.bob --set temp=21.5 --duration-ms 2000"
)]
pub struct Cli {
    /// Configuration file (display.toml).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
    /// Log at debug level unless RUST_LOG is set.
    #[arg(long, short, global = true)]
    pub verbose: bool,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Load a display file and report everything that was skipped.
    Check {
        /// Display file.
        file: PathBuf,
    },
    /// Print the widget tree.
    Show {
        /// Display file.
        file: PathBuf,
        /// List non-default properties under each widget.
        #[arg(long)]
        properties: bool,
    },
    /// Read a display file and write it back in canonical form.
    Normalize {
        /// Display file.
        file: PathBuf,
        /// Output file (defaults to rewriting the input).
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Run a display against in-process PVs and print widget updates.
    #[command(
        after_help = "While running, stdin accepts:\n  WIDGET=VALUE      write VALUE through the widget\n  set PV=VALUE      change a PV at its source\n  action WIDGET [N] invoke the widget's Nth action\n  click WIDGET      report a click\n  quit"
    )]
    Run {
        /// Display file.
        file: PathBuf,
        /// Initial PV value, `NAME=VALUE` (repeatable).
        #[arg(long = "set", value_name = "NAME=VALUE")]
        seeds: Vec<String>,
        /// Write through a widget once running, `WIDGET=VALUE` (repeatable).
        #[arg(long = "write", value_name = "WIDGET=VALUE")]
        writes: Vec<String>,
        /// Stop after this many milliseconds instead of waiting for `quit`.
        #[arg(long)]
        duration_ms: Option<u64>,
    },
}

/// Split `NAME=VALUE`, trimming the name.
pub fn split_assignment(text: &str) -> Option<(&str, &str)> {
    let (name, value) = text.split_once('=')?;
    let name = name.trim();
    (!name.is_empty()).then_some((name, value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_run_options() {
        let cli = Cli::try_parse_from([
            "display-tool",
            "--config",
            "display.toml",
            "run",
            "main.bob",
            "--set",
            "temp=21.5",
            "--set",
            "mode=auto",
            "--write",
            "setpoint=3",
            "--duration-ms",
            "500",
        ])
        .expect("parse");
        assert_eq!(cli.config, Some(PathBuf::from("display.toml")));
        let Command::Run {
            file,
            seeds,
            writes,
            duration_ms,
        } = cli.command
        else {
            panic!("expected run");
        };
        assert_eq!(file, PathBuf::from("main.bob"));
        assert_eq!(seeds, vec!["temp=21.5", "mode=auto"]);
        assert_eq!(writes, vec!["setpoint=3"]);
        assert_eq!(duration_ms, Some(500));
    }

    #[test]
    fn requires_a_subcommand() {
        assert!(Cli::try_parse_from(["display-tool"]).is_err());
    }

    #[test]
    fn splits_assignments() {
        assert_eq!(split_assignment(" temp =21.5"), Some(("temp", "21.5")));
        assert_eq!(split_assignment("msg=a=b"), Some(("msg", "a=b")));
        assert_eq!(split_assignment("=5"), None);
        assert_eq!(split_assignment("temp"), None);
    }
}
