use std::time::Duration;

use clap::{Args, Subcommand};

use crate::exit::{CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod engine;
pub mod envinfo;
pub mod host;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve an engine-side session over stdin/stdout.
    Engine(EngineArgs),
    /// Spawn an engine command, handshake, and optionally invoke a handler.
    Host(HostArgs),
    /// Show version information.
    Version(VersionArgs),
    /// Print build and environment diagnostics.
    Envinfo(EnvinfoArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Engine(args) => engine::run(args),
        Command::Host(args) => host::run(args, format),
        Command::Version(args) => version::run(args),
        Command::Envinfo(args) => envinfo::run(args, format),
    }
}

#[derive(Args, Debug)]
pub struct EngineArgs {
    /// Capability profile to announce.
    #[arg(long, value_enum, default_value = "wide")]
    pub profile: ProfileArg,
    /// Opaque attribute text appended to the identity line.
    #[arg(long, default_value = "")]
    pub attributes: String,
}

#[derive(Copy, Clone, Debug, clap::ValueEnum)]
pub enum ProfileArg {
    Narrow,
    Wide,
}

impl From<ProfileArg> for macrolink_session::EngineProfile {
    fn from(arg: ProfileArg) -> Self {
        match arg {
            ProfileArg::Narrow => macrolink_session::EngineProfile::Narrow,
            ProfileArg::Wide => macrolink_session::EngineProfile::Wide,
        }
    }
}

#[derive(Args, Debug)]
pub struct HostArgs {
    /// Handler to invoke on the engine after the handshake.
    #[arg(long)]
    pub invoke: Option<String>,
    /// Plain-line argument for the invoked handler (repeatable, in order).
    #[arg(long = "arg")]
    pub args: Vec<String>,
    /// Maximum time to wait for each engine reply (e.g. 5s, 500ms).
    #[arg(long, default_value = "10s")]
    pub timeout: String,
    /// Engine command and its arguments.
    #[arg(required = true, last = true)]
    pub command: Vec<String>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

#[derive(Args, Debug, Default)]
pub struct EnvinfoArgs {}

/// Parse `10s` / `500ms` style durations.
pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    let (number, unit) = input
        .find(|c: char| !c.is_ascii_digit())
        .map(|at| input.split_at(at))
        .ok_or_else(|| CliError::new(USAGE, format!("missing unit in duration {input:?}")))?;
    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration {input:?}")))?;
    match unit {
        "s" => Ok(Duration::from_secs(value)),
        "ms" => Ok(Duration::from_millis(value)),
        _ => Err(CliError::new(
            USAGE,
            format!("unknown duration unit {unit:?} in {input:?}"),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_durations() {
        assert_eq!(parse_duration("5s").unwrap(), Duration::from_secs(5));
        assert_eq!(parse_duration("500ms").unwrap(), Duration::from_millis(500));
    }

    #[test]
    fn rejects_bad_durations() {
        for bad in ["", "5", "s", "5m", "-1s"] {
            assert!(parse_duration(bad).is_err(), "duration {bad:?}");
        }
    }
}
