mod cmd;
mod exit;
mod logging;
mod output;

use clap::Parser;

use crate::cmd::Command;
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "macrolink", version, about = "Cross-runtime call bridge CLI")]
struct Cli {
    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(long, value_name = "LEVEL", default_value = "info", global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    let result = cmd::run(cli.command, format);

    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_engine_subcommand() {
        let cli = Cli::try_parse_from(["macrolink", "engine", "--profile", "narrow"])
            .expect("engine args should parse");
        assert!(matches!(cli.command, Command::Engine(_)));
    }

    #[test]
    fn parses_host_subcommand() {
        let cli = Cli::try_parse_from([
            "macrolink",
            "host",
            "--invoke",
            "double",
            "--arg",
            "21",
            "--timeout",
            "3s",
            "--",
            "some-engine",
            "serve",
        ])
        .expect("host args should parse");

        match cli.command {
            Command::Host(args) => {
                assert_eq!(args.invoke.as_deref(), Some("double"));
                assert_eq!(args.args, vec!["21".to_string()]);
                assert_eq!(args.command, vec!["some-engine", "serve"]);
            }
            other => panic!("expected host, got {other:?}"),
        }
    }

    #[test]
    fn host_requires_a_command() {
        let err = Cli::try_parse_from(["macrolink", "host"])
            .expect_err("host without a command should fail");
        assert_eq!(
            err.kind(),
            clap::error::ErrorKind::MissingRequiredArgument
        );
    }
}
