use std::process::Command;

use macrolink_session::{Argument, HandlerError, HandlerTable, ProcessSession, SessionConfig};
use macrolink_transport::ChannelPair;
use tracing::{info, warn};

use crate::cmd::{parse_duration, HostArgs};
use crate::exit::{session_error, transport_error, CliError, CliResult, FAILURE, SUCCESS};
use crate::output::{print_call_result, print_identity, OutputFormat};

/// Spawn an engine command, handshake, optionally invoke one handler, and
/// shut the session down cleanly.
pub fn run(args: HostArgs, format: OutputFormat) -> CliResult<i32> {
    let timeout = parse_duration(&args.timeout)?;

    let mut command = Command::new(&args.command[0]);
    command.args(&args.command[1..]);
    let (pair, mut child) =
        ChannelPair::spawn(command).map_err(|err| transport_error("spawn engine", err))?;

    let mut handlers = HandlerTable::new();
    // Arithmetic helper for engine handlers that call back into us (the
    // demo engine's "square" does).
    handlers
        .register("compute", |session: &mut ProcessSession| {
            let expr = session.read_argument_line()?;
            Ok(evaluate(&expr)?.to_string())
        })
        .map_err(|err| session_error("register handler", err))?;

    let config = SessionConfig {
        reply_timeout: Some(timeout),
        ..SessionConfig::default()
    };
    let mut session = ProcessSession::open(pair, handlers, config)
        .map_err(|err| session_error("handshake", err))?;
    let identity = session.identity().clone();
    info!(profile = ?identity.profile, "engine connected");

    match &args.invoke {
        Some(handler) => {
            let call_args: Vec<Argument> = args
                .args
                .iter()
                .map(|arg| Argument::Line(arg.clone()))
                .collect();
            let result = session
                .invoke_remote(handler, &call_args)
                .map_err(|err| session_error("invoke", err))?;
            print_call_result(handler, &result, &identity, format);
        }
        None => print_identity(&identity, format),
    }

    session
        .close()
        .map_err(|err| session_error("close", err))?;
    drop(session);

    let status = child
        .wait()
        .map_err(|err| transport_error("wait for engine", err))?;
    if status.success() {
        Ok(SUCCESS)
    } else {
        warn!(?status, "engine exited with failure");
        Err(CliError::new(
            FAILURE,
            format!("engine exited with {status}"),
        ))
    }
}

/// Evaluate a tiny `a*b` / `a+b` expression.
fn evaluate(expr: &str) -> Result<i64, HandlerError> {
    let parse = |s: &str| -> Result<i64, HandlerError> {
        s.trim()
            .parse::<i64>()
            .map_err(|_| HandlerError::new(format!("invalid operand {s:?} in {expr:?}")))
    };
    if let Some((a, b)) = expr.split_once('*') {
        return Ok(parse(a)? * parse(b)?);
    }
    if let Some((a, b)) = expr.split_once('+') {
        return Ok(parse(a)? + parse(b)?);
    }
    parse(expr)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evaluates_expressions() {
        assert_eq!(evaluate("6*6").unwrap(), 36);
        assert_eq!(evaluate("2+3").unwrap(), 5);
        assert_eq!(evaluate("41").unwrap(), 41);
        assert!(evaluate("6*six").is_err());
    }
}
