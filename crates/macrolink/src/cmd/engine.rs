use macrolink_session::{
    EngineIdentity, EngineSession, HandlerError, HandlerTable, Result as SessionResult,
};
use macrolink_transport::ChannelPair;
use tracing::info;

use crate::cmd::EngineArgs;
use crate::exit::{session_error, CliResult, INTERNAL, SUCCESS};

/// Serve an engine-side session over stdio with the demo handler set.
///
/// Stdout carries the protocol; all diagnostics go to stderr.
pub fn run(args: EngineArgs) -> CliResult<i32> {
    let mut handlers = HandlerTable::new();
    register_demo_handlers(&mut handlers)
        .map_err(|err| crate::exit::CliError::new(INTERNAL, err.to_string()))?;

    let identity = EngineIdentity::with_attributes(args.profile.into(), args.attributes);
    let mut session = EngineSession::open(ChannelPair::stdio(), handlers, identity)
        .map_err(|err| session_error("open engine session", err))?;

    info!("engine session serving on stdio");
    session
        .run_until_closed()
        .map_err(|err| session_error("engine session", err))?;
    info!("engine session closed");
    Ok(SUCCESS)
}

/// The built-in handler set: enough surface to exercise plain, block and
/// token arguments plus nested call-backs from a hosting process.
fn register_demo_handlers(handlers: &mut HandlerTable<EngineSession>) -> SessionResult<()> {
    handlers.register("echo", |session: &mut EngineSession| {
        let line = session.read_argument_line()?;
        Ok(line)
    })?;

    handlers.register("double", |session: &mut EngineSession| {
        let n: i64 = session.read_argument_line()?.parse()?;
        Ok((n * 2).to_string())
    })?;

    handlers.register("upper", |session: &mut EngineSession| {
        let line = session.read_argument_line()?;
        Ok(line.to_uppercase())
    })?;

    // Calls back into the hosting process: the host must expose "compute".
    handlers.register("square", |session: &mut EngineSession| {
        let n = session.read_argument_line()?;
        session
            .call_process("compute", &[macrolink_session::Argument::Line(format!("{n}*{n}"))])
            .map_err(HandlerError::from)
    })?;

    handlers.register("linecount", |session: &mut EngineSession| {
        let block = session.read_argument_block()?;
        Ok(block.split('\n').count().to_string())
    })?;

    handlers.register("tokencount", |session: &mut EngineSession| {
        let tokens = session.read_argument_tokens()?;
        Ok(tokens.len().to_string())
    })?;

    handlers.register("fail", |_session: &mut EngineSession| {
        Err(HandlerError::new(
            "deliberate failure\nraised by the demo fail handler",
        ))
    })?;

    Ok(())
}
