//! Both sides of a session in one process, connected by crossed pipes.
//!
//! The engine thread exposes `add` and `scale`; `scale` calls back into the
//! process's `lookup-factor` handler before returning, showing a nested
//! round trip.
//!
//! Run with: cargo run --example calculator

use std::thread;

use macrolink::session::{
    Argument, EngineIdentity, EngineProfile, EngineSession, HandlerError, HandlerTable,
    ProcessSession, SessionConfig,
};
use macrolink::transport::ChannelPair;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (process_pair, engine_pair) = ChannelPair::in_process()?;

    let engine_thread = thread::spawn(move || -> Result<(), macrolink::session::SessionError> {
        let mut handlers = HandlerTable::new();
        handlers.register("add", |session: &mut EngineSession| {
            let a: i64 = session.read_argument_line()?.parse()?;
            let b: i64 = session.read_argument_line()?.parse()?;
            Ok((a + b).to_string())
        })?;
        handlers.register("scale", |session: &mut EngineSession| {
            let n: i64 = session.read_argument_line()?.parse()?;
            let factor: i64 = session
                .call_process("lookup-factor", &[])
                .map_err(HandlerError::from)?
                .parse()?;
            Ok((n * factor).to_string())
        })?;

        let mut session = EngineSession::open(
            engine_pair,
            handlers,
            EngineIdentity::new(EngineProfile::Wide),
        )?;
        session.run_until_closed()
    });

    let mut handlers = HandlerTable::new();
    handlers.register("lookup-factor", |_session: &mut ProcessSession| {
        Ok("10".to_string())
    })?;

    let mut session = ProcessSession::open(process_pair, handlers, SessionConfig::default())?;

    let sum = session.invoke_remote(
        "add",
        &[
            Argument::Line("19".to_string()),
            Argument::Line("23".to_string()),
        ],
    )?;
    println!("add(19, 23) = {sum}");

    let scaled = session.invoke_remote("scale", &[Argument::Line("7".to_string())])?;
    println!("scale(7) = {scaled}");

    session.close()?;
    engine_thread.join().expect("engine thread panicked")?;
    Ok(())
}
