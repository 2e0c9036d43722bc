//! The nested call/return state machine shared by both dispatchers.
//!
//! An outbound call pushes a frame, sends the invoke, then enters a receive
//! loop. Each incoming message is either a nested invoke from the peer —
//! executed synchronously on this same logical thread before the loop
//! resumes — or the return matching the top frame, which ends the loop.
//! This reentrancy is what allows arbitrarily deep mutual nesting without
//! deadlock; the cost is the explicit frame stack instead of a flat
//! request/response exchange.

use std::sync::Arc;
use std::time::Duration;

use macrolink_wire::Message;
use tracing::{debug, trace};

use crate::error::{RemoteFailure, Result, SessionError};
use crate::frame::{CallFrame, Direction};
use crate::handler::{reserved, validate_handler_name, Argument, HandlerError, HandlerFn};
use crate::link::Link;

/// One side of a session, as seen by the shared dispatch machinery.
pub(crate) trait Endpoint: Sized {
    /// Side label for diagnostics.
    const SIDE: &'static str;

    fn link(&mut self) -> &mut Link;

    /// Look up a local handler, cloning it out of the table.
    fn lookup(&self, name: &str) -> Option<Arc<HandlerFn<Self>>>;

    /// Per-read bound for awaiting the peer. `None` blocks indefinitely
    /// (the engine side, which cannot implement timeouts).
    fn read_timeout(&self) -> Option<Duration>;
}

/// Invoke a remote handler and await its return, servicing nested inbound
/// invokes along the way.
pub(crate) fn invoke<S: Endpoint>(
    session: &mut S,
    handler: &str,
    args: &[Argument],
) -> Result<String> {
    validate_handler_name(handler)?;
    debug!(side = S::SIDE, handler, "invoking remote handler");

    session
        .link()
        .frames
        .push(CallFrame::new(handler, Direction::Outbound));
    if let Err(err) = session.link().send_invoke(handler, args) {
        session.link().poison();
        return Err(err);
    }

    receive_until_return(session)
}

/// The reentrant receive loop: runs until the top outbound frame's return
/// arrives.
fn receive_until_return<S: Endpoint>(session: &mut S) -> Result<String> {
    loop {
        let timeout = session.read_timeout();
        let message = match session.link().read_message(timeout) {
            Ok(message) => message,
            Err(err) => {
                session.link().poison();
                return Err(err);
            }
        };

        match message {
            Message::Invoke { handler } => run_inbound(session, &handler)?,
            Message::Return { value } => {
                match session.link().frames.pop() {
                    Some(frame) if frame.direction == Direction::Outbound => {
                        trace!(side = S::SIDE, handler = %frame.handler, "return received");
                        return Ok(value);
                    }
                    _ => {
                        session.link().poison();
                        return Err(SessionError::UnexpectedMessageKind(format!(
                            "r{value}"
                        )));
                    }
                }
            }
        }
    }
}

/// Execute one inbound invocation: reserved trigger or local handler.
pub(crate) fn run_inbound<S: Endpoint>(session: &mut S, name: &str) -> Result<()> {
    if name == reserved::FAIL {
        return Err(receive_failure(session));
    }
    if name == reserved::CLOSE {
        // A close while calls are open (or outside the engine's top-level
        // loop, which intercepts it before we get here) is a protocol
        // violation.
        session.link().poison();
        return Err(SessionError::UnexpectedMessageKind(format!("i{name}")));
    }

    session
        .link()
        .frames
        .push(CallFrame::new(name, Direction::Inbound));

    let result = match session.lookup(name) {
        Some(handler) => {
            trace!(side = S::SIDE, handler = name, "running local handler");
            handler.as_ref()(session)
        }
        None => Err(HandlerError::new(format!("unknown handler {name:?}"))),
    };

    match result {
        Ok(value) => {
            if let Err(err) = session.link().send_return(&value) {
                session.link().poison();
                return Err(err);
            }
            Ok(())
        }
        Err(failure) => Err(forward_failure(session, name, failure)),
    }
}

/// The peer reported a handler failure: read the trace block, poison, and
/// surface it against the call we were awaiting.
fn receive_failure<S: Endpoint>(session: &mut S) -> SessionError {
    let timeout = session.read_timeout();
    let trace = match session.link().read_argument_block(timeout) {
        Ok(trace) => trace,
        Err(err) => {
            session.link().poison();
            return err;
        }
    };
    let pending = session
        .link()
        .frames
        .top()
        .map(|frame| frame.handler.clone())
        .unwrap_or_default();
    session.link().poison();
    debug!(side = S::SIDE, handler = %pending, "peer reported handler failure");
    SessionError::Remote(RemoteFailure::new(pending, trace))
}

/// A local handler failed: forward the trace to the peer, poison, and
/// surface the failure locally. The failure is session-ending on both
/// sides — nested failures are not catchable in outer calls.
fn forward_failure<S: Endpoint>(
    session: &mut S,
    name: &str,
    failure: HandlerError,
) -> SessionError {
    debug!(side = S::SIDE, handler = name, "local handler failed");
    session.link().frames.pop();
    // Best effort: if the channel is already broken the poison below is all
    // that matters.
    let _ = session
        .link()
        .send_invoke(reserved::FAIL, &[Argument::Block(failure.trace.clone())]);
    session.link().poison();
    SessionError::Remote(RemoteFailure::new(name, failure.trace))
}
