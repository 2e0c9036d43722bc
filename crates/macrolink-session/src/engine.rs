//! The engine side of a session.
//!
//! The engine is cooperative: it has no event loop and cannot be called
//! asynchronously. It only reacts when its own code reaches an explicit
//! read — so every point at which the engine might need to act on the
//! process is a statically placed call to [`EngineSession::run_one_triggered_call`]
//! (or the loops built from it). The control flow is a manually threaded
//! continuation, not a callback registry.

use std::sync::Arc;
use std::time::Duration;

use macrolink_transport::ChannelPair;
use macrolink_wire::{LineConfig, Message, TokenList};
use tracing::info;

use crate::dispatch::{self, Endpoint};
use crate::error::{Result, SessionError};
use crate::handler::{reserved, Argument, HandlerFn, HandlerResult, HandlerTable};
use crate::handshake::EngineIdentity;
use crate::link::{Link, Turn};

/// Result of servicing one trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// A handler ran and returned; more triggers may follow.
    Handled,
    /// The process sent the shutdown trigger; the run loop is done.
    Closed,
}

/// The engine-side dispatcher.
///
/// Reads are unbounded: the engine cannot implement timeouts (its read
/// primitive blocks at a lower level); bounding the exchange is the
/// process side's job.
pub struct EngineSession {
    link: Link,
    handlers: HandlerTable<EngineSession>,
    identity: EngineIdentity,
}

impl EngineSession {
    /// Open the engine side: announce the identity line, then hand the turn
    /// to the process. No handler can run before the announcement.
    pub fn open(
        pair: ChannelPair,
        handlers: HandlerTable<EngineSession>,
        identity: EngineIdentity,
    ) -> Result<EngineSession> {
        let mut link = Link::new(pair, LineConfig::default(), Turn::Ours);
        link.write_raw_line(&identity.encode())?;
        info!(profile = ?identity.profile, "engine identity announced");

        Ok(EngineSession {
            link,
            handlers,
            identity,
        })
    }

    /// The identity this engine announced.
    pub fn identity(&self) -> &EngineIdentity {
        &self.identity
    }

    /// Read exactly one trigger line and act on it.
    ///
    /// The next line must be an invoke: either the shutdown trigger
    /// (returns [`Outcome::Closed`]) or a handler name, whose body is
    /// executed to completion — including any nested calls it makes into
    /// the process — before this returns.
    pub fn run_one_triggered_call(&mut self) -> Result<Outcome> {
        let message = match self.link.read_message(None) {
            Ok(message) => message,
            Err(err) => {
                self.link.poison();
                return Err(err);
            }
        };

        match message {
            Message::Invoke { handler } if handler == reserved::CLOSE => {
                self.link.close();
                info!("session closed by peer");
                Ok(Outcome::Closed)
            }
            Message::Invoke { handler } => {
                dispatch::run_inbound(self, &handler)?;
                Ok(Outcome::Handled)
            }
            Message::Return { value } => {
                self.link.poison();
                Err(SessionError::UnexpectedMessageKind(format!("r{value}")))
            }
        }
    }

    /// Service triggers until the process closes the session.
    pub fn run_until_closed(&mut self) -> Result<()> {
        loop {
            match self.run_one_triggered_call()? {
                Outcome::Handled => continue,
                Outcome::Closed => return Ok(()),
            }
        }
    }

    /// Invoke a handler on the process and await its return value.
    ///
    /// Only valid from inside a running handler body (the engine holds the
    /// turn there); nested triggers from the process are serviced before
    /// the matching return is observed.
    pub fn call_process(&mut self, handler: &str, args: &[Argument]) -> Result<String> {
        dispatch::invoke(self, handler, args)
    }

    /// Send a return for the currently executing inbound invocation. See
    /// [`crate::ProcessSession::return_to_caller`].
    pub fn return_to_caller(&mut self, value: &str) -> Result<()> {
        self.link.send_return(value)
    }

    /// Register an additional handler binding from inside a handler body.
    pub fn register_handler<F>(&mut self, name: &str, handler: F) -> Result<()>
    where
        F: Fn(&mut EngineSession) -> HandlerResult + Send + Sync + 'static,
    {
        self.handlers.register(name, handler)
    }

    /// Read one plain-line argument of the current invocation.
    pub fn read_argument_line(&mut self) -> Result<String> {
        self.link.read_argument_line(None)
    }

    /// Read one token-list argument of the current invocation.
    pub fn read_argument_tokens(&mut self) -> Result<TokenList> {
        self.link.read_argument_tokens(None)
    }

    /// Read one block argument of the current invocation.
    pub fn read_argument_block(&mut self) -> Result<String> {
        self.link.read_argument_block(None)
    }

    /// Number of in-flight calls.
    pub fn call_depth(&self) -> usize {
        self.link.frames.depth()
    }

    /// Whether the session is still usable.
    pub fn is_ready(&self) -> bool {
        self.link.is_ready()
    }
}

impl Endpoint for EngineSession {
    const SIDE: &'static str = "engine";

    fn link(&mut self) -> &mut Link {
        &mut self.link
    }

    fn lookup(&self, name: &str) -> Option<Arc<HandlerFn<EngineSession>>> {
        self.handlers.get(name)
    }

    fn read_timeout(&self) -> Option<Duration> {
        None
    }
}

impl std::fmt::Debug for EngineSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineSession")
            .field("identity", &self.identity)
            .field("handlers", &self.handlers)
            .field("link", &self.link)
            .finish()
    }
}
