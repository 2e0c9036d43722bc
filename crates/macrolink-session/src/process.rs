//! The control-process side of a session.

use std::sync::Arc;
use std::time::Duration;

use macrolink_transport::ChannelPair;
use macrolink_wire::{LineConfig, TokenList};
use tracing::info;

use crate::dispatch::{self, Endpoint};
use crate::error::{Result, SessionError};
use crate::handler::{reserved, Argument, HandlerFn, HandlerResult, HandlerTable};
use crate::handshake::EngineIdentity;
use crate::link::{Link, Turn};

/// Configuration for the process side of a session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Bound on each blocking read while awaiting the engine. On expiry the
    /// outstanding call fails with [`SessionError::Timeout`] and the session
    /// is unusable. `None` disables the bound (debugging only — a hung
    /// engine then hangs the process).
    pub reply_timeout: Option<Duration>,
    /// Line framing limits.
    pub line: LineConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            reply_timeout: Some(Duration::from_secs(60)),
            line: LineConfig::default(),
        }
    }
}

/// The process-side dispatcher.
///
/// Owns the channel pair, the handler table, and the stack of in-flight
/// calls. Handlers run synchronously on the thread that drives the session;
/// there is never concurrent handler execution.
pub struct ProcessSession {
    link: Link,
    handlers: HandlerTable<ProcessSession>,
    identity: EngineIdentity,
    config: SessionConfig,
}

impl ProcessSession {
    /// Open a session over an established channel pair.
    ///
    /// Blocks until the engine's identity line arrives (bounded by the
    /// configured timeout). Any other first content fails with
    /// [`SessionError::HandshakeExpected`]; no call frame can exist before
    /// the identity is consumed.
    pub fn open(
        pair: ChannelPair,
        handlers: HandlerTable<ProcessSession>,
        config: SessionConfig,
    ) -> Result<ProcessSession> {
        let mut link = Link::new(pair, config.line.clone(), Turn::Theirs);
        let line = link.read_raw_line(config.reply_timeout)?;
        let identity = EngineIdentity::parse(&line)?;
        info!(profile = ?identity.profile, "engine identity received");

        Ok(ProcessSession {
            link,
            handlers,
            identity,
            config,
        })
    }

    /// The engine's announced identity.
    pub fn identity(&self) -> &EngineIdentity {
        &self.identity
    }

    /// Invoke a handler on the engine and await its return value.
    ///
    /// While waiting, nested invokes from the engine are serviced
    /// synchronously, so the engine handler may call back into this process
    /// arbitrarily deep before returning.
    pub fn invoke_remote(&mut self, handler: &str, args: &[Argument]) -> Result<String> {
        self.check_profile(args)?;
        dispatch::invoke(self, handler, args)
    }

    /// Send a return for the currently executing inbound invocation.
    ///
    /// Called by the dispatcher once a handler body completes; exposed so
    /// misuse (no open frame, double return) fails loudly with
    /// [`SessionError::NoOpenFrame`].
    pub fn return_to_caller(&mut self, value: &str) -> Result<()> {
        self.link.send_return(value)
    }

    /// Register an additional handler binding from inside a handler body.
    pub fn register_handler<F>(&mut self, name: &str, handler: F) -> Result<()>
    where
        F: Fn(&mut ProcessSession) -> HandlerResult + Send + Sync + 'static,
    {
        self.handlers.register(name, handler)
    }

    /// Read one plain-line argument of the current invocation.
    pub fn read_argument_line(&mut self) -> Result<String> {
        let timeout = self.config.reply_timeout;
        self.link.read_argument_line(timeout)
    }

    /// Read one token-list argument of the current invocation.
    pub fn read_argument_tokens(&mut self) -> Result<TokenList> {
        let timeout = self.config.reply_timeout;
        self.link.read_argument_tokens(timeout)
    }

    /// Read one block argument of the current invocation.
    pub fn read_argument_block(&mut self) -> Result<String> {
        let timeout = self.config.reply_timeout;
        self.link.read_argument_block(timeout)
    }

    /// Number of in-flight calls.
    pub fn call_depth(&self) -> usize {
        self.link.frames.depth()
    }

    /// Whether the session is still usable.
    pub fn is_ready(&self) -> bool {
        self.link.is_ready()
    }

    /// Orderly shutdown: tell the engine to leave its run loop, then mark
    /// the session closed. No reply is awaited.
    pub fn close(&mut self) -> Result<()> {
        self.link.send_invoke(reserved::CLOSE, &[])?;
        self.link.close();
        info!("session closed");
        Ok(())
    }

    /// Reject token arguments a narrow engine cannot represent, before
    /// anything is written to the wire.
    fn check_profile(&self, args: &[Argument]) -> Result<()> {
        let max = self.identity.profile.max_char_code();
        for arg in args {
            if let Argument::Tokens(tokens) = arg {
                if let Some(code) = tokens.max_char_code() {
                    if code > max {
                        return Err(SessionError::InvalidPayload(format!(
                            "character U+{code:04X} exceeds the engine profile's maximum U+{max:04X}"
                        )));
                    }
                }
            }
        }
        Ok(())
    }
}

impl Endpoint for ProcessSession {
    const SIDE: &'static str = "process";

    fn link(&mut self) -> &mut Link {
        &mut self.link
    }

    fn lookup(&self, name: &str) -> Option<Arc<HandlerFn<ProcessSession>>> {
        self.handlers.get(name)
    }

    fn read_timeout(&self) -> Option<Duration> {
        self.config.reply_timeout
    }
}

impl std::fmt::Debug for ProcessSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessSession")
            .field("identity", &self.identity)
            .field("handlers", &self.handlers)
            .field("link", &self.link)
            .finish()
    }
}
