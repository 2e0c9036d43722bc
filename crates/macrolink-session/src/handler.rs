//! Handler tables and invocation payloads.

use std::collections::HashMap;
use std::sync::Arc;

use macrolink_wire::TokenList;

use crate::error::{Result, SessionError};

/// Protocol-reserved trigger names. Prefixed with `!` so they can never
/// collide with user handlers, whose names are validated at registration.
pub mod reserved {
    /// Forwards a handler failure to the peer; followed by a trace block.
    pub const FAIL: &str = "!fail";
    /// Orderly shutdown trigger; ends the engine's run loop.
    pub const CLOSE: &str = "!close";
}

/// A failure produced by a handler body.
///
/// The dispatcher forwards it to the peer via the reserved failure trigger
/// and poisons the session; handler failures are never silently swallowed.
#[derive(Debug, Clone)]
pub struct HandlerError {
    /// Full (possibly multi-line) error trace.
    pub trace: String,
}

impl HandlerError {
    pub fn new(trace: impl Into<String>) -> Self {
        Self {
            trace: trace.into(),
        }
    }

    /// Build from any error value, keeping its display rendering as trace.
    pub fn from_error(err: &dyn std::error::Error) -> Self {
        Self {
            trace: err.to_string(),
        }
    }
}

impl std::fmt::Display for HandlerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.trace.lines().next().unwrap_or(""))
    }
}

/// Lets handler bodies use `?` on session operations (argument reads,
/// nested calls): the session error becomes the handler's failure trace.
impl From<SessionError> for HandlerError {
    fn from(err: SessionError) -> Self {
        HandlerError::new(err.to_string())
    }
}

impl From<std::num::ParseIntError> for HandlerError {
    fn from(err: std::num::ParseIntError) -> Self {
        HandlerError::new(err.to_string())
    }
}

/// What a handler body produces: a single-line return value for the peer,
/// or a failure.
pub type HandlerResult = std::result::Result<String, HandlerError>;

/// A handler body. Receives the session so it can read its own arguments
/// and issue nested calls to the peer before finishing.
pub type HandlerFn<S> = dyn Fn(&mut S) -> HandlerResult + Send + Sync + 'static;

/// Mapping from handler name to behavior.
///
/// Built before the session opens. The only permitted mutation afterwards is
/// a handler registering additional bindings from inside its own body.
pub struct HandlerTable<S> {
    map: HashMap<String, Arc<HandlerFn<S>>>,
}

impl<S> HandlerTable<S> {
    pub fn new() -> Self {
        Self {
            map: HashMap::new(),
        }
    }

    /// Register a handler under a validated name.
    ///
    /// Names are `[A-Za-z0-9_-]+`; re-registering an existing name is an
    /// error.
    pub fn register<F>(&mut self, name: &str, handler: F) -> Result<()>
    where
        F: Fn(&mut S) -> HandlerResult + Send + Sync + 'static,
    {
        validate_handler_name(name)?;
        if self.map.contains_key(name) {
            return Err(SessionError::InvalidHandlerName(name.to_string()));
        }
        self.map.insert(name.to_string(), Arc::new(handler));
        Ok(())
    }

    /// Look up a handler, cloning the shared behavior out of the table so
    /// the session can be mutably borrowed during the call.
    pub fn get(&self, name: &str) -> Option<Arc<HandlerFn<S>>> {
        self.map.get(name).cloned()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Registered handler names, in arbitrary order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.map.keys().map(String::as_str)
    }
}

impl<S> Default for HandlerTable<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> std::fmt::Debug for HandlerTable<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerTable")
            .field("handlers", &self.map.len())
            .finish()
    }
}

/// Check that a user handler name is non-empty and `[A-Za-z0-9_-]+`.
pub fn validate_handler_name(name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(SessionError::InvalidHandlerName(name.to_string()))
    }
}

/// One argument of a remote invocation, sent after the invoke line.
///
/// The receiving handler must read the same shapes in the same order — the
/// argument layout is part of each handler's contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Argument {
    /// One plain text line (no embedded newline).
    Line(String),
    /// One token list, serialized through the token codec.
    Tokens(TokenList),
    /// A multi-line opaque payload, sent as a delimiter-framed block.
    Block(String),
}
