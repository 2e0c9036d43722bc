//! Nested call dispatch and handshake for macrolink sessions.
//!
//! This is the stateful layer: a session is one handshake followed by any
//! number of mutually nested cross-runtime calls, all driven by a single
//! logical thread of control. One side runs while the other blocks reading;
//! "concurrency" is interleaving through nested reentrant calls, never
//! simultaneity.
//!
//! - [`ProcessSession`] — the general-purpose control process: can invoke
//!   the engine at any time and bounds every wait with a timeout.
//! - [`EngineSession`] — the cooperative macro-expansion engine: only reacts
//!   at explicit trigger reads and cannot bound its waits.

mod dispatch;
pub mod engine;
pub mod error;
pub mod frame;
pub mod handler;
pub mod handshake;
mod link;
pub mod process;

pub use engine::{EngineSession, Outcome};
pub use error::{RemoteFailure, Result, SessionError};
pub use frame::{CallFrame, Direction};
pub use handler::{
    reserved, validate_handler_name, Argument, HandlerError, HandlerResult, HandlerTable,
};
pub use handshake::{EngineIdentity, EngineProfile, NARROW_MARK, WIDE_MARK};
pub use process::{ProcessSession, SessionConfig};
