//! Synchronous nested cross-runtime calls over line-oriented channels.
//!
//! macrolink connects a cooperative macro-expansion engine and a
//! general-purpose control process over a pair of one-directional text-line
//! channels, and lets each invoke procedures in the other with unbounded
//! mutual nesting.
//!
//! # Crate Structure
//!
//! - [`transport`] — Channel backends (pipes, stdio, child processes)
//! - [`wire`] — Token codec, line framing, block protocol
//! - [`session`] — Handshake and the nested call dispatchers

/// Re-export transport types.
pub mod transport {
    pub use macrolink_transport::*;
}

/// Re-export wire types.
pub mod wire {
    pub use macrolink_wire::*;
}

/// Re-export session types.
pub mod session {
    pub use macrolink_session::*;
}
