//! Channel transport backends for macrolink.
//!
//! Provides the one-directional byte-stream halves the protocol runs over,
//! abstracting over how the two runtimes are actually connected:
//! - Anonymous pipes (in-process tests, custom plumbing)
//! - This process's own stdio (when the engine runtime spawned us)
//! - A spawned child process's stdin/stdout (when we host the engine)
//!
//! This is the lowest layer of macrolink. Everything else builds on the
//! [`ReadHalf`]/[`WriteHalf`] types provided here.

pub mod error;
pub mod pair;
pub mod stream;

pub use error::{Result, TransportError};
pub use pair::{ChannelPair, EngineChild};
pub use stream::{ReadHalf, WriteHalf};
