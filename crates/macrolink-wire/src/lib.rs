//! Token codec, line framing and block protocol for macrolink.
//!
//! This is the core value-add layer of macrolink. The wire is plain text
//! lines, yet arbitrary symbolic tokens — including control characters —
//! survive transport losslessly:
//! - A self-terminating token encoding (category markers + caret escapes)
//! - Newline framing with buffered, timeout-capable readers
//! - A delimiter-based block protocol for multi-line payloads
//! - The `i`/`r` message grammar consumed by the dispatchers
//!
//! No partial reads, no buffer management in user code.

pub mod block;
pub mod codec;
pub mod error;
pub mod line;
pub mod message;
pub mod token;

pub use block::{read_block, read_block_timeout, write_block};
pub use codec::{decode, encode};
pub use error::{DecodeError, Result, WireError};
pub use line::{LineConfig, LineReader, LineWriter, DEFAULT_MAX_LINE_LEN};
pub use message::{Message, INVOKE_PREFIX, RETURN_PREFIX};
pub use token::{Category, Token, TokenList};
