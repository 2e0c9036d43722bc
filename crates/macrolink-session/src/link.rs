//! Shared per-endpoint channel state.
//!
//! Both dispatchers own exactly one [`Link`]: the line reader/writer pair,
//! the call-frame stack, and the turn/liveness guards. The turn guard makes
//! the protocol's turn-taking discipline a checked property instead of a
//! convention: a send while the peer holds the turn is refused before any
//! byte leaves the process.

use std::io::ErrorKind;
use std::time::Duration;

use macrolink_transport::{ChannelPair, ReadHalf, WriteHalf};
use macrolink_wire::{
    block, codec, LineConfig, LineReader, LineWriter, Message, TokenList, WireError,
};
use tracing::{debug, warn};

use crate::error::{Result, SessionError};
use crate::frame::{Direction, FrameStack};
use crate::handler::Argument;

/// Liveness of the endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LinkState {
    Ready,
    Poisoned,
    Closed,
}

/// Whose turn it is to produce the next message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Turn {
    Ours,
    Theirs,
}

pub(crate) struct Link {
    reader: LineReader<ReadHalf>,
    writer: LineWriter<WriteHalf>,
    pub(crate) frames: FrameStack,
    state: LinkState,
    turn: Turn,
}

impl Link {
    pub fn new(pair: ChannelPair, line_config: LineConfig, turn: Turn) -> Self {
        let (rx, tx) = pair.into_halves();
        Self {
            reader: LineReader::with_config(rx, line_config),
            writer: LineWriter::new(tx),
            frames: FrameStack::default(),
            state: LinkState::Ready,
            turn,
        }
    }

    fn ensure_ready(&self) -> Result<()> {
        match self.state {
            LinkState::Ready => Ok(()),
            LinkState::Poisoned => Err(SessionError::Poisoned),
            LinkState::Closed => Err(SessionError::Closed),
        }
    }

    fn ensure_our_turn(&self) -> Result<()> {
        if self.turn == Turn::Ours {
            Ok(())
        } else {
            Err(SessionError::UnexpectedMessageKind(
                "send attempted while the peer holds the turn".to_string(),
            ))
        }
    }

    /// Mark the session unusable. Idempotent.
    pub fn poison(&mut self) {
        if self.state == LinkState::Ready {
            warn!("session poisoned");
            self.state = LinkState::Poisoned;
        }
    }

    /// Mark the session cleanly closed.
    pub fn close(&mut self) {
        if self.state == LinkState::Ready {
            self.state = LinkState::Closed;
        }
    }

    pub fn is_ready(&self) -> bool {
        self.state == LinkState::Ready
    }

    /// Read one line outside the message grammar (the identity line).
    pub fn read_raw_line(&mut self, timeout: Option<Duration>) -> Result<String> {
        self.ensure_ready()?;
        debug_assert_eq!(self.turn, Turn::Theirs);
        let line = self
            .reader
            .read_line_timeout(timeout)
            .map_err(|err| map_read_error(err, timeout))?;
        self.turn = Turn::Ours;
        Ok(line)
    }

    /// Write one line outside the message grammar (the identity line).
    pub fn write_raw_line(&mut self, line: &str) -> Result<()> {
        self.ensure_ready()?;
        self.ensure_our_turn()?;
        self.writer.write_line(line)?;
        self.turn = Turn::Theirs;
        Ok(())
    }

    /// Read the next dispatcher message. Transfers the turn to us.
    pub fn read_message(&mut self, timeout: Option<Duration>) -> Result<Message> {
        self.ensure_ready()?;
        debug_assert_eq!(self.turn, Turn::Theirs);
        let line = self
            .reader
            .read_line_timeout(timeout)
            .map_err(|err| map_read_error(err, timeout))?;
        self.turn = Turn::Ours;
        Message::parse(&line).ok_or(SessionError::UnexpectedMessageKind(line))
    }

    /// Send an invoke line plus its argument lines/blocks, as one turn.
    pub fn send_invoke(&mut self, handler: &str, args: &[Argument]) -> Result<()> {
        self.ensure_ready()?;
        self.ensure_our_turn()?;
        debug!(handler, args = args.len(), "sending invoke");
        self.writer.write_line(
            &Message::Invoke {
                handler: handler.to_string(),
            }
            .encode(),
        )?;
        for arg in args {
            self.write_argument(arg)?;
        }
        self.turn = Turn::Theirs;
        Ok(())
    }

    fn write_argument(&mut self, arg: &Argument) -> Result<()> {
        match arg {
            Argument::Line(line) => {
                if line.contains('\n') {
                    return Err(SessionError::InvalidPayload(
                        "argument line contains an embedded newline".to_string(),
                    ));
                }
                self.writer.write_line(line)?;
            }
            Argument::Tokens(tokens) => {
                self.writer.write_line(&codec::encode(tokens))?;
            }
            Argument::Block(text) => {
                block::write_block(&mut self.writer, text)?;
            }
        }
        Ok(())
    }

    /// Pop the top inbound frame and send its return line.
    ///
    /// Exactly one return per invocation: calling this without an open
    /// inbound frame (or a second time for the same frame) is a programming
    /// error.
    pub fn send_return(&mut self, value: &str) -> Result<()> {
        self.ensure_ready()?;
        match self.frames.top() {
            Some(frame) if frame.direction == Direction::Inbound => {}
            _ => return Err(SessionError::NoOpenFrame),
        }
        self.ensure_our_turn()?;
        if value.contains('\n') {
            return Err(SessionError::InvalidPayload(
                "return value contains an embedded newline".to_string(),
            ));
        }
        let frame = self.frames.pop();
        debug!(handler = ?frame.map(|f| f.handler), "sending return");
        self.writer.write_line(
            &Message::Return {
                value: value.to_string(),
            }
            .encode(),
        )?;
        self.turn = Turn::Theirs;
        Ok(())
    }

    /// Read one plain argument line. Part of consuming the peer's current
    /// message, so the turn does not move.
    pub fn read_argument_line(&mut self, timeout: Option<Duration>) -> Result<String> {
        self.ensure_ready()?;
        self.reader
            .read_line_timeout(timeout)
            .map_err(|err| map_read_error(err, timeout))
    }

    /// Read one token-list argument line.
    pub fn read_argument_tokens(&mut self, timeout: Option<Duration>) -> Result<TokenList> {
        let line = self.read_argument_line(timeout)?;
        codec::decode(&line).map_err(|err| SessionError::Wire(WireError::Decode(err)))
    }

    /// Read one block argument.
    pub fn read_argument_block(&mut self, timeout: Option<Duration>) -> Result<String> {
        self.ensure_ready()?;
        block::read_block_timeout(&mut self.reader, timeout)
            .map_err(|err| map_read_error(err, timeout))
    }
}

impl std::fmt::Debug for Link {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Link")
            .field("state", &self.state)
            .field("turn", &self.turn)
            .field("depth", &self.frames.depth())
            .finish()
    }
}

fn map_read_error(err: WireError, timeout: Option<Duration>) -> SessionError {
    match err {
        WireError::Io(io)
            if io.kind() == ErrorKind::TimedOut || io.kind() == ErrorKind::WouldBlock =>
        {
            SessionError::Timeout(timeout.unwrap_or_default())
        }
        other => SessionError::Wire(other),
    }
}
