use std::io::{ErrorKind, Read, Write};
use std::time::{Duration, Instant};

use bytes::{Buf, BytesMut};
use macrolink_transport::ReadHalf;

use crate::error::{Result, WireError};

const INITIAL_BUFFER_CAPACITY: usize = 8 * 1024;
const READ_CHUNK_SIZE: usize = 8 * 1024;

/// Default maximum line length: 16 MiB.
pub const DEFAULT_MAX_LINE_LEN: usize = 16 * 1024 * 1024;

/// Configuration for line framing.
#[derive(Debug, Clone)]
pub struct LineConfig {
    /// Maximum accepted line length in bytes (excluding the newline).
    pub max_line_len: usize,
}

impl Default for LineConfig {
    fn default() -> Self {
        Self {
            max_line_len: DEFAULT_MAX_LINE_LEN,
        }
    }
}

/// Reads complete newline-terminated lines from any `Read` stream.
///
/// Handles partial reads internally — callers always get whole lines with
/// the terminating newline stripped.
pub struct LineReader<T> {
    inner: T,
    buf: BytesMut,
    config: LineConfig,
}

impl<T: Read> LineReader<T> {
    /// Create a new line reader with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, LineConfig::default())
    }

    /// Create a new line reader with explicit configuration.
    pub fn with_config(inner: T, config: LineConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            config,
        }
    }

    /// Read the next complete line (blocking).
    ///
    /// Returns `Err(WireError::ConnectionClosed)` on EOF, including EOF in
    /// the middle of an unterminated line.
    pub fn read_line(&mut self) -> Result<String> {
        loop {
            if let Some(line) = self.take_buffered_line()? {
                return Ok(line);
            }
            if self.fill()? == 0 {
                return Err(WireError::ConnectionClosed);
            }
        }
    }

    /// Extract one line from the buffer if a complete one is present.
    fn take_buffered_line(&mut self) -> Result<Option<String>> {
        match self.buf.iter().position(|b| *b == b'\n') {
            Some(pos) => {
                if pos > self.config.max_line_len {
                    return Err(WireError::LineTooLong {
                        size: pos,
                        max: self.config.max_line_len,
                    });
                }
                let line = self.buf.split_to(pos).to_vec();
                self.buf.advance(1); // the newline itself
                Ok(Some(String::from_utf8(line)?))
            }
            None => {
                if self.buf.len() > self.config.max_line_len {
                    return Err(WireError::LineTooLong {
                        size: self.buf.len(),
                        max: self.config.max_line_len,
                    });
                }
                Ok(None)
            }
        }
    }

    /// Read one chunk into the buffer. Returns the number of bytes read;
    /// zero means EOF.
    fn fill(&mut self) -> Result<usize> {
        let mut chunk = [0u8; READ_CHUNK_SIZE];
        loop {
            match self.inner.read(&mut chunk) {
                Ok(0) => return Ok(0),
                Ok(n) => {
                    self.buf.extend_from_slice(&chunk[..n]);
                    return Ok(n);
                }
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(WireError::Io(err)),
            }
        }
    }

    /// Whether a complete line is already buffered.
    pub fn has_buffered_line(&self) -> bool {
        self.buf.iter().any(|b| *b == b'\n')
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Current line framing configuration.
    pub fn config(&self) -> &LineConfig {
        &self.config
    }
}

impl LineReader<ReadHalf> {
    /// Read the next complete line, bounded by a timeout.
    ///
    /// `None` blocks indefinitely. On expiry the read fails with
    /// `ErrorKind::TimedOut`; no partial data is lost — whatever arrived
    /// stays buffered.
    pub fn read_line_timeout(&mut self, timeout: Option<Duration>) -> Result<String> {
        let Some(timeout) = timeout else {
            return self.read_line();
        };

        let deadline = Instant::now() + timeout;
        loop {
            if let Some(line) = self.take_buffered_line()? {
                return Ok(line);
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            let ready = if remaining.is_zero() {
                false
            } else {
                self.inner
                    .wait_readable(remaining)
                    .map_err(transport_to_wire_error)?
            };
            if !ready {
                return Err(WireError::Io(std::io::Error::from(ErrorKind::TimedOut)));
            }
            if self.fill()? == 0 {
                return Err(WireError::ConnectionClosed);
            }
        }
    }
}

fn transport_to_wire_error(err: macrolink_transport::TransportError) -> WireError {
    match err {
        macrolink_transport::TransportError::Io(io) => WireError::Io(io),
        other => WireError::Io(std::io::Error::other(other.to_string())),
    }
}

/// Writes newline-terminated lines to any `Write` stream.
pub struct LineWriter<T> {
    inner: T,
}

impl<T: Write> LineWriter<T> {
    /// Create a new line writer.
    pub fn new(inner: T) -> Self {
        Self { inner }
    }

    /// Write one line followed by a newline, then flush.
    ///
    /// The line must not contain an embedded newline; the wire has no other
    /// framing, so one would desynchronize the peer.
    pub fn write_line(&mut self, line: &str) -> Result<()> {
        if line.contains('\n') {
            return Err(WireError::EmbeddedNewline);
        }
        self.write_all(line.as_bytes())?;
        self.write_all(b"\n")?;
        self.flush()
    }

    fn write_all(&mut self, mut buf: &[u8]) -> Result<()> {
        while !buf.is_empty() {
            match self.inner.write(buf) {
                Ok(0) => return Err(WireError::ConnectionClosed),
                Ok(n) => buf = &buf[n..],
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(WireError::Io(err)),
            }
        }
        Ok(())
    }

    /// Flush the underlying stream.
    pub fn flush(&mut self) -> Result<()> {
        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(WireError::Io(err)),
            }
        }
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the writer and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    #[test]
    fn read_single_line() {
        let mut reader = LineReader::new(Cursor::new(b"hello\n".to_vec()));
        assert_eq!(reader.read_line().unwrap(), "hello");
    }

    #[test]
    fn read_multiple_lines() {
        let mut reader = LineReader::new(Cursor::new(b"one\ntwo\nthree\n".to_vec()));
        assert_eq!(reader.read_line().unwrap(), "one");
        assert_eq!(reader.read_line().unwrap(), "two");
        assert_eq!(reader.read_line().unwrap(), "three");
        assert!(matches!(
            reader.read_line(),
            Err(WireError::ConnectionClosed)
        ));
    }

    #[test]
    fn empty_lines_and_trailing_spaces_preserved() {
        let mut reader = LineReader::new(Cursor::new(b"\na  \n \n".to_vec()));
        assert_eq!(reader.read_line().unwrap(), "");
        assert_eq!(reader.read_line().unwrap(), "a  ");
        assert_eq!(reader.read_line().unwrap(), " ");
    }

    #[test]
    fn eof_mid_line_is_connection_closed() {
        let mut reader = LineReader::new(Cursor::new(b"partial".to_vec()));
        assert!(matches!(
            reader.read_line(),
            Err(WireError::ConnectionClosed)
        ));
    }

    #[test]
    fn line_too_long_rejected() {
        let config = LineConfig { max_line_len: 4 };
        let mut reader = LineReader::with_config(Cursor::new(b"abcdefgh\n".to_vec()), config);
        assert!(matches!(
            reader.read_line(),
            Err(WireError::LineTooLong { .. })
        ));
    }

    #[test]
    fn invalid_utf8_rejected() {
        let mut reader = LineReader::new(Cursor::new(vec![0xFF, 0xFE, b'\n']));
        assert!(matches!(reader.read_line(), Err(WireError::Utf8(_))));
    }

    #[test]
    fn partial_reads_reassembled() {
        struct ByteByByte {
            bytes: Vec<u8>,
            pos: usize,
        }
        impl Read for ByteByByte {
            fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
                if self.pos >= self.bytes.len() || buf.is_empty() {
                    return Ok(0);
                }
                buf[0] = self.bytes[self.pos];
                self.pos += 1;
                Ok(1)
            }
        }

        let mut reader = LineReader::new(ByteByByte {
            bytes: b"slow line\n".to_vec(),
            pos: 0,
        });
        assert_eq!(reader.read_line().unwrap(), "slow line");
    }

    #[test]
    fn interrupted_read_retries() {
        struct InterruptedThenData {
            fired: bool,
            bytes: Vec<u8>,
            pos: usize,
        }
        impl Read for InterruptedThenData {
            fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
                if !self.fired {
                    self.fired = true;
                    return Err(std::io::Error::from(ErrorKind::Interrupted));
                }
                let n = (self.bytes.len() - self.pos).min(buf.len());
                if n == 0 {
                    return Ok(0);
                }
                buf[..n].copy_from_slice(&self.bytes[self.pos..self.pos + n]);
                self.pos += n;
                Ok(n)
            }
        }

        let mut reader = LineReader::new(InterruptedThenData {
            fired: false,
            bytes: b"ok\n".to_vec(),
            pos: 0,
        });
        assert_eq!(reader.read_line().unwrap(), "ok");
    }

    #[test]
    fn write_line_appends_newline_and_flushes() {
        let mut writer = LineWriter::new(Cursor::new(Vec::<u8>::new()));
        writer.write_line("hello").unwrap();
        writer.write_line("").unwrap();
        assert_eq!(writer.into_inner().into_inner(), b"hello\n\n");
    }

    #[test]
    fn write_line_rejects_embedded_newline() {
        let mut writer = LineWriter::new(Cursor::new(Vec::<u8>::new()));
        assert!(matches!(
            writer.write_line("two\nlines"),
            Err(WireError::EmbeddedNewline)
        ));
    }

    #[test]
    fn writer_reader_roundtrip() {
        let mut writer = LineWriter::new(Cursor::new(Vec::<u8>::new()));
        writer.write_line("alpha").unwrap();
        writer.write_line("beta  ").unwrap();

        let wire = writer.into_inner().into_inner();
        let mut reader = LineReader::new(Cursor::new(wire));
        assert_eq!(reader.read_line().unwrap(), "alpha");
        assert_eq!(reader.read_line().unwrap(), "beta  ");
    }

    #[test]
    #[cfg(unix)]
    fn timeout_read_over_pipe() {
        use macrolink_transport::ChannelPair;

        let (left, mut right) = ChannelPair::in_process().unwrap();
        let (rx, _tx) = left.into_halves();
        let mut reader = LineReader::new(rx);

        // Nothing written yet: times out.
        let err = reader
            .read_line_timeout(Some(Duration::from_millis(30)))
            .unwrap_err();
        assert!(matches!(err, WireError::Io(e) if e.kind() == ErrorKind::TimedOut));

        // After a write, the same call succeeds.
        use std::io::Write as _;
        right.writer().write_all(b"late\n").unwrap();
        right.writer().flush().unwrap();
        let line = reader
            .read_line_timeout(Some(Duration::from_millis(500)))
            .unwrap();
        assert_eq!(line, "late");
    }
}
