//! Delimiter-framed multi-line payloads.
//!
//! A block is: one delimiter line, the payload lines verbatim, then a line
//! identical to the delimiter. The delimiter is chosen per call so that it
//! cannot occur among the payload lines; the receiver accumulates until it
//! sees it again. Payload whitespace is significant — nothing is trimmed on
//! either side.

use std::io::{Read, Write};
use std::time::Duration;

use macrolink_transport::ReadHalf;

use crate::error::Result;
use crate::line::{LineReader, LineWriter};

const DELIMITER_BASE: &str = "=block=";

/// Pick a delimiter that matches none of the payload lines.
///
/// Deterministic: the base marker plus the smallest counter that collides
/// with nothing keeps the framing reproducible byte-for-byte.
fn choose_delimiter(lines: &[&str]) -> String {
    let mut n = lines.len();
    loop {
        let candidate = format!("{DELIMITER_BASE}{n}");
        if !lines.iter().any(|line| **line == candidate) {
            return candidate;
        }
        n += 1;
    }
}

/// Send `text` as a delimiter-framed block.
///
/// The payload's lines are `text` split on `'\n'`; a trailing newline thus
/// produces a final empty payload line, and `read_block` reconstructs the
/// exact original text.
pub fn write_block<W: Write>(writer: &mut LineWriter<W>, text: &str) -> Result<()> {
    let lines: Vec<&str> = text.split('\n').collect();
    let delimiter = choose_delimiter(&lines);

    writer.write_line(&delimiter)?;
    for line in &lines {
        writer.write_line(line)?;
    }
    writer.write_line(&delimiter)
}

/// Receive one delimiter-framed block.
///
/// Fails with `WireError::ConnectionClosed` if the channel closes before the
/// terminating delimiter arrives.
pub fn read_block<R: Read>(reader: &mut LineReader<R>) -> Result<String> {
    let delimiter = reader.read_line()?;
    let mut lines: Vec<String> = Vec::new();
    loop {
        let line = reader.read_line()?;
        if line == delimiter {
            return Ok(lines.join("\n"));
        }
        lines.push(line);
    }
}

/// Timeout-bounded variant of [`read_block`] for the control-process side.
///
/// The timeout applies per line, so a stalled peer is detected even in the
/// middle of a block.
pub fn read_block_timeout(
    reader: &mut LineReader<ReadHalf>,
    timeout: Option<Duration>,
) -> Result<String> {
    let delimiter = reader.read_line_timeout(timeout)?;
    let mut lines: Vec<String> = Vec::new();
    loop {
        let line = reader.read_line_timeout(timeout)?;
        if line == delimiter {
            return Ok(lines.join("\n"));
        }
        lines.push(line);
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::error::WireError;

    fn roundtrip(text: &str) {
        let mut writer = LineWriter::new(Cursor::new(Vec::<u8>::new()));
        write_block(&mut writer, text).unwrap();

        let wire = writer.into_inner().into_inner();
        let mut reader = LineReader::new(Cursor::new(wire));
        assert_eq!(read_block(&mut reader).unwrap(), text);
    }

    #[test]
    fn roundtrip_simple() {
        roundtrip("alpha\nbeta\ngamma");
    }

    #[test]
    fn roundtrip_preserves_trailing_spaces_and_empty_lines() {
        roundtrip("first  \n\n  indented\n");
        roundtrip("");
        roundtrip("\n\n\n");
    }

    #[test]
    fn roundtrip_payload_resembling_delimiter() {
        // Payload lines that look like generated delimiters force the
        // counter to skip forward.
        roundtrip("=block=1\n=block=2\n=block=3");
    }

    #[test]
    fn delimiter_never_collides() {
        let lines = ["=block=0", "=block=1", "=block=2"];
        let delimiter = choose_delimiter(&lines);
        assert!(!lines.contains(&delimiter.as_str()));
    }

    #[test]
    fn truncated_block_is_connection_closed() {
        let mut writer = LineWriter::new(Cursor::new(Vec::<u8>::new()));
        write_block(&mut writer, "one\ntwo").unwrap();

        let mut wire = writer.into_inner().into_inner();
        wire.truncate(wire.len() - 2); // lose the closing delimiter

        let mut reader = LineReader::new(Cursor::new(wire));
        assert!(matches!(
            read_block(&mut reader),
            Err(WireError::ConnectionClosed)
        ));
    }

    #[test]
    fn delimiter_line_not_included_in_payload() {
        let mut writer = LineWriter::new(Cursor::new(Vec::<u8>::new()));
        write_block(&mut writer, "payload").unwrap();

        let wire = writer.into_inner().into_inner();
        let text = String::from_utf8(wire).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], lines[2]);
        assert_eq!(lines[1], "payload");

        let mut reader = LineReader::new(Cursor::new(text.into_bytes()));
        assert_eq!(read_block(&mut reader).unwrap(), "payload");
    }
}
