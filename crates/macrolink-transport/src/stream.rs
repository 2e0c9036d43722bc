use std::io::{Read, Write};
use std::time::Duration;

use crate::error::Result;

/// The receiving half of a one-directional channel — implements `Read`.
///
/// This is the fundamental input type consumed by the wire layer. It wraps
/// whichever backend actually connects the two runtimes: an anonymous pipe,
/// a child process's stdout, or this process's own stdin.
pub struct ReadHalf {
    inner: ReadHalfInner,
}

enum ReadHalfInner {
    Pipe(std::io::PipeReader),
    ChildStdout(std::process::ChildStdout),
    Stdin(std::io::Stdin),
}

impl Read for ReadHalf {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match &mut self.inner {
            ReadHalfInner::Pipe(reader) => reader.read(buf),
            ReadHalfInner::ChildStdout(stdout) => stdout.read(buf),
            ReadHalfInner::Stdin(stdin) => stdin.read(buf),
        }
    }
}

impl ReadHalf {
    pub(crate) fn from_pipe(reader: std::io::PipeReader) -> Self {
        Self {
            inner: ReadHalfInner::Pipe(reader),
        }
    }

    pub(crate) fn from_child_stdout(stdout: std::process::ChildStdout) -> Self {
        Self {
            inner: ReadHalfInner::ChildStdout(stdout),
        }
    }

    pub(crate) fn from_stdin(stdin: std::io::Stdin) -> Self {
        Self {
            inner: ReadHalfInner::Stdin(stdin),
        }
    }

    /// Wait until a read would not block, or the timeout elapses.
    ///
    /// Returns `Ok(true)` if data (or EOF) is ready, `Ok(false)` on timeout.
    /// Used by the control-process side to bound blocking reads; the engine
    /// side never calls this.
    #[cfg(unix)]
    pub fn wait_readable(&self, timeout: Duration) -> Result<bool> {
        use std::os::fd::AsRawFd;
        use std::time::Instant;

        let fd = match &self.inner {
            ReadHalfInner::Pipe(reader) => reader.as_raw_fd(),
            ReadHalfInner::ChildStdout(stdout) => stdout.as_raw_fd(),
            ReadHalfInner::Stdin(stdin) => stdin.as_raw_fd(),
        };

        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let millis = remaining.as_millis().min(i32::MAX as u128) as libc::c_int;

            let mut pollfd = libc::pollfd {
                fd,
                events: libc::POLLIN,
                revents: 0,
            };

            // SAFETY: `pollfd` is a valid pollfd array of length 1, and `fd`
            // is an open descriptor owned by this process.
            let rc = unsafe { libc::poll(&mut pollfd, 1, millis) };

            if rc > 0 {
                return Ok(true);
            }
            if rc == 0 {
                return Ok(false);
            }
            let err = std::io::Error::last_os_error();
            if err.kind() == std::io::ErrorKind::Interrupted {
                if Instant::now() >= deadline {
                    return Ok(false);
                }
                continue;
            }
            return Err(err.into());
        }
    }

    /// Fallback for platforms without `poll(2)`: always report ready, so the
    /// subsequent read blocks without a bound.
    #[cfg(not(unix))]
    pub fn wait_readable(&self, _timeout: Duration) -> Result<bool> {
        Ok(true)
    }
}

/// The sending half of a one-directional channel — implements `Write`.
pub struct WriteHalf {
    inner: WriteHalfInner,
}

enum WriteHalfInner {
    Pipe(std::io::PipeWriter),
    ChildStdin(std::process::ChildStdin),
    Stdout(std::io::Stdout),
}

impl Write for WriteHalf {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match &mut self.inner {
            WriteHalfInner::Pipe(writer) => writer.write(buf),
            WriteHalfInner::ChildStdin(stdin) => stdin.write(buf),
            WriteHalfInner::Stdout(stdout) => stdout.write(buf),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match &mut self.inner {
            WriteHalfInner::Pipe(writer) => writer.flush(),
            WriteHalfInner::ChildStdin(stdin) => stdin.flush(),
            WriteHalfInner::Stdout(stdout) => stdout.flush(),
        }
    }
}

impl WriteHalf {
    pub(crate) fn from_pipe(writer: std::io::PipeWriter) -> Self {
        Self {
            inner: WriteHalfInner::Pipe(writer),
        }
    }

    pub(crate) fn from_child_stdin(stdin: std::process::ChildStdin) -> Self {
        Self {
            inner: WriteHalfInner::ChildStdin(stdin),
        }
    }

    pub(crate) fn from_stdout(stdout: std::io::Stdout) -> Self {
        Self {
            inner: WriteHalfInner::Stdout(stdout),
        }
    }
}

impl std::fmt::Debug for ReadHalf {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let backend = match &self.inner {
            ReadHalfInner::Pipe(_) => "pipe",
            ReadHalfInner::ChildStdout(_) => "child-stdout",
            ReadHalfInner::Stdin(_) => "stdin",
        };
        f.debug_struct("ReadHalf").field("backend", &backend).finish()
    }
}

impl std::fmt::Debug for WriteHalf {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let backend = match &self.inner {
            WriteHalfInner::Pipe(_) => "pipe",
            WriteHalfInner::ChildStdin(_) => "child-stdin",
            WriteHalfInner::Stdout(_) => "stdout",
        };
        f.debug_struct("WriteHalf")
            .field("backend", &backend)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pipe_roundtrip() {
        let (reader, writer) = std::io::pipe().unwrap();
        let mut rx = ReadHalf::from_pipe(reader);
        let mut tx = WriteHalf::from_pipe(writer);

        tx.write_all(b"hello\n").unwrap();
        tx.flush().unwrap();

        let mut buf = [0u8; 6];
        rx.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"hello\n");
    }

    #[test]
    #[cfg(unix)]
    fn wait_readable_times_out_on_empty_pipe() {
        let (reader, _writer) = std::io::pipe().unwrap();
        let rx = ReadHalf::from_pipe(reader);
        let ready = rx.wait_readable(Duration::from_millis(20)).unwrap();
        assert!(!ready);
    }

    #[test]
    #[cfg(unix)]
    fn wait_readable_reports_pending_data() {
        let (reader, writer) = std::io::pipe().unwrap();
        let rx = ReadHalf::from_pipe(reader);
        let mut tx = WriteHalf::from_pipe(writer);

        tx.write_all(b"x").unwrap();
        let ready = rx.wait_readable(Duration::from_millis(100)).unwrap();
        assert!(ready);
    }

    #[test]
    #[cfg(unix)]
    fn wait_readable_reports_closed_peer() {
        let (reader, writer) = std::io::pipe().unwrap();
        let rx = ReadHalf::from_pipe(reader);
        drop(writer);
        // EOF counts as readable so the caller can observe the close.
        let ready = rx.wait_readable(Duration::from_millis(100)).unwrap();
        assert!(ready);
    }

    #[test]
    fn debug_names_backend() {
        let (reader, writer) = std::io::pipe().unwrap();
        let rx = ReadHalf::from_pipe(reader);
        let tx = WriteHalf::from_pipe(writer);
        assert!(format!("{rx:?}").contains("pipe"));
        assert!(format!("{tx:?}").contains("pipe"));
    }
}
