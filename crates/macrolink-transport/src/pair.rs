use std::process::{Child, Command, Stdio};

use tracing::{debug, info};

use crate::error::{Result, TransportError};
use crate::stream::{ReadHalf, WriteHalf};

/// A connected channel pair: one incoming and one outgoing byte stream.
///
/// The two halves are independent one-directional streams. How the peers are
/// actually connected (anonymous pipes, stdio inherited from the peer, a
/// spawned child's stdio) is decided by the constructor used.
#[derive(Debug)]
pub struct ChannelPair {
    rx: ReadHalf,
    tx: WriteHalf,
}

impl ChannelPair {
    /// Assemble a pair from raw halves.
    pub fn from_halves(rx: ReadHalf, tx: WriteHalf) -> Self {
        Self { rx, tx }
    }

    /// Channel pair over this process's own stdin/stdout.
    ///
    /// Used when the peer spawned us and owns the other ends. Anything else
    /// written to stdout will corrupt the protocol, so callers should route
    /// their own output to stderr.
    pub fn stdio() -> Self {
        Self {
            rx: ReadHalf::from_stdin(std::io::stdin()),
            tx: WriteHalf::from_stdout(std::io::stdout()),
        }
    }

    /// Two crossed in-process channel pairs connected by anonymous pipes.
    ///
    /// Everything written to the first pair is read by the second and vice
    /// versa. This is the backbone of same-process duplex tests, with each
    /// side driven from its own thread.
    pub fn in_process() -> Result<(ChannelPair, ChannelPair)> {
        let (a_rx, b_tx) = std::io::pipe()?;
        let (b_rx, a_tx) = std::io::pipe()?;
        debug!("created in-process channel pair");
        Ok((
            ChannelPair {
                rx: ReadHalf::from_pipe(a_rx),
                tx: WriteHalf::from_pipe(a_tx),
            },
            ChannelPair {
                rx: ReadHalf::from_pipe(b_rx),
                tx: WriteHalf::from_pipe(b_tx),
            },
        ))
    }

    /// Spawn a child process and connect to its stdin/stdout.
    ///
    /// The child's stderr is inherited so its diagnostics remain visible.
    /// Returns the channel pair plus a handle that owns the child process.
    pub fn spawn(mut command: Command) -> Result<(ChannelPair, EngineChild)> {
        let program = command.get_program().to_string_lossy().into_owned();
        command.stdin(Stdio::piped()).stdout(Stdio::piped());

        let mut child = command.spawn().map_err(|source| TransportError::Spawn {
            command: program.clone(),
            source,
        })?;

        let stdin = child
            .stdin
            .take()
            .ok_or(TransportError::MissingChildHandle("stdin"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or(TransportError::MissingChildHandle("stdout"))?;

        info!(command = %program, pid = child.id(), "spawned engine child");

        Ok((
            ChannelPair {
                rx: ReadHalf::from_child_stdout(stdout),
                tx: WriteHalf::from_child_stdin(stdin),
            },
            EngineChild { child: Some(child) },
        ))
    }

    /// Borrow the receiving half.
    pub fn reader(&mut self) -> &mut ReadHalf {
        &mut self.rx
    }

    /// Borrow the sending half.
    pub fn writer(&mut self) -> &mut WriteHalf {
        &mut self.tx
    }

    /// Split the pair into its halves.
    pub fn into_halves(self) -> (ReadHalf, WriteHalf) {
        (self.rx, self.tx)
    }
}

/// Owns a spawned engine child process for the lifetime of a session.
///
/// Dropping the handle kills the child if it is still running; a clean
/// shutdown should call [`EngineChild::wait`] after closing the channels.
#[derive(Debug)]
pub struct EngineChild {
    child: Option<Child>,
}

impl EngineChild {
    /// The child's OS process id, if it has not been reaped yet.
    pub fn id(&self) -> Option<u32> {
        self.child.as_ref().map(Child::id)
    }

    /// Wait for the child to exit and return its status.
    pub fn wait(&mut self) -> Result<std::process::ExitStatus> {
        match self.child.take() {
            Some(mut child) => Ok(child.wait()?),
            None => Err(TransportError::Closed),
        }
    }

    /// Kill the child without waiting for a clean exit.
    pub fn kill(&mut self) -> Result<()> {
        if let Some(mut child) = self.child.take() {
            child.kill()?;
            child.wait()?;
        }
        Ok(())
    }
}

impl Drop for EngineChild {
    fn drop(&mut self) {
        if let Some(mut child) = self.child.take() {
            debug!(pid = child.id(), "killing unreaped engine child");
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::{Read, Write};
    use std::thread;

    use super::*;

    #[test]
    fn in_process_pairs_are_crossed() {
        let (mut left, mut right) = ChannelPair::in_process().unwrap();

        let handle = thread::spawn(move || {
            let mut buf = [0u8; 4];
            right.reader().read_exact(&mut buf).unwrap();
            assert_eq!(&buf, b"ping");
            right.writer().write_all(b"pong").unwrap();
            right.writer().flush().unwrap();
        });

        left.writer().write_all(b"ping").unwrap();
        left.writer().flush().unwrap();

        let mut buf = [0u8; 4];
        left.reader().read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"pong");

        handle.join().unwrap();
    }

    #[test]
    #[cfg(unix)]
    fn spawn_connects_to_child_stdio() {
        let (mut pair, mut child) = ChannelPair::spawn(Command::new("cat")).unwrap();

        pair.writer().write_all(b"echoed\n").unwrap();
        pair.writer().flush().unwrap();

        let mut buf = [0u8; 7];
        pair.reader().read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"echoed\n");

        // Closing our write end lets cat exit cleanly.
        drop(pair);
        let status = child.wait().unwrap();
        assert!(status.success());
    }

    #[test]
    fn spawn_failure_names_command() {
        let err = ChannelPair::spawn(Command::new("definitely-not-a-real-binary-xyzzy"))
            .err()
            .expect("spawn of missing binary should fail");
        assert!(matches!(err, TransportError::Spawn { .. }));
        assert!(err.to_string().contains("definitely-not-a-real-binary"));
    }

    #[test]
    #[cfg(unix)]
    fn kill_reaps_child() {
        let (_pair, mut child) = ChannelPair::spawn(Command::new("cat")).unwrap();
        assert!(child.id().is_some());
        child.kill().unwrap();
        assert!(child.id().is_none());
    }
}
