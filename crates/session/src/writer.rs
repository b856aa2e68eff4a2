//! Single socket writer
//!
//! Every outbound command goes through one task so that command bytes are
//! never interleaved on the wire.

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, trace};

use crate::{Command, SessionError};

/// A queued command plus the acknowledgement sent once it hit the socket
#[derive(Debug)]
pub struct Outgoing {
    command: Command,
    ack: oneshot::Sender<()>,
}

/// Cloneable front of the writer queue
#[derive(Debug, Clone)]
pub struct CommandSender {
    tx: mpsc::Sender<Outgoing>,
}

impl CommandSender {
    /// Queue a command and wait until it has been written and flushed
    pub async fn send(&self, command: Command) -> Result<(), SessionError> {
        let (ack, written) = oneshot::channel();
        self.tx
            .send(Outgoing { command, ack })
            .await
            .map_err(|_| SessionError::WriterClosed)?;
        written.await.map_err(|_| SessionError::WriterClosed)
    }
}

/// Create the writer queue
pub fn command_channel(capacity: usize) -> (CommandSender, mpsc::Receiver<Outgoing>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (CommandSender { tx }, rx)
}

/// Owner of the socket's write half
pub struct CommandWriter<W> {
    io: W,
    connection: String,
}

impl<W: AsyncWrite + Unpin> CommandWriter<W> {
    pub fn new(io: W, connection: impl Into<String>) -> Self {
        Self {
            io,
            connection: connection.into(),
        }
    }

    /// Write one command immediately (`write_all` + flush)
    pub async fn write_now(&mut self, command: &Command) -> Result<(), SessionError> {
        let bytes = command.encode();
        self.io
            .write_all(&bytes)
            .await
            .map_err(|source| self.write_error(source))?;
        self.io
            .flush()
            .await
            .map_err(|source| self.write_error(source))?;

        trace!(connection = %self.connection, verb = command.verb(), "Command written");
        Ok(())
    }

    /// Drain the queue until cancelled, then shut the write half down
    #[instrument(name = "connection_writer", skip_all, fields(connection = %self.connection))]
    pub async fn run(
        mut self,
        mut rx: mpsc::Receiver<Outgoing>,
        cancel: CancellationToken,
    ) -> Result<(), SessionError> {
        loop {
            let outgoing = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                next = rx.recv() => match next {
                    Some(outgoing) => outgoing,
                    None => break,
                },
            };

            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                written = self.write_now(&outgoing.command) => written?,
            }
            // Sender may have given up waiting
            let _ = outgoing.ack.send(());
        }

        let _ = self.io.shutdown().await;
        debug!(connection = %self.connection, "Writer stopped");
        Ok(())
    }

    fn write_error(&self, source: std::io::Error) -> SessionError {
        SessionError::Write {
            connection: self.connection.clone(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{duplex, AsyncReadExt};

    #[tokio::test]
    async fn test_write_now() {
        let (client, mut server) = duplex(1024);
        let mut writer = CommandWriter::new(client, "test");
        writer
            .write_now(&Command::Nick("justinfan0".into()))
            .await
            .unwrap();
        drop(writer);

        let mut received = String::new();
        server.read_to_string(&mut received).await.unwrap();
        assert_eq!(received, "NICK justinfan0\r\n");
    }

    #[tokio::test]
    async fn test_queued_commands_are_written_in_order() {
        let (client, mut server) = duplex(1024);
        let (sender, rx) = command_channel(4);
        let cancel = CancellationToken::new();
        let task = tokio::spawn(CommandWriter::new(client, "test").run(rx, cancel.clone()));

        sender.send(Command::Pong("a".into())).await.unwrap();
        sender.send(Command::Pong("b".into())).await.unwrap();
        cancel.cancel();
        task.await.unwrap().unwrap();

        let mut received = String::new();
        server.read_to_string(&mut received).await.unwrap();
        assert_eq!(received, "PONG a\r\nPONG b\r\n");
    }

    #[tokio::test]
    async fn test_send_after_writer_stopped() {
        let (client, _server) = duplex(64);
        let (sender, rx) = command_channel(1);
        let cancel = CancellationToken::new();
        cancel.cancel();
        CommandWriter::new(client, "test")
            .run(rx, cancel)
            .await
            .unwrap();

        assert!(matches!(
            sender.send(Command::Pong("x".into())).await,
            Err(SessionError::WriterClosed)
        ));
    }

    #[tokio::test]
    async fn test_write_error_when_peer_gone() {
        let (client, server) = duplex(64);
        drop(server);
        let mut writer = CommandWriter::new(client, "test");
        let err = writer
            .write_now(&Command::Pong("x".into()))
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::Write { .. }));
    }
}
