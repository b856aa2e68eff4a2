//! Transport seam: how a connection reaches its endpoint

use std::future::Future;
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};

use contracts::Endpoint;
use tokio::io::{duplex, AsyncRead, AsyncWrite, DuplexStream};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tracing::debug;

/// Opens byte streams to endpoints.
pub trait Dialer: Send + Sync {
    type Stream: AsyncRead + AsyncWrite + Send + Unpin + 'static;

    fn dial(&self, endpoint: &Endpoint) -> impl Future<Output = io::Result<Self::Stream>> + Send;
}

/// Plain TCP
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpDialer;

impl Dialer for TcpDialer {
    type Stream = TcpStream;

    async fn dial(&self, endpoint: &Endpoint) -> io::Result<TcpStream> {
        let stream = TcpStream::connect(endpoint.authority()).await?;
        stream.set_nodelay(true)?;
        debug!(endpoint = %endpoint, "TCP connected");
        Ok(stream)
    }
}

/// In-memory transport: every dial produces a `tokio::io::duplex` pair and
/// hands the server end to the receiver returned by [`DuplexDialer::new`].
#[derive(Debug)]
pub struct DuplexDialer {
    buffer: usize,
    accepted: mpsc::UnboundedSender<(Endpoint, DuplexStream)>,
    refuse: AtomicUsize,
}

impl DuplexDialer {
    pub fn new(buffer: usize) -> (Self, mpsc::UnboundedReceiver<(Endpoint, DuplexStream)>) {
        let (accepted, rx) = mpsc::unbounded_channel();
        (
            Self {
                buffer,
                accepted,
                refuse: AtomicUsize::new(0),
            },
            rx,
        )
    }

    /// Refuse the next `n` dials with `ConnectionRefused`
    pub fn refuse_next(&self, n: usize) {
        self.refuse.store(n, Ordering::SeqCst);
    }
}

impl Dialer for DuplexDialer {
    type Stream = DuplexStream;

    async fn dial(&self, endpoint: &Endpoint) -> io::Result<DuplexStream> {
        let refused = self
            .refuse
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if refused {
            return Err(io::Error::new(
                io::ErrorKind::ConnectionRefused,
                format!("{endpoint} refused"),
            ));
        }

        let (client, server) = duplex(self.buffer);
        self.accepted
            .send((endpoint.clone(), server))
            .map_err(|_| io::Error::new(io::ErrorKind::ConnectionRefused, "no listener"))?;
        Ok(client)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    #[tokio::test]
    async fn test_duplex_dialer_pairs_streams() {
        let (dialer, mut accepted) = DuplexDialer::new(64);
        let endpoint = Endpoint::new("irc.example", 6667);

        let mut client = dialer.dial(&endpoint).await.unwrap();
        let (seen, mut server) = accepted.recv().await.unwrap();
        assert_eq!(seen, endpoint);

        client.write_all(b"hi").await.unwrap();
        let mut buf = [0u8; 2];
        server.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"hi");
    }

    #[tokio::test]
    async fn test_refuse_next() {
        let (dialer, _accepted) = DuplexDialer::new(64);
        let endpoint = Endpoint::new("irc.example", 6667);
        dialer.refuse_next(1);

        let err = dialer.dial(&endpoint).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::ConnectionRefused);
        assert!(dialer.dial(&endpoint).await.is_ok());
    }

    #[tokio::test]
    async fn test_tcp_dialer() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let stream = TcpDialer
            .dial(&Endpoint::new("127.0.0.1", port))
            .await
            .unwrap();
        assert!(stream.nodelay().unwrap());
    }
}
