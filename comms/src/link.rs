//! The per-round peer link of a ring edge.
//!
//! Each node owns exactly one outbound edge (client role, toward its
//! successor) and one inbound edge (server role, for its predecessor). Nodes
//! start in an unsynchronized order, so the outbound side masks the
//! not-yet-listening race with bounded connect retries, and the inbound side
//! bounds its accept wait so a predecessor that already finished its rounds
//! cannot block the loop forever.

use std::{io, net::SocketAddr, num::NonZeroUsize, time::Duration};

use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{TcpListener, TcpStream},
    time::{sleep, timeout},
};

use crate::{GradientCodec, error::CommsErr};

/// Bounds for one round's outbound delivery attempt.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct RetryPolicy {
    pub max_attempts: NonZeroUsize,
    pub retry_delay: Duration,
    pub connect_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: NonZeroUsize::new(50).unwrap(),
            retry_delay: Duration::from_millis(200),
            connect_timeout: Duration::from_secs(2),
        }
    }
}

/// Bounds for one round's inbound receive.
///
/// `accept_timeout` limits the wait for a connection; `read_timeout` limits
/// the read once a peer has connected, so an unclosed connection cannot stall
/// the round.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct RecvWindow {
    pub accept_timeout: Duration,
    pub read_timeout: Duration,
}

impl Default for RecvWindow {
    fn default() -> Self {
        Self {
            accept_timeout: Duration::from_secs(10),
            read_timeout: Duration::from_secs(10),
        }
    }
}

/// Creates both halves of a node's ring edge.
///
/// # Arguments
/// * `listen` - The address this node accepts its predecessor on.
/// * `successor` - The address of the ring successor.
/// * `retry` - Outbound retry bounds.
/// * `window` - Inbound receive bounds.
///
/// # Returns
/// The edge in the form of a ring receiver and sender.
pub fn edge(
    listen: SocketAddr,
    successor: SocketAddr,
    retry: RetryPolicy,
    window: RecvWindow,
) -> (RingReceiver, RingSender) {
    (
        RingReceiver::new(listen, window),
        RingSender::new(successor, retry),
    )
}

/// The outbound half of a ring edge.
pub struct RingSender {
    target: SocketAddr,
    policy: RetryPolicy,
    codec: GradientCodec,
    buf: Vec<u8>,
}

impl RingSender {
    /// Creates a sender toward `target` with the given retry bounds.
    pub fn new(target: SocketAddr, policy: RetryPolicy) -> Self {
        Self {
            target,
            policy,
            codec: GradientCodec::new(),
            buf: Vec::new(),
        }
    }

    /// Replaces the wire codec.
    pub fn with_codec(mut self, codec: GradientCodec) -> Self {
        self.codec = codec;
        self
    }

    /// Best-effort delivery of one gradient to the successor.
    ///
    /// Encodes the vector, then repeatedly connects and writes the full
    /// payload, closing the stream afterwards (EOF is the message frame).
    /// Connection refusal, reset, and connect timeout wait `retry_delay` and
    /// retry, up to `max_attempts`. This call is fire-and-forget: success
    /// means the payload was written, not that the peer consumed it, and
    /// exhaustion is a degraded outcome rather than a protocol failure.
    ///
    /// # Arguments
    /// * `gradient` - The vector to deliver this round.
    ///
    /// # Returns
    /// `Ok(())` after the first successful full write, `Exhausted` when the
    /// retry budget ran out, or the underlying error for non-retryable I/O
    /// failures.
    pub async fn send(&mut self, gradient: &[f32]) -> Result<(), CommsErr> {
        self.buf.clear();
        self.codec.encode(gradient, &mut self.buf);

        let max_attempts = self.policy.max_attempts.get();
        for attempt in 1..=max_attempts {
            match timeout(self.policy.connect_timeout, TcpStream::connect(self.target)).await {
                Ok(Ok(mut stream)) => {
                    stream.write_all(&self.buf).await?;
                    stream.shutdown().await?;
                    return Ok(());
                }
                // The peer has not bound its listen port yet, or tore the
                // socket down between rounds.
                Ok(Err(e)) if is_retryable(e.kind()) => {}
                Ok(Err(e)) => return Err(CommsErr::Io(e)),
                // Connect attempt itself timed out.
                Err(_) => {}
            }

            if attempt < max_attempts {
                sleep(self.policy.retry_delay).await;
            }
        }

        Err(CommsErr::Exhausted {
            attempts: max_attempts,
        })
    }
}

fn is_retryable(kind: io::ErrorKind) -> bool {
    matches!(
        kind,
        io::ErrorKind::ConnectionRefused
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::TimedOut
    )
}

/// The inbound half of a ring edge.
pub struct RingReceiver {
    listen: SocketAddr,
    window: RecvWindow,
    codec: GradientCodec,
    buf: Vec<u8>,
}

impl RingReceiver {
    /// Creates a receiver listening on `listen` with the given bounds.
    pub fn new(listen: SocketAddr, window: RecvWindow) -> Self {
        Self {
            listen,
            window,
            codec: GradientCodec::new(),
            buf: Vec::new(),
        }
    }

    /// Replaces the wire codec.
    pub fn with_codec(mut self, codec: GradientCodec) -> Self {
        self.codec = codec;
        self
    }

    /// Receives at most one gradient from the predecessor.
    ///
    /// Binds the listen address fresh (tokio enables address reuse on bind,
    /// so a fast node restart does not fail with address-in-use), accepts at
    /// most one connection within `accept_timeout`, reads until the peer
    /// closes, and decodes. The listener lives entirely within this call.
    ///
    /// # Returns
    /// `Ok(Some(vector))` on a decoded payload, `Ok(None)` when no peer
    /// connected before the accept deadline (the designed outcome for a
    /// predecessor that has finished all its rounds), or an error for an
    /// empty/malformed/stalled inbound stream.
    pub async fn recv(&mut self) -> Result<Option<Vec<f32>>, CommsErr> {
        let listener = TcpListener::bind(self.listen).await?;

        let (mut stream, _peer) = match timeout(self.window.accept_timeout, listener.accept()).await
        {
            Ok(conn) => conn?,
            Err(_) => return Ok(None),
        };

        // At most one inbound connection per round.
        drop(listener);

        self.buf.clear();
        match timeout(self.window.read_timeout, stream.read_to_end(&mut self.buf)).await {
            Ok(read) => {
                read?;
                self.codec.decode(&self.buf).map(Some)
            }
            Err(_) => Err(CommsErr::Stalled {
                buffered: self.buf.len(),
            }),
        }
    }
}
