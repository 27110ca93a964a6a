//! One-shot framed TCP transport.
//!
//! A [`TransportClient`] walks
//! `Idle -> Connecting -> Connected -> Sending -> AwaitingResponse -> Closed`
//! exactly once. Any failure after `Idle` lands in `Error`. The socket is
//! released when the exchange ends, whatever the outcome.

use std::fmt;
use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;

use parkval_protocol::LENGTH_PREFIX_SIZE;
use parkval_protocol::response::RESPONSE_PAYLOAD_SIZE;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpStream, lookup_host};
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::error::{Stage, TransportError};

/// Transport lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportState {
    Idle,
    Connecting,
    Connected,
    Sending,
    AwaitingResponse,
    Closed,
    Error,
}

impl fmt::Display for TransportState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Sending => "sending",
            Self::AwaitingResponse => "awaiting response",
            Self::Closed => "closed",
            Self::Error => "error",
        };
        f.write_str(name)
    }
}

/// Socket owner for a single request/response pair.
#[derive(Debug)]
pub struct TransportClient {
    state: TransportState,
    stream: Option<TcpStream>,
    max_response_bytes: usize,
}

impl TransportClient {
    /// `max_response_bytes` caps the response length prefix accepted.
    pub const fn new(max_response_bytes: usize) -> Self {
        Self {
            state: TransportState::Idle,
            stream: None,
            max_response_bytes,
        }
    }

    pub const fn state(&self) -> TransportState {
        self.state
    }

    /// Resolve `host` and open a fresh connection, bounded by `connect_timeout`.
    pub async fn connect(
        &mut self,
        host: &str,
        port: u16,
        connect_timeout: Duration,
    ) -> Result<(), TransportError> {
        self.connect_with(open(host, port), connect_timeout).await
    }

    /// Drive `opening` to a connected stream within `connect_timeout`.
    async fn connect_with<F>(
        &mut self,
        opening: F,
        connect_timeout: Duration,
    ) -> Result<(), TransportError>
    where
        F: Future<Output = Result<TcpStream, TransportError>>,
    {
        if self.state != TransportState::Idle {
            return Err(TransportError::InvalidState {
                action: "connect",
                state: self.state,
            });
        }
        self.state = TransportState::Connecting;

        let outcome = timeout(connect_timeout, opening)
            .await
            .unwrap_or(Err(TransportError::Timeout {
                stage: Stage::Connect,
                timeout: connect_timeout,
            }));

        match outcome {
            Ok(stream) => {
                self.stream = Some(stream);
                self.state = TransportState::Connected;
                Ok(())
            }
            Err(e) => {
                self.state = TransportState::Error;
                Err(e)
            }
        }
    }

    /// Write `frame`, then read one length-prefixed response and return its
    /// payload (without the prefix). The whole cycle is bounded by
    /// `io_timeout`. The socket is closed before this returns.
    pub async fn send_and_receive(
        &mut self,
        frame: &[u8],
        io_timeout: Duration,
    ) -> Result<Vec<u8>, TransportError> {
        let Some(mut stream) = self.stream.take() else {
            return Err(TransportError::InvalidState {
                action: "send",
                state: self.state,
            });
        };

        let outcome = timeout(io_timeout, self.exchange(&mut stream, frame))
            .await
            .unwrap_or(Err(TransportError::Timeout {
                stage: Stage::Exchange,
                timeout: io_timeout,
            }));
        drop(stream);

        self.state = if outcome.is_ok() {
            TransportState::Closed
        } else {
            TransportState::Error
        };
        outcome
    }

    async fn exchange(
        &mut self,
        stream: &mut TcpStream,
        frame: &[u8],
    ) -> Result<Vec<u8>, TransportError> {
        self.state = TransportState::Sending;
        stream.write_all(frame).await?;
        stream.flush().await?;
        debug!(bytes = frame.len(), "Request sent");

        self.state = TransportState::AwaitingResponse;
        let mut prefix = [0u8; LENGTH_PREFIX_SIZE];
        read_full(stream, &mut prefix).await?;
        let declared = usize::from(u16::from_le_bytes(prefix));

        if declared == 0 || declared > self.max_response_bytes {
            return Err(TransportError::InvalidLength {
                declared,
                max: self.max_response_bytes,
            });
        }
        if declared != RESPONSE_PAYLOAD_SIZE {
            warn!(
                declared,
                expected = RESPONSE_PAYLOAD_SIZE,
                "Response length prefix differs from the protocol size"
            );
        }

        let mut payload = vec![0u8; declared];
        read_full(stream, &mut payload).await?;
        debug!(bytes = declared, "Response received");
        Ok(payload)
    }
}

async fn open(host: &str, port: u16) -> Result<TcpStream, TransportError> {
    let addrs: Vec<SocketAddr> = lookup_host((host, port))
        .await
        .map_err(|e| TransportError::DnsResolutionFailed {
            host: host.to_string(),
            reason: e.to_string(),
        })?
        .collect();

    let mut last_error = TransportError::DnsResolutionFailed {
        host: host.to_string(),
        reason: "no addresses found".to_string(),
    };
    for addr in addrs {
        match TcpStream::connect(addr).await {
            Ok(stream) => {
                debug!(%addr, "Connected to terminal");
                return Ok(stream);
            }
            Err(e) if e.kind() == std::io::ErrorKind::ConnectionRefused => {
                last_error = TransportError::ConnectionRefused { addr };
            }
            Err(e) => last_error = TransportError::Io(e),
        }
    }
    Err(last_error)
}

/// Fill `buf` with repeated reads; an early EOF is a truncated response.
async fn read_full(stream: &mut TcpStream, buf: &mut [u8]) -> Result<(), TransportError> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = stream.read(&mut buf[filled..]).await?;
        if n == 0 {
            return Err(TransportError::TruncatedResponse {
                expected: buf.len(),
                received: filled,
            });
        }
        filled += n;
    }
    Ok(())
}
