//! Transport error types.

use std::fmt;
use std::net::SocketAddr;
use std::time::Duration;

use crate::transport::TransportState;

/// Which part of the exchange a timeout interrupted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// DNS resolution plus TCP connect.
    Connect,
    /// Writing the request and reading the whole response.
    Exchange,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connect => f.write_str("connect"),
            Self::Exchange => f.write_str("exchange"),
        }
    }
}

/// Errors raised by [`TransportClient`](crate::TransportClient).
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("could not resolve {host}: {reason}")]
    DnsResolutionFailed { host: String, reason: String },

    #[error("connection refused by {addr}")]
    ConnectionRefused { addr: SocketAddr },

    #[error("{stage} timed out after {}ms", timeout.as_millis())]
    Timeout { stage: Stage, timeout: Duration },

    /// The response length prefix is zero or above the sanity ceiling.
    #[error("response length prefix {declared} outside 1..={max}")]
    InvalidLength { declared: usize, max: usize },

    /// The peer closed the connection before the declared length arrived.
    #[error("connection closed after {received} of {expected} bytes")]
    TruncatedResponse { expected: usize, received: usize },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("cannot {action} while {state}")]
    InvalidState {
        action: &'static str,
        state: TransportState,
    },
}
