//! # parkval-mock
//!
//! A scriptable stand-in for the terminal server. It accepts connections,
//! reads one framed request per connection, records it, and answers with a
//! response built from the next queued [`MockReply`] (or the default reply
//! once the queue is empty).
//!
//! Replies can misbehave on purpose: echo a different sequence number, declare
//! a wrong length, cut the frame short, or never answer at all.

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use parkval_protocol::request::{DecodedRequest, decode_request};
use parkval_protocol::response::RESPONSE_PAYLOAD_SIZE;
use parkval_protocol::{CodecError, LENGTH_PREFIX_SIZE, ResponseFrame, VehicleType};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream, ToSocketAddrs};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Response-type flag the terminal sets on top of the command tag.
const RESPONSE_TYPE_FLAG: u32 = 0x0001_0000;

#[derive(Debug, thiserror::Error)]
pub enum MockError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("bad request frame: {0}")]
    Codec(#[from] CodecError),
}

/// How the mock answers one request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MockReply {
    pub status: u32,
    pub printer_line: String,
    pub operator_text: String,
    pub customer_text: String,
    pub entry_timestamp: Option<u32>,
    pub vehicle_type: Option<VehicleType>,
    /// Sequence number to echo instead of the request's.
    pub seq_override: Option<u32>,
    /// Length prefix to declare instead of the real payload size.
    pub declared_len: Option<u16>,
    /// Send only this many bytes of the frame, then close.
    pub truncate_to: Option<usize>,
    /// Read the request and never answer.
    pub silent: bool,
}

impl MockReply {
    /// Reply with status `code` and no text.
    pub fn status(code: u32) -> Self {
        Self {
            status: code,
            ..Self::default()
        }
    }

    /// A reply that reads the request and never answers.
    pub fn silent() -> Self {
        Self {
            silent: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn printer_line(mut self, text: impl Into<String>) -> Self {
        self.printer_line = text.into();
        self
    }

    #[must_use]
    pub fn operator_text(mut self, text: impl Into<String>) -> Self {
        self.operator_text = text.into();
        self
    }

    #[must_use]
    pub fn customer_text(mut self, text: impl Into<String>) -> Self {
        self.customer_text = text.into();
        self
    }

    #[must_use]
    pub const fn entry(mut self, timestamp: u32, vehicle: Option<VehicleType>) -> Self {
        self.entry_timestamp = Some(timestamp);
        self.vehicle_type = vehicle;
        self
    }

    #[must_use]
    pub const fn echo_seq(mut self, seq_no: u32) -> Self {
        self.seq_override = Some(seq_no);
        self
    }

    #[must_use]
    pub const fn declare_len(mut self, len: u16) -> Self {
        self.declared_len = Some(len);
        self
    }

    #[must_use]
    pub const fn truncate_to(mut self, bytes: usize) -> Self {
        self.truncate_to = Some(bytes);
        self
    }

    /// Build the response frame for `request`.
    pub fn frame_for(&self, request: &DecodedRequest) -> ResponseFrame {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| u32::try_from(d.as_secs()).unwrap_or(u32::MAX));
        ResponseFrame {
            response_type: RESPONSE_TYPE_FLAG | request.request.command.tag(),
            signature: request.request.fiscal_signature.clone(),
            company_sign: request.request.company_sign,
            timestamp,
            seq_no: self.seq_override.unwrap_or(request.correlation_seq_no),
            terminal_id: request.request.terminal_id,
            card_id: request.request.card_id.clone(),
            status_code: self.status,
            operator_text: self.operator_text.clone(),
            customer_text: self.customer_text.clone(),
            printer_line: self.printer_line.clone(),
            entry_timestamp: self.entry_timestamp,
            vehicle_type: self.vehicle_type,
        }
    }

    /// Bytes to put on the wire for `request`, after any length or
    /// truncation tampering.
    pub fn render(&self, request: &DecodedRequest) -> Result<Vec<u8>, MockError> {
        let frame = self.frame_for(request);
        #[allow(clippy::cast_possible_truncation)]
        let declared = self
            .declared_len
            .unwrap_or(RESPONSE_PAYLOAD_SIZE as u16);
        let mut bytes = frame.encode_frame_with_len(declared)?;
        if let Some(limit) = self.truncate_to {
            bytes.truncate(limit);
        }
        Ok(bytes)
    }
}

#[derive(Debug, Default)]
struct Shared {
    script: Mutex<VecDeque<MockReply>>,
    default_reply: Mutex<MockReply>,
    received: Mutex<Vec<DecodedRequest>>,
}

impl Shared {
    async fn next_reply(&self) -> MockReply {
        let scripted = self.script.lock().await.pop_front();
        match scripted {
            Some(reply) => reply,
            None => self.default_reply.lock().await.clone(),
        }
    }
}

/// Mock terminal bound to a listening socket.
#[derive(Debug)]
pub struct MockTerminal {
    listener: TcpListener,
    shared: Arc<Shared>,
}

impl MockTerminal {
    pub async fn bind(addr: impl ToSocketAddrs) -> Result<Self, MockError> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self {
            listener,
            shared: Arc::default(),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, MockError> {
        Ok(self.listener.local_addr()?)
    }

    /// Reply used once the script is exhausted.
    pub async fn set_default_reply(&self, reply: MockReply) {
        *self.shared.default_reply.lock().await = reply;
    }

    /// Queue a reply for the next unanswered request.
    pub async fn push_reply(&self, reply: MockReply) {
        self.shared.script.lock().await.push_back(reply);
    }

    /// Serve in a background task until the handle is dropped.
    pub fn spawn(self) -> Result<MockHandle, MockError> {
        let addr = self.local_addr()?;
        let shared = Arc::clone(&self.shared);
        let task = tokio::spawn(async move {
            if let Err(e) = self.serve().await {
                warn!(error = %e, "Mock terminal stopped");
            }
        });
        Ok(MockHandle { addr, shared, task })
    }

    /// Accept connections forever, one task per connection.
    pub async fn serve(self) -> Result<(), MockError> {
        info!(addr = %self.local_addr()?, "Mock terminal listening");
        loop {
            let (stream, peer) = self.listener.accept().await?;
            debug!(%peer, "Connection accepted");
            let shared = Arc::clone(&self.shared);
            tokio::spawn(async move {
                if let Err(e) = handle_connection(stream, &shared).await {
                    warn!(%peer, error = %e, "Connection failed");
                }
            });
        }
    }
}

/// Control handle for a spawned [`MockTerminal`]. Dropping it stops the server.
#[derive(Debug)]
pub struct MockHandle {
    addr: SocketAddr,
    shared: Arc<Shared>,
    task: JoinHandle<()>,
}

impl MockHandle {
    pub const fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub const fn port(&self) -> u16 {
        self.addr.port()
    }

    pub async fn push_reply(&self, reply: MockReply) {
        self.shared.script.lock().await.push_back(reply);
    }

    /// Every request received so far, in arrival order.
    pub async fn requests(&self) -> Vec<DecodedRequest> {
        self.shared.received.lock().await.clone()
    }
}

impl Drop for MockHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn handle_connection(mut stream: TcpStream, shared: &Shared) -> Result<(), MockError> {
    let mut frame = vec![0u8; LENGTH_PREFIX_SIZE];
    stream.read_exact(&mut frame).await?;
    let declared = usize::from(u16::from_le_bytes([frame[0], frame[1]]));
    frame.resize(LENGTH_PREFIX_SIZE + declared, 0);
    stream.read_exact(&mut frame[LENGTH_PREFIX_SIZE..]).await?;

    let request = decode_request(&frame)?;
    info!(
        seq = request.correlation_seq_no,
        command = %request.request.command,
        card = %request.request.card_id,
        value = request.request.purchase_value,
        "Request received"
    );
    shared.received.lock().await.push(request.clone());

    let reply = shared.next_reply().await;
    if reply.silent {
        debug!("Holding connection without answering");
        let mut sink = [0u8; 64];
        while stream.read(&mut sink).await? > 0 {}
        return Ok(());
    }

    let bytes = reply.render(&request)?;
    stream.write_all(&bytes).await?;
    stream.shutdown().await?;
    info!(status = reply.status, bytes = bytes.len(), "Response sent");
    Ok(())
}
