//! Discount orchestration.

use std::fmt;
use std::time::Duration;

use parkval_core::Config;
use parkval_protocol::{
    CodecError, DiscountRequest, DiscountResponse, SequenceAllocator, decode_response,
    encode_request, hexdump,
};
use serde::Serialize;
use tracing::{error, info, instrument, warn};

use crate::error::TransportError;
use crate::transport::TransportClient;

/// Connection settings for [`IntegrationService`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub host: String,
    pub port: u16,
    pub connect_timeout: Duration,
    pub exchange_timeout: Duration,
    pub max_response_bytes: usize,
    /// Reject requests whose fiscal signature fails the CNPJ check.
    pub validate_cnpj: bool,
}

impl ClientConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        let defaults = parkval_core::config::TerminalConfig::default();
        Self {
            host: host.into(),
            port,
            connect_timeout: defaults.connect_timeout(),
            exchange_timeout: defaults.exchange_timeout(),
            max_response_bytes: defaults.max_response_bytes,
            validate_cnpj: false,
        }
    }

    #[must_use]
    pub const fn with_timeouts(mut self, connect: Duration, exchange: Duration) -> Self {
        self.connect_timeout = connect;
        self.exchange_timeout = exchange;
        self
    }

    #[must_use]
    pub const fn with_cnpj_validation(mut self, enabled: bool) -> Self {
        self.validate_cnpj = enabled;
        self
    }
}

impl From<&Config> for ClientConfig {
    fn from(config: &Config) -> Self {
        Self {
            host: config.terminal.host.clone(),
            port: config.terminal.port,
            connect_timeout: config.terminal.connect_timeout(),
            exchange_timeout: config.terminal.exchange_timeout(),
            max_response_bytes: config.terminal.max_response_bytes,
            validate_cnpj: config.request.validate_cnpj,
        }
    }
}

/// Why a call failed before a business outcome was available.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Bad business input, caught before any I/O.
    Validation,
    /// Refused, unresolvable, or timed out while connecting.
    Connection,
    /// Timeout or broken connection during the exchange.
    Io,
    /// The response does not have the expected shape.
    ProtocolFormat,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Validation => "invalid request",
            Self::Connection => "connection failed",
            Self::Io => "communication failed",
            Self::ProtocolFormat => "protocol error",
        };
        f.write_str(text)
    }
}

/// Non-fatal anomaly noticed during an exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExchangeWarning {
    SequenceMismatch { sent: u32, echoed: u32 },
}

impl fmt::Display for ExchangeWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SequenceMismatch { sent, echoed } => {
                write!(f, "sequence mismatch: sent {sent}, terminal echoed {echoed}")
            }
        }
    }
}

/// Uniform outcome of [`IntegrationService::create_discount`].
///
/// `failure` is set when the call broke down before a status was decoded.
/// When it is `None`, `response` holds the decoded outcome and `success`
/// reflects the terminal's status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiscountResult {
    pub success: bool,
    pub message: String,
    pub sequence: u32,
    pub failure: Option<FailureKind>,
    pub response: Option<DiscountResponse>,
    pub warnings: Vec<ExchangeWarning>,
}

impl DiscountResult {
    fn completed(sequence: u32, response: DiscountResponse, warnings: Vec<ExchangeWarning>) -> Self {
        Self {
            success: response.success,
            message: response.message.clone(),
            sequence,
            failure: None,
            response: Some(response),
            warnings,
        }
    }

    fn failed(sequence: u32, failure: Failure) -> Self {
        Self {
            success: false,
            message: failure.message(),
            sequence,
            failure: Some(failure.kind),
            response: None,
            warnings: Vec::new(),
        }
    }
}

struct Failure {
    kind: FailureKind,
    detail: String,
}

impl Failure {
    fn new(kind: FailureKind, detail: &impl fmt::Display) -> Self {
        Self {
            kind,
            detail: detail.to_string(),
        }
    }

    /// Caller-facing text: the kind, then what went wrong.
    fn message(&self) -> String {
        format!("{}: {}", self.kind, self.detail)
    }

    fn codec(e: &CodecError) -> Self {
        let kind = if e.is_validation() {
            FailureKind::Validation
        } else {
            FailureKind::ProtocolFormat
        };
        Self::new(kind, e)
    }

    fn connect(e: &TransportError) -> Self {
        Self::new(FailureKind::Connection, e)
    }

    fn exchange(e: &TransportError) -> Self {
        let kind = match e {
            TransportError::InvalidLength { .. } => FailureKind::ProtocolFormat,
            _ => FailureKind::Io,
        };
        Self::new(kind, e)
    }
}

/// Sends discount requests to the terminal, one socket per call.
///
/// Safe to share between tasks: sequence allocation is atomic and every call
/// opens its own connection.
#[derive(Debug)]
pub struct IntegrationService {
    config: ClientConfig,
    sequence: SequenceAllocator,
}

impl IntegrationService {
    pub const fn new(config: ClientConfig) -> Self {
        Self {
            config,
            sequence: SequenceAllocator::new(),
        }
    }

    pub const fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub const fn sequence(&self) -> &SequenceAllocator {
        &self.sequence
    }

    /// Run one consult or validation against the terminal.
    ///
    /// Never fails: every error is folded into the returned [`DiscountResult`].
    #[instrument(skip(self, request), fields(command = %request.command, terminal = request.terminal_id))]
    pub async fn create_discount(&self, request: &DiscountRequest) -> DiscountResult {
        let seq = self.sequence.next();
        match self.exchange(request, seq).await {
            Ok((response, warnings)) => {
                info!(
                    seq,
                    status = %response.status,
                    success = response.success,
                    "Discount request completed"
                );
                DiscountResult::completed(seq, response, warnings)
            }
            Err(failure) => {
                if failure.kind == FailureKind::ProtocolFormat {
                    error!(seq, detail = %failure.detail, "Terminal protocol mismatch");
                } else {
                    warn!(seq, kind = %failure.kind, detail = %failure.detail, "Discount request failed");
                }
                DiscountResult::failed(seq, failure)
            }
        }
    }

    async fn exchange(
        &self,
        request: &DiscountRequest,
        seq: u32,
    ) -> Result<(DiscountResponse, Vec<ExchangeWarning>), Failure> {
        request.validate().map_err(|e| Failure::codec(&e))?;
        if self.config.validate_cnpj {
            request.validate_cnpj().map_err(|e| Failure::codec(&e))?;
        }
        let frame = encode_request(request, seq).map_err(|e| Failure::codec(&e))?;
        hexdump::log_frame("Request frame", &frame);

        let mut transport = TransportClient::new(self.config.max_response_bytes);
        transport
            .connect(&self.config.host, self.config.port, self.config.connect_timeout)
            .await
            .map_err(|e| Failure::connect(&e))?;
        let payload = transport
            .send_and_receive(&frame, self.config.exchange_timeout)
            .await
            .map_err(|e| Failure::exchange(&e))?;
        hexdump::log_frame("Response payload", &payload);

        let decoded = decode_response(&payload).map_err(|e| Failure::codec(&e))?;

        let mut warnings = Vec::new();
        if decoded.seq_no != seq {
            warn!(
                sent = seq,
                echoed = decoded.seq_no,
                "Response sequence number does not match the request"
            );
            warnings.push(ExchangeWarning::SequenceMismatch {
                sent: seq,
                echoed: decoded.seq_no,
            });
        }

        Ok((DiscountResponse::from_frame(&decoded), warnings))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::error::Stage;
    use parkval_protocol::Command;

    fn request() -> DiscountRequest {
        DiscountRequest::new(Command::Validation, 303, "9220428135318", 1269, "04558054000173")
    }

    #[test]
    fn client_config_from_core_config() {
        let mut config = Config::default();
        config.terminal.host = "terminal.local".into();
        config.terminal.port = 4000;
        config.request.validate_cnpj = true;

        let client = ClientConfig::from(&config);
        assert_eq!(client.host, "terminal.local");
        assert_eq!(client.port, 4000);
        assert_eq!(client.connect_timeout, Duration::from_secs(3));
        assert_eq!(client.exchange_timeout, Duration::from_secs(10));
        assert!(client.validate_cnpj);
    }

    #[tokio::test]
    async fn validation_failure_never_touches_the_network() {
        // Port 9 on an unroutable address: reaching the network would time out.
        let config = ClientConfig::new("203.0.113.1", 9)
            .with_timeouts(Duration::from_secs(30), Duration::from_secs(30));
        let service = IntegrationService::new(config);

        let mut bad = request();
        bad.card_id = String::new();
        let result = service.create_discount(&bad).await;

        assert!(!result.success);
        assert_eq!(result.failure, Some(FailureKind::Validation));
        assert!(result.message.contains("card id"), "{}", result.message);
        assert!(result.response.is_none());
    }

    #[tokio::test]
    async fn cnpj_check_is_opt_in() {
        let config = ClientConfig::new("127.0.0.1", 9).with_cnpj_validation(true);
        let service = IntegrationService::new(config);
        let result = service.create_discount(&request()).await;
        assert_eq!(result.failure, Some(FailureKind::Validation));
        assert!(result.message.contains("CNPJ"), "{}", result.message);
    }

    #[test]
    fn failure_mapping() {
        let refused = TransportError::ConnectionRefused {
            addr: "127.0.0.1:9".parse().unwrap(),
        };
        assert_eq!(Failure::connect(&refused).kind, FailureKind::Connection);

        let stalled = TransportError::Timeout {
            stage: Stage::Connect,
            timeout: Duration::from_secs(3),
        };
        let failure = Failure::connect(&stalled);
        assert_eq!(failure.kind, FailureKind::Connection);
        assert_eq!(failure.detail, "connect timed out after 3000ms");
        assert_eq!(failure.message(), "connection failed: connect timed out after 3000ms");

        let truncated = TransportError::TruncatedResponse {
            expected: 611,
            received: 3,
        };
        assert_eq!(Failure::exchange(&truncated).kind, FailureKind::Io);

        let bad_len = TransportError::InvalidLength {
            declared: 0,
            max: 10,
        };
        assert_eq!(Failure::exchange(&bad_len).kind, FailureKind::ProtocolFormat);

        let short = CodecError::ResponseSize {
            actual: 600,
            expected: 611,
        };
        let failure = Failure::codec(&short);
        assert_eq!(failure.kind, FailureKind::ProtocolFormat);
        assert_eq!(failure.detail, "response payload is 600 bytes, expected 611");
        assert_eq!(failure.message(), "protocol error: response payload is 600 bytes, expected 611");
    }

    #[test]
    fn result_serializes_flat() {
        let result = DiscountResult::failed(
            4,
            Failure::new(FailureKind::Io, &"exchange timed out after 10ms"),
        );
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["sequence"], 4);
        assert_eq!(json["failure"], "io");
        assert_eq!(json["message"], "communication failed: exchange timed out after 10ms");
    }
}
