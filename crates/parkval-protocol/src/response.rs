//! Discount response decoding.
//!
//! The payload (everything after the `u16` length prefix) is exactly
//! [`RESPONSE_PAYLOAD_SIZE`] bytes:
//!
//! ```text
//! offset size field
//! ------ ---- --------------------------------------------
//!  header
//!      0    2 filler (ignored)
//!      2    4 response type
//!      6   15 signature
//!     21   16 company sign
//!     37    4 response timestamp
//!     41    4 echoed sequence number
//!  data
//!     45    4 terminal id
//!     49   64 card id
//!    113    4 status code
//!    117  128 operator display text
//!    245  128 customer display text
//!    373  128 printer line text
//!    501    4 entry timestamp (0 = absent)
//!    505    2 vehicle type (1 = Moto, 2 = Carro)
//!    507    2 reserved
//!    509    4 reserved
//!    513   98 reserved tail, up to the declared 611 bytes
//! ```

use std::fmt;

use chrono::DateTime;
use serde::Serialize;

use crate::error::{CodecError, Result};
use crate::field::FieldReader;
use crate::status::{self, ResponseStatus};
use crate::{CARD_ID_WIDTH, COMPANY_SIGN_WIDTH, HEADER_SIZE, SIGNATURE_WIDTH};

/// Fixed width of the three display text fields.
pub const DISPLAY_TEXT_WIDTH: usize = 128;

/// Bytes covered by named response fields.
pub const RESPONSE_FIELDS_SIZE: usize = HEADER_SIZE + 4 + CARD_ID_WIDTH + 4 + 3 * DISPLAY_TEXT_WIDTH + 4 + 2 + 2 + 4;

/// Expected response payload size (the value of the length prefix).
pub const RESPONSE_PAYLOAD_SIZE: usize = 611;

/// Reserved bytes after the last named field.
pub const RESPONSE_TRAILER_SIZE: usize = RESPONSE_PAYLOAD_SIZE - RESPONSE_FIELDS_SIZE;

/// Vehicle recorded at the parking entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum VehicleType {
    Moto,
    Carro,
}

impl VehicleType {
    /// Map the wire code; anything other than 1 or 2 means "not informed".
    pub const fn from_code(code: u16) -> Option<Self> {
        match code {
            1 => Some(Self::Moto),
            2 => Some(Self::Carro),
            _ => None,
        }
    }

    pub const fn code(self) -> u16 {
        match self {
            Self::Moto => 1,
            Self::Carro => 2,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Moto => "Moto",
            Self::Carro => "Carro",
        }
    }
}

impl fmt::Display for VehicleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Response payload decoded into typed fields, sentinels already mapped to
/// `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseFrame {
    pub response_type: u32,
    pub signature: String,
    pub company_sign: [u8; COMPANY_SIGN_WIDTH],
    pub timestamp: u32,
    /// Sequence number echoed from the request.
    pub seq_no: u32,
    pub terminal_id: u32,
    pub card_id: String,
    pub status_code: u32,
    pub operator_text: String,
    pub customer_text: String,
    pub printer_line: String,
    pub entry_timestamp: Option<u32>,
    pub vehicle_type: Option<VehicleType>,
}

/// Decode a response payload (without its length prefix).
///
/// The payload must be exactly [`RESPONSE_PAYLOAD_SIZE`] bytes; any other
/// size is a hard failure.
pub fn decode_response(payload: &[u8]) -> Result<ResponseFrame> {
    if payload.len() != RESPONSE_PAYLOAD_SIZE {
        return Err(CodecError::ResponseSize {
            actual: payload.len(),
            expected: RESPONSE_PAYLOAD_SIZE,
        });
    }

    let mut r = FieldReader::new(payload);
    let _filler = r.u16()?;
    let response_type = r.u32()?;
    let signature = r.text(SIGNATURE_WIDTH)?;
    let company_sign = r.array::<COMPANY_SIGN_WIDTH>()?;
    let timestamp = r.u32()?;
    let seq_no = r.u32()?;

    let terminal_id = r.u32()?;
    let card_id = r.text(CARD_ID_WIDTH)?;
    let status_code = r.u32()?;
    let operator_text = r.text(DISPLAY_TEXT_WIDTH)?;
    let customer_text = r.text(DISPLAY_TEXT_WIDTH)?;
    let printer_line = r.text(DISPLAY_TEXT_WIDTH)?;
    let entry_timestamp = r.u32()?;
    let vehicle_code = r.u16()?;
    let _reserved_0 = r.u16()?;
    let _reserved_1 = r.u32()?;
    let _trailer = r.bytes(RESPONSE_TRAILER_SIZE)?;

    if r.remaining() != 0 {
        return Err(CodecError::Malformed(format!(
            "{} unread bytes after response fields",
            r.remaining()
        )));
    }

    Ok(ResponseFrame {
        response_type,
        signature,
        company_sign,
        timestamp,
        seq_no,
        terminal_id,
        card_id,
        status_code,
        operator_text,
        customer_text,
        printer_line,
        entry_timestamp: (entry_timestamp != 0).then_some(entry_timestamp),
        vehicle_type: VehicleType::from_code(vehicle_code),
    })
}

/// Business result of one exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiscountResponse {
    /// Raw status code from the wire.
    pub status_code: u32,
    pub status: ResponseStatus,
    pub success: bool,
    /// Printer-line text when present, else the status table default.
    pub message: String,
    pub entry_timestamp: Option<u32>,
    pub vehicle_type: Option<VehicleType>,
}

impl DiscountResponse {
    /// Interpret a decoded frame through the status table.
    pub fn from_frame(frame: &ResponseFrame) -> Self {
        let outcome = status::interpret(frame.status_code, &frame.printer_line);
        let message = if frame.printer_line.is_empty() {
            outcome.message
        } else {
            frame.printer_line.clone()
        };
        Self {
            status_code: frame.status_code,
            status: outcome.status,
            success: outcome.success,
            message,
            entry_timestamp: frame.entry_timestamp,
            vehicle_type: frame.vehicle_type,
        }
    }

    /// Entry time and vehicle, formatted for display.
    pub fn details(&self) -> String {
        let entry = self.entry_timestamp.map_or_else(
            || "not informed".to_string(),
            |ts| {
                DateTime::from_timestamp(i64::from(ts), 0).map_or_else(
                    || format!("invalid timestamp {ts}"),
                    |dt| dt.format("%d/%m/%Y %H:%M:%S UTC").to_string(),
                )
            },
        );
        let vehicle = self
            .vehicle_type
            .map_or("not informed", VehicleType::as_str);
        format!("Entry time: {entry}\nVehicle type: {vehicle}")
    }
}

#[cfg(any(test, feature = "test-utils"))]
impl ResponseFrame {
    /// Encode this frame as a response payload (without the length prefix).
    /// Inverse of [`decode_response`], used by tests and the mock terminal.
    pub fn encode_payload(&self) -> Result<Vec<u8>> {
        use crate::field::FieldWriter;

        let mut w = FieldWriter::with_capacity(RESPONSE_PAYLOAD_SIZE);
        w.u16(0)
            .u32(self.response_type)
            .text("signature", &self.signature, SIGNATURE_WIDTH)?
            .bytes(&self.company_sign)
            .u32(self.timestamp)
            .u32(self.seq_no)
            .u32(self.terminal_id)
            .text("card id", &self.card_id, CARD_ID_WIDTH)?
            .u32(self.status_code)
            .text("operator text", &self.operator_text, DISPLAY_TEXT_WIDTH)?
            .text("customer text", &self.customer_text, DISPLAY_TEXT_WIDTH)?
            .text("printer line", &self.printer_line, DISPLAY_TEXT_WIDTH)?
            .u32(self.entry_timestamp.unwrap_or(0))
            .u16(self.vehicle_type.map_or(0, VehicleType::code))
            .u16(0)
            .u32(0)
            .bytes(&[0u8; RESPONSE_TRAILER_SIZE]);
        debug_assert_eq!(w.len(), RESPONSE_PAYLOAD_SIZE);
        Ok(w.finish())
    }

    /// Encode with a length prefix of `declared_len`.
    pub fn encode_frame_with_len(&self, declared_len: u16) -> Result<Vec<u8>> {
        let payload = self.encode_payload()?;
        let mut frame = Vec::with_capacity(crate::LENGTH_PREFIX_SIZE + payload.len());
        frame.extend_from_slice(&declared_len.to_le_bytes());
        frame.extend_from_slice(&payload);
        Ok(frame)
    }
}
