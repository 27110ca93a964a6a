//! Discount request and its wire encoding.
//!
//! ```text
//! offset size field
//! ------ ---- --------------------------------------------
//!      0    2 length of header + data (=145), u16 LE
//!  header
//!      2    2 filler (0)
//!      4    4 command type
//!      8   15 fiscal signature, zero padded
//!     23   16 company sign
//!     39    4 command timestamp (Unix seconds)
//!     43    4 correlation sequence number
//!  data
//!     47    4 terminal id
//!     51   64 card id, zero padded
//!    115    4 purchase value (cents)
//!    119    4 operation sequence number (coupon)
//!    123    4 reserved (0xFFFFFFFF)
//!    127    4 reserved (0xFFFFFFFF)
//!    131    4 sale type, reserved (0xFFFFFFFF)
//!    135    4 operator display length
//!    139    4 customer display length
//!    143    4 printer line length (40)
//! ```

use std::time::{SystemTime, UNIX_EPOCH};

use crate::cnpj;
use crate::command::Command;
use crate::error::{CodecError, Result};
use crate::field::FieldWriter;
use crate::{
    CARD_ID_WIDTH, COMPANY_SIGN, COMPANY_SIGN_WIDTH, HEADER_SIZE, LENGTH_PREFIX_SIZE,
    RESERVED_SENTINEL, SIGNATURE_WIDTH,
};

/// Size of the request data block.
pub const REQUEST_DATA_SIZE: usize = 100;

/// Length prefix value of every request: header + data.
pub const REQUEST_PAYLOAD_SIZE: usize = HEADER_SIZE + REQUEST_DATA_SIZE;

/// Total on-wire request size.
pub const REQUEST_FRAME_SIZE: usize = LENGTH_PREFIX_SIZE + REQUEST_PAYLOAD_SIZE;

/// Printer line width requested unless told otherwise.
pub const DEFAULT_PRINTER_LINE_LEN: u32 = 40;

/// Outbound business intent, minus the correlation sequence number, which
/// is allocated by the client right before transmission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscountRequest {
    pub command: Command,
    /// POS terminal number.
    pub terminal_id: u32,
    /// Ticket barcode.
    pub card_id: String,
    /// Purchase value in cents.
    pub purchase_value: u32,
    /// Fiscal document (CNPJ) of the issuing company.
    pub fiscal_signature: String,
    pub company_sign: [u8; COMPANY_SIGN_WIDTH],
    /// Auxiliary sequence, usually the POS coupon number.
    pub op_seq_no: u32,
    /// Unix seconds at construction.
    pub command_timestamp: u32,
    pub reserved_0: u32,
    pub reserved_1: u32,
    pub sale_type: u32,
    pub op_display_len: u32,
    pub cust_display_len: u32,
    pub printer_line_len: u32,
}

impl DiscountRequest {
    /// Build a request stamped with the current time and protocol defaults.
    pub fn new(
        command: Command,
        terminal_id: u32,
        card_id: impl Into<String>,
        purchase_value: u32,
        fiscal_signature: impl Into<String>,
    ) -> Self {
        Self {
            command,
            terminal_id,
            card_id: card_id.into(),
            purchase_value,
            fiscal_signature: fiscal_signature.into(),
            company_sign: COMPANY_SIGN,
            op_seq_no: 0,
            command_timestamp: now_unix_u32(),
            reserved_0: RESERVED_SENTINEL,
            reserved_1: RESERVED_SENTINEL,
            sale_type: RESERVED_SENTINEL,
            op_display_len: 0,
            cust_display_len: 0,
            printer_line_len: DEFAULT_PRINTER_LINE_LEN,
        }
    }

    #[must_use]
    pub const fn with_op_seq_no(mut self, op_seq_no: u32) -> Self {
        self.op_seq_no = op_seq_no;
        self
    }

    #[must_use]
    pub const fn with_timestamp(mut self, command_timestamp: u32) -> Self {
        self.command_timestamp = command_timestamp;
        self
    }

    #[must_use]
    pub const fn with_printer_line_len(mut self, printer_line_len: u32) -> Self {
        self.printer_line_len = printer_line_len;
        self
    }

    /// Business validation run before anything reaches the wire.
    pub fn validate(&self) -> Result<()> {
        if self.purchase_value == 0 {
            return Err(CodecError::NotPositive {
                field: "purchase value",
            });
        }
        if self.terminal_id == 0 {
            return Err(CodecError::NotPositive {
                field: "terminal id",
            });
        }
        if self.card_id.trim().is_empty() {
            return Err(CodecError::MissingField { field: "card id" });
        }
        if self.fiscal_signature.trim().is_empty() {
            return Err(CodecError::MissingField {
                field: "fiscal signature",
            });
        }
        Ok(())
    }

    /// Reject a fiscal signature whose CNPJ check digits do not verify.
    pub fn validate_cnpj(&self) -> Result<()> {
        if cnpj::is_valid(&self.fiscal_signature) {
            Ok(())
        } else {
            Err(CodecError::InvalidCnpj(self.fiscal_signature.clone()))
        }
    }
}

/// Validate `request` and encode it, with its correlation sequence number,
/// into the full length-prefixed frame.
pub fn encode_request(request: &DiscountRequest, correlation_seq_no: u32) -> Result<Vec<u8>> {
    request.validate()?;

    let mut w = FieldWriter::with_capacity(REQUEST_FRAME_SIZE);
    #[allow(clippy::cast_possible_truncation)]
    w.u16(REQUEST_PAYLOAD_SIZE as u16);

    // header
    w.u16(0)
        .u32(request.command.tag())
        .text("fiscal signature", &request.fiscal_signature, SIGNATURE_WIDTH)?
        .bytes(&request.company_sign)
        .u32(request.command_timestamp)
        .u32(correlation_seq_no);

    // data
    w.u32(request.terminal_id)
        .text("card id", &request.card_id, CARD_ID_WIDTH)?
        .u32(request.purchase_value)
        .u32(request.op_seq_no)
        .u32(request.reserved_0)
        .u32(request.reserved_1)
        .u32(request.sale_type)
        .u32(request.op_display_len)
        .u32(request.cust_display_len)
        .u32(request.printer_line_len);

    debug_assert_eq!(w.len(), REQUEST_FRAME_SIZE);
    Ok(w.finish())
}

fn now_unix_u32() -> u32 {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    u32::try_from(secs).unwrap_or(u32::MAX)
}

/// A request frame decoded back into its fields.
#[cfg(any(test, feature = "test-utils"))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedRequest {
    /// Value of the length prefix.
    pub declared_len: u16,
    pub correlation_seq_no: u32,
    pub request: DiscountRequest,
}

/// Inverse of [`encode_request`], used by tests and the mock terminal.
///
/// Accepts the full frame including the length prefix. The command tag must
/// be a known one.
#[cfg(any(test, feature = "test-utils"))]
pub fn decode_request(frame: &[u8]) -> Result<DecodedRequest> {
    use crate::field::FieldReader;

    if frame.len() != REQUEST_FRAME_SIZE {
        return Err(CodecError::Malformed(format!(
            "request frame is {} bytes, expected {REQUEST_FRAME_SIZE}",
            frame.len()
        )));
    }

    let mut r = FieldReader::new(frame);
    let declared_len = r.u16()?;
    let _filler = r.u16()?;
    let tag = r.u32()?;
    let command = Command::from_tag(tag)
        .ok_or_else(|| CodecError::Malformed(format!("unknown command type 0x{tag:08X}")))?;
    let fiscal_signature = r.text(SIGNATURE_WIDTH)?;
    let company_sign = r.array::<COMPANY_SIGN_WIDTH>()?;
    let command_timestamp = r.u32()?;
    let correlation_seq_no = r.u32()?;

    let terminal_id = r.u32()?;
    let card_id = r.text(CARD_ID_WIDTH)?;
    let purchase_value = r.u32()?;
    let op_seq_no = r.u32()?;
    let reserved_0 = r.u32()?;
    let reserved_1 = r.u32()?;
    let sale_type = r.u32()?;
    let op_display_len = r.u32()?;
    let cust_display_len = r.u32()?;
    let printer_line_len = r.u32()?;

    Ok(DecodedRequest {
        declared_len,
        correlation_seq_no,
        request: DiscountRequest {
            command,
            terminal_id,
            card_id,
            purchase_value,
            fiscal_signature,
            company_sign,
            op_seq_no,
            command_timestamp,
            reserved_0,
            reserved_1,
            sale_type,
            op_display_len,
            cust_display_len,
            printer_line_len,
        },
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn sample() -> DiscountRequest {
        DiscountRequest::new(Command::Validation, 303, "9220428135318", 1269, "04558054000173")
            .with_op_seq_no(10431)
            .with_timestamp(1_735_725_600)
    }

    #[test]
    fn frame_is_147_bytes_with_145_prefix() {
        let frame = encode_request(&sample(), 1).unwrap();
        assert_eq!(frame.len(), 147);
        assert_eq!(u16::from_le_bytes([frame[0], frame[1]]), 145);
        assert_eq!(usize::from(u16::from_le_bytes([frame[0], frame[1]])), frame.len() - 2);
    }

    #[test]
    fn fields_land_at_documented_offsets() {
        let frame = encode_request(&sample(), 0x0102_0304).unwrap();
        let u32_at = |off: usize| u32::from_le_bytes(frame[off..off + 4].try_into().unwrap());

        assert_eq!(&frame[2..4], &[0, 0]);
        assert_eq!(u32_at(4), 0x10);
        assert_eq!(&frame[8..22], b"04558054000173");
        assert_eq!(frame[22], 0);
        assert_eq!(&frame[23..39], b"ESTAPAR        \0");
        assert_eq!(u32_at(39), 1_735_725_600);
        assert_eq!(&frame[43..47], &[0x04, 0x03, 0x02, 0x01]);
        assert_eq!(u32_at(47), 303);
        assert_eq!(&frame[51..64], b"9220428135318");
        assert_eq!(u32_at(115), 1269);
        assert_eq!(u32_at(119), 10431);
        assert_eq!(u32_at(123), 0xFFFF_FFFF);
        assert_eq!(u32_at(127), 0xFFFF_FFFF);
        assert_eq!(u32_at(131), 0xFFFF_FFFF);
        assert_eq!(u32_at(135), 0);
        assert_eq!(u32_at(139), 0);
        assert_eq!(u32_at(143), 40);
    }

    #[test]
    fn consult_changes_only_the_command_tag() {
        let validation = encode_request(&sample(), 9).unwrap();
        let mut consult_req = sample();
        consult_req.command = Command::Consult;
        let consult = encode_request(&consult_req, 9).unwrap();

        assert_eq!(consult.len(), validation.len());
        let differing: Vec<usize> = (0..consult.len())
            .filter(|&i| consult[i] != validation[i])
            .collect();
        assert_eq!(differing, vec![4]);
        assert_eq!(consult[4], 0x0F);
    }

    #[test]
    fn round_trip_preserves_every_field() {
        let request = sample();
        let frame = encode_request(&request, 77).unwrap();
        let decoded = decode_request(&frame).unwrap();

        assert_eq!(decoded.declared_len, 145);
        assert_eq!(decoded.correlation_seq_no, 77);
        assert_eq!(decoded.request, request);
    }

    #[test]
    fn card_id_of_64_bytes_has_no_padding() {
        let card = "7".repeat(64);
        let mut request = sample();
        request.card_id.clone_from(&card);
        let frame = encode_request(&request, 1).unwrap();
        assert_eq!(&frame[51..115], card.as_bytes());
    }

    #[test]
    fn card_id_of_10_bytes_has_54_trailing_zeros() {
        let mut request = sample();
        request.card_id = "1234567890".to_string();
        let frame = encode_request(&request, 1).unwrap();
        assert_eq!(&frame[51..61], b"1234567890");
        assert!(frame[61..115].iter().all(|&b| b == 0));
        assert_eq!(frame[61..115].len(), 54);
    }

    #[test]
    fn card_id_of_65_bytes_is_rejected() {
        let mut request = sample();
        request.card_id = "1".repeat(65);
        let err = encode_request(&request, 1).unwrap_err();
        assert_eq!(
            err,
            CodecError::FieldTooLong {
                field: "card id",
                len: 65,
                max: 64
            }
        );
        assert!(err.is_validation());
    }

    #[test]
    fn fiscal_signature_over_15_bytes_is_rejected() {
        let mut request = sample();
        request.fiscal_signature = "0455805400017300".to_string();
        let err = encode_request(&request, 1).unwrap_err();
        assert!(matches!(err, CodecError::FieldTooLong { max: 15, .. }));
    }

    #[test]
    fn validation_rejects_bad_business_input() {
        let cases = [
            (DiscountRequest { purchase_value: 0, ..sample() }, "purchase value"),
            (DiscountRequest { terminal_id: 0, ..sample() }, "terminal id"),
            (DiscountRequest { card_id: "   ".into(), ..sample() }, "card id"),
            (DiscountRequest { fiscal_signature: String::new(), ..sample() }, "fiscal signature"),
        ];
        for (request, field) in cases {
            let err = encode_request(&request, 1).unwrap_err();
            assert!(err.is_validation(), "{field}");
            assert!(err.to_string().contains(field), "{err} should name {field}");
        }
    }

    #[test]
    fn cnpj_check_is_separate_from_validate() {
        // The production signature does not carry valid check digits, which
        // is why the CNPJ check is opt-in.
        let mut request = sample();
        assert!(request.validate().is_ok());
        assert!(matches!(request.validate_cnpj(), Err(CodecError::InvalidCnpj(_))));

        request.fiscal_signature = "11222333000181".to_string();
        assert!(request.validate_cnpj().is_ok());
    }
}
