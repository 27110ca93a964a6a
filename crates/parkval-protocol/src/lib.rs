//! # parkval-protocol
//!
//! Byte-exact codec for the parking validation terminal protocol.
//!
//! Every exchange is a single length-prefixed frame in each direction,
//! little-endian throughout:
//!
//! ```text
//! request  : u16 length (=145) | header (45) | data (100)      = 147 bytes
//! response : u16 length (=611) | header (45) | data (468) | reserved (98) = 613 bytes
//! ```
//!
//! This crate is transport independent: it turns a [`DiscountRequest`] plus a
//! correlation sequence number into request bytes, turns response payload
//! bytes into a [`ResponseFrame`], and interprets the status code through the
//! [`status`] table.

pub mod cnpj;
pub mod command;
pub mod error;
mod field;
pub mod hexdump;
pub mod request;
pub mod response;
pub mod sequence;
pub mod status;

pub use command::Command;
pub use error::{CodecError, Result};
pub use request::{DiscountRequest, encode_request};
pub use response::{DiscountResponse, ResponseFrame, VehicleType, decode_response};
pub use sequence::SequenceAllocator;
pub use status::{ResponseStatus, StatusOutcome};

/// Size of the little-endian `u16` length prefix in front of every payload.
pub const LENGTH_PREFIX_SIZE: usize = 2;

/// Header shared by requests and responses:
/// filler (2) + type (4) + signature (15) + company sign (16) + timestamp (4) + sequence (4).
pub const HEADER_SIZE: usize = 45;

/// Fixed width of the fiscal signature field.
pub const SIGNATURE_WIDTH: usize = 15;

/// Fixed width of the company sign field.
pub const COMPANY_SIGN_WIDTH: usize = 16;

/// Fixed width of the card (ticket barcode) field.
pub const CARD_ID_WIDTH: usize = 64;

/// Company sign identifying the integrating company: "ESTAPAR", eight spaces, NUL.
pub const COMPANY_SIGN: [u8; COMPANY_SIGN_WIDTH] = *b"ESTAPAR        \0";

/// Sentinel carried by the reserved request fields.
pub const RESERVED_SENTINEL: u32 = 0xFFFF_FFFF;
