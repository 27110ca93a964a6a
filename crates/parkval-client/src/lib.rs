//! # parkval-client
//!
//! Talks to the parking validation terminal over TCP.
//!
//! [`TransportClient`] owns one socket for one request/response pair.
//! [`IntegrationService`] sits on top: it allocates the correlation sequence
//! number, runs the codecs and the transport, and folds every outcome into a
//! [`DiscountResult`].

pub mod error;
pub mod service;
pub mod transport;

pub use error::{Stage, TransportError};
pub use service::{ClientConfig, DiscountResult, ExchangeWarning, FailureKind, IntegrationService};
pub use transport::{TransportClient, TransportState};
