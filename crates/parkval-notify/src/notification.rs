//! Notification payload.

use parkval_protocol::DiscountRequest;
use serde::{Deserialize, Serialize};

/// Outcome of one discount call, as reported to the notification endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    /// Ticket barcode.
    pub ticket_code: String,
    /// POS coupon number.
    pub num_ped_ecf: u32,
    /// Purchase value in currency units.
    pub vl_total: f64,
    /// Command tag sent to the terminal.
    pub operation_type: u32,
    pub success: bool,
    pub message: String,
}

impl Notification {
    pub fn new(request: &DiscountRequest, success: bool, message: impl Into<String>) -> Self {
        Self {
            ticket_code: request.card_id.clone(),
            num_ped_ecf: request.op_seq_no,
            vl_total: f64::from(request.purchase_value) / 100.0,
            operation_type: request.command.tag(),
            success,
            message: message.into(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use parkval_protocol::Command;

    #[test]
    fn built_from_request_and_serialized_with_wire_keys() {
        let request = DiscountRequest::new(Command::Validation, 303, "9220428135318", 1269, "04558054000173")
            .with_op_seq_no(4411);
        let notification = Notification::new(&request, true, "Cartao validado");

        let json = serde_json::to_value(&notification).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "ticket_code": "9220428135318",
                "num_ped_ecf": 4411,
                "vl_total": 12.69,
                "operation_type": 16,
                "success": true,
                "message": "Cartao validado",
            })
        );
    }
}
