#![allow(clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use parkval_client::{ClientConfig, ExchangeWarning, FailureKind, IntegrationService};
use parkval_mock::{MockHandle, MockReply, MockTerminal};
use parkval_protocol::{Command, DiscountRequest, ResponseStatus, VehicleType};

fn request(command: Command) -> DiscountRequest {
    DiscountRequest::new(command, 303, "9220428135318", 1269, "04558054000173")
}

async fn mock_with(replies: Vec<MockReply>) -> MockHandle {
    let terminal = MockTerminal::bind("127.0.0.1:0").await.unwrap();
    for reply in replies {
        terminal.push_reply(reply).await;
    }
    terminal.spawn().unwrap()
}

fn service_for(mock: &MockHandle) -> IntegrationService {
    IntegrationService::new(
        ClientConfig::new("127.0.0.1", mock.port())
            .with_timeouts(Duration::from_secs(2), Duration::from_millis(500)),
    )
}

#[tokio::test]
async fn validation_end_to_end() {
    let mock = mock_with(vec![
        MockReply::status(0)
            .printer_line("Cartao validado ate 01/01/2025 - 10:00")
            .entry(1_735_718_400, Some(VehicleType::Carro)),
    ])
    .await;
    let service = service_for(&mock);

    let result = service.create_discount(&request(Command::Validation)).await;

    assert!(result.success, "{result:?}");
    assert_eq!(result.message, "Cartao validado ate 01/01/2025 - 10:00");
    assert_eq!(result.failure, None);
    assert!(result.warnings.is_empty());

    let response = result.response.unwrap();
    assert_eq!(response.status, ResponseStatus::Validated);
    assert_eq!(response.entry_timestamp, Some(1_735_718_400));
    assert_eq!(response.vehicle_type, Some(VehicleType::Carro));

    let seen = mock.requests().await;
    assert_eq!(seen.len(), 1);
    let sent = &seen[0];
    assert_eq!(sent.declared_len, 145);
    assert_eq!(sent.correlation_seq_no, result.sequence);
    assert_eq!(sent.request.command, Command::Validation);
    assert_eq!(sent.request.terminal_id, 303);
    assert_eq!(sent.request.card_id, "9220428135318");
    assert_eq!(sent.request.purchase_value, 1269);
    assert_eq!(sent.request.printer_line_len, 40);
}

#[tokio::test]
async fn consult_uses_consult_tag() {
    let mock = mock_with(vec![]).await;
    let result = service_for(&mock)
        .create_discount(&request(Command::Consult))
        .await;
    assert!(result.success);
    assert_eq!(result.message, "validated");
    assert_eq!(mock.requests().await[0].request.command, Command::Consult);
}

#[tokio::test]
async fn business_rejection_uses_table_message() {
    let mock = mock_with(vec![MockReply::status(2)]).await;
    let result = service_for(&mock)
        .create_discount(&request(Command::Validation))
        .await;
    assert!(!result.success);
    assert_eq!(result.failure, None);
    assert_eq!(result.message, "already validated");
}

#[tokio::test]
async fn invalid_card_type_override() {
    let mock = mock_with(vec![MockReply::status(7).printer_line("Tipo de cartao invalido")]).await;
    let result = service_for(&mock)
        .create_discount(&request(Command::Validation))
        .await;
    assert!(!result.success);
    assert_eq!(result.response.unwrap().status, ResponseStatus::InvalidCardType);
}

#[tokio::test]
async fn unknown_status_is_a_failure_outcome() {
    let mock = mock_with(vec![MockReply::status(42)]).await;
    let result = service_for(&mock)
        .create_discount(&request(Command::Validation))
        .await;
    assert!(!result.success);
    assert_eq!(result.failure, None);
    assert_eq!(result.response.unwrap().status, ResponseStatus::Unknown(42));
    assert!(result.message.contains("42"));
}

#[tokio::test]
async fn sequential_calls_allocate_consecutive_numbers() {
    let mock = mock_with(vec![]).await;
    let service = service_for(&mock);

    let first = service.create_discount(&request(Command::Consult)).await;
    let second = service.create_discount(&request(Command::Validation)).await;

    assert_eq!(second.sequence, first.sequence + 1);
    let seen: Vec<u32> = mock
        .requests()
        .await
        .iter()
        .map(|r| r.correlation_seq_no)
        .collect();
    assert_eq!(seen, vec![first.sequence, second.sequence]);
}

#[tokio::test]
async fn sequence_mismatch_is_a_warning_not_a_failure() {
    let mock = mock_with(vec![MockReply::status(0).echo_seq(2)]).await;
    let service = service_for(&mock);

    let result = service.create_discount(&request(Command::Validation)).await;

    assert_eq!(result.sequence, 1);
    assert!(result.success);
    assert_eq!(
        result.warnings,
        vec![ExchangeWarning::SequenceMismatch { sent: 1, echoed: 2 }]
    );
}

#[tokio::test]
async fn short_declared_length_is_protocol_error() {
    let mock = mock_with(vec![MockReply::default().declare_len(600)]).await;
    let result = service_for(&mock)
        .create_discount(&request(Command::Validation))
        .await;
    assert!(!result.success);
    assert_eq!(result.failure, Some(FailureKind::ProtocolFormat));
    assert!(result.message.contains("600"), "{}", result.message);
}

#[tokio::test]
async fn truncated_response_is_io_failure() {
    let mock = mock_with(vec![MockReply::default().truncate_to(200)]).await;
    let result = service_for(&mock)
        .create_discount(&request(Command::Validation))
        .await;
    assert_eq!(result.failure, Some(FailureKind::Io));
    assert!(result.message.contains("198 of 611"), "{}", result.message);
}

#[tokio::test]
async fn silent_terminal_times_out() {
    let mock = mock_with(vec![MockReply::silent()]).await;
    let result = service_for(&mock)
        .create_discount(&request(Command::Validation))
        .await;
    assert_eq!(result.failure, Some(FailureKind::Io));
    assert!(result.message.contains("timed out"), "{}", result.message);
}

#[tokio::test]
async fn refused_connection_is_connection_failure() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let service = IntegrationService::new(ClientConfig::new("127.0.0.1", port));
    let result = service.create_discount(&request(Command::Validation)).await;
    assert!(!result.success);
    assert_eq!(result.failure, Some(FailureKind::Connection));
}

#[tokio::test]
async fn unresolvable_host_is_connection_failure() {
    let service = IntegrationService::new(
        ClientConfig::new("terminal.invalid", 3000)
            .with_timeouts(Duration::from_secs(2), Duration::from_secs(2)),
    );
    let result = service.create_discount(&request(Command::Validation)).await;
    assert_eq!(result.failure, Some(FailureKind::Connection));
}

#[tokio::test]
async fn validation_failure_consumes_no_connection() {
    let mock = mock_with(vec![]).await;
    let service = service_for(&mock);

    let mut bad = request(Command::Validation);
    bad.purchase_value = 0;
    let result = service.create_discount(&bad).await;

    assert_eq!(result.failure, Some(FailureKind::Validation));
    assert!(result.message.contains("purchase value"));
    assert!(mock.requests().await.is_empty());
}

#[tokio::test]
async fn shared_service_never_reuses_a_sequence_number() {
    let mock = mock_with(vec![]).await;
    let service = Arc::new(service_for(&mock));

    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let service = Arc::clone(&service);
            tokio::spawn(async move { service.create_discount(&request(Command::Consult)).await })
        })
        .collect();

    let mut seqs = Vec::new();
    for task in tasks {
        let result = task.await.unwrap();
        assert!(result.success, "{result:?}");
        assert!(result.warnings.is_empty());
        seqs.push(result.sequence);
    }
    seqs.sort_unstable();
    assert_eq!(seqs, (1..=8).collect::<Vec<_>>());
}
