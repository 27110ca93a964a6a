//! `consult` and `validate` subcommands.
//!
//! User-facing output uses writeln! to stdout (this is a CLI binary, not debug output).

use std::io::{self, Write};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Args;
use tracing::{info, warn};

use parkval_client::{ClientConfig, DiscountResult, IntegrationService};
use parkval_core::Config;
use parkval_notify::{HttpNotifier, Notification, NotificationDispatcher, NotificationOutbox};
use parkval_protocol::{Command, DiscountRequest};

use crate::amount::{parse_amount, parse_cents};
use crate::notifications_cmd::outbox_path;

#[derive(Args, Debug)]
pub struct DiscountArgs {
    /// Ticket barcode
    #[arg(long)]
    card: String,

    /// Purchase value, e.g. 12.69
    #[arg(long)]
    value: String,

    /// Read --value as a whole number of cents
    #[arg(long)]
    cents: bool,

    /// POS terminal number (default: request.terminal_id from settings)
    #[arg(long)]
    terminal: Option<u32>,

    /// POS coupon number
    #[arg(long, default_value_t = 0)]
    coupon: u32,

    /// Terminal server host (overrides settings)
    #[arg(long)]
    host: Option<String>,

    /// Terminal server port (overrides settings)
    #[arg(long)]
    port: Option<u16>,

    /// Print the result as JSON
    #[arg(long)]
    json: bool,
}

pub async fn run(command: Command, args: DiscountArgs, mut config: Config) -> Result<ExitCode> {
    apply_overrides(&args, &mut config);
    let request = build_request(command, &args, &config)?;

    info!(
        command = %command,
        host = %config.terminal.host,
        port = config.terminal.port,
        "Sending discount request"
    );
    let service = IntegrationService::new(ClientConfig::from(&config));
    let result = service.create_discount(&request).await;

    print_result(&result, args.json)?;

    if config.notification.enabled {
        if let Err(e) = notify(&config, &request, &result).await {
            warn!(error = %e, "Could not dispatch notification");
        }
    }

    Ok(if result.success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn apply_overrides(args: &DiscountArgs, config: &mut Config) {
    if let Some(host) = &args.host {
        config.terminal.host.clone_from(host);
    }
    if let Some(port) = args.port {
        config.terminal.port = port;
    }
}

fn build_request(command: Command, args: &DiscountArgs, config: &Config) -> Result<DiscountRequest> {
    let purchase_value = if args.cents {
        parse_cents(&args.value)
    } else {
        parse_amount(&args.value)
    }
    .with_context(|| format!("Invalid --value {:?}", args.value))?;

    let terminal_id = args
        .terminal
        .or(config.request.terminal_id)
        .context("No terminal id: pass --terminal or set request.terminal_id in settings")?;

    Ok(DiscountRequest::new(
        command,
        terminal_id,
        args.card.trim(),
        purchase_value,
        config.request.fiscal_signature.clone(),
    )
    .with_op_seq_no(args.coupon)
    .with_printer_line_len(config.request.printer_line_len))
}

fn print_result(result: &DiscountResult, json: bool) -> Result<()> {
    let mut out = io::stdout().lock();
    if json {
        writeln!(out, "{}", serde_json::to_string_pretty(result)?)?;
        return Ok(());
    }

    let label = if result.success { "OK" } else { "FAILED" };
    writeln!(out, "{label}: {}", result.message)?;
    if result.success {
        if let Some(response) = &result.response {
            writeln!(out, "{}", response.details())?;
        }
    }
    for warning in &result.warnings {
        writeln!(out, "warning: {warning}")?;
    }
    Ok(())
}

async fn notify(config: &Config, request: &DiscountRequest, result: &DiscountResult) -> Result<()> {
    let notifier = HttpNotifier::from_config(&config.notification)?;
    let outbox = match outbox_path(config) {
        Some(path) => Some(NotificationOutbox::open(&path).await?),
        None => None,
    };
    let dispatcher = NotificationDispatcher::new(notifier, outbox);

    let notification = Notification::new(request, result.success, result.message.as_str());
    let delivery = dispatcher.dispatch(&notification).await?;
    info!(?delivery, "Notification dispatched");
    Ok(())
}
