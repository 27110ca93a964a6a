use std::net::SocketAddr;

use clap::Parser;
use parkval_mock::{MockReply, MockTerminal};
use parkval_protocol::VehicleType;
use tracing::info;

/// Mock parking validation terminal.
#[derive(Parser)]
#[command(name = "parkval-mock", version)]
struct Args {
    /// Listen address
    #[arg(long, default_value = "127.0.0.1:3000", env = "PARKVAL_MOCK_ADDR")]
    addr: SocketAddr,

    /// Status code returned for every request
    #[arg(long, default_value_t = 0)]
    status: u32,

    /// Printer line text
    #[arg(long, default_value = "")]
    printer_line: String,

    /// Operator display text
    #[arg(long, default_value = "Mensagem para operador")]
    operator_text: String,

    /// Customer display text
    #[arg(long, default_value = "Mensagem para cliente")]
    customer_text: String,

    /// Entry timestamp (Unix seconds); omitted means "not informed"
    #[arg(long)]
    entry_timestamp: Option<u32>,

    /// Vehicle type code (1 = Moto, 2 = Carro)
    #[arg(long)]
    vehicle: Option<u16>,

    /// Read requests but never answer
    #[arg(long)]
    silent: bool,

    /// Emit JSON log lines
    #[arg(long)]
    log_json: bool,
}

impl Args {
    fn reply(&self) -> MockReply {
        if self.silent {
            return MockReply::silent();
        }
        let mut reply = MockReply::status(self.status)
            .printer_line(self.printer_line.as_str())
            .operator_text(self.operator_text.as_str())
            .customer_text(self.customer_text.as_str());
        reply.entry_timestamp = self.entry_timestamp;
        reply.vehicle_type = self.vehicle.and_then(VehicleType::from_code);
        reply
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    parkval_core::tracing_init::init_tracing("info", args.log_json);

    let terminal = MockTerminal::bind(args.addr).await?;
    terminal.set_default_reply(args.reply()).await;

    info!(addr = %args.addr, status = args.status, silent = args.silent, "Starting parkval-mock");
    terminal.serve().await?;
    Ok(())
}
