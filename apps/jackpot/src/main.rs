use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use purchase_flow::PurchaseController;
use tracing_subscriber::EnvFilter;

mod config;
mod terminal;
mod watch;

use config::{load_settings, Settings, DEFAULT_CONFIG_FILE};
use terminal::TerminalSurface;

#[derive(Parser, Debug)]
#[command(name = "jackpot", about = "Buy jackpot lottery tickets through a wallet agent")]
struct Args {
    #[arg(long, env = "JACKPOT_CONFIG", default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,
    /// JSON-RPC endpoint of the wallet agent.
    #[arg(long)]
    wallet_url: Option<String>,
    /// Node endpoint used for contract reads.
    #[arg(long)]
    rpc_url: Option<String>,
    #[arg(long)]
    chain_id: Option<u64>,
    #[arg(long)]
    no_counters: bool,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    /// Show wallet and lottery state, then exit.
    Status,
    /// Request account access from the wallet agent.
    Connect,
    /// Connect if needed and buy one ticket.
    Buy,
    /// Interactive mode (default).
    Watch,
}

impl Args {
    fn apply(&self, settings: &mut Settings) {
        if let Some(v) = &self.wallet_url {
            settings.wallet_url = Some(v.clone());
        }
        if let Some(v) = &self.rpc_url {
            settings.rpc_url = Some(v.clone());
        }
        if let Some(v) = self.chain_id {
            settings.required_chain_id = v;
        }
        if self.no_counters {
            settings.show_counters = false;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    let args = Args::parse();

    let mut settings = load_settings(&args.config)?;
    args.apply(&mut settings);

    let gateway = settings.build_gateway()?;
    let mut controller = PurchaseController::new(
        gateway,
        TerminalSurface::stdout(),
        settings.controller_options(),
    );
    controller.resume().await;

    match args.command.unwrap_or(Command::Watch) {
        Command::Status => {}
        Command::Connect => {
            let session = controller.connect().await?;
            println!("connected {} on chain {}", session.account, session.chain_id);
        }
        Command::Buy => {
            let receipt = if controller.session().is_connected() {
                controller.purchase().await?
            } else {
                match controller.connect_and_buy().await? {
                    Some(receipt) => receipt,
                    None => bail!("no ticket bought: {}", controller.phase()),
                }
            };
            if let Some(approval) = &receipt.approval {
                println!("approval confirmed in block {}", approval.block_number);
            }
            println!(
                "ticket bought in tx {} (block {})",
                receipt.purchase.tx_hash, receipt.purchase.block_number
            );
        }
        Command::Watch => watch::run(controller, &settings).await?,
    }

    Ok(())
}
