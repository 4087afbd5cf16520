//! Interactive loop: stdin commands, wallet account polling, success-notice
//! expiry and the cosmetic counters.

use std::{sync::Arc, time::Duration};

use alloy_primitives::Address;
use anyhow::Context;
use chain_client::{ChainGateway, RpcTransport};
use purchase_flow::{
    display_sync::{CounterTarget, DisplaySync, TICK_INTERVAL},
    PurchaseController, UiSurface,
};
use shared::protocol::UNAUTHORIZED_CODE;
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::mpsc,
    task::JoinHandle,
    time::{self, Instant, MissedTickBehavior},
};
use tracing::{debug, info, warn};
use url::Url;

use crate::{config::Settings, terminal::CounterCell};

const HELP: &str = "commands: buy | connect | refresh | disconnect | jackpot | help | quit";

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Activate,
    Connect,
    Refresh,
    Disconnect,
    Jackpot,
    Help,
    Quit,
    Unknown(String),
}

/// What the account poller saw on the wallet agent.
#[derive(Debug, PartialEq, Eq)]
enum WalletEvent {
    AccountsChanged(Vec<Address>),
    /// The poll failed; sent once per run of consecutive failures.
    Unreachable,
}

fn parse_command(line: &str) -> Option<Command> {
    let word = line.trim().to_ascii_lowercase();
    let command = match word.as_str() {
        "" => return None,
        "buy" | "b" => Command::Activate,
        "connect" | "c" => Command::Connect,
        "refresh" | "r" => Command::Refresh,
        "disconnect" => Command::Disconnect,
        "jackpot" | "j" => Command::Jackpot,
        "help" | "?" => Command::Help,
        "quit" | "exit" | "q" => Command::Quit,
        _ => Command::Unknown(word),
    };
    Some(command)
}

pub async fn run<G, S>(
    mut controller: PurchaseController<G, S>,
    settings: &Settings,
) -> anyhow::Result<()>
where
    G: ChainGateway,
    S: UiSurface,
{
    let jackpot = Arc::new(CounterCell::default());
    let tickets = Arc::new(CounterCell::default());
    let counters = if settings.show_counters {
        let jackpot_target: Arc<dyn CounterTarget> = jackpot.clone();
        let tickets_target: Arc<dyn CounterTarget> = tickets.clone();
        DisplaySync::new(Some(jackpot_target), Some(tickets_target)).spawn(TICK_INTERVAL)
    } else {
        None
    };

    let (wallet_tx, mut wallet_rx) = mpsc::channel(8);
    let poller = settings
        .wallet_endpoint()?
        .map(|url| spawn_account_poller(url, settings.account_poll_interval(), wallet_tx));

    let notice = time::sleep(Duration::ZERO);
    tokio::pin!(notice);
    let mut notice_armed = false;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    println!("{HELP}");

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("failed to read stdin")? else {
                    break;
                };
                match parse_command(&line) {
                    None => {}
                    Some(Command::Activate) => match controller.activate().await {
                        Ok(Some(receipt)) => {
                            info!(tx_hash = %receipt.purchase.tx_hash, "purchase confirmed");
                            notice
                                .as_mut()
                                .reset(Instant::now() + settings.notice_duration());
                            notice_armed = true;
                        }
                        Ok(None) => {}
                        Err(err) => debug!(error = %err, "action did not complete"),
                    },
                    Some(Command::Connect) => {
                        if let Err(err) = controller.connect().await {
                            debug!(error = %err, "connect did not complete");
                        }
                    }
                    Some(Command::Refresh) => controller.refresh().await,
                    Some(Command::Disconnect) => controller.disconnect(),
                    Some(Command::Jackpot) if counters.is_some() => {
                        println!("jackpot {}  tickets sold {}", jackpot.text(), tickets.text());
                    }
                    Some(Command::Jackpot) => println!("counters are disabled"),
                    Some(Command::Help) => println!("{HELP}"),
                    Some(Command::Quit) => break,
                    Some(Command::Unknown(word)) => println!("unknown command '{word}'. {HELP}"),
                }
            }
            Some(event) = wallet_rx.recv() => match event {
                WalletEvent::AccountsChanged(accounts) => controller.accounts_changed(accounts).await,
                WalletEvent::Unreachable => controller.refresh().await,
            },
            () = &mut notice, if notice_armed => {
                notice_armed = false;
                controller.expire_notice().await;
            }
        }
    }

    for handle in [counters, poller].into_iter().flatten() {
        handle.abort();
    }
    Ok(())
}

/// Polls `eth_accounts` and forwards the list whenever it differs from the
/// previous poll. The first poll only sets the baseline. A failed poll is
/// reported as [`WalletEvent::Unreachable`] and the next successful one is
/// always forwarded.
fn spawn_account_poller(
    url: Url,
    every: Duration,
    tx: mpsc::Sender<WalletEvent>,
) -> JoinHandle<()> {
    let transport = RpcTransport::new(url);
    tokio::spawn(async move {
        let mut interval = time::interval(every);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut last: Option<Vec<Address>> = None;
        let mut failing = false;

        loop {
            interval.tick().await;
            let accounts = match transport
                .request::<_, Vec<Address>>("eth_accounts", [0u8; 0])
                .await
            {
                Ok(accounts) => accounts,
                Err(err) if err.rpc_error().is_some_and(|e| e.code == UNAUTHORIZED_CODE) => {
                    Vec::new()
                }
                Err(err) => {
                    warn!(error = %err, "account poll failed");
                    if !failing {
                        failing = true;
                        if tx.send(WalletEvent::Unreachable).await.is_err() {
                            break;
                        }
                    }
                    continue;
                }
            };

            let changed = std::mem::take(&mut failing)
                || last.as_ref().is_some_and(|prev| *prev != accounts);
            last = Some(accounts.clone());
            if changed && tx.send(WalletEvent::AccountsChanged(accounts)).await.is_err() {
                break;
            }
        }
    })
}
