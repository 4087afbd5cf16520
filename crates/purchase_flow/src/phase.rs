//! Purchase flow phases and their projection onto the action element and
//! status line.

use std::fmt;

use alloy_primitives::U256;
use shared::domain::{format_units, ChainId, LotteryStatus};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    /// No wallet agent answered; the action links to install instructions.
    WalletMissing,
    Disconnected,
    WrongNetwork { expected: ChainId, actual: ChainId },
    Closed { status: LotteryStatus },
    Ready { price: U256 },
    Processing,
    Error { message: String },
}

/// What the controller learned from the wallet agent or the chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Observation {
    ProviderMissing,
    SessionEnded,
    NetworkMismatch { expected: ChainId, actual: ChainId },
    LotteryOpen { price: U256 },
    LotteryClosed { status: LotteryStatus },
    ReadFailed(String),
    PurchaseStarted,
}

impl Phase {
    /// The single transition function. Every observation fully determines the
    /// next phase except `PurchaseStarted`, which only leaves `Ready`.
    pub fn transition(self, observation: Observation) -> Phase {
        match observation {
            Observation::ProviderMissing => Phase::WalletMissing,
            Observation::SessionEnded => Phase::Disconnected,
            Observation::NetworkMismatch { expected, actual } => {
                Phase::WrongNetwork { expected, actual }
            }
            Observation::LotteryOpen { price } => Phase::Ready { price },
            Observation::LotteryClosed { status } if status.is_open() => Phase::Error {
                message: "lottery reported open without a ticket price".to_string(),
            },
            Observation::LotteryClosed { status } => Phase::Closed { status },
            Observation::ReadFailed(message) => Phase::Error { message },
            Observation::PurchaseStarted => match self {
                Phase::Ready { .. } => Phase::Processing,
                other => other,
            },
        }
    }

    pub fn can_purchase(&self) -> bool {
        matches!(self, Phase::Ready { .. })
    }

    pub fn action_view(&self, labels: &ViewLabels) -> ActionView {
        match self {
            Phase::WalletMissing => ActionView::enabled(
                "INSTALL WALLET",
                Action::InstallWallet {
                    url: labels.install_url.clone(),
                },
            ),
            Phase::Disconnected => ActionView::enabled("CONNECT WALLET", Action::Connect),
            Phase::WrongNetwork { .. } => ActionView::disabled("WRONG NETWORK"),
            Phase::Closed { .. } => ActionView::disabled("LOTTERY CLOSED"),
            Phase::Ready { price } => ActionView::enabled(
                format!(
                    "BUY {}{} TICKET",
                    labels.currency_prefix,
                    format_units(*price, labels.token_decimals)
                ),
                Action::BuyTicket,
            ),
            Phase::Processing => ActionView::disabled("PROCESSING..."),
            Phase::Error { .. } => ActionView::disabled("UNAVAILABLE"),
        }
    }

    pub fn status_line(&self, labels: &ViewLabels) -> StatusLine {
        match self {
            Phase::WalletMissing => {
                StatusLine::error("Please install a wallet agent to use this app.")
            }
            Phase::Disconnected => StatusLine::info("Connect your wallet to participate."),
            Phase::WrongNetwork { actual, .. } => StatusLine::error(format!(
                "Please switch to {}. You are on chain {actual}.",
                labels.network_name
            )),
            Phase::Closed {
                status: LotteryStatus::Finalized,
            } => StatusLine::error("Lottery has been finalized. Awaiting next draw."),
            Phase::Closed { .. } => {
                StatusLine::error("Lottery is currently closed. Awaiting next draw.")
            }
            Phase::Ready { .. } => StatusLine::info("Lottery is OPEN! Get your ticket now."),
            Phase::Processing => StatusLine::info("Processing..."),
            Phase::Error { message } => {
                StatusLine::error(format!("Error connecting to contracts: {message}"))
            }
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::WalletMissing => f.write_str("no wallet agent is present"),
            Phase::Disconnected => f.write_str("disconnected"),
            Phase::WrongNetwork { actual, .. } => write!(f, "on wrong network (chain {actual})"),
            Phase::Closed { status } => write!(f, "lottery is {status}"),
            Phase::Ready { .. } => f.write_str("ready"),
            Phase::Processing => f.write_str("a purchase is in progress"),
            Phase::Error { .. } => f.write_str("contract state is unknown"),
        }
    }
}

/// Presentation constants the projections need.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewLabels {
    pub network_name: String,
    pub install_url: String,
    pub currency_prefix: String,
    pub token_decimals: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    InstallWallet { url: String },
    Connect,
    BuyTicket,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionView {
    pub label: String,
    pub enabled: bool,
    pub action: Option<Action>,
}

impl ActionView {
    fn enabled(label: impl Into<String>, action: Action) -> Self {
        Self {
            label: label.into(),
            enabled: true,
            action: Some(action),
        }
    }

    fn disabled(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            enabled: false,
            action: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusLine {
    pub message: String,
    pub is_error: bool,
}

impl StatusLine {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            is_error: false,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            is_error: true,
        }
    }
}

#[cfg(test)]
#[path = "tests/phase_tests.rs"]
mod tests;
