//! Connect, verify network, refresh status and the approve-then-buy sequence.

use alloy_primitives::{Address, U256};
use chain_client::ChainGateway;
use shared::{
    domain::{short_address, ChainId, Finality},
    error::FlowError,
};
use tracing::{debug, info, warn};

use crate::{
    phase::{Action, Observation, Phase, StatusLine, ViewLabels},
    session::{Session, SessionState},
    surface::UiSurface,
};

pub const DEFAULT_BUY_GAS_LIMIT: u64 = 300_000;

const PURCHASE_SUCCESS: &str = "Ticket purchased successfully!";
const PURCHASE_CONGRATS: &str = "Congratulations! Your ticket has been purchased successfully.";
const CONNECT_FAILED: &str = "Wallet connection failed.";

#[derive(Debug, Clone)]
pub struct ControllerOptions {
    pub required_chain: ChainId,
    pub buy_gas_limit: u64,
    pub labels: ViewLabels,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurchaseReceipt {
    pub price: U256,
    /// Present only when the allowance had to be raised first.
    pub approval: Option<Finality>,
    pub purchase: Finality,
}

pub struct PurchaseController<G, S> {
    gateway: G,
    surface: S,
    options: ControllerOptions,
    session: SessionState,
    phase: Phase,
}

impl<G, S> PurchaseController<G, S>
where
    G: ChainGateway,
    S: UiSurface,
{
    pub fn new(gateway: G, surface: S, options: ControllerOptions) -> Self {
        let mut controller = Self {
            gateway,
            surface,
            options,
            session: SessionState::Uninitialized,
            phase: Phase::Disconnected,
        };
        controller.render();
        controller
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    /// Start-up check: pick up an already exposed account without prompting.
    pub async fn resume(&mut self) {
        match self.gateway.accounts().await {
            Ok(accounts) => match accounts.first() {
                Some(account) => {
                    let _ = self.establish(*account).await;
                }
                None => self.apply(Observation::SessionEnded),
            },
            Err(FlowError::ProviderUnavailable) => self.apply(Observation::ProviderMissing),
            Err(err) => {
                warn!(error = %err, "could not query wallet accounts on start-up");
                self.apply(Observation::SessionEnded);
                self.show(StatusLine::error("Could not connect to wallet."));
            }
        }
    }

    /// Asks the wallet agent for account access, then refreshes.
    pub async fn connect(&mut self) -> Result<Session, FlowError> {
        let accounts = match self.gateway.request_accounts().await {
            Ok(accounts) => accounts,
            Err(err) => return Err(self.connect_failed(err)),
        };
        let Some(account) = accounts.first().copied() else {
            return Err(self.connect_failed(FlowError::UserRejected));
        };
        self.establish(account).await
    }

    /// Primary action while disconnected: connect, and buy only if the
    /// refresh that follows lands on an open lottery.
    pub async fn connect_and_buy(&mut self) -> Result<Option<PurchaseReceipt>, FlowError> {
        self.connect().await?;
        if !self.phase.can_purchase() {
            debug!(phase = %self.phase, "connected; lottery not purchasable");
            return Ok(None);
        }
        self.purchase().await.map(Some)
    }

    /// Runs whatever the action element currently offers.
    pub async fn activate(&mut self) -> Result<Option<PurchaseReceipt>, FlowError> {
        let view = self.phase.action_view(&self.options.labels);
        match view.action {
            Some(Action::InstallWallet { url }) => {
                self.surface
                    .notify(&format!("Install a wallet agent: {url}"));
                Err(FlowError::ProviderUnavailable)
            }
            Some(Action::Connect) => self.connect_and_buy().await,
            Some(Action::BuyTicket) => self.purchase().await.map(Some),
            None => Err(FlowError::ActionDisabled {
                phase: self.phase.to_string(),
            }),
        }
    }

    /// Re-reads the network and lottery state and resynchronizes the view.
    pub async fn refresh(&mut self) {
        if !self.session.is_connected() {
            self.apply(Observation::SessionEnded);
            return;
        }
        match self.gateway.chain_id().await {
            Ok(chain_id) => self.session.update_chain(chain_id),
            Err(FlowError::ProviderUnavailable) => {
                self.session.mark_stale();
                self.apply(Observation::ProviderMissing);
                return;
            }
            Err(err) => {
                self.apply(Observation::ReadFailed(err.to_string()));
                return;
            }
        }
        self.sync_lottery_view().await;
    }

    /// Wallet notification that the exposed accounts changed.
    pub async fn accounts_changed(&mut self, accounts: Vec<Address>) {
        let Some(account) = accounts.first().copied() else {
            info!("wallet disconnected");
            self.disconnect();
            return;
        };
        if self.session.connected().map(|s| s.account) == Some(account) {
            self.refresh().await;
            return;
        }
        info!(account = %account, "wallet account switched");
        self.session.mark_stale();
        let _ = self.establish(account).await;
    }

    pub fn disconnect(&mut self) {
        self.session.mark_stale();
        self.apply(Observation::SessionEnded);
    }

    /// Called when a transient notice times out: re-evaluate instead of clearing.
    pub async fn expire_notice(&mut self) {
        if self.session.is_connected() {
            self.refresh().await;
        } else {
            self.apply(Observation::SessionEnded);
        }
    }

    /// Approve-if-needed then buy, each awaited to finality. Always ends with
    /// a refresh so the view never stays in `Processing`.
    pub async fn purchase(&mut self) -> Result<PurchaseReceipt, FlowError> {
        let session = match self.session.connected() {
            Some(session) if self.phase.can_purchase() => session,
            _ => {
                warn!(phase = %self.phase, "purchase requested while not ready");
                return Err(FlowError::ActionDisabled {
                    phase: self.phase.to_string(),
                });
            }
        };

        self.apply(Observation::PurchaseStarted);
        let result = self.run_purchase(session.account).await;

        let outcome = match &result {
            Ok(receipt) => {
                info!(
                    account = %session.account,
                    tx_hash = %receipt.purchase.tx_hash,
                    approved = receipt.approval.is_some(),
                    "ticket purchased"
                );
                self.show(StatusLine::info(PURCHASE_SUCCESS));
                self.surface.notify(PURCHASE_CONGRATS);
                StatusLine::info(PURCHASE_SUCCESS)
            }
            Err(err) => {
                warn!(account = %session.account, error = %err, "ticket purchase failed");
                let message = err.to_string();
                self.show(StatusLine::error(message.clone()));
                self.surface.notify(&message);
                StatusLine::error(message)
            }
        };

        self.refresh().await;
        if matches!(self.phase, Phase::Ready { .. } | Phase::Closed { .. }) {
            self.show(outcome);
        }
        result
    }

    async fn run_purchase(&mut self, account: Address) -> Result<PurchaseReceipt, FlowError> {
        let lottery = self.gateway.lottery_address();

        self.show(StatusLine::info("Checking token approval..."));
        let price = self.gateway.ticket_price().await?;
        let allowance = self.gateway.allowance(account, lottery).await?;
        debug!(%price, %allowance, "allowance checked");

        let approval = if allowance < price {
            self.show(StatusLine::info("Requesting token approval..."));
            let tx_hash = self.gateway.approve(account, lottery, price).await?;
            let finality = self.gateway.wait_for_finality(tx_hash).await?;
            self.show(StatusLine::info("Approval successful! Buying ticket..."));
            Some(finality)
        } else {
            self.show(StatusLine::info("Approval found. Buying ticket..."));
            None
        };

        let tx_hash = self
            .gateway
            .buy_ticket(account, self.options.buy_gas_limit)
            .await?;
        let purchase = self.gateway.wait_for_finality(tx_hash).await?;

        Ok(PurchaseReceipt {
            price,
            approval,
            purchase,
        })
    }

    async fn establish(&mut self, account: Address) -> Result<Session, FlowError> {
        let chain_id = match self.gateway.chain_id().await {
            Ok(chain_id) => chain_id,
            Err(err) => return Err(self.connect_failed(err)),
        };
        let session = Session { account, chain_id };
        self.session.connect(session);
        info!(account = %account, %chain_id, "wallet connected");
        self.show(StatusLine::info(format!(
            "Connected to {}",
            short_address(&account)
        )));
        self.sync_lottery_view().await;
        Ok(session)
    }

    async fn sync_lottery_view(&mut self) {
        let Some(session) = self.session.connected() else {
            self.apply(Observation::SessionEnded);
            return;
        };
        if let Err(FlowError::WrongNetwork { expected, actual }) = self.verify_network(&session) {
            warn!(%expected, %actual, "wallet is on the wrong network");
            self.apply(Observation::NetworkMismatch { expected, actual });
            return;
        }

        let observation = match self.gateway.lottery_status().await {
            Ok(status) if status.is_open() => match self.gateway.ticket_price().await {
                Ok(price) => Observation::LotteryOpen { price },
                Err(err) => Observation::ReadFailed(err.to_string()),
            },
            Ok(status) => Observation::LotteryClosed { status },
            Err(err) => Observation::ReadFailed(err.to_string()),
        };
        if let Observation::ReadFailed(message) = &observation {
            warn!(%message, "lottery state unavailable");
        }
        self.apply(observation);
    }

    fn verify_network(&self, session: &Session) -> Result<(), FlowError> {
        if session.chain_id == self.options.required_chain {
            Ok(())
        } else {
            Err(FlowError::WrongNetwork {
                expected: self.options.required_chain,
                actual: session.chain_id,
            })
        }
    }

    fn connect_failed(&mut self, err: FlowError) -> FlowError {
        warn!(error = %err, "wallet connection failed");
        match err {
            FlowError::ProviderUnavailable => self.apply(Observation::ProviderMissing),
            _ => {
                // A stale or missing session must not keep offering the purchase.
                if !self.session.is_connected() {
                    self.apply(Observation::SessionEnded);
                }
                self.show(StatusLine::error(CONNECT_FAILED));
            }
        }
        err
    }

    fn apply(&mut self, observation: Observation) {
        let previous = std::mem::replace(&mut self.phase, Phase::Disconnected);
        self.phase = previous.transition(observation);
        debug!(phase = %self.phase, "phase updated");
        self.render();
    }

    fn render(&mut self) {
        let labels = &self.options.labels;
        let action = self.phase.action_view(labels);
        let status = self.phase.status_line(labels);
        self.surface.render_action(&action);
        self.surface.render_status(&status);
    }

    fn show(&mut self, status: StatusLine) {
        self.surface.render_status(&status);
    }
}

#[cfg(test)]
#[path = "tests/controller_tests.rs"]
mod tests;
