use std::{collections::HashMap, time::Duration};

use alloy_primitives::{Address, Bytes, B256, U256, U64};
use async_trait::async_trait;
use shared::{
    domain::{ChainId, Deployment, Finality, LotteryStatus, TxHash},
    error::FlowError,
    protocol::{TransactionReceipt, TransactionRequest, UNAUTHORIZED_CODE},
};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use url::Url;

use crate::{
    abi::{self, decode_revert_reason, revert_reason_from_message},
    transport::{RpcTransport, TransportError},
    ChainGateway,
};

const DEFAULT_RECEIPT_POLL_INTERVAL: Duration = Duration::from_millis(1500);
const NO_PARAMS: [u8; 0] = [];

#[derive(Debug, Clone)]
pub struct GatewayOptions {
    pub receipt_poll_interval: Duration,
}

impl Default for GatewayOptions {
    fn default() -> Self {
        Self {
            receipt_poll_interval: DEFAULT_RECEIPT_POLL_INTERVAL,
        }
    }
}

/// [`ChainGateway`] over JSON-RPC. Account and signing requests go to the
/// wallet agent; reads go to the optional node endpoint, falling back to the
/// wallet agent when none is configured.
pub struct RpcGateway {
    wallet: RpcTransport,
    node: Option<RpcTransport>,
    deployment: Deployment,
    options: GatewayOptions,
    submitted: Mutex<HashMap<TxHash, TransactionRequest>>,
}

impl RpcGateway {
    pub fn new(
        wallet_url: Url,
        node_url: Option<Url>,
        deployment: Deployment,
        options: GatewayOptions,
    ) -> Self {
        Self {
            wallet: RpcTransport::new(wallet_url),
            node: node_url.map(RpcTransport::new),
            deployment,
            options,
            submitted: Mutex::new(HashMap::new()),
        }
    }

    pub fn deployment(&self) -> &Deployment {
        &self.deployment
    }

    fn reader(&self) -> &RpcTransport {
        self.node.as_ref().unwrap_or(&self.wallet)
    }

    async fn read(&self, what: &str, to: Address, data: Bytes) -> Result<Bytes, FlowError> {
        self.reader()
            .request::<_, Bytes>("eth_call", (TransactionRequest::call(to, data), "latest"))
            .await
            .map_err(|err| read_error(what, err))
    }

    async fn submit(&self, what: &str, tx: TransactionRequest) -> Result<TxHash, FlowError> {
        let hash: B256 = self
            .wallet
            .request("eth_sendTransaction", [&tx])
            .await
            .map_err(|err| write_error(what, err))?;
        let tx_hash = TxHash(hash);
        info!(%tx_hash, call = what, "transaction submitted");
        self.submitted.lock().await.insert(tx_hash, tx);
        Ok(tx_hash)
    }

    /// Re-executes a reverted transaction at its block to recover the reason.
    async fn replay_revert_reason(&self, tx_hash: TxHash, block: U64) -> Option<String> {
        let tx = self.submitted.lock().await.remove(&tx_hash)?;
        match self
            .reader()
            .request::<_, Bytes>("eth_call", (tx, block))
            .await
        {
            Ok(_) => None,
            Err(err) => revert_reason(&err),
        }
    }
}

#[async_trait]
impl ChainGateway for RpcGateway {
    async fn request_accounts(&self) -> Result<Vec<Address>, FlowError> {
        self.wallet
            .request("eth_requestAccounts", NO_PARAMS)
            .await
            .map_err(wallet_error)
    }

    async fn accounts(&self) -> Result<Vec<Address>, FlowError> {
        match self.wallet.request("eth_accounts", NO_PARAMS).await {
            Ok(accounts) => Ok(accounts),
            Err(TransportError::Rpc(error)) if error.code == UNAUTHORIZED_CODE => Ok(Vec::new()),
            Err(err) => Err(wallet_error(err)),
        }
    }

    async fn chain_id(&self) -> Result<ChainId, FlowError> {
        let chain_id: U64 = self
            .wallet
            .request("eth_chainId", NO_PARAMS)
            .await
            .map_err(wallet_error)?;
        Ok(ChainId(chain_id.as_limbs()[0]))
    }

    async fn lottery_status(&self) -> Result<LotteryStatus, FlowError> {
        let data = self
            .read("lotteryStatus()", self.deployment.lottery, abi::lottery_status_call())
            .await?;
        abi::decode_status(&data)
            .map_err(|err| FlowError::ContractRead(format!("lotteryStatus(): {err}")))
    }

    async fn ticket_price(&self) -> Result<U256, FlowError> {
        let data = self
            .read("TICKET_PRICE()", self.deployment.lottery, abi::ticket_price_call())
            .await?;
        abi::decode_ticket_price(&data)
            .map_err(|err| FlowError::ContractRead(format!("TICKET_PRICE(): {err}")))
    }

    async fn allowance(&self, owner: Address, spender: Address) -> Result<U256, FlowError> {
        let data = self
            .read(
                "allowance(owner,spender)",
                self.deployment.token,
                abi::allowance_call(owner, spender),
            )
            .await?;
        abi::decode_allowance(&data)
            .map_err(|err| FlowError::ContractRead(format!("allowance(owner,spender): {err}")))
    }

    async fn approve(
        &self,
        owner: Address,
        spender: Address,
        amount: U256,
    ) -> Result<TxHash, FlowError> {
        let tx = TransactionRequest::call(self.deployment.token, abi::approve_call(spender, amount))
            .from_account(owner);
        self.submit("approve", tx).await
    }

    async fn buy_ticket(&self, buyer: Address, gas_limit: u64) -> Result<TxHash, FlowError> {
        let tx = TransactionRequest::call(self.deployment.lottery, abi::buy_ticket_call())
            .from_account(buyer)
            .gas_limit(gas_limit);
        self.submit("buyTicket", tx).await
    }

    async fn wait_for_finality(&self, tx_hash: TxHash) -> Result<Finality, FlowError> {
        loop {
            let lookup = self
                .reader()
                .request::<_, Option<TransactionReceipt>>("eth_getTransactionReceipt", [tx_hash.0])
                .await;
            let receipt = match lookup {
                Ok(receipt) => receipt,
                Err(err) => {
                    warn!(%tx_hash, error = %err, "receipt lookup failed; still waiting");
                    None
                }
            };

            let Some(receipt) = receipt else {
                debug!(%tx_hash, "no receipt yet");
                tokio::time::sleep(self.options.receipt_poll_interval).await;
                continue;
            };

            if receipt.succeeded() {
                self.submitted.lock().await.remove(&tx_hash);
                let block_number = receipt.block_number.as_limbs()[0];
                info!(%tx_hash, block_number, "transaction confirmed");
                return Ok(Finality {
                    tx_hash,
                    block_number,
                });
            }

            let reason = self
                .replay_revert_reason(tx_hash, receipt.block_number)
                .await;
            warn!(%tx_hash, reason = reason.as_deref().unwrap_or("unknown"), "transaction reverted");
            return Err(FlowError::TransactionFailed { reason });
        }
    }

    fn lottery_address(&self) -> Address {
        self.deployment.lottery
    }
}

fn wallet_error(err: TransportError) -> FlowError {
    match &err {
        TransportError::Rpc(error) if error.is_user_rejection() || error.code == UNAUTHORIZED_CODE => {
            FlowError::UserRejected
        }
        _ => {
            warn!(error = %err, "wallet agent unavailable");
            FlowError::ProviderUnavailable
        }
    }
}

fn read_error(what: &str, err: TransportError) -> FlowError {
    warn!(call = what, error = %err, "contract read failed");
    match revert_reason(&err) {
        Some(reason) => FlowError::ContractRead(format!("{what} reverted: {reason}")),
        None => FlowError::ContractRead(format!("{what}: {err}")),
    }
}

fn write_error(what: &str, err: TransportError) -> FlowError {
    if let Some(error) = err.rpc_error() {
        if error.is_user_rejection() {
            info!(call = what, "transaction rejected in wallet");
            return FlowError::UserRejected;
        }
    }
    warn!(call = what, error = %err, "transaction submission failed");

    let reason = match &err {
        TransportError::Rpc(error) => revert_reason(&err).or_else(|| {
            let message = error.message.trim();
            (!message.is_empty()).then(|| message.to_string())
        }),
        TransportError::Unreachable { .. } => Some("wallet agent unreachable".to_string()),
        TransportError::Http(_) | TransportError::Malformed { .. } => None,
    };
    FlowError::TransactionFailed { reason }
}

/// Contract-supplied reason carried by an RPC error, if any.
fn revert_reason(err: &TransportError) -> Option<String> {
    let error = err.rpc_error()?;
    error
        .revert_data()
        .and_then(|raw| raw.parse::<Bytes>().ok())
        .and_then(|data| decode_revert_reason(&data))
        .or_else(|| revert_reason_from_message(&error.message))
}

#[cfg(test)]
#[path = "tests/gateway_tests.rs"]
mod tests;
