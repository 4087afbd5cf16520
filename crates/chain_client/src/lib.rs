use alloy_primitives::{Address, U256};
use async_trait::async_trait;
use shared::{
    domain::{ChainId, Finality, LotteryStatus, TxHash},
    error::FlowError,
};

pub mod abi;
mod gateway;
pub mod transport;

pub use gateway::{GatewayOptions, RpcGateway};
pub use transport::{RpcTransport, TransportError};

/// Everything the purchase flow needs from the wallet agent and the chain.
///
/// Reads fail with [`FlowError::ContractRead`], writes with
/// [`FlowError::UserRejected`] or [`FlowError::TransactionFailed`], and any
/// call fails with [`FlowError::ProviderUnavailable`] when no wallet agent
/// answers.
#[async_trait]
pub trait ChainGateway: Send + Sync {
    /// Prompts the agent for account access.
    async fn request_accounts(&self) -> Result<Vec<Address>, FlowError>;
    /// Accounts already exposed, without prompting.
    async fn accounts(&self) -> Result<Vec<Address>, FlowError>;
    async fn chain_id(&self) -> Result<ChainId, FlowError>;

    async fn lottery_status(&self) -> Result<LotteryStatus, FlowError>;
    async fn ticket_price(&self) -> Result<U256, FlowError>;
    async fn allowance(&self, owner: Address, spender: Address) -> Result<U256, FlowError>;

    async fn approve(
        &self,
        owner: Address,
        spender: Address,
        amount: U256,
    ) -> Result<TxHash, FlowError>;
    async fn buy_ticket(&self, buyer: Address, gas_limit: u64) -> Result<TxHash, FlowError>;
    /// Blocks until the transaction has one confirmation. A reverted
    /// transaction is reported as [`FlowError::TransactionFailed`].
    async fn wait_for_finality(&self, tx_hash: TxHash) -> Result<Finality, FlowError>;

    /// Spender the token approval is granted to.
    fn lottery_address(&self) -> Address;
}

/// Gateway used when no wallet agent is configured.
pub struct MissingWallet {
    lottery: Address,
}

impl MissingWallet {
    pub fn new(lottery: Address) -> Self {
        Self { lottery }
    }
}

#[async_trait]
impl ChainGateway for MissingWallet {
    async fn request_accounts(&self) -> Result<Vec<Address>, FlowError> {
        Err(FlowError::ProviderUnavailable)
    }

    async fn accounts(&self) -> Result<Vec<Address>, FlowError> {
        Err(FlowError::ProviderUnavailable)
    }

    async fn chain_id(&self) -> Result<ChainId, FlowError> {
        Err(FlowError::ProviderUnavailable)
    }

    async fn lottery_status(&self) -> Result<LotteryStatus, FlowError> {
        Err(FlowError::ProviderUnavailable)
    }

    async fn ticket_price(&self) -> Result<U256, FlowError> {
        Err(FlowError::ProviderUnavailable)
    }

    async fn allowance(&self, _owner: Address, _spender: Address) -> Result<U256, FlowError> {
        Err(FlowError::ProviderUnavailable)
    }

    async fn approve(
        &self,
        _owner: Address,
        _spender: Address,
        _amount: U256,
    ) -> Result<TxHash, FlowError> {
        Err(FlowError::ProviderUnavailable)
    }

    async fn buy_ticket(&self, _buyer: Address, _gas_limit: u64) -> Result<TxHash, FlowError> {
        Err(FlowError::ProviderUnavailable)
    }

    async fn wait_for_finality(&self, _tx_hash: TxHash) -> Result<Finality, FlowError> {
        Err(FlowError::ProviderUnavailable)
    }

    fn lottery_address(&self) -> Address {
        self.lottery
    }
}

#[async_trait]
impl<T: ChainGateway + ?Sized> ChainGateway for Box<T> {
    async fn request_accounts(&self) -> Result<Vec<Address>, FlowError> {
        (**self).request_accounts().await
    }

    async fn accounts(&self) -> Result<Vec<Address>, FlowError> {
        (**self).accounts().await
    }

    async fn chain_id(&self) -> Result<ChainId, FlowError> {
        (**self).chain_id().await
    }

    async fn lottery_status(&self) -> Result<LotteryStatus, FlowError> {
        (**self).lottery_status().await
    }

    async fn ticket_price(&self) -> Result<U256, FlowError> {
        (**self).ticket_price().await
    }

    async fn allowance(&self, owner: Address, spender: Address) -> Result<U256, FlowError> {
        (**self).allowance(owner, spender).await
    }

    async fn approve(
        &self,
        owner: Address,
        spender: Address,
        amount: U256,
    ) -> Result<TxHash, FlowError> {
        (**self).approve(owner, spender, amount).await
    }

    async fn buy_ticket(&self, buyer: Address, gas_limit: u64) -> Result<TxHash, FlowError> {
        (**self).buy_ticket(buyer, gas_limit).await
    }

    async fn wait_for_finality(&self, tx_hash: TxHash) -> Result<Finality, FlowError> {
        (**self).wait_for_finality(tx_hash).await
    }

    fn lottery_address(&self) -> Address {
        (**self).lottery_address()
    }
}
