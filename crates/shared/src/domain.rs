use std::fmt;

use alloy_primitives::{Address, B256, U256};
use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($name:ident, $inner:ty) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub $inner);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_newtype!(ChainId, u64);
id_newtype!(TxHash, B256);

/// Base Sepolia, the network the jackpot contracts are deployed on.
pub const BASE_SEPOLIA: ChainId = ChainId(84532);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LotteryStatus {
    Open,
    Closed,
    Finalized,
}

impl LotteryStatus {
    pub fn is_open(self) -> bool {
        self == LotteryStatus::Open
    }
}

impl TryFrom<u8> for LotteryStatus {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(LotteryStatus::Open),
            1 => Ok(LotteryStatus::Closed),
            2 => Ok(LotteryStatus::Finalized),
            other => Err(other),
        }
    }
}

impl fmt::Display for LotteryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LotteryStatus::Open => "open",
            LotteryStatus::Closed => "closed",
            LotteryStatus::Finalized => "finalized",
        };
        f.write_str(name)
    }
}

/// Contract addresses and token metadata the client talks to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deployment {
    pub chain_id: ChainId,
    pub network_name: String,
    pub lottery: Address,
    pub token: Address,
    pub token_symbol: String,
    pub token_decimals: u8,
}

/// A transaction that made it into a block without reverting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finality {
    pub tx_hash: TxHash,
    pub block_number: u64,
}

/// Renders a raw token amount in whole units, dropping trailing zero decimals.
pub fn format_units(amount: U256, decimals: u8) -> String {
    if decimals == 0 {
        return amount.to_string();
    }
    let base = U256::from(10u64).pow(U256::from(decimals));
    let whole = amount / base;
    let frac = amount % base;
    if frac.is_zero() {
        return whole.to_string();
    }
    let frac = format!("{:0>width$}", frac.to_string(), width = decimals as usize);
    format!("{whole}.{}", frac.trim_end_matches('0'))
}

/// `0x1234...abcd` form used in status messages.
pub fn short_address(address: &Address) -> String {
    let full = address.to_string();
    format!("{}...{}", &full[..6], &full[full.len() - 4..])
}
