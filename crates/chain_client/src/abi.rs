//! Call encoding for the lottery and token contracts, plus the few return
//! shapes the client decodes.

use alloy_primitives::{Address, Bytes, U256};
use alloy_sol_types::{sol, Panic, Revert, SolCall, SolError};
use shared::domain::LotteryStatus;
use thiserror::Error;

sol! {
    interface IJackpotLottery {
        function buyTicket() external;
        function lotteryStatus() external view returns (uint8);
        function TICKET_PRICE() external view returns (uint256);
    }

    interface IERC20 {
        function approve(address spender, uint256 amount) external returns (bool);
        function allowance(address owner, address spender) external view returns (uint256);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AbiError {
    #[error("empty return data; is the contract deployed on this network?")]
    EmptyReturn,
    #[error("undecodable return data: {0}")]
    Decode(String),
    #[error("unknown lottery status value {0}")]
    UnknownStatus(u8),
}

pub fn lottery_status_call() -> Bytes {
    IJackpotLottery::lotteryStatusCall {}.abi_encode().into()
}

pub fn ticket_price_call() -> Bytes {
    IJackpotLottery::TICKET_PRICECall {}.abi_encode().into()
}

pub fn buy_ticket_call() -> Bytes {
    IJackpotLottery::buyTicketCall {}.abi_encode().into()
}

pub fn allowance_call(owner: Address, spender: Address) -> Bytes {
    IERC20::allowanceCall { owner, spender }.abi_encode().into()
}

pub fn approve_call(spender: Address, amount: U256) -> Bytes {
    IERC20::approveCall { spender, amount }.abi_encode().into()
}

fn decode_returns<C: SolCall>(data: &[u8]) -> Result<C::Return, AbiError> {
    if data.is_empty() {
        return Err(AbiError::EmptyReturn);
    }
    C::abi_decode_returns(data, true).map_err(|err| AbiError::Decode(err.to_string()))
}

pub fn decode_status(data: &[u8]) -> Result<LotteryStatus, AbiError> {
    let raw = decode_returns::<IJackpotLottery::lotteryStatusCall>(data)?._0;
    LotteryStatus::try_from(raw).map_err(AbiError::UnknownStatus)
}

pub fn decode_ticket_price(data: &[u8]) -> Result<U256, AbiError> {
    Ok(decode_returns::<IJackpotLottery::TICKET_PRICECall>(data)?._0)
}

pub fn decode_allowance(data: &[u8]) -> Result<U256, AbiError> {
    Ok(decode_returns::<IERC20::allowanceCall>(data)?._0)
}

/// Human-readable reason from `Error(string)` or `Panic(uint256)` revert data.
pub fn decode_revert_reason(data: &[u8]) -> Option<String> {
    if let Ok(revert) = Revert::abi_decode(data, true) {
        let reason = revert.reason.trim();
        return (!reason.is_empty()).then(|| reason.to_string());
    }
    Panic::abi_decode(data, true)
        .ok()
        .map(|panic| format!("panic code 0x{:x}", panic.code))
}

/// Nodes often flatten the reason into the message: `execution reverted: <reason>`.
pub fn revert_reason_from_message(message: &str) -> Option<String> {
    let (_, reason) = message.split_once("execution reverted:")?;
    let reason = reason.trim();
    (!reason.is_empty()).then(|| reason.to_string())
}
