use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::ChainId;

pub const GENERIC_TRANSACTION_FAILURE: &str = "Transaction failed. Check logs for details.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    ProviderUnavailable,
    UserRejected,
    WrongNetwork,
    ContractRead,
    TransactionFailed,
    ActionDisabled,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FlowError {
    #[error("no wallet agent is available")]
    ProviderUnavailable,
    #[error("request rejected in wallet")]
    UserRejected,
    #[error("wrong network: expected chain {expected}, connected to chain {actual}")]
    WrongNetwork { expected: ChainId, actual: ChainId },
    #[error("contract read failed: {0}")]
    ContractRead(String),
    #[error("{}", transaction_failure_message(.reason.as_deref()))]
    TransactionFailed { reason: Option<String> },
    #[error("purchase is not available while {phase}")]
    ActionDisabled { phase: String },
}

impl FlowError {
    pub fn transaction(reason: impl Into<String>) -> Self {
        Self::TransactionFailed {
            reason: Some(reason.into()),
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            FlowError::ProviderUnavailable => ErrorCode::ProviderUnavailable,
            FlowError::UserRejected => ErrorCode::UserRejected,
            FlowError::WrongNetwork { .. } => ErrorCode::WrongNetwork,
            FlowError::ContractRead(_) => ErrorCode::ContractRead,
            FlowError::TransactionFailed { .. } => ErrorCode::TransactionFailed,
            FlowError::ActionDisabled { .. } => ErrorCode::ActionDisabled,
        }
    }

    /// Everything except a missing wallet agent can be retried in the same session.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, FlowError::ProviderUnavailable)
    }
}

fn transaction_failure_message(reason: Option<&str>) -> String {
    match reason {
        Some(reason) if !reason.trim().is_empty() => format!("Transaction failed: {reason}"),
        _ => GENERIC_TRANSACTION_FAILURE.to_string(),
    }
}
