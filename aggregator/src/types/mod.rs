pub use providers::{Address, Chain, RpcError, WalletAddress, U256};

mod units;

pub use units::format_units;

use thiserror::Error;

/// Why a single wallet has no value. Never fails the surrounding batch.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ItemError {
    #[error("Invalid wallet address `{0}`")]
    InvalidAddress(String),
    #[error("Balance read failed: {0}")]
    CallFailed(String),
    #[error("Unreadable balance response: {0}")]
    Decode(String),
}

impl From<RpcError> for ItemError {
    fn from(e: RpcError) -> Self {
        match e {
            RpcError::InvalidAddress(address) => ItemError::InvalidAddress(address),
            RpcError::Decode(msg) => ItemError::Decode(msg),
            other => ItemError::CallFailed(other.to_string()),
        }
    }
}

/// Splits an RPC outcome into "retry the batch" (outer error) and "this
/// wallet has no value" (inner error).
pub fn absorb<T>(result: Result<T, RpcError>) -> Result<Result<T, ItemError>, RpcError> {
    match result {
        Ok(value) => Ok(Ok(value)),
        Err(e) if e.is_transient() => Err(e),
        Err(e) => Ok(Err(e.into())),
    }
}

/// Outcome for one wallet, paired with the wallet so callers never have to
/// line results up by index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalletResult<T> {
    pub wallet: WalletAddress,
    pub result: Result<T, ItemError>,
}

impl<T> WalletResult<T> {
    pub fn value(&self) -> Option<&T> {
        self.result.as_ref().ok()
    }

    pub fn error(&self) -> Option<&ItemError> {
        self.result.as_ref().err()
    }
}

/// One row of a detailed breakdown, e.g. a single stake or lock position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailRecord {
    pub label: String,
    pub amount: U256,
    /// Unix timestamp the position unlocks at, if it is locked at all.
    pub unlocks_at: Option<u64>,
}

impl DetailRecord {
    pub fn balance(amount: U256) -> Self {
        Self {
            label: "balance".into(),
            amount,
            unlocks_at: None,
        }
    }
}
