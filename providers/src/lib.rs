pub mod chain;
pub mod error;
pub mod evm;
pub mod solana;
pub mod tezos;

use serde::{Deserialize, Serialize};
use std::fmt;

pub use chain::{Chain, ChainFamily, ChainSpec};
pub use error::{ConnectionError, RpcError};
pub use web3::types::{Address, U256};

/// An account identifier on some chain family.
///
/// Kept as the raw string the caller handed in: every chain validates its
/// own address format at the point of use, and an address that fails that
/// check becomes a per-wallet error instead of aborting the whole query.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct WalletAddress(String);

impl WalletAddress {
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for WalletAddress {
    fn from(address: &str) -> Self {
        Self::new(address)
    }
}

impl From<String> for WalletAddress {
    fn from(address: String) -> Self {
        Self(address)
    }
}

impl AsRef<str> for WalletAddress {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WalletAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
