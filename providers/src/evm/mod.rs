pub mod abi;
pub mod adapter;
pub mod connection;

pub use adapter::{BalanceCall, CallAdapter};
pub use connection::EvmConnection;

use crate::{Chain, RpcError};
use async_trait::async_trait;
use serde::{de::Error, Deserialize, Deserializer};
use std::str::FromStr;
use web3::types::{Address, U256};

/// Raw read access to an EVM node.
///
/// The real implementation is [`EvmConnection`]; tests plug in in-memory
/// nodes.
#[async_trait]
pub trait EvmRpc: Send + Sync {
    fn chain(&self) -> Chain;

    async fn code(&self, address: Address) -> Result<Vec<u8>, RpcError>;

    async fn call(&self, to: Address, data: Vec<u8>) -> Result<Vec<u8>, RpcError>;

    async fn native_balance(&self, address: Address) -> Result<U256, RpcError>;
}

/// Parses a `0x`-prefixed hex account address.
pub fn parse_address(raw: &str) -> Result<Address, RpcError> {
    let invalid = || RpcError::InvalidAddress(raw.to_string());

    let hex = raw
        .strip_prefix("0x")
        .or_else(|| raw.strip_prefix("0X"))
        .ok_or_else(invalid)?;

    if hex.len() != 40 {
        return Err(invalid());
    }

    Address::from_str(hex).map_err(|_| invalid())
}

pub fn u256_from_str<'de, D>(deserializer: D) -> Result<U256, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;

    U256::from_dec_str(&s).map_err(D::Error::custom)
}

#[macro_export]
macro_rules! address {
    ($addr:expr) => {{
        use std::str::FromStr;
        $crate::Address::from_str($addr).expect(&format!("Invalid address {}", $addr))
    }};
}
