use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use vault_aggregator::types::{format_units, Chain, DetailRecord, WalletAddress, WalletResult, U256};

#[derive(Deserialize, Debug)]
pub struct BalancesRequest {
    pub token: String,
    pub chain: Chain,
    pub wallets: Vec<WalletAddress>,
}

#[skip_serializing_none]
#[derive(Serialize, Debug, PartialEq, Eq)]
pub struct Balance {
    pub wallet: WalletAddress,
    pub explorer: String,
    /// Smallest-unit amount as a decimal string.
    pub value: Option<String>,
    pub formatted: Option<String>,
    pub error: Option<String>,
}

impl Balance {
    pub fn new(balance: WalletResult<U256>, chain: Chain, decimals: u8) -> Self {
        let explorer = chain.explorer_address_url(balance.wallet.as_str());

        match balance.result {
            Ok(value) => Self {
                wallet: balance.wallet,
                explorer,
                value: Some(value.to_string()),
                formatted: Some(format_units(value, decimals)),
                error: None,
            },
            Err(e) => Self {
                wallet: balance.wallet,
                explorer,
                value: None,
                formatted: None,
                error: Some(e.to_string()),
            },
        }
    }
}

#[skip_serializing_none]
#[derive(Serialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Detail {
    pub wallet: WalletAddress,
    pub label: Option<String>,
    pub value: Option<String>,
    pub formatted: Option<String>,
    pub unlocks_at: Option<u64>,
    pub error: Option<String>,
}

impl Detail {
    pub fn new(detail: WalletResult<DetailRecord>, decimals: u8) -> Self {
        match detail.result {
            Ok(record) => Self {
                wallet: detail.wallet,
                label: Some(record.label),
                value: Some(record.amount.to_string()),
                formatted: Some(format_units(record.amount, decimals)),
                unlocks_at: record.unlocks_at,
                error: None,
            },
            Err(e) => Self {
                wallet: detail.wallet,
                label: None,
                value: None,
                formatted: None,
                unlocks_at: None,
                error: Some(e.to_string()),
            },
        }
    }
}

#[derive(Serialize, Debug)]
pub struct ErrorBody {
    pub error: String,
}
