//! Solana balance lookups over plain JSON-RPC.

use crate::{Chain, ConnectionError, RpcError, WalletAddress};
use reqwest::StatusCode;
use serde::{de::DeserializeOwned, Deserialize};
use serde_aux::prelude::deserialize_number_from_string;
use serde_json::{json, Value};
use std::time::Duration;

#[derive(Deserialize, Debug)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

#[derive(Deserialize, Debug)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcErrorObject>,
}

impl<T> RpcResponse<T> {
    fn into_result(self) -> Result<T, RpcError> {
        match (self.result, self.error) {
            (_, Some(error)) => Err(RpcError::Rpc {
                code: error.code,
                message: error.message,
            }),
            (Some(result), None) => Ok(result),
            (None, None) => Err(RpcError::Decode("response without result".into())),
        }
    }
}

#[derive(Deserialize, Debug)]
struct WithContext<T> {
    value: T,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct TokenAmount {
    #[serde(deserialize_with = "deserialize_number_from_string")]
    amount: u64,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct TokenAccountInfo {
    token_amount: TokenAmount,
}

#[derive(Deserialize, Debug)]
struct ParsedAccount {
    info: TokenAccountInfo,
}

#[derive(Deserialize, Debug)]
struct AccountData {
    parsed: ParsedAccount,
}

#[derive(Deserialize, Debug)]
struct Account {
    data: AccountData,
}

#[derive(Deserialize, Debug)]
struct KeyedAccount {
    account: Account,
}

/// Validates a base58 encoded 32 byte public key.
pub fn parse_pubkey(raw: &str) -> Result<[u8; 32], RpcError> {
    let invalid = || RpcError::InvalidAddress(raw.to_string());

    bs58::decode(raw)
        .into_vec()
        .map_err(|_| invalid())?
        .try_into()
        .map_err(|_| invalid())
}

fn sum_token_accounts(accounts: &[KeyedAccount]) -> Result<u64, RpcError> {
    accounts.iter().try_fold(0u64, |total, keyed| {
        total
            .checked_add(keyed.account.data.parsed.info.token_amount.amount)
            .ok_or_else(|| RpcError::Decode("token amount overflow".into()))
    })
}

pub struct SolanaConnection {
    rpc_url: String,
    client: reqwest::Client,
}

impl std::fmt::Debug for SolanaConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SolanaConnection")
            .field("rpc_url", &self.rpc_url)
            .finish()
    }
}

impl SolanaConnection {
    pub async fn connect(rpc_url: &str, timeout: Duration) -> Result<Self, ConnectionError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ConnectionError::InvalidUrl {
                chain: Chain::Solana,
                url: rpc_url.to_string(),
                reason: e.to_string(),
            })?;

        let connection = Self {
            rpc_url: rpc_url.to_string(),
            client,
        };

        let health: String = connection
            .request("getHealth", json!([]))
            .await
            .map_err(|source| ConnectionError::Unreachable {
                chain: Chain::Solana,
                url: rpc_url.to_string(),
                source,
            })?;

        log::info!("Connected to {} at {rpc_url} ({health})", Chain::Solana);

        Ok(connection)
    }

    async fn request<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T, RpcError> {
        let res = self
            .client
            .post(&self.rpc_url)
            .json(&json!({
                "jsonrpc": "2.0",
                "id": 1,
                "method": method,
                "params": params,
            }))
            .send()
            .await?;

        let status = res.status();

        match status {
            StatusCode::OK => res.json::<RpcResponse<T>>().await?.into_result(),
            _ => Err(RpcError::Http(status.as_u16())),
        }
    }

    /// Native SOL balance in lamports.
    pub async fn native_balance(&self, wallet: &WalletAddress) -> Result<u64, RpcError> {
        parse_pubkey(wallet.as_str())?;

        let balance: WithContext<u64> = self.request("getBalance", json!([wallet.as_str()])).await?;

        Ok(balance.value)
    }

    /// Raw SPL token amount of `mint` held by `owner`, summed over all of
    /// the owner's token accounts for that mint.
    pub async fn token_balance(&self, owner: &WalletAddress, mint: &str) -> Result<u64, RpcError> {
        parse_pubkey(owner.as_str())?;

        let accounts: WithContext<Vec<KeyedAccount>> = self
            .request(
                "getTokenAccountsByOwner",
                json!([
                    owner.as_str(),
                    { "mint": mint },
                    { "encoding": "jsonParsed" }
                ]),
            )
            .await?;

        sum_token_accounts(&accounts.value)
    }
}
