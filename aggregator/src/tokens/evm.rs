use super::{BalanceSource, TokenKind};
use crate::types::{absorb, Address, DetailRecord, ItemError, RpcError, WalletAddress, U256};
use async_trait::async_trait;
use providers::evm::{abi, parse_address, BalanceCall, CallAdapter};
use std::sync::Arc;

/// Every EVM token kind, read through a shared [`CallAdapter`].
pub struct EvmSource {
    adapter: Arc<CallAdapter>,
    call: BalanceCall,
    stakes: Option<(Address, String)>,
}

impl EvmSource {
    /// `None` if `kind` is not an EVM token.
    pub fn new(adapter: Arc<CallAdapter>, kind: &TokenKind) -> Option<Self> {
        let call = match kind {
            TokenKind::Native => BalanceCall::Native,
            TokenKind::Erc20 { address } => BalanceCall::Erc20 { token: *address },
            TokenKind::Erc721 { address } => BalanceCall::Erc721 { token: *address },
            TokenKind::Erc1155 { address, id } => BalanceCall::Erc1155 {
                token: *address,
                id: *id,
            },
            TokenKind::Staked {
                contract,
                balance_method,
                ..
            } => BalanceCall::Method {
                contract: *contract,
                method: balance_method.clone(),
            },
            TokenKind::SplToken { .. } | TokenKind::TezosLedger { .. } => return None,
        };

        let stakes = match kind {
            TokenKind::Staked {
                contract,
                stakes_method: Some(method),
                ..
            } => Some((*contract, method.clone())),
            _ => None,
        };

        Some(Self {
            adapter,
            call,
            stakes,
        })
    }

    async fn stakes(
        &self,
        contract: Address,
        method: &str,
        wallet: &WalletAddress,
    ) -> Result<Vec<DetailRecord>, RpcError> {
        let owner = parse_address(wallet.as_str())?;
        let raw = self
            .adapter
            .read_raw(contract, abi::address_method(method, owner))
            .await?;

        Ok(abi::decode_stakes(&raw)?
            .into_iter()
            .enumerate()
            .map(|(idx, (amount, unlock))| DetailRecord {
                label: format!("stake #{}", idx + 1),
                amount,
                unlocks_at: (!unlock.is_zero()).then(|| unlock.low_u64()),
            })
            .collect())
    }
}

#[async_trait]
impl BalanceSource for EvmSource {
    async fn balance(&self, wallet: &WalletAddress) -> Result<U256, RpcError> {
        self.adapter
            .read_balances(&self.call, std::slice::from_ref(wallet))
            .await?
            .pop()
            .unwrap_or_else(|| Err(RpcError::Decode("empty balance read".into())))
    }

    async fn balances(
        &self,
        wallets: &[WalletAddress],
    ) -> Result<Vec<Result<U256, ItemError>>, RpcError> {
        self.adapter
            .read_balances(&self.call, wallets)
            .await?
            .into_iter()
            .map(absorb)
            .collect()
    }

    async fn details(&self, wallet: &WalletAddress) -> Result<Vec<DetailRecord>, RpcError> {
        match &self.stakes {
            Some((contract, method)) => self.stakes(*contract, method, wallet).await,
            None => Ok(vec![DetailRecord::balance(self.balance(wallet).await?)]),
        }
    }
}
