//! Balance reads for many wallets at once.
//!
//! When the chain has a Multicall3 deployment every wallet's read goes out
//! in one `tryAggregate` round-trip, otherwise each wallet is read on its
//! own. Both paths yield the same shape: one entry per wallet, in order.

use crate::{
    evm::{abi, parse_address, EvmRpc},
    RpcError, WalletAddress,
};
use futures::future::join_all;
use std::sync::Arc;
use tokio::sync::OnceCell;
use web3::types::{Address, U256};

/// What "balance" means for a token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BalanceCall {
    Native,
    Erc20 { token: Address },
    /// NFTs counted as a balance: `balanceOf(owner)` on the collection.
    Erc721 { token: Address },
    Erc1155 { token: Address, id: U256 },
    /// A `method(address) returns (uint256)` view, e.g. staked amounts.
    Method { contract: Address, method: String },
}

impl BalanceCall {
    /// Target and calldata when read directly; `None` for native coin,
    /// which goes through `eth_getBalance` instead.
    fn direct(&self, owner: Address) -> Option<(Address, Vec<u8>)> {
        match self {
            BalanceCall::Native => None,
            BalanceCall::Erc20 { token } | BalanceCall::Erc721 { token } => {
                Some((*token, abi::balance_of(owner)))
            }
            BalanceCall::Erc1155 { token, id } => Some((*token, abi::balance_of_id(owner, *id))),
            BalanceCall::Method { contract, method } => {
                Some((*contract, abi::address_method(method, owner)))
            }
        }
    }

    fn via_multicall(&self, owner: Address, multicall: Address) -> (Address, Vec<u8>) {
        self.direct(owner)
            .unwrap_or_else(|| (multicall, abi::get_eth_balance(owner)))
    }
}

pub struct CallAdapter {
    rpc: Arc<dyn EvmRpc>,
    fallback_concurrency: usize,
    multicall: OnceCell<Option<Address>>,
}

impl CallAdapter {
    pub fn new(rpc: Arc<dyn EvmRpc>) -> Self {
        Self {
            rpc,
            fallback_concurrency: 1,
            multicall: OnceCell::new(),
        }
    }

    /// How many per-wallet reads may be in flight on the fallback path.
    /// Defaults to one, i.e. strictly sequential.
    pub fn with_fallback_concurrency(mut self, concurrency: usize) -> Self {
        self.fallback_concurrency = concurrency.max(1);
        self
    }

    /// The multicall contract to use, if the chain has one with code.
    ///
    /// Checked once per adapter. A failed check is not remembered, so a
    /// throttled `eth_getCode` is retried on the next read.
    pub async fn multicall_address(&self) -> Result<Option<Address>, RpcError> {
        let address = self
            .multicall
            .get_or_try_init(|| async {
                let chain = self.rpc.chain();

                let Some(address) = chain.spec().multicall else {
                    return Ok::<_, RpcError>(None);
                };

                if self.rpc.code(address).await?.is_empty() {
                    log::info!("No multicall bytecode at {address:#x} on {chain}, reading per wallet");
                    Ok(None)
                } else {
                    Ok(Some(address))
                }
            })
            .await?;

        Ok(*address)
    }

    /// A single `eth_call`, for reads that do not fit the balance shape.
    pub async fn read_raw(&self, to: Address, data: Vec<u8>) -> Result<Vec<u8>, RpcError> {
        self.rpc.call(to, data).await
    }

    /// Reads `call` for every wallet.
    ///
    /// The outer error is a failure of the read as a whole (throttling,
    /// timeouts) and is worth retrying. Inner errors belong to a single
    /// wallet: a malformed address, a reverted call, an unreadable answer.
    pub async fn read_balances(
        &self,
        call: &BalanceCall,
        wallets: &[WalletAddress],
    ) -> Result<Vec<Result<U256, RpcError>>, RpcError> {
        let owners: Vec<Result<Address, RpcError>> = wallets
            .iter()
            .map(|wallet| parse_address(wallet.as_str()))
            .collect();

        if let Some(multicall) = self.multicall_address().await? {
            match self.read_aggregated(call, multicall, &owners).await {
                Ok(balances) => return Ok(balances),
                Err(e) if e.is_transient() => return Err(e),
                Err(e) => log::warn!(
                    "Multicall read failed on {}: {e}, falling back to per-wallet reads",
                    self.rpc.chain()
                ),
            }
        }

        self.read_each(call, &owners).await
    }

    async fn read_aggregated(
        &self,
        call: &BalanceCall,
        multicall: Address,
        owners: &[Result<Address, RpcError>],
    ) -> Result<Vec<Result<U256, RpcError>>, RpcError> {
        let mut calls = Vec::with_capacity(owners.len());
        let slots: Vec<Result<usize, RpcError>> = owners
            .iter()
            .map(|owner| {
                owner.clone().map(|owner| {
                    calls.push(call.via_multicall(owner, multicall));
                    calls.len() - 1
                })
            })
            .collect();

        if calls.is_empty() {
            return Ok(slots.into_iter().map(|slot| slot.map(|_| U256::zero())).collect());
        }

        let raw = self.rpc.call(multicall, abi::try_aggregate(&calls)).await?;
        let returned = abi::decode_try_aggregate(&raw)?;

        if returned.len() != calls.len() {
            return Err(RpcError::Decode(format!(
                "multicall answered {} of {} calls",
                returned.len(),
                calls.len()
            )));
        }

        Ok(slots
            .into_iter()
            .map(|slot| {
                slot.and_then(|idx| match &returned[idx] {
                    (true, data) => abi::decode_uint(data),
                    (false, _) => Err(RpcError::Reverted(format!(
                        "balance read for {:#x} failed inside multicall",
                        calls[idx].0
                    ))),
                })
            })
            .collect())
    }

    /// Reads wallets `fallback_concurrency` at a time, in order. Stops at the
    /// first transient failure so the caller can back off right away.
    async fn read_each(
        &self,
        call: &BalanceCall,
        owners: &[Result<Address, RpcError>],
    ) -> Result<Vec<Result<U256, RpcError>>, RpcError> {
        let mut balances = Vec::with_capacity(owners.len());

        for chunk in owners.chunks(self.fallback_concurrency) {
            let reads = join_all(chunk.iter().map(|owner| self.read_owner(call, owner))).await;

            for read in reads {
                match read {
                    Err(e) if e.is_transient() => return Err(e),
                    Err(e) => {
                        log::debug!("Balance read failed on {}: {e}", self.rpc.chain());
                        balances.push(Err(e));
                    }
                    Ok(balance) => balances.push(Ok(balance)),
                }
            }
        }

        Ok(balances)
    }

    async fn read_owner(
        &self,
        call: &BalanceCall,
        owner: &Result<Address, RpcError>,
    ) -> Result<U256, RpcError> {
        match owner {
            Ok(owner) => self.read_one(call, *owner).await,
            Err(e) => Err(e.clone()),
        }
    }

    async fn read_one(&self, call: &BalanceCall, owner: Address) -> Result<U256, RpcError> {
        match call.direct(owner) {
            Some((to, data)) => abi::decode_uint(&self.rpc.call(to, data).await?),
            None => self.rpc.native_balance(owner).await,
        }
    }
}
