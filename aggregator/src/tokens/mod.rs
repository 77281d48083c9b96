mod descriptor;
pub mod evm;
pub mod solana;
pub mod tezos;

pub use descriptor::{CatalogError, TokenCatalog, TokenDescriptor, TokenKind};

use crate::{
    batch::{BatchConfig, BatchError, BatchExecutor},
    types::{absorb, Chain, DetailRecord, ItemError, RpcError, WalletAddress, WalletResult, U256},
};
use async_trait::async_trait;
use futures::future::join_all;
use providers::ConnectionError;
use std::sync::Arc;
use thiserror::Error;

/// Where the balances of one token come from.
///
/// Implementors only have to know how to read a single wallet; batching,
/// retries and result alignment are the accessor's job.
#[async_trait]
pub trait BalanceSource: Send + Sync {
    async fn balance(&self, wallet: &WalletAddress) -> Result<U256, RpcError>;

    /// Reads a whole batch. The outer error fails the batch, inner errors
    /// stay with their wallet.
    async fn balances(
        &self,
        wallets: &[WalletAddress],
    ) -> Result<Vec<Result<U256, ItemError>>, RpcError> {
        join_all(wallets.iter().map(|wallet| self.balance(wallet)))
            .await
            .into_iter()
            .map(absorb)
            .collect()
    }

    async fn details(&self, wallet: &WalletAddress) -> Result<Vec<DetailRecord>, RpcError> {
        Ok(vec![DetailRecord::balance(self.balance(wallet).await?)])
    }
}

#[derive(Error, Debug)]
pub enum AccessorError {
    #[error(transparent)]
    Connection(#[from] ConnectionError),
    #[error("Token `{symbol}` has no reader on {chain}")]
    UnsupportedKind { symbol: String, chain: Chain },
}

/// Uniform `get_balances` / `get_details` entry point for any token.
pub struct TokenAccessor {
    descriptor: TokenDescriptor,
    source: Arc<dyn BalanceSource>,
    executor: BatchExecutor,
}

impl std::fmt::Debug for TokenAccessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenAccessor")
            .field("descriptor", &self.descriptor)
            .field("executor", &self.executor)
            .finish()
    }
}

impl TokenAccessor {
    pub fn new(
        descriptor: TokenDescriptor,
        source: Arc<dyn BalanceSource>,
        config: BatchConfig,
    ) -> Self {
        Self {
            descriptor,
            source,
            executor: BatchExecutor::new(config),
        }
    }

    pub fn descriptor(&self) -> &TokenDescriptor {
        &self.descriptor
    }

    /// Smallest-unit balance of every wallet, one entry per wallet in input
    /// order.
    pub async fn get_balances(
        &self,
        wallets: &[WalletAddress],
    ) -> Result<Vec<WalletResult<U256>>, BatchError> {
        let source = &self.source;

        log::debug!(
            "Reading {} {} balances on {}",
            wallets.len(),
            self.descriptor.symbol,
            self.descriptor.chain
        );

        let balances = self
            .executor
            .run_batches(wallets, |batch| source.balances(batch))
            .await?;

        Ok(wallets
            .iter()
            .cloned()
            .zip(balances)
            .map(|(wallet, result)| WalletResult { wallet, result })
            .collect())
    }

    /// Detail rows of every wallet, flattened. A wallet contributes one row
    /// per position it holds, or a single error row if it could not be read.
    pub async fn get_details(
        &self,
        wallets: &[WalletAddress],
    ) -> Result<Vec<WalletResult<DetailRecord>>, BatchError> {
        let source = &self.source;

        let details = self
            .executor
            .run(wallets, |wallet| async move { absorb(source.details(wallet).await) })
            .await?;

        Ok(wallets
            .iter()
            .zip(details)
            .flat_map(|(wallet, details)| match details {
                Ok(records) => records
                    .into_iter()
                    .map(|record| WalletResult {
                        wallet: wallet.clone(),
                        result: Ok(record),
                    })
                    .collect::<Vec<_>>(),
                Err(e) => vec![WalletResult {
                    wallet: wallet.clone(),
                    result: Err(e),
                }],
            })
            .collect())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::{
        collections::HashMap,
        sync::{
            atomic::{AtomicUsize, Ordering},
            Mutex,
        },
    };

    #[derive(Default)]
    struct MockSource {
        balances: HashMap<String, u64>,
        throttle_first: AtomicUsize,
        calls: AtomicUsize,
        batches: Mutex<Vec<usize>>,
    }

    impl MockSource {
        fn with(balances: &[(&str, u64)]) -> Self {
            Self {
                balances: balances
                    .iter()
                    .map(|(wallet, balance)| (wallet.to_string(), *balance))
                    .collect(),
                ..Default::default()
            }
        }
    }

    #[async_trait]
    impl BalanceSource for MockSource {
        async fn balance(&self, wallet: &WalletAddress) -> Result<U256, RpcError> {
            self.calls.fetch_add(1, Ordering::SeqCst);

            if self
                .throttle_first
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
                .is_ok()
            {
                return Err(RpcError::Http(429));
            }

            if !wallet.as_str().starts_with("0x") {
                return Err(RpcError::InvalidAddress(wallet.to_string()));
            }

            match self.balances.get(wallet.as_str()) {
                Some(balance) => Ok(U256::from(*balance)),
                None => Err(RpcError::Reverted("execution reverted".into())),
            }
        }

        async fn balances(
            &self,
            wallets: &[WalletAddress],
        ) -> Result<Vec<Result<U256, ItemError>>, RpcError> {
            self.batches.lock().unwrap().push(wallets.len());

            let mut out = Vec::with_capacity(wallets.len());
            for wallet in wallets {
                out.push(absorb(self.balance(wallet).await)?);
            }
            Ok(out)
        }

        async fn details(&self, wallet: &WalletAddress) -> Result<Vec<DetailRecord>, RpcError> {
            let total = self.balance(wallet).await?;

            Ok((0..total.low_u64())
                .map(|n| DetailRecord {
                    label: format!("stake #{n}"),
                    amount: U256::from(10),
                    unlocks_at: Some(1_700_000_000 + n),
                })
                .collect())
        }
    }

    fn descriptor() -> TokenDescriptor {
        TokenDescriptor {
            symbol: "VTRU".into(),
            chain: Chain::Vitruveo,
            kind: TokenKind::Native,
            decimals: 18,
        }
    }

    fn accessor(source: Arc<MockSource>, batch_size: usize, max_retries: u32) -> TokenAccessor {
        TokenAccessor::new(
            descriptor(),
            source,
            BatchConfig {
                batch_size,
                max_retries,
                ..Default::default()
            },
        )
    }

    fn wallets(raw: &[&str]) -> Vec<WalletAddress> {
        raw.iter().map(|wallet| WalletAddress::from(*wallet)).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn reads_every_wallet() {
        let source = Arc::new(MockSource::with(&[("0xa", 100), ("0xb", 0)]));

        let balances = accessor(source, 30, 10)
            .get_balances(&wallets(&["0xa", "0xb"]))
            .await
            .unwrap();

        assert_eq!(balances.len(), 2);
        assert_eq!(balances[0].wallet.as_str(), "0xa");
        assert_eq!(balances[0].value(), Some(&U256::from(100)));
        assert_eq!(balances[1].value(), Some(&U256::zero()));
    }

    #[tokio::test(start_paused = true)]
    async fn failed_wallets_keep_their_slot() {
        let source = Arc::new(MockSource::with(&[("0xa", 1), ("0xc", 3)]));

        let balances = accessor(source, 30, 10)
            .get_balances(&wallets(&["0xa", "garbage", "0xunknown", "0xc"]))
            .await
            .unwrap();

        assert_eq!(
            balances.iter().map(|b| b.wallet.as_str()).collect::<Vec<_>>(),
            vec!["0xa", "garbage", "0xunknown", "0xc"]
        );
        assert_eq!(
            balances[1].error(),
            Some(&ItemError::InvalidAddress("garbage".into()))
        );
        assert!(matches!(balances[2].error(), Some(ItemError::CallFailed(_))));
        assert_eq!(balances[3].value(), Some(&U256::from(3)));
    }

    #[tokio::test(start_paused = true)]
    async fn throttled_batches_are_retried_smaller() {
        let raw: Vec<String> = (0..45).map(|n| format!("0x{n:x}")).collect();
        let known: Vec<(&str, u64)> = raw.iter().map(|wallet| (wallet.as_str(), 7)).collect();

        let source = Arc::new(MockSource::with(&known));
        source.throttle_first.store(2, Ordering::SeqCst);

        let balances = accessor(source.clone(), 30, 10)
            .get_balances(&wallets(&raw.iter().map(String::as_str).collect::<Vec<_>>()))
            .await
            .unwrap();

        assert_eq!(balances.len(), 45);
        assert!(balances.iter().all(|b| b.value() == Some(&U256::from(7))));
        assert_eq!(&source.batches.lock().unwrap()[..3], &[30, 22, 16]);
    }

    #[tokio::test(start_paused = true)]
    async fn persistent_throttling_surfaces_once() {
        let source = Arc::new(MockSource::with(&[("0xa", 1)]));
        source.throttle_first.store(usize::MAX, Ordering::SeqCst);

        let err = accessor(source.clone(), 30, 3)
            .get_balances(&wallets(&["0xa", "0xb"]))
            .await
            .unwrap_err();

        assert!(matches!(err, BatchError::Exhausted { attempts: 3, .. }));
        assert_eq!(source.batches.lock().unwrap().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn details_are_flattened() {
        let source = Arc::new(MockSource::with(&[("0xa", 2), ("0xb", 0), ("0xc", 1)]));

        let details = accessor(source, 30, 10)
            .get_details(&wallets(&["0xa", "0xb", "bad", "0xc"]))
            .await
            .unwrap();

        assert_eq!(
            details.iter().map(|d| d.wallet.as_str()).collect::<Vec<_>>(),
            vec!["0xa", "0xa", "bad", "0xc"]
        );
        assert_eq!(details[1].value().unwrap().label, "stake #1");
        assert!(details[2].error().is_some());
        assert_eq!(details[3].value().unwrap().unlocks_at, Some(1_700_000_000));
    }

    #[tokio::test]
    async fn default_details_wrap_the_balance() {
        struct Flat;

        #[async_trait]
        impl BalanceSource for Flat {
            async fn balance(&self, _wallet: &WalletAddress) -> Result<U256, RpcError> {
                Ok(U256::from(5))
            }
        }

        let details = Flat.details(&WalletAddress::from("0xa")).await.unwrap();

        assert_eq!(details, vec![DetailRecord::balance(U256::from(5))]);
    }
}
