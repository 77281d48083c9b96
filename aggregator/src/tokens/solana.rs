use super::{BalanceSource, TokenKind};
use crate::types::{RpcError, WalletAddress, U256};
use async_trait::async_trait;
use providers::solana::SolanaConnection;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Holding {
    Lamports,
    Spl { mint: String },
}

impl Holding {
    fn for_kind(kind: &TokenKind) -> Option<Self> {
        match kind {
            TokenKind::Native => Some(Holding::Lamports),
            TokenKind::SplToken { mint } => Some(Holding::Spl { mint: mint.clone() }),
            _ => None,
        }
    }
}

/// Native SOL or an SPL token.
pub struct SolanaSource {
    connection: Arc<SolanaConnection>,
    holding: Holding,
}

impl SolanaSource {
    pub fn new(connection: Arc<SolanaConnection>, kind: &TokenKind) -> Option<Self> {
        Holding::for_kind(kind).map(|holding| Self {
            connection,
            holding,
        })
    }
}

#[async_trait]
impl BalanceSource for SolanaSource {
    async fn balance(&self, wallet: &WalletAddress) -> Result<U256, RpcError> {
        let amount = match &self.holding {
            Holding::Lamports => self.connection.native_balance(wallet).await?,
            Holding::Spl { mint } => self.connection.token_balance(wallet, mint).await?,
        };

        Ok(U256::from(amount))
    }
}
