use crate::types::{Address, Chain, U256};
use providers::{evm::u256_from_str, ChainFamily};
use serde::Deserialize;
use std::{fs, path::Path};
use thiserror::Error;

fn default_balance_method() -> String {
    "balanceOf".into()
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TokenKind {
    /// The chain's own coin.
    Native,
    Erc20 {
        address: Address,
    },
    Erc721 {
        address: Address,
    },
    Erc1155 {
        address: Address,
        #[serde(deserialize_with = "u256_from_str")]
        id: U256,
    },
    /// A staking contract: `balance_method(address)` gives the staked
    /// total, `stakes_method(address)` the individual positions.
    Staked {
        contract: Address,
        #[serde(default = "default_balance_method")]
        balance_method: String,
        stakes_method: Option<String>,
    },
    SplToken {
        mint: String,
    },
    /// FA1.2 (no `token_id`) or FA2 ledger big map.
    TezosLedger {
        contract: String,
        big_map: u64,
        token_id: Option<u64>,
    },
}

impl TokenKind {
    pub fn family(&self) -> Option<ChainFamily> {
        match self {
            TokenKind::Native => None,
            TokenKind::Erc20 { .. }
            | TokenKind::Erc721 { .. }
            | TokenKind::Erc1155 { .. }
            | TokenKind::Staked { .. } => Some(ChainFamily::Evm),
            TokenKind::SplToken { .. } => Some(ChainFamily::Solana),
            TokenKind::TezosLedger { .. } => Some(ChainFamily::Tezos),
        }
    }
}

/// Static metadata of one token on one chain.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct TokenDescriptor {
    pub symbol: String,
    pub chain: Chain,
    pub kind: TokenKind,
    #[serde(default)]
    pub decimals: u8,
}

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Failed to read token file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse token file: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Token `{symbol}` cannot live on {chain}")]
    WrongChain { symbol: String, chain: Chain },
    #[error("Token `{symbol}` is listed twice for {chain}")]
    Duplicate { symbol: String, chain: Chain },
}

/// Read-only lookup table of known tokens.
#[derive(Debug, Clone, Default)]
pub struct TokenCatalog {
    tokens: Vec<TokenDescriptor>,
}

impl TokenCatalog {
    pub fn new(tokens: Vec<TokenDescriptor>) -> Result<Self, CatalogError> {
        for (idx, token) in tokens.iter().enumerate() {
            if matches!(token.kind.family(), Some(family) if family != token.chain.family()) {
                return Err(CatalogError::WrongChain {
                    symbol: token.symbol.clone(),
                    chain: token.chain,
                });
            }

            if tokens[..idx]
                .iter()
                .any(|other| other.chain == token.chain && other.symbol.eq_ignore_ascii_case(&token.symbol))
            {
                return Err(CatalogError::Duplicate {
                    symbol: token.symbol.clone(),
                    chain: token.chain,
                });
            }
        }

        Ok(Self { tokens })
    }

    pub fn from_json(raw: &str) -> Result<Self, CatalogError> {
        Self::new(serde_json::from_str(raw)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        Self::from_json(&fs::read_to_string(path)?)
    }

    pub fn get(&self, symbol: &str, chain: Chain) -> Option<&TokenDescriptor> {
        self.tokens
            .iter()
            .find(|token| token.chain == chain && token.symbol.eq_ignore_ascii_case(symbol))
    }

    pub fn by_symbol<'a>(&'a self, symbol: &'a str) -> impl Iterator<Item = &'a TokenDescriptor> {
        self.tokens
            .iter()
            .filter(move |token| token.symbol.eq_ignore_ascii_case(symbol))
    }

    pub fn iter(&self) -> impl Iterator<Item = &TokenDescriptor> {
        self.tokens.iter()
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}
