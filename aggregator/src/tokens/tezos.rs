use super::{BalanceSource, TokenKind};
use crate::types::{RpcError, WalletAddress, U256};
use async_trait::async_trait;
use providers::tezos::{parse_address, LedgerKey, TezosConnection};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Holding {
    Mutez,
    Ledger { big_map: u64, token_id: Option<u64> },
}

impl Holding {
    /// `None` for kinds that do not live on Tezos, and for ledgers whose
    /// contract is not an originated `KT1` address.
    fn for_kind(kind: &TokenKind) -> Option<Self> {
        match kind {
            TokenKind::Native => Some(Holding::Mutez),
            TokenKind::TezosLedger {
                contract,
                big_map,
                token_id,
            } if contract.starts_with("KT1") && parse_address(contract).is_ok() => Some(Holding::Ledger {
                big_map: *big_map,
                token_id: *token_id,
            }),
            _ => None,
        }
    }

    fn ledger_key(token_id: Option<u64>, wallet: &WalletAddress) -> LedgerKey {
        match token_id {
            Some(id) => LedgerKey::AddressToken(wallet.to_string(), id),
            None => LedgerKey::Address(wallet.to_string()),
        }
    }
}

/// Tez or an FA1.2/FA2 token read from its ledger big map.
pub struct TezosSource {
    connection: Arc<TezosConnection>,
    holding: Holding,
}

impl TezosSource {
    pub fn new(connection: Arc<TezosConnection>, kind: &TokenKind) -> Option<Self> {
        Holding::for_kind(kind).map(|holding| Self {
            connection,
            holding,
        })
    }
}

#[async_trait]
impl BalanceSource for TezosSource {
    async fn balance(&self, wallet: &WalletAddress) -> Result<U256, RpcError> {
        match self.holding {
            Holding::Mutez => self.connection.native_balance(wallet).await,
            Holding::Ledger { big_map, token_id } => {
                self.connection
                    .ledger_balance(big_map, &Holding::ledger_key(token_id, wallet))
                    .await
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn ledger_keys_follow_the_token_standard() {
        let wallet = WalletAddress::from("tz1VSUr8wwNhLAzempoch5d6hLRiTh8Cjcjb");

        assert_eq!(
            Holding::ledger_key(None, &wallet),
            LedgerKey::Address(wallet.to_string())
        );
        assert_eq!(
            Holding::ledger_key(Some(0), &wallet),
            LedgerKey::AddressToken(wallet.to_string(), 0)
        );
    }

    #[test]
    fn kinds() {
        assert_eq!(Holding::for_kind(&TokenKind::Native), Some(Holding::Mutez));
        assert_eq!(
            Holding::for_kind(&TokenKind::TezosLedger {
                contract: "KT1PWx2mnDueood7fEmfbBDKx1D9BAnnXitn".into(),
                big_map: 31,
                token_id: None,
            }),
            Some(Holding::Ledger {
                big_map: 31,
                token_id: None
            })
        );
        assert_eq!(
            Holding::for_kind(&TokenKind::SplToken { mint: "x".into() }),
            None
        );
    }

    #[test]
    fn ledgers_need_a_contract_address() {
        for contract in ["tz1VSUr8wwNhLAzempoch5d6hLRiTh8Cjcjb", "KT1nope"] {
            assert_eq!(
                Holding::for_kind(&TokenKind::TezosLedger {
                    contract: contract.into(),
                    big_map: 31,
                    token_id: Some(0),
                }),
                None
            );
        }
    }
}
