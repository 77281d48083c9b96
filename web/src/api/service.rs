use crate::types::{Balance, BalancesRequest, Detail};
use std::sync::Arc;
use thiserror::Error;
use vault_aggregator::{
    types::Chain, AccessorError, BatchError, Config, ConnectionRegistry, TokenAccessor,
    TokenCatalog, TokenDescriptor,
};

pub struct AppState {
    pub config: Arc<Config>,
    pub catalog: TokenCatalog,
}

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Unknown token `{symbol}` on {chain}")]
    UnknownToken { symbol: String, chain: Chain },
    #[error(transparent)]
    Accessor(#[from] AccessorError),
    #[error(transparent)]
    Batch(#[from] BatchError),
}

/// Connections live only as long as the request that opened them.
async fn accessor<'a>(
    state: &'a AppState,
    req: &BalancesRequest,
) -> Result<(&'a TokenDescriptor, TokenAccessor), ServiceError> {
    let descriptor = state
        .catalog
        .get(&req.token, req.chain)
        .ok_or_else(|| ServiceError::UnknownToken {
            symbol: req.token.clone(),
            chain: req.chain,
        })?;

    let registry = ConnectionRegistry::new(state.config.clone());

    Ok((descriptor, registry.accessor(descriptor).await?))
}

pub async fn balances(state: &AppState, req: &BalancesRequest) -> Result<Vec<Balance>, ServiceError> {
    let (descriptor, accessor) = accessor(state, req).await?;

    Ok(accessor
        .get_balances(&req.wallets)
        .await?
        .into_iter()
        .map(|balance| Balance::new(balance, descriptor.chain, descriptor.decimals))
        .collect())
}

pub async fn details(state: &AppState, req: &BalancesRequest) -> Result<Vec<Detail>, ServiceError> {
    let (descriptor, accessor) = accessor(state, req).await?;

    Ok(accessor
        .get_details(&req.wallets)
        .await?
        .into_iter()
        .map(|detail| Detail::new(detail, descriptor.decimals))
        .collect())
}

#[cfg(test)]
mod test {
    use super::*;

    #[tokio::test]
    async fn unknown_tokens_are_rejected_before_connecting() {
        let state = AppState {
            config: Arc::new(Config::default()),
            catalog: TokenCatalog::default(),
        };
        let req = BalancesRequest {
            token: "VTRU".into(),
            chain: Chain::Vitruveo,
            wallets: vec!["0xa".into()],
        };

        assert!(matches!(
            balances(&state, &req).await,
            Err(ServiceError::UnknownToken {
                chain: Chain::Vitruveo,
                ..
            })
        ));
    }
}
