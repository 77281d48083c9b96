use crate::{
    config::Config,
    tokens::{
        evm::EvmSource, solana::SolanaSource, tezos::TezosSource, AccessorError, BalanceSource,
        TokenAccessor, TokenDescriptor,
    },
    types::Chain,
};
use providers::{
    evm::{CallAdapter, EvmConnection},
    solana::SolanaConnection,
    tezos::TezosConnection,
    ChainFamily, ConnectionError,
};
use std::{collections::HashMap, sync::Arc};
use tokio::sync::RwLock;

/// A live, checked connection to one chain.
#[derive(Clone)]
pub enum Connection {
    Evm(Arc<CallAdapter>),
    Solana(Arc<SolanaConnection>),
    Tezos(Arc<TezosConnection>),
}

/// Connections opened on behalf of one caller.
///
/// Each chain is connected at most once per registry. Dropping the registry
/// drops its connections, so a request-scoped registry gives request-scoped
/// connections.
pub struct ConnectionRegistry {
    config: Arc<Config>,
    connections: RwLock<HashMap<Chain, Connection>>,
}

impl ConnectionRegistry {
    pub fn new(config: Arc<Config>) -> Self {
        Self {
            config,
            connections: RwLock::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub async fn connection(&self, chain: Chain) -> Result<Connection, ConnectionError> {
        if let Some(connection) = self.connections.read().await.get(&chain) {
            return Ok(connection.clone());
        }

        let mut connections = self.connections.write().await;

        if let Some(connection) = connections.get(&chain) {
            return Ok(connection.clone());
        }

        let connection = self.connect(chain).await?;
        connections.insert(chain, connection.clone());

        Ok(connection)
    }

    async fn connect(&self, chain: Chain) -> Result<Connection, ConnectionError> {
        let rpc_url = self.config.rpc_url(chain);
        let timeout = self.config.rpc_timeout();

        Ok(match chain.family() {
            ChainFamily::Evm => {
                let rpc = EvmConnection::connect(chain, rpc_url, timeout).await?;
                let adapter = CallAdapter::new(Arc::new(rpc))
                    .with_fallback_concurrency(self.config.fallback_concurrency());

                Connection::Evm(Arc::new(adapter))
            }
            ChainFamily::Solana => {
                Connection::Solana(Arc::new(SolanaConnection::connect(rpc_url, timeout).await?))
            }
            ChainFamily::Tezos => {
                Connection::Tezos(Arc::new(TezosConnection::connect(rpc_url, timeout).await?))
            }
        })
    }

    /// An accessor for `descriptor`, connecting to its chain if needed.
    pub async fn accessor(
        &self,
        descriptor: &TokenDescriptor,
    ) -> Result<TokenAccessor, AccessorError> {
        let connection = self.connection(descriptor.chain).await?;

        let unsupported = || AccessorError::UnsupportedKind {
            symbol: descriptor.symbol.clone(),
            chain: descriptor.chain,
        };

        let source: Arc<dyn BalanceSource> = match connection {
            Connection::Evm(adapter) => {
                Arc::new(EvmSource::new(adapter, &descriptor.kind).ok_or_else(unsupported)?)
            }
            Connection::Solana(connection) => {
                Arc::new(SolanaSource::new(connection, &descriptor.kind).ok_or_else(unsupported)?)
            }
            Connection::Tezos(connection) => {
                Arc::new(TezosSource::new(connection, &descriptor.kind).ok_or_else(unsupported)?)
            }
        };

        Ok(TokenAccessor::new(
            descriptor.clone(),
            source,
            self.config.batch_config(descriptor.chain),
        ))
    }
}
