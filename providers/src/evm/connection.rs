use crate::{evm::EvmRpc, Chain, ChainFamily, ConnectionError, RpcError};
use async_trait::async_trait;
use std::time::Duration;
use web3::{
    transports::Http,
    types::{Address, Bytes, CallRequest, U256},
    Web3,
};

/// A checked connection to one EVM network.
pub struct EvmConnection {
    chain: Chain,
    rpc_url: String,
    web3: Web3<Http>,
}

impl std::fmt::Debug for EvmConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvmConnection")
            .field("chain", &self.chain)
            .field("rpc_url", &self.rpc_url)
            .finish()
    }
}

impl EvmConnection {
    /// Opens a transport to `rpc_url` and makes sure the node behind it
    /// actually serves `chain`.
    pub async fn connect(
        chain: Chain,
        rpc_url: &str,
        timeout: Duration,
    ) -> Result<Self, ConnectionError> {
        let spec = chain.spec();

        let expected = match (spec.family, spec.chain_id) {
            (ChainFamily::Evm, Some(id)) => id,
            _ => return Err(ConnectionError::UnsupportedChain(chain)),
        };

        let transport = Http::new(rpc_url).map_err(|e| ConnectionError::InvalidUrl {
            chain,
            url: rpc_url.to_string(),
            reason: e.to_string(),
        })?;
        let web3 = Web3::new(transport);

        let unreachable = |source: RpcError| ConnectionError::Unreachable {
            chain,
            url: rpc_url.to_string(),
            source,
        };

        let actual = tokio::time::timeout(timeout, web3.eth().chain_id())
            .await
            .map_err(|_| unreachable(RpcError::Timeout(timeout)))?
            .map_err(|e| unreachable(e.into()))?;

        if actual != U256::from(expected) {
            return Err(ConnectionError::ChainIdMismatch {
                chain,
                expected,
                actual: actual.low_u64(),
            });
        }

        log::info!("Connected to {chain} (chain id {expected}) at {rpc_url}");

        Ok(Self {
            chain,
            rpc_url: rpc_url.to_string(),
            web3,
        })
    }
}

#[async_trait]
impl EvmRpc for EvmConnection {
    fn chain(&self) -> Chain {
        self.chain
    }

    async fn code(&self, address: Address) -> Result<Vec<u8>, RpcError> {
        Ok(self.web3.eth().code(address, None).await?.0)
    }

    async fn call(&self, to: Address, data: Vec<u8>) -> Result<Vec<u8>, RpcError> {
        let request = CallRequest {
            to: Some(to),
            data: Some(Bytes(data)),
            ..Default::default()
        };

        Ok(self.web3.eth().call(request, None).await?.0)
    }

    async fn native_balance(&self, address: Address) -> Result<U256, RpcError> {
        Ok(self.web3.eth().balance(address, None).await?)
    }
}
