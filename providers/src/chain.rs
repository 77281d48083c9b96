use crate::{address, Address};
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, fmt};

/// Canonical Multicall3 deployment, identical on every chain that has it.
pub const MULTICALL3: &str = "0xcA11bde05977b3631167028862bE2a173976CA11";

const DEFAULT_BATCH_SIZE: usize = 30;

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Hash, Clone, Copy)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Chain {
    Ethereum,
    Bsc,
    Polygon,
    Base,
    Arbitrum,
    Avalanche,
    Optimism,
    Vitruveo,
    Solana,
    Tezos,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ChainFamily {
    Evm,
    Solana,
    Tezos,
}

/// Everything the rest of the workspace needs to know about a network.
#[derive(Debug, Clone)]
pub struct ChainSpec {
    pub chain: Chain,
    pub family: ChainFamily,
    /// EIP-155 id, only meaningful for EVM networks.
    pub chain_id: Option<u64>,
    pub rpc_env: &'static str,
    pub default_rpc: &'static str,
    pub explorer: &'static str,
    /// Aggregator address to check for code; `None` means never try multicall here.
    pub multicall: Option<Address>,
    pub batch_size: usize,
}

impl ChainSpec {
    fn evm(chain: Chain, chain_id: u64, rpc_env: &'static str, default_rpc: &'static str, explorer: &'static str) -> Self {
        Self {
            chain,
            family: ChainFamily::Evm,
            chain_id: Some(chain_id),
            rpc_env,
            default_rpc,
            explorer,
            multicall: Some(address!(MULTICALL3)),
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

lazy_static::lazy_static! {
    static ref CHAINS: HashMap<u8, ChainSpec> = {
        let mut chains = HashMap::new();

        chains.insert(
            Chain::Ethereum as u8,
            ChainSpec::evm(
                Chain::Ethereum,
                1,
                "ETHEREUM_RPC",
                "https://ethereum-rpc.publicnode.com",
                "https://etherscan.io/address/",
            ),
        );
        chains.insert(
            Chain::Bsc as u8,
            ChainSpec::evm(
                Chain::Bsc,
                56,
                "BSC_RPC",
                "https://bsc-dataseed.bnbchain.org",
                "https://bscscan.com/address/",
            ),
        );
        chains.insert(
            Chain::Polygon as u8,
            ChainSpec::evm(
                Chain::Polygon,
                137,
                "POLYGON_RPC",
                "https://polygon-rpc.com",
                "https://polygonscan.com/address/",
            ),
        );
        chains.insert(
            Chain::Base as u8,
            ChainSpec::evm(
                Chain::Base,
                8453,
                "BASE_RPC",
                "https://mainnet.base.org",
                "https://basescan.org/address/",
            ),
        );
        chains.insert(
            Chain::Arbitrum as u8,
            ChainSpec::evm(
                Chain::Arbitrum,
                42161,
                "ARBITRUM_RPC",
                "https://arb1.arbitrum.io/rpc",
                "https://arbiscan.io/address/",
            ),
        );
        chains.insert(
            Chain::Avalanche as u8,
            ChainSpec::evm(
                Chain::Avalanche,
                43114,
                "AVALANCHE_RPC",
                "https://api.avax.network/ext/bc/C/rpc",
                "https://snowtrace.io/address/",
            ),
        );
        chains.insert(
            Chain::Optimism as u8,
            ChainSpec::evm(
                Chain::Optimism,
                10,
                "OPTIMISM_RPC",
                "https://mainnet.optimism.io",
                "https://optimistic.etherscan.io/address/",
            ),
        );
        chains.insert(
            Chain::Vitruveo as u8,
            ChainSpec {
                batch_size: 20,
                ..ChainSpec::evm(
                    Chain::Vitruveo,
                    1490,
                    "VITRUVEO_RPC",
                    "https://rpc.vitruveo.xyz",
                    "https://explorer.vitruveo.xyz/address/",
                )
            },
        );
        chains.insert(
            Chain::Solana as u8,
            ChainSpec {
                chain: Chain::Solana,
                family: ChainFamily::Solana,
                chain_id: None,
                rpc_env: "SOLANA_RPC",
                default_rpc: "https://api.mainnet-beta.solana.com",
                explorer: "https://solscan.io/account/",
                multicall: None,
                batch_size: 10,
            },
        );
        chains.insert(
            Chain::Tezos as u8,
            ChainSpec {
                chain: Chain::Tezos,
                family: ChainFamily::Tezos,
                chain_id: None,
                rpc_env: "TEZOS_RPC",
                default_rpc: "https://mainnet.tezos.ecadinfra.com",
                explorer: "https://tzkt.io/",
                multicall: None,
                batch_size: 10,
            },
        );

        chains
    };
}

const ALL: [Chain; 10] = [
    Chain::Ethereum,
    Chain::Bsc,
    Chain::Polygon,
    Chain::Base,
    Chain::Arbitrum,
    Chain::Avalanche,
    Chain::Optimism,
    Chain::Vitruveo,
    Chain::Solana,
    Chain::Tezos,
];

impl Chain {
    pub fn all() -> &'static [Chain] {
        &ALL
    }

    pub fn spec(&self) -> &'static ChainSpec {
        &CHAINS[&(*self as u8)]
    }

    pub fn family(&self) -> ChainFamily {
        self.spec().family
    }

    pub fn from_chain_id(chain_id: u64) -> Option<Chain> {
        ALL.iter()
            .copied()
            .find(|chain| chain.spec().chain_id == Some(chain_id))
    }

    pub fn explorer_address_url(&self, wallet: &str) -> String {
        format!("{}{wallet}", self.spec().explorer)
    }
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Chain::Ethereum => "ETHEREUM",
            Chain::Bsc => "BSC",
            Chain::Polygon => "POLYGON",
            Chain::Base => "BASE",
            Chain::Arbitrum => "ARBITRUM",
            Chain::Avalanche => "AVALANCHE",
            Chain::Optimism => "OPTIMISM",
            Chain::Vitruveo => "VITRUVEO",
            Chain::Solana => "SOLANA",
            Chain::Tezos => "TEZOS",
        };

        f.write_str(name)
    }
}
