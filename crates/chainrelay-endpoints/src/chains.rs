//! Chain metadata: names and each network's own default RPC URL.

use chainrelay_core::source::ChainRegistry;

/// Static description of a supported network.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainInfo {
    pub chain_id: u64,
    pub name: &'static str,
    pub native_symbol: &'static str,
    /// RPC URL published by the network operators; last resort fallback.
    pub default_rpc_url: &'static str,
}

pub const CHAINS: &[ChainInfo] = &[
    ChainInfo {
        chain_id: 1,
        name: "Ethereum",
        native_symbol: "ETH",
        default_rpc_url: "https://cloudflare-eth.com",
    },
    ChainInfo {
        chain_id: 10,
        name: "OP Mainnet",
        native_symbol: "ETH",
        default_rpc_url: "https://mainnet.optimism.io",
    },
    ChainInfo {
        chain_id: 56,
        name: "BNB Smart Chain",
        native_symbol: "BNB",
        default_rpc_url: "https://bsc-dataseed.bnbchain.org",
    },
    ChainInfo {
        chain_id: 100,
        name: "Gnosis",
        native_symbol: "xDAI",
        default_rpc_url: "https://rpc.gnosischain.com",
    },
    ChainInfo {
        chain_id: 137,
        name: "Polygon",
        native_symbol: "POL",
        default_rpc_url: "https://polygon-rpc.com",
    },
    ChainInfo {
        chain_id: 8453,
        name: "Base",
        native_symbol: "ETH",
        default_rpc_url: "https://mainnet.base.org",
    },
    ChainInfo {
        chain_id: 42161,
        name: "Arbitrum One",
        native_symbol: "ETH",
        default_rpc_url: "https://arb1.arbitrum.io/rpc",
    },
    ChainInfo {
        chain_id: 43114,
        name: "Avalanche C-Chain",
        native_symbol: "AVAX",
        default_rpc_url: "https://api.avax.network/ext/bc/C/rpc",
    },
    ChainInfo {
        chain_id: 11155111,
        name: "Sepolia",
        native_symbol: "ETH",
        default_rpc_url: "https://rpc.sepolia.org",
    },
];

pub fn chain_info(chain_id: u64) -> Option<&'static ChainInfo> {
    CHAINS.iter().find(|c| c.chain_id == chain_id)
}

/// Human-readable network name, e.g. `"Arbitrum One"`.
pub fn chain_name(chain_id: u64) -> Option<&'static str> {
    chain_info(chain_id).map(|c| c.name)
}

/// [`ChainRegistry`] over the built-in [`CHAINS`] table.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinChains;

impl ChainRegistry for BuiltinChains {
    fn default_rpc_url(&self, chain_id: u64) -> Option<String> {
        chain_info(chain_id).map(|c| c.default_rpc_url.to_string())
    }
}
