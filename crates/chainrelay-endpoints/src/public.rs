//! Public / community RPC endpoints.
//!
//! Free, no-API-key endpoints. Rate limits are low and reliability varies,
//! which is why the client rotates across several per chain.

/// Ordered public pool for `chain_id`; empty if the chain is unknown.
pub fn public_endpoints(chain_id: u64) -> &'static [&'static str] {
    match chain_id {
        1 => &[
            "https://eth.llamarpc.com",
            "https://rpc.ankr.com/eth",
            "https://ethereum-rpc.publicnode.com",
            "https://1rpc.io/eth",
        ],
        10 => &[
            "https://rpc.ankr.com/optimism",
            "https://optimism-rpc.publicnode.com",
            "https://1rpc.io/op",
        ],
        56 => &[
            "https://rpc.ankr.com/bsc",
            "https://bsc-rpc.publicnode.com",
            "https://1rpc.io/bnb",
        ],
        100 => &[
            "https://rpc.ankr.com/gnosis",
            "https://gnosis-rpc.publicnode.com",
            "https://1rpc.io/gnosis",
        ],
        137 => &[
            "https://polygon.llamarpc.com",
            "https://rpc.ankr.com/polygon",
            "https://polygon-bor-rpc.publicnode.com",
            "https://1rpc.io/matic",
        ],
        8453 => &[
            "https://base.llamarpc.com",
            "https://rpc.ankr.com/base",
            "https://base-rpc.publicnode.com",
            "https://1rpc.io/base",
        ],
        42161 => &[
            "https://arbitrum.llamarpc.com",
            "https://rpc.ankr.com/arbitrum",
            "https://arbitrum-one-rpc.publicnode.com",
            "https://1rpc.io/arb",
        ],
        43114 => &[
            "https://rpc.ankr.com/avalanche",
            "https://avalanche-c-chain-rpc.publicnode.com",
            "https://1rpc.io/avax/c",
        ],
        11155111 => &[
            "https://rpc.ankr.com/eth_sepolia",
            "https://ethereum-sepolia-rpc.publicnode.com",
            "https://1rpc.io/sepolia",
        ],
        _ => &[],
    }
}

/// Dedicated fast fallback, tried first once the public pool is exhausted.
pub fn dedicated_fallback(chain_id: u64) -> Option<&'static str> {
    let url = match chain_id {
        1 => "https://eth.drpc.org",
        10 => "https://optimism.drpc.org",
        56 => "https://bsc.drpc.org",
        100 => "https://gnosis.drpc.org",
        137 => "https://polygon.drpc.org",
        8453 => "https://base.drpc.org",
        42161 => "https://arbitrum.drpc.org",
        43114 => "https://avalanche.drpc.org",
        11155111 => "https://sepolia.drpc.org",
        _ => return None,
    };
    Some(url)
}

/// Chain ids with a public pool, ascending.
pub fn supported_chain_ids() -> Vec<u64> {
    crate::chains::CHAINS
        .iter()
        .map(|c| c.chain_id)
        .filter(|id| !public_endpoints(*id).is_empty() || dedicated_fallback(*id).is_some())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chains::CHAINS;

    #[test]
    fn every_known_chain_has_a_pool_and_fallback() {
        for chain in CHAINS {
            assert!(
                public_endpoints(chain.chain_id).len() >= 2,
                "{} needs at least two public endpoints",
                chain.name
            );
            assert!(dedicated_fallback(chain.chain_id).is_some());
        }
    }

    #[test]
    fn dedicated_not_in_public_pool() {
        for chain in CHAINS {
            let dedicated = dedicated_fallback(chain.chain_id).unwrap();
            assert!(!public_endpoints(chain.chain_id).contains(&dedicated));
        }
    }

    #[test]
    fn unknown_chain_is_empty() {
        assert!(public_endpoints(424_242).is_empty());
        assert!(dedicated_fallback(424_242).is_none());
    }

    #[test]
    fn pools_use_https() {
        for id in supported_chain_ids() {
            assert!(public_endpoints(id).iter().all(|u| u.starts_with("https://")));
        }
    }
}
