//! Where endpoint URLs come from.
//!
//! The client never hard-codes URLs. It asks an [`EndpointSource`] for the
//! public pool and the dedicated fallback, a [`ChainRegistry`] for the
//! network default, and optionally [`RemoteSettings`] for a config-supplied
//! fallback at call time.

use std::collections::HashMap;

/// Chain-keyed endpoint catalog.
pub trait EndpointSource: Send + Sync {
    /// Ordered public endpoints for `chain_id`; empty if unsupported.
    fn endpoints_for(&self, chain_id: u64) -> Vec<String>;

    /// Dedicated fast fallback endpoint for `chain_id`.
    fn dedicated_fallback_for(&self, chain_id: u64) -> Option<String>;

    fn is_supported(&self, chain_id: u64) -> bool {
        !self.endpoints_for(chain_id).is_empty() || self.dedicated_fallback_for(chain_id).is_some()
    }
}

/// Chain metadata registry providing each network's default RPC URL.
pub trait ChainRegistry: Send + Sync {
    fn default_rpc_url(&self, chain_id: u64) -> Option<String>;
}

/// Remote settings service that may supply an extra fallback endpoint.
/// Consulted on every call that reaches the fallback chain.
pub trait RemoteSettings: Send + Sync {
    fn config_rpc_endpoint(&self, chain_id: u64) -> Option<String>;
}

/// Fixed in-memory endpoint table implementing all three lookups.
#[derive(Debug, Clone, Default)]
pub struct StaticEndpoints {
    public: HashMap<u64, Vec<String>>,
    dedicated: HashMap<u64, String>,
    network_defaults: HashMap<u64, String>,
    config: HashMap<u64, String>,
}

impl StaticEndpoints {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_public<I, S>(mut self, chain_id: u64, urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.public
            .insert(chain_id, urls.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_dedicated(mut self, chain_id: u64, url: impl Into<String>) -> Self {
        self.dedicated.insert(chain_id, url.into());
        self
    }

    pub fn with_network_default(mut self, chain_id: u64, url: impl Into<String>) -> Self {
        self.network_defaults.insert(chain_id, url.into());
        self
    }

    pub fn with_config_endpoint(mut self, chain_id: u64, url: impl Into<String>) -> Self {
        self.config.insert(chain_id, url.into());
        self
    }
}

impl EndpointSource for StaticEndpoints {
    fn endpoints_for(&self, chain_id: u64) -> Vec<String> {
        self.public.get(&chain_id).cloned().unwrap_or_default()
    }

    fn dedicated_fallback_for(&self, chain_id: u64) -> Option<String> {
        self.dedicated.get(&chain_id).cloned()
    }
}

impl ChainRegistry for StaticEndpoints {
    fn default_rpc_url(&self, chain_id: u64) -> Option<String> {
        self.network_defaults.get(&chain_id).cloned()
    }
}

impl RemoteSettings for StaticEndpoints {
    fn config_rpc_endpoint(&self, chain_id: u64) -> Option<String> {
        self.config.get(&chain_id).cloned()
    }
}
