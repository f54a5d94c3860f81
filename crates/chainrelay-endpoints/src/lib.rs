//! chainrelay-endpoints — built-in endpoint catalog for chainrelay.
//!
//! Public pools, dedicated fallbacks and network defaults for the chains
//! chainrelay knows about, plus wiring for a ready-to-use registry.
//!
//! # Quick start
//! ```rust,no_run
//! use chainrelay_core::FetchOptions;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = chainrelay_endpoints::default_registry()?;
//! let block: String =
//!     chainrelay_core::rpc_fetch(&registry, 1, "eth_blockNumber", vec![], FetchOptions::default())
//!         .await?;
//! # Ok(())
//! # }
//! ```

pub mod catalog;
pub mod chains;
pub mod public;

use std::sync::Arc;
use std::time::Duration;

use chainrelay_core::client::ClientContext;
use chainrelay_core::error::TransportError;
use chainrelay_core::registry::ClientRegistry;
use chainrelay_http::HttpConnector;

pub use catalog::EndpointCatalog;
pub use chains::{chain_info, chain_name, BuiltinChains, ChainInfo, CHAINS};
pub use public::{dedicated_fallback, public_endpoints, supported_chain_ids};

/// Upper bound on any single HTTP exchange. Per-call timeouts from
/// `ClientConfig` are enforced by the client and are normally shorter.
pub const HTTP_CLIENT_TIMEOUT: Duration = Duration::from_secs(60);

/// Context using the built-in catalog, built-in chain defaults and HTTP.
pub fn default_context() -> Result<ClientContext, TransportError> {
    let connector = HttpConnector::new(HTTP_CLIENT_TIMEOUT)?;
    Ok(ClientContext::new(
        Arc::new(EndpointCatalog::new()),
        Arc::new(BuiltinChains),
        Arc::new(connector),
    ))
}

/// Registry over [`default_context`].
pub fn default_registry() -> Result<ClientRegistry, TransportError> {
    Ok(ClientRegistry::new(default_context()?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chainrelay_core::ClientConfig;

    #[test]
    fn default_registry_resolves_builtin_pool() {
        let registry = default_registry().unwrap();
        assert!(registry.is_supported(137));
        let client = registry.get_client(137, None);
        let pool: Vec<String> = public_endpoints(137).iter().map(|u| u.to_string()).collect();
        assert_eq!(client.endpoints(), pool.as_slice());
    }

    #[test]
    fn custom_endpoints_override_catalog() {
        let registry = default_registry().unwrap();
        let client = registry.get_client(
            1,
            Some(ClientConfig::default().with_endpoints(["https://my-node.example"])),
        );
        assert_eq!(client.endpoints(), ["https://my-node.example".to_string()]);
    }
}
