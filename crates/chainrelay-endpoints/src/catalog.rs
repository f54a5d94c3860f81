//! [`EndpointSource`] over the built-in public pools.

use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};

use chainrelay_core::source::EndpointSource;

use crate::public::{dedicated_fallback, public_endpoints};

/// Built-in endpoint catalog.
///
/// Looking up an unsupported chain never fails; it returns an empty pool and
/// logs a warning the first time that chain id is seen.
#[derive(Debug, Default)]
pub struct EndpointCatalog {
    warned: Mutex<HashSet<u64>>,
}

impl EndpointCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    fn warn_unsupported(&self, chain_id: u64) {
        let first = self
            .warned
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(chain_id);
        if first {
            tracing::warn!(chain_id, "no public RPC endpoints known for chain");
        }
    }
}

impl EndpointSource for EndpointCatalog {
    fn endpoints_for(&self, chain_id: u64) -> Vec<String> {
        let pool = public_endpoints(chain_id);
        if pool.is_empty() {
            self.warn_unsupported(chain_id);
        }
        pool.iter().map(|u| u.to_string()).collect()
    }

    fn dedicated_fallback_for(&self, chain_id: u64) -> Option<String> {
        dedicated_fallback(chain_id).map(str::to_string)
    }

    fn is_supported(&self, chain_id: u64) -> bool {
        !public_endpoints(chain_id).is_empty() || dedicated_fallback(chain_id).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_chain_lookup() {
        let catalog = EndpointCatalog::new();
        let pool = catalog.endpoints_for(1);
        assert!(!pool.is_empty());
        assert_eq!(pool[0], public_endpoints(1)[0]);
        assert!(catalog.is_supported(1));
        assert!(catalog.dedicated_fallback_for(1).is_some());
    }

    #[test]
    fn unsupported_chain_warns_once() {
        let catalog = EndpointCatalog::new();
        assert!(catalog.endpoints_for(424_242).is_empty());
        assert!(catalog.endpoints_for(424_242).is_empty());
        assert_eq!(catalog.warned.lock().unwrap().len(), 1);
        assert!(!catalog.is_supported(424_242));
    }
}
