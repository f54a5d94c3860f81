//! chainrelay-provider — ethers-style provider adapter.
//!
//! [`ChainProvider`] wraps the shared per-chain `RpcClient` with typed
//! helpers (`get_block_number`, `get_balance`, ...) and an ethers-compatible
//! [`ChainProvider::perform`] entry point.
//!
//! # Quick start
//! ```rust,no_run
//! use chainrelay_provider::{BlockId, ChainProvider};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = chainrelay_endpoints::default_registry()?;
//! let provider = ChainProvider::new(&registry, 1, None)?;
//! let head = provider.get_block_number().await?;
//! let wei = provider.get_balance("0x0000000000000000000000000000000000000000", BlockId::Latest).await?;
//! # Ok(())
//! # }
//! ```

pub mod perform;
pub mod provider;
pub mod quantity;

pub use perform::{translate, SUPPORTED_METHODS};
pub use provider::{ChainProvider, Listener, Network};
pub use quantity::{parse_quantity_u128, parse_quantity_u64, to_quantity, BlockId};
