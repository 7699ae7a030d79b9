//! Uniswap v2: token/token pairs, the factory that registers them, and the
//! router that users trade through.
//!
//! Pairs are located through `factory.getPair` rather than by recomputing a
//! CREATE2 address, so the factory deploys them with plain CREATE.

pub mod factory;
pub mod library;
pub mod pair;
pub mod router;

pub use factory::UniswapV2Factory;
pub use pair::UniswapV2Pair;
pub use router::UniswapV2Router02;
