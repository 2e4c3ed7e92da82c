//! Ports Layer - Hexagonal Architecture Boundaries
//!
//! Defines the interfaces (traits) that the use-case layer requires
//! from the outside world. Adapters implement these traits.
//!
//! Port categories:
//! - `TradeRepository`: Trade persistence (memory or document store)
//! - `AssetHost`: Screenshot deletion on the external media host

pub mod asset_host;
pub mod repository;
