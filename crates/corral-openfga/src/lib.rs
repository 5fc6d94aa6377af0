//! Corral OpenFGA - relationship tuple store integration
//!
//! Provides the OpenFGA HTTP client, an in-memory store implementing the same
//! authorization model, a caching decorator and relation maintenance helpers.

pub mod cached_client;
pub mod client;
pub mod memory;
pub mod service;

pub use cached_client::{CacheConfig, CacheMetrics, CachedTupleStore};
pub use client::{OpenFgaClient, OpenFgaConfig};
pub use memory::MemoryTupleStore;
pub use service::RelationService;
