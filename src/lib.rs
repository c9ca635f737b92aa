//! # typedcache
//!
//! Typed client core for memcached-style distributed caches:
//! - Value codec mapping native values onto `bytes + flags`
//! - Single-key operations with collision/absence semantics
//! - Batched multi-get draining an open-ended response stream
//! - Server pool registry and per-server stats
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Caller                                │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                       Client                                 │
//! │        (single-key ops / batch fetch / registry)             │
//! └──────────┬──────────────────────────────────┬───────────────┘
//!            │                                  │
//!            ▼                                  ▼
//!   ┌─────────────────┐                ┌─────────────────┐
//!   │      Codec      │                │     Driver      │
//!   │ value <-> bytes │                │  (wire, pool,   │
//!   │     + flags     │                │ server select)  │
//!   └─────────────────┘                └─────────────────┘
//! ```
//!
//! ## Example
//!
//! ```
//! use typedcache::{Client, Config, MemoryCluster, MemoryDriver, Value};
//!
//! let cluster = MemoryCluster::new();
//! let config = Config::builder().server("127.0.0.1:11211").build();
//! let driver = MemoryDriver::connect(&cluster, &config);
//! let mut client = Client::new(driver, config).unwrap();
//!
//! client.set(b"answer", 42, 0).unwrap();
//! assert_eq!(client.get(b"answer").unwrap(), Value::Number(42.0));
//! assert!(!client.add(b"answer", "other", 0).unwrap());
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod codec;
pub mod key;
pub mod driver;
pub mod batch;
pub mod registry;
pub mod client;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{CacheError, Result};
pub use config::Config;
pub use codec::{CacheValue, Serializable, TypeTag, Value};
pub use driver::{Driver, MemoryCluster, MemoryDriver, ReturnCode, ServerEndpoint};
pub use batch::{BatchFetch, FetchResult, Phase};
pub use registry::StatsTable;
pub use client::{Client, DEFAULT_OFFSET, NO_EXPIRATION};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of typedcache
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
