//! Driver Module
//!
//! The boundary to whatever component speaks the wire protocol, pools
//! connections and picks servers. The client core only ever talks to a
//! `Driver`; it never sees sockets.
//!
//! ## Request Flow
//! ```text
//!   Client ──store/fetch/delete/incr──► Driver ──► server pool
//!   Client ──begin_multi_fetch────────► Driver
//!   Client ◄─next_fetch_result (repeat until None)
//! ```
//!
//! A handle is not safe for concurrent use; every method takes `&mut self`.

mod code;
mod server;
mod memory;

use std::collections::HashMap;

use bytes::Bytes;

use crate::error::Result;

pub use code::ReturnCode;
pub use server::{parse_server_list, ServerEndpoint, MAX_SERVER_WEIGHT};
pub use memory::{MemoryCluster, MemoryDriver, MAX_ITEM_SIZE};

/// Result type for driver calls that return data
pub type DriverResult<T> = std::result::Result<T, ReturnCode>;

/// Storage command variants
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreMode {
    /// Unconditional upsert
    Set,
    /// Store only if the key is absent
    Add,
    /// Store only if the key is present
    Replace,
    /// Concatenate after the existing bytes
    Append,
    /// Concatenate before the existing bytes
    Prepend,
}

impl StoreMode {
    pub fn as_str(self) -> &'static str {
        match self {
            StoreMode::Set => "set",
            StoreMode::Add => "add",
            StoreMode::Replace => "replace",
            StoreMode::Append => "append",
            StoreMode::Prepend => "prepend",
        }
    }
}

/// One item returned by a fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedItem {
    pub key: Vec<u8>,
    pub value: Bytes,
    pub flags: u32,
}

/// Operations the client core needs from a cache driver
pub trait Driver {
    /// Parse a server-list spec and append the servers to the pool.
    ///
    /// Returns how many servers were added.
    fn add_server(&mut self, spec: &str) -> Result<usize>;

    /// Store `value` under `key` with the given flags and expiration
    fn store(
        &mut self,
        mode: StoreMode,
        key: &[u8],
        value: &[u8],
        flags: u32,
        expiration: u32,
    ) -> ReturnCode;

    /// Fetch a single item
    fn fetch(&mut self, key: &[u8]) -> DriverResult<FetchedItem>;

    /// Send one request covering all `keys`; results are pulled with
    /// `next_fetch_result`
    fn begin_multi_fetch(&mut self, keys: &[&[u8]]) -> ReturnCode;

    /// Next pending result of the current multi-fetch, `None` once exhausted
    fn next_fetch_result(&mut self) -> Option<FetchedItem>;

    fn delete(&mut self, key: &[u8], expiration: u32) -> ReturnCode;

    /// Invalidate every item on every server after `expiration`
    fn flush(&mut self, expiration: u32);

    fn increment(&mut self, key: &[u8], offset: u64) -> DriverResult<u64>;

    fn decrement(&mut self, key: &[u8], offset: u64) -> DriverResult<u64>;

    /// Current server pool
    fn servers(&self) -> Vec<ServerEndpoint>;

    /// Statistics reported by one server
    fn stats_for(&mut self, server: &ServerEndpoint) -> DriverResult<HashMap<String, String>>;

    /// Text describing a return code
    fn message(&self, code: ReturnCode) -> String {
        code.message().to_string()
    }
}
