//! Client Module
//!
//! Typed single-key operations, batch fetch and the server registry on top
//! of a `Driver`.
//!
//! ## Outcome Mapping
//! | operation          | NOTSTORED      | NOTFOUND       | other failure |
//! |--------------------|----------------|----------------|---------------|
//! | set                | error          | error          | error         |
//! | add                | `Ok(false)`    | error          | error         |
//! | replace            | `Ok(false)`    | `Ok(false)`    | error         |
//! | append / prepend   | error          | error          | error         |
//! | get                | -              | error          | error         |
//! | delete             | -              | `Ok(false)`    | error         |
//! | incr / decr        | -              | error          | error         |

use std::collections::HashMap;

use crate::batch::{BatchFetch, FetchResult};
use crate::codec::{self, Serializable, Value};
use crate::config::Config;
use crate::driver::{Driver, ReturnCode, ServerEndpoint, StoreMode};
use crate::error::{CacheError, Result};
use crate::key::check_key;
use crate::registry::{self, StatsTable};

/// Expiration meaning "never expire"
pub const NO_EXPIRATION: u32 = 0;

/// Offset used by `incr`/`decr` callers that do not choose one
pub const DEFAULT_OFFSET: u64 = 1;

/// Typed cache client over a driver handle
///
/// Methods take `&mut self`: a handle serves one caller at a time.
pub struct Client<D: Driver> {
    driver: D,
    config: Config,
}

impl<D: Driver> Client<D> {
    /// Wrap `driver` and add the servers listed in `config`
    pub fn new(mut driver: D, config: Config) -> Result<Self> {
        for spec in &config.servers {
            registry::add_server(&mut driver, spec)?;
        }
        Ok(Self { driver, config })
    }

    // =========================================================================
    // Storage
    // =========================================================================

    /// Store a value unconditionally
    pub fn set(&mut self, key: &[u8], value: impl Into<Value>, expiration: u32) -> Result<()> {
        let code = self.store_value(StoreMode::Set, key, &value.into(), expiration)?;
        self.expect_success(code)
    }

    /// Store a value only if the key is absent. `Ok(false)` on collision.
    pub fn add(&mut self, key: &[u8], value: impl Into<Value>, expiration: u32) -> Result<bool> {
        match self.store_value(StoreMode::Add, key, &value.into(), expiration)? {
            code if code.is_success() => Ok(true),
            ReturnCode::NotStored => Ok(false),
            code => Err(self.driver_error(code)),
        }
    }

    /// Store a value only if the key exists. `Ok(false)` when it does not.
    pub fn replace(&mut self, key: &[u8], value: impl Into<Value>, expiration: u32) -> Result<bool> {
        match self.store_value(StoreMode::Replace, key, &value.into(), expiration)? {
            code if code.is_success() => Ok(true),
            ReturnCode::NotStored | ReturnCode::NotFound => Ok(false),
            code => Err(self.driver_error(code)),
        }
    }

    /// Concatenate raw bytes after the stored bytes.
    ///
    /// The bytes bypass the codec, so the stored item should be raw.
    pub fn append(&mut self, key: &[u8], data: &[u8]) -> Result<()> {
        self.concat(StoreMode::Append, key, data)
    }

    /// Concatenate raw bytes before the stored bytes
    pub fn prepend(&mut self, key: &[u8], data: &[u8]) -> Result<()> {
        self.concat(StoreMode::Prepend, key, data)
    }

    /// Store a structured object as a `Generic` value
    pub fn set_object<T: Serializable>(&mut self, key: &[u8], object: &T, expiration: u32) -> Result<()> {
        let value = Value::from_object(object)?;
        self.set(key, value, expiration)
    }

    // =========================================================================
    // Retrieval
    // =========================================================================

    /// Fetch and decode one value. A missing key is a `NotFound` driver error.
    pub fn get(&mut self, key: &[u8]) -> Result<Value> {
        self.check(key)?;
        match self.driver.fetch(key) {
            Ok(item) => codec::decode(item.value, item.flags),
            Err(code) => Err(self.driver_error(code)),
        }
    }

    /// Fetch a structured object stored with `set_object`
    pub fn get_object<T: Serializable>(&mut self, key: &[u8]) -> Result<T> {
        self.get(key)?.into_object()
    }

    /// Fetch many keys in one request. Missing keys are left out.
    pub fn get_multi<K: AsRef<[u8]>>(&mut self, keys: &[K]) -> Result<HashMap<Vec<u8>, Value>> {
        Ok(self.fetch_multi(keys)?.values)
    }

    /// Like `get_multi`, also reporting keys whose payload failed to decode
    pub fn fetch_multi<K: AsRef<[u8]>>(&mut self, keys: &[K]) -> Result<FetchResult> {
        BatchFetch::new(keys).run(&mut self.driver, &self.config)
    }

    // =========================================================================
    // Removal
    // =========================================================================

    /// Remove a key. `Ok(false)` when it was not there.
    pub fn delete(&mut self, key: &[u8], expiration: u32) -> Result<bool> {
        self.check(key)?;
        match self.driver.delete(key, expiration) {
            code if code.is_success() => {
                tracing::debug!("Deleted {:?}", String::from_utf8_lossy(key));
                Ok(true)
            }
            ReturnCode::NotFound => Ok(false),
            code => Err(self.driver_error(code)),
        }
    }

    /// Invalidate every key on every server after `expiration`
    pub fn flush_all(&mut self, expiration: u32) {
        tracing::info!("Flushing all servers (delay {}s)", expiration);
        self.driver.flush(expiration);
    }

    // =========================================================================
    // Counters
    // =========================================================================

    /// Add `offset` to a decimal counter and return the new value
    pub fn incr(&mut self, key: &[u8], offset: u64) -> Result<u64> {
        self.check(key)?;
        self.driver
            .increment(key, offset)
            .map_err(|code| self.driver_error(code))
    }

    /// Subtract `offset` from a decimal counter (floored at zero)
    pub fn decr(&mut self, key: &[u8], offset: u64) -> Result<u64> {
        self.check(key)?;
        self.driver
            .decrement(key, offset)
            .map_err(|code| self.driver_error(code))
    }

    // =========================================================================
    // Servers
    // =========================================================================

    /// Add servers from a spec such as "10.0.0.1:11211,10.0.0.2"
    pub fn add_server(&mut self, spec: &str) -> Result<usize> {
        registry::add_server(&mut self.driver, spec)
    }

    pub fn servers(&self) -> Vec<ServerEndpoint> {
        self.driver.servers()
    }

    /// Stats of every reachable server, keyed by "host:port"
    pub fn stats(&mut self) -> StatsTable {
        registry::collect_stats(&mut self.driver)
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }

    pub fn into_driver(self) -> D {
        self.driver
    }

    // =========================================================================
    // Internal
    // =========================================================================

    fn check(&self, key: &[u8]) -> Result<()> {
        check_key(key, self.config.max_key_length, self.config.verify_key)
    }

    fn store_value(
        &mut self,
        mode: StoreMode,
        key: &[u8],
        value: &Value,
        expiration: u32,
    ) -> Result<ReturnCode> {
        self.check(key)?;
        let encoded = codec::encode(value);
        let code = self
            .driver
            .store(mode, key, &encoded.payload, encoded.flags, expiration);
        tracing::debug!(
            "{} {:?} ({}, {} bytes): {}",
            mode.as_str(),
            String::from_utf8_lossy(key),
            value.tag(),
            encoded.payload.len(),
            code
        );
        Ok(code)
    }

    fn concat(&mut self, mode: StoreMode, key: &[u8], data: &[u8]) -> Result<()> {
        self.check(key)?;
        let code = self.driver.store(mode, key, data, 0, NO_EXPIRATION);
        self.expect_success(code)
    }

    fn expect_success(&self, code: ReturnCode) -> Result<()> {
        if code.is_success() {
            Ok(())
        } else {
            Err(self.driver_error(code))
        }
    }

    fn driver_error(&self, code: ReturnCode) -> CacheError {
        CacheError::Driver {
            code,
            message: self.driver.message(code),
        }
    }
}
