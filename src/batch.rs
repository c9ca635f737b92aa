//! Batch Fetch Module
//!
//! Multi-get as an explicit state machine.
//!
//! ```text
//!   Idle ──► Validating ──► Requesting ──► Draining ──► Done
//!                │               │
//!                └─ bad key ─────┴─ empty key set / driver error ──► Done
//! ```
//!
//! The number and order of responses is decided by the servers. Draining
//! stops only when the driver reports exhaustion, and keys the cache does
//! not hold never show up in the result.

use std::collections::HashMap;

use crate::codec::{self, Value};
use crate::config::Config;
use crate::driver::{Driver, ReturnCode};
use crate::error::{CacheError, Result};
use crate::key::check_key;

/// Where a batch fetch currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Validating,
    Requesting,
    Draining,
    Done,
}

/// Outcome of a batch fetch
#[derive(Debug, Default)]
pub struct FetchResult {
    /// Decoded values of the keys the cache returned
    pub values: HashMap<Vec<u8>, Value>,

    /// Keys whose payload could not be decoded, with the reason
    pub failures: Vec<(Vec<u8>, CacheError)>,
}

impl FetchResult {
    pub fn get(&self, key: &[u8]) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// A single-use multi-get over a borrowed key set
pub struct BatchFetch<'k> {
    keys: Vec<&'k [u8]>,
    phase: Phase,
    result: FetchResult,
}

impl<'k> BatchFetch<'k> {
    pub fn new<K: AsRef<[u8]>>(keys: &'k [K]) -> Self {
        Self {
            keys: keys.iter().map(|k| k.as_ref()).collect(),
            phase: Phase::Idle,
            result: FetchResult::default(),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Drive the batch from `Idle` to `Done`.
    ///
    /// A batch runs once; calling `run` again is an `InvalidState` error.
    pub fn run<D: Driver>(&mut self, driver: &mut D, config: &Config) -> Result<FetchResult> {
        if self.phase != Phase::Idle {
            return Err(CacheError::InvalidState(format!(
                "batch fetch already ran (phase {:?})",
                self.phase
            )));
        }

        let outcome = self.advance(driver, config);
        self.phase = Phase::Done;
        outcome?;
        Ok(std::mem::take(&mut self.result))
    }

    fn advance<D: Driver>(&mut self, driver: &mut D, config: &Config) -> Result<()> {
        self.phase = Phase::Validating;
        self.validate(config)?;

        self.phase = Phase::Requesting;
        if !self.request(driver)? {
            return Ok(());
        }

        self.phase = Phase::Draining;
        self.drain(driver);
        Ok(())
    }

    /// Every key must pass before anything is sent
    fn validate(&self, config: &Config) -> Result<()> {
        for (idx, key) in self.keys.iter().enumerate() {
            check_key(key, config.max_key_length, config.verify_key).map_err(|e| match e {
                CacheError::InvalidKey(reason) => {
                    CacheError::InvalidKey(format!("key #{} in batch: {}", idx, reason))
                }
                other => other,
            })?;
        }
        Ok(())
    }

    /// Issue the multi-key request. Returns false when there is nothing to drain.
    fn request<D: Driver>(&self, driver: &mut D) -> Result<bool> {
        if self.keys.is_empty() {
            tracing::trace!("Empty batch, skipping request");
            return Ok(false);
        }

        match driver.begin_multi_fetch(&self.keys) {
            code if code.is_success() => Ok(true),
            ReturnCode::SomeErrors => {
                tracing::warn!(
                    "Multi-fetch of {} keys reached only part of the pool",
                    self.keys.len()
                );
                Ok(true)
            }
            code => Err(CacheError::Driver {
                code,
                message: driver.message(code),
            }),
        }
    }

    fn drain<D: Driver>(&mut self, driver: &mut D) {
        let mut received = 0usize;
        while let Some(item) = driver.next_fetch_result() {
            received += 1;
            match codec::decode(item.value, item.flags) {
                Ok(value) => {
                    tracing::trace!("Fetched {:?}", String::from_utf8_lossy(&item.key));
                    self.result.values.insert(item.key, value);
                }
                Err(err) => {
                    tracing::warn!(
                        "Dropping undecodable value for {:?}: {}",
                        String::from_utf8_lossy(&item.key),
                        err
                    );
                    self.result.failures.push((item.key, err));
                }
            }
        }
        tracing::debug!(
            "Batch fetch of {} keys: {} responses, {} decoded",
            self.keys.len(),
            received,
            self.result.values.len()
        );
    }
}
