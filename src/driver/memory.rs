//! In-memory driver
//!
//! `MemoryCluster` stands in for a pool of memcached servers living in this
//! process. `MemoryDriver` is one client handle onto it: it owns its own
//! server list and key distribution, while the items themselves live in the
//! shared cluster, so several handles see each other's writes.
//!
//! ## Server Semantics
//! - Expiration: 0 = never, up to 30 days = relative seconds, above = unix time
//! - Delete with a hold time blocks `add`/`replace` of that key until it passes
//! - Flush with a delay invalidates everything once the delay elapses
//! - Counters are unsigned 64-bit decimal text; incr wraps, decr stops at 0
//! - Items larger than `MAX_ITEM_SIZE` are refused

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use bytes::Bytes;
use parking_lot::{Mutex, MutexGuard};

use super::{
    parse_server_list, Driver, DriverResult, FetchedItem, ReturnCode, ServerEndpoint, StoreMode,
};
use crate::config::{Config, Distribution, HashKind, MAX_KEY_LENGTH};
use crate::error::{CacheError, Result};
use crate::key::check_key;

/// Largest value a server accepts (1 MB, the memcached default)
pub const MAX_ITEM_SIZE: usize = 1024 * 1024;

/// Expirations above this many seconds are absolute unix times
const RELATIVE_EXPIRATION_LIMIT: u64 = 60 * 60 * 24 * 30;

/// Continuum points per unit of server weight
const POINTS_PER_SERVER: u32 = 100;

const SERVER_VERSION: &str = concat!("typedcache-memory-", env!("CARGO_PKG_VERSION"));

// =============================================================================
// Cluster State
// =============================================================================

#[derive(Debug, Clone)]
struct Item {
    value: Vec<u8>,
    flags: u32,
    /// Absolute unix time, 0 = never
    expires_at: u64,
}

impl Item {
    fn is_live(&self, now: u64) -> bool {
        self.expires_at == 0 || self.expires_at > now
    }
}

#[derive(Debug, Default)]
struct NodeStats {
    total_items: u64,
    cmd_get: u64,
    cmd_set: u64,
    cmd_flush: u64,
    get_hits: u64,
    get_misses: u64,
    delete_hits: u64,
    delete_misses: u64,
    incr_hits: u64,
    incr_misses: u64,
    decr_hits: u64,
    decr_misses: u64,
}

/// One emulated server
#[derive(Debug)]
struct Node {
    items: HashMap<Vec<u8>, Item>,
    holds: HashMap<Vec<u8>, u64>,
    flush_at: Option<u64>,
    started_at: u64,
    down: bool,
    stats: NodeStats,
}

impl Node {
    fn new(now: u64) -> Self {
        Self {
            items: HashMap::new(),
            holds: HashMap::new(),
            flush_at: None,
            started_at: now,
            down: false,
            stats: NodeStats::default(),
        }
    }

    /// Apply a pending delayed flush once its time has come
    fn apply_flush(&mut self, now: u64) {
        if let Some(at) = self.flush_at {
            if now >= at {
                self.items.clear();
                self.flush_at = None;
            }
        }
    }

    /// Live item for `key`, dropping it first if it has expired
    fn live(&mut self, key: &[u8], now: u64) -> Option<&mut Item> {
        let expired = !self.items.get(key)?.is_live(now);
        if expired {
            self.items.remove(key);
            return None;
        }
        self.items.get_mut(key)
    }

    fn held(&mut self, key: &[u8], now: u64) -> bool {
        match self.holds.get(key) {
            Some(&until) if until > now => true,
            Some(_) => {
                self.holds.remove(key);
                false
            }
            None => false,
        }
    }

    fn put(&mut self, key: &[u8], value: &[u8], flags: u32, expires_at: u64) {
        self.items.insert(
            key.to_vec(),
            Item {
                value: value.to_vec(),
                flags,
                expires_at,
            },
        );
        self.stats.total_items += 1;
    }

    fn store(
        &mut self,
        mode: StoreMode,
        key: &[u8],
        value: &[u8],
        flags: u32,
        expires_at: u64,
        now: u64,
    ) -> ReturnCode {
        self.stats.cmd_set += 1;
        match mode {
            StoreMode::Set => {
                self.put(key, value, flags, expires_at);
                ReturnCode::Success
            }
            StoreMode::Add => {
                if self.held(key, now) || self.live(key, now).is_some() {
                    return ReturnCode::NotStored;
                }
                self.put(key, value, flags, expires_at);
                ReturnCode::Success
            }
            StoreMode::Replace => {
                if self.held(key, now) || self.live(key, now).is_none() {
                    return ReturnCode::NotStored;
                }
                self.put(key, value, flags, expires_at);
                ReturnCode::Success
            }
            StoreMode::Append | StoreMode::Prepend => {
                let item = match self.live(key, now) {
                    Some(item) => item,
                    None => return ReturnCode::NotStored,
                };
                if item.value.len() + value.len() > MAX_ITEM_SIZE {
                    return ReturnCode::TooBig;
                }
                if mode == StoreMode::Append {
                    item.value.extend_from_slice(value);
                } else {
                    let mut joined = Vec::with_capacity(item.value.len() + value.len());
                    joined.extend_from_slice(value);
                    joined.extend_from_slice(&item.value);
                    item.value = joined;
                }
                ReturnCode::Success
            }
        }
    }

    fn fetch(&mut self, key: &[u8], now: u64) -> Option<FetchedItem> {
        self.stats.cmd_get += 1;
        let found = self.live(key, now).map(|item| FetchedItem {
            key: key.to_vec(),
            value: Bytes::copy_from_slice(&item.value),
            flags: item.flags,
        });
        if found.is_some() {
            self.stats.get_hits += 1;
        } else {
            self.stats.get_misses += 1;
        }
        found
    }

    fn delete(&mut self, key: &[u8], hold_until: u64, now: u64) -> ReturnCode {
        if self.live(key, now).is_none() {
            self.stats.delete_misses += 1;
            return ReturnCode::NotFound;
        }
        self.items.remove(key);
        if hold_until > now {
            self.holds.insert(key.to_vec(), hold_until);
        }
        self.stats.delete_hits += 1;
        ReturnCode::Success
    }

    fn adjust(&mut self, key: &[u8], offset: u64, increment: bool, now: u64) -> DriverResult<u64> {
        let result = match self.live(key, now) {
            None => Err(ReturnCode::NotFound),
            Some(item) => match parse_counter(&item.value) {
                None => Err(ReturnCode::ClientError),
                Some(current) => {
                    let next = if increment {
                        current.wrapping_add(offset)
                    } else {
                        current.saturating_sub(offset)
                    };
                    item.value = next.to_string().into_bytes();
                    Ok(next)
                }
            },
        };

        let missed = result == Err(ReturnCode::NotFound);
        match (increment, missed) {
            (true, true) => self.stats.incr_misses += 1,
            (true, false) => self.stats.incr_hits += 1,
            (false, true) => self.stats.decr_misses += 1,
            (false, false) => self.stats.decr_hits += 1,
        }
        result
    }

    fn stats_map(&self, now: u64) -> HashMap<String, String> {
        let (curr_items, bytes) = self
            .items
            .iter()
            .filter(|(_, item)| item.is_live(now))
            .fold((0u64, 0u64), |(count, bytes), (key, item)| {
                (count + 1, bytes + (key.len() + item.value.len()) as u64)
            });

        let s = &self.stats;
        let entries: [(&str, String); 21] = [
            ("pid", std::process::id().to_string()),
            ("uptime", now.saturating_sub(self.started_at).to_string()),
            ("time", now.to_string()),
            ("version", SERVER_VERSION.to_string()),
            ("pointer_size", (std::mem::size_of::<usize>() * 8).to_string()),
            ("curr_items", curr_items.to_string()),
            ("total_items", s.total_items.to_string()),
            ("bytes", bytes.to_string()),
            ("limit_maxbytes", (64 * 1024 * 1024u64).to_string()),
            ("threads", "1".to_string()),
            ("cmd_get", s.cmd_get.to_string()),
            ("cmd_set", s.cmd_set.to_string()),
            ("cmd_flush", s.cmd_flush.to_string()),
            ("get_hits", s.get_hits.to_string()),
            ("get_misses", s.get_misses.to_string()),
            ("delete_hits", s.delete_hits.to_string()),
            ("delete_misses", s.delete_misses.to_string()),
            ("incr_hits", s.incr_hits.to_string()),
            ("incr_misses", s.incr_misses.to_string()),
            ("decr_hits", s.decr_hits.to_string()),
            ("decr_misses", s.decr_misses.to_string()),
        ];
        entries
            .into_iter()
            .map(|(name, value)| (name.to_string(), value))
            .collect()
    }
}

#[derive(Debug, Default)]
struct ClusterState {
    nodes: HashMap<String, Node>,
    clock_offset: u64,
}

impl ClusterState {
    fn now(&self) -> u64 {
        unix_now().saturating_add(self.clock_offset)
    }

    /// Reachable node for `label` plus the cluster's current time
    fn node(&mut self, label: &str) -> DriverResult<(&mut Node, u64)> {
        let now = self.now();
        let node = self
            .nodes
            .get_mut(label)
            .ok_or(ReturnCode::HostLookupFailure)?;
        if node.down {
            return Err(ReturnCode::ConnectionFailure);
        }
        node.apply_flush(now);
        Ok((node, now))
    }

    fn ensure_node(&mut self, label: &str) {
        let now = self.now();
        self.nodes
            .entry(label.to_string())
            .or_insert_with(|| Node::new(now));
    }
}

/// Shared in-process server pool
#[derive(Debug, Clone, Default)]
pub struct MemoryCluster {
    inner: Arc<Mutex<ClusterState>>,
}

impl MemoryCluster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cluster time in unix seconds
    pub fn now(&self) -> u64 {
        self.lock().now()
    }

    /// Move the cluster clock forward (expiration, holds and delayed flushes)
    pub fn advance_clock(&self, seconds: u64) {
        let mut state = self.lock();
        state.clock_offset = state.clock_offset.saturating_add(seconds);
    }

    /// Mark a server ("host:port") unreachable or reachable again
    pub fn set_down(&self, label: &str, down: bool) {
        let mut state = self.lock();
        state.ensure_node(label);
        if let Some(node) = state.nodes.get_mut(label) {
            node.down = down;
        }
    }

    /// Number of live items held by one server
    pub fn item_count(&self, label: &str) -> usize {
        let mut state = self.lock();
        let now = state.now();
        match state.nodes.get_mut(label) {
            Some(node) => {
                node.apply_flush(now);
                node.items.values().filter(|item| item.is_live(now)).count()
            }
            None => 0,
        }
    }

    fn lock(&self) -> MutexGuard<'_, ClusterState> {
        self.inner.lock()
    }
}

// =============================================================================
// Driver Handle
// =============================================================================

/// Client handle onto a `MemoryCluster`
pub struct MemoryDriver {
    cluster: MemoryCluster,
    servers: Vec<ServerEndpoint>,
    labels: Vec<String>,
    /// Sorted (point, server index) pairs for consistent distribution
    continuum: Vec<(u32, usize)>,
    distribution: Distribution,
    hash: HashKind,
    /// Reject keys with whitespace or control bytes, as the text protocol would
    verify_key: bool,
    pending: VecDeque<FetchedItem>,
}

impl MemoryDriver {
    /// Open a handle with the distribution settings from `config`.
    ///
    /// The handle starts with an empty pool; `Client::new` adds the
    /// configured servers.
    pub fn connect(cluster: &MemoryCluster, config: &Config) -> Self {
        Self {
            cluster: cluster.clone(),
            servers: Vec::new(),
            labels: Vec::new(),
            continuum: Vec::new(),
            distribution: config.distribution,
            hash: config.hash,
            verify_key: config.verify_key,
            pending: VecDeque::new(),
        }
    }

    pub fn cluster(&self) -> &MemoryCluster {
        &self.cluster
    }

    /// Server that owns `key` under the current pool
    pub fn server_for_key(&self, key: &[u8]) -> Option<&ServerEndpoint> {
        self.pick(key).ok().map(|idx| &self.servers[idx])
    }

    fn pick(&self, key: &[u8]) -> DriverResult<usize> {
        match self.servers.len() {
            0 => Err(ReturnCode::NoServers),
            1 => Ok(0),
            count => {
                let hash = self.hash_key(key);
                match self.distribution {
                    Distribution::Modula => Ok(hash as usize % count),
                    Distribution::Consistent => {
                        let pos = self.continuum.partition_point(|&(point, _)| point < hash);
                        self.continuum
                            .get(pos)
                            .or_else(|| self.continuum.first())
                            .map(|&(_, idx)| idx)
                            .ok_or(ReturnCode::NoServers)
                    }
                }
            }
        }
    }

    fn hash_key(&self, data: &[u8]) -> u32 {
        match self.hash {
            HashKind::Fnv1a32 => fnv1a_32(data),
            HashKind::Crc32 => crc32fast::hash(data),
        }
    }

    /// Continuum for `servers`, or a config error if the point count overflows
    fn build_continuum(&self, servers: &[ServerEndpoint]) -> Result<Vec<(u32, usize)>> {
        let total = servers.iter().try_fold(0usize, |total, server| {
            POINTS_PER_SERVER
                .checked_mul(server.weight)
                .and_then(|points| total.checked_add(points as usize))
        });
        let total = total.ok_or_else(|| {
            CacheError::Config("server weights overflow the continuum".to_string())
        })?;

        let mut continuum = Vec::with_capacity(total);
        for (idx, server) in servers.iter().enumerate() {
            let label = server.label();
            for point in 0..POINTS_PER_SERVER * server.weight {
                let name = format!("{}-{}", label, point);
                continuum.push((self.hash_key(name.as_bytes()), idx));
            }
        }
        continuum.sort_unstable();
        Ok(continuum)
    }

    fn key_ok(&self, key: &[u8]) -> bool {
        check_key(key, MAX_KEY_LENGTH, self.verify_key).is_ok()
    }

    fn with_node<R>(
        &self,
        key: &[u8],
        op: impl FnOnce(&mut Node, u64) -> DriverResult<R>,
    ) -> DriverResult<R> {
        if !self.key_ok(key) {
            return Err(ReturnCode::BadKeyProvided);
        }
        let idx = self.pick(key)?;
        let mut state = self.cluster.lock();
        let (node, now) = state.node(&self.labels[idx])?;
        op(node, now)
    }
}

impl Driver for MemoryDriver {
    fn add_server(&mut self, spec: &str) -> Result<usize> {
        let parsed = parse_server_list(spec)?;

        // The pool only changes once the new continuum is built
        let mut servers = self.servers.clone();
        servers.extend(parsed.iter().cloned());
        let continuum = self.build_continuum(&servers)?;

        {
            let mut state = self.cluster.lock();
            for server in &parsed {
                state.ensure_node(&server.label());
            }
        }

        for server in &parsed {
            tracing::debug!("Adding server {} (weight {})", server, server.weight);
            self.labels.push(server.label());
        }
        self.servers = servers;
        self.continuum = continuum;
        Ok(parsed.len())
    }

    fn store(
        &mut self,
        mode: StoreMode,
        key: &[u8],
        value: &[u8],
        flags: u32,
        expiration: u32,
    ) -> ReturnCode {
        if value.len() > MAX_ITEM_SIZE {
            return ReturnCode::TooBig;
        }
        let result = self.with_node(key, |node, now| {
            let expires_at = absolute_time(expiration, now);
            Ok(node.store(mode, key, value, flags, expires_at, now))
        });
        result.unwrap_or_else(|code| code)
    }

    fn fetch(&mut self, key: &[u8]) -> DriverResult<FetchedItem> {
        self.with_node(key, |node, now| node.fetch(key, now).ok_or(ReturnCode::NotFound))
    }

    fn begin_multi_fetch(&mut self, keys: &[&[u8]]) -> ReturnCode {
        self.pending.clear();
        if self.servers.is_empty() {
            return ReturnCode::NoServers;
        }

        let mut per_server: Vec<Vec<&[u8]>> = vec![Vec::new(); self.servers.len()];
        for &key in keys {
            if !self.key_ok(key) {
                return ReturnCode::BadKeyProvided;
            }
            match self.pick(key) {
                Ok(idx) => per_server[idx].push(key),
                Err(code) => return code,
            }
        }

        // Servers answer one after another, so results come back grouped by
        // server rather than in request order.
        let mut state = self.cluster.lock();
        let (mut asked, mut failed) = (0usize, 0usize);
        for (idx, server_keys) in per_server.iter().enumerate() {
            if server_keys.is_empty() {
                continue;
            }
            asked += 1;
            match state.node(&self.labels[idx]) {
                Ok((node, now)) => {
                    for key in server_keys {
                        if let Some(item) = node.fetch(key, now) {
                            self.pending.push_back(item);
                        }
                    }
                }
                Err(code) => {
                    tracing::debug!("Multi-fetch to {} failed: {}", self.labels[idx], code);
                    failed += 1;
                }
            }
        }

        match failed {
            0 => ReturnCode::Success,
            n if n == asked => ReturnCode::ConnectionFailure,
            _ => ReturnCode::SomeErrors,
        }
    }

    fn next_fetch_result(&mut self) -> Option<FetchedItem> {
        self.pending.pop_front()
    }

    fn delete(&mut self, key: &[u8], expiration: u32) -> ReturnCode {
        let result = self.with_node(key, |node, now| {
            Ok(node.delete(key, absolute_time(expiration, now), now))
        });
        result.unwrap_or_else(|code| code)
    }

    fn flush(&mut self, expiration: u32) {
        let mut state = self.cluster.lock();
        for label in &self.labels {
            if let Ok((node, now)) = state.node(label) {
                node.stats.cmd_flush += 1;
                if expiration == 0 {
                    node.items.clear();
                } else {
                    node.flush_at = Some(absolute_time(expiration, now));
                }
            }
        }
    }

    fn increment(&mut self, key: &[u8], offset: u64) -> DriverResult<u64> {
        self.with_node(key, |node, now| node.adjust(key, offset, true, now))
    }

    fn decrement(&mut self, key: &[u8], offset: u64) -> DriverResult<u64> {
        self.with_node(key, |node, now| node.adjust(key, offset, false, now))
    }

    fn servers(&self) -> Vec<ServerEndpoint> {
        self.servers.clone()
    }

    fn stats_for(&mut self, server: &ServerEndpoint) -> DriverResult<HashMap<String, String>> {
        let mut state = self.cluster.lock();
        let (node, now) = state.node(&server.label())?;
        Ok(node.stats_map(now))
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Convert a protocol expiration into an absolute unix time (0 = never)
fn absolute_time(expiration: u32, now: u64) -> u64 {
    match expiration as u64 {
        0 => 0,
        secs if secs <= RELATIVE_EXPIRATION_LIMIT => now.saturating_add(secs),
        unix => unix,
    }
}

fn parse_counter(value: &[u8]) -> Option<u64> {
    std::str::from_utf8(value).ok()?.trim().parse::<u64>().ok()
}

fn fnv1a_32(data: &[u8]) -> u32 {
    const OFFSET_BASIS: u32 = 0x811c_9dc5;
    const PRIME: u32 = 0x0100_0193;
    data.iter().fold(OFFSET_BASIS, |hash, &byte| {
        (hash ^ byte as u32).wrapping_mul(PRIME)
    })
}
