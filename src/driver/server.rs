//! Server endpoints and server-list specs
//!
//! Spec grammar: entries separated by commas or whitespace, each
//! `host[:port[:weight]]`. IPv6 hosts go in brackets: `[::1]:11211`.

use std::fmt;

use serde::Serialize;

use crate::config::DEFAULT_PORT;
use crate::error::{CacheError, Result};

/// Largest weight a server may carry
pub const MAX_SERVER_WEIGHT: u32 = 100;

/// One cache server in the pool
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ServerEndpoint {
    pub host: String,
    pub port: u16,
    /// Relative share of the key space under consistent distribution
    pub weight: u32,
}

impl ServerEndpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            weight: 1,
        }
    }

    pub fn with_weight(mut self, weight: u32) -> Self {
        self.weight = weight.max(1);
        self
    }

    /// "host:port", the key used in stats tables
    pub fn label(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl fmt::Display for ServerEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Parse a server-list spec into endpoints.
///
/// Fails on the first malformed entry; an empty spec is an error.
pub fn parse_server_list(spec: &str) -> Result<Vec<ServerEndpoint>> {
    let servers = spec
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|entry| !entry.is_empty())
        .map(parse_entry)
        .collect::<Result<Vec<_>>>()?;

    if servers.is_empty() {
        return Err(CacheError::Config(format!("empty server spec {:?}", spec)));
    }
    Ok(servers)
}

fn parse_entry(entry: &str) -> Result<ServerEndpoint> {
    let (host, rest) = if let Some(stripped) = entry.strip_prefix('[') {
        let end = stripped
            .find(']')
            .ok_or_else(|| CacheError::Config(format!("unterminated IPv6 host in {:?}", entry)))?;
        let rest = &stripped[end + 1..];
        if !rest.is_empty() && !rest.starts_with(':') {
            return Err(CacheError::Config(format!("unexpected text after host in {:?}", entry)));
        }
        (&stripped[..end], rest.strip_prefix(':').unwrap_or(rest))
    } else {
        match entry.split_once(':') {
            Some((host, rest)) => (host, rest),
            None => (entry, ""),
        }
    };

    if host.is_empty() {
        return Err(CacheError::Config(format!("missing host in {:?}", entry)));
    }

    let fields: Vec<&str> = if rest.is_empty() {
        Vec::new()
    } else {
        rest.split(':').collect()
    };

    let (port, weight) = match fields.as_slice() {
        [] => (DEFAULT_PORT, 1),
        [port] => (parse_number::<u16>(port, "port", entry)?, 1),
        [port, weight] => (
            parse_number::<u16>(port, "port", entry)?,
            parse_number::<u32>(weight, "weight", entry)?,
        ),
        _ => return Err(CacheError::Config(format!("too many fields in {:?}", entry))),
    };

    if port == 0 {
        return Err(CacheError::Config(format!("port must be non-zero in {:?}", entry)));
    }
    if weight == 0 {
        return Err(CacheError::Config(format!("weight must be non-zero in {:?}", entry)));
    }
    if weight > MAX_SERVER_WEIGHT {
        return Err(CacheError::Config(format!(
            "weight {} exceeds {} in {:?}",
            weight, MAX_SERVER_WEIGHT, entry
        )));
    }

    Ok(ServerEndpoint::new(host, port).with_weight(weight))
}

fn parse_number<T: std::str::FromStr>(text: &str, field: &str, entry: &str) -> Result<T> {
    text.parse::<T>()
        .map_err(|_| CacheError::Config(format!("invalid {} {:?} in {:?}", field, text, entry)))
}
