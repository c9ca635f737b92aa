//! Configuration for typedcache
//!
//! Centralized client configuration with sensible defaults.

/// Longest key the memcached protocol accepts, in bytes
pub const MAX_KEY_LENGTH: usize = 250;

/// Port assumed when a server spec omits one
pub const DEFAULT_PORT: u16 = 11211;

/// Main configuration for a client handle
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Server Pool
    // -------------------------------------------------------------------------
    /// Server specs added when the client is created, e.g. "10.0.0.1:11211,10.0.0.2"
    pub servers: Vec<String>,

    /// How keys are spread across the pool
    pub distribution: Distribution,

    /// Hash applied to keys before distribution
    pub hash: HashKind,

    // -------------------------------------------------------------------------
    // Key Validation
    // -------------------------------------------------------------------------
    /// Maximum key length in bytes (inclusive)
    pub max_key_length: usize,

    /// Reject keys containing whitespace or control bytes
    pub verify_key: bool,

    // -------------------------------------------------------------------------
    // Expiration
    // -------------------------------------------------------------------------
    /// Expiration used by callers that do not pass one (seconds, 0 = never)
    pub default_expiration: u32,
}

/// Key distribution strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Distribution {
    /// hash % server_count
    Modula,

    /// Continuum of virtual points; adding a server moves few keys
    Consistent,
}

/// Key hash function
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashKind {
    /// 32-bit FNV-1a
    Fnv1a32,

    /// CRC32 (IEEE)
    Crc32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            servers: Vec::new(),
            distribution: Distribution::Consistent,
            hash: HashKind::Fnv1a32,
            max_key_length: MAX_KEY_LENGTH,
            verify_key: true,
            default_expiration: 0,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Add a server spec to the initial pool (may list several servers)
    pub fn server(mut self, spec: impl Into<String>) -> Self {
        self.config.servers.push(spec.into());
        self
    }

    /// Set the key distribution strategy
    pub fn distribution(mut self, distribution: Distribution) -> Self {
        self.config.distribution = distribution;
        self
    }

    /// Set the key hash function
    pub fn hash(mut self, hash: HashKind) -> Self {
        self.config.hash = hash;
        self
    }

    /// Set the maximum key length (clamped to the protocol limit)
    pub fn max_key_length(mut self, len: usize) -> Self {
        self.config.max_key_length = len.min(MAX_KEY_LENGTH);
        self
    }

    /// Enable or disable key content checks
    pub fn verify_key(mut self, verify: bool) -> Self {
        self.config.verify_key = verify;
        self
    }

    /// Set the default expiration (seconds)
    pub fn default_expiration(mut self, seconds: u32) -> Self {
        self.config.default_expiration = seconds;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
