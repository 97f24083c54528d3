//! # Configuration
//!
//! firegram keeps configuration as a flat string key/value store, the same
//! shape a hosted project's web config has. Applications layer values however
//! they like: defaults in code, then environment overrides.
//!
//! ## Setting and reading values
//! ```rust
//! use gram_core::GramConfig;
//! let mut config = GramConfig::new();
//!
//! config.set("storage.bucket", "firegram-7d25b.appspot.com");
//! config.set("storage.chunk_size", "65536");
//!
//! let snapshot = config.snapshot();
//! assert_eq!(snapshot.get("storage.bucket"), Some("firegram-7d25b.appspot.com"));
//! assert_eq!(snapshot.get_u64("storage.chunk_size"), Some(65536));
//! ```
//!
//! ## Environment overrides
//! [`GramConfig::load_env`] maps prefixed variables onto dotted keys:
//!
//! ```bash
//! export FIREGRAM__STORAGE__BUCKET=my-bucket.appspot.com   # → storage.bucket
//! ```

use std::collections::HashMap;

/// Prefix read by [`GramConfig::from_env`]
pub const ENV_PREFIX: &str = "FIREGRAM__";

#[derive(Debug, Default)]
pub struct GramConfig {
    values: HashMap<String, String>,
}

impl GramConfig {
    /// Create an empty config store.
    pub fn new() -> Self {
        Self {
            values: HashMap::new(),
        }
    }

    /// A store seeded from `FIREGRAM__*` environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::new();
        config.load_env(ENV_PREFIX);
        config
    }

    /// Set a configuration key to a string value.
    pub fn set<K, V>(&mut self, key: K, value: V)
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.values.insert(key.into(), value.into());
    }

    /// Get a configuration value by key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(|s| s.as_str())
    }

    /// Check whether a key is present.
    pub fn has(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Copy every `{prefix}A__B` variable into key `a.b`. Returns how many were read.
    pub fn load_env(&mut self, prefix: &str) -> usize {
        self.load_pairs(prefix, std::env::vars())
    }

    fn load_pairs<I>(&mut self, prefix: &str, vars: I) -> usize
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut loaded = 0;
        for (key, value) in vars {
            if let Some(stripped) = key.strip_prefix(prefix) {
                let normalized = stripped.to_lowercase().replace("__", ".");
                self.set(normalized, value);
                loaded += 1;
            }
        }
        loaded
    }

    pub fn snapshot(&self) -> GramConfigSnapshot {
        GramConfigSnapshot::new(self.values.clone())
    }
}

#[derive(Debug, Clone, Default)]
pub struct GramConfigSnapshot {
    map: HashMap<String, String>,
}

impl GramConfigSnapshot {
    pub(crate) fn new(map: HashMap<String, String>) -> Self {
        Self { map }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.map.get(key).map(|s| s.as_str())
    }

    pub fn get_string(&self, key: &str) -> Option<String> {
        self.map.get(key).cloned()
    }

    pub fn get_usize(&self, key: &str) -> Option<usize> {
        self.get(key).and_then(|v| v.parse::<usize>().ok())
    }

    pub fn get_u64(&self, key: &str) -> Option<u64> {
        self.get(key).and_then(|v| v.parse::<u64>().ok())
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(|v| v.parse::<bool>().ok())
    }
}
