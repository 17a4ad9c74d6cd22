//! Chunked cache configuration with precedence and validation
//!
//! Values resolve as defaults, then the JSON config file, then `FRAGCACHE_*`
//! environment variables.

use crate::chunking::MIN_FRAGMENT_BYTES;
use fragcache_core::{CacheError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default time-to-live of every metadata and fragment write
pub const DEFAULT_REVALIDATE: Duration = Duration::from_secs(3600);

/// Default fragment bound (1 MiB)
pub const DEFAULT_MAX_FRAGMENT_BYTES: usize = 1024 * 1024;

pub const ENV_REVALIDATE_SECS: &str = "FRAGCACHE_REVALIDATE_SECS";
pub const ENV_MAX_FRAGMENT_BYTES: &str = "FRAGCACHE_MAX_FRAGMENT_BYTES";
pub const ENV_SINGLE_FLIGHT: &str = "FRAGCACHE_SINGLE_FLIGHT";

/// Settings for one [`ChunkedCache`](crate::ChunkedCache)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkedCacheConfig {
    /// TTL handed to the store with each write
    pub revalidate: Duration,
    /// Largest fragment in bytes
    pub max_fragment_bytes: usize,
    /// Serialise concurrent misses on the same instance
    pub single_flight: bool,
}

impl Default for ChunkedCacheConfig {
    fn default() -> Self {
        Self {
            revalidate: DEFAULT_REVALIDATE,
            max_fragment_bytes: DEFAULT_MAX_FRAGMENT_BYTES,
            single_flight: false,
        }
    }
}

impl ChunkedCacheConfig {
    /// Check the bound against itself and against the store's entry ceiling
    ///
    /// The ceiling must be strictly larger than the fragment bound.
    pub fn validate(&self, store_ceiling: Option<usize>) -> Result<()> {
        if self.max_fragment_bytes < MIN_FRAGMENT_BYTES {
            return Err(CacheError::configuration(format!(
                "max_fragment_bytes must be at least {MIN_FRAGMENT_BYTES}, got {}",
                self.max_fragment_bytes
            )));
        }

        if let Some(ceiling) = store_ceiling {
            if self.max_fragment_bytes >= ceiling {
                return Err(CacheError::configuration(format!(
                    "max_fragment_bytes ({}) must be below the store entry ceiling ({ceiling})",
                    self.max_fragment_bytes
                )));
            }
        }

        if self.revalidate.is_zero() {
            return Err(CacheError::configuration(
                "revalidate must be greater than zero",
            ));
        }

        Ok(())
    }
}

/// Source of configuration for debugging and precedence tracking
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    Default,
    ConfigFile(PathBuf),
    EnvironmentVariable(String),
}

/// Partially specified configuration as found in a file or the environment
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartialConfig {
    #[serde(default)]
    pub revalidate_secs: Option<u64>,
    #[serde(default)]
    pub max_fragment_bytes: Option<usize>,
    #[serde(default)]
    pub single_flight: Option<bool>,
}

impl PartialConfig {
    fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    fn apply_to(self, config: &mut ChunkedCacheConfig) {
        if let Some(secs) = self.revalidate_secs {
            config.revalidate = Duration::from_secs(secs);
        }
        if let Some(bytes) = self.max_fragment_bytes {
            config.max_fragment_bytes = bytes;
        }
        if let Some(single_flight) = self.single_flight {
            config.single_flight = single_flight;
        }
    }
}

#[derive(Debug, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    cache: PartialConfig,
}

/// Resolved configuration and the highest-precedence source that touched it
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: ChunkedCacheConfig,
    pub source: ConfigSource,
}

/// Configuration loader that handles precedence
pub struct ChunkedCacheConfigLoader;

impl ChunkedCacheConfigLoader {
    /// Load from the default config file location and the environment
    pub fn load() -> Result<LoadedConfig> {
        let path = Self::config_file_path()?;
        Self::load_with_file(&path)
    }

    /// Load using `path` as the config file (missing files are skipped)
    pub fn load_with_file(path: &Path) -> Result<LoadedConfig> {
        let mut config = ChunkedCacheConfig::default();
        let mut source = ConfigSource::Default;

        if let Some(file_config) = Self::load_from_file(path)? {
            file_config.apply_to(&mut config);
            source = ConfigSource::ConfigFile(path.to_path_buf());
        }

        if let Some(env_config) = Self::load_from_env()? {
            env_config.apply_to(&mut config);
            source = ConfigSource::EnvironmentVariable("FRAGCACHE_*".to_string());
        }

        tracing::debug!(?config, ?source, "Loaded chunked cache configuration");
        Ok(LoadedConfig { config, source })
    }

    /// Read the `cache` section of a JSON config file
    pub fn load_from_file(path: &Path) -> Result<Option<PartialConfig>> {
        if !path.exists() {
            return Ok(None);
        }

        let content =
            std::fs::read_to_string(path).map_err(|e| CacheError::io(path, "read config file", e))?;
        let file: ConfigFile = serde_json::from_str(&content).map_err(|e| {
            CacheError::configuration(format!("invalid config file '{}': {e}", path.display()))
        })?;

        Ok(Some(file.cache))
    }

    /// Read `FRAGCACHE_*` environment variables
    pub fn load_from_env() -> Result<Option<PartialConfig>> {
        let partial = PartialConfig {
            revalidate_secs: parse_env(ENV_REVALIDATE_SECS)?,
            max_fragment_bytes: parse_env(ENV_MAX_FRAGMENT_BYTES)?,
            single_flight: parse_env(ENV_SINGLE_FLIGHT)?,
        };

        Ok((!partial.is_empty()).then_some(partial))
    }

    /// `$XDG_CONFIG_HOME/fragcache/config.json`, falling back to the platform config dir
    pub fn config_file_path() -> Result<PathBuf> {
        let config_dir = match std::env::var_os("XDG_CONFIG_HOME") {
            Some(dir) => PathBuf::from(dir),
            None => dirs::config_dir().ok_or_else(|| {
                CacheError::configuration("Could not determine config directory")
            })?,
        };

        Ok(config_dir.join("fragcache").join("config.json"))
    }
}

fn parse_env<V>(name: &str) -> Result<Option<V>>
where
    V: std::str::FromStr,
    V::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .to_lowercase()
            .parse::<V>()
            .map(Some)
            .map_err(|e| CacheError::configuration(format!("{name}={raw:?}: {e}"))),
        Err(_) => Ok(None),
    }
}
