//! Simulator configuration
//!
//! Configuration is read from a TOML file with every section optional, then
//! environment overrides are applied.
//!
//! # Configuration hierarchy
//!
//! ```text
//! Priority (high -> low):
//! 1. CLI arguments
//! 2. Environment variables (OSSIM_TICK_MS, OSSIM_IO_BLOCK_MS)
//! 3. Config file (--config ossim.toml)
//! 4. Default values
//! ```
//!
//! # Usage
//!
//! ```rust
//! use ossim::util::config::{load_config_str, MemoryMode};
//!
//! let config = load_config_str("[memory]\nmode = \"paged\"").unwrap();
//! assert_eq!(config.memory.mode, MemoryMode::Paged);
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Environment override for the scheduler period.
pub const ENV_TICK_MS: &str = "OSSIM_TICK_MS";
/// Environment override for the I/O-block delay.
pub const ENV_IO_BLOCK_MS: &str = "OSSIM_IO_BLOCK_MS";

/// Top-level configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct SimConfig {
    /// Memory pool settings
    #[serde(default)]
    pub memory: MemoryConfig,
    /// Paging settings
    #[serde(default)]
    pub paging: PagingConfig,
    /// Background scheduler settings
    #[serde(default)]
    pub scheduler: SchedulerSection,
    /// I/O-block simulation settings
    #[serde(default)]
    pub io: IoConfig,
}

/// Which memory model a simulation runs.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MemoryMode {
    /// Whole-block allocation by strategy
    #[default]
    Contiguous,
    /// Fixed-size pages with page faults
    Paged,
}

/// Memory configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MemoryConfig {
    #[serde(default)]
    pub mode: MemoryMode,
    /// Block sizes for the contiguous pool, in pool order
    #[serde(default = "default_block_sizes")]
    pub block_sizes_kb: Vec<u32>,
}

fn default_block_sizes() -> Vec<u32> {
    vec![100, 150, 200, 250, 300, 350]
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            mode: MemoryMode::Contiguous,
            block_sizes_kb: default_block_sizes(),
        }
    }
}

/// Paging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PagingConfig {
    /// Page size; every paging block has this size
    #[serde(default = "default_page_size")]
    pub page_size_kb: u32,
    /// Number of blocks in the paging pool
    #[serde(default = "default_block_count")]
    pub block_count: usize,
    /// Re-place on-disk pages when blocks are released
    #[serde(default)]
    pub retry_on_release: bool,
}

fn default_page_size() -> u32 {
    50
}

fn default_block_count() -> usize {
    10
}

impl Default for PagingConfig {
    fn default() -> Self {
        Self {
            page_size_kb: 50,
            block_count: 10,
            retry_on_release: false,
        }
    }
}

/// Scheduler configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SchedulerSection {
    /// Tick period in milliseconds
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,
}

fn default_tick_ms() -> u64 {
    1000
}

impl Default for SchedulerSection {
    fn default() -> Self {
        Self { tick_ms: 1000 }
    }
}

impl SchedulerSection {
    #[inline]
    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }
}

/// I/O-block configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IoConfig {
    /// How long a simulated I/O wait keeps a process blocked
    #[serde(default = "default_block_ms")]
    pub block_ms: u64,
}

fn default_block_ms() -> u64 {
    3000
}

impl Default for IoConfig {
    fn default() -> Self {
        Self { block_ms: 3000 }
    }
}

impl IoConfig {
    #[inline]
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.block_ms)
    }
}

impl SimConfig {
    /// Default configuration for the paging model.
    pub fn paged() -> Self {
        let mut config = Self::default();
        config.memory.mode = MemoryMode::Paged;
        config
    }

    /// Reject layouts the simulation cannot run.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.memory.mode {
            MemoryMode::Contiguous => {
                if self.memory.block_sizes_kb.is_empty() {
                    return Err(ConfigError::Invalid(
                        "memory.block_sizes_kb must not be empty".to_string(),
                    ));
                }
                if self.memory.block_sizes_kb.contains(&0) {
                    return Err(ConfigError::Invalid(
                        "memory.block_sizes_kb entries must be positive".to_string(),
                    ));
                }
            }
            MemoryMode::Paged => {
                if self.paging.page_size_kb == 0 {
                    return Err(ConfigError::Invalid(
                        "paging.page_size_kb must be positive".to_string(),
                    ));
                }
                if self.paging.block_count == 0 {
                    return Err(ConfigError::Invalid(
                        "paging.block_count must be positive".to_string(),
                    ));
                }
            }
        }
        if self.scheduler.tick_ms == 0 {
            return Err(ConfigError::Invalid(
                "scheduler.tick_ms must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Apply `OSSIM_*` environment overrides.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(value) = lookup(ENV_TICK_MS) {
            self.scheduler.tick_ms = parse_env(ENV_TICK_MS, &value)?;
        }
        if let Some(value) = lookup(ENV_IO_BLOCK_MS) {
            self.io.block_ms = parse_env(ENV_IO_BLOCK_MS, &value)?;
        }
        Ok(())
    }
}

fn parse_env(
    key: &'static str,
    value: &str,
) -> Result<u64, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Env {
        key,
        value: value.to_string(),
    })
}

/// Parse and validate configuration from TOML text.
pub fn load_config_str(content: &str) -> Result<SimConfig, ConfigError> {
    let config: SimConfig = toml::from_str(content)?;
    config.validate()?;
    Ok(config)
}

/// Load configuration from a file, apply environment overrides, validate.
pub fn load_config(path: &Path) -> Result<SimConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let mut config: SimConfig = toml::from_str(&content)?;
    config.apply_env()?;
    config.validate()?;
    Ok(config)
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Config parse error: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("invalid value `{value}` for {key}")]
    Env { key: &'static str, value: String },
    #[error("invalid configuration: {0}")]
    Invalid(String),
}
