// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! YAML channel configuration with strict validation.
//!
//! Lists the rings a deployment uses and how tools should wait for their
//! locks. Any invalid field is rejected at load time.

use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{ConfigError, ShmringError, ShmringResult};
use crate::shm::MIN_RING_SIZE;
use crate::types::{AccessMode, SegmentName};

/// Largest ring a configuration may declare (1 GB).
pub const MAX_RING_SIZE: usize = 1024 * 1024 * 1024;

/// Raw lock settings as parsed from YAML.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawLockConfig {
    #[serde(default = "default_timeout_ms")]
    timeout_ms: u64,
    #[serde(default = "default_poll_interval_ms")]
    poll_interval_ms: u64,
}

fn default_timeout_ms() -> u64 {
    1000
}

fn default_poll_interval_ms() -> u64 {
    5
}

impl Default for RawLockConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

/// Raw channel entry.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawChannelConfig {
    name: String,
    size: usize,
    #[serde(default = "default_open_if_exists")]
    open_if_exists: bool,
    #[serde(default)]
    mode: AccessMode,
    #[serde(default)]
    unlink_on_close: bool,
}

fn default_open_if_exists() -> bool {
    true
}

/// Raw root configuration file.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    #[serde(default)]
    lock: RawLockConfig,
    channels: Vec<RawChannelConfig>,
}

/// Validated lock-wait settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockConfig {
    /// Bounded wait for tools polling `try_lock`. `None` blocks in `lock`.
    pub timeout: Option<Duration>,
    pub poll_interval: Duration,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            timeout: Some(Duration::from_millis(default_timeout_ms())),
            poll_interval: Duration::from_millis(default_poll_interval_ms()),
        }
    }
}

/// Validated channel configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelConfig {
    pub name: SegmentName,
    pub size: usize,
    pub open_if_exists: bool,
    pub mode: AccessMode,
    pub unlink_on_close: bool,
}

/// Complete validated configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub lock: LockConfig,
    pub channels: Vec<ChannelConfig>,
}

impl Config {
    /// Look up a channel by name.
    pub fn channel(&self, name: &str) -> Option<&ChannelConfig> {
        self.channels.iter().find(|c| c.name.as_str() == name)
    }
}

/// Configuration loader with strict validation.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load and validate configuration from a YAML file.
    pub fn load_file(path: impl AsRef<Path>) -> ShmringResult<Config> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ShmringError::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| ShmringError::Io {
            context: "reading config file",
            source: e,
        })?;

        Self::load_string(&content)
    }

    /// Load and validate configuration from a YAML string.
    pub fn load_string(content: &str) -> ShmringResult<Config> {
        let raw: RawConfig =
            serde_yaml::from_str(content).map_err(|e| ShmringError::ConfigParse {
                message: format!("YAML parse error: {}", e),
            })?;

        Ok(Self::validate(raw)?)
    }

    fn validate(raw: RawConfig) -> Result<Config, ConfigError> {
        let lock = Self::validate_lock(raw.lock)?;

        let mut channels = Vec::with_capacity(raw.channels.len());
        let mut seen = HashSet::new();

        for raw_channel in raw.channels {
            let channel = Self::validate_channel(raw_channel)?;
            if !seen.insert(channel.name.clone()) {
                return Err(ConfigError::DuplicateChannel {
                    name: channel.name.to_string(),
                });
            }
            channels.push(channel);
        }

        if channels.is_empty() {
            return Err(ConfigError::SchemaValidation {
                message: "At least one channel must be defined".to_string(),
            });
        }

        Ok(Config { lock, channels })
    }

    fn validate_lock(raw: RawLockConfig) -> Result<LockConfig, ConfigError> {
        if raw.poll_interval_ms == 0 {
            return Err(ConfigError::InvalidFieldValue {
                field: "poll_interval_ms",
                value: raw.poll_interval_ms.to_string(),
                reason: "Poll interval must be at least 1ms".to_string(),
            });
        }

        if raw.timeout_ms > 0 && raw.poll_interval_ms > raw.timeout_ms {
            return Err(ConfigError::InvalidFieldValue {
                field: "poll_interval_ms",
                value: raw.poll_interval_ms.to_string(),
                reason: format!("Must not exceed timeout_ms ({})", raw.timeout_ms),
            });
        }

        Ok(LockConfig {
            timeout: (raw.timeout_ms > 0).then(|| Duration::from_millis(raw.timeout_ms)),
            poll_interval: Duration::from_millis(raw.poll_interval_ms),
        })
    }

    fn validate_channel(raw: RawChannelConfig) -> Result<ChannelConfig, ConfigError> {
        let name = SegmentName::new(raw.name)?;

        if !(MIN_RING_SIZE..=MAX_RING_SIZE).contains(&raw.size) {
            return Err(ConfigError::SizeOutOfBounds {
                size: raw.size,
                min: MIN_RING_SIZE,
                max: MAX_RING_SIZE,
            });
        }

        Ok(ChannelConfig {
            name,
            size: raw.size,
            open_if_exists: raw.open_if_exists,
            mode: raw.mode,
            unlink_on_close: raw.unlink_on_close,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_with_defaults() {
        let config = ConfigLoader::load_string(
            r#"
channels:
  - name: chan1
    size: 1024
"#,
        )
        .unwrap();

        assert_eq!(config.lock, LockConfig::default());
        let chan = config.channel("chan1").unwrap();
        assert_eq!(chan.size, 1024);
        assert!(chan.open_if_exists);
        assert_eq!(chan.mode, AccessMode::ReadWrite);
        assert!(!chan.unlink_on_close);
        assert!(config.channel("chan2").is_none());
    }

    #[test]
    fn test_load_full() {
        let config = ConfigLoader::load_string(
            r#"
lock:
  timeout_ms: 0
  poll_interval_ms: 2
channels:
  - name: requests
    size: 65536
    open_if_exists: false
    unlink_on_close: true
  - name: replies
    size: 65536
    mode: read_only
"#,
        )
        .unwrap();

        assert_eq!(config.lock.timeout, None);
        assert_eq!(config.lock.poll_interval, Duration::from_millis(2));
        assert_eq!(config.channels.len(), 2);
        assert_eq!(config.channels[1].mode, AccessMode::ReadOnly);
        assert!(config.channels[0].unlink_on_close);
    }

    #[test]
    fn test_rejects_invalid() {
        let cases = [
            "channels: []",
            "channels:\n  - name: a\n    size: 10",
            "channels:\n  - name: 'bad name'\n    size: 1024",
            "channels:\n  - name: a\n    size: 1024\n  - name: a\n    size: 2048",
            "lock:\n  poll_interval_ms: 0\nchannels:\n  - name: a\n    size: 1024",
            "lock:\n  timeout_ms: 5\n  poll_interval_ms: 10\nchannels:\n  - name: a\n    size: 1024",
            "channels:\n  - name: a\n    size: 1024\n    colour: blue",
        ];

        for case in cases {
            assert!(ConfigLoader::load_string(case).is_err(), "accepted: {}", case);
        }
    }
}
