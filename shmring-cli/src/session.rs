// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Shared plumbing for commands: configuration, attaching to rings and
//! bounded lock acquisition.

use std::path::Path;
use std::time::Instant;

use shmring_core::{
    AccessMode, ChannelConfig, ChannelGuard, Config, ConfigLoader, LockConfig, RingChannel,
};

use crate::error::CliError;

/// Configuration in effect for one CLI invocation.
pub struct Session {
    config_path: String,
    config: Option<Config>,
    lock: LockConfig,
}

impl Session {
    /// Load `path` if it exists. A missing file is not an error; an invalid
    /// one is.
    pub fn load(path: &str) -> Result<Self, CliError> {
        let config = if Path::new(path).exists() {
            let config = ConfigLoader::load_file(path)?;
            tracing::debug!(path = %path, channels = config.channels.len(), "Loaded configuration");
            Some(config)
        } else {
            tracing::debug!(path = %path, "No configuration file, using defaults");
            None
        };

        let lock = config.as_ref().map(|c| c.lock).unwrap_or_default();

        Ok(Self {
            config_path: path.to_string(),
            config,
            lock,
        })
    }

    pub fn config(&self) -> Result<&Config, CliError> {
        self.config.as_ref().ok_or_else(|| CliError::NoConfig {
            path: self.config_path.clone(),
        })
    }

    pub fn channel(&self, name: &str) -> Option<&ChannelConfig> {
        self.config.as_ref().and_then(|c| c.channel(name))
    }

    /// Attach to `name` and map it. Configured channels are created on
    /// demand; anything else must already exist.
    ///
    /// A channel configured read-only is always mapped read-only.
    pub fn attach(&self, name: &str, mode: AccessMode) -> Result<RingChannel, CliError> {
        let mut ring = RingChannel::new();

        let mode = match self.channel(name) {
            Some(channel) => {
                let outcome = ring.create(name, channel.size, channel.open_if_exists)?;
                tracing::debug!(name = %name, outcome = %outcome, "Attached configured channel");
                if channel.mode.is_writable() {
                    mode
                } else {
                    AccessMode::ReadOnly
                }
            }
            None => {
                ring.open(name)?;
                mode
            }
        };

        ring.map(mode, 0)?;
        Ok(ring)
    }

    /// Take the ring's lock, polling `try_lock` when a timeout is configured.
    pub async fn acquire<'a>(&self, ring: &'a RingChannel) -> Result<ChannelGuard<'a>, CliError> {
        let Some(timeout) = self.lock.timeout else {
            return Ok(ring.lock()?);
        };

        let started = Instant::now();
        loop {
            if let Some(guard) = ring.try_lock()? {
                return Ok(guard);
            }
            if started.elapsed() >= timeout {
                return Err(CliError::LockTimeout {
                    name: ring
                        .name()
                        .map(|n| n.to_string())
                        .unwrap_or_default(),
                    waited_ms: started.elapsed().as_millis(),
                });
            }
            tokio::time::sleep(self.lock.poll_interval).await;
        }
    }
}

/// Report an abandoned acquisition, clearing the ring only when asked to.
pub fn handle_abandoned(guard: &ChannelGuard<'_>, reset: bool) -> Result<(), CliError> {
    if !guard.is_abandoned() {
        return Ok(());
    }

    if reset {
        guard.clear()?;
        tracing::warn!("Lock was abandoned by a dead holder; ring cleared");
    } else {
        tracing::warn!(
            "Lock was abandoned by a dead holder; ring content may be inconsistent \
             (pass --reset-abandoned to clear it)"
        );
    }

    Ok(())
}
