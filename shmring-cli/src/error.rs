// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! CLI error type.

use shmring_core::{ChannelError, ShmringError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Timed out after {waited_ms}ms waiting for the lock on {name}")]
    LockTimeout { name: String, waited_ms: u128 },

    #[error("No size given for {name} and it is not in the configuration")]
    UnknownSize { name: String },

    #[error("No configuration loaded from {path}")]
    NoConfig { path: String },

    #[error("Invalid hex payload: {0}")]
    InvalidHex(#[from] hex::FromHexError),

    #[error("{0}")]
    Channel(#[from] ChannelError),

    #[error("{0}")]
    Shmring(#[from] ShmringError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
