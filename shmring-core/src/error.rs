// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Custom error types for shmring.
//!
//! Explicit enum error types per concern. No `Box<dyn Error>`, no
//! `anyhow::Result` in the library - every failure is strongly typed and
//! returned to the immediate caller. Nothing here retries.

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type for the shmring library.
#[derive(Debug, Error)]
pub enum ShmringError {
    // =========================================================================
    // Configuration Errors - Fail-Fast on Invalid Config
    // =========================================================================
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: PathBuf },

    #[error("Configuration parse error: {message}")]
    ConfigParse { message: String },

    // =========================================================================
    // Shared Memory Errors
    // =========================================================================
    #[error("Segment error: {0}")]
    Segment(#[from] SegmentError),

    #[error("Ring channel error: {0}")]
    Channel(#[from] ChannelError),

    // =========================================================================
    // System Errors
    // =========================================================================
    #[error("IO error: {context} - {source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },
}

/// Validation errors for names, sizes and configuration values.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid field value: {field} = {value} - {reason}")]
    InvalidFieldValue {
        field: &'static str,
        value: String,
        reason: String,
    },

    #[error("Size out of bounds: {size} bytes (min: {min}, max: {max})")]
    SizeOutOfBounds { size: usize, min: usize, max: usize },

    #[error("Duplicate channel name: {name}")]
    DuplicateChannel { name: String },

    #[error("Schema validation failed: {message}")]
    SchemaValidation { message: String },
}

/// Segment lifecycle and locking errors.
#[derive(Debug, Error)]
pub enum SegmentError {
    #[error("Invalid segment name: {0}")]
    InvalidName(#[from] ConfigError),

    #[error("Segment size must be non-zero")]
    ZeroSize,

    #[error("Segment {name} already exists")]
    AlreadyExists { name: String },

    #[error("Segment {name} does not exist")]
    NotFound { name: String },

    #[error("Segment {name} is {actual} bytes, {requested} requested")]
    SizeMismatch {
        name: String,
        requested: usize,
        actual: usize,
    },

    #[error("Segment {name} was never initialised by its creator")]
    NotInitialized { name: String },

    #[error("Handle is already attached to segment {name}")]
    AlreadyOpen { name: String },

    #[error("Handle is not attached to a segment")]
    NotReady,

    #[error("Segment view is already mapped")]
    AlreadyMapped,

    #[error("Segment view is not mapped")]
    NotMapped,

    #[error("Segment view is mapped read-only")]
    ReadOnly,

    #[error("Access out of bounds: offset {offset} + {len} exceeds {size} bytes")]
    OutOfBounds {
        offset: usize,
        len: usize,
        size: usize,
    },

    #[error("Lock for {name} was never initialised")]
    LockNotInitialized { name: String },

    #[error("Lock is not recoverable")]
    LockNotRecoverable,

    #[error("System call failed: {syscall} on {name} - {source}")]
    Os {
        syscall: &'static str,
        name: String,
        #[source]
        source: std::io::Error,
    },
}

impl SegmentError {
    /// Capture `errno` from the last failed libc call.
    pub(crate) fn last_os(syscall: &'static str, name: &str) -> Self {
        Self::os(syscall, name, std::io::Error::last_os_error())
    }

    pub(crate) fn os(syscall: &'static str, name: &str, source: std::io::Error) -> Self {
        Self::Os {
            syscall,
            name: name.to_string(),
            source,
        }
    }
}

/// Ring channel errors.
#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("Segment error: {0}")]
    Segment(#[from] SegmentError),

    #[error("Ring full - cannot write {size} bytes, {available} free")]
    RingFull { size: usize, available: usize },

    #[error("Ring size {size} leaves no payload room after the {header}-byte header")]
    TooSmall { size: usize, header: usize },

    #[error("Corrupt ring header: {reason}")]
    CorruptHeader { reason: String },
}

/// Result type alias using ShmringError.
pub type ShmringResult<T> = Result<T, ShmringError>;
