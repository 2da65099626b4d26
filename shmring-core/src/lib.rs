// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! shmring Core Library
//!
//! Low-latency IPC between processes on one Linux machine: named shared
//! memory segments guarded by robust process-shared mutexes, and a
//! single-producer single-consumer byte ring on top of them.
//!
//! ```no_run
//! use shmring_core::{AccessMode, RingChannel};
//!
//! let mut ring = RingChannel::new();
//! ring.create("chan1", 1024, true)?;
//! ring.map(AccessMode::ReadWrite, 0)?;
//!
//! let guard = ring.lock()?;
//! if guard.is_abandoned() {
//!     guard.clear()?;
//! }
//! guard.write(&[0x01, 0x02, 0x03])?;
//! # Ok::<(), shmring_core::ChannelError>(())
//! ```

#[cfg(not(target_os = "linux"))]
compile_error!("shmring requires Linux robust process-shared mutexes");

pub mod config;
pub mod error;
pub mod naming;
mod platform;
pub mod shm;
pub mod types;

// Re-export commonly used types
pub use config::{ChannelConfig, Config, ConfigLoader, LockConfig};
pub use error::{ChannelError, ConfigError, SegmentError, ShmringError, ShmringResult};
pub use naming::{derive_object_names, ObjectNames};
pub use shm::{ChannelGuard, RingChannel, RingStats, Segment, SegmentGuard};
pub use types::{AccessMode, CreateOutcome, LockOutcome, SegmentName};
