// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Shared Memory IPC module.
//!
//! [`Segment`] owns a named mapping and its robust lock; [`RingChannel`]
//! composes a segment and interprets it as a byte ring.

pub mod cursor;
mod guard;
mod ring_channel;
mod segment;

pub use guard::SegmentGuard;
pub use ring_channel::{ChannelGuard, RingChannel, RingStats, HEADER_SIZE, MIN_RING_SIZE};
pub use segment::Segment;
