// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Byte ring channel layered on a [`Segment`].
//!
//! Layout of the shared region:
//!
//! ```text
//! [ write: u64 | read: u64 | capacity: u64 ][ capacity payload bytes ]
//! ```
//!
//! The ring does no locking of its own. Every data operation lives on
//! [`ChannelGuard`], which can only be obtained by taking the segment lock,
//! so the "hold the lock first" rule is checked by the compiler.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::error::{ChannelError, SegmentError};
use crate::platform::MappedView;
use crate::shm::cursor::Cursors;
use crate::shm::{Segment, SegmentGuard};
use crate::types::{AccessMode, CreateOutcome, LockOutcome, SegmentName};

/// Ring header stored at the start of the segment.
#[repr(C)]
struct RingHeader {
    /// Next payload offset to write.
    write: AtomicU64,
    /// Next payload offset to read.
    read: AtomicU64,
    /// Payload bytes, fixed at creation.
    capacity: AtomicU64,
}

/// Header size in bytes.
pub const HEADER_SIZE: usize = std::mem::size_of::<RingHeader>();

/// Smallest segment size that leaves room for one payload byte.
pub const MIN_RING_SIZE: usize = HEADER_SIZE + Cursors::MIN_CAPACITY;

fn header(view: &MappedView) -> &RingHeader {
    // SAFETY: views are page aligned and the ring never maps fewer than
    // HEADER_SIZE bytes; atomics make shared access well defined.
    unsafe { &*(view.as_ptr().as_ptr() as *const RingHeader) }
}

fn load_cursors(view: &MappedView) -> Result<Cursors, ChannelError> {
    let header = header(view);
    let write = header.write.load(Ordering::Acquire) as usize;
    let read = header.read.load(Ordering::Acquire) as usize;
    let capacity = header.capacity.load(Ordering::Acquire) as usize;
    let payload = view.len() - HEADER_SIZE;

    if capacity > payload {
        return Err(ChannelError::CorruptHeader {
            reason: format!(
                "capacity {} exceeds the {} mapped payload bytes",
                capacity, payload
            ),
        });
    }

    Cursors::new(write, read, capacity).ok_or_else(|| ChannelError::CorruptHeader {
        reason: format!(
            "write {} / read {} outside capacity {}",
            write, read, capacity
        ),
    })
}

/// Point-in-time view of a ring's fill level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RingStats {
    pub capacity: usize,
    pub pending: usize,
    pub free: usize,
}

impl From<Cursors> for RingStats {
    fn from(c: Cursors) -> Self {
        Self {
            capacity: c.capacity(),
            pending: c.pending(),
            free: c.free(),
        }
    }
}

/// Shared memory segment interpreted as a single-producer, single-consumer
/// byte ring.
#[derive(Debug)]
pub struct RingChannel {
    segment: Segment,
}

impl Default for RingChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl RingChannel {
    pub fn new() -> Self {
        Self {
            segment: Segment::new().with_reserved(HEADER_SIZE),
        }
    }

    /// See [`Segment::with_unlink_on_close`].
    pub fn with_unlink_on_close(self, unlink: bool) -> Self {
        Self {
            segment: self.segment.with_unlink_on_close(unlink),
        }
    }

    /// Create the ring `name` spanning `size` bytes (header included), or
    /// attach to it when `open_if_exists` is set.
    ///
    /// A new ring starts empty with `capacity = size - HEADER_SIZE`. The
    /// header is written before the creator releases the lock.
    pub fn create(
        &mut self,
        name: &str,
        size: usize,
        open_if_exists: bool,
    ) -> Result<CreateOutcome, ChannelError> {
        if size < MIN_RING_SIZE {
            return Err(ChannelError::TooSmall {
                size,
                header: HEADER_SIZE,
            });
        }

        let capacity = (size - HEADER_SIZE) as u64;
        let outcome = self.segment.create_with(name, size, open_if_exists, |view| {
            let header = header(view);
            header.write.store(0, Ordering::Relaxed);
            header.read.store(0, Ordering::Relaxed);
            header.capacity.store(capacity, Ordering::Release);
            Ok(())
        })?;

        Ok(outcome)
    }

    /// Attach to an existing ring.
    pub fn open(&mut self, name: &str) -> Result<(), ChannelError> {
        Ok(self.segment.open(name)?)
    }

    /// Map the ring, `size == 0` for the whole object.
    pub fn map(&mut self, mode: AccessMode, size: usize) -> Result<(), ChannelError> {
        if size != 0 && size < MIN_RING_SIZE {
            return Err(ChannelError::TooSmall {
                size,
                header: HEADER_SIZE,
            });
        }

        self.segment.map(mode, size)?;

        let mapped = self.segment.data_size() + HEADER_SIZE;
        if mapped < MIN_RING_SIZE {
            self.segment.unmap()?;
            return Err(ChannelError::TooSmall {
                size: mapped,
                header: HEADER_SIZE,
            });
        }

        Ok(())
    }

    pub fn unmap(&mut self) -> Result<(), ChannelError> {
        Ok(self.segment.unmap()?)
    }

    pub fn close(&mut self) {
        self.segment.close();
    }

    /// See [`Segment::remove`].
    pub fn remove(name: &str) -> Result<bool, ChannelError> {
        Ok(Segment::remove(name)?)
    }

    /// Block until the lock is held, then expose the ring operations.
    pub fn lock(&self) -> Result<ChannelGuard<'_>, ChannelError> {
        self.segment.view()?;
        let lock = self.segment.lock()?;
        Ok(ChannelGuard {
            channel: self,
            lock,
        })
    }

    /// Like [`lock`](Self::lock) but returns `Ok(None)` instead of waiting.
    pub fn try_lock(&self) -> Result<Option<ChannelGuard<'_>>, ChannelError> {
        self.segment.view()?;
        Ok(self.segment.try_lock()?.map(|lock| ChannelGuard {
            channel: self,
            lock,
        }))
    }

    /// Fill level read without the lock. Advisory only: another process may
    /// change it before the caller acts on it.
    pub fn snapshot(&self) -> Result<RingStats, ChannelError> {
        Ok(load_cursors(self.segment.view()?)?.into())
    }

    pub fn segment(&self) -> &Segment {
        &self.segment
    }

    pub fn name(&self) -> Option<&SegmentName> {
        self.segment.name()
    }

    pub fn is_ready(&self) -> bool {
        self.segment.is_ready()
    }

    pub fn is_mapped(&self) -> bool {
        self.segment.is_mapped()
    }

    /// See [`Segment::is_lock_abandoned`].
    pub fn is_lock_abandoned(&self) -> bool {
        self.segment.is_lock_abandoned()
    }
}

/// Exclusive access to a ring while its lock is held.
#[must_use = "the lock is released as soon as the guard is dropped"]
#[derive(Debug)]
pub struct ChannelGuard<'a> {
    channel: &'a RingChannel,
    lock: SegmentGuard<'a>,
}

impl ChannelGuard<'_> {
    fn view(&self) -> Result<&MappedView, ChannelError> {
        Ok(self.channel.segment.view()?)
    }

    fn writable_view(&self) -> Result<&MappedView, ChannelError> {
        let view = self.view()?;
        if !view.mode().is_writable() {
            return Err(SegmentError::ReadOnly.into());
        }
        Ok(view)
    }

    fn cursors(&self) -> Result<Cursors, ChannelError> {
        load_cursors(self.view()?)
    }

    /// Append `data`. All or nothing: when it does not fit nothing is
    /// written and the cursors do not move.
    pub fn write(&self, data: &[u8]) -> Result<(), ChannelError> {
        let view = self.writable_view()?;
        let cursors = self.cursors()?;

        if data.len() > cursors.free() {
            return Err(ChannelError::RingFull {
                size: data.len(),
                available: cursors.free(),
            });
        }

        for (at, span) in cursors.spans(cursors.write(), data.len()).iter() {
            view.copy_in(HEADER_SIZE + span.start, &data[at..at + span.len])?;
        }

        // Publish only after the payload is in place, so a writer dying
        // mid-copy never exposes torn bytes.
        header(view).write.store(
            cursors.advance(cursors.write(), data.len()) as u64,
            Ordering::Release,
        );

        Ok(())
    }

    /// Move up to `buf.len()` pending bytes into `buf`. Returns the count,
    /// which is zero when the ring is empty.
    pub fn read(&self, buf: &mut [u8]) -> Result<usize, ChannelError> {
        let view = self.writable_view()?;
        let cursors = self.cursors()?;
        let n = self.copy_pending(view, &cursors, buf)?;

        header(view)
            .read
            .store(cursors.advance(cursors.read(), n) as u64, Ordering::Release);

        Ok(n)
    }

    /// Copy up to `buf.len()` pending bytes without consuming them.
    pub fn peek(&self, buf: &mut [u8]) -> Result<usize, ChannelError> {
        let view = self.view()?;
        let cursors = self.cursors()?;
        self.copy_pending(view, &cursors, buf)
    }

    fn copy_pending(
        &self,
        view: &MappedView,
        cursors: &Cursors,
        buf: &mut [u8],
    ) -> Result<usize, ChannelError> {
        let n = buf.len().min(cursors.pending());
        for (at, span) in cursors.spans(cursors.read(), n).iter() {
            view.copy_out(HEADER_SIZE + span.start, &mut buf[at..at + span.len])?;
        }
        Ok(n)
    }

    /// Discard up to `n` pending bytes. Returns how many were dropped.
    pub fn skip(&self, n: usize) -> Result<usize, ChannelError> {
        let view = self.writable_view()?;
        let cursors = self.cursors()?;
        let n = n.min(cursors.pending());

        header(view)
            .read
            .store(cursors.advance(cursors.read(), n) as u64, Ordering::Release);

        Ok(n)
    }

    /// Zero the payload and reset both cursors. Does not validate the old
    /// cursors, so it also recovers a ring left inconsistent by a dead
    /// holder.
    ///
    /// A capacity that does not fit the mapped payload (for instance zero,
    /// left by a creator that died before writing the header) is replaced
    /// with the mapped payload size.
    pub fn clear(&self) -> Result<(), ChannelError> {
        let view = self.writable_view()?;
        self.channel.segment.clear()?;

        let header = header(view);
        let payload = (view.len() - HEADER_SIZE) as u64;
        let capacity = header.capacity.load(Ordering::Acquire);
        if capacity < Cursors::MIN_CAPACITY as u64 || capacity > payload {
            tracing::warn!(
                name = ?self.channel.name(),
                old = capacity,
                new = payload,
                "Restoring ring capacity"
            );
            header.capacity.store(payload, Ordering::Relaxed);
        }
        header.write.store(0, Ordering::Relaxed);
        header.read.store(0, Ordering::Release);

        tracing::debug!(name = ?self.channel.name(), "Cleared ring");
        Ok(())
    }

    /// Bytes waiting to be read.
    pub fn data_to_read(&self) -> Result<usize, ChannelError> {
        Ok(self.cursors()?.pending())
    }

    /// Largest write that currently succeeds.
    pub fn max_to_write(&self) -> Result<usize, ChannelError> {
        Ok(self.cursors()?.free())
    }

    pub fn capacity(&self) -> Result<usize, ChannelError> {
        Ok(self.cursors()?.capacity())
    }

    pub fn is_empty(&self) -> Result<bool, ChannelError> {
        Ok(self.data_to_read()? == 0)
    }

    pub fn is_full(&self) -> Result<bool, ChannelError> {
        Ok(self.max_to_write()? == 0)
    }

    pub fn stats(&self) -> Result<RingStats, ChannelError> {
        Ok(self.cursors()?.into())
    }

    /// How this acquisition was granted.
    pub fn outcome(&self) -> LockOutcome {
        self.lock.outcome()
    }

    /// Whether the previous holder died while holding the lock. The ring
    /// is left as it was; call [`clear`](Self::clear) to reset it.
    pub fn is_abandoned(&self) -> bool {
        self.lock.is_abandoned()
    }

    /// Release the lock now, reporting failure.
    pub fn unlock(self) -> Result<(), ChannelError> {
        Ok(self.lock.unlock()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ring(tag: &str, size: usize) -> RingChannel {
        let name = format!("ring-{}-{}", tag, std::process::id());
        let mut ring = RingChannel::new().with_unlink_on_close(true);
        assert_eq!(ring.create(&name, size, false).unwrap(), CreateOutcome::CreatedNew);
        ring.map(AccessMode::ReadWrite, 0).unwrap();
        ring
    }

    #[test]
    fn test_header_size() {
        assert_eq!(HEADER_SIZE, 24);
    }

    #[test]
    fn test_new_ring_is_empty() {
        let ring = ring("empty", 1024);
        let guard = ring.lock().unwrap();
        assert_eq!(guard.capacity().unwrap(), 1024 - HEADER_SIZE);
        assert_eq!(guard.data_to_read().unwrap(), 0);
        assert_eq!(guard.max_to_write().unwrap(), 1024 - HEADER_SIZE - 1);
        assert!(guard.is_empty().unwrap());
    }

    #[test]
    fn test_write_read_roundtrip() {
        let ring = ring("roundtrip", 1024);
        let guard = ring.lock().unwrap();
        guard.write(&[0x01, 0x02, 0x03]).unwrap();
        assert_eq!(guard.data_to_read().unwrap(), 3);

        let mut buf = [0u8; 8];
        assert_eq!(guard.read(&mut buf).unwrap(), 3);
        assert_eq!(&buf[..3], &[0x01, 0x02, 0x03]);
        assert_eq!(guard.read(&mut buf).unwrap(), 0);
    }

    #[test]
    fn test_wraparound() {
        let ring = ring("wrap", HEADER_SIZE + 10);
        let guard = ring.lock().unwrap();

        guard.write(&[1; 7]).unwrap();
        let mut buf = [0u8; 7];
        assert_eq!(guard.read(&mut buf).unwrap(), 7);

        // Straddles the end: 3 bytes at the tail, 4 at the head.
        let payload = [10, 11, 12, 13, 14, 15, 16];
        guard.write(&payload).unwrap();
        assert_eq!(guard.stats().unwrap().pending, 7);

        let mut buf = [0u8; 7];
        assert_eq!(guard.peek(&mut buf).unwrap(), 7);
        assert_eq!(buf, payload);
        assert_eq!(guard.read(&mut buf).unwrap(), 7);
        assert_eq!(buf, payload);
        assert!(guard.is_empty().unwrap());
    }

    #[test]
    fn test_exact_fit_and_overflow() {
        let ring = ring("fit", HEADER_SIZE + 16);
        let guard = ring.lock().unwrap();
        guard.write(&[9; 4]).unwrap();

        let free = guard.max_to_write().unwrap();
        assert_eq!(free, 11);

        let before = guard.stats().unwrap();
        let err = guard.write(&vec![5; free + 1]).unwrap_err();
        assert!(matches!(err, ChannelError::RingFull { size: 12, available: 11 }));
        assert_eq!(guard.stats().unwrap(), before);

        guard.write(&vec![5; free]).unwrap();
        assert!(guard.is_full().unwrap());
        assert_eq!(guard.data_to_read().unwrap(), 15);
    }

    #[test]
    fn test_failed_write_leaves_payload_untouched() {
        let ring = ring("untouched", HEADER_SIZE + 8);
        let guard = ring.lock().unwrap();
        guard.write(&[1, 2, 3]).unwrap();

        let mut before = vec![0u8; 8];
        ring.segment().read_at(0, &mut before).unwrap();
        assert!(guard.write(&[0xEE; 5]).is_err());
        let mut after = vec![0u8; 8];
        ring.segment().read_at(0, &mut after).unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn test_clear_resets() {
        let ring = ring("clear", HEADER_SIZE + 32);
        let guard = ring.lock().unwrap();
        guard.write(&[7; 20]).unwrap();
        let mut buf = [0u8; 5];
        guard.read(&mut buf).unwrap();

        guard.clear().unwrap();
        assert_eq!(guard.data_to_read().unwrap(), 0);
        assert_eq!(guard.max_to_write().unwrap(), 31);

        let mut payload = vec![1u8; 32];
        ring.segment().read_at(0, &mut payload).unwrap();
        assert!(payload.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_skip() {
        let ring = ring("skip", 256);
        let guard = ring.lock().unwrap();
        guard.write(b"abcdef").unwrap();
        assert_eq!(guard.skip(2).unwrap(), 2);
        let mut buf = [0u8; 10];
        assert_eq!(guard.read(&mut buf).unwrap(), 4);
        assert_eq!(&buf[..4], b"cdef");
        assert_eq!(guard.skip(100).unwrap(), 0);
    }

    #[test]
    fn test_size_limits() {
        let mut ring = RingChannel::new();
        assert!(matches!(
            ring.create("ring-too-small", HEADER_SIZE + 1, false),
            Err(ChannelError::TooSmall { .. })
        ));
        assert!(!ring.is_ready());
    }

    #[test]
    fn test_lock_requires_mapping() {
        let name = format!("ring-unmapped-{}", std::process::id());
        let mut ring = RingChannel::new().with_unlink_on_close(true);
        ring.create(&name, 1024, false).unwrap();
        assert!(matches!(
            ring.lock(),
            Err(ChannelError::Segment(SegmentError::NotMapped))
        ));
    }

    #[test]
    fn test_read_only_attach() {
        let writer = ring("ro", 1024);
        {
            let guard = writer.lock().unwrap();
            guard.write(b"hello").unwrap();
        }

        let mut reader = RingChannel::new();
        reader
            .open(writer.name().unwrap().as_str())
            .unwrap();
        reader.map(AccessMode::ReadOnly, 0).unwrap();

        assert_eq!(reader.snapshot().unwrap().pending, 5);
        let guard = reader.lock().unwrap();
        let mut buf = [0u8; 5];
        assert_eq!(guard.peek(&mut buf).unwrap(), 5);
        assert_eq!(&buf, b"hello");
        assert!(matches!(
            guard.read(&mut buf),
            Err(ChannelError::Segment(SegmentError::ReadOnly))
        ));
        assert!(guard.write(b"x").is_err());
        assert!(guard.clear().is_err());
    }

    #[test]
    fn test_corrupt_header_is_reported() {
        let ring = ring("corrupt", 128);
        // Simulate a dead holder that scribbled over the read cursor.
        {
            let view = ring.segment.view().unwrap();
            header(view).read.store(10_000, Ordering::Release);
        }
        let guard = ring.lock().unwrap();
        assert!(matches!(
            guard.data_to_read(),
            Err(ChannelError::CorruptHeader { .. })
        ));
        guard.clear().unwrap();
        assert_eq!(guard.data_to_read().unwrap(), 0);
    }

    #[test]
    fn test_clear_restores_missing_capacity() {
        // A plain segment has an all-zero header, as if the creator died
        // before writing it.
        let name = format!("ring-nohdr-{}", std::process::id());
        let mut raw = Segment::new().with_unlink_on_close(true);
        raw.create(&name, 64, false).unwrap();

        let mut ring = RingChannel::new();
        ring.open(&name).unwrap();
        ring.map(AccessMode::ReadWrite, 0).unwrap();

        let guard = ring.lock().unwrap();
        assert!(matches!(
            guard.capacity(),
            Err(ChannelError::CorruptHeader { .. })
        ));

        guard.clear().unwrap();
        assert_eq!(guard.capacity().unwrap(), 64 - HEADER_SIZE);
        assert_eq!(guard.max_to_write().unwrap(), 64 - HEADER_SIZE - 1);

        guard.write(b"hello").unwrap();
        let mut buf = [0u8; 5];
        assert_eq!(guard.read(&mut buf).unwrap(), 5);
        assert_eq!(&buf, b"hello");
    }
}
