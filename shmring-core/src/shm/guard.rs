// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Scoped lock guard for [`Segment`].

use std::marker::PhantomData;

use crate::error::SegmentError;
use crate::shm::Segment;
use crate::types::LockOutcome;

/// Holds a segment's lock; releases it on drop.
///
/// Not `Send`: the robust mutex must be released by the thread that took it.
#[must_use = "the lock is released as soon as the guard is dropped"]
#[derive(Debug)]
pub struct SegmentGuard<'a> {
    segment: &'a Segment,
    outcome: LockOutcome,
    released: bool,
    _not_send: PhantomData<*const ()>,
}

impl<'a> SegmentGuard<'a> {
    pub(crate) fn new(segment: &'a Segment, outcome: LockOutcome) -> Self {
        Self {
            segment,
            outcome,
            released: false,
            _not_send: PhantomData,
        }
    }

    /// How this acquisition was granted.
    pub fn outcome(&self) -> LockOutcome {
        self.outcome
    }

    /// Whether the previous holder died while holding the lock.
    pub fn is_abandoned(&self) -> bool {
        self.outcome == LockOutcome::Abandoned
    }

    pub fn segment(&self) -> &'a Segment {
        self.segment
    }

    /// Release the lock now, reporting failure.
    pub fn unlock(mut self) -> Result<(), SegmentError> {
        self.released = true;
        self.segment.release()
    }
}

impl Drop for SegmentGuard<'_> {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        if let Err(e) = self.segment.release() {
            tracing::error!(
                name = ?self.segment.name(),
                error = %e,
                "Failed to release segment lock"
            );
        }
    }
}
