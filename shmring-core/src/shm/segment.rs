// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Segment - a named shared memory mapping plus its named robust lock.
//!
//! Every process builds its own `Segment` against the same name. The OS
//! object outlives individual handles: on Linux it persists until
//! [`Segment::remove`] (or a creator with `unlink_on_close`) unlinks it.

use std::cell::Cell;
use std::ptr::NonNull;

use crate::error::SegmentError;
use crate::naming::{derive_object_names, ObjectNames};
use crate::platform::{MappedView, RobustMutex, SharedObject};
use crate::shm::SegmentGuard;
use crate::types::{AccessMode, CreateOutcome, LockOutcome, SegmentName};

/// Objects owned by a ready handle.
#[derive(Debug)]
struct Attached {
    name: SegmentName,
    names: ObjectNames,
    object: SharedObject,
    lock: RobustMutex,
    /// Whether this handle created the mapping object.
    created: bool,
}

/// Handle to a named shared memory segment.
///
/// Lifecycle: [`Segment::new`] (empty) -> [`create`](Segment::create) or
/// [`open`](Segment::open) (ready) -> [`map`](Segment::map) (mapped) ->
/// [`unmap`](Segment::unmap) / [`close`](Segment::close) / drop.
///
/// The handle is `Send` but not `Sync`: the lock is owned by the acquiring
/// thread, and the abandonment flag is per handle.
#[derive(Debug, Default)]
pub struct Segment {
    attached: Option<Attached>,
    view: Option<MappedView>,
    /// Bytes at the start of the view reserved for a header.
    reserved: usize,
    last_lock: Cell<Option<LockOutcome>>,
    /// Set when create/open took the lock internally from a dead holder.
    /// The next user acquisition reports `Abandoned` in its place.
    pending_abandoned: Cell<bool>,
    unlink_on_close: bool,
}

impl Segment {
    /// Create an empty handle.
    pub fn new() -> Self {
        Self::default()
    }

    /// Unlink the OS objects when a handle that created them is closed.
    ///
    /// Off by default, so a segment outlives its creator the way POSIX
    /// shared memory does.
    pub fn with_unlink_on_close(mut self, unlink: bool) -> Self {
        self.unlink_on_close = unlink;
        self
    }

    pub(crate) fn with_reserved(mut self, reserved: usize) -> Self {
        self.reserved = reserved;
        self
    }

    /// Create the segment `name` of `size` bytes, or attach to it when it
    /// already exists and `open_if_exists` is set.
    ///
    /// A newly created object is zero-filled before this returns. An
    /// attached object is left untouched but must be at least `size` bytes.
    /// No view is mapped.
    pub fn create(
        &mut self,
        name: &str,
        size: usize,
        open_if_exists: bool,
    ) -> Result<CreateOutcome, SegmentError> {
        self.create_with(name, size, open_if_exists, |_| Ok(()))
    }

    /// Like [`create`](Self::create), running `init` on a temporary
    /// read-write view of a newly created object.
    ///
    /// The whole sequence runs under the segment lock, so an attacher that
    /// locks afterwards always sees the initialised content.
    pub(crate) fn create_with<F>(
        &mut self,
        name: &str,
        size: usize,
        open_if_exists: bool,
        init: F,
    ) -> Result<CreateOutcome, SegmentError>
    where
        F: FnOnce(&MappedView) -> Result<(), SegmentError>,
    {
        self.ensure_closed()?;

        let name = SegmentName::new(name)?;
        if size == 0 {
            return Err(SegmentError::ZeroSize);
        }

        let names = derive_object_names(&name);
        let lock = RobustMutex::create_or_open(&names.lock)?;

        let inherited = lock.lock()? == LockOutcome::Abandoned;
        if inherited {
            tracing::warn!(name = %name, "Creating segment under an abandoned lock");
        }
        let result = Self::create_object(&name, &names.mapping, size, open_if_exists, init);
        let unlocked = lock.unlock();
        let (object, outcome) = result?;
        unlocked?;

        tracing::debug!(name = %name, size = size, outcome = %outcome, "Created segment");

        self.attached = Some(Attached {
            name,
            names,
            object,
            lock,
            created: outcome.is_new(),
        });
        self.pending_abandoned.set(inherited);

        Ok(outcome)
    }

    fn create_object<F>(
        name: &SegmentName,
        object_name: &str,
        size: usize,
        open_if_exists: bool,
        init: F,
    ) -> Result<(SharedObject, CreateOutcome), SegmentError>
    where
        F: FnOnce(&MappedView) -> Result<(), SegmentError>,
    {
        if let Some(object) = SharedObject::create_exclusive(object_name, size)? {
            let prepared = MappedView::map(&object, AccessMode::ReadWrite, size).and_then(|view| {
                view.zero(0, size)?;
                init(&view)?;
                view.unmap()
            });

            if let Err(e) = prepared {
                if let Err(cleanup) = SharedObject::unlink(object_name) {
                    tracing::warn!(name = %name, error = %cleanup, "Failed to unlink partly created segment");
                }
                return Err(e);
            }

            return Ok((object, CreateOutcome::CreatedNew));
        }

        if !open_if_exists {
            return Err(SegmentError::AlreadyExists {
                name: name.to_string(),
            });
        }

        let object = SharedObject::open(object_name)?.ok_or_else(|| SegmentError::NotFound {
            name: name.to_string(),
        })?;

        let actual = object.len()?;
        if actual < size {
            return Err(SegmentError::SizeMismatch {
                name: name.to_string(),
                requested: size,
                actual,
            });
        }

        Ok((object, CreateOutcome::CreatedExisting))
    }

    /// Attach to an existing segment. No view is mapped.
    pub fn open(&mut self, name: &str) -> Result<(), SegmentError> {
        self.ensure_closed()?;

        let name = SegmentName::new(name)?;
        let names = derive_object_names(&name);

        let object = SharedObject::open(&names.mapping)?.ok_or_else(|| SegmentError::NotFound {
            name: name.to_string(),
        })?;
        let lock = RobustMutex::create_or_open(&names.lock)?;

        // A zero-length object is still being set up by its creator, which
        // holds the lock until it is done.
        let mut inherited = false;
        if object.len()? == 0 {
            inherited = lock.lock()? == LockOutcome::Abandoned;
            if inherited {
                tracing::warn!(name = %name, "Opening segment under an abandoned lock");
            }
            lock.unlock()?;
            if object.len()? == 0 {
                return Err(SegmentError::NotInitialized {
                    name: name.to_string(),
                });
            }
        }

        tracing::debug!(name = %name, "Opened segment");

        self.attached = Some(Attached {
            name,
            names,
            object,
            lock,
            created: false,
        });
        self.pending_abandoned.set(inherited);

        Ok(())
    }

    fn ensure_closed(&self) -> Result<(), SegmentError> {
        match &self.attached {
            Some(attached) => Err(SegmentError::AlreadyOpen {
                name: attached.name.to_string(),
            }),
            None => Ok(()),
        }
    }

    /// Map `[0, size)` of the segment into this process, or the whole
    /// object when `size == 0`.
    pub fn map(&mut self, mode: AccessMode, size: usize) -> Result<(), SegmentError> {
        let attached = self.attached.as_ref().ok_or(SegmentError::NotReady)?;
        if self.view.is_some() {
            return Err(SegmentError::AlreadyMapped);
        }

        let total = attached.object.len()?;
        let len = if size == 0 { total } else { size };
        if len == 0 || len > total || len < self.reserved {
            return Err(SegmentError::SizeMismatch {
                name: attached.name.to_string(),
                requested: len,
                actual: total,
            });
        }

        let view = MappedView::map(&attached.object, mode, len)?;
        tracing::debug!(name = %attached.name, size = len, mode = %mode, "Mapped segment");
        self.view = Some(view);
        Ok(())
    }

    /// Release the local view. The OS object is untouched.
    pub fn unmap(&mut self) -> Result<(), SegmentError> {
        let view = self.view.take().ok_or(SegmentError::NotMapped)?;
        view.unmap()?;
        if let Some(attached) = &self.attached {
            tracing::debug!(name = %attached.name, "Unmapped segment");
        }
        Ok(())
    }

    /// Release the view and both OS handles. Safe to call repeatedly.
    pub fn close(&mut self) {
        self.view = None;
        self.last_lock.set(None);
        self.pending_abandoned.set(false);

        let Some(attached) = self.attached.take() else {
            return;
        };

        let Attached {
            name,
            names,
            object,
            lock,
            created,
        } = attached;
        drop(lock);
        drop(object);

        if self.unlink_on_close && created {
            if let Err(e) = Self::unlink_names(&names) {
                tracing::warn!(name = %name, error = %e, "Failed to unlink segment");
            }
        }

        tracing::debug!(name = %name, "Closed segment");
    }

    /// Unlink the OS objects for `name`. Existing handles keep working;
    /// later `open` calls fail until the segment is created again.
    ///
    /// Returns whether the mapping object existed.
    pub fn remove(name: &str) -> Result<bool, SegmentError> {
        let name = SegmentName::new(name)?;
        let existed = Self::unlink_names(&derive_object_names(&name))?;
        tracing::debug!(name = %name, existed = existed, "Removed segment");
        Ok(existed)
    }

    fn unlink_names(names: &ObjectNames) -> Result<bool, SegmentError> {
        let existed = SharedObject::unlink(&names.mapping)?;
        SharedObject::unlink(&names.lock)?;
        Ok(existed)
    }

    /// Block until the segment lock is held by the calling thread.
    pub fn lock(&self) -> Result<SegmentGuard<'_>, SegmentError> {
        let attached = self.attached.as_ref().ok_or(SegmentError::NotReady)?;
        let outcome = self.merge_pending(attached.lock.lock()?);
        self.last_lock.set(Some(outcome));
        Ok(SegmentGuard::new(self, outcome))
    }

    /// Take the segment lock if it is free. Never blocks.
    pub fn try_lock(&self) -> Result<Option<SegmentGuard<'_>>, SegmentError> {
        let attached = self.attached.as_ref().ok_or(SegmentError::NotReady)?;
        Ok(attached.lock.try_lock()?.map(|outcome| {
            let outcome = self.merge_pending(outcome);
            self.last_lock.set(Some(outcome));
            SegmentGuard::new(self, outcome)
        }))
    }

    fn merge_pending(&self, outcome: LockOutcome) -> LockOutcome {
        if self.pending_abandoned.replace(false) {
            LockOutcome::Abandoned
        } else {
            outcome
        }
    }

    pub(crate) fn release(&self) -> Result<(), SegmentError> {
        let attached = self.attached.as_ref().ok_or(SegmentError::NotReady)?;
        self.last_lock.set(None);
        attached.lock.unlock()
    }

    /// Whether the lock currently held through this handle was acquired
    /// from a holder that died. Always false when the lock is not held.
    ///
    /// The shared content is left as the dead holder left it; deciding to
    /// [`clear`](Self::clear) is up to the caller.
    pub fn is_lock_abandoned(&self) -> bool {
        self.last_lock.get() == Some(LockOutcome::Abandoned)
    }

    /// Zero-fill the data region. Hold the lock while calling this.
    pub fn clear(&self) -> Result<(), SegmentError> {
        let view = self.view()?;
        view.zero(self.reserved, view.len() - self.reserved)
    }

    /// Copy bytes out of the data region starting at `offset`.
    pub fn read_at(&self, offset: usize, buf: &mut [u8]) -> Result<(), SegmentError> {
        let view = self.view()?;
        let start = self.data_offset(offset, buf.len(), view)?;
        view.copy_out(start, buf)
    }

    /// Copy `bytes` into the data region starting at `offset`.
    pub fn write_at(&self, offset: usize, bytes: &[u8]) -> Result<(), SegmentError> {
        let view = self.view()?;
        let start = self.data_offset(offset, bytes.len(), view)?;
        view.copy_in(start, bytes)
    }

    fn data_offset(&self, offset: usize, len: usize, view: &MappedView) -> Result<usize, SegmentError> {
        offset
            .checked_add(self.reserved)
            .ok_or(SegmentError::OutOfBounds {
                offset,
                len,
                size: view.len() - self.reserved,
            })
    }

    pub(crate) fn view(&self) -> Result<&MappedView, SegmentError> {
        self.view.as_ref().ok_or(SegmentError::NotMapped)
    }

    /// Segment name, once created or opened.
    pub fn name(&self) -> Option<&SegmentName> {
        self.attached.as_ref().map(|a| &a.name)
    }

    /// Whether the handle is attached to an OS object.
    pub fn is_ready(&self) -> bool {
        self.attached.is_some()
    }

    /// Whether a local view is mapped.
    pub fn is_mapped(&self) -> bool {
        self.view.is_some()
    }

    /// Protection of the current view.
    pub fn access_mode(&self) -> Option<AccessMode> {
        self.view.as_ref().map(MappedView::mode)
    }

    /// Size of the OS object in bytes.
    pub fn object_size(&self) -> Result<usize, SegmentError> {
        let attached = self.attached.as_ref().ok_or(SegmentError::NotReady)?;
        attached.object.len()
    }

    /// Bytes of the data region as mapped; 0 when unmapped.
    pub fn data_size(&self) -> usize {
        self.view
            .as_ref()
            .map_or(0, |view| view.len() - self.reserved)
    }

    /// Pointer to the start of the data region, when mapped.
    pub fn as_ptr(&self) -> Option<NonNull<u8>> {
        self.view.as_ref().map(|view| {
            // SAFETY: reserved <= view.len() is checked at map time
            unsafe { NonNull::new_unchecked(view.as_ptr().as_ptr().add(self.reserved)) }
        })
    }

    /// Borrow the data region as a slice.
    ///
    /// # Safety
    /// Other processes may write the region at any time. Hold the lock for
    /// as long as the slice is alive.
    pub unsafe fn data(&self) -> Option<&[u8]> {
        self.as_ptr()
            .map(|ptr| std::slice::from_raw_parts(ptr.as_ptr(), self.data_size()))
    }

    /// Borrow the data region mutably. `None` for unmapped or read-only views.
    ///
    /// # Safety
    /// Hold the lock for as long as the slice is alive.
    pub unsafe fn data_mut(&mut self) -> Option<&mut [u8]> {
        if !self.access_mode()?.is_writable() {
            return None;
        }
        let len = self.data_size();
        self.as_ptr()
            .map(|ptr| std::slice::from_raw_parts_mut(ptr.as_ptr(), len))
    }
}

impl Drop for Segment {
    fn drop(&mut self) {
        self.close();
    }
}
