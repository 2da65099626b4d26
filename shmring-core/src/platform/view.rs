// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Process-local views over shared memory objects.
//!
//! A [`MappedView`] owns one `mmap` and unmaps it on drop. All byte access
//! goes through bounds-checked copies; the raw pointer is only handed out
//! for header overlays.

use std::ptr::NonNull;

use crate::error::SegmentError;
use crate::platform::SharedObject;
use crate::types::AccessMode;

/// An owned `mmap` of the first `len` bytes of a shared object.
#[derive(Debug)]
pub(crate) struct MappedView {
    name: String,
    ptr: NonNull<u8>,
    len: usize,
    mode: AccessMode,
}

// SAFETY: the view owns its mapping; the pointer is valid from any thread.
unsafe impl Send for MappedView {}

impl MappedView {
    /// Map `[0, len)` of `object` with the protection implied by `mode`.
    pub(crate) fn map(
        object: &SharedObject,
        mode: AccessMode,
        len: usize,
    ) -> Result<Self, SegmentError> {
        if len == 0 {
            return Err(SegmentError::ZeroSize);
        }

        // SAFETY: fd is valid, len is non-zero, offset 0 is valid
        let ptr = unsafe {
            libc::mmap(
                std::ptr::null_mut(),
                len,
                mode.prot(),
                libc::MAP_SHARED,
                object.raw_fd(),
                0,
            )
        };

        if ptr == libc::MAP_FAILED {
            return Err(SegmentError::last_os("mmap", object.name()));
        }

        let ptr = NonNull::new(ptr as *mut u8).ok_or_else(|| {
            SegmentError::os(
                "mmap",
                object.name(),
                std::io::Error::from_raw_os_error(libc::EINVAL),
            )
        })?;

        Ok(Self {
            name: object.name().to_string(),
            ptr,
            len,
            mode,
        })
    }

    /// Unmap explicitly, reporting failure instead of logging it.
    pub(crate) fn unmap(self) -> Result<(), SegmentError> {
        let view = std::mem::ManuallyDrop::new(self);
        // SAFETY: ptr and len describe the mapping created in `map`
        let result = unsafe { libc::munmap(view.ptr.as_ptr() as *mut libc::c_void, view.len) };
        if result < 0 {
            return Err(SegmentError::last_os("munmap", &view.name));
        }
        Ok(())
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    pub(crate) fn mode(&self) -> AccessMode {
        self.mode
    }

    pub(crate) fn as_ptr(&self) -> NonNull<u8> {
        self.ptr
    }

    fn check(&self, offset: usize, len: usize) -> Result<(), SegmentError> {
        match offset.checked_add(len) {
            Some(end) if end <= self.len => Ok(()),
            _ => Err(SegmentError::OutOfBounds {
                offset,
                len,
                size: self.len,
            }),
        }
    }

    fn check_writable(&self) -> Result<(), SegmentError> {
        if self.mode.is_writable() {
            Ok(())
        } else {
            Err(SegmentError::ReadOnly)
        }
    }

    /// Copy `buf.len()` bytes starting at `offset` out of the view.
    pub(crate) fn copy_out(&self, offset: usize, buf: &mut [u8]) -> Result<(), SegmentError> {
        self.check(offset, buf.len())?;
        // SAFETY: range checked above; buf is a distinct local allocation
        unsafe {
            std::ptr::copy_nonoverlapping(self.ptr.as_ptr().add(offset), buf.as_mut_ptr(), buf.len());
        }
        Ok(())
    }

    /// Copy `bytes` into the view at `offset`.
    pub(crate) fn copy_in(&self, offset: usize, bytes: &[u8]) -> Result<(), SegmentError> {
        self.check_writable()?;
        self.check(offset, bytes.len())?;
        // SAFETY: range checked above, mapping is PROT_WRITE
        unsafe {
            std::ptr::copy_nonoverlapping(bytes.as_ptr(), self.ptr.as_ptr().add(offset), bytes.len());
        }
        Ok(())
    }

    /// Zero `len` bytes starting at `offset`.
    pub(crate) fn zero(&self, offset: usize, len: usize) -> Result<(), SegmentError> {
        self.check_writable()?;
        self.check(offset, len)?;
        // SAFETY: range checked above, mapping is PROT_WRITE
        unsafe {
            std::ptr::write_bytes(self.ptr.as_ptr().add(offset), 0, len);
        }
        Ok(())
    }
}

impl Drop for MappedView {
    fn drop(&mut self) {
        // SAFETY: ptr and len describe the mapping created in `map`
        let result = unsafe { libc::munmap(self.ptr.as_ptr() as *mut libc::c_void, self.len) };
        if result < 0 {
            tracing::error!(
                name = %self.name,
                error = %std::io::Error::last_os_error(),
                "Failed to unmap shared memory"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn object(tag: &str, size: usize) -> (String, SharedObject) {
        let name = format!("/shmring-test-view-{}-{}", tag, std::process::id());
        let object = SharedObject::create_exclusive(&name, size)
            .unwrap()
            .expect("fresh name");
        (name, object)
    }

    #[test]
    fn test_copy_roundtrip_and_bounds() {
        let (name, object) = object("copy", 4096);
        let view = MappedView::map(&object, AccessMode::ReadWrite, 4096).unwrap();

        view.copy_in(100, b"hello").unwrap();
        let mut buf = [0u8; 5];
        view.copy_out(100, &mut buf).unwrap();
        assert_eq!(&buf, b"hello");

        assert!(matches!(
            view.copy_in(4094, b"abc"),
            Err(SegmentError::OutOfBounds { .. })
        ));
        assert!(view.copy_out(usize::MAX, &mut buf).is_err());

        view.unmap().unwrap();
        SharedObject::unlink(&name).unwrap();
    }

    #[test]
    fn test_read_only_view_rejects_writes() {
        let (name, object) = object("ro", 4096);
        let view = MappedView::map(&object, AccessMode::ReadOnly, 4096).unwrap();
        assert!(matches!(view.copy_in(0, b"x"), Err(SegmentError::ReadOnly)));
        assert!(matches!(view.zero(0, 1), Err(SegmentError::ReadOnly)));
        drop(view);
        SharedObject::unlink(&name).unwrap();
    }

    #[test]
    fn test_views_share_bytes() {
        let (name, object) = object("share", 4096);
        let a = MappedView::map(&object, AccessMode::ReadWrite, 4096).unwrap();
        let b = MappedView::map(&object, AccessMode::ReadOnly, 4096).unwrap();
        a.copy_in(0, &[7, 8, 9]).unwrap();
        let mut buf = [0u8; 3];
        b.copy_out(0, &mut buf).unwrap();
        assert_eq!(buf, [7, 8, 9]);
        drop((a, b));
        SharedObject::unlink(&name).unwrap();
    }
}
