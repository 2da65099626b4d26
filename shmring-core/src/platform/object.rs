// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! POSIX shared memory objects (`shm_open` / `ftruncate` / `shm_unlink`).
//!
//! An object is only a named, sized file descriptor. Mapping it into the
//! address space is [`MappedView`](super::MappedView)'s job.

use std::os::fd::{AsRawFd, FromRawFd, OwnedFd, RawFd};

use crate::error::SegmentError;
use crate::naming::c_name;

/// Permission bits for every object: owner read/write only.
const OBJECT_MODE: libc::mode_t = 0o600;

/// An open POSIX shared memory object.
#[derive(Debug)]
pub(crate) struct SharedObject {
    name: String,
    fd: OwnedFd,
}

impl SharedObject {
    /// Create a new object of `size` bytes.
    ///
    /// Returns `Ok(None)` when an object with this name already exists.
    /// The fresh object is zero-filled by the kernel; callers that need an
    /// explicit guarantee still clear it through a view.
    pub(crate) fn create_exclusive(name: &str, size: usize) -> Result<Option<Self>, SegmentError> {
        let c_name = c_name(name)?;

        // SAFETY: c_name is a valid CString, flags are valid POSIX flags
        let fd = unsafe {
            libc::shm_open(
                c_name.as_ptr(),
                libc::O_CREAT | libc::O_EXCL | libc::O_RDWR,
                OBJECT_MODE,
            )
        };

        if fd < 0 {
            let errno = std::io::Error::last_os_error();
            if errno.raw_os_error() == Some(libc::EEXIST) {
                return Ok(None);
            }
            return Err(SegmentError::os("shm_open", name, errno));
        }

        // SAFETY: fd was just returned by shm_open and is owned by nobody else
        let object = Self {
            name: name.to_string(),
            fd: unsafe { OwnedFd::from_raw_fd(fd) },
        };

        if let Err(e) = object.set_len(size) {
            drop(object);
            // Do not leave a zero-length object behind.
            if let Err(cleanup) = Self::unlink(name) {
                tracing::warn!(name = %name, error = %cleanup, "Failed to unlink unsized object");
            }
            return Err(e);
        }

        Ok(Some(object))
    }

    /// Open an existing object read-write.
    ///
    /// Returns `Ok(None)` when no object with this name exists.
    pub(crate) fn open(name: &str) -> Result<Option<Self>, SegmentError> {
        let c_name = c_name(name)?;

        // SAFETY: c_name is a valid CString
        let fd = unsafe { libc::shm_open(c_name.as_ptr(), libc::O_RDWR, 0) };

        if fd < 0 {
            let errno = std::io::Error::last_os_error();
            if errno.raw_os_error() == Some(libc::ENOENT) {
                return Ok(None);
            }
            return Err(SegmentError::os("shm_open", name, errno));
        }

        Ok(Some(Self {
            name: name.to_string(),
            // SAFETY: fd was just returned by shm_open and is owned by nobody else
            fd: unsafe { OwnedFd::from_raw_fd(fd) },
        }))
    }

    /// Remove the name. Existing mappings stay valid until unmapped.
    ///
    /// Returns `Ok(false)` when the name did not exist.
    pub(crate) fn unlink(name: &str) -> Result<bool, SegmentError> {
        let c_name = c_name(name)?;

        // SAFETY: c_name is a valid CString
        if unsafe { libc::shm_unlink(c_name.as_ptr()) } < 0 {
            let errno = std::io::Error::last_os_error();
            if errno.raw_os_error() == Some(libc::ENOENT) {
                return Ok(false);
            }
            return Err(SegmentError::os("shm_unlink", name, errno));
        }

        Ok(true)
    }

    /// Current size of the object in bytes.
    pub(crate) fn len(&self) -> Result<usize, SegmentError> {
        // SAFETY: stat is plain old data, fstat fills it on success
        let mut stat: libc::stat = unsafe { std::mem::zeroed() };

        // SAFETY: fd is a valid open descriptor, stat is a valid out pointer
        if unsafe { libc::fstat(self.fd.as_raw_fd(), &mut stat) } < 0 {
            return Err(SegmentError::last_os("fstat", &self.name));
        }

        Ok(stat.st_size as usize)
    }

    fn set_len(&self, size: usize) -> Result<(), SegmentError> {
        let len = libc::off_t::try_from(size).map_err(|_| {
            SegmentError::os(
                "ftruncate",
                &self.name,
                std::io::Error::from_raw_os_error(libc::EFBIG),
            )
        })?;

        // SAFETY: fd is a valid open descriptor
        if unsafe { libc::ftruncate(self.fd.as_raw_fd(), len) } < 0 {
            return Err(SegmentError::last_os("ftruncate", &self.name));
        }

        Ok(())
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn raw_fd(&self) -> RawFd {
        self.fd.as_raw_fd()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unique(tag: &str) -> String {
        format!("/shmring-test-object-{}-{}", tag, std::process::id())
    }

    #[test]
    fn test_create_exclusive_then_open() {
        let name = unique("excl");
        let created = SharedObject::create_exclusive(&name, 8192)
            .unwrap()
            .expect("fresh name");
        assert_eq!(created.len().unwrap(), 8192);

        assert!(SharedObject::create_exclusive(&name, 8192)
            .unwrap()
            .is_none());

        let opened = SharedObject::open(&name).unwrap().expect("exists");
        assert_eq!(opened.len().unwrap(), 8192);

        assert!(SharedObject::unlink(&name).unwrap());
        assert!(!SharedObject::unlink(&name).unwrap());
    }

    #[test]
    fn test_open_missing_is_none() {
        assert!(SharedObject::open(&unique("missing")).unwrap().is_none());
    }
}
