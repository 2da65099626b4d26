// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Deterministic OS object names.
//!
//! Two processes that agree on a [`SegmentName`] derive the same mapping and
//! lock object names. There is no registry: every handle derives them on its
//! own.

use std::ffi::CString;

use crate::error::SegmentError;
use crate::types::SegmentName;

/// Prefix shared by every object this library creates under `/dev/shm`.
pub const OBJECT_PREFIX: &str = "shmring.";

/// Suffix of the mapping object name.
pub const MAPPING_SUFFIX: &str = ".data";

/// Suffix of the lock object name.
pub const LOCK_SUFFIX: &str = ".lock";

/// The pair of POSIX object names backing one segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectNames {
    /// Mapping object, e.g. `/shmring.chan1.data`.
    pub mapping: String,
    /// Robust mutex object, e.g. `/shmring.chan1.lock`.
    pub lock: String,
}

/// Derive the mapping and lock object names for a segment.
///
/// The two suffixes differ, so no segment's mapping name can equal any
/// segment's lock name.
pub fn derive_object_names(name: &SegmentName) -> ObjectNames {
    let base = format!("/{}{}", OBJECT_PREFIX, name.as_str());
    ObjectNames {
        mapping: format!("{}{}", base, MAPPING_SUFFIX),
        lock: format!("{}{}", base, LOCK_SUFFIX),
    }
}

/// Convert a derived name into the C string `shm_open` expects.
pub(crate) fn c_name(object: &str) -> Result<CString, SegmentError> {
    CString::new(object).map_err(|e| {
        SegmentError::os(
            "shm_open",
            object,
            std::io::Error::new(std::io::ErrorKind::InvalidInput, e),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_are_deterministic() {
        let name = SegmentName::new("chan1").unwrap();
        let a = derive_object_names(&name);
        let b = derive_object_names(&SegmentName::new("chan1").unwrap());
        assert_eq!(a, b);
        assert_eq!(a.mapping, "/shmring.chan1.data");
        assert_eq!(a.lock, "/shmring.chan1.lock");
    }

    #[test]
    fn test_distinct_names_do_not_collide() {
        let a = derive_object_names(&SegmentName::new("a").unwrap());
        let b = derive_object_names(&SegmentName::new("a.lock").unwrap());
        assert_ne!(a.mapping, b.mapping);
        assert_ne!(a.lock, b.mapping);
        assert_ne!(a.lock, b.lock);
        assert_ne!(a.mapping, b.lock);
    }
}
