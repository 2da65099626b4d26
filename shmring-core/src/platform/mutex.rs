// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Named, process-shared, robust mutex.
//!
//! The mutex lives in its own small shared memory object. It is a
//! `PTHREAD_PROCESS_SHARED` + `PTHREAD_MUTEX_ROBUST` mutex, so when a holder
//! dies the kernel hands the lock to the next waiter with `EOWNERDEAD`,
//! which is reported as [`LockOutcome::Abandoned`].

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};

use crate::error::SegmentError;
use crate::platform::{MappedView, SharedObject};
use crate::types::{AccessMode, LockOutcome};

const STATE_UNINIT: u32 = 0;
const STATE_INITIALIZING: u32 = 1;
const STATE_READY: u32 = 2;

/// How long an attacher waits for a concurrent creator to finish `pthread_mutex_init`.
const INIT_WAIT: Duration = Duration::from_secs(2);
const INIT_POLL: Duration = Duration::from_millis(1);

/// Layout of the lock object.
#[repr(C)]
struct LockBlock {
    state: AtomicU32,
    _pad: u32,
    mutex: libc::pthread_mutex_t,
}

const LOCK_BLOCK_SIZE: usize = std::mem::size_of::<LockBlock>();

/// Handle to a named robust mutex.
#[derive(Debug)]
pub(crate) struct RobustMutex {
    name: String,
    view: MappedView,
    _object: SharedObject,
}

impl RobustMutex {
    /// Attach to the mutex called `name`, creating and initialising it if
    /// this is the first handle anywhere.
    pub(crate) fn create_or_open(name: &str) -> Result<Self, SegmentError> {
        // A concurrent `remove` can make both paths miss; retry a few times.
        for _ in 0..3 {
            if let Some(object) = SharedObject::create_exclusive(name, LOCK_BLOCK_SIZE)? {
                return Self::initialize(name, object);
            }
            if let Some(object) = SharedObject::open(name)? {
                return Self::attach(name, object);
            }
        }

        Err(SegmentError::LockNotInitialized {
            name: name.to_string(),
        })
    }

    fn initialize(name: &str, object: SharedObject) -> Result<Self, SegmentError> {
        let view = match MappedView::map(&object, AccessMode::ReadWrite, LOCK_BLOCK_SIZE) {
            Ok(view) => view,
            Err(e) => {
                Self::discard(name);
                return Err(e);
            }
        };

        let mutex = Self {
            name: name.to_string(),
            view,
            _object: object,
        };

        if let Err(e) = mutex.init_block() {
            Self::discard(name);
            return Err(e);
        }

        tracing::debug!(name = %name, "Initialised robust mutex");
        Ok(mutex)
    }

    /// Unlink a lock object whose setup failed.
    fn discard(name: &str) {
        if let Err(e) = SharedObject::unlink(name) {
            tracing::warn!(name = %name, error = %e, "Failed to unlink uninitialised lock");
        }
    }

    fn attach(name: &str, object: SharedObject) -> Result<Self, SegmentError> {
        let deadline = Instant::now() + INIT_WAIT;

        // The creator may not have sized the object yet.
        while object.len()? < LOCK_BLOCK_SIZE {
            if Instant::now() >= deadline {
                return Err(SegmentError::LockNotInitialized {
                    name: name.to_string(),
                });
            }
            std::thread::sleep(INIT_POLL);
        }

        let view = MappedView::map(&object, AccessMode::ReadWrite, LOCK_BLOCK_SIZE)?;
        let mutex = Self {
            name: name.to_string(),
            view,
            _object: object,
        };

        while mutex.block().state.load(Ordering::Acquire) != STATE_READY {
            if Instant::now() >= deadline {
                return Err(SegmentError::LockNotInitialized {
                    name: name.to_string(),
                });
            }
            std::thread::sleep(INIT_POLL);
        }

        Ok(mutex)
    }

    fn block(&self) -> &LockBlock {
        // SAFETY: the view is page aligned and at least LOCK_BLOCK_SIZE bytes
        unsafe { &*(self.view.as_ptr().as_ptr() as *const LockBlock) }
    }

    fn raw(&self) -> *mut libc::pthread_mutex_t {
        let block = self.view.as_ptr().as_ptr() as *mut LockBlock;
        // SAFETY: block points into our live mapping
        unsafe { std::ptr::addr_of_mut!((*block).mutex) }
    }

    fn init_block(&self) -> Result<(), SegmentError> {
        let state = &self.block().state;
        if state
            .compare_exchange(
                STATE_UNINIT,
                STATE_INITIALIZING,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_err()
        {
            return Err(SegmentError::LockNotInitialized {
                name: self.name.clone(),
            });
        }

        // SAFETY: attr is initialised by pthread_mutexattr_init before use and
        // destroyed afterwards; the mutex memory is ours until state is READY.
        unsafe {
            let mut attr: libc::pthread_mutexattr_t = std::mem::zeroed();
            self.check(libc::pthread_mutexattr_init(&mut attr), "pthread_mutexattr_init")?;

            let configured = self
                .check(
                    libc::pthread_mutexattr_setpshared(&mut attr, libc::PTHREAD_PROCESS_SHARED),
                    "pthread_mutexattr_setpshared",
                )
                .and_then(|_| {
                    self.check(
                        libc::pthread_mutexattr_setrobust(&mut attr, libc::PTHREAD_MUTEX_ROBUST),
                        "pthread_mutexattr_setrobust",
                    )
                })
                .and_then(|_| {
                    self.check(
                        libc::pthread_mutexattr_settype(&mut attr, libc::PTHREAD_MUTEX_ERRORCHECK),
                        "pthread_mutexattr_settype",
                    )
                })
                .and_then(|_| {
                    self.check(
                        libc::pthread_mutex_init(self.raw(), &attr),
                        "pthread_mutex_init",
                    )
                });

            libc::pthread_mutexattr_destroy(&mut attr);
            configured?;
        }

        state.store(STATE_READY, Ordering::Release);
        Ok(())
    }

    fn check(&self, rc: libc::c_int, syscall: &'static str) -> Result<(), SegmentError> {
        if rc == 0 {
            Ok(())
        } else {
            Err(SegmentError::os(
                syscall,
                &self.name,
                std::io::Error::from_raw_os_error(rc),
            ))
        }
    }

    /// Block until the mutex is held by the calling thread.
    pub(crate) fn lock(&self) -> Result<LockOutcome, SegmentError> {
        // SAFETY: the mutex was initialised before state became READY
        let rc = unsafe { libc::pthread_mutex_lock(self.raw()) };
        self.outcome(rc, "pthread_mutex_lock")
    }

    /// Take the mutex if it is free. `Ok(None)` when it is held, including
    /// by the calling thread.
    pub(crate) fn try_lock(&self) -> Result<Option<LockOutcome>, SegmentError> {
        // SAFETY: the mutex was initialised before state became READY
        let rc = unsafe { libc::pthread_mutex_trylock(self.raw()) };
        if rc == libc::EBUSY || rc == libc::EDEADLK {
            return Ok(None);
        }
        self.outcome(rc, "pthread_mutex_trylock").map(Some)
    }

    /// Release the mutex. Must be called on the thread that acquired it.
    pub(crate) fn unlock(&self) -> Result<(), SegmentError> {
        // SAFETY: the mutex was initialised before state became READY
        let rc = unsafe { libc::pthread_mutex_unlock(self.raw()) };
        self.check(rc, "pthread_mutex_unlock")
    }

    fn outcome(&self, rc: libc::c_int, syscall: &'static str) -> Result<LockOutcome, SegmentError> {
        match rc {
            0 => Ok(LockOutcome::Acquired),
            libc::EOWNERDEAD => {
                // We own it now. Mark it usable again; the protected data is
                // left exactly as the dead holder left it.
                // SAFETY: we hold the mutex after EOWNERDEAD
                let rc = unsafe { libc::pthread_mutex_consistent(self.raw()) };
                self.check(rc, "pthread_mutex_consistent")?;
                tracing::warn!(name = %self.name, "Acquired abandoned lock");
                Ok(LockOutcome::Abandoned)
            }
            libc::ENOTRECOVERABLE => Err(SegmentError::LockNotRecoverable),
            rc => self.check(rc, syscall).map(|_| LockOutcome::Acquired),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unique(tag: &str) -> String {
        format!("/shmring-test-mutex-{}-{}", tag, std::process::id())
    }

    #[test]
    fn test_lock_unlock_and_try_lock() {
        let name = unique("basic");
        let a = RobustMutex::create_or_open(&name).unwrap();
        let b = RobustMutex::create_or_open(&name).unwrap();

        assert_eq!(a.lock().unwrap(), LockOutcome::Acquired);
        assert!(b.try_lock().unwrap().is_none());
        a.unlock().unwrap();

        assert_eq!(b.try_lock().unwrap(), Some(LockOutcome::Acquired));
        b.unlock().unwrap();

        SharedObject::unlink(&name).unwrap();
    }

    #[test]
    fn test_relock_on_same_thread_is_an_error() {
        let name = unique("relock");
        let m = RobustMutex::create_or_open(&name).unwrap();
        m.lock().unwrap();
        assert!(m.lock().is_err());
        m.unlock().unwrap();
        SharedObject::unlink(&name).unwrap();
    }

    #[test]
    fn test_dead_thread_leaves_abandoned_lock() {
        let name = unique("dead");
        let m = RobustMutex::create_or_open(&name).unwrap();

        let thread_name = name.clone();
        std::thread::spawn(move || {
            let m = RobustMutex::create_or_open(&thread_name).unwrap();
            m.lock().unwrap();
            // Exit without unlocking. The mapping must outlive the thread so
            // the kernel can mark the futex owner-dead.
            std::mem::forget(m);
        })
        .join()
        .unwrap();

        assert_eq!(m.lock().unwrap(), LockOutcome::Abandoned);
        m.unlock().unwrap();
        assert_eq!(m.lock().unwrap(), LockOutcome::Acquired);
        m.unlock().unwrap();

        SharedObject::unlink(&name).unwrap();
    }
}
