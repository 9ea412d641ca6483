//! Lock helpers shared across the crate.
//!
//! A poisoned lock means another worker panicked while holding shared state; nothing sensible
//! can be recovered from that, so these macros abort with a message instead of threading a
//! lock error through every call site.

#![allow(unused_macros)]

/// Acquires a mutex guard.
///
/// # Example
///
/// ```rust,ignore
/// let frontier = lock!(self.frontier);
/// ```
macro_rules! lock {
    ($lock:expr) => {
        $lock.lock().expect("Failed to acquire lock")
    };
}

/// Acquires a read guard on an `RwLock`.
macro_rules! read_lock {
    ($rwlock:expr) => {
        $rwlock.read().expect("Failed to acquire read lock")
    };
}

/// Acquires a write guard on an `RwLock`.
macro_rules! write_lock {
    ($rwlock:expr) => {
        $rwlock.write().expect("Failed to acquire write lock")
    };
}

/// Takes the whole content out of a mutex-protected vector, leaving it empty.
macro_rules! drain_lock {
    ($lock:expr) => {
        std::mem::take(&mut *lock!($lock))
    };
}
