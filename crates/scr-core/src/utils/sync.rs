//! Lock helpers that recover the guard from a poisoned lock and log a warning.
use std::sync::{Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Acquire a mutex, recovering the guard if the lock was poisoned.
pub fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned: PoisonError<_>| {
        log::warn!("Recovered a poisoned mutex");
        poisoned.into_inner()
    })
}

/// Acquire a read guard, recovering it if the lock was poisoned.
pub fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|poisoned| {
        log::warn!("Recovered a poisoned read lock");
        poisoned.into_inner()
    })
}

/// Acquire a write guard, recovering it if the lock was poisoned.
pub fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|poisoned| {
        log::warn!("Recovered a poisoned write lock");
        poisoned.into_inner()
    })
}
