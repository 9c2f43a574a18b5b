// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Lock helpers that survive poisoning.
//!
//! A handler that panics while holding the session table lock must not take
//! every later request down with it. These helpers log the event and hand
//! back the guard anyway.

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Acquire a read lock, recovering from poisoning.
#[inline]
pub fn resilient_read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|poisoned| {
        tracing::error!(
            target: "security::locks",
            event = "LOCK_POISONED_READ",
            "RwLock poisoned during read; recovering. A previous holder panicked."
        );
        poisoned.into_inner()
    })
}

/// Acquire a write lock, recovering from poisoning.
#[inline]
pub fn resilient_write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|poisoned| {
        tracing::error!(
            target: "security::locks",
            event = "LOCK_POISONED_WRITE",
            "RwLock poisoned during write; recovering. A previous holder panicked."
        );
        poisoned.into_inner()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_plain_access() {
        let lock = RwLock::new(1);
        *resilient_write(&lock) += 1;
        assert_eq!(*resilient_read(&lock), 2);
    }

    #[test]
    fn test_recovers_after_panic() {
        let lock = Arc::new(RwLock::new(vec![1, 2, 3]));
        let poisoner = Arc::clone(&lock);

        let result = thread::spawn(move || {
            let _guard = poisoner.write().unwrap();
            panic!("poison the lock");
        })
        .join();
        assert!(result.is_err());
        assert!(lock.is_poisoned());

        assert_eq!(resilient_read(&lock).len(), 3);
        resilient_write(&lock).push(4);
        assert_eq!(resilient_read(&lock).len(), 4);
    }
}
