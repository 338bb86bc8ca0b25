// Copyright 2025 dentsusoken
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use crate::backend::{
    CacheBackend, CacheClient, ClaimBackend, FileBackend, KeyStoreBackend, KeyStoreClient,
};
use crate::error::Result;
use crate::locking::contract::{MutexLock, escalate_teardown_failure, unrecoverable};
use crate::locking::ownership::Ownership;
use crate::locking::poll::poll_until;
use crate::locking::wait::LockWait;
use log::{debug, warn};
use std::path::PathBuf;
use std::time::Instant;

/// Advisory file locks in a directory.
pub type FlockLock = BackendLock<FileBackend>;

/// Add/delete locks on a memcache-style cache.
pub type CacheLock<C> = BackendLock<CacheBackend<C>>;

/// SETNX/DEL locks on a redis-style key store.
pub type KeyStoreLock<K> = BackendLock<KeyStoreBackend<K>>;

/// Mutex contract on top of any `ClaimBackend`.
pub struct BackendLock<B: ClaimBackend> {
    backend: B,
    owned: Ownership,
}

impl<B: ClaimBackend> BackendLock<B> {
    pub fn with_backend(backend: B) -> Self {
        Self {
            backend,
            owned: Ownership::new(),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    fn attempt(&self, name: &str) -> bool {
        match self.backend.try_claim(name) {
            Ok(claimed) => claimed,
            Err(err) => {
                warn!(
                    "{} backend failed while claiming '{name}': {err}",
                    self.backend.label()
                );
                false
            }
        }
    }
}

impl FlockLock {
    pub fn new<P: Into<PathBuf>>(directory: P) -> Self {
        Self::with_backend(FileBackend::new(directory))
    }
}

impl<C: CacheClient> CacheLock<C> {
    pub fn new(client: C) -> Self {
        Self::with_backend(CacheBackend::new(client))
    }
}

impl<K: KeyStoreClient> KeyStoreLock<K> {
    pub fn new(client: K) -> Self {
        Self::with_backend(KeyStoreBackend::new(client))
    }
}

impl<B: ClaimBackend> MutexLock for BackendLock<B> {
    fn acquire_lock(&self, name: &str, wait: LockWait) -> bool {
        if self.owned.contains(name) {
            debug!("'{name}' is already held by this lock");
            return false;
        }

        let started = Instant::now();
        let acquired = poll_until(wait, self.backend.retry_interval(), || self.attempt(name));
        if acquired {
            self.owned.insert(name);
            debug!(
                "Acquired {} lock '{name}' after {:.3}s",
                self.backend.label(),
                started.elapsed().as_secs_f64()
            );
        } else {
            debug!(
                "Gave up on {} lock '{name}' after {:.3}s (wait {wait})",
                self.backend.label(),
                started.elapsed().as_secs_f64()
            );
        }
        acquired
    }

    fn release_lock(&self, name: &str) -> bool {
        // Only the thread that takes the name out of the set may drop the claim.
        if !self.owned.remove(name) {
            return false;
        }

        match self.backend.drop_claim(name) {
            Ok(true) => {
                debug!("Released {} lock '{name}'", self.backend.label());
                true
            }
            Ok(false) => {
                warn!(
                    "{} lock '{name}' was already gone when released",
                    self.backend.label()
                );
                false
            }
            Err(err) => {
                self.owned.insert(name);
                warn!(
                    "Failed to release {} lock '{name}': {err}",
                    self.backend.label()
                );
                false
            }
        }
    }

    fn is_locked(&self, name: &str) -> Result<bool> {
        Ok(self.backend.query_claim(name)?)
    }

    fn owns(&self, name: &str) -> bool {
        self.owned.contains(name)
    }

    fn held_names(&self) -> Vec<String> {
        self.owned.snapshot()
    }

    fn teardown(&self) -> Result<()> {
        if !self.backend.is_available() {
            let names = self.owned.snapshot();
            warn!(
                "{} backend is offline, {} lock(s) cannot be released",
                self.backend.label(),
                names.len()
            );
            let reason = format!("{} backend reports itself unavailable", self.backend.label());
            return unrecoverable(names.into_iter().map(|name| (name, reason.clone())).collect());
        }

        let mut failures = Vec::new();
        for name in self.owned.snapshot() {
            if !self.owned.remove(&name) {
                continue;
            }
            match self.backend.drop_claim(&name) {
                Ok(true) => {
                    debug!("Released {} lock '{name}' on teardown", self.backend.label());
                }
                Ok(false) => {
                    warn!(
                        "{} lock '{name}' was already gone at teardown",
                        self.backend.label()
                    );
                }
                Err(err) => {
                    self.owned.insert(&name);
                    failures.push((name, err.to_string()));
                }
            }
        }
        unrecoverable(failures)
    }
}

impl<B: ClaimBackend> Drop for BackendLock<B> {
    fn drop(&mut self) {
        if self.owned.is_empty() {
            return;
        }
        if let Err(err) = self.teardown() {
            escalate_teardown_failure(&format!("{} lock", self.backend.label()), err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::cache::MockCacheClient;
    use crate::backend::{MemoryCache, MemoryKeyStore};
    use crate::error::{BackendResult, LockyardError};
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::TempDir;

    #[test]
    fn forfiter_round_trip() {
        let temp = TempDir::new().unwrap();
        let lock = FlockLock::new(temp.path());

        assert!(lock.acquire_lock("forfiter", LockWait::NONE));
        assert!(lock.is_locked("forfiter").unwrap());
        assert!(lock.owns("forfiter"));
        assert!(lock.release_lock("forfiter"));
        assert!(!lock.is_locked("forfiter").unwrap());
        assert!(lock.held_names().is_empty());
    }

    #[test]
    fn self_owned_name_cannot_be_reacquired() {
        let lock = CacheLock::new(MemoryCache::new());
        assert!(lock.acquire_lock("forfiter", LockWait::NONE));
        assert!(!lock.acquire_lock("forfiter", LockWait::NONE));
        assert!(lock.release_lock("forfiter"));
    }

    #[test]
    fn release_without_ownership_skips_backend() {
        let cache = Arc::new(MemoryCache::new());
        let holder = CacheLock::new(Arc::clone(&cache));
        let other = CacheLock::new(Arc::clone(&cache));
        assert!(holder.acquire_lock("forfiter", LockWait::NONE));

        cache.set_available(false);
        // Would fail loudly if it reached the backend.
        assert!(!other.release_lock("forfiter"));
        cache.set_available(true);

        assert!(other.is_locked("forfiter").unwrap());
        assert!(holder.release_lock("forfiter"));
    }

    #[test]
    fn release_of_vanished_claim_forgets_name() {
        let cache = Arc::new(MemoryCache::new());
        let lock = CacheLock::new(Arc::clone(&cache));
        assert!(lock.acquire_lock("forfiter", LockWait::NONE));
        cache.delete("forfiter").unwrap();

        assert!(!lock.release_lock("forfiter"));
        assert!(!lock.owns("forfiter"));
    }

    #[test]
    fn failed_release_keeps_ownership() {
        let store = Arc::new(MemoryKeyStore::new());
        let lock = KeyStoreLock::new(Arc::clone(&store));
        assert!(lock.acquire_lock("forfiter", LockWait::NONE));

        store.set_available(false);
        assert!(!lock.release_lock("forfiter"));
        assert!(lock.owns("forfiter"));

        store.set_available(true);
        assert!(lock.release_lock("forfiter"));
    }

    #[test]
    fn acquire_against_offline_backend_is_false() {
        let cache = Arc::new(MemoryCache::new());
        cache.set_available(false);
        let lock = CacheLock::new(Arc::clone(&cache));
        assert!(!lock.acquire_lock("forfiter", LockWait::NONE));
        assert!(lock.held_names().is_empty());
        assert!(lock.is_locked("forfiter").is_err());
    }

    #[test]
    fn waits_for_release_by_other_thread() {
        let cache = Arc::new(MemoryCache::new());
        let holder = Arc::new(CacheLock::with_backend(
            CacheBackend::new(Arc::clone(&cache)).with_retry_delay(Duration::from_millis(10)),
        ));
        let waiter = CacheLock::with_backend(
            CacheBackend::new(Arc::clone(&cache)).with_retry_delay(Duration::from_millis(10)),
        );
        assert!(holder.acquire_lock("forfiter", LockWait::NONE));

        let releaser = {
            let holder = Arc::clone(&holder);
            std::thread::spawn(move || {
                std::thread::sleep(Duration::from_millis(50));
                holder.release_lock("forfiter")
            })
        };

        assert!(waiter.acquire_lock("forfiter", LockWait::from_secs(5)));
        assert!(releaser.join().unwrap());
        assert!(waiter.release_lock("forfiter"));
    }

    #[test]
    fn bounded_wait_gives_up() {
        let cache = Arc::new(MemoryCache::new());
        let holder = CacheLock::new(Arc::clone(&cache));
        let waiter = CacheLock::with_backend(
            CacheBackend::new(Arc::clone(&cache)).with_retry_delay(Duration::from_millis(20)),
        );
        assert!(holder.acquire_lock("forfiter", LockWait::NONE));

        let started = Instant::now();
        assert!(!waiter.acquire_lock("forfiter", LockWait::Finite(Duration::from_millis(150))));
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(150));
        assert!(elapsed < Duration::from_secs(2));
        assert!(holder.release_lock("forfiter"));
    }

    #[test]
    fn teardown_reports_unreachable_backend() {
        let cache = Arc::new(MemoryCache::new());
        let lock = CacheLock::new(Arc::clone(&cache));
        assert!(lock.acquire_lock("a", LockWait::NONE));
        assert!(lock.acquire_lock("b", LockWait::NONE));

        cache.set_available(false);
        match lock.teardown().unwrap_err() {
            LockyardError::Unrecoverable { names, .. } => {
                assert_eq!(names, vec!["a".to_string(), "b".to_string()]);
            }
            other => panic!("Expected unrecoverable error, got {other:?}"),
        }

        cache.set_available(true);
        assert!(lock.teardown().is_ok());
        assert!(lock.held_names().is_empty());
        assert!(!lock.is_locked("a").unwrap());
    }

    #[test]
    #[should_panic(expected = "unrecoverable lock teardown failure")]
    fn drop_with_unreachable_backend_panics() {
        let cache = Arc::new(MemoryCache::new());
        let lock = CacheLock::new(Arc::clone(&cache));
        assert!(lock.acquire_lock("forfiter", LockWait::NONE));
        cache.set_available(false);
        drop(lock);
    }

    #[test]
    fn drop_releases_file_lock() {
        let temp = TempDir::new().unwrap();
        let other = FlockLock::new(temp.path());
        {
            let lock = FlockLock::new(temp.path());
            assert!(lock.acquire_lock("forfiter", LockWait::NONE));
            assert!(!other.acquire_lock("forfiter", LockWait::NONE));
        }
        assert!(other.acquire_lock("forfiter", LockWait::NONE));
        assert!(other.release_lock("forfiter"));
    }

    /// Cache client whose deletes land only after a pause.
    struct SlowDelete(Arc<MemoryCache>);

    impl CacheClient for SlowDelete {
        fn add(&self, key: &str, value: &str) -> BackendResult<bool> {
            self.0.add(key, value)
        }

        fn delete(&self, key: &str) -> BackendResult<bool> {
            std::thread::sleep(Duration::from_millis(100));
            self.0.delete(key)
        }

        fn exists(&self, key: &str) -> BackendResult<bool> {
            self.0.exists(key)
        }
    }

    #[test]
    fn concurrent_releases_drop_one_claim() {
        let cache = Arc::new(MemoryCache::new());
        let holder = CacheLock::new(SlowDelete(Arc::clone(&cache)));
        let next = CacheLock::with_backend(
            CacheBackend::new(Arc::clone(&cache)).with_retry_delay(Duration::from_millis(5)),
        );
        assert!(holder.acquire_lock("job", LockWait::NONE));

        let (first, second) = std::thread::scope(|scope| {
            let first = scope.spawn(|| holder.release_lock("job"));
            let second = scope.spawn(|| {
                std::thread::sleep(Duration::from_millis(20));
                holder.release_lock("job")
            });
            assert!(next.acquire_lock("job", LockWait::from_secs(5)));
            (first.join().unwrap(), second.join().unwrap())
        });

        assert!(first ^ second);
        assert!(next.owns("job"));
        assert!(next.is_locked("job").unwrap());
        assert!(next.release_lock("job"));
    }

    #[test]
    fn teardown_skips_backend_that_reports_offline() {
        let mut client = MockCacheClient::new();
        client.expect_add().times(1).returning(|_, _| Ok(true));
        client.expect_is_available().returning(|| false);
        client.expect_delete().times(0);
        let lock = CacheLock::new(client);
        assert!(lock.acquire_lock("job", LockWait::NONE));

        match lock.teardown().unwrap_err() {
            LockyardError::Unrecoverable { names, details } => {
                assert_eq!(names, vec!["job".to_string()]);
                assert!(details.contains("unavailable"));
            }
            other => panic!("Expected unrecoverable error, got {other:?}"),
        }
        assert!(lock.owns("job"));
        std::mem::forget(lock);
    }
}
