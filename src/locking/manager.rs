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

use crate::error::{LockyardError, Result};
use crate::locking::contract::MutexLock;
use crate::locking::mutex::NamedMutex;
use log::debug;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, Weak};

type RegistryKey = (TypeId, String);
type Registered = Weak<dyn Any + Send + Sync>;

/// Hands out one shared `NamedMutex` per (lock type, name).
///
/// Entries are weak: a mutex lives as long as some caller holds its handle,
/// and dropping the last handle releases its claim. Only in-process sharing
/// comes from here; cross-process exclusion is the backend's job.
#[derive(Default)]
pub struct LockManager {
    mutexes: Mutex<HashMap<RegistryKey, Registered>>,
}

impl LockManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry.
    pub fn global() -> &'static LockManager {
        static GLOBAL: OnceLock<LockManager> = OnceLock::new();
        GLOBAL.get_or_init(LockManager::new)
    }

    fn entries(&self) -> Result<MutexGuard<'_, HashMap<RegistryKey, Registered>>> {
        let mut mutexes = self
            .mutexes
            .lock()
            .map_err(|_| LockyardError::Poisoned("lock manager map poisoned".into()))?;
        mutexes.retain(|_, entry| entry.strong_count() > 0);
        Ok(mutexes)
    }

    /// Returns the live mutex registered for `name` on lock type `L`, binding
    /// a new one to `lock` when there is none.
    pub fn mutex<L>(&self, lock: &Arc<L>, name: &str) -> Result<Arc<NamedMutex<L>>>
    where
        L: MutexLock + 'static,
    {
        let mut mutexes = self.entries()?;

        let key = (TypeId::of::<L>(), name.to_string());
        if let Some(existing) = mutexes.get(&key).and_then(Weak::upgrade) {
            return existing
                .downcast::<NamedMutex<L>>()
                .map_err(|_| LockyardError::Poisoned(format!("registry entry for '{name}'")));
        }

        debug!("Registering mutex '{name}'");
        let mutex = Arc::new(NamedMutex::new(name, Arc::clone(lock)));
        mutexes.insert(key, Arc::downgrade(&mutex) as Registered);
        Ok(mutex)
    }

    /// Drops the registry entry for `name` on lock type `L`. Existing handles
    /// stay valid.
    pub fn forget<L: MutexLock + 'static>(&self, name: &str) -> Result<bool> {
        Ok(self
            .entries()?
            .remove(&(TypeId::of::<L>(), name.to_string()))
            .is_some())
    }

    /// Number of mutexes that still have a live handle.
    pub fn len(&self) -> usize {
        self.entries().map(|mutexes| mutexes.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{MemoryCache, MemoryKeyStore};
    use crate::locking::wait::LockWait;
    use crate::locking::{CacheLock, KeyStoreLock};

    #[test]
    fn same_name_returns_same_arc() {
        let manager = LockManager::new();
        let lock = Arc::new(CacheLock::new(MemoryCache::new()));
        let first = manager.mutex(&lock, "forfiter").unwrap();
        let second = manager.mutex(&lock, "forfiter").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(manager.len(), 1);
    }

    #[test]
    fn different_names_return_different_arcs() {
        let manager = LockManager::new();
        let lock = Arc::new(CacheLock::new(MemoryCache::new()));
        let first = manager.mutex(&lock, "a").unwrap();
        let second = manager.mutex(&lock, "b").unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn lock_types_are_kept_apart() {
        let manager = LockManager::new();
        let cache = Arc::new(CacheLock::new(MemoryCache::new()));
        let store = Arc::new(KeyStoreLock::new(MemoryKeyStore::new()));
        let from_cache = manager.mutex(&cache, "forfiter").unwrap();
        let from_store = manager.mutex(&store, "forfiter").unwrap();

        assert!(from_cache.acquire(LockWait::NONE));
        assert!(from_store.acquire(LockWait::NONE));
        assert_eq!(manager.len(), 2);
    }

    #[test]
    fn shared_handle_observes_acquisition() {
        let manager = LockManager::new();
        let lock = Arc::new(CacheLock::new(MemoryCache::new()));
        let first = manager.mutex(&lock, "forfiter").unwrap();
        assert!(first.acquire(LockWait::NONE));

        let second = manager.mutex(&lock, "forfiter").unwrap();
        assert!(second.is_acquired());
        assert!(second.release());
        assert!(!first.is_acquired());
    }

    #[test]
    fn forget_removes_entry() {
        let manager = LockManager::new();
        let lock = Arc::new(CacheLock::new(MemoryCache::new()));
        let first = manager.mutex(&lock, "forfiter").unwrap();
        assert!(manager.forget::<CacheLock<MemoryCache>>("forfiter").unwrap());
        assert!(manager.is_empty());

        let second = manager.mutex(&lock, "forfiter").unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn global_is_a_singleton() {
        assert!(std::ptr::eq(LockManager::global(), LockManager::global()));
    }

    #[test]
    fn dropping_last_handle_releases_claim() {
        let cache = Arc::new(MemoryCache::new());
        let manager = LockManager::new();
        let lock = Arc::new(CacheLock::new(Arc::clone(&cache)));
        {
            let mutex = manager.mutex(&lock, "job").unwrap();
            let shared = manager.mutex(&lock, "job").unwrap();
            assert!(mutex.acquire(LockWait::NONE));
            drop(mutex);
            assert!(shared.is_acquired());
        }

        assert!(manager.is_empty());
        assert!(!lock.owns("job"));
        let other = CacheLock::new(Arc::clone(&cache));
        assert!(other.acquire_lock("job", LockWait::NONE));
        assert!(other.release_lock("job"));
    }
}
