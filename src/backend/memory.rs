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

//! In-process backends.
//!
//! Each one honours the same contract as its networked counterpart and can be
//! switched offline with `set_available(false)`, after which every call fails
//! with `BackendError::Unavailable`.

use crate::backend::advisory::{AdvisorySession, statements};
use crate::backend::cache::CacheClient;
use crate::backend::keystore::KeyStoreClient;
use crate::error::{BackendError, BackendResult};
use crate::locking::poll::poll_until;
use crate::locking::wait::LockWait;
use log::{debug, trace};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

#[derive(Debug)]
struct Availability(AtomicBool);

impl Availability {
    fn new() -> Self {
        Self(AtomicBool::new(true))
    }

    fn set(&self, available: bool) {
        self.0.store(available, Ordering::SeqCst);
    }

    fn get(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn check(&self, backend: &str) -> BackendResult<()> {
        if self.get() {
            Ok(())
        } else {
            Err(BackendError::Unavailable(format!("{backend} is offline")))
        }
    }
}

fn guard<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Memcache-like key/value map.
#[derive(Debug)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, String>>,
    availability: Availability,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            availability: Availability::new(),
        }
    }

    pub fn set_available(&self, available: bool) {
        self.availability.set(available);
    }

    pub fn get(&self, key: &str) -> BackendResult<Option<String>> {
        self.availability.check("memory cache")?;
        Ok(guard(&self.entries).get(key).cloned())
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheClient for MemoryCache {
    fn add(&self, key: &str, value: &str) -> BackendResult<bool> {
        self.availability.check("memory cache")?;
        let mut entries = guard(&self.entries);
        if entries.contains_key(key) {
            return Ok(false);
        }
        entries.insert(key.to_string(), value.to_string());
        Ok(true)
    }

    fn delete(&self, key: &str) -> BackendResult<bool> {
        self.availability.check("memory cache")?;
        Ok(guard(&self.entries).remove(key).is_some())
    }

    fn exists(&self, key: &str) -> BackendResult<bool> {
        self.availability.check("memory cache")?;
        Ok(guard(&self.entries).contains_key(key))
    }

    fn is_available(&self) -> bool {
        self.availability.get()
    }
}

/// Redis-like key store.
#[derive(Debug)]
pub struct MemoryKeyStore {
    keys: Mutex<HashMap<String, String>>,
    availability: Availability,
}

impl MemoryKeyStore {
    pub fn new() -> Self {
        Self {
            keys: Mutex::new(HashMap::new()),
            availability: Availability::new(),
        }
    }

    pub fn set_available(&self, available: bool) {
        self.availability.set(available);
    }
}

impl Default for MemoryKeyStore {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyStoreClient for MemoryKeyStore {
    fn set_nx(&self, key: &str, value: &str) -> BackendResult<bool> {
        self.availability.check("memory key store")?;
        let mut keys = guard(&self.keys);
        if keys.contains_key(key) {
            return Ok(false);
        }
        keys.insert(key.to_string(), value.to_string());
        Ok(true)
    }

    fn del(&self, key: &str) -> BackendResult<u64> {
        self.availability.check("memory key store")?;
        Ok(u64::from(guard(&self.keys).remove(key).is_some()))
    }

    fn exists(&self, key: &str) -> BackendResult<bool> {
        self.availability.check("memory key store")?;
        Ok(guard(&self.keys).contains_key(key))
    }

    fn is_available(&self) -> bool {
        self.availability.get()
    }
}

const ADVISORY_POLL_DELAY: Duration = Duration::from_millis(20);

/// A database server's advisory-lock table, shared by its sessions.
#[derive(Debug)]
pub struct MemoryAdvisoryServer {
    holders: Mutex<HashMap<String, u64>>,
    next_session: AtomicU64,
    availability: Availability,
}

impl MemoryAdvisoryServer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            holders: Mutex::new(HashMap::new()),
            next_session: AtomicU64::new(1),
            availability: Availability::new(),
        })
    }

    pub fn session(self: &Arc<Self>) -> MemoryAdvisorySession {
        let id = self.next_session.fetch_add(1, Ordering::SeqCst);
        debug!("Opened advisory session {id}");
        MemoryAdvisorySession {
            id,
            server: Arc::clone(self),
        }
    }

    pub fn set_available(&self, available: bool) {
        self.availability.set(available);
    }

    // Taking a lock releases everything else the session holds.
    fn take(&self, name: &str, session: u64) -> bool {
        let mut holders = guard(&self.holders);
        match holders.get(name) {
            Some(holder) if *holder != session => false,
            _ => {
                holders.retain(|_, holder| *holder != session);
                holders.insert(name.to_string(), session);
                true
            }
        }
    }

    fn release(&self, name: &str, session: u64) -> bool {
        let mut holders = guard(&self.holders);
        if holders.get(name) == Some(&session) {
            holders.remove(name);
            true
        } else {
            false
        }
    }

    fn is_free(&self, name: &str) -> bool {
        !guard(&self.holders).contains_key(name)
    }

    fn close_session(&self, session: u64) {
        guard(&self.holders).retain(|_, holder| *holder != session);
    }
}

/// A connection to a `MemoryAdvisoryServer`. Dropping it ends the session
/// and frees its locks, as a closed database connection would.
#[derive(Debug)]
pub struct MemoryAdvisorySession {
    id: u64,
    server: Arc<MemoryAdvisoryServer>,
}

impl MemoryAdvisorySession {
    pub fn id(&self) -> u64 {
        self.id
    }
}

impl AdvisorySession for MemoryAdvisorySession {
    fn get_lock(&self, name: &str, wait: LockWait) -> BackendResult<bool> {
        self.server.availability.check("advisory server")?;
        trace!("session {}: {}", self.id, statements::get_lock(name, wait));
        Ok(poll_until(wait, ADVISORY_POLL_DELAY, || {
            self.server.take(name, self.id)
        }))
    }

    fn release_lock(&self, name: &str) -> BackendResult<bool> {
        self.server.availability.check("advisory server")?;
        trace!("session {}: {}", self.id, statements::release_lock(name));
        Ok(self.server.release(name, self.id))
    }

    fn is_free_lock(&self, name: &str) -> BackendResult<bool> {
        self.server.availability.check("advisory server")?;
        trace!("session {}: {}", self.id, statements::is_free_lock(name));
        Ok(self.server.is_free(name))
    }

    fn is_available(&self) -> bool {
        self.server.availability.get()
    }
}

impl Drop for MemoryAdvisorySession {
    fn drop(&mut self) {
        self.server.close_session(self.id);
        debug!("Closed advisory session {}", self.id);
    }
}
