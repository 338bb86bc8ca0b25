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

use crate::backend::AdvisorySession;
use crate::error::Result;
use crate::locking::contract::{MutexLock, escalate_teardown_failure, unrecoverable};
use crate::locking::ownership::Ownership;
use crate::locking::wait::LockWait;
use log::{debug, warn};
use std::time::Instant;

/// Mutex contract on a database session's named advisory locks.
///
/// The session can hold only one named lock: a successful acquire makes the
/// server drop whatever the session held before, and this type forgets those
/// names in the same step so its ownership set matches the server.
pub struct AdvisoryLock<S: AdvisorySession> {
    session: S,
    owned: Ownership,
}

impl<S: AdvisorySession> AdvisoryLock<S> {
    pub fn new(session: S) -> Self {
        Self {
            session,
            owned: Ownership::new(),
        }
    }

    pub fn session(&self) -> &S {
        &self.session
    }

    fn held_elsewhere(&self, name: &str) -> bool {
        match self.session.is_free_lock(name) {
            Ok(free) => !free,
            Err(err) => {
                warn!("Advisory backend failed while checking '{name}': {err}");
                true
            }
        }
    }
}

impl<S: AdvisorySession> MutexLock for AdvisoryLock<S> {
    fn acquire_lock(&self, name: &str, wait: LockWait) -> bool {
        if self.owned.contains(name) {
            debug!("'{name}' is already held by this session");
            return false;
        }

        // Fail fast instead of issuing GET_LOCK when no wait was requested.
        if wait.is_single_attempt() && self.held_elsewhere(name) {
            return false;
        }

        let started = Instant::now();
        match self.session.get_lock(name, wait) {
            Ok(true) => {
                for dropped in self.owned.replace_all_with(name) {
                    debug!("Session released '{dropped}' implicitly while acquiring '{name}'");
                }
                debug!(
                    "Acquired advisory lock '{name}' after {:.3}s",
                    started.elapsed().as_secs_f64()
                );
                true
            }
            Ok(false) => {
                debug!("Advisory lock '{name}' not granted within {wait}");
                false
            }
            Err(err) => {
                warn!("Advisory backend failed while acquiring '{name}': {err}");
                false
            }
        }
    }

    fn release_lock(&self, name: &str) -> bool {
        // Only the thread that takes the name out of the set may release it.
        if !self.owned.remove(name) {
            return false;
        }

        match self.session.release_lock(name) {
            Ok(true) => {
                debug!("Released advisory lock '{name}'");
                true
            }
            Ok(false) => {
                warn!("Advisory lock '{name}' was no longer held by this session");
                false
            }
            Err(err) => {
                self.owned.insert(name);
                warn!("Failed to release advisory lock '{name}': {err}");
                false
            }
        }
    }

    fn is_locked(&self, name: &str) -> Result<bool> {
        Ok(!self.session.is_free_lock(name)?)
    }

    fn owns(&self, name: &str) -> bool {
        self.owned.contains(name)
    }

    fn held_names(&self) -> Vec<String> {
        self.owned.snapshot()
    }

    fn teardown(&self) -> Result<()> {
        if !self.session.is_available() {
            let names = self.owned.snapshot();
            warn!(
                "Advisory session is offline, {} lock(s) cannot be released",
                names.len()
            );
            return unrecoverable(
                names
                    .into_iter()
                    .map(|name| (name, "advisory session reports itself unavailable".to_string()))
                    .collect(),
            );
        }

        let mut failures = Vec::new();
        for name in self.owned.snapshot() {
            if !self.owned.remove(&name) {
                continue;
            }
            match self.session.release_lock(&name) {
                Ok(true) => debug!("Released advisory lock '{name}' on teardown"),
                Ok(false) => warn!("Advisory lock '{name}' was already gone at teardown"),
                Err(err) => {
                    self.owned.insert(&name);
                    failures.push((name, err.to_string()));
                }
            }
        }
        unrecoverable(failures)
    }
}

impl<S: AdvisorySession> Drop for AdvisoryLock<S> {
    fn drop(&mut self) {
        if self.owned.is_empty() {
            return;
        }
        if let Err(err) = self.teardown() {
            escalate_teardown_failure("advisory lock", err);
        }
    }
}
