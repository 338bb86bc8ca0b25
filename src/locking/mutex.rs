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
use crate::locking::contract::{MutexLock, escalate_teardown_failure};
use crate::locking::wait::LockWait;
use log::debug;
use std::sync::{Arc, Mutex, MutexGuard};

/// One lock name bound to one lock, re-entrant within the handle.
///
/// Nested `acquire` calls only bump a counter; the backend claim is dropped
/// when the matching number of `release` calls has been made.
pub struct NamedMutex<L: MutexLock> {
    name: String,
    lock: Arc<L>,
    depth: Mutex<usize>,
}

impl<L: MutexLock> NamedMutex<L> {
    pub fn new(name: impl Into<String>, lock: Arc<L>) -> Self {
        Self {
            name: name.into(),
            lock,
            depth: Mutex::new(0),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn lock(&self) -> &Arc<L> {
        &self.lock
    }

    fn depth(&self) -> MutexGuard<'_, usize> {
        self.depth
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Nested calls only bump the counter while the lock still owns the
    /// name. The counter is not held across the backend wait.
    pub fn acquire(&self, wait: LockWait) -> bool {
        if self.reenter() {
            return true;
        }

        if self.lock.acquire_lock(&self.name, wait) {
            *self.depth() += 1;
            return true;
        }

        // Another thread sharing this handle may have won the claim meanwhile.
        self.reenter()
    }

    fn reenter(&self) -> bool {
        let mut depth = self.depth();
        if *depth == 0 {
            return false;
        }
        if self.lock.owns(&self.name) {
            *depth += 1;
            return true;
        }

        debug!(
            "Mutex '{}' lost its claim at depth {}, acquiring again",
            self.name, *depth
        );
        *depth = 0;
        false
    }

    pub fn release(&self) -> bool {
        let mut depth = self.depth();
        if *depth > 0 && !self.lock.owns(&self.name) {
            debug!("Mutex '{}' no longer owns its claim", self.name);
            *depth = 0;
            return false;
        }

        match *depth {
            0 => false,
            1 => {
                let released = self.lock.release_lock(&self.name);
                if released {
                    *depth = 0;
                }
                released
            }
            _ => {
                *depth -= 1;
                true
            }
        }
    }

    /// Whether this handle holds the name.
    pub fn is_acquired(&self) -> bool {
        *self.depth() > 0 && self.lock.owns(&self.name)
    }

    /// Whether anyone holds the name.
    pub fn is_locked(&self) -> Result<bool> {
        self.lock.is_locked(&self.name)
    }

    /// Drops the claim regardless of nesting depth.
    pub fn close(&self) -> Result<()> {
        let mut depth = self.depth();
        if *depth == 0 {
            return Ok(());
        }

        if self.lock.release_lock(&self.name) {
            debug!("Closed mutex '{}' at depth {}", self.name, *depth);
            *depth = 0;
            return Ok(());
        }

        if !self.lock.owns(&self.name) {
            // Claim vanished underneath us; nothing is left to orphan.
            *depth = 0;
            return Ok(());
        }

        Err(LockyardError::Unrecoverable {
            names: vec![self.name.clone()],
            details: format!("backend refused to release '{}'", self.name),
        })
    }
}

impl<L: MutexLock> Drop for NamedMutex<L> {
    fn drop(&mut self) {
        if let Err(err) = self.close() {
            escalate_teardown_failure(&format!("mutex '{}'", self.name), err);
        }
    }
}
