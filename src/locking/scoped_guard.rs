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

use crate::locking::contract::MutexLock;
use crate::locking::wait::LockWait;
use log::warn;

/// Holds one name on a lock until the guard leaves scope.
pub struct LockGuard<'a, L: MutexLock + ?Sized> {
    lock: &'a L,
    name: String,
    held: bool,
}

impl<'a, L: MutexLock + ?Sized> LockGuard<'a, L> {
    /// `None` when the name could not be acquired within `wait`.
    pub fn acquire(lock: &'a L, name: &str, wait: LockWait) -> Option<Self> {
        if !lock.acquire_lock(name, wait) {
            return None;
        }
        Some(Self {
            lock,
            name: name.to_string(),
            held: true,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn release(mut self) -> bool {
        self.held = false;
        self.lock.release_lock(&self.name)
    }
}

impl<L: MutexLock + ?Sized> Drop for LockGuard<'_, L> {
    fn drop(&mut self) {
        if self.held && !self.lock.release_lock(&self.name) {
            warn!("Failed to release lock '{}' at end of scope", self.name);
        }
    }
}

/// Runs `f` while holding `name`; `None` if the name could not be acquired.
pub fn with_lock<L, T, F>(lock: &L, name: &str, wait: LockWait, f: F) -> Option<T>
where
    L: MutexLock + ?Sized,
    F: FnOnce() -> T,
{
    let _guard = LockGuard::acquire(lock, name, wait)?;
    Some(f())
}
