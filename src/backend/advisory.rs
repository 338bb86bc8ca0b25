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

use crate::error::BackendResult;
use crate::locking::wait::LockWait;

/// One database session exposing named advisory locks
/// (`GET_LOCK`, `RELEASE_LOCK`, `IS_FREE_LOCK`).
///
/// Locks belong to the session. A successful `get_lock` releases every other
/// lock the session held before.
pub trait AdvisorySession: Send + Sync {
    /// Waits up to `wait` for `name`. `LockWait::Infinite` waits forever.
    fn get_lock(&self, name: &str, wait: LockWait) -> BackendResult<bool>;

    /// `Ok(false)` when the session did not hold `name`.
    fn release_lock(&self, name: &str) -> BackendResult<bool>;

    fn is_free_lock(&self, name: &str) -> BackendResult<bool>;

    fn is_available(&self) -> bool {
        true
    }
}

/// Renders the statements a SQL-backed session would send.
pub mod statements {
    use crate::locking::wait::LockWait;

    /// MySQL treats a negative timeout as "wait forever".
    pub fn get_lock(name: &str, wait: LockWait) -> String {
        let timeout = wait
            .whole_secs()
            .map(|secs| secs.to_string())
            .unwrap_or_else(|| "-1".to_string());
        format!("SELECT GET_LOCK({}, {timeout})", quote(name))
    }

    pub fn release_lock(name: &str) -> String {
        format!("SELECT RELEASE_LOCK({})", quote(name))
    }

    pub fn is_free_lock(name: &str) -> String {
        format!("SELECT IS_FREE_LOCK({})", quote(name))
    }

    fn quote(name: &str) -> String {
        format!("'{}'", name.replace('\\', "\\\\").replace('\'', "''"))
    }

}
