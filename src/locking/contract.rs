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
use crate::locking::wait::LockWait;
use log::error;
use std::thread;

/// A named mutex whose state lives in a shared backend.
///
/// Each instance tracks the names it acquired itself. Only those names can be
/// released through it, and dropping the instance releases all of them.
pub trait MutexLock: Send + Sync {
    /// Tries to claim `name`, polling until `wait` elapses.
    ///
    /// Returns `false` when the name is held elsewhere (or already held by this
    /// instance) or when the backend could not be reached.
    fn acquire_lock(&self, name: &str, wait: LockWait) -> bool;

    /// Releases `name` if this instance owns it.
    ///
    /// Returns `false` without touching the backend when it does not.
    fn release_lock(&self, name: &str) -> bool;

    /// Whether anyone holds `name`.
    fn is_locked(&self, name: &str) -> Result<bool>;

    /// Whether this instance holds `name`.
    fn owns(&self, name: &str) -> bool;

    fn held_names(&self) -> Vec<String>;

    /// Releases every held name.
    ///
    /// Names the backend could not release stay held and are reported through
    /// `LockyardError::Unrecoverable`.
    fn teardown(&self) -> Result<()>;
}

/// Turns a failed drop-time teardown into a panic.
///
/// There is no caller left to inspect a return value, so an orphaned claim
/// must not pass silently. Skipped while already unwinding to avoid an abort.
pub(crate) fn escalate_teardown_failure(label: &str, err: LockyardError) {
    error!("Teardown of {label} left locks behind: {err}");
    if !thread::panicking() {
        panic!("unrecoverable lock teardown failure for {label}: {err}");
    }
}

/// Joins per-name failures into one `Unrecoverable` error.
pub(crate) fn unrecoverable(failures: Vec<(String, String)>) -> Result<()> {
    if failures.is_empty() {
        return Ok(());
    }

    let details = failures
        .iter()
        .map(|(name, cause)| format!("{name}: {cause}"))
        .collect::<Vec<_>>()
        .join("; ");
    let names = failures.into_iter().map(|(name, _)| name).collect();
    Err(LockyardError::Unrecoverable { names, details })
}
