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

pub mod advisory;
pub mod cache;
pub mod file;
pub mod keystore;
pub mod memory;

pub use advisory::AdvisorySession;
pub use cache::{CacheBackend, CacheClient};
pub use file::FileBackend;
pub use keystore::{KeyStoreBackend, KeyStoreClient};
pub use memory::{MemoryAdvisoryServer, MemoryAdvisorySession, MemoryCache, MemoryKeyStore};

use crate::error::BackendResult;
use std::time::Duration;

/// Atomic claim primitives a backend offers for one lock name.
///
/// `drop_claim` returns `Ok(false)` when there was no claim to drop; an `Err`
/// always means the backend itself failed.
pub trait ClaimBackend: Send + Sync {
    /// Short label used in log lines.
    fn label(&self) -> &'static str;

    fn try_claim(&self, name: &str) -> BackendResult<bool>;

    fn drop_claim(&self, name: &str) -> BackendResult<bool>;

    fn query_claim(&self, name: &str) -> BackendResult<bool>;

    fn is_available(&self) -> bool {
        true
    }

    /// Delay between attempts while an acquire is waiting.
    fn retry_interval(&self) -> Duration;
}
