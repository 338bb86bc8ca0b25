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

use crate::backend::ClaimBackend;
use crate::error::BackendResult;
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(100);

/// The subset of a memcache-style client the cache lock needs.
#[cfg_attr(test, mockall::automock)]
pub trait CacheClient: Send + Sync {
    /// Stores `value` under `key` only if the key is absent.
    fn add(&self, key: &str, value: &str) -> BackendResult<bool>;

    /// Removes `key`; `Ok(false)` when it was not there.
    fn delete(&self, key: &str) -> BackendResult<bool>;

    fn exists(&self, key: &str) -> BackendResult<bool>;

    fn is_available(&self) -> bool {
        true
    }
}

impl<T: CacheClient + ?Sized> CacheClient for Arc<T> {
    fn add(&self, key: &str, value: &str) -> BackendResult<bool> {
        (**self).add(key, value)
    }

    fn delete(&self, key: &str) -> BackendResult<bool> {
        (**self).delete(key)
    }

    fn exists(&self, key: &str) -> BackendResult<bool> {
        (**self).exists(key)
    }

    fn is_available(&self) -> bool {
        (**self).is_available()
    }
}

/// Claims names with add-if-absent. Entries never need to expire.
#[derive(Debug)]
pub struct CacheBackend<C> {
    client: C,
    sentinel: String,
    retry_delay: Duration,
}

impl<C: CacheClient> CacheBackend<C> {
    pub fn new(client: C) -> Self {
        Self {
            client,
            sentinel: holder_sentinel(),
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }

    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    pub fn client(&self) -> &C {
        &self.client
    }
}

impl<C: CacheClient> ClaimBackend for CacheBackend<C> {
    fn label(&self) -> &'static str {
        "cache"
    }

    fn try_claim(&self, name: &str) -> BackendResult<bool> {
        self.client.add(name, &self.sentinel)
    }

    fn drop_claim(&self, name: &str) -> BackendResult<bool> {
        self.client.delete(name)
    }

    fn query_claim(&self, name: &str) -> BackendResult<bool> {
        self.client.exists(name)
    }

    fn is_available(&self) -> bool {
        self.client.is_available()
    }

    fn retry_interval(&self) -> Duration {
        self.retry_delay
    }
}

/// Value stored under a claimed key; identifies the holder for operators.
pub(crate) fn holder_sentinel() -> String {
    format!("pid:{}", std::process::id())
}
