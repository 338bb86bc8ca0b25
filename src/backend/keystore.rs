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
use crate::backend::cache::holder_sentinel;
use crate::error::BackendResult;
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(100);

/// Redis-style key store commands used for locking.
#[cfg_attr(test, mockall::automock)]
pub trait KeyStoreClient: Send + Sync {
    /// `SETNX key value`.
    fn set_nx(&self, key: &str, value: &str) -> BackendResult<bool>;

    /// `DEL key`, returning the number of removed keys.
    fn del(&self, key: &str) -> BackendResult<u64>;

    /// `EXISTS key`.
    fn exists(&self, key: &str) -> BackendResult<bool>;

    fn is_available(&self) -> bool {
        true
    }
}

impl<T: KeyStoreClient + ?Sized> KeyStoreClient for Arc<T> {
    fn set_nx(&self, key: &str, value: &str) -> BackendResult<bool> {
        (**self).set_nx(key, value)
    }

    fn del(&self, key: &str) -> BackendResult<u64> {
        (**self).del(key)
    }

    fn exists(&self, key: &str) -> BackendResult<bool> {
        (**self).exists(key)
    }

    fn is_available(&self) -> bool {
        (**self).is_available()
    }
}

#[derive(Debug)]
pub struct KeyStoreBackend<K> {
    client: K,
    sentinel: String,
    retry_delay: Duration,
}

impl<K: KeyStoreClient> KeyStoreBackend<K> {
    pub fn new(client: K) -> Self {
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

    pub fn client(&self) -> &K {
        &self.client
    }
}

impl<K: KeyStoreClient> ClaimBackend for KeyStoreBackend<K> {
    fn label(&self) -> &'static str {
        "keystore"
    }

    fn try_claim(&self, name: &str) -> BackendResult<bool> {
        self.client.set_nx(name, &self.sentinel)
    }

    fn drop_claim(&self, name: &str) -> BackendResult<bool> {
        Ok(self.client.del(name)? > 0)
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
