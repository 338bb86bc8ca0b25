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
pub mod backend_lock;
pub mod contract;
pub mod manager;
pub mod mutex;
pub mod ownership;
pub mod poll;
pub mod scoped_guard;
pub mod wait;

pub use advisory::AdvisoryLock;
pub use backend_lock::{BackendLock, CacheLock, FlockLock, KeyStoreLock};
pub use contract::MutexLock;
pub use manager::LockManager;
pub use mutex::NamedMutex;
pub use ownership::Ownership;
pub use scoped_guard::{LockGuard, with_lock};
pub use wait::{
    LockWait, LockWaitParseError, LockWaitResolution, LockWaitResolver, LockWaitSource,
    parse_wait_override,
};
