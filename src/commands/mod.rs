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

pub mod exec;
pub mod status;

use crate::backend::FileBackend;
use crate::config::LockyardConfig;
use crate::locking::FlockLock;
use std::path::PathBuf;

/// File lock for CLI commands, honouring `--dir` and the configured retry cadence.
pub(crate) fn file_lock(config: &LockyardConfig, dir_override: Option<PathBuf>) -> FlockLock {
    let directory = dir_override.unwrap_or_else(|| config.lock_directory());
    log::debug!("Using lock directory {}", directory.display());
    FlockLock::with_backend(
        FileBackend::new(directory).with_retry_delay(config.locking.retry_interval()),
    )
}
