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
use crate::error::{BackendError, BackendResult};
use log::{debug, warn};
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions, TryLockError};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

const LOCK_FILE_SUFFIX: &str = ".lock";
const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(50);

/// Advisory file locks, one `<name>.lock` file per name inside `directory`.
///
/// A claim lives exactly as long as the descriptor kept in `descriptors`.
#[derive(Debug)]
pub struct FileBackend {
    directory: PathBuf,
    descriptors: Mutex<HashMap<String, File>>,
    retry_delay: Duration,
}

impl FileBackend {
    pub fn new<P: Into<PathBuf>>(directory: P) -> Self {
        Self {
            directory: directory.into(),
            descriptors: Mutex::new(HashMap::new()),
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }

    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn lock_path(&self, name: &str) -> BackendResult<PathBuf> {
        validate_name(name)?;
        Ok(self.directory.join(format!("{name}{LOCK_FILE_SUFFIX}")))
    }

    fn descriptors(&self) -> MutexGuard<'_, HashMap<String, File>> {
        self.descriptors
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn open_lock_file(&self, lock_path: &Path) -> io::Result<File> {
        fs::create_dir_all(&self.directory)?;

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(lock_path)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let permissions = fs::Permissions::from_mode(0o600);
            fs::set_permissions(lock_path, permissions)?;
        }

        Ok(file)
    }
}

impl ClaimBackend for FileBackend {
    fn label(&self) -> &'static str {
        "file"
    }

    fn try_claim(&self, name: &str) -> BackendResult<bool> {
        let lock_path = self.lock_path(name)?;
        let mut descriptors = self.descriptors();
        if descriptors.contains_key(name) {
            return Ok(false);
        }

        let file = self.open_lock_file(&lock_path)?;
        if try_lock_exclusive(&file)? {
            debug!("Locked {}", lock_path.display());
            descriptors.insert(name.to_string(), file);
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn drop_claim(&self, name: &str) -> BackendResult<bool> {
        let mut descriptors = self.descriptors();
        let Some(file) = descriptors.remove(name) else {
            return Ok(false);
        };

        if let Err(err) = file.unlock() {
            warn!("Failed to unlock descriptor for '{name}': {err}");
            descriptors.insert(name.to_string(), file);
            return Err(BackendError::Io(err));
        }
        // Closing the descriptor happens here; the file itself stays.
        drop(file);
        Ok(true)
    }

    fn query_claim(&self, name: &str) -> BackendResult<bool> {
        let lock_path = self.lock_path(name)?;
        if self.descriptors().contains_key(name) {
            return Ok(true);
        }

        let probe = match OpenOptions::new().read(true).write(true).open(&lock_path) {
            Ok(file) => file,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(false),
            Err(err) => return Err(BackendError::Io(err)),
        };

        if try_lock_exclusive(&probe)? {
            probe.unlock()?;
            Ok(false)
        } else {
            Ok(true)
        }
    }

    fn retry_interval(&self) -> Duration {
        self.retry_delay
    }
}

fn try_lock_exclusive(file: &File) -> io::Result<bool> {
    loop {
        match file.try_lock() {
            Ok(()) => return Ok(true),
            Err(TryLockError::WouldBlock) => return Ok(false),
            Err(TryLockError::Error(err)) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(TryLockError::Error(err)) => return Err(err),
        }
    }
}

fn validate_name(name: &str) -> BackendResult<()> {
    let invalid = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains('/')
        || name.contains('\\')
        || name.contains('\0');
    if invalid {
        return Err(BackendError::Io(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("lock name {name:?} cannot be used as a file name"),
        )));
    }
    Ok(())
}
