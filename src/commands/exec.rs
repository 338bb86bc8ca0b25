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

use crate::commands::file_lock;
use crate::config::LockyardConfig;
use crate::error::{LockyardError, Result};
use crate::locking::{LockGuard, MutexLock};
use log::{debug, info, warn};
use std::path::PathBuf;
use std::process::Command;
use std::time::Instant;

pub struct ExecCommand<'a> {
    config: &'a LockyardConfig,
}

impl<'a> ExecCommand<'a> {
    pub fn new(config: &'a LockyardConfig) -> Result<Self> {
        Ok(Self { config })
    }

    /// Runs `command` while holding `name`, returning the child's exit code.
    pub fn execute(
        &self,
        name: &str,
        wait: Option<&str>,
        dir: Option<PathBuf>,
        command: &[String],
    ) -> Result<i32> {
        let Some((program, args)) = command.split_first() else {
            return Err(LockyardError::CommandFailed(
                "no command given after '--'".to_string(),
            ));
        };

        let resolution = self.config.resolve_wait(wait)?;
        info!(
            "Waiting up to {} for '{name}' (from {})",
            resolution.value, resolution.source
        );

        let lock = file_lock(self.config, dir);
        lock.backend()
            .lock_path(name)
            .map_err(|_| LockyardError::InvalidLockName(name.to_string()))?;

        let started = Instant::now();
        let guard = LockGuard::acquire(&lock, name, resolution.value).ok_or_else(|| {
            LockyardError::LockContended {
                name: name.to_string(),
                waited_secs: started.elapsed().as_secs_f64(),
            }
        })?;

        debug!("Running {program} {args:?} under '{name}'");
        let status = Command::new(program)
            .args(args)
            .status()
            .map_err(|e| LockyardError::CommandFailed(format!("failed to start {program}: {e}")))?;

        release_held(guard);
        lock.teardown()?;

        Ok(status.code().unwrap_or(1))
    }
}

fn release_held<L: MutexLock + ?Sized>(guard: LockGuard<'_, L>) -> bool {
    let name = guard.name().to_string();
    let released = guard.release();
    if !released {
        warn!("Lock '{name}' was not released cleanly after the command exited");
    }
    released
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::locking::{FlockLock, LockWait};
    use tempfile::TempDir;

    fn dir(temp: &TempDir) -> Option<PathBuf> {
        Some(temp.path().to_path_buf())
    }

    fn sh(script: &str) -> Vec<String> {
        vec!["sh".to_string(), "-c".to_string(), script.to_string()]
    }

    #[test]
    fn returns_child_exit_code_and_releases() {
        let temp = TempDir::new().unwrap();
        let config = LockyardConfig::default();
        let command = ExecCommand::new(&config).unwrap();

        let code = command
            .execute("job", Some("0"), dir(&temp), &sh("exit 3"))
            .unwrap();
        assert_eq!(code, 3);

        let observer = FlockLock::new(temp.path());
        assert!(!observer.is_locked("job").unwrap());
    }

    #[test]
    fn contended_name_is_reported() {
        let temp = TempDir::new().unwrap();
        let config = LockyardConfig::default();
        let holder = FlockLock::new(temp.path());
        assert!(holder.acquire_lock("job", LockWait::NONE));

        let command = ExecCommand::new(&config).unwrap();
        let err = command
            .execute("job", Some("0"), dir(&temp), &sh("true"))
            .unwrap_err();
        assert!(matches!(err, LockyardError::LockContended { .. }));
        assert!(holder.release_lock("job"));
    }

    #[test]
    fn rejects_empty_command_and_bad_names() {
        let temp = TempDir::new().unwrap();
        let config = LockyardConfig::default();
        let command = ExecCommand::new(&config).unwrap();

        assert!(matches!(
            command.execute("job", Some("0"), dir(&temp), &[]),
            Err(LockyardError::CommandFailed(_))
        ));
        assert!(matches!(
            command.execute("../job", Some("0"), dir(&temp), &sh("true")),
            Err(LockyardError::InvalidLockName(_))
        ));
    }

    #[test]
    fn missing_program_releases_lock() {
        let temp = TempDir::new().unwrap();
        let config = LockyardConfig::default();
        let command = ExecCommand::new(&config).unwrap();

        let err = command
            .execute(
                "job",
                Some("0"),
                dir(&temp),
                &["lockyard-no-such-program".to_string()],
            )
            .unwrap_err();
        assert!(matches!(err, LockyardError::CommandFailed(_)));
        assert!(!FlockLock::new(temp.path()).is_locked("job").unwrap());
    }

    #[test]
    fn vanished_claim_is_not_reported_released() {
        use crate::backend::{CacheClient, MemoryCache};
        use crate::locking::CacheLock;
        use std::sync::Arc;

        let cache = Arc::new(MemoryCache::new());
        let lock = CacheLock::new(Arc::clone(&cache));
        let guard = LockGuard::acquire(&lock, "job", LockWait::NONE).unwrap();
        assert!(cache.delete("job").unwrap());

        assert!(!release_held(guard));
        assert!(lock.held_names().is_empty());
    }
}
