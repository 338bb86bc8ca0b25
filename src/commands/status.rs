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
use crate::locking::MutexLock;
use serde::Serialize;
use std::path::PathBuf;

#[derive(Debug, Serialize, PartialEq)]
struct StatusOutput {
    name: String,
    locked: bool,
    path: String,
}

pub struct StatusCommand<'a> {
    config: &'a LockyardConfig,
}

impl<'a> StatusCommand<'a> {
    pub fn new(config: &'a LockyardConfig) -> Result<Self> {
        Ok(Self { config })
    }

    pub fn execute(&self, name: &str, dir: Option<PathBuf>, json: bool) -> Result<()> {
        println!("{}", self.render(name, dir, json)?);
        Ok(())
    }

    fn render(&self, name: &str, dir: Option<PathBuf>, json: bool) -> Result<String> {
        let lock = file_lock(self.config, dir);
        let path = lock
            .backend()
            .lock_path(name)
            .map_err(|_| LockyardError::InvalidLockName(name.to_string()))?;
        let locked = lock.is_locked(name)?;

        if json {
            let output = StatusOutput {
                name: name.to_string(),
                locked,
                path: path.display().to_string(),
            };
            return serde_json::to_string_pretty(&output)
                .map_err(|e| LockyardError::CommandFailed(format!("failed to render JSON: {e}")));
        }

        Ok(if locked { "locked" } else { "unlocked" }.to_string())
    }
}
