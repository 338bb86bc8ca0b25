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

use crate::error::{BackendError, LockyardError};
use std::fmt;

pub struct ErrorContext<'a> {
    pub error: &'a LockyardError,
    pub suggestion: Option<String>,
    pub details: Option<String>,
}

impl<'a> ErrorContext<'a> {
    pub fn new(error: &'a LockyardError) -> Self {
        let (suggestion, details) = match error {
            LockyardError::Unrecoverable { names, details } => {
                let suggestion = Some(
                    "The backend could not be reached while releasing locks. Restore the backend \
                     and release the listed names manually, or they stay held until the backend \
                     forgets them."
                        .to_string(),
                );
                let details = Some(format!(
                    "Orphaned locks:\n{}\n\nCause: {details}",
                    names
                        .iter()
                        .map(|n| format!("  - {n}"))
                        .collect::<Vec<_>>()
                        .join("\n")
                ));
                (suggestion, details)
            }
            LockyardError::Backend(BackendError::Unavailable(msg)) => {
                let suggestion = Some(
                    "Check that the lock backend is running and reachable, then retry.".to_string(),
                );
                let details = Some(format!("Backend unavailable: {msg}"));
                (suggestion, details)
            }
            LockyardError::Backend(BackendError::Io(err)) => {
                let suggestion = if err.kind() == std::io::ErrorKind::PermissionDenied {
                    Some(
                        "Ensure you have write permissions to the lock directory, or pick another \
                         one with --dir."
                            .to_string(),
                    )
                } else {
                    None
                };
                (suggestion, Some(format!("I/O failure: {err}")))
            }
            LockyardError::InvalidLockName(name) => {
                let suggestion = Some(
                    "Lock names must be non-empty, must not be '.' or '..', and must not contain \
                     path separators or NUL bytes."
                        .to_string(),
                );
                let details = Some(format!("Rejected name: {name:?}"));
                (suggestion, details)
            }
            LockyardError::LockContended { name, .. } => {
                let suggestion = Some(format!(
                    "Another process holds '{name}'. Increase --wait or use --wait infinite to \
                     block until it is released."
                ));
                (suggestion, None)
            }
            LockyardError::ConfigError(msg) | LockyardError::InvalidConfig(msg) => {
                let suggestion = Some(
                    "Check lockyard.toml for syntax errors. Wait values are seconds or the word \
                     'infinite'."
                        .to_string(),
                );
                let details = Some(msg.clone());
                (suggestion, details)
            }
            _ => (None, None),
        };

        ErrorContext {
            error,
            suggestion,
            details,
        }
    }

    pub fn with_suggestion(mut self, suggestion: String) -> Self {
        self.suggestion = Some(suggestion);
        self
    }

    pub fn with_details(mut self, details: String) -> Self {
        self.details = Some(details);
        self
    }
}

impl<'a> fmt::Display for ErrorContext<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Error: {}", self.error)?;

        if let Some(details) = &self.details {
            write!(f, "\n\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\n\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}
