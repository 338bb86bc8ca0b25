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

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::time::Duration;

/// How long an acquire call may keep polling the backend.
///
/// `Finite(Duration::ZERO)` means a single attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockWait {
    Finite(Duration),
    Infinite,
}

impl LockWait {
    pub const NONE: LockWait = LockWait::Finite(Duration::ZERO);

    pub const fn from_secs(seconds: u64) -> Self {
        Self::Finite(Duration::from_secs(seconds))
    }

    pub fn is_single_attempt(&self) -> bool {
        matches!(self, LockWait::Finite(duration) if duration.is_zero())
    }

    /// Whole seconds, rounded up, or `None` for an unbounded wait.
    pub fn whole_secs(&self) -> Option<u64> {
        match self {
            LockWait::Finite(duration) => {
                let secs = duration.as_secs();
                if duration.subsec_nanos() > 0 {
                    Some(secs + 1)
                } else {
                    Some(secs)
                }
            }
            LockWait::Infinite => None,
        }
    }
}

impl Default for LockWait {
    fn default() -> Self {
        LockWait::NONE
    }
}

impl From<Duration> for LockWait {
    fn from(duration: Duration) -> Self {
        LockWait::Finite(duration)
    }
}

impl fmt::Display for LockWait {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LockWait::Infinite => f.write_str("infinite"),
            LockWait::Finite(duration) => write!(f, "{}s", duration.as_secs()),
        }
    }
}

impl Serialize for LockWait {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            LockWait::Infinite => serializer.serialize_str("infinite"),
            LockWait::Finite(duration) => serializer.serialize_str(&duration.as_secs().to_string()),
        }
    }
}

impl<'de> Deserialize<'de> for LockWait {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Secs(u64),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Secs(secs) => Ok(LockWait::from_secs(secs)),
            Raw::Text(text) => parse_wait_override(&text).map_err(serde::de::Error::custom),
        }
    }
}

/// Where the effective wait came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LockWaitSource {
    #[default]
    Default,
    Config,
    Environment,
    Cli,
}

impl fmt::Display for LockWaitSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            LockWaitSource::Default => "built-in default",
            LockWaitSource::Config => "configuration file",
            LockWaitSource::Environment => "environment variable",
            LockWaitSource::Cli => "CLI flag",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockWaitResolution {
    pub value: LockWait,
    pub source: LockWaitSource,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockWaitParseError {
    message: String,
}

impl fmt::Display for LockWaitParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for LockWaitParseError {}

impl LockWaitParseError {
    fn invalid_value(value: &str) -> Self {
        Self {
            message: format!(
                "Lock wait value '{value}' is invalid. Use an integer number of seconds or the \
                 word 'infinite'."
            ),
        }
    }
}

/// Parses a wait override originating from CLI, environment, or configuration.
pub fn parse_wait_override(value: &str) -> Result<LockWait, LockWaitParseError> {
    let trimmed = value.trim();
    if trimmed.eq_ignore_ascii_case("infinite") {
        return Ok(LockWait::Infinite);
    }

    if let Ok(seconds) = trimmed.parse::<u64>() {
        return Ok(LockWait::from_secs(seconds));
    }

    Err(LockWaitParseError::invalid_value(trimmed))
}

/// Resolves the effective wait based on CLI > env > config > default precedence.
pub struct LockWaitResolver<'a> {
    cli_override: Option<&'a str>,
    env_override: Option<&'a str>,
    config_value: LockWait,
    default_value: LockWait,
}

impl<'a> LockWaitResolver<'a> {
    pub fn new(
        cli_override: Option<&'a str>,
        env_override: Option<&'a str>,
        config_value: LockWait,
        default_value: LockWait,
    ) -> Self {
        Self {
            cli_override,
            env_override,
            config_value,
            default_value,
        }
    }

    pub fn resolve(self) -> Result<LockWaitResolution, LockWaitParseError> {
        if let Some(cli_value) = self.cli_override {
            return Ok(LockWaitResolution {
                value: parse_wait_override(cli_value)?,
                source: LockWaitSource::Cli,
            });
        }

        if let Some(env_value) = self.env_override {
            return Ok(LockWaitResolution {
                value: parse_wait_override(env_value)?,
                source: LockWaitSource::Environment,
            });
        }

        if self.config_value != self.default_value {
            return Ok(LockWaitResolution {
                value: self.config_value,
                source: LockWaitSource::Config,
            });
        }

        Ok(LockWaitResolution {
            value: self.default_value,
            source: LockWaitSource::Default,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_numeric_values() {
        assert_eq!(parse_wait_override("42").unwrap(), LockWait::from_secs(42));
        assert_eq!(parse_wait_override(" 0 ").unwrap(), LockWait::NONE);
    }

    #[test]
    fn parse_infinite_keyword() {
        assert_eq!(parse_wait_override("infinite").unwrap(), LockWait::Infinite);
        assert_eq!(parse_wait_override("INFINITE").unwrap(), LockWait::Infinite);
    }

    #[test]
    fn parse_rejects_invalid_input() {
        let err = parse_wait_override("-3").unwrap_err();
        assert!(
            err.to_string()
                .contains("Use an integer number of seconds or the word 'infinite'")
        );
    }

    #[test]
    fn whole_secs_rounds_up() {
        assert_eq!(LockWait::Finite(Duration::from_millis(1500)).whole_secs(), Some(2));
        assert_eq!(LockWait::from_secs(3).whole_secs(), Some(3));
        assert_eq!(LockWait::Infinite.whole_secs(), None);
    }

    #[test]
    fn single_attempt_only_for_zero() {
        assert!(LockWait::NONE.is_single_attempt());
        assert!(!LockWait::from_secs(1).is_single_attempt());
        assert!(!LockWait::Infinite.is_single_attempt());
    }

    #[test]
    fn resolver_precedence() {
        let resolution =
            LockWaitResolver::new(Some("30"), Some("40"), LockWait::from_secs(5), LockWait::NONE)
                .resolve()
                .unwrap();
        assert_eq!(resolution.source, LockWaitSource::Cli);
        assert_eq!(resolution.value, LockWait::from_secs(30));

        let resolution =
            LockWaitResolver::new(None, Some("infinite"), LockWait::from_secs(5), LockWait::NONE)
                .resolve()
                .unwrap();
        assert_eq!(resolution.source, LockWaitSource::Environment);
        assert_eq!(resolution.value, LockWait::Infinite);
    }

    #[test]
    fn resolver_defaults_when_config_matches() {
        let resolution = LockWaitResolver::new(None, None, LockWait::NONE, LockWait::NONE)
            .resolve()
            .unwrap();
        assert_eq!(resolution.source, LockWaitSource::Default);
    }

    #[test]
    fn deserializes_numbers_and_keywords() {
        #[derive(Deserialize)]
        struct Holder {
            wait: LockWait,
        }

        let numeric: Holder = toml::from_str("wait = 7").unwrap();
        assert_eq!(numeric.wait, LockWait::from_secs(7));
        let text: Holder = toml::from_str(r#"wait = "infinite""#).unwrap();
        assert_eq!(text.wait, LockWait::Infinite);
        assert!(toml::from_str::<Holder>(r#"wait = "soon""#).is_err());
    }
}
