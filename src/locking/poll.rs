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

use crate::locking::wait::LockWait;
use retry::{OperationResult, retry};
use std::time::{Duration, Instant};

/// Fixed-interval delays that stop once the wait budget is spent.
///
/// Each delay is clamped to the remaining budget so the loop never sleeps past
/// the deadline.
#[derive(Debug, Clone)]
pub struct DeadlineDelays {
    interval: Duration,
    deadline: Option<Instant>,
}

impl DeadlineDelays {
    pub fn new(wait: LockWait, interval: Duration, started: Instant) -> Self {
        let deadline = match wait {
            LockWait::Infinite => None,
            LockWait::Finite(duration) => Some(started.checked_add(duration).unwrap_or(started)),
        };
        Self { interval, deadline }
    }
}

impl Iterator for DeadlineDelays {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        match self.deadline {
            None => Some(self.interval),
            Some(deadline) => {
                let remaining = deadline.saturating_duration_since(Instant::now());
                if remaining.is_zero() {
                    None
                } else {
                    Some(remaining.min(self.interval))
                }
            }
        }
    }
}

/// Runs `attempt` until it reports success or the wait budget is spent.
///
/// A zero wait makes exactly one attempt.
pub fn poll_until<F>(wait: LockWait, interval: Duration, mut attempt: F) -> bool
where
    F: FnMut() -> bool,
{
    let delays = DeadlineDelays::new(wait, interval, Instant::now());
    retry(delays, || {
        if attempt() {
            OperationResult::Ok(())
        } else {
            OperationResult::Retry(())
        }
    })
    .is_ok()
}
