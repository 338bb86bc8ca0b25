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

use std::collections::BTreeSet;
use std::sync::{Mutex, MutexGuard};

/// Names held by one lock instance.
///
/// Never shared: every lock constructs its own, so a second instance on the
/// same backend starts empty and cannot release what the first acquired.
#[derive(Debug, Default)]
pub struct Ownership {
    names: Mutex<BTreeSet<String>>,
}

impl Ownership {
    pub fn new() -> Self {
        Self::default()
    }

    // The set stays consistent even if a holder panicked mid-call, so poison
    // is ignored rather than propagated.
    fn names(&self) -> MutexGuard<'_, BTreeSet<String>> {
        self.names
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names().contains(name)
    }

    pub fn insert(&self, name: &str) -> bool {
        self.names().insert(name.to_string())
    }

    pub fn remove(&self, name: &str) -> bool {
        self.names().remove(name)
    }

    /// Keeps only `name`, returning whatever else was held.
    pub fn replace_all_with(&self, name: &str) -> Vec<String> {
        let mut names = self.names();
        let dropped = names
            .iter()
            .filter(|held| held.as_str() != name)
            .cloned()
            .collect();
        names.clear();
        names.insert(name.to_string());
        dropped
    }

    pub fn snapshot(&self) -> Vec<String> {
        self.names().iter().cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.names().is_empty()
    }

    pub fn len(&self) -> usize {
        self.names().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_remove() {
        let ownership = Ownership::new();
        assert!(ownership.insert("a"));
        assert!(!ownership.insert("a"));
        assert!(ownership.contains("a"));
        assert!(ownership.remove("a"));
        assert!(!ownership.remove("a"));
        assert!(ownership.is_empty());
    }

    #[test]
    fn replace_all_reports_dropped_names() {
        let ownership = Ownership::new();
        ownership.insert("a");
        ownership.insert("b");
        let dropped = ownership.replace_all_with("c");
        assert_eq!(dropped, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(ownership.snapshot(), vec!["c".to_string()]);
    }

    #[test]
    fn replace_all_keeps_same_name_out_of_dropped() {
        let ownership = Ownership::new();
        ownership.insert("a");
        assert!(ownership.replace_all_with("a").is_empty());
        assert_eq!(ownership.len(), 1);
    }
}
