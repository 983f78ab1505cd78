// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Progress reporting and per-entity message collection.
//!
//! Both are shared by every worker of a conversion and guarded by a mutex.

use std::sync::{Mutex, PoisonError};

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// Progress callback, receives a fraction in `0..=1`.
pub type ProgressCallback = Box<dyn Fn(f64) + Send + Sync>;

/// Forwards progress to a callback at coarse intervals.
///
/// A value is forwarded only when it moved at least `step` past the last
/// forwarded value, or when it reaches completion.
pub struct ProgressReporter {
    callback: ProgressCallback,
    step: f64,
    last: Mutex<Option<f64>>,
}

impl ProgressReporter {
    pub fn new<F>(step: f64, callback: F) -> Self
    where
        F: Fn(f64) + Send + Sync + 'static,
    {
        Self {
            callback: Box::new(callback),
            step,
            last: Mutex::new(None),
        }
    }

    /// Reports `done` out of `total` items. Returns whether the callback ran.
    pub fn report(&self, done: usize, total: usize) -> bool {
        let fraction = if total == 0 {
            1.0
        } else {
            (done as f64 / total as f64).clamp(0.0, 1.0)
        };

        let due = {
            let mut last = self.last.lock().unwrap_or_else(PoisonError::into_inner);
            let due = match *last {
                None => true,
                Some(prev) if fraction <= prev => false,
                Some(_) if fraction >= 1.0 => true,
                Some(prev) => fraction - prev >= self.step,
            };
            if due {
                *last = Some(fraction);
            }
            due
        };
        // The callback runs unlocked so it may query the reporter
        if due {
            (self.callback)(fraction);
        }
        due
    }

    /// Most recently forwarded value.
    pub fn last_reported(&self) -> Option<f64> {
        *self.last.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for ProgressReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressReporter")
            .field("step", &self.step)
            .field("last", &self.last_reported())
            .finish()
    }
}

/// A message attached to a source entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityMessage {
    pub entity_id: u32,
    pub message: String,
}

/// Collects messages, keeping each distinct message once per entity.
#[derive(Debug, Default)]
pub struct MessageLog {
    messages: Mutex<FxHashMap<u32, Vec<String>>>,
}

impl MessageLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `message` for `entity_id`. Returns false for a repeat.
    pub fn push(&self, entity_id: u32, message: impl Into<String>) -> bool {
        let message = message.into();
        let mut messages = self.messages.lock().unwrap_or_else(PoisonError::into_inner);
        let list = messages.entry(entity_id).or_default();
        if list.contains(&message) {
            return false;
        }
        tracing::debug!(entity = entity_id, message = %message, "geometry message");
        list.push(message);
        true
    }

    pub fn len(&self) -> usize {
        self.messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .map(Vec::len)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All messages, ordered by entity id then insertion.
    pub fn messages(&self) -> Vec<EntityMessage> {
        let guard = self.messages.lock().unwrap_or_else(PoisonError::into_inner);
        let messages: &FxHashMap<u32, Vec<String>> = &guard;
        let mut ids: Vec<u32> = messages.keys().copied().collect();
        ids.sort_unstable();

        ids.into_iter()
            .flat_map(|id| {
                messages[&id].iter().map(move |message| EntityMessage {
                    entity_id: id,
                    message: message.clone(),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn recorder(step: f64) -> (ProgressReporter, Arc<Mutex<Vec<f64>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let reporter = ProgressReporter::new(step, move |p| sink.lock().unwrap().push(p));
        (reporter, seen)
    }

    #[test]
    fn progress_is_throttled() {
        let (reporter, seen) = recorder(0.25);
        for done in 0..=10 {
            reporter.report(done, 10);
        }
        assert_eq!(*seen.lock().unwrap(), vec![0.0, 0.3, 0.6, 0.9, 1.0]);
        assert_eq!(reporter.last_reported(), Some(1.0));
    }

    #[test]
    fn progress_never_goes_backwards() {
        let (reporter, seen) = recorder(0.0);
        assert!(reporter.report(5, 10));
        assert!(!reporter.report(3, 10));
        assert!(!reporter.report(5, 10));
        assert!(reporter.report(10, 10));
        assert!(!reporter.report(10, 10));
        assert_eq!(*seen.lock().unwrap(), vec![0.5, 1.0]);
    }

    #[test]
    fn callback_can_read_the_reporter() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let reporter: Arc<Mutex<Option<Arc<ProgressReporter>>>> = Arc::new(Mutex::new(None));
        let handle = Arc::clone(&reporter);
        let shared = Arc::new(ProgressReporter::new(0.0, move |_| {
            let inner = handle.lock().unwrap().clone();
            if let Some(inner) = inner {
                sink.lock().unwrap().push(inner.last_reported());
            }
        }));
        *reporter.lock().unwrap() = Some(Arc::clone(&shared));

        assert!(shared.report(1, 2));
        assert!(shared.report(2, 2));
        assert_eq!(*seen.lock().unwrap(), vec![Some(0.5), Some(1.0)]);
        // Break the reference cycle
        reporter.lock().unwrap().take();
    }

    #[test]
    fn empty_work_completes_immediately() {
        let (reporter, seen) = recorder(0.1);
        reporter.report(0, 0);
        assert_eq!(*seen.lock().unwrap(), vec![1.0]);
    }

    #[test]
    fn messages_are_deduplicated_per_entity() {
        let log = MessageLog::new();
        assert!(log.push(7, "open edges remain"));
        assert!(!log.push(7, "open edges remain"));
        assert!(log.push(3, "open edges remain"));
        assert!(log.push(7, "no improvement"));
        assert_eq!(log.len(), 3);

        let messages = log.messages();
        let pairs: Vec<(u32, &str)> = messages
            .iter()
            .map(|m| (m.entity_id, m.message.as_str()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                (3, "open edges remain"),
                (7, "open edges remain"),
                (7, "no improvement")
            ]
        );
    }
}
