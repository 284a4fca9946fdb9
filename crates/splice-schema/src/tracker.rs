use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::error::SchemaError;
use crate::snapshot::SchemaSnapshot;

/// Shared handle to the current schema generation.
///
/// The schema service pushes new snapshots with [`SchemaTracker::update`];
/// readers take an `Arc` of the current generation with
/// [`SchemaTracker::current`] and use only that snapshot for the whole
/// operation, so no caller ever observes a mix of two generations.
///
/// [`SchemaTracker::wait_for`] supports the one blocking operation of the
/// binding layer: waiting, bounded, for a generation that satisfies a
/// predicate (typically "knows this class") to arrive via a push update.
pub struct SchemaTracker {
    current: Mutex<Arc<SchemaSnapshot>>,
    updated: Condvar,
}

impl SchemaTracker {
    /// Create a tracker seeded with an initial snapshot.
    pub fn new(initial: Arc<SchemaSnapshot>) -> Self {
        Self {
            current: Mutex::new(initial),
            updated: Condvar::new(),
        }
    }

    /// The current schema generation.
    pub fn current(&self) -> Arc<SchemaSnapshot> {
        Arc::clone(&self.current.lock().expect("tracker lock poisoned"))
    }

    /// Install a new generation and wake all waiters.
    ///
    /// Stale pushes (generation not newer than the current one) are ignored.
    pub fn update(&self, snapshot: Arc<SchemaSnapshot>) {
        let mut current = self.current.lock().expect("tracker lock poisoned");
        if snapshot.generation() <= current.generation() {
            debug!(
                incoming = snapshot.generation(),
                current = current.generation(),
                "ignoring stale schema push"
            );
            return;
        }
        info!(generation = snapshot.generation(), "schema updated");
        *current = snapshot;
        self.updated.notify_all();
    }

    /// Wait, bounded by `timeout`, for a generation satisfying `pred`.
    ///
    /// Returns immediately if the current generation already satisfies it.
    /// Fails with [`SchemaError::Timeout`] rather than hanging.
    pub fn wait_for(
        &self,
        timeout: Duration,
        pred: impl Fn(&SchemaSnapshot) -> bool,
    ) -> Result<Arc<SchemaSnapshot>, SchemaError> {
        let start = Instant::now();
        let mut current = self.current.lock().expect("tracker lock poisoned");
        loop {
            if pred(&current) {
                return Ok(Arc::clone(&current));
            }
            let elapsed = start.elapsed();
            let Some(remaining) = timeout.checked_sub(elapsed) else {
                return Err(SchemaError::Timeout { waited: elapsed });
            };
            let (guard, result) = self
                .updated
                .wait_timeout(current, remaining)
                .expect("tracker lock poisoned");
            current = guard;
            if result.timed_out() && !pred(&current) {
                return Err(SchemaError::Timeout {
                    waited: start.elapsed(),
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::SchemaBuilder;
    use splice_types::ClassId;

    fn snapshot(generation: u64, with_class: Option<&str>) -> Arc<SchemaSnapshot> {
        let mut builder = SchemaBuilder::new("net", generation);
        if let Some(class) = with_class {
            builder = builder.container("top", |c| c.class(class));
        }
        builder.build()
    }

    #[test]
    fn current_returns_seed() {
        let tracker = SchemaTracker::new(snapshot(1, None));
        assert_eq!(tracker.current().generation(), 1);
    }

    #[test]
    fn update_replaces_and_ignores_stale() {
        let tracker = SchemaTracker::new(snapshot(2, None));
        tracker.update(snapshot(3, None));
        assert_eq!(tracker.current().generation(), 3);

        tracker.update(snapshot(2, None));
        assert_eq!(tracker.current().generation(), 3);
    }

    #[test]
    fn wait_for_satisfied_immediately() {
        let tracker = SchemaTracker::new(snapshot(1, Some("Top")));
        let snap = tracker
            .wait_for(Duration::from_millis(10), |s| {
                s.knows_class(&ClassId::new("Top"))
            })
            .unwrap();
        assert_eq!(snap.generation(), 1);
    }

    #[test]
    fn wait_for_times_out() {
        let tracker = SchemaTracker::new(snapshot(1, None));
        let err = tracker
            .wait_for(Duration::from_millis(20), |s| {
                s.knows_class(&ClassId::new("Missing"))
            })
            .unwrap_err();
        assert!(matches!(err, SchemaError::Timeout { .. }));
    }

    #[test]
    fn wait_for_wakes_on_push() {
        let tracker = Arc::new(SchemaTracker::new(snapshot(1, None)));
        let pusher = Arc::clone(&tracker);
        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(10));
            pusher.update(snapshot(2, Some("Top")));
        });

        let snap = tracker
            .wait_for(Duration::from_secs(5), |s| {
                s.knows_class(&ClassId::new("Top"))
            })
            .unwrap();
        assert_eq!(snap.generation(), 2);
        handle.join().unwrap();
    }
}
